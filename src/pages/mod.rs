//! Page objects for the shop: login, account and cart/catalog flows.

mod account;
mod cart;
mod login;

pub use account::MyAccountPage;
pub use cart::{CartPage, ProductInfo};
pub use login::LoginPage;
