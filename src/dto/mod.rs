pub mod admin;
pub mod auth;
pub mod events;
pub mod orders;
pub mod products;
pub mod sales_windows;
pub mod vendors;
