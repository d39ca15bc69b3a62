pub mod cookies;
pub mod csrf;
pub mod handlers;
pub mod password;
pub mod policy;
pub mod session;
