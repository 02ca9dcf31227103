pub mod payment;
pub mod receipt;
pub mod user;
