pub mod admin;
pub mod payment;
pub mod receipt;
