pub mod email;
pub mod pdf;
pub mod razorpay;
pub mod receipts;
