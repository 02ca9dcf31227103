pub(crate) mod admin_handlers;
pub(crate) mod payment_handlers;
pub(crate) mod proof;
pub(crate) mod receipt_handlers;
