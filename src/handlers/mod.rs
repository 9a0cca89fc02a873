pub mod customer_handlers;
pub mod file_handlers;
pub mod health_handlers;
