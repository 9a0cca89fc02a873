//! Business logic over the repositories.

pub mod customer_service;
pub mod sanitize;
pub mod storage_service;
