//! CustomerService: registration and maintenance of file owners.

use super::storage_service::{StorageError, StorageResult};
use crate::{models::customer::Customer, repository::CustomerRepository};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub async fn list(&self) -> StorageResult<Vec<Customer>> {
        self.customers.find_all().await
    }

    pub async fn get(&self, id: i64) -> StorageResult<Customer> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or(StorageError::CustomerNotFound(id))
    }

    pub async fn create(&self, name: &str) -> StorageResult<Customer> {
        let name = validate_customer_name(name)?;
        let customer = self.customers.insert(name).await?;
        info!("registered customer {}", customer.id);
        Ok(customer)
    }

    pub async fn rename(&self, id: i64, name: &str) -> StorageResult<Customer> {
        let name = validate_customer_name(name)?;
        self.customers
            .update_name(id, name)
            .await?
            .ok_or(StorageError::CustomerNotFound(id))
    }

    /// Delete a customer that owns no files.
    ///
    /// Fails with `CustomerHasFiles` otherwise; files are never removed here.
    pub async fn delete(&self, id: i64) -> StorageResult<()> {
        if !self.customers.delete_by_id(id).await? {
            return Err(StorageError::CustomerNotFound(id));
        }
        info!("deleted customer {}", id);
        Ok(())
    }

    /// Delete every customer, or none if any file still exists.
    pub async fn delete_all(&self) -> StorageResult<u64> {
        let removed = self.customers.delete_all().await?;
        info!("deleted all customers ({} removed)", removed);
        Ok(removed)
    }
}

fn validate_customer_name(name: &str) -> StorageResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidCustomerName(
            "must not be empty".into(),
        ));
    }
    Ok(trimmed)
}
