use super::{CustomerRepository, is_foreign_key_violation};
use crate::{
    models::customer::Customer,
    services::storage_service::{StorageError, StorageResult},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

/// `CustomerRepository` over the `customers` table.
#[derive(Clone)]
pub struct SqliteCustomerRepository {
    db: Arc<SqlitePool>,
}

impl SqliteCustomerRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CustomerRepository for SqliteCustomerRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, created_at FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(customer)
    }

    async fn find_all(&self) -> StorageResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, created_at FROM customers ORDER BY id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(customers)
    }

    async fn insert(&self, name: &str) -> StorageResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (name, created_at) VALUES (?, ?)
             RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(customer)
    }

    async fn update_name(&self, id: i64, name: &str) -> StorageResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "UPDATE customers SET name = ? WHERE id = ?
             RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(customer)
    }

    async fn delete_by_id(&self, id: i64) -> StorageResult<bool> {
        match sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await
        {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(err) if is_foreign_key_violation(&err) => Err(StorageError::CustomerHasFiles(id)),
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    async fn delete_all(&self) -> StorageResult<u64> {
        match sqlx::query("DELETE FROM customers")
            .execute(&*self.db)
            .await
        {
            Ok(result) => Ok(result.rows_affected()),
            Err(err) if is_foreign_key_violation(&err) => Err(StorageError::CustomersHaveFiles),
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }
}
