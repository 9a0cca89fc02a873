//! HTTP handlers for customers (file owners).

use crate::{errors::AppError, models::customer::Customer, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

/// Body of `POST /customers` and `PUT /customers/{id}`.
#[derive(Debug, Deserialize)]
pub struct CustomerReq {
    pub name: String,
}

/// `GET /customers`
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(state.customers.list().await?))
}

/// `GET /customers/{id}`
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.customers.get(id).await?))
}

/// `POST /customers`: 201 with the new customer.
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerReq>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state.customers.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `PUT /customers/{id}`: rename.
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CustomerReq>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(state.customers.rename(id, &payload.name).await?))
}

/// `DELETE /customers/{id}`: 409 while the customer still owns files.
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.customers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /customers`: 409, deleting nothing, while any file exists.
pub async fn delete_all_customers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.customers.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
