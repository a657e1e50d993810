// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minimal seller catalog.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{non_blank, validate_positive_amount},
    state::AppState,
    storage::{Product, ProductRepository},
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub seller_id: Option<String>,
    pub name: Option<String>,
    /// Price in USD
    pub price: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    /// Defaults to true
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    pub seller_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let Json(request) = payload?;
    let seller_id =
        non_blank(request.seller_id).ok_or_else(|| ApiError::bad_request("sellerId is required"))?;
    let name = non_blank(request.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let price = request
        .price
        .ok_or_else(|| ApiError::bad_request("Price is required"))?;
    validate_positive_amount(price).map_err(ApiError::bad_request)?;

    let now = Utc::now();
    let product = Product {
        id: uuid::Uuid::new_v4().to_string(),
        seller_id,
        name,
        description: non_blank(request.description),
        price,
        active: request.active.unwrap_or(true),
        category: non_blank(request.category),
        image: non_blank(request.image),
        created_at: now,
        updated_at: now,
    };
    ProductRepository::new(&state.store).create(&product)?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            product,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Seller's products, newest first", body = ProductListResponse),
        (status = 400, description = "sellerId missing")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let Query(query) = query?;
    let seller_id =
        non_blank(query.seller_id).ok_or_else(|| ApiError::bad_request("sellerId is required"))?;
    let products = ProductRepository::new(&state.store).list_by_seller(&seller_id)?;
    Ok(Json(ProductListResponse {
        success: true,
        products,
    }))
}
