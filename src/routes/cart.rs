use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{UpdateQuantityRequest, UpsertLineRequest},
    error::AppResult,
    models::{Cart, CartLine, ClearedLines, LineInput},
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{user_id}",
            post(create_cart).get(get_cart).delete(delete_cart),
        )
        .route("/{user_id}/lines", axum::routing::delete(clear_lines))
        .route(
            "/{user_id}/lines/{product_id}",
            put(upsert_line).patch(update_line_quantity).delete(delete_line),
        )
}

#[utoipa::path(
    post,
    path = "/api/carts/{user_id}",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "Cart created", body = ApiResponse<Cart>),
        (status = 409, description = "Cart already exists"),
    ),
    tag = "Cart"
)]
pub async fn create_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state.carts.create_cart(user_id).await?;
    Ok(Json(ApiResponse::success("Cart created", cart)))
}

#[utoipa::path(
    get,
    path = "/api/carts/{user_id}",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "Cart with lines", body = ApiResponse<Cart>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = state.carts.get_cart(user_id).await?;
    Ok(Json(ApiResponse::success("OK", cart)))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{user_id}",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "Cart deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn delete_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.carts.delete_cart(user_id).await?;
    Ok(Json(ApiResponse::empty("Cart deleted")))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{user_id}/lines",
    params(("user_id" = Uuid, Path, description = "Owning user ID")),
    responses(
        (status = 200, description = "Lines cleared", body = ApiResponse<ClearedLines>),
    ),
    tag = "Cart"
)]
pub async fn clear_lines(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ClearedLines>>> {
    let cleared = state.carts.clear_lines(user_id).await?;
    Ok(Json(ApiResponse::success("Lines cleared", cleared)))
}

#[utoipa::path(
    put,
    path = "/api/carts/{user_id}/lines/{product_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owning user ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpsertLineRequest,
    responses(
        (status = 200, description = "Line added or replaced", body = ApiResponse<CartLine>),
        (status = 400, description = "Invalid quantity or name"),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Cart"
)]
pub async fn upsert_line(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpsertLineRequest>,
) -> AppResult<Json<ApiResponse<CartLine>>> {
    let line = state
        .carts
        .upsert_line(
            user_id,
            LineInput {
                product_id,
                name: payload.name,
                quantity: payload.quantity,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success("OK", line)))
}

#[utoipa::path(
    patch,
    path = "/api/carts/{user_id}/lines/{product_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owning user ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<CartLine>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Line not found"),
    ),
    tag = "Cart"
)]
pub async fn update_line_quantity(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartLine>>> {
    let line = state
        .carts
        .update_line_quantity(user_id, product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success("OK", line)))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{user_id}/lines/{product_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owning user ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Line not found"),
    ),
    tag = "Cart"
)]
pub async fn delete_line(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.carts.delete_line(user_id, product_id).await?;
    Ok(Json(ApiResponse::empty("Removed from cart")))
}
