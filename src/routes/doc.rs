use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::cart::{UpdateQuantityRequest, UpsertLineRequest},
    models::{Cart, CartLine, ClearedLines},
    response::ApiResponse,
    routes::{cart, health},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::create_cart,
        cart::get_cart,
        cart::delete_cart,
        cart::clear_lines,
        cart::upsert_line,
        cart::update_line_quantity,
        cart::delete_line,
    ),
    components(
        schemas(
            Cart,
            CartLine,
            ClearedLines,
            UpsertLineRequest,
            UpdateQuantityRequest,
            health::HealthData,
            ApiResponse<Cart>,
            ApiResponse<CartLine>,
            ApiResponse<ClearedLines>,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
