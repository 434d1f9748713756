use crate::services::cart_service::CartService;

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
}
