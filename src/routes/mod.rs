use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod promotions;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/product", products::router())
        .nest("/promotion", promotions::router())
        .nest("/order", orders::router())
}
