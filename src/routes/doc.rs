use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        orders::{CreateOrderRequest, OrderItemRequest, OrderList, OrderWithLines},
        products::{CatalogList, CatalogProduct, CreateProductRequest, UpdateProductRequest},
        promotions::{
            CreatePromotionRequest, PromotionList, PromotionStatusRequest, UpdatePromotionRequest,
        },
    },
    models::{Order, OrderLine, Product, Promotion, PromotionSnapshot, User},
    pricing::{PromotionType, Slab},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, products, promotions},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        promotions::list_promotions,
        promotions::create_promotion,
        promotions::update_promotion,
        promotions::set_promotion_status,
        promotions::delete_promotion,
        orders::list_orders,
        orders::create_order,
        orders::get_order_details
    ),
    components(
        schemas(
            User,
            Product,
            Promotion,
            PromotionType,
            PromotionSnapshot,
            Slab,
            Order,
            OrderLine,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CatalogProduct,
            CatalogList,
            CreatePromotionRequest,
            UpdatePromotionRequest,
            PromotionStatusRequest,
            PromotionList,
            CreateOrderRequest,
            OrderItemRequest,
            OrderList,
            OrderWithLines,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<Promotion>,
            ApiResponse<CatalogList>,
            ApiResponse<PromotionList>,
            ApiResponse<OrderWithLines>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Promotions", description = "Promotion endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
