pub mod auth_service;
pub mod order_service;
pub mod product_service;
pub mod promotion_rules;
pub mod promotion_service;
