pub mod audit_logs;
pub mod order_lines;
pub mod orders;
pub mod products;
pub mod promotion_products;
pub mod promotion_slabs;
pub mod promotions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use order_lines::Entity as OrderLines;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use promotion_products::Entity as PromotionProducts;
pub use promotion_slabs::Entity as PromotionSlabs;
pub use promotions::Entity as Promotions;
pub use users::Entity as Users;
