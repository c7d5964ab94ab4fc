pub mod audit_logs;
pub mod event_applications;
pub mod events;
pub mod order_items;
pub mod orders;
pub mod product_price_history;
pub mod products;
pub mod sales_window_metrics;
pub mod sales_window_products;
pub mod sales_window_slots;
pub mod sales_windows;
pub mod users;
pub mod vendor_profiles;

pub use audit_logs::Entity as AuditLogs;
pub use event_applications::Entity as EventApplications;
pub use events::Entity as Events;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_price_history::Entity as ProductPriceHistory;
pub use products::Entity as Products;
pub use sales_window_metrics::Entity as SalesWindowMetrics;
pub use sales_window_products::Entity as SalesWindowProducts;
pub use sales_window_slots::Entity as SalesWindowSlots;
pub use sales_windows::Entity as SalesWindows;
pub use users::Entity as Users;
pub use vendor_profiles::Entity as VendorProfiles;
