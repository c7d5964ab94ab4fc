pub mod admin_service;
pub mod auth_service;
pub mod event_service;
pub mod fulfillment_service;
pub mod order_service;
pub mod payment_service;
pub mod product_service;
pub mod pulse_service;
pub mod sales_window_service;
pub mod vendor_service;
