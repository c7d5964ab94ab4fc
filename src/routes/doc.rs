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
    domain::{
        pulse::{PulseSummary, TopProduct},
        roles::Role,
    },
    dto::{admin, auth as auth_dto, events as event_dto, orders as order_dto, products, sales_windows as window_dto, vendors as vendor_dto},
    models::{
        AuditLog, Event, EventApplication, Order, OrderItem, Product, SalesWindow,
        SalesWindowMetrics, SalesWindowProduct, SalesWindowSlot, User, VendorProfile,
    },
    response::Meta,
    routes::{
        admin as admin_routes, auth, events, health, orders, params, products as product_routes,
        sales_windows, vendor, vendor_orders, vendors, webhooks,
    },
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
        auth::register,
        auth::login,
        auth::me,
        auth::logout,
        product_routes::list_products,
        product_routes::get_product,
        vendors::list_vendors,
        vendors::get_vendor,
        vendors::vendor_sales_windows,
        vendor::create_profile,
        vendor::get_profile,
        vendor::update_profile,
        vendor::list_products,
        vendor::low_stock,
        vendor::create_product,
        vendor::get_product,
        vendor::update_product,
        vendor::delete_product,
        vendor::price_suggestion,
        sales_windows::list_windows,
        sales_windows::create_window,
        sales_windows::get_window,
        sales_windows::update_window,
        sales_windows::open_window,
        sales_windows::close_window,
        sales_windows::cancel_window,
        sales_windows::fulfill_window,
        sales_windows::duplicate_window,
        sales_windows::bulk_products,
        sales_windows::generate_slots,
        vendor_orders::list_orders,
        vendor_orders::order_stats,
        vendor_orders::get_order,
        vendor_orders::update_fulfillment,
        vendor_orders::pulse,
        orders::list_order,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        orders::cancel_order,
        events::list_events,
        events::get_event,
        events::create_event,
        events::my_events,
        events::update_event,
        events::publish_event,
        events::cancel_event,
        events::list_applications,
        events::apply_to_event,
        events::review_application,
        admin_routes::list_users,
        admin_routes::user_action,
        admin_routes::impersonate,
        admin_routes::list_all_orders,
        admin_routes::get_order_admin,
        admin_routes::list_audit_logs,
        admin_routes::list_low_stock,
        webhooks::stripe_webhook
    ),
    components(
        schemas(
            Role,
            User,
            VendorProfile,
            Product,
            SalesWindow,
            SalesWindowProduct,
            SalesWindowSlot,
            SalesWindowMetrics,
            Order,
            OrderItem,
            Event,
            EventApplication,
            AuditLog,
            PulseSummary,
            TopProduct,
            Meta,
            auth_dto::RegisterRequest,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            auth_dto::SessionInfo,
            vendor_dto::CreateVendorProfileRequest,
            vendor_dto::UpdateVendorProfileRequest,
            vendor_dto::VendorList,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductList,
            products::PriceSuggestionResponse,
            window_dto::CreateSalesWindowRequest,
            window_dto::UpdateSalesWindowRequest,
            window_dto::BulkWindowProductsRequest,
            window_dto::GenerateSlotsRequest,
            window_dto::SalesWindowDetail,
            window_dto::SalesWindowList,
            window_dto::FulfillmentPicker,
            window_dto::StorefrontWindow,
            window_dto::StorefrontSlot,
            order_dto::CheckoutRequest,
            order_dto::PayOrderRequest,
            order_dto::FulfillmentUpdateRequest,
            order_dto::OrderWithItems,
            order_dto::OrderList,
            order_dto::VendorOrderStats,
            order_dto::WebhookAck,
            event_dto::CreateEventRequest,
            event_dto::UpdateEventRequest,
            event_dto::ApplyToEventRequest,
            event_dto::ReviewApplicationRequest,
            event_dto::EventList,
            event_dto::ApplicationList,
            admin::UserActionRequest,
            admin::UserActionResult,
            admin::ImpersonateRequest,
            admin::ImpersonationResponse,
            admin::UserList,
            admin::AuditLogList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            params::SalesWindowQuery,
            params::PulseQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and token revocation"),
        (name = "Products", description = "Public catalog"),
        (name = "Vendors", description = "Public vendor directory"),
        (name = "Vendor", description = "Vendor profile and products"),
        (name = "Sales Windows", description = "Vendor sales windows"),
        (name = "Vendor Orders", description = "Fulfillment and sales analytics"),
        (name = "Orders", description = "Customer checkout and orders"),
        (name = "Events", description = "Markets, coordinators and vendor applications"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Webhooks", description = "Payment provider callbacks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
