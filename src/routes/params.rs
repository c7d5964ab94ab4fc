use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::{
    checkout::OrderStatus,
    pulse::PulsePeriod,
    roles::{Role, UserStatus},
    sales_window::{SalesWindowStatus, SalesWindowType},
};

// Query structs repeat `page`/`per_page` instead of flattening `Pagination`:
// `serde(flatten)` makes urlencoded numbers arrive as strings.

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    /// `(page, per_page, offset)` with page ≥ 1 and per_page in 1..=100.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[param(value_type = Option<String>)]
    pub sort_by: Option<ProductSortBy>,
    #[param(value_type = Option<String>)]
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[param(value_type = Option<String>)]
    pub status: Option<OrderStatus>,
    pub sales_window_id: Option<Uuid>,
    #[param(value_type = Option<String>)]
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Products with stock at or below this level are listed. Defaults to 5.
    pub threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesWindowQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[param(value_type = Option<String>)]
    pub status: Option<SalesWindowStatus>,
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    pub window_type: Option<SalesWindowType>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[param(value_type = Option<String>)]
    pub role: Option<Role>,
    #[param(value_type = Option<String>)]
    pub status: Option<UserStatus>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub action: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PulseQuery {
    #[param(value_type = Option<String>)]
    pub period: Option<PulsePeriod>,
}

macro_rules! paged {
    ($($ty:ty),+) => {
        $(impl $ty {
            pub fn pagination(&self) -> Pagination {
                Pagination::new(self.page, self.per_page)
            }
        })+
    };
}

paged!(
    ProductQuery,
    OrderListQuery,
    SearchQuery,
    LowStockQuery,
    SalesWindowQuery,
    UserListQuery,
    AuditLogQuery
);
