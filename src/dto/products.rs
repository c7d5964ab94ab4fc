use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::pricing::PriceSuggestion, models::Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub unit_cost: Option<i64>,
    pub target_margin: Option<f64>,
    pub stock: i32,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub unit_cost: Option<i64>,
    pub target_margin: Option<f64>,
    pub stock: Option<i32>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub current_price: i64,
    pub target_margin: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CostAnalysis {
    pub unit_cost: i64,
    /// False when the cost was estimated from the current price.
    pub has_unit_cost: bool,
    pub history_points: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceSuggestionResponse {
    pub product: ProductSummary,
    pub cost_analysis: CostAnalysis,
    pub suggestion: PriceSuggestion,
}
