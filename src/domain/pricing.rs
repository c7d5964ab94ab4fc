//! Price suggestion heuristic for vendor products.
//!
//! The suggestion starts from the cost-plus price that yields the product's
//! target margin, then nudges it according to how volatile the recorded
//! prices and costs have been and which way prices are trending. All money
//! values are integer cents.

use serde::Serialize;
use utoipa::ToSchema;

/// Price coefficient of variation above which prices count as volatile.
pub const PRICE_VOLATILITY_CV: f64 = 0.15;
/// Cost coefficient of variation above which costs count as uncertain.
pub const COST_VOLATILITY_CV: f64 = 0.10;
/// Fraction of the target margin that the suggestion may never undercut.
pub const MIN_MARGIN_FACTOR: f64 = 0.8;
/// Share of the price assumed as cost when a product has no unit cost.
pub const ESTIMATED_COST_RATIO: f64 = 0.6;

/// The recorded unit cost, or an estimate from the price when none is known.
pub fn effective_unit_cost(price: i64, unit_cost: Option<i64>) -> i64 {
    unit_cost.unwrap_or_else(|| (price as f64 * ESTIMATED_COST_RATIO).round() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub price: i64,
    pub unit_cost: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl PriceTrend {
    fn as_str(&self) -> &'static str {
        match self {
            PriceTrend::Increasing => "increasing",
            PriceTrend::Decreasing => "decreasing",
            PriceTrend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriceSuggestion {
    pub suggested_price: i64,
    pub note: String,
    pub volatility_detected: bool,
    pub confidence: f64,
    pub trend: PriceTrend,
}

/// Suggest a price in cents. `target_margin` is a percentage in `[0, 100)`;
/// values outside are clamped.
pub fn suggest_price(unit_cost: i64, history: &[PricePoint], target_margin: f64) -> PriceSuggestion {
    let margin = target_margin.clamp(0.0, 99.0);
    let cost = unit_cost.max(0) as f64;
    let base = cost_plus(cost, margin);

    if history.is_empty() {
        return PriceSuggestion {
            suggested_price: base.round() as i64,
            note: "No price history available. Using basic margin calculation.".to_string(),
            volatility_detected: false,
            confidence: 0.5,
            trend: PriceTrend::Stable,
        };
    }

    let prices: Vec<f64> = history.iter().map(|p| p.price as f64).collect();
    let costs: Vec<f64> = history.iter().map(|p| p.unit_cost as f64).collect();
    let price_cv = coefficient_of_variation(&prices);
    let cost_cv = coefficient_of_variation(&costs);
    let trend = trend_of(&prices);
    let volatility_detected = price_cv > PRICE_VOLATILITY_CV;

    let (mut suggested, mut note, confidence) = if volatility_detected {
        let adjustment = 1.0 + price_cv * 0.1;
        (
            base * adjustment,
            format!(
                "High price volatility detected ({:.1}% CV). Using conservative pricing with {:.1}% adjustment.",
                price_cv * 100.0,
                adjustment * 100.0 - 100.0
            ),
            0.7,
        )
    } else if cost_cv > COST_VOLATILITY_CV {
        let adjustment = 1.0 + cost_cv * 0.05;
        (
            base * adjustment,
            format!(
                "High cost volatility detected ({:.1}% CV). Adjusting for cost uncertainty.",
                cost_cv * 100.0
            ),
            0.8,
        )
    } else {
        let adjustment = match trend {
            PriceTrend::Increasing => 1.02,
            PriceTrend::Decreasing => 0.98,
            PriceTrend::Stable => 1.0,
        };
        (
            base * adjustment,
            format!(
                "Stable market conditions. {} price trend detected. Using trend-adjusted pricing.",
                trend.as_str()
            ),
            0.9,
        )
    };

    let floor = cost_plus(cost, margin * MIN_MARGIN_FACTOR);
    if suggested < floor {
        suggested = floor;
        note.push_str(" Adjusted to maintain minimum margin requirements.");
    }

    PriceSuggestion {
        suggested_price: suggested.round() as i64,
        note,
        volatility_detected,
        confidence,
        trend,
    }
}

fn cost_plus(cost: f64, margin_percent: f64) -> f64 {
    cost / (1.0 - margin_percent / 100.0)
}

/// Population standard deviation over mean; zero when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

/// Sign of the least-squares slope of `values` against their index.
pub fn trend_of(values: &[f64]) -> PriceTrend {
    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return PriceTrend::Stable;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    if slope > 0.0 {
        PriceTrend::Increasing
    } else if slope < 0.0 {
        PriceTrend::Decreasing
    } else {
        PriceTrend::Stable
    }
}
