use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::VendorProfile;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVendorProfileRequest {
    pub store_name: String,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub stripe_account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVendorProfileRequest {
    pub store_name: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub stripe_account_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorList {
    pub items: Vec<VendorProfile>,
}
