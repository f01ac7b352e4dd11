//! Tenant billing state and admission decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BillingModel {
    Prepaid,
    Postpaid,
}

/// Cached per-tenant billing snapshot; TTL-bounded in the admission cache
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantBillingState {
    pub tenant_id: String,
    pub is_suspended: bool,
    pub billing_model: BillingModel,
    pub is_balance_negative: bool,
    pub fetched_at: DateTime<Utc>,
}

impl TenantBillingState {
    /// Permissive default used when the billing service cannot be reached.
    /// Viewer availability wins; revenue protection is eventual.
    pub fn fail_open(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            is_suspended: false,
            billing_model: BillingModel::Postpaid,
            is_balance_negative: false,
            fetched_at: Utc::now(),
        }
    }
}

/// Admission decision for a viewer resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Hard block: the owner account is suspended
    Suspended,
    /// Soft block (402-equivalent): prepaid tenant with a negative balance
    PrepaidExhausted,
}

/// Machine-readable payment requirements returned alongside payment-required
/// errors so clients can present a paywall
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequirements {
    /// Payment scheme identifier, e.g. "x402"
    pub scheme: String,
    /// Network the payment must settle on
    pub network: String,
    /// Amount in the smallest unit of `asset`
    pub max_amount_required: String,
    pub asset: String,
    /// Address the payment must be made out to
    pub pay_to: String,
    /// Resource being paid for (the content id)
    pub resource: String,
    pub description: Option<String>,
}
