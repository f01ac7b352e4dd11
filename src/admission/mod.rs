//! Billing admission cache
//!
//! Per-tenant cache of billing state with a short TTL and explicit
//! cross-service invalidation. Cache misses fetch synchronously with
//! per-tenant single-flight so a popular tenant cannot stampede the billing
//! service. A failed fetch admits the viewer: availability wins, revenue
//! protection is eventual.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::clients::BillingClient;
use crate::models::{Admission, BillingModel, TenantBillingState};

#[derive(Clone)]
pub struct AdmissionService {
    billing: Option<Arc<dyn BillingClient>>,
    cache: Arc<RwLock<HashMap<String, TenantBillingState>>>,
    inflight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    ttl: Duration,
}

impl AdmissionService {
    pub fn new(billing: Option<Arc<dyn BillingClient>>, ttl: Duration) -> Self {
        Self {
            billing,
            cache: Arc::new(RwLock::new(HashMap::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Admission decision for a viewer resolve against `tenant_id`
    pub async fn check_admission(&self, tenant_id: &str) -> Admission {
        let state = self.tenant_state(tenant_id).await;
        if state.is_suspended {
            return Admission::Suspended;
        }
        if state.billing_model == BillingModel::Prepaid && state.is_balance_negative {
            return Admission::PrepaidExhausted;
        }
        Admission::Allowed
    }

    /// Current billing state, served from cache within the TTL
    pub async fn tenant_state(&self, tenant_id: &str) -> TenantBillingState {
        if let Some(state) = self.fresh_from_cache(tenant_id).await {
            return state;
        }

        let Some(billing) = self.billing.clone() else {
            return TenantBillingState::fail_open(tenant_id);
        };

        // single-flight per tenant: first caller fetches, the rest wait and
        // re-read the cache
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        if let Some(state) = self.fresh_from_cache(tenant_id).await {
            return state;
        }

        let state = match billing.fetch_tenant_state(tenant_id).await {
            Ok(state) => {
                self.cache
                    .write()
                    .await
                    .insert(tenant_id.to_string(), state.clone());
                state
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "billing fetch failed, admitting");
                TenantBillingState::fail_open(tenant_id)
            }
        };

        self.inflight.lock().await.remove(tenant_id);
        state
    }

    /// Cross-service invalidation entrypoint; the next read refetches
    pub async fn invalidate(&self, tenant_id: &str) -> bool {
        let removed = self.cache.write().await.remove(tenant_id).is_some();
        debug!(tenant_id, removed, "tenant billing cache invalidated");
        removed
    }

    pub async fn cached_tenant_count(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn fresh_from_cache(&self, tenant_id: &str) -> Option<TenantBillingState> {
        let cache = self.cache.read().await;
        let state = cache.get(tenant_id)?;
        let age = (Utc::now() - state.fetched_at).to_std().unwrap_or_default();
        (age < self.ttl).then(|| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBilling {
        fetches: AtomicUsize,
        state: TenantBillingState,
        fail: bool,
    }

    #[async_trait]
    impl BillingClient for CountingBilling {
        async fn fetch_tenant_state(&self, tenant_id: &str) -> AppResult<TenantBillingState> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::external_service("billing", "boom"));
            }
            let mut state = self.state.clone();
            state.tenant_id = tenant_id.to_string();
            state.fetched_at = Utc::now();
            Ok(state)
        }
    }

    fn suspended_state() -> TenantBillingState {
        TenantBillingState {
            tenant_id: String::new(),
            is_suspended: true,
            billing_model: BillingModel::Postpaid,
            is_balance_negative: false,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn cache_hit_avoids_second_fetch() {
        let billing = Arc::new(CountingBilling {
            fetches: AtomicUsize::new(0),
            state: suspended_state(),
            fail: false,
        });
        let admission =
            AdmissionService::new(Some(billing.clone()), Duration::from_secs(30));

        assert_eq!(admission.check_admission("T1").await, Admission::Suspended);
        assert_eq!(admission.check_admission("T1").await, Admission::Suspended);
        assert_eq!(billing.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let billing = Arc::new(CountingBilling {
            fetches: AtomicUsize::new(0),
            state: suspended_state(),
            fail: false,
        });
        let admission =
            AdmissionService::new(Some(billing.clone()), Duration::from_secs(30));

        admission.check_admission("T1").await;
        assert!(admission.invalidate("T1").await);
        admission.check_admission("T1").await;
        assert_eq!(billing.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_failure_admits() {
        let billing = Arc::new(CountingBilling {
            fetches: AtomicUsize::new(0),
            state: suspended_state(),
            fail: true,
        });
        let admission = AdmissionService::new(Some(billing), Duration::from_secs(30));
        assert_eq!(admission.check_admission("T1").await, Admission::Allowed);
    }

    #[tokio::test]
    async fn prepaid_negative_balance_soft_blocks() {
        let billing = Arc::new(CountingBilling {
            fetches: AtomicUsize::new(0),
            state: TenantBillingState {
                tenant_id: String::new(),
                is_suspended: false,
                billing_model: BillingModel::Prepaid,
                is_balance_negative: true,
                fetched_at: Utc::now(),
            },
            fail: false,
        });
        let admission = AdmissionService::new(Some(billing), Duration::from_secs(30));
        assert_eq!(
            admission.check_admission("T1").await,
            Admission::PrepaidExhausted
        );
    }

    #[tokio::test]
    async fn missing_billing_service_admits() {
        let admission = AdmissionService::new(None, Duration::from_secs(30));
        assert_eq!(admission.check_admission("T1").await, Admission::Allowed);
    }
}
