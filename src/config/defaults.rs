/// Configuration default values
///
/// All defaults live here so operational tuning has one place to look.
use std::time::Duration;

// Identity defaults
pub fn default_cluster_id() -> String {
    "default".to_string()
}
pub fn default_infra_tenant_id() -> String {
    "infra".to_string()
}

// Web server defaults
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}
pub const fn default_port() -> u16 {
    18090
}

// Balancer defaults
pub const fn default_stale_ttl() -> Duration {
    Duration::from_secs(15)
}
pub const fn default_sweep_interval() -> Duration {
    Duration::from_secs(5)
}
pub const fn default_saturation_threshold() -> i64 {
    9000
}
pub const fn default_locality_bonus() -> i64 {
    2000
}
pub const fn default_distance_weight() -> f64 {
    1000.0
}
pub const fn default_max_distance_km() -> f64 {
    20_000.0
}

// Admission defaults
pub const fn default_admission_ttl() -> Duration {
    Duration::from_secs(30)
}

// Analytics defaults
pub const fn default_analytics_buffer() -> usize {
    4096
}

// Object store defaults
pub fn default_s3_region() -> String {
    "us-east-1".to_string()
}
pub const fn default_force_path_style() -> bool {
    true
}
pub const fn default_presign_ttl() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

// Outbound client defaults
pub const fn default_client_timeout() -> Duration {
    Duration::from_secs(10)
}
pub const fn default_rpc_timeout() -> Duration {
    Duration::from_secs(5)
}
pub const fn default_rpc_retries() -> u32 {
    2
}
