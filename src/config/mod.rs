use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of the cluster this process routes for; stamped on
    /// routing events as the infra-owner attribution
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,
    /// Tenant id of the infra owner operating this cluster
    #[serde(default = "default_infra_tenant_id")]
    pub infra_tenant_id: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub purser: Option<PurserConfig>,
    #[serde(default)]
    pub node_rpc: NodeRpcConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Load-balancer tuning
///
/// The decision order (capability gate, liveness gate, locality, load,
/// distance) is fixed in code; only the numbers live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Heartbeats older than this mark a node stale
    #[serde(with = "duration_serde::duration", default = "default_stale_ttl")]
    pub stale_ttl: Duration,
    /// How often the stale sweeper runs
    #[serde(with = "duration_serde::duration", default = "default_sweep_interval")]
    pub sweep_interval: Duration,
    /// Nodes reporting load above this are excluded unless no others qualify
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: i64,
    /// Additive bonus when the node already carries the stream as a source
    #[serde(default = "default_locality_bonus")]
    pub locality_bonus: i64,
    /// Score points subtracted at `max_distance_km`
    #[serde(default = "default_distance_weight")]
    pub distance_weight: f64,
    /// Distance at which the proximity penalty saturates
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            stale_ttl: default_stale_ttl(),
            sweep_interval: default_sweep_interval(),
            saturation_threshold: default_saturation_threshold(),
            locality_bonus: default_locality_bonus(),
            distance_weight: default_distance_weight(),
            max_distance_km: default_max_distance_km(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// TTL of the per-tenant billing-state cache
    #[serde(with = "duration_serde::duration", default = "default_admission_ttl")]
    pub cache_ttl: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: default_admission_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Endpoint of the analytics bus; events are dropped when unset
    pub endpoint: Option<String>,
    /// Bounded outbox depth; overflow drops with a warning
    #[serde(default = "default_analytics_buffer")]
    pub buffer_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            buffer_size: default_analytics_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    /// Optional key prefix inside the bucket
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
    /// Presigned upload-part URL validity
    #[serde(with = "duration_serde::duration", default = "default_presign_ttl")]
    pub presign_ttl: Duration,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: "media-artifacts".to_string(),
            prefix: None,
            region: default_s3_region(),
            endpoint: None,
            force_path_style: default_force_path_style(),
            presign_ttl: default_presign_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the business registry
    pub base_url: Option<String>,
    #[serde(with = "duration_serde::duration", default = "default_client_timeout")]
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_client_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Base URL of the billing service
    pub base_url: Option<String>,
    #[serde(with = "duration_serde::duration", default = "default_client_timeout")]
    pub timeout: Duration,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_client_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurserConfig {
    pub base_url: String,
    #[serde(with = "duration_serde::duration", default = "default_client_timeout")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRpcConfig {
    #[serde(with = "duration_serde::duration", default = "default_rpc_timeout")]
    pub timeout: Duration,
    /// Bounded in-operation retries on transient dispatch failure
    #[serde(default = "default_rpc_retries")]
    pub retry_attempts: u32,
}

impl Default for NodeRpcConfig {
    fn default() -> Self {
        Self {
            timeout: default_rpc_timeout(),
            retry_attempts: default_rpc_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Path to a MaxMind city database; geo scoring degrades gracefully
    /// when unset
    pub database_path: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if !std::path::Path::new(config_file).exists() {
            tracing::warn!(
                "Config file '{}' not found, using defaults and environment",
                config_file
            );
        }

        // TOML file first, RAO__-prefixed environment wins
        let config: Config = Figment::new()
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("RAO__").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balancer_defaults_are_sane() {
        let cfg = BalancerConfig::default();
        assert_eq!(cfg.stale_ttl, Duration::from_secs(15));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(5));
        assert!(cfg.saturation_threshold <= 10000);
        assert!(cfg.locality_bonus > 0);
    }

    #[test]
    fn config_parses_from_toml_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            cluster_id = "eu-west"
            [database]
            url = "sqlite://./rao.db"
            [web]
            host = "127.0.0.1"
            port = 9090
            [balancer]
            stale_ttl = "30s"
            saturation_threshold = 8500
            "#,
        )
        .unwrap();

        let config = Config::load_from_file(path.to_str().unwrap()).expect("config should parse");
        assert_eq!(config.cluster_id, "eu-west");
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.balancer.stale_ttl, Duration::from_secs(30));
        assert_eq!(config.balancer.saturation_threshold, 8500);
        // untouched sections fall back to defaults
        assert_eq!(config.admission.cache_ttl, Duration::from_secs(30));
    }
}
