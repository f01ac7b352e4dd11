use anyhow::Result;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider, UpDownCounter},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing::info;

/// Main observability interface providing pre-built metric instruments
///
/// Metrics are registered on a process-global meter provider; export is the
/// deployment's concern (an OTLP collector scraping alongside, when one is
/// configured).
#[derive(Clone)]
pub struct AppObservability {
    pub meter: Meter,

    // Viewer resolution metrics
    pub resolves_total: Counter<u64>,
    pub resolve_rejections: Counter<u64>,
    pub resolve_latency: Histogram<f64>,

    // Node selection metrics
    pub node_selections: Counter<u64>,
    pub selection_failures: Counter<u64>,
    pub registered_nodes: UpDownCounter<i64>,

    // Artifact lifecycle metrics
    pub lifecycle_transitions: Counter<u64>,
    pub lifecycle_failures: Counter<u64>,

    // Admission cache metrics
    pub admission_cache_hits: Counter<u64>,
    pub admission_cache_misses: Counter<u64>,

    // Outbound plumbing metrics
    pub node_rpc_failures: Counter<u64>,
    pub analytics_dropped: Counter<u64>,
}

impl AppObservability {
    /// Initialize the global meter provider and build instruments
    pub fn new(service_name: &str) -> Result<Self> {
        let provider = SdkMeterProvider::builder().build();
        global::set_meter_provider(provider.clone());

        let meter = provider.meter("rao");
        info!("Metrics registered for {service_name}");

        Ok(Self::build_with_instruments(meter))
    }

    fn build_with_instruments(meter: Meter) -> Self {
        let resolves_total = meter
            .u64_counter("viewer_resolves_total")
            .with_description("Viewer endpoint resolutions")
            .build();
        let resolve_rejections = meter
            .u64_counter("viewer_resolve_rejections_total")
            .with_description("Resolutions rejected by admission or payment checks")
            .build();
        let resolve_latency = meter
            .f64_histogram("viewer_resolve_latency_seconds")
            .with_description("End-to-end viewer resolve latency")
            .build();

        let node_selections = meter
            .u64_counter("node_selections_total")
            .with_description("Load-balancer selections served")
            .build();
        let selection_failures = meter
            .u64_counter("node_selection_failures_total")
            .with_description("Selections with no eligible node")
            .build();
        let registered_nodes = meter
            .i64_up_down_counter("registered_nodes")
            .with_description("Nodes currently registered in the directory")
            .build();

        let lifecycle_transitions = meter
            .u64_counter("artifact_transitions_total")
            .with_description("Artifact lifecycle transitions applied")
            .build();
        let lifecycle_failures = meter
            .u64_counter("artifact_failures_total")
            .with_description("Artifacts moved to the failed state")
            .build();

        let admission_cache_hits = meter
            .u64_counter("admission_cache_hits_total")
            .with_description("Billing-state reads served from cache")
            .build();
        let admission_cache_misses = meter
            .u64_counter("admission_cache_misses_total")
            .with_description("Billing-state reads requiring a fetch")
            .build();

        let node_rpc_failures = meter
            .u64_counter("node_rpc_failures_total")
            .with_description("Node agent dispatch failures after retries")
            .build();
        let analytics_dropped = meter
            .u64_counter("analytics_dropped_total")
            .with_description("Analytics events dropped on outbox overflow")
            .build();

        Self {
            meter,
            resolves_total,
            resolve_rejections,
            resolve_latency,
            node_selections,
            selection_failures,
            registered_nodes,
            lifecycle_transitions,
            lifecycle_failures,
            admission_cache_hits,
            admission_cache_misses,
            node_rpc_failures,
            analytics_dropped,
        }
    }
}
