use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rao::{
    admission::AdmissionService,
    analytics::AnalyticsSink,
    balancer::LoadBalancer,
    clients::{
        BillingClient, BusinessRegistryClient, HttpBillingClient, HttpBusinessRegistryClient,
        HttpNodeAgentClient, HttpPurserClient, NodeAgentClient, PurserClient,
    },
    config::Config,
    database::Database,
    database::repositories::{ArtifactNodeRepository, ArtifactRepository, VodUploadRepository},
    directory::NodeDirectory,
    observability::AppObservability,
    resolver::ContentResolver,
    services::{
        ClipService, DvrService, NodeReportService, TenantService, ViewerService, VodService,
    },
    storage::{ObjectStore, S3ObjectStore},
    utils::GeoIpResolver,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "rao")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Routing and artifact orchestrator for a live-video edge fleet")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reloadable filter so operators can change verbosity at runtime
    let initial_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rao={}", cli.log_level).into());
    let (filter_layer, _reload_handle) = tracing_subscriber::reload::Layer::new(initial_filter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{} v{} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    let observability = AppObservability::new("rao")?;

    let database = Database::new(&config.database).await?;
    database.migrate().await?;

    let artifacts = ArtifactRepository::new(database.connection.clone());
    let placements = ArtifactNodeRepository::new(database.connection.clone());
    let uploads = VodUploadRepository::new(database.connection.clone());

    let directory = NodeDirectory::new(config.balancer.stale_ttl);
    let sweeper = directory.spawn_sweeper(config.balancer.sweep_interval);

    let geoip = GeoIpResolver::new(config.geoip.database_path.as_deref());
    let balancer = LoadBalancer::new(directory.clone(), geoip.clone(), config.balancer.clone());

    let (analytics, analytics_forwarder) = AnalyticsSink::spawn(&config.analytics);

    let node_agent: Arc<dyn NodeAgentClient> = Arc::new(HttpNodeAgentClient::new(&config.node_rpc));

    let registry: Option<Arc<dyn BusinessRegistryClient>> = match &config.registry.base_url {
        Some(base_url) => Some(Arc::new(HttpBusinessRegistryClient::new(
            base_url,
            &config.registry,
        ))),
        None => {
            warn!("business registry not configured, live resolution disabled");
            None
        }
    };
    let billing: Option<Arc<dyn BillingClient>> = config
        .billing
        .base_url
        .as_deref()
        .map(|base_url| {
            Arc::new(HttpBillingClient::new(base_url, &config.billing)) as Arc<dyn BillingClient>
        });
    let purser: Option<Arc<dyn PurserClient>> = config
        .purser
        .as_ref()
        .map(|purser_config| Arc::new(HttpPurserClient::new(purser_config)) as Arc<dyn PurserClient>);

    let object_store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::from_config(&config.object_store).await);

    let admission = AdmissionService::new(billing, config.admission.cache_ttl);
    let resolver = ContentResolver::new(artifacts.clone(), registry.clone());

    let clip_service = ClipService::new(
        balancer.clone(),
        directory.clone(),
        artifacts.clone(),
        placements.clone(),
        node_agent.clone(),
        registry.clone(),
        analytics.clone(),
    );
    let dvr_service = DvrService::new(
        balancer.clone(),
        directory.clone(),
        artifacts.clone(),
        placements.clone(),
        node_agent.clone(),
        registry.clone(),
        analytics.clone(),
    );
    let vod_service = VodService::new(
        artifacts.clone(),
        placements.clone(),
        uploads,
        object_store,
        directory.clone(),
        node_agent.clone(),
        analytics.clone(),
    );
    let viewer_service = ViewerService::new(
        resolver,
        admission.clone(),
        balancer.clone(),
        directory.clone(),
        placements.clone(),
        node_agent.clone(),
        purser,
        analytics.clone(),
        geoip,
        Some(observability),
        config.cluster_id.clone(),
        config.infra_tenant_id.clone(),
    );
    let tenant_service = TenantService::new(
        balancer,
        directory.clone(),
        admission,
        node_agent,
    );
    let node_report_service =
        NodeReportService::new(artifacts, placements, analytics.clone());

    let server = WebServer::new(
        &config,
        database,
        directory,
        analytics,
        clip_service,
        dvr_service,
        vod_service,
        viewer_service,
        tenant_service,
        node_report_service,
    )?;

    server
        .run_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    sweeper.abort();
    analytics_forwarder.abort();
    info!("shutdown complete");
    Ok(())
}
