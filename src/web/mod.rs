//! Web layer
//!
//! The HTTP control surface: thin axum handlers over the service layer, a
//! standardized response envelope, and the OpenAPI document. Construction
//! wires the services once at startup; handlers share them through
//! `AppState`.

use anyhow::Result;
use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::analytics::AnalyticsSink;
use crate::config::Config;
use crate::database::Database;
use crate::directory::NodeDirectory;
use crate::services::{
    ClipService, DvrService, NodeReportService, TenantService, ViewerService, VodService,
};

pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod responses;

pub use extractors::{ListQuery, RequestContext};
pub use responses::{ApiResponse, PaginatedResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub directory: NodeDirectory,
    pub analytics: AnalyticsSink,
    pub clip_service: ClipService,
    pub dvr_service: DvrService,
    pub vod_service: VodService,
    pub viewer_service: ViewerService,
    pub tenant_service: TenantService,
    pub node_report_service: NodeReportService,
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        database: Database,
        directory: NodeDirectory,
        analytics: AnalyticsSink,
        clip_service: ClipService,
        dvr_service: DvrService,
        vod_service: VodService,
        viewer_service: ViewerService,
        tenant_service: TenantService,
        node_report_service: NodeReportService,
    ) -> Result<Self> {
        let state = AppState {
            database,
            directory,
            analytics,
            clip_service,
            dvr_service,
            vod_service,
            viewer_service,
            tenant_service,
            node_report_service,
        };

        let app = Self::build_router(state);
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/health/detailed", get(handlers::health::detailed_health_check))
            .route(
                "/api/v1/clips",
                post(handlers::clips::create_clip).get(handlers::clips::list_clips),
            )
            .route("/api/v1/clips/{clip_hash}", delete(handlers::clips::delete_clip))
            .route("/api/v1/dvr", get(handlers::dvr::list_dvr))
            .route("/api/v1/dvr/start", post(handlers::dvr::start_dvr))
            .route("/api/v1/dvr/{dvr_hash}/stop", post(handlers::dvr::stop_dvr))
            .route("/api/v1/dvr/{dvr_hash}", delete(handlers::dvr::delete_dvr))
            .route("/api/v1/vod/uploads", post(handlers::vod::create_upload))
            .route(
                "/api/v1/vod/uploads/{artifact_hash}/complete",
                post(handlers::vod::complete_upload),
            )
            .route(
                "/api/v1/vod/uploads/{artifact_hash}/abort",
                post(handlers::vod::abort_upload),
            )
            .route(
                "/api/v1/vod/{artifact_hash}",
                delete(handlers::vod::delete_asset),
            )
            .route("/api/v1/resolve", post(handlers::viewer::resolve))
            .route(
                "/api/v1/tenants/{tenant_id}/terminate",
                post(handlers::tenants::terminate_streams),
            )
            .route(
                "/api/v1/tenants/{tenant_id}/invalidate-cache",
                post(handlers::tenants::invalidate_cache),
            )
            .route("/api/v1/nodes/heartbeat", post(handlers::nodes::heartbeat))
            .route("/api/v1/nodes", get(handlers::nodes::list_nodes))
            .route(
                "/api/v1/nodes/artifacts/report",
                post(handlers::nodes::artifact_report),
            )
            .route(
                "/api/v1/openapi.json",
                get(|| async { Json(openapi::ApiDoc::openapi()) }),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Serve until the shutdown signal resolves
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Control surface listening on {}", self.addr);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;
        Ok(())
    }
}
