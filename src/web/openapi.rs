//! OpenAPI document for the control surface

use utoipa::OpenApi;

use crate::models::{
    Artifact, ArtifactNodePlacement, ArtifactStatus, ArtifactType, GeoPosition, Node,
    NodeCapability, NodeHeartbeat, PaymentRequirements, StorageLocation,
};
use crate::services::DeleteOutcome;
use crate::services::clip_service::{CreateClipRequest, CreateClipResponse};
use crate::services::dvr_service::{StartDvrRequest, StartDvrResponse};
use crate::services::node_report_service::ArtifactProgressReport;
use crate::services::tenant_service::TerminateStreamsResponse;
use crate::services::viewer_service::{
    PlaybackEndpoint, ResolveViewerRequest, ResolveViewerResponse,
};
use crate::services::vod_service::{
    CompleteVodUploadRequest, CompleteVodUploadResponse, CreateVodUploadRequest,
    CreateVodUploadResponse,
};
use crate::web::handlers;
use crate::web::handlers::health::HealthResponse;
use crate::web::handlers::nodes::{HeartbeatAck, ReportAck};
use crate::web::handlers::tenants::TerminateRequest;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::clips::create_clip,
        handlers::clips::delete_clip,
        handlers::clips::list_clips,
        handlers::dvr::start_dvr,
        handlers::dvr::stop_dvr,
        handlers::dvr::delete_dvr,
        handlers::dvr::list_dvr,
        handlers::vod::create_upload,
        handlers::vod::complete_upload,
        handlers::vod::abort_upload,
        handlers::vod::delete_asset,
        handlers::viewer::resolve,
        handlers::tenants::terminate_streams,
        handlers::tenants::invalidate_cache,
        handlers::nodes::heartbeat,
        handlers::nodes::list_nodes,
        handlers::nodes::artifact_report,
        handlers::health::health_check,
        handlers::health::detailed_health_check,
    ),
    components(schemas(
        Artifact,
        ArtifactNodePlacement,
        ArtifactStatus,
        ArtifactType,
        StorageLocation,
        Node,
        NodeCapability,
        NodeHeartbeat,
        GeoPosition,
        PaymentRequirements,
        DeleteOutcome,
        CreateClipRequest,
        CreateClipResponse,
        StartDvrRequest,
        StartDvrResponse,
        CreateVodUploadRequest,
        CreateVodUploadResponse,
        CompleteVodUploadRequest,
        CompleteVodUploadResponse,
        ResolveViewerRequest,
        ResolveViewerResponse,
        PlaybackEndpoint,
        ArtifactProgressReport,
        TerminateStreamsResponse,
        TerminateRequest,
        HeartbeatAck,
        ReportAck,
        HealthResponse,
    )),
    tags(
        (name = "clips", description = "Clip lifecycle"),
        (name = "dvr", description = "DVR session lifecycle"),
        (name = "vod", description = "VOD multipart uploads"),
        (name = "viewer", description = "Viewer endpoint resolution"),
        (name = "tenants", description = "Tenant enforcement"),
        (name = "nodes", description = "Fleet registration and reporting"),
        (name = "health", description = "Readiness"),
    )
)]
pub struct ApiDoc;
