//! End-to-end orchestration scenarios
//!
//! Drives the clip, DVR, VOD, and viewer flows against an in-memory
//! registry, an in-process node directory, and mock collaborators, checking
//! the cross-component contracts: node selection, registry writes, event
//! emission order, and failure compensation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use rao::admission::AdmissionService;
use rao::analytics::{AnalyticsSink, OutboundEvent};
use rao::balancer::LoadBalancer;
use rao::clients::business_registry::{RegisterDvrRequest, RegisterDvrResponse};
use rao::clients::{
    BillingClient, BusinessRegistryClient, ClipDeleteRequest, ClipPullRequest, DvrDeleteRequest,
    DvrStartRequest, DvrStopRequest, NodeAgentClient, RegistryArtifact, RegistryStream,
    StopSessionsRequest, VodDeleteRequest,
};
use rao::config::BalancerConfig;
use rao::database::Database;
use rao::database::repositories::{
    ArtifactNodeRepository, ArtifactRepository, VodUploadRepository,
};
use rao::directory::NodeDirectory;
use rao::errors::{AppError, AppResult, RpcError, RpcResult};
use rao::models::{
    ArtifactStatus, ArtifactType, BillingModel, ClipLifecycleStage, GeoPosition, Node,
    NodeCapability, NodeHeartbeat, StorageLocation, StreamMeta, TenantBillingState,
    TriggerPayload, VodLifecycleStatus,
};
use rao::resolver::ContentResolver;
use rao::services::clip_service::{ClipService, CreateClipRequest};
use rao::services::dvr_service::{DvrService, StartDvrRequest};
use rao::services::viewer_service::{ResolveViewerRequest, ViewerService};
use rao::services::vod_service::{
    CompleteVodUploadRequest, CreateVodUploadRequest, VodService,
};
use rao::storage::ObjectStore;
use rao::utils::GeoIpResolver;

// ---------------------------------------------------------------------------
// mock collaborators

#[derive(Default)]
struct MockNodeAgent {
    fail_clip_pull: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockNodeAgent {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeAgentClient for MockNodeAgent {
    async fn clip_pull(&self, node: &Node, request: &ClipPullRequest) -> RpcResult<()> {
        self.record(format!("clip_pull:{}:{}", node.node_id, request.clip_hash));
        if self.fail_clip_pull.load(Ordering::SeqCst) {
            return Err(RpcError::Transient {
                node_id: node.node_id.clone(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn clip_delete(&self, node: &Node, request: &ClipDeleteRequest) -> RpcResult<()> {
        self.record(format!("clip_delete:{}:{}", node.node_id, request.clip_hash));
        Ok(())
    }

    async fn dvr_start(&self, node: &Node, request: &DvrStartRequest) -> RpcResult<()> {
        self.record(format!("dvr_start:{}:{}", node.node_id, request.dvr_hash));
        Ok(())
    }

    async fn dvr_stop(&self, node: &Node, request: &DvrStopRequest) -> RpcResult<()> {
        self.record(format!("dvr_stop:{}:{}", node.node_id, request.dvr_hash));
        Ok(())
    }

    async fn dvr_delete(&self, node: &Node, request: &DvrDeleteRequest) -> RpcResult<()> {
        self.record(format!("dvr_delete:{}:{}", node.node_id, request.dvr_hash));
        Ok(())
    }

    async fn vod_delete(&self, node: &Node, request: &VodDeleteRequest) -> RpcResult<()> {
        self.record(format!("vod_delete:{}:{}", node.node_id, request.artifact_hash));
        Ok(())
    }

    async fn stop_sessions(&self, node: &Node, request: &StopSessionsRequest) -> RpcResult<u64> {
        self.record(format!(
            "stop_sessions:{}:{}",
            node.node_id,
            request.stream_names.join(",")
        ));
        Ok(3)
    }

    async fn create_virtual_viewer(
        &self,
        node: &Node,
        internal_name: &str,
        _request_id: &str,
    ) -> RpcResult<()> {
        self.record(format!("virtual_viewer:{}:{internal_name}", node.node_id));
        Ok(())
    }

    async fn fetch_stream_meta(&self, _node: &Node, _internal_name: &str) -> RpcResult<StreamMeta> {
        Ok(StreamMeta::default())
    }
}

#[derive(Default)]
struct MockObjectStore {
    aborted: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn create_multipart_upload(&self, key: &str) -> AppResult<String> {
        Ok(format!("upload-{key}"))
    }

    async fn presigned_upload_parts(
        &self,
        key: &str,
        _upload_id: &str,
        part_count: u64,
    ) -> AppResult<Vec<String>> {
        Ok((1..=part_count)
            .map(|i| format!("https://s3.example.com/{key}?partNumber={i}"))
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        _upload_id: &str,
        _etags: &[String],
    ) -> AppResult<()> {
        self.completed.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, _upload_id: &str) -> AppResult<()> {
        self.aborted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    fn build_s3_url(&self, key: &str) -> String {
        format!("s3://bucket/{key}")
    }
}

struct MockRegistry {
    streams: HashMap<String, RegistryStream>,
}

#[async_trait]
impl BusinessRegistryClient for MockRegistry {
    async fn resolve_stream(&self, view_key: &str) -> AppResult<Option<RegistryStream>> {
        Ok(self.streams.get(view_key).cloned())
    }

    async fn validate_stream_key(&self, _stream_key: &str) -> AppResult<Option<RegistryStream>> {
        Ok(None)
    }

    async fn resolve_clip_hash(&self, _clip_hash: &str) -> AppResult<Option<RegistryArtifact>> {
        Ok(None)
    }

    async fn resolve_dvr_hash(&self, _dvr_hash: &str) -> AppResult<Option<RegistryArtifact>> {
        Ok(None)
    }

    async fn register_dvr(&self, _request: &RegisterDvrRequest) -> AppResult<RegisterDvrResponse> {
        Ok(RegisterDvrResponse {
            dvr_hash: "feedfacefeedfacefeedfacefeedface".to_string(),
            playback_id: Some("pb-123".to_string()),
        })
    }
}

struct MockBilling {
    suspended: bool,
}

#[async_trait]
impl BillingClient for MockBilling {
    async fn fetch_tenant_state(&self, tenant_id: &str) -> AppResult<TenantBillingState> {
        Ok(TenantBillingState {
            tenant_id: tenant_id.to_string(),
            is_suspended: self.suspended,
            billing_model: BillingModel::Postpaid,
            is_balance_negative: false,
            fetched_at: chrono::Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// environment

struct TestEnv {
    directory: NodeDirectory,
    balancer: LoadBalancer,
    artifacts: ArtifactRepository,
    placements: ArtifactNodeRepository,
    uploads: VodUploadRepository,
    analytics: AnalyticsSink,
    analytics_rx: mpsc::Receiver<OutboundEvent>,
    node_agent: Arc<MockNodeAgent>,
}

async fn test_env() -> TestEnv {
    let database = Database::new_in_memory().await.expect("in-memory database");
    database.migrate().await.expect("migrations");

    let directory = NodeDirectory::new(Duration::from_secs(15));
    let balancer = LoadBalancer::new(
        directory.clone(),
        GeoIpResolver::disabled(),
        BalancerConfig::default(),
    );
    let (analytics, analytics_rx) = AnalyticsSink::buffered(128);

    TestEnv {
        directory,
        balancer,
        artifacts: ArtifactRepository::new(database.connection.clone()),
        placements: ArtifactNodeRepository::new(database.connection.clone()),
        uploads: VodUploadRepository::new(database.connection.clone()),
        analytics,
        analytics_rx,
        node_agent: Arc::new(MockNodeAgent::default()),
    }
}

fn heartbeat(node_id: &str, caps: &[NodeCapability]) -> NodeHeartbeat {
    NodeHeartbeat {
        node_id: node_id.to_string(),
        host: format!("{node_id}.example.com"),
        base_url: format!("http://{node_id}.example.com:4242"),
        capabilities: caps.iter().copied().collect(),
        geo: Some(GeoPosition { lat: 50.1, lon: 8.6 }),
        location_name: None,
        outputs: HashMap::from([
            ("HLS".to_string(), "https://HOST/hls/$/index.m3u8".to_string()),
            ("MIST_HTML".to_string(), "https://HOST/view/$.html".to_string()),
        ]),
        load_score: 100,
        tenant_streams: HashMap::new(),
    }
}

fn clip_service(env: &TestEnv) -> ClipService {
    ClipService::new(
        env.balancer.clone(),
        env.directory.clone(),
        env.artifacts.clone(),
        env.placements.clone(),
        env.node_agent.clone(),
        None,
        env.analytics.clone(),
    )
}

fn clip_stages(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<ClipLifecycleStage> {
    let mut stages = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OutboundEvent::Trigger(trigger) = event {
            if let TriggerPayload::ClipLifecycle(data) = trigger.payload {
                stages.push(data.stage);
            }
        }
    }
    stages
}

fn vod_statuses(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<VodLifecycleStatus> {
    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OutboundEvent::Trigger(trigger) = event {
            if let TriggerPayload::VodLifecycle(data) = trigger.payload {
                statuses.push(data.status);
            }
        }
    }
    statuses
}

fn create_clip_request() -> CreateClipRequest {
    CreateClipRequest {
        internal_name: "live+foo".to_string(),
        tenant_id: "T1".to_string(),
        artifact_internal_name: "clip+foo-goal".to_string(),
        user_id: None,
        stream_id: None,
        clip_hash: None,
        format: None,
        start_unix: Some(1000),
        stop_unix: Some(1010),
        start_ms: None,
        stop_ms: None,
        duration_sec: Some(10),
        retention_days: None,
    }
}

// ---------------------------------------------------------------------------
// clip scenarios

#[tokio::test]
async fn create_clip_happy_path() {
    let mut env = test_env().await;
    env.directory
        .upsert_node(heartbeat("n1", &[NodeCapability::Ingest]))
        .await
        .unwrap();
    env.directory
        .upsert_node(heartbeat("n2", &[NodeCapability::Storage]))
        .await
        .unwrap();

    let service = clip_service(&env);
    let response = service.create_clip(create_clip_request()).await.unwrap();

    assert_eq!(response.status, "queued");
    assert_eq!(response.clip_hash.len(), 32);
    assert!(response.clip_hash.bytes().all(|b| b.is_ascii_hexdigit()));
    assert_eq!(response.ingest_host, "n1.example.com");
    assert_eq!(response.storage_host, "n2.example.com");

    let artifact = env.artifacts.find_by_hash(&response.clip_hash).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Requested);
    assert_eq!(artifact.tenant_id.as_deref(), Some("T1"));

    let placements = env.placements.placements_for(&response.clip_hash).await.unwrap();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].node_id, "n2");

    assert_eq!(
        clip_stages(&mut env.analytics_rx),
        vec![ClipLifecycleStage::Requested, ClipLifecycleStage::Queued]
    );
    assert!(
        env.node_agent
            .calls()
            .iter()
            .any(|c| c.starts_with("clip_pull:n2:"))
    );
}

#[tokio::test]
async fn create_clip_without_storage_node_writes_nothing() {
    let env = test_env().await;
    env.directory
        .upsert_node(heartbeat("n1", &[NodeCapability::Ingest]))
        .await
        .unwrap();

    let service = clip_service(&env);
    let err = service.create_clip(create_clip_request()).await.unwrap_err();
    match err {
        AppError::Unavailable { message, .. } => {
            assert!(message.contains("no storage node available"), "got {message}");
        }
        other => panic!("expected Unavailable, got {other}"),
    }

    let page = env
        .artifacts
        .list_by_internal_name(ArtifactType::Clip, "live+foo", None, 10, false, true)
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn clip_dispatch_failure_compensates() {
    let mut env = test_env().await;
    env.directory
        .upsert_node(heartbeat("n1", &[NodeCapability::Ingest]))
        .await
        .unwrap();
    env.directory
        .upsert_node(heartbeat("n2", &[NodeCapability::Storage]))
        .await
        .unwrap();
    env.node_agent.fail_clip_pull.store(true, Ordering::SeqCst);

    let service = clip_service(&env);
    let err = service.create_clip(create_clip_request()).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable { .. }));

    // the row exists but is failed, and the event plane saw the failure
    let page = env
        .artifacts
        .list_by_internal_name(ArtifactType::Clip, "live+foo", None, 10, false, true)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].status, ArtifactStatus::Failed);
    assert_eq!(
        clip_stages(&mut env.analytics_rx),
        vec![ClipLifecycleStage::Requested, ClipLifecycleStage::Failed]
    );
}

#[tokio::test]
async fn double_delete_is_a_no_op() {
    let env = test_env().await;
    env.directory
        .upsert_node(heartbeat("n1", &[NodeCapability::Ingest]))
        .await
        .unwrap();
    env.directory
        .upsert_node(heartbeat("n2", &[NodeCapability::Storage]))
        .await
        .unwrap();

    let service = clip_service(&env);
    let created = service.create_clip(create_clip_request()).await.unwrap();

    let first = service.delete_clip(&created.clip_hash).await.unwrap();
    assert!(first.success);
    let second = service.delete_clip(&created.clip_hash).await.unwrap();
    assert!(!second.success);
    assert_eq!(second.message, "clip is already deleted");

    let artifact = env.artifacts.find_by_hash(&created.clip_hash).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Deleted);
}

// ---------------------------------------------------------------------------
// dvr scenarios

#[tokio::test]
async fn dvr_start_is_idempotent_per_stream() {
    let env = test_env().await;
    env.directory
        .upsert_node(heartbeat("n1", &[NodeCapability::Ingest]))
        .await
        .unwrap();
    env.directory
        .upsert_node(heartbeat("n2", &[NodeCapability::Storage]))
        .await
        .unwrap();

    let registry: Arc<dyn BusinessRegistryClient> = Arc::new(MockRegistry {
        streams: HashMap::new(),
    });
    let service = DvrService::new(
        env.balancer.clone(),
        env.directory.clone(),
        env.artifacts.clone(),
        env.placements.clone(),
        env.node_agent.clone(),
        Some(registry),
        env.analytics.clone(),
    );

    let request = StartDvrRequest {
        internal_name: "live+foo".to_string(),
        tenant_id: "T1".to_string(),
        user_id: None,
        stream_id: None,
        dvr_hash: None,
        format: None,
        retention_days: None,
        segment_duration: None,
    };

    let first = service.start_dvr(request.clone()).await.unwrap();
    assert_eq!(first.status, "started");
    assert_eq!(first.dvr_hash, "feedfacefeedfacefeedfacefeedface");
    assert_eq!(first.playback_id.as_deref(), Some("pb-123"));

    let second = service.start_dvr(request).await.unwrap();
    assert_eq!(second.status, "already_started");
    assert_eq!(second.dvr_hash, first.dvr_hash);
}

// ---------------------------------------------------------------------------
// vod scenarios

fn vod_service(env: &TestEnv, store: Arc<MockObjectStore>) -> VodService {
    VodService::new(
        env.artifacts.clone(),
        env.placements.clone(),
        env.uploads.clone(),
        store,
        env.directory.clone(),
        env.node_agent.clone(),
        env.analytics.clone(),
    )
}

#[tokio::test]
async fn vod_upload_lifecycle() {
    let mut env = test_env().await;
    let store = Arc::new(MockObjectStore::default());
    let service = vod_service(&env, store.clone());

    const MIB: u64 = 1024 * 1024;
    let created = service
        .create_upload(CreateVodUploadRequest {
            tenant_id: "T1".to_string(),
            filename: "v.mp4".to_string(),
            size_bytes: 50 * MIB,
            user_id: None,
            artifact_hash: None,
        })
        .await
        .unwrap();

    assert_eq!(created.part_size, 20 * MIB);
    assert_eq!(created.part_count, 3);
    assert_eq!(created.part_urls.len(), 3);

    let completed = service
        .complete_upload(
            &created.artifact_hash,
            CompleteVodUploadRequest {
                etags: vec!["e1".to_string(), "e2".to_string(), "e3".to_string()],
            },
        )
        .await
        .unwrap();

    let hash = &created.artifact_hash;
    assert_eq!(completed.status, "ready");
    assert_eq!(completed.s3_url, format!("s3://bucket/vod/T1/{hash}/{hash}.mp4"));

    let artifact = env.artifacts.find_by_hash(hash).await.unwrap().unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Ready);
    assert_eq!(artifact.storage_location, StorageLocation::S3);
    assert_eq!(artifact.s3_url.as_deref(), Some(completed.s3_url.as_str()));

    // the bookkeeping row is gone once the upload settles
    assert!(env.uploads.find_by_hash(hash).await.unwrap().is_none());
    assert_eq!(
        store.completed.lock().unwrap().as_slice(),
        [format!("vod/T1/{hash}/{hash}.mp4")]
    );

    assert_eq!(
        vod_statuses(&mut env.analytics_rx),
        vec![VodLifecycleStatus::Requested, VodLifecycleStatus::Completed]
    );
}

#[tokio::test]
async fn vod_abort_leaves_no_artifact_row() {
    let env = test_env().await;
    let store = Arc::new(MockObjectStore::default());
    let service = vod_service(&env, store.clone());

    let created = service
        .create_upload(CreateVodUploadRequest {
            tenant_id: "T1".to_string(),
            filename: "v.mp4".to_string(),
            size_bytes: 10 * 1024 * 1024,
            user_id: None,
            artifact_hash: None,
        })
        .await
        .unwrap();

    let outcome = service.abort_upload(&created.artifact_hash).await.unwrap();
    assert!(outcome.success);

    assert!(env.artifacts.find_by_hash(&created.artifact_hash).await.unwrap().is_none());
    assert!(env.uploads.find_by_hash(&created.artifact_hash).await.unwrap().is_none());
    assert_eq!(store.aborted.lock().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// viewer scenarios

fn viewer_service(env: &TestEnv, registry: Arc<dyn BusinessRegistryClient>, suspended: bool) -> ViewerService {
    let billing: Arc<dyn BillingClient> = Arc::new(MockBilling { suspended });
    ViewerService::new(
        ContentResolver::new(env.artifacts.clone(), Some(registry)),
        AdmissionService::new(Some(billing), Duration::from_secs(30)),
        env.balancer.clone(),
        env.directory.clone(),
        env.placements.clone(),
        env.node_agent.clone(),
        None,
        env.analytics.clone(),
        GeoIpResolver::disabled(),
        None,
        "test-cluster".to_string(),
        "infra".to_string(),
    )
}

fn registry_with_stream(view_key: &str) -> Arc<dyn BusinessRegistryClient> {
    Arc::new(MockRegistry {
        streams: HashMap::from([(
            view_key.to_string(),
            RegistryStream {
                tenant_id: "T1".to_string(),
                user_id: None,
                internal_name: "live+foo".to_string(),
                stream_id: Some("stream-1".to_string()),
                playback_id: Some(view_key.to_string()),
            },
        )]),
    })
}

#[tokio::test]
async fn viewer_resolve_live_builds_endpoints_and_routing_event() {
    let mut env = test_env().await;
    env.directory
        .upsert_node(heartbeat("edge1", &[NodeCapability::Edge]))
        .await
        .unwrap();

    let service = viewer_service(&env, registry_with_stream("vk123"), false);
    let response = service
        .resolve_viewer_endpoint(ResolveViewerRequest {
            content_id: "vk123".to_string(),
            content_type: None,
            payment: None,
            client_ip: None,
        })
        .await
        .unwrap();

    assert_eq!(response.content_type, "live");
    assert_eq!(response.node_id, "edge1");
    let hls = response.endpoints.iter().find(|e| e.protocol == "HLS").unwrap();
    assert_eq!(hls.url, "https://edge1.example.com/hls/live+foo/index.m3u8");
    // live WHEP derived from the MIST_HTML template
    let whep = response.endpoints.iter().find(|e| e.protocol == "WHEP").unwrap();
    assert_eq!(whep.url, "https://edge1.example.com/view/webrtc/live+foo");
    assert!(!whep.can_seek);

    // the virtual viewer was created on the selected node
    assert!(
        env.node_agent
            .calls()
            .iter()
            .any(|c| c == "virtual_viewer:edge1:live+foo")
    );

    // a routing event with dual-tenant attribution went out
    let mut saw_routing = false;
    while let Ok(event) = env.analytics_rx.try_recv() {
        if let OutboundEvent::Trigger(trigger) = event {
            if let TriggerPayload::LoadBalancing(data) = trigger.payload {
                assert_eq!(data.tenant_id, "infra");
                assert_eq!(data.stream_tenant_id, "T1");
                assert_eq!(data.cluster_id, "test-cluster");
                assert_eq!(data.selected_node_id, "edge1");
                saw_routing = true;
            }
        }
    }
    assert!(saw_routing);
}

#[tokio::test]
async fn suspended_tenant_is_hard_blocked() {
    let env = test_env().await;
    env.directory
        .upsert_node(heartbeat("edge1", &[NodeCapability::Edge]))
        .await
        .unwrap();

    let service = viewer_service(&env, registry_with_stream("vk123"), true);
    let err = service
        .resolve_viewer_endpoint(ResolveViewerRequest {
            content_id: "vk123".to_string(),
            content_type: None,
            payment: None,
            client_ip: None,
        })
        .await
        .unwrap_err();

    match err {
        AppError::PaymentRequired { message, .. } => {
            assert_eq!(message, "payment required - owner account suspended");
        }
        other => panic!("expected PaymentRequired, got {other}"),
    }
}

#[tokio::test]
async fn caller_content_type_is_ignored() {
    let env = test_env().await;
    let service = viewer_service(&env, registry_with_stream("vk123"), false);

    // a clip hash claimed to be "live" resolves exactly as if the claim
    // were absent: unknown hash, registry miss, not found
    let tampered = service
        .resolve_viewer_endpoint(ResolveViewerRequest {
            content_id: "0123456789abcdef0123456789abcdef".to_string(),
            content_type: Some("live".to_string()),
            payment: None,
            client_ip: None,
        })
        .await
        .unwrap_err();
    let plain = service
        .resolve_viewer_endpoint(ResolveViewerRequest {
            content_id: "0123456789abcdef0123456789abcdef".to_string(),
            content_type: None,
            payment: None,
            client_ip: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(tampered, AppError::NotFound { .. }));
    assert!(matches!(plain, AppError::NotFound { .. }));
}

#[tokio::test]
async fn cold_artifact_reports_defrosting() {
    let env = test_env().await;
    let service = viewer_service(&env, registry_with_stream("vk123"), false);

    // a VOD whose only copy lives in the object store
    let hash = "aaaabbbbccccddddeeeeffff00001111";
    let now = chrono::Utc::now();
    let artifact = rao::models::Artifact {
        artifact_hash: hash.to_string(),
        artifact_type: ArtifactType::Vod,
        internal_name: format!("vod+{hash}"),
        artifact_internal_name: format!("vod+{hash}"),
        stream_id: None,
        tenant_id: Some("T1".to_string()),
        user_id: None,
        status: ArtifactStatus::Ready,
        request_id: "req-1".to_string(),
        format: Some("mp4".to_string()),
        storage_location: StorageLocation::S3,
        s3_url: Some(format!("s3://bucket/vod/T1/{hash}/{hash}.mp4")),
        size_bytes: Some(1024),
        manifest_path: None,
        error_message: None,
        started_at: None,
        ended_at: None,
        duration_seconds: None,
        retention_until: None,
        frozen_at: Some(now),
        created_at: now,
        updated_at: now,
    };
    env.artifacts.insert(&artifact).await.unwrap();

    let err = service
        .resolve_viewer_endpoint(ResolveViewerRequest {
            content_id: hash.to_string(),
            content_type: None,
            payment: None,
            client_ip: None,
        })
        .await
        .unwrap_err();

    match err {
        AppError::Defrosting { retry_after, .. } => assert!(retry_after > 0),
        other => panic!("expected Defrosting, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// tenant enforcement

#[tokio::test]
async fn terminate_tenant_streams_fans_out_by_node() {
    let env = test_env().await;
    let mut report = heartbeat("n1", &[NodeCapability::Ingest]);
    report.tenant_streams = HashMap::from([
        ("live+foo".to_string(), "T1".to_string()),
        ("live+bar".to_string(), "T1".to_string()),
        ("live+other".to_string(), "T2".to_string()),
    ]);
    env.directory.upsert_node(report).await.unwrap();

    let billing: Arc<dyn BillingClient> = Arc::new(MockBilling { suspended: true });
    let service = rao::services::TenantService::new(
        env.balancer.clone(),
        env.directory.clone(),
        AdmissionService::new(Some(billing), Duration::from_secs(30)),
        env.node_agent.clone(),
    );

    let result = service.terminate_tenant_streams("T1", "suspension").await.unwrap();
    assert_eq!(result.streams_terminated, 2);
    assert_eq!(result.sessions_terminated, 3);
    assert_eq!(
        result.stream_names,
        vec!["live+bar".to_string(), "live+foo".to_string()]
    );

    let calls = env.node_agent.calls();
    assert!(calls.iter().any(|c| c.starts_with("stop_sessions:n1:")));

    let excluded: HashSet<&str> = ["live+other"].into_iter().collect();
    assert!(result.stream_names.iter().all(|s| !excluded.contains(s.as_str())));
}
