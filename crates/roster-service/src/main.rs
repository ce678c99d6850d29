use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::Parser;
use roster_core::{DerivedView, RecordField, SortDirection, SortSpec};
use roster_store_sqlite::{SqliteSnapshotStore, StoreError};
use roster_sync::{
    sqlite_session, ClientContext, ImportError, ImportSummary, RosterConfig, RosterSession,
    SessionStatus,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const MAX_WORKBOOK_BYTES: usize = 16 * 1024 * 1024;
const MAX_CLIENTS: usize = 4096;
const MAX_TOKEN_LEN: usize = 64;

type Session = RosterSession<SqliteSnapshotStore>;

/// The roster is shared; role, sign-in error and view controls are kept per client token.
#[derive(Clone)]
struct ServiceState {
    session: Arc<Mutex<Session>>,
    clients: Arc<Mutex<HashMap<String, ClientContext>>>,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    service_contract_version: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Returned whenever a client token is issued or confirmed.
#[derive(Debug, Clone, Serialize)]
struct ClientGrant {
    token: String,
    status: SessionStatus,
}

#[derive(Debug, Clone, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchRequest {
    term: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SortRequest {
    key: Option<String>,
    direction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToggleSortRequest {
    key: String,
}

#[derive(Debug, Parser)]
#[command(name = "roster-service")]
#[command(about = "Local HTTP service for the employee roster")]
struct Args {
    #[arg(long, default_value = "./roster.yaml")]
    config: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4010")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl ServiceState {
    fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn error(status: StatusCode, message: impl Into<String>) -> ServiceError {
        ServiceError {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            error: message.into(),
        }
    }

    /// Context for the presented token; requests without a known token act as a
    /// signed-out viewer with default controls.
    async fn context_for(&self, headers: &HeaderMap) -> ClientContext {
        let Some(token) = bearer_token(headers) else {
            return ClientContext::default();
        };
        self.clients.lock().await.get(&token).cloned().unwrap_or_default()
    }

    /// Token of a registered client, or 401.
    async fn known_token(&self, headers: &HeaderMap) -> Result<String, ServiceError> {
        let unauthorized = || {
            Self::error(
                StatusCode::UNAUTHORIZED,
                "client token required; request one from /v1/clients or /v1/auth/login",
            )
        };
        let token = bearer_token(headers).ok_or_else(unauthorized)?;
        if self.clients.lock().await.contains_key(&token) {
            Ok(token)
        } else {
            Err(unauthorized())
        }
    }

    async fn register(&self, context: ClientContext) -> Result<String, ServiceError> {
        let mut clients = self.clients.lock().await;
        if clients.len() >= MAX_CLIENTS {
            warn!(clients = clients.len(), "client registry full");
            return Err(Self::error(StatusCode::SERVICE_UNAVAILABLE, "too many clients"));
        }
        let token = Ulid::new().to_string();
        clients.insert(token.clone(), context);
        Ok(token)
    }

    /// Apply `change` to a registered client's context and return the updated copy.
    async fn update_client(
        &self,
        headers: &HeaderMap,
        change: impl FnOnce(&mut ClientContext),
    ) -> Result<ClientContext, ServiceError> {
        let token = self.known_token(headers).await?;
        let mut clients = self.clients.lock().await;
        let context = clients.entry(token).or_default();
        change(context);
        Ok(context.clone())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return None;
    }
    Some(token.to_string())
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope { service_contract_version: SERVICE_CONTRACT_VERSION, data }
}

fn import_error_status(err: &ImportError) -> StatusCode {
    match err {
        ImportError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        ImportError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        ImportError::Store(StoreError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
        ImportError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        ImportError::Store(StoreError::Backend(_)) => StatusCode::BAD_GATEWAY,
    }
}

fn parse_sort_key(raw: &str) -> Result<RecordField, ServiceError> {
    RecordField::parse(raw).ok_or_else(|| {
        ServiceState::error(StatusCode::BAD_REQUEST, format!("unknown sort key: {raw}"))
    })
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/clients", post(register_client))
        .route("/v1/status", get(status))
        .route("/v1/view", get(view))
        .route("/v1/auth/login", post(auth_login))
        .route("/v1/auth/logout", post(auth_logout))
        .route("/v1/import", post(import).layer(DefaultBodyLimit::max(MAX_WORKBOOK_BYTES)))
        .route("/v1/view/search", put(view_search))
        .route("/v1/view/sort", put(view_sort))
        .route("/v1/view/sort/toggle", post(view_sort_toggle))
        .route("/v1/notice/dismiss", post(notice_dismiss))
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = RosterConfig::load(&args.config)?;
    let mut session = sqlite_session(&config);
    session.start().await;
    info!(records = session.records().len(), "roster session ready");

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(bind = %args.bind, "roster service listening");
    axum::serve(listener, app(ServiceState::new(session))).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn register_client(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<ClientGrant>>, ServiceError> {
    let context = ClientContext::default();
    let status = state.session.lock().await.status_for(&context);
    let token = state.register(context).await?;
    Ok(Json(envelope(ClientGrant { token, status })))
}

async fn status(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Json<ServiceEnvelope<SessionStatus>> {
    let context = state.context_for(&headers).await;
    let session = state.session.lock().await;
    Json(envelope(session.status_for(&context)))
}

async fn view(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Json<ServiceEnvelope<DerivedView>> {
    let context = state.context_for(&headers).await;
    let session = state.session.lock().await;
    Json(envelope(session.view_with(&context.controls)))
}

/// Signs the presented client in, or issues a fresh administrator token when the request
/// carries none.
async fn auth_login(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ServiceEnvelope<ClientGrant>>, ServiceError> {
    let existing = state.known_token(&headers).await.ok();
    let mut context = state.context_for(&headers).await;

    let session = state.session.lock().await;
    let outcome = session.authenticate_for(&mut context, &request.username, &request.password);
    let status = session.status_for(&context);
    drop(session);

    if let Some(token) = &existing {
        state.clients.lock().await.insert(token.clone(), context.clone());
    }
    outcome.map_err(|err| ServiceState::error(StatusCode::UNAUTHORIZED, err.to_string()))?;

    let token = match existing {
        Some(token) => token,
        None => state.register(context).await?,
    };
    Ok(Json(envelope(ClientGrant { token, status })))
}

async fn auth_logout(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Result<Json<ServiceEnvelope<SessionStatus>>, ServiceError> {
    let context = state.update_client(&headers, ClientContext::logout).await?;
    let session = state.session.lock().await;
    Ok(Json(envelope(session.status_for(&context))))
}

async fn import(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ServiceEnvelope<ImportSummary>>, ServiceError> {
    let context = state.context_for(&headers).await;
    let mut session = state.session.lock().await;
    let summary = session
        .import_as(context.role, body.to_vec())
        .await
        .map_err(|err| ServiceState::error(import_error_status(&err), err.to_string()))?;
    Ok(Json(envelope(summary)))
}

async fn view_search(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ServiceEnvelope<DerivedView>>, ServiceError> {
    let context =
        state.update_client(&headers, |context| context.set_search_term(request.term)).await?;
    let session = state.session.lock().await;
    Ok(Json(envelope(session.view_with(&context.controls))))
}

async fn view_sort(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(request): Json<SortRequest>,
) -> Result<Json<ServiceEnvelope<DerivedView>>, ServiceError> {
    let sort = match request.key.as_deref() {
        None => None,
        Some(raw_key) => {
            let key = parse_sort_key(raw_key)?;
            let direction = match request.direction.as_deref() {
                None => SortDirection::Ascending,
                Some(raw) => SortDirection::parse(raw).ok_or_else(|| {
                    ServiceState::error(
                        StatusCode::BAD_REQUEST,
                        format!("unknown sort direction: {raw}"),
                    )
                })?,
            };
            Some(SortSpec { key, direction })
        }
    };

    let context = state.update_client(&headers, |context| context.set_sort(sort)).await?;
    let session = state.session.lock().await;
    Ok(Json(envelope(session.view_with(&context.controls))))
}

async fn view_sort_toggle(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(request): Json<ToggleSortRequest>,
) -> Result<Json<ServiceEnvelope<DerivedView>>, ServiceError> {
    let key = parse_sort_key(&request.key)?;
    let context = state
        .update_client(&headers, |context| {
            context.toggle_sort(key);
        })
        .await?;
    let session = state.session.lock().await;
    Ok(Json(envelope(session.view_with(&context.controls))))
}

async fn notice_dismiss(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Result<Json<ServiceEnvelope<SessionStatus>>, ServiceError> {
    let session = state.session.lock().await;
    let notice = session.notice().cloned();
    let context =
        state.update_client(&headers, |context| context.dismiss(notice.as_ref())).await?;
    Ok(Json(envelope(session.status_for(&context))))
}
