mod attribution;
mod backfill;
mod contacts;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use salesops_attribution::AttributionConfig;
use salesops_config::{init_tracing, AppConfig};
use salesops_db::accounts::pg_repository::PgAccountRepository;
use salesops_db::appointments::pg_repository::PgAppointmentRepository;
use salesops_db::attribution::pg_repository::PgAttributionRepository;
use salesops_db::contacts::pg_repository::PgContactRepository;
use salesops_db::dials::pg_repository::PgDialRepository;
use salesops_db::sync::pg_repository::PgSyncCheckpointRepository;
use salesops_sync::appointments::AppointmentBackfiller;
use salesops_sync::calls::CallBackfiller;
use salesops_sync::contacts::ContactSyncer;
use salesops_sync::ghl::{resolve_session, GhlClient, GhlClientConfig, GhlSession, GhlTokenExchanger};
use salesops_sync::token::TokenManager;
use salesops_sync::SyncResult;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const SERVICE_NAME: &str = "salesops-api";

pub type GhlTokens = TokenManager<PgAccountRepository, GhlTokenExchanger>;

#[derive(Clone)]
pub struct AppState {
    pub accounts: PgAccountRepository,
    /// Shared so concurrent requests refresh a token only once.
    pub ghl_tokens: Arc<GhlTokens>,
    pub ghl_client: GhlClient,
    pub contacts: PgContactRepository,
    pub appointments: PgAppointmentRepository,
    pub dials: PgDialRepository,
    pub checkpoints: PgSyncCheckpointRepository,
    pub attribution: PgAttributionRepository,
    pub attribution_config: AttributionConfig,
}

impl AppState {
    pub fn new(pool: PgPool, ghl_config: GhlClientConfig) -> Result<Self, reqwest::Error> {
        let accounts = PgAccountRepository::new(pool.clone());
        let exchanger = GhlTokenExchanger::new(&ghl_config)?;
        Ok(Self {
            ghl_tokens: Arc::new(TokenManager::new(accounts.clone(), exchanger)),
            accounts,
            ghl_client: GhlClient::new(ghl_config)?,
            contacts: PgContactRepository::new(pool.clone()),
            appointments: PgAppointmentRepository::new(pool.clone()),
            dials: PgDialRepository::new(pool.clone()),
            checkpoints: PgSyncCheckpointRepository::new(pool.clone()),
            attribution: PgAttributionRepository::new(pool),
            attribution_config: AttributionConfig::default(),
        })
    }

    pub async fn ghl_session(&self, account_id: Uuid) -> SyncResult<GhlSession> {
        resolve_session(&self.accounts, self.ghl_tokens.as_ref(), account_id).await
    }

    pub fn contact_syncer(&self) -> ContactSyncer<PgContactRepository, PgSyncCheckpointRepository> {
        ContactSyncer::new(
            self.ghl_client.clone(),
            self.contacts.clone(),
            self.checkpoints.clone(),
        )
    }

    pub fn appointment_backfiller(
        &self,
    ) -> AppointmentBackfiller<PgContactRepository, PgAppointmentRepository> {
        AppointmentBackfiller::new(
            self.ghl_client.clone(),
            self.contacts.clone(),
            self.appointments.clone(),
        )
    }

    pub fn call_backfiller(&self) -> CallBackfiller<PgDialRepository> {
        CallBackfiller::new(self.ghl_client.clone(), self.dials.clone())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(contacts::router())
        .merge(backfill::router())
        .merge(attribution::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("failed to load config");
    init_tracing(&config.log_level);
    tracing::info!(service = SERVICE_NAME, "starting");

    let pool = salesops_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("failed to create database pool");

    let ghl_config = GhlClientConfig::from_env();
    if ghl_config.client_id.is_none() {
        tracing::warn!("GHL_CLIENT_ID not set, OAuth tokens will not be refreshed");
    }
    let state = AppState::new(pool, ghl_config).expect("failed to build HTTP clients");

    let app = build_router(state, &config.cors_origins);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
