use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::ai::GeminiClient;
use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::auth::SupabaseAuth;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::image::ImageLoader;
use crate::normalizer::{LinkProber, Normalizer};
use crate::types::{AnalysisRequest, AnalysisResult, Condition, RawAnalysisRequest};

pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub auth: SupabaseAuth,
    pub images: ImageLoader,
    pub gemini: GeminiClient,
    pub normalizer: Normalizer,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn from_config(cfg: Config) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.http_timeout_secs);
        let latency = Arc::new(LatencyStats::new());
        let links = LinkProber::new(
            cfg.probe_urls,
            Duration::from_secs(cfg.probe_timeout_secs),
            &cfg.probe_user_agent,
        )?;
        Ok(Self {
            auth: SupabaseAuth::new(timeout)?,
            images: ImageLoader::new(timeout, cfg.max_image_bytes)?,
            gemini: GeminiClient::new(&cfg.gemini_api_url, timeout, Arc::clone(&latency))?,
            normalizer: Normalizer::new(cfg.validate_schema, links),
            health: Arc::new(HealthState::new()),
            latency,
            config: Arc::new(cfg),
        })
    }
}

pub fn router(state: ApiState) -> Router {
    let max_body = state.config.max_body_bytes;
    Router::new()
        .route("/", post(analyze_product))
        .route("/analyze-product", post(analyze_product))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(from_fn(cors))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Answers preflights directly and tags every other response.
async fn cors(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        apply_cors(resp.headers_mut());
        return resp;
    }
    let mut resp = next.run(req).await;
    apply_cors(resp.headers_mut());
    resp
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn analyze_product(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<AnalysisResult>, AppError> {
    match run_analysis(&state, &headers, &body).await {
        Ok(result) => {
            state.health.record_success(now_ns());
            info!(
                verdict = ?result.verdict,
                product = %result.product_name,
                net_profit = result.net_profit,
                "analysis complete"
            );
            Ok(Json(result))
        }
        Err(e) => {
            state.health.record_failure();
            if e.status().is_server_error() {
                error!(status = e.status().as_u16(), "analysis failed: {e}");
            } else {
                warn!(status = e.status().as_u16(), "analysis rejected: {e}");
            }
            Err(e)
        }
    }
}

/// auth → body → request validation → AI call → normalize. First failure wins.
async fn run_analysis(state: &ApiState, headers: &HeaderMap, body: &[u8]) -> Result<AnalysisResult> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingAuthHeader)?;

    let cfg = &state.config;
    let (Some(project_url), Some(anon_key)) =
        (cfg.supabase_url.as_deref(), cfg.supabase_anon_key.as_deref())
    else {
        return Err(AppError::Config(
            "Server configuration error: Missing Supabase credentials".to_string(),
        ));
    };
    let client_key = cfg.supabase_service_key.as_deref().unwrap_or(anon_key);
    state.auth.verify(project_url, client_key, auth_header).await?;

    // A `null` body is treated as `{}`.
    let raw: RawAnalysisRequest = serde_json::from_slice::<Option<RawAnalysisRequest>>(body)
        .map_err(|e| AppError::InvalidBody(e.to_string()))?
        .unwrap_or_default();

    let api_key = cfg
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| AppError::Config("Gemini API key not configured".to_string()))?;

    let request = build_request(&state.images, raw).await?;
    let reply = state.gemini.analyze(api_key, &request).await?;
    state.normalizer.normalize(&reply, request.store_price).await
}

async fn build_request(images: &ImageLoader, raw: RawAnalysisRequest) -> Result<AnalysisRequest> {
    let store_price = store_price(raw.store_price.as_ref())?;
    let condition = Condition::parse(raw.condition.as_deref()).ok_or_else(|| {
        AppError::Validation("condition must be one of: Used, New, New in Box".to_string())
    })?;
    let image = images
        .resolve(raw.image_base64.as_deref(), raw.image_url.as_deref())
        .await?;
    let barcode = raw
        .barcode
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    Ok(AnalysisRequest {
        image,
        barcode,
        store_price,
        condition,
    })
}

fn store_price(v: Option<&Value>) -> Result<f64> {
    v.and_then(Value::as_f64)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| AppError::Validation("Valid store_price is required".to_string()))
}

async fn get_health(State(state): State<ApiState>) -> Json<Value> {
    let cfg = &state.config;
    Json(json!({
        "status": "ok",
        "ai_configured": cfg.gemini_api_key.is_some(),
        "auth_configured": cfg.supabase_url.is_some() && cfg.supabase_anon_key.is_some(),
        "requests_total": state.health.requests_total(),
        "requests_failed": state.health.requests_failed(),
        "last_success_at_ns": state.health.last_success_at_ns(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
