use crate::config;
use crate::export;
use crate::processor::{self, MaxPain};
use crate::ranking;
use crate::screener::{ScreenReport, Screener};
use crate::source::MarketDataSource;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MaxPainQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScreenQuery {
    /// Comma separated; empty screens the whole universe.
    #[serde(default)]
    pub symbols: Option<String>,
    pub top_n: Option<usize>,
    pub min_deviation: Option<f64>,
    /// Case-insensitive symbol substring.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn err(error: impl ToString, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutPoint {
    pub strike: f64,
    pub payout: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaxPainResponse {
    pub symbol: String,
    pub expiry: Option<String>,
    pub underlying_value: Option<f64>,
    pub strike_count: usize,
    pub max_pain: MaxPain,
    pub payout_curve: Vec<PayoutPoint>,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    screener: Arc<Screener<dyn MarketDataSource>>,
}

impl AppState {
    pub fn new(screener: Screener<dyn MarketDataSource>) -> Self {
        Self {
            screener: Arc::new(screener),
        }
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /api/health
async fn get_health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(
        HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Instant::now(),
    ))
}

/// GET /api/max-pain?symbol=INFY
async fn get_max_pain(
    Query(query): Query<MaxPainQuery>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<MaxPainResponse>> {
    let start_time = Instant::now();
    let symbol = query.symbol.trim().to_uppercase();

    match app_state.screener.source().fetch_option_chain(&symbol).await {
        Ok(snapshot) => {
            let payout_curve = processor::payout_curve(&snapshot.strikes)
                .into_iter()
                .map(|(strike, payout)| PayoutPoint { strike, payout })
                .collect::<Vec<_>>();

            Json(ApiResponse::ok(
                MaxPainResponse {
                    symbol,
                    expiry: snapshot.expiry.clone(),
                    underlying_value: snapshot.underlying_value,
                    strike_count: payout_curve.len(),
                    max_pain: processor::process_snapshot(&snapshot),
                    payout_curve,
                },
                start_time,
            ))
        }
        Err(e) => Json(ApiResponse::err(e, start_time)),
    }
}

async fn screen(app_state: &AppState, query: &ScreenQuery) -> crate::error::Result<ScreenReport> {
    let symbols = query
        .symbols
        .as_deref()
        .map(config::parse_symbol_list)
        .unwrap_or_default();

    let mut report = if symbols.is_empty() {
        app_state.screener.run_universe().await?
    } else {
        app_state.screener.run(&symbols).await
    };

    if let Some(top_n) = query.top_n {
        report.rankings = ranking::build_rankings(&report.results, top_n);
    }
    if let Some(min_deviation) = query.min_deviation.filter(|v| *v > 0.0) {
        report.results = ranking::filter_by_min_deviation(&report.results, min_deviation);
        ranking::sort_by_abs_deviation(&mut report.results);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        report.results = ranking::filter_by_symbol(&report.results, search);
    }

    Ok(report)
}

/// GET /api/screen?symbols=INFY,TCS&top_n=5&min_deviation=2&search=inf
async fn get_screen(
    Query(query): Query<ScreenQuery>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<ScreenReport>> {
    let start_time = Instant::now();
    match screen(&app_state, &query).await {
        Ok(report) => Json(ApiResponse::ok(report, start_time)),
        Err(e) => Json(ApiResponse::err(e, start_time)),
    }
}

/// GET /api/screen.csv?symbols=INFY,TCS
async fn get_screen_csv(
    Query(query): Query<ScreenQuery>,
    State(app_state): State<AppState>,
) -> Response {
    let csv = match screen(&app_state, &query).await {
        Ok(report) => export::to_csv_string(&report.results),
        Err(e) => Err(e),
    };

    match csv {
        Ok(body) => ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/max-pain", get(get_max_pain))
        .route("/api/screen", get(get_screen))
        .route("/api/screen.csv", get(get_screen_csv))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(port: u16, app_state: AppState) -> Result<()> {
    let app = router(app_state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, "screener API listening");
    println!("Screener API running on http://{}", addr);
    println!("Available endpoints:");
    println!("   GET  /api/health");
    println!("   GET  /api/max-pain?symbol=INFY");
    println!("   GET  /api/screen?symbols=INFY,TCS&top_n=5&min_deviation=2&search=inf");
    println!("   GET  /api/screen.csv?symbols=INFY,TCS");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
