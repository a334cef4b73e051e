// Axum API Server Module
//
// Purpose: JSON API over the yield predictor, trained yield models, disease
// scanner, agronomy calculations and history store. Reference data and the
// detector are immutable and shared; history and models sit behind mutexes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::agronomy::{
    accumulated_gdd, assess_climate_risk, basic_yield_estimate, evapotranspiration_penman, field_report, growing_degree_days,
    water_balance, FieldConditions, DEFAULT_BASE_TEMPERATURE, DEFAULT_CLIMATE_CHANGE_FACTOR,
    DEFAULT_SOIL_CAPACITY_MM,
};
use crate::config::AppConfig;
use crate::disease::{ClassLabel, DiseaseDetector, OfflineClassifier, PrecomputedLabels, ScoringTable};
use crate::error::AgronomistError;
use crate::history::{HistoryKey, HistoryStore, Rating};
use crate::prediction::{PredictionForm, YieldPredictor, YieldQuery};
use crate::reference::ReferenceData;
use crate::yield_model::{ForestParams, ModelPrediction, ModelRegistry, TrainedModel, TrainingData, DEFAULT_MODEL};

/// Upper bound on queries per batch request
pub const MAX_BATCH_QUERIES: usize = 1000;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub reference: Arc<ReferenceData>,
    pub predictor: Arc<YieldPredictor>,
    pub detector: Arc<DiseaseDetector>,
    pub history: Arc<Mutex<HistoryStore>>,
    pub models: Arc<Mutex<ModelRegistry>>,
    /// Set when reference data failed to load; the service then runs with empty tables
    pub load_error: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        tracing::info!("Loading reference data...");
        let (reference, load_error) = match ReferenceData::load(&config.data_dir) {
            Ok(reference) => (reference, None),
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!("Reference data unavailable, predictions disabled: {}", message);
                (ReferenceData::empty(), Some(Arc::from(message)))
            }
        };

        tracing::info!("Initializing disease detector...");
        let table = match &config.scoring_table {
            Some(path) => ScoringTable::load(path)?,
            None => ScoringTable::default(),
        };
        let detector = DiseaseDetector::new(table, Arc::new(OfflineClassifier));

        tracing::info!("Opening history store...");
        let history = HistoryStore::open(&config.history_dir, config.storage_quota_bytes)
            .with_context(|| format!("Failed to open history directory {:?}", config.history_dir))?;

        tracing::info!("Loading trained models...");
        let models = ModelRegistry::open(&config.models_dir)
            .with_context(|| format!("Failed to open models directory {:?}", config.models_dir))?;

        let mut state = Self::from_parts(reference, detector, history, models);
        state.load_error = load_error;
        Ok(state)
    }

    pub fn from_parts(
        reference: ReferenceData,
        detector: DiseaseDetector,
        history: HistoryStore,
        models: ModelRegistry,
    ) -> Self {
        let reference = Arc::new(reference);
        Self {
            predictor: Arc::new(YieldPredictor::new(reference.clone())),
            reference,
            detector: Arc::new(detector),
            history: Arc::new(Mutex::new(history)),
            models: Arc::new(Mutex::new(models)),
            load_error: None,
        }
    }

    fn history(&self) -> Result<MutexGuard<'_, HistoryStore>, AppError> {
        self.history
            .lock()
            .map_err(|_| AppError::Internal("history store lock poisoned".to_string()))
    }

    fn models(&self) -> Result<MutexGuard<'_, ModelRegistry>, AppError> {
        self.models
            .lock()
            .map_err(|_| AppError::Internal("model registry lock poisoned".to_string()))
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Yield prediction
        .route("/api/predict", post(predict))
        .route("/api/predict/batch", post(predict_batch))
        .route("/api/predict/comprehensive", post(predict_comprehensive))
        .route("/api/reference/warnings", get(reference_warnings))

        // Trained yield models
        .route("/api/ml/train", post(train_model))
        .route("/api/ml/predict", post(predict_with_model))
        .route("/api/models", get(list_models))

        // Plant scanner
        .route("/api/scan", post(scan))

        // History and feedback
        .route("/api/history/predictions", get(list_predictions).delete(clear_predictions))
        .route("/api/history/scans", get(list_scans).delete(clear_scans))
        .route("/api/feedback", post(submit_feedback))
        .route("/api/feedback/accuracy", get(feedback_accuracy))

        // Agronomy calculators
        .route("/api/compute/gdd", post(compute_gdd))
        .route("/api/compute/water-balance", post(compute_water_balance))
        .route("/api/compute/climate-risk", post(compute_climate_risk))
        .route("/api/compute/basic-yield", post(compute_basic_yield))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "rules": state.reference.rules().len(),
        "reference_error": state.load_error.as_deref(),
        "classifier": state.detector.classifier_name(),
        "models": state.models.lock().map(|m| m.len()).ok(),
    }))
}

/// Validate the form, then predict. Blocking issues answer 422.
async fn predict(
    State(state): State<AppState>,
    Json(form): Json<PredictionForm>,
) -> Result<Response, AppError> {
    let today = chrono::Utc::now().date_naive();
    let validation = form.validate(today);
    let warnings: Vec<_> = validation.warnings().cloned().collect();

    let Some(input) = validation.input.as_ref() else {
        let errors: Vec<_> = validation.errors().cloned().collect();
        tracing::debug!("Prediction form rejected with {} error(s)", errors.len());
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "Form has blocking errors",
                "issues": errors,
                "warnings": warnings,
            })),
        )
            .into_response());
    };

    let prediction = state
        .predictor
        .predict_in(input.region.as_deref(), &input.soil, &input.crop, input.rainfall);

    let Some(prediction) = prediction else {
        return Ok(Json(serde_json::json!({
            "prediction": null,
            "message": format!("No prediction available for {} on {} soil", input.crop, input.soil),
            "warnings": warnings,
            "reference_error": state.load_error.as_deref(),
        }))
        .into_response());
    };

    let saved = state.history()?.record_prediction(&prediction, Some(input.planting_date));
    let record_id = saved.is_saved().then_some(saved.record.id);

    Ok(Json(serde_json::json!({
        "prediction": prediction,
        "record_id": record_id,
        "warnings": warnings,
    }))
    .into_response())
}

async fn predict_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchPredictRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = payload.queries.len();
    if count > MAX_BATCH_QUERIES {
        return Err(AppError::BadRequest(format!(
            "Batch of {} exceeds the limit of {} queries",
            count, MAX_BATCH_QUERIES
        )));
    }

    tracing::info!("Batch prediction for {} queries", count);

    // Rayon work runs on the blocking pool
    let predictor = state.predictor.clone();
    let results = tokio::task::spawn_blocking(move || predictor.predict_batch(&payload.queries))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    let matched = results.iter().filter(|r| r.is_some()).count();
    Ok(Json(serde_json::json!({
        "count": count,
        "matched": matched,
        "results": results,
    })))
}

async fn predict_comprehensive(
    State(state): State<AppState>,
    Json(conditions): Json<FieldConditions>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = field_report(&state.predictor, &conditions)?;

    // Only a trained default model adds anything over the rule-based figures
    let trained = state.models()?.get(DEFAULT_MODEL);
    let ml_prediction: Option<ModelPrediction> = trained.and_then(|model| {
        model
            .predict(&conditions.model_features(&report))
            .map_err(|e| tracing::debug!("Default model skipped for comprehensive report: {}", e))
            .ok()
    });

    let message = report
        .prediction
        .is_none()
        .then(|| format!("No prediction available for {} on {} soil", conditions.crop, conditions.soil_type));

    Ok(Json(serde_json::json!({
        "report": report,
        "ml_prediction": ml_prediction,
        "message": message,
    })))
}

/// Fit a forest on the blocking pool, then persist and register it
async fn train_model(
    State(state): State<AppState>,
    Json(payload): Json<TrainRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let data = TrainingData::new(payload.features, payload.target_yields)?;
    let name = payload.model_name;
    let params = payload.params;

    tracing::info!("Training model '{}' on {} samples", name, data.len());

    let model = tokio::task::spawn_blocking(move || TrainedModel::train(&name, &data, &params))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let model = state.models()?.insert(model)?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "summary": model.summary(),
    })))
}

async fn predict_with_model(
    State(state): State<AppState>,
    Json(payload): Json<ModelPredictRequest>,
) -> Result<Json<ModelPrediction>, AppError> {
    let prediction = state.models()?.predict(&payload.model_name, &payload.features)?;
    Ok(Json(prediction))
}

async fn list_models(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let models = state.models()?;
    Ok(Json(serde_json::json!({
        "models": models.names().collect::<Vec<_>>(),
        "metadata": models.metadata(),
    })))
}

async fn reference_warnings(State(state): State<AppState>) -> impl IntoResponse {
    let warnings = state.reference.warnings();
    Json(serde_json::json!({
        "count": warnings.len(),
        "warnings": warnings,
        "reference_error": state.load_error.as_deref(),
    }))
}

/// Decode a base64 image (optionally a data URL), scan it, and log the result
async fn scan(
    State(state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let encoded = payload
        .image
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(&payload.image);
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("Image is not valid base64: {}", e)))?;

    tracing::info!("Scanning image ({} bytes)", bytes.len());

    let detector = state.detector.clone();
    let labels = payload.labels;
    let report = tokio::task::spawn_blocking(move || match labels {
        Some(labels) => detector.analyze_bytes_with(&bytes, &PrecomputedLabels::new(labels)),
        None => detector.analyze_bytes(&bytes),
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let scan_id = if payload.save {
        let saved = state.history()?.record_scan(&report);
        saved.is_saved().then_some(saved.record.id)
    } else {
        None
    };

    Ok(Json(serde_json::json!({
        "scan_id": scan_id,
        "report": report,
    })))
}

async fn list_predictions(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let history = state.history()?;
    let log = history.predictions();
    Ok(Json(serde_json::json!({
        "count": log.len(),
        "capacity": log.capacity(),
        "entries": log.newest_first().collect::<Vec<_>>(),
    })))
}

async fn clear_predictions(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cleared = state.history()?.clear(HistoryKey::Predictions, params.confirm)?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

async fn list_scans(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let history = state.history()?;
    let log = history.scans();
    Ok(Json(serde_json::json!({
        "count": log.len(),
        "capacity": log.capacity(),
        "entries": log.newest_first().collect::<Vec<_>>(),
    })))
}

async fn clear_scans(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cleared = state.history()?.clear(HistoryKey::Scans, params.confirm)?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Response, AppError> {
    let mut history = state.history()?;
    let saved = history.record_feedback(payload.scan_id, payload.rating);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "feedback": saved.record,
            "saved": saved.is_saved(),
            "accuracy_rate": history.accuracy_rate(),
        })),
    )
        .into_response())
}

async fn feedback_accuracy(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let history = state.history()?;
    Ok(Json(serde_json::json!({
        "count": history.feedback().len(),
        "accuracy_rate": history.accuracy_rate(),
    })))
}

/// Single day from min/max, or a season total from `days`
async fn compute_gdd(
    State(state): State<AppState>,
    Json(payload): Json<GddRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let base_temperature = payload
        .base_temperature
        .or_else(|| {
            payload
                .crop
                .as_deref()
                .and_then(|crop| state.reference.crop_profile(crop))
                .map(|p| p.base_temperature)
        })
        .unwrap_or(DEFAULT_BASE_TEMPERATURE);

    let gdd = match (&payload.days, payload.temperature_min, payload.temperature_max) {
        (Some(days), _, _) => accumulated_gdd(days, base_temperature),
        (None, Some(t_min), Some(t_max)) => growing_degree_days(t_min, t_max, base_temperature),
        _ => {
            return Err(AppError::BadRequest(
                "Provide temperature_min and temperature_max, or a list of days".to_string(),
            ))
        }
    };

    Ok(Json(serde_json::json!({
        "gdd": gdd,
        "base_temperature": base_temperature,
    })))
}

async fn compute_water_balance(Json(payload): Json<WaterBalanceRequest>) -> Result<Json<serde_json::Value>, AppError> {
    let et = match (payload.evapotranspiration, &payload.penman) {
        (Some(et), _) => et,
        (None, Some(p)) => evapotranspiration_penman(p.temperature, p.humidity, p.wind_speed, p.radiation),
        (None, None) => {
            return Err(AppError::BadRequest(
                "Provide evapotranspiration or penman inputs".to_string(),
            ))
        }
    };
    if !payload.rainfall.is_finite() || payload.rainfall < 0.0 || !et.is_finite() {
        return Err(AppError::BadRequest("rainfall and evapotranspiration must be non-negative numbers".to_string()));
    }

    let balance = water_balance(payload.rainfall, et, payload.soil_capacity);
    Ok(Json(serde_json::json!({
        "evapotranspiration": et,
        "water_balance": balance,
    })))
}

async fn compute_climate_risk(Json(payload): Json<ClimateRiskRequest>) -> Result<Json<serde_json::Value>, AppError> {
    let assessment = assess_climate_risk(&payload.temperatures, &payload.rainfall, payload.climate_change_factor)?;
    Ok(Json(serde_json::to_value(assessment).map_err(|e| AppError::Internal(e.to_string()))?))
}

async fn compute_basic_yield(Json(payload): Json<BasicYieldRequest>) -> Result<Json<serde_json::Value>, AppError> {
    let temperature = match (payload.temperature_avg, payload.temperature_min, payload.temperature_max) {
        (Some(avg), _, _) => avg,
        (None, Some(t_min), Some(t_max)) => (t_min + t_max) / 2.0,
        _ => {
            return Err(AppError::BadRequest(
                "Provide temperature_avg, or temperature_min and temperature_max".to_string(),
            ))
        }
    };
    if ![temperature, payload.rainfall, payload.soil_ph].iter().all(|v| v.is_finite()) {
        return Err(AppError::BadRequest("temperature, rainfall and soil_ph must be numbers".to_string()));
    }

    let estimate = basic_yield_estimate(temperature, payload.rainfall, payload.soil_ph);
    Ok(Json(serde_json::json!({
        "temperature_avg": temperature,
        "estimate": estimate,
    })))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
struct BatchPredictRequest {
    queries: Vec<YieldQuery>,
}

#[derive(Deserialize)]
struct TrainRequest {
    features: Vec<Vec<f64>>,
    target_yields: Vec<f64>,
    #[serde(default = "default_model_name")]
    model_name: String,
    #[serde(default)]
    params: ForestParams,
}

#[derive(Deserialize)]
struct ModelPredictRequest {
    features: Vec<f64>,
    #[serde(default = "default_model_name")]
    model_name: String,
}

fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Deserialize)]
struct ScanRequest {
    /// Base64 image bytes or a `data:image/...;base64,` URL
    image: String,
    /// Labels from an external classifier, best first
    #[serde(default)]
    labels: Option<Vec<ClassLabel>>,
    #[serde(default = "default_true")]
    save: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct ClearParams {
    #[serde(default)]
    confirm: bool,
}

#[derive(Deserialize)]
struct FeedbackRequest {
    scan_id: Uuid,
    rating: Rating,
}

#[derive(Deserialize)]
struct GddRequest {
    temperature_min: Option<f64>,
    temperature_max: Option<f64>,
    /// (t_min, t_max) per day
    days: Option<Vec<(f64, f64)>>,
    base_temperature: Option<f64>,
    /// Base temperature taken from the crop profile when not given
    crop: Option<String>,
}

#[derive(Deserialize)]
struct PenmanInputs {
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    radiation: f64,
}

#[derive(Deserialize)]
struct WaterBalanceRequest {
    rainfall: f64,
    evapotranspiration: Option<f64>,
    penman: Option<PenmanInputs>,
    #[serde(default = "default_soil_capacity")]
    soil_capacity: f64,
}

fn default_soil_capacity() -> f64 {
    DEFAULT_SOIL_CAPACITY_MM
}

#[derive(Deserialize)]
struct ClimateRiskRequest {
    temperatures: Vec<f64>,
    rainfall: Vec<f64>,
    #[serde(default = "default_climate_change_factor")]
    climate_change_factor: f64,
}

fn default_climate_change_factor() -> f64 {
    DEFAULT_CLIMATE_CHANGE_FACTOR
}

#[derive(Deserialize)]
struct BasicYieldRequest {
    temperature_avg: Option<f64>,
    temperature_min: Option<f64>,
    temperature_max: Option<f64>,
    rainfall: f64,
    #[serde(default = "default_soil_ph")]
    soil_ph: f64,
}

fn default_soil_ph() -> f64 {
    crate::agronomy::basic_estimate::OPTIMAL_SOIL_PH
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<AgronomistError> for AppError {
    fn from(e: AgronomistError) -> Self {
        match e {
            AgronomistError::InvalidInput(_) | AgronomistError::ImageDecode(_) | AgronomistError::EmptyImage => {
                AppError::BadRequest(e.to_string())
            }
            AgronomistError::ModelNotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
