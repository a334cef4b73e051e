// API Integration Tests
//
// Purpose: Exercise every endpoint against the shipped reference data and a
// temporary history directory
// Run with: cargo test --features api --test api_integration_tests

#[cfg(feature = "api")]
mod api_tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{Rgb, RgbImage};
    use mini_agronomist::{
        create_router, AppConfig, AppState, DiseaseDetector, HistoryStore, ModelRegistry, ReferenceData,
    };
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt; // for oneshot

    // Helper: Router over data/ with a throwaway history directory
    fn create_test_app() -> (Router, TempDir) {
        let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
        let reference = ReferenceData::load(&data_dir).expect("reference data loads");
        let history_dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::open(history_dir.path(), 5 * 1024 * 1024).unwrap();
        let models = ModelRegistry::open(history_dir.path().join("models")).unwrap();

        let state = AppState::from_parts(reference, DiseaseDetector::default(), history, models);
        (create_router(state), history_dir)
    }

    // Helper: Send one request and parse the JSON response
    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn png_base64(image: RgbImage) -> String {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    fn healthy_leaf() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, _| {
            let bump = if x % 4 == 2 { 3 } else { 0 };
            Rgb([60 + bump, 160 + bump, 60 + bump])
        })
    }

    fn rusty_leaf() -> RgbImage {
        RgbImage::from_fn(32, 32, |x, _| {
            let bump = if x % 4 == 2 { 3 } else { 0 };
            Rgb([200 + bump, 120 + bump, 80 + bump])
        })
    }

    fn future_date() -> String {
        (chrono::Utc::now().date_naive() + chrono::Days::new(30)).to_string()
    }

    // =========================================================================
    // Section 1: Health Check
    // =========================================================================

    #[tokio::test]
    async fn test_health_check() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
        assert_eq!(body["classifier"], "offline");
        assert!(body["reference_error"].is_null());
    }

    #[tokio::test]
    async fn test_missing_reference_data_disables_predictions() {
        let data_dir = tempfile::tempdir().unwrap();
        let history_dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: data_dir.path().to_path_buf(),
            history_dir: history_dir.path().to_path_buf(),
            models_dir: history_dir.path().join("models"),
            ..AppConfig::default()
        };
        let app = create_router(AppState::new(&config).expect("state builds without reference data"));

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rules"], 0);
        assert!(body["reference_error"].as_str().unwrap().contains("crop_rules.json"));

        let form = json!({"soil": "loam", "crop": "maize", "rainfall": 75, "planting_date": future_date()});
        let (status, body) = send(&app, Method::POST, "/api/predict", Some(form)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["prediction"].is_null());
        assert!(body["reference_error"].is_string());
    }

    // =========================================================================
    // Section 2: Yield Prediction
    // =========================================================================

    #[tokio::test]
    async fn test_predict_within_window() {
        let (app, _dir) = create_test_app();
        let form = json!({"soil": "loam", "crop": "maize", "rainfall": 75, "planting_date": future_date()});
        let (status, body) = send(&app, Method::POST, "/api/predict", Some(form)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"]["yield_estimate"], 3.5);
        assert_eq!(body["prediction"]["risk_level"], 0.2);
        assert_eq!(body["prediction"]["risk_band"], "good");
        assert!(body["record_id"].is_string());
    }

    #[tokio::test]
    async fn test_predict_missing_rule_is_not_an_error() {
        let (app, _dir) = create_test_app();
        let form = json!({"soil": "sand", "crop": "wheat", "rainfall": 30, "planting_date": future_date()});
        let (status, body) = send(&app, Method::POST, "/api/predict", Some(form)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["prediction"].is_null());
        assert!(body["message"].as_str().unwrap().contains("No prediction available"));
    }

    #[tokio::test]
    async fn test_predict_form_errors_block() {
        let (app, _dir) = create_test_app();
        let form = json!({"soil": "loam", "rainfall": -5, "planting_date": "not-a-date"});
        let (status, body) = send(&app, Method::POST, "/api/predict", Some(form)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, ["crop", "rainfall", "planting_date"]);
    }

    #[tokio::test]
    async fn test_predict_warnings_do_not_block() {
        let (app, _dir) = create_test_app();
        let form = json!({"soil": "loam", "crop": "maize", "rainfall": 600, "planting_date": future_date()});
        let (status, body) = send(&app, Method::POST, "/api/predict", Some(form)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(body["prediction"]["risk_level"], 0.5);
    }

    #[tokio::test]
    async fn test_predict_batch() {
        let (app, _dir) = create_test_app();
        let payload = json!({"queries": [
            {"crop": "maize", "soil": "loam", "rainfall": 40},
            {"crop": "wheat", "soil": "sand", "rainfall": 30},
            {"region": "south_asia", "crop": "rice", "soil": "clay", "rainfall": 120}
        ]});
        let (status, body) = send(&app, Method::POST, "/api/predict/batch", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["matched"], 2);
        assert_eq!(body["results"][0]["yield_estimate"], 3.0);
        assert!(body["results"][1].is_null());
        assert_eq!(body["results"][2]["region"], "south_asia");
    }

    #[tokio::test]
    async fn test_predict_comprehensive() {
        let (app, _dir) = create_test_app();
        let payload = json!({
            "crop": "maize", "region": "east_africa", "soil_type": "loam",
            "temperature_min": 16, "temperature_max": 30, "rainfall": 75, "soil_ph": 6.2
        });
        let (status, body) = send(&app, Method::POST, "/api/predict/comprehensive", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["gdd"], 13.0);
        assert_eq!(body["report"]["prediction"]["yield_estimate"], 3.5);
        assert_eq!(body["report"]["crop_fit"]["soil_ph"]["fit"], "within");
        assert_eq!(body["report"]["region_climate"]["tier"], "tropical");
        assert!(body["message"].is_null());
    }

    #[tokio::test]
    async fn test_predict_comprehensive_rejects_bad_ph() {
        let (app, _dir) = create_test_app();
        let payload = json!({
            "crop": "maize", "region": "east_africa", "soil_type": "loam",
            "temperature_min": 16, "temperature_max": 30, "rainfall": 75, "soil_ph": 13
        });
        let (status, body) = send(&app, Method::POST, "/api/predict/comprehensive", Some(payload)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_comprehensive_uses_trained_default_model() {
        let (app, _dir) = create_test_app();
        let payload = json!({
            "crop": "maize", "region": "east_africa", "soil_type": "loam",
            "temperature_min": 16, "temperature_max": 30, "rainfall": 75, "soil_ph": 6.2
        });
        let (_, body) = send(&app, Method::POST, "/api/predict/comprehensive", Some(payload.clone())).await;
        assert!(body["ml_prediction"].is_null());
        assert!(body["report"]["basic_estimate"]["estimated_yield"].is_number());

        // Five features: avg temp, rainfall, pH, GDD, soil moisture
        let features: Vec<Value> = (0..20)
            .map(|i| json!([20 + i % 5, 50 + 5 * i, 6.5, 10 + i % 5, 40]))
            .collect();
        let targets: Vec<f64> = (0..20).map(|i| 2.0 + 0.1 * i as f64).collect();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/ml/train",
            Some(json!({"features": features, "target_yields": targets, "params": {"n_estimators": 10}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::POST, "/api/predict/comprehensive", Some(payload)).await;
        assert_eq!(body["ml_prediction"]["source"], "trained");
        assert_eq!(body["ml_prediction"]["model_name"], "default");
    }

    #[tokio::test]
    async fn test_reference_warnings() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(&app, Method::GET, "/api/reference/warnings", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    // =========================================================================
    // Section 3: Plant Scanner and Feedback
    // =========================================================================

    #[tokio::test]
    async fn test_scan_offline_and_feedback() {
        let (app, _dir) = create_test_app();
        let payload = json!({"image": png_base64(rusty_leaf())});
        let (status, body) = send(&app, Method::POST, "/api/scan", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["offline"], true);
        assert_eq!(body["report"]["diseases"][0]["disease_name"], "Rust");
        assert_eq!(body["report"]["diseases"][0]["method"], "Color Analysis");
        let scan_id = body["scan_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/feedback",
            Some(json!({"scan_id": scan_id, "rating": "partial"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["accuracy_rate"], 0.5);

        let (_, body) = send(&app, Method::GET, "/api/feedback/accuracy", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["accuracy_rate"], 0.5);
    }

    #[tokio::test]
    async fn test_feedback_survives_unwritable_history() {
        let (app, dir) = create_test_app();
        std::fs::create_dir(dir.path().join("feedback.json")).unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/feedback",
            Some(json!({"scan_id": uuid::Uuid::new_v4(), "rating": "accurate"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["saved"], false);
        assert!(body["accuracy_rate"].is_null());
    }

    #[tokio::test]
    async fn test_scan_with_classifier_labels() {
        let (app, _dir) = create_test_app();
        let payload = json!({
            "image": format!("data:image/png;base64,{}", png_base64(rusty_leaf())),
            "labels": [{"label": "orange rust", "probability": 0.7}],
            "save": false
        });
        let (status, body) = send(&app, Method::POST, "/api/scan", Some(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["offline"], false);
        assert_eq!(body["report"]["diseases"][0]["method"], "AI + Color Analysis");
        assert!(body["scan_id"].is_null());
    }

    #[tokio::test]
    async fn test_scan_healthy_leaf() {
        let (app, _dir) = create_test_app();
        let payload = json!({"image": png_base64(healthy_leaf())});
        let (_, body) = send(&app, Method::POST, "/api/scan", Some(payload)).await;

        assert_eq!(body["report"]["diseases"].as_array().unwrap().len(), 0);
        assert_eq!(body["report"]["health_score"], 1.0);
        assert_eq!(body["report"]["status"], "healthy_or_minor");
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_payloads() {
        let (app, _dir) = create_test_app();

        let (status, _) = send(&app, Method::POST, "/api/scan", Some(json!({"image": "%%%"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let not_an_image = STANDARD.encode(b"hello");
        let (status, body) = send(&app, Method::POST, "/api/scan", Some(json!({"image": not_an_image}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("decoded"));
    }

    #[tokio::test]
    async fn test_accuracy_empty() {
        let (app, _dir) = create_test_app();
        let (_, body) = send(&app, Method::GET, "/api/feedback/accuracy", None).await;
        assert!(body["accuracy_rate"].is_null());
    }

    // =========================================================================
    // Section 4: History
    // =========================================================================

    #[tokio::test]
    async fn test_history_list_and_clear() {
        let (app, _dir) = create_test_app();
        for rainfall in [40, 75, 120] {
            let form = json!({"soil": "loam", "crop": "maize", "rainfall": rainfall, "planting_date": future_date()});
            send(&app, Method::POST, "/api/predict", Some(form)).await;
        }

        let (_, body) = send(&app, Method::GET, "/api/history/predictions", None).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["capacity"], 10);
        // newest first
        assert_eq!(body["entries"][0]["rainfall"], 120.0);

        let (status, _) = send(&app, Method::DELETE, "/api/history/predictions", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::DELETE, "/api/history/predictions?confirm=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 3);

        let (_, body) = send(&app, Method::GET, "/api/history/predictions", None).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_scan_history() {
        let (app, _dir) = create_test_app();
        send(&app, Method::POST, "/api/scan", Some(json!({"image": png_base64(healthy_leaf())}))).await;

        let (_, body) = send(&app, Method::GET, "/api/history/scans", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["capacity"], 100);

        let (_, body) = send(&app, Method::DELETE, "/api/history/scans?confirm=true", None).await;
        assert_eq!(body["cleared"], 1);
    }

    // =========================================================================
    // Section 5: Agronomy Calculators
    // =========================================================================

    #[tokio::test]
    async fn test_compute_gdd() {
        let (app, _dir) = create_test_app();

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/compute/gdd",
            Some(json!({"temperature_min": 15, "temperature_max": 25})),
        )
        .await;
        assert_eq!(body["gdd"], 10.0);

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/compute/gdd",
            Some(json!({"days": [[15, 25], [0, 6]], "crop": "beans"})),
        )
        .await;
        // beans base temperature is 8
        assert_eq!(body["base_temperature"], 8.0);
        assert_eq!(body["gdd"], 12.0);

        let (status, _) = send(&app, Method::POST, "/api/compute/gdd", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compute_water_balance() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/compute/water-balance",
            Some(json!({"rainfall": 20, "evapotranspiration": 50})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["water_balance"]["deficit"], 30.0);
        assert_eq!(body["water_balance"]["water_stress"], 0.6);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/compute/water-balance",
            Some(json!({"rainfall": 20, "penman": {"temperature": 25, "humidity": 60, "wind_speed": 2, "radiation": 15}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["evapotranspiration"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_compute_climate_risk() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/compute/climate-risk",
            Some(json!({"temperatures": [30, 34.5, 36, 28], "rainfall": [40, 50, 120, 80]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"]["extreme_heat_days"], 1);
        assert_eq!(body["projected"]["projected_extreme_heat"], 2);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/compute/climate-risk",
            Some(json!({"temperatures": [], "rainfall": [10]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // =========================================================================
    // Section 6: Trained Yield Models
    // =========================================================================

    fn training_payload(name: &str) -> Value {
        let features: Vec<Value> = (0..30).map(|i| json!([20 + i % 5, 20 * i])).collect();
        let targets: Vec<f64> = (0..30).map(|i| 1.0 + 0.1 * i as f64).collect();
        json!({
            "features": features,
            "target_yields": targets,
            "model_name": name,
            "params": {"n_estimators": 20}
        })
    }

    #[tokio::test]
    async fn test_train_predict_and_list_models() {
        let (app, _dir) = create_test_app();

        let (status, body) = send(&app, Method::POST, "/api/ml/train", Some(training_payload("maize_east"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["summary"]["model_name"], "maize_east");
        assert_eq!(body["summary"]["training_samples"], 30);
        assert_eq!(body["summary"]["feature_importance"].as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/ml/predict",
            Some(json!({"features": [22, 300], "model_name": "maize_east"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "trained");
        let predicted = body["predicted_yield"].as_f64().unwrap();
        assert!(predicted > 1.5 && predicted < 3.0, "predicted = {}", predicted);
        let interval = body["prediction_interval"].as_array().unwrap();
        assert!(interval[0].as_f64().unwrap() <= predicted);
        assert!(interval[1].as_f64().unwrap() >= predicted);
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));

        let (status, body) = send(&app, Method::GET, "/api/models", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["models"], json!(["maize_east"]));
        assert_eq!(body["metadata"]["maize_east"]["n_samples"], 30);
    }

    #[tokio::test]
    async fn test_model_prediction_errors() {
        let (app, _dir) = create_test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/ml/predict",
            Some(json!({"features": [22, 300], "model_name": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nope"));

        send(&app, Method::POST, "/api/ml/train", Some(training_payload("two_features"))).await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/ml/predict",
            Some(json!({"features": [22], "model_name": "two_features"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/ml/train",
            Some(json!({"features": [[1.0], [2.0]], "target_yields": [1.0]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/api/ml/train", Some(training_payload("../escape"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_untrained_default_model_falls_back() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(&app, Method::POST, "/api/ml/predict", Some(json!({"features": [20, 500]}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["model_name"], "default");
        assert_eq!(body["predicted_yield"], 5.0);
        assert_eq!(body["confidence"], 0.0);
        assert!(body["prediction_interval"].is_null());
    }

    #[tokio::test]
    async fn test_compute_basic_yield() {
        let (app, _dir) = create_test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/compute/basic-yield",
            Some(json!({"temperature_min": 20, "temperature_max": 30, "rainfall": 500})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["temperature_avg"], 25.0);
        assert_eq!(body["estimate"]["estimated_yield"], 5.0);
        assert_eq!(body["estimate"]["confidence"], 0.9);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/compute/basic-yield",
            Some(json!({"temperature_avg": 35, "rainfall": 250, "soil_ph": 5.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estimate"]["estimated_yield"], 2.5);

        let (status, _) = send(&app, Method::POST, "/api/compute/basic-yield", Some(json!({"rainfall": 100}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
