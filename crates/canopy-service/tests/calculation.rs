//! Service-level calculations over the simulated and scripted live sources.

use approx::assert_abs_diff_eq;
use canopy_engine::{CarbonEstimationEngine, CO2_PER_CARBON};
use canopy_remote::{HttpResponse, ScriptedTransport, ServiceAccountCredential};
use canopy_service::{CalculationRequest, CalculationService, JsonLinesStore, ServiceConfig};
use canopy_signal::{LiveSignal, LiveSignalConfig, SimulatedSignal, LIVE_METHOD, SIMULATED_METHOD};
use serde_json::{json, Value};
use std::sync::Arc;

const CREDENTIAL: &str = include_str!("../../canopy-remote/tests/fixtures/service_account.json");

fn parcel() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[-60.0, -3.0], [-59.99, -3.0], [-59.99, -2.99], [-60.0, -2.99], [-60.0, -3.0]]]
    })
}

fn request_body(extra: Value) -> String {
    let mut body = json!({ "geometry": parcel() });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        obj.extend(extra.clone());
    }
    body.to_string()
}

fn live_service(transport: Arc<ScriptedTransport>) -> CalculationService {
    let credential = ServiceAccountCredential::from_json(CREDENTIAL).unwrap();
    let config = LiveSignalConfig {
        poll_interval_ms: 0,
        max_poll_attempts: 2,
        ..LiveSignalConfig::default()
    };
    let live = LiveSignal::new(transport, credential, config).unwrap();
    CalculationService::new(Box::new(live), CarbonEstimationEngine::default())
}

#[test]
fn test_simulated_calculation_is_consistent() {
    let service = CalculationService::new(Box::new(SimulatedSignal::new()), CarbonEstimationEngine::default());
    let body = request_body(json!({ "endDate": "2024-06-30" }));

    let first = service.handle_json(&body);
    let second = service.handle_json(&body);
    assert_eq!(first, second);
    assert_eq!(first.status, 200);

    let calc = &first.body["calculation"];
    assert_eq!(calc["calculation_method"], SIMULATED_METHOD);
    let pools = calc["above_ground_biomass"].as_f64().unwrap()
        + calc["below_ground_biomass"].as_f64().unwrap()
        + calc["soil_organic_carbon"].as_f64().unwrap();
    assert_abs_diff_eq!(calc["total_co2e"].as_f64().unwrap(), pools * CO2_PER_CARBON, epsilon = 0.05);

    let sources = &calc["data_sources"];
    for key in [
        "vegetation_signal",
        "ndvi_mean",
        "ndvi_std_dev",
        "cloud_coverage_percent",
        "land_cover",
        "data_quality",
        "uncertainty_range",
        "uncertainty_percent",
        "area_hectares",
        "dominant_cover",
    ] {
        assert!(sources.get(key).is_some(), "missing data_sources.{key}");
    }
    let range = &sources["uncertainty_range"];
    assert!(range["low"].as_f64().unwrap() <= calc["total_co2e"].as_f64().unwrap());
    assert!(range["high"].as_f64().unwrap() >= calc["total_co2e"].as_f64().unwrap());
}

#[test]
fn test_live_calculation_records_live_method() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"access_token": "ya29.t", "expires_in": 3600}))
        .push_json(json!({"result": {
            "ndvi": {"ndvi_mean": 0.78, "ndvi_stdDev": 0.06},
            "land_cover": {"Map": {"10": 95, "80": 5}},
            "cloud_percent": 4.0
        }}));

    let service = live_service(transport.clone());
    let response = service.handle_json(&request_body(json!({ "areaHectares": 10.0 })));
    assert_eq!(response.status, 200, "{}", response.body);

    let calc = &response.body["calculation"];
    assert_eq!(calc["calculation_method"], LIVE_METHOD);
    assert_eq!(calc["data_sources"]["area_hectares"], 10.0);
    assert_eq!(calc["data_sources"]["data_quality"], "high");
    assert_eq!(calc["data_sources"]["land_cover"]["Forest"], 95.0);
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn test_out_of_range_upstream_index_is_remote_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"access_token": "ya29.t", "expires_in": 3600}))
        .push_json(json!({"result": {
            "ndvi": {"ndvi_mean": 1.4, "ndvi_stdDev": 0.06},
            "land_cover": {"Map": {"10": 100}},
            "cloud_percent": 4.0
        }}));

    let response = live_service(transport).handle_json(&request_body(json!({})));
    assert_eq!(response.status, 502);
    assert_eq!(response.body["error"], "remote_compute_error");
}

#[test]
fn test_negative_area_makes_no_network_call() {
    let transport = Arc::new(ScriptedTransport::new());
    let service = live_service(transport.clone());

    let response = service.handle_json(&request_body(json!({ "areaHectares": -1.0 })));
    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "invalid_input");
    assert!(transport.requests().is_empty());
}

#[test]
fn test_upstream_failures_map_to_envelopes() {
    let cases: Vec<(Vec<HttpResponse>, u16, &str)> = vec![
        (vec![HttpResponse::new(401, r#"{"error": "invalid_grant"}"#)], 502, "authentication_error"),
        (vec![HttpResponse::new(503, "busy")], 503, "transient_error"),
        (
            vec![
                HttpResponse::new(200, r#"{"access_token": "t"}"#),
                HttpResponse::new(400, r#"{"error": {"code": 400, "message": "Bad expression"}}"#),
            ],
            502,
            "remote_compute_error",
        ),
        (
            vec![
                HttpResponse::new(200, r#"{"access_token": "t"}"#),
                HttpResponse::new(200, r#"{"name": "op", "done": false}"#),
                HttpResponse::new(200, r#"{"name": "op", "done": false}"#),
                HttpResponse::new(200, r#"{"name": "op", "done": false}"#),
            ],
            504,
            "timeout",
        ),
    ];

    for (script, status, code) in cases {
        let transport = Arc::new(ScriptedTransport::new());
        for response in script {
            transport.push(response);
        }
        let response = live_service(transport).handle_json(&request_body(json!({})));
        assert_eq!(response.status, status, "{code}");
        assert_eq!(response.body["error"], code);
        assert!(response.body.get("calculation").is_none());
    }
}

#[test]
fn test_configured_store_appends_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let yaml = format!("store:\n  jsonl_path: {}\n", path.display());
    let config = ServiceConfig::from_yaml_str(&yaml).unwrap();

    let service = CalculationService::from_config(&config).unwrap();
    let request = CalculationRequest::from_json(&request_body(json!({}))).unwrap();
    service.calculate(&request).unwrap();
    service.calculate(&request).unwrap();

    let records = JsonLinesStore::new(&path).read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].record.calculation_method, SIMULATED_METHOD);
    assert_eq!(records[0].id.len(), 16);
}

#[test]
fn test_live_mode_without_credentials_is_configuration_error() {
    let config = ServiceConfig::from_yaml_str("signal:\n  mode: live\n").unwrap();
    let err = CalculationService::from_config(&config).err().unwrap();
    assert_eq!(err.code(), "configuration_error");
}
