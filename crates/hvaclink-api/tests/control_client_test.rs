#![allow(clippy::unwrap_used)]
// Integration tests for `ControlClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hvaclink_api::models::{ControlRequest, CreateDeviceRequest, Instruction};
use hvaclink_api::{ControlClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ControlClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ControlClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Device list ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/hvacs/midea/nastp"))
        .and(query_param("device_type", "idu"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {
                "metadata": [
                    { "id": 1, "deviceSn": "ABC123", "set_temperature": 22, "off_line": 0 },
                    { "id": 2, "deviceSn": "XYZ789", "set_temperature": 24, "off_line": 1 }
                ]
            }
        })))
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_sn.as_deref(), Some("ABC123"));
    assert_eq!(devices[1].off_line, Some(true));
}

// ── Control ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_control_device_sends_vendor_body() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-by-device-sn"))
        .and(body_json(json!({
            "device_name": "ABC123",
            "content": [{
                "deviceType": 4,
                "instructions": [{ "command": "SetTemperature", "parameter": 25 }]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": { "messages": "Temperature set to 25" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ControlRequest::single("ABC123", Instruction::new("SetTemperature", 25));
    let ack = client.control_device(&request).await.unwrap();
    assert_eq!(ack.summary().as_deref(), Some("Temperature set to 25"));
}

#[tokio::test]
async fn test_control_device_embedded_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-by-device-sn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 500,
            "message": "Device ABC123 is offline"
        })))
        .mount(&server)
        .await;

    let request = ControlRequest::single("ABC123", Instruction::new("SetFanSpeed", 3));
    let err = client.control_device(&request).await.unwrap_err();

    assert_eq!(err.backend_message(), Some("Device ABC123 is offline"));
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_http_error_surfaces_body_message() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-by-device-sn"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid parameter" })),
        )
        .mount(&server)
        .await;

    let request = ControlRequest::single("ABC123", Instruction::new("SetTemperature", 99));
    let result = client.control_device(&request).await;

    assert!(
        matches!(&result, Err(Error::Backend { message, status: Some(422) }) if message == "Invalid parameter"),
        "expected Backend error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_http_error_without_body_uses_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/hvacs/midea/nastp"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.list_devices().await.unwrap_err();
    assert_eq!(err.backend_message(), Some("HTTP 503"));
    assert!(!err.is_unreachable());
}

#[tokio::test]
async fn test_toggle_power_returns_device() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea/power-on-off"))
        .and(query_param("device_sn", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "deviceSn": "ABC123", "run_mode": 0 }
        })))
        .mount(&server)
        .await;

    let device = client.toggle_power("ABC123").await.unwrap();
    assert_eq!(device.run_mode, Some(0));
}

// ── Fleet ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_control_all_sends_bare_instruction_array() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea-control-all-devices"))
        .and(body_json(json!([{ "command": "IduMode", "parameter": 0 }])))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "All devices updated" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let message = client
        .control_all(&[Instruction::new("IduMode", 0)])
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("All devices updated"));
}

#[tokio::test]
async fn test_unlock_all_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/hvacs/midea/all-unlock"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.unlock_all().await.unwrap(), None);
}

// ── Create / delete ─────────────────────────────────────────────────

#[tokio::test]
async fn test_create_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/hvacs/midea"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 9, "deviceSn": "NEW001" }
        })))
        .mount(&server)
        .await;

    let request = CreateDeviceRequest {
        device_sn: "NEW001".into(),
        name: "Meeting Room".into(),
        set_temperature: 24,
        ..CreateDeviceRequest::default()
    };
    let created = client.create_device(&request).await.unwrap();
    assert_eq!(created.device_sn.as_deref(), Some("NEW001"));
}

#[tokio::test]
async fn test_delete_device() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/hvacs/delete-midea"))
        .and(query_param("midea_id", "9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Device deleted" })),
        )
        .mount(&server)
        .await;

    let message = client.delete_device(9).await.unwrap();
    assert_eq!(message.as_deref(), Some("Device deleted"));
}

// ── History ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_history_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/hvacs/midea-history"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .and(query_param("search", "ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "metadata": [
                    { "id": 11, "deviceSn": "ABC123", "set_temperature": 23, "timestamp": "2025-05-01T10:00:00Z" }
                ],
                "pagination": {
                    "total": 11, "page": 2, "limit": 10, "totalPages": 2,
                    "hasNextPage": false, "hasPrevPage": true
                }
            }
        })))
        .mount(&server)
        .await;

    let page = client.device_history("ABC", 2).await.unwrap();
    assert_eq!(page.metadata.len(), 1);
    assert_eq!(page.pagination.page, 2);
    assert!(page.pagination.has_prev_page);
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_sends_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hvacs/midea/nastp"))
        .and(header("authorization", "Bearer tok"))
        .and(header("sign", "api-sign"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "metadata": [] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = TransportConfig {
        bearer_token: Some("tok".to_string().into()),
        sign_token: Some("api-sign".to_string().into()),
        ..TransportConfig::default()
    };
    let client = ControlClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    assert!(client.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_classified() {
    let client = ControlClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
    );

    let err = client.list_devices().await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got: {err:?}");
}
