use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use courier_companion::api::rest::router;
use courier_companion::config::Config;
use courier_companion::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> Router {
    router(Arc::new(AppState::new(&Config::default())))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    builder.body(Body::empty()).unwrap()
}

fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn registration(email: &str) -> Value {
    json!({
        "first_name": "Joana",
        "last_name": "Silva",
        "document_number": "123.456.789-01",
        "email": email,
        "phone": "(11) 98765-4321",
        "password": "segredo1",
        "password_confirmation": "segredo1"
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Registers and completes onboarding; returns (courier id, token).
async fn onboard(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(app, json_request("POST", "/accounts", None, registration(email))).await;
    assert_eq!(status, StatusCode::CREATED);
    let courier_id = body["courier_id"].as_str().unwrap().to_string();
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        json_request(
            "PUT",
            "/profile/vehicle",
            Some(&token),
            json!({ "vehicle_type": "bicicleta", "model": "Caloi 10", "color": "azul" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        json_request(
            "PUT",
            "/profile/banking",
            Some(&token),
            json!({ "bank": "Nubank", "branch": "0001-9", "account": "1234567" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screen"], "home");

    (courier_id, token)
}

fn offer() -> Value {
    json!({
        "pickup": { "name": "Padaria Central", "address": "Rua A, 10" },
        "dropoff": { "name": "Maria Souza", "address": "Av. B, 200" },
        "price_cents": 1250,
        "distance_km": 3.4,
        "duration_minutes": 18,
        "codes": { "pickup": "1234", "dropoff": "5678" }
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["navigators"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("deliveries_completed_total"));
    assert!(body.contains("active_deliveries"));
}

#[tokio::test]
async fn onboarding_persists_formatted_profile() {
    let app = setup();
    let (_, token) = onboard(&app, "joana@example.com").await;

    let (status, body) = send(&app, get_request("/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screen"], "home");
    assert_eq!(body["display_name"], "Joana Silva");
    assert_eq!(body["personal"]["document_number"], "123.456.789-01");
    assert_eq!(body["personal"]["phone"], "11 9 8765-4321");
    assert_eq!(body["vehicle"]["type"], "bicicleta");
    assert_eq!(body["vehicle_description"], "Bicicleta - Caloi 10 - azul");
    assert_eq!(body["banking"]["branch"], "0001-9");
    assert_eq!(body["available"], true);
    assert_eq!(body["registration_complete"], true);
}

#[tokio::test]
async fn invalid_registration_returns_400() {
    let app = setup();
    let mut request = registration("joana@example.com");
    request["password_confirmation"] = json!("outra");

    let (status, body) = send(&app, json_request("POST", "/accounts", None, request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("passwords"));
}

#[tokio::test]
async fn duplicate_email_returns_409() {
    let app = setup();
    onboard(&app, "joana@example.com").await;

    let (status, body) = send(
        &app,
        json_request("POST", "/accounts", None, registration("JOANA@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "this e-mail is already registered");
}

#[tokio::test]
async fn replayed_registration_returns_same_courier() {
    let app = setup();
    let key = Uuid::new_v4().to_string();

    let mut first_id = None;
    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/accounts")
            .header("content-type", "application/json")
            .header("idempotency-key", key.as_str())
            .body(Body::from(registration("joana@example.com").to_string()))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let id = body["courier_id"].as_str().unwrap().to_string();
        match &first_id {
            None => first_id = Some(id),
            Some(first) => assert_eq!(first, &id),
        }
    }
}

#[tokio::test]
async fn authenticated_routes_require_session() {
    let app = setup();

    let (status, _) = send(&app, get_request("/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = Uuid::new_v4().to_string();
    let (status, _) = send(&app, get_request("/contacts", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let app = setup();
    onboard(&app, "joana@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/sessions",
            None,
            json!({ "email": "joana@example.com", "password": "errada" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "incorrect e-mail or password");
}

#[tokio::test]
async fn logout_ends_session() {
    let app = setup();
    let (_, token) = onboard(&app, "joana@example.com").await;

    let (status, body) = send(&app, empty_request("DELETE", "/sessions", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screen"], "welcome");

    let (status, _) = send(&app, get_request("/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delivery_walkthrough_updates_earnings() {
    let app = setup();
    let (courier_id, token) = onboard(&app, "joana@example.com").await;

    let (status, body) = send(
        &app,
        json_request("POST", &format!("/couriers/{courier_id}/offers"), None, offer()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["screen"], "new_delivery");
    assert_eq!(body["stage"], "offered");

    let (status, body) = send(&app, get_request("/delivery", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["delivery"]["offer"].get("codes").is_none());

    let steps = [
        ("/delivery/accept", None, "pickup_route"),
        ("/delivery/arrive-pickup", None, "confirm_pickup"),
        ("/delivery/confirm-pickup", Some("1234"), "dropoff_route"),
        ("/delivery/arrive-dropoff", None, "confirm_dropoff"),
        ("/delivery/confirm-dropoff", Some("5678"), "route_completed"),
        ("/delivery/continue", None, "home"),
    ];
    for (uri, code, screen) in steps {
        let request = match code {
            Some(code) => json_request("POST", uri, Some(&token), json!({ "code": code })),
            None => empty_request("POST", uri, &token),
        };
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["screen"], screen);
    }

    let (status, body) = send(&app, get_request("/earnings", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_cents"], 1250);
    assert_eq!(body["count"], 1);
    assert_eq!(body["deliveries"][0]["dropoff_name"], "Maria Souza");
}

#[tokio::test]
async fn wrong_pickup_code_returns_422() {
    let app = setup();
    let (courier_id, token) = onboard(&app, "joana@example.com").await;

    send(
        &app,
        json_request("POST", &format!("/couriers/{courier_id}/offers"), None, offer()),
    )
    .await;
    send(&app, empty_request("POST", "/delivery/accept", &token)).await;
    send(&app, empty_request("POST", "/delivery/arrive-pickup", &token)).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/delivery/confirm-pickup",
            Some(&token),
            json!({ "code": "0000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "the pickup code does not match");

    let (_, body) = send(&app, get_request("/delivery", Some(&token))).await;
    assert_eq!(body["delivery"]["stage"], "at_pickup");
}

#[tokio::test]
async fn out_of_order_action_returns_409() {
    let app = setup();
    let (courier_id, token) = onboard(&app, "joana@example.com").await;

    send(
        &app,
        json_request("POST", &format!("/couriers/{courier_id}/offers"), None, offer()),
    )
    .await;

    let (status, _) = send(&app, empty_request("POST", "/delivery/continue", &token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn contact_deletion_needs_confirmation() {
    let app = setup();
    let (_, token) = onboard(&app, "joana@example.com").await;

    let mut revision = 0;
    for name in ["Ana", "Bruno", "Carla"] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/contacts",
                Some(&token),
                json!({
                    "name": name,
                    "phone": "11912345678",
                    "relationship": "Amigo",
                    "expected_revision": revision
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        revision = body["revision"].as_u64().unwrap();
    }

    let uri = format!("/contacts/1?expected_revision={revision}");
    let (status, _) = send(&app, empty_request("DELETE", &uri, &token)).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

    let uri = format!("/contacts/1?expected_revision={revision}&confirm=true");
    let (status, body) = send(&app, empty_request("DELETE", &uri, &token)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Ana", "Carla"]);

    let (status, _) = send(&app, empty_request("DELETE", &uri, &token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn photo_upload_is_served_back() {
    let app = setup();
    let (courier_id, token) = onboard(&app, "joana@example.com").await;

    let request = Request::builder()
        .method("POST")
        .uri("/profile/photo")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "image/jpeg")
        .body(Body::from(vec![0xff, 0xd8, 0xff]))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["photo_url"],
        format!("http://localhost:3000/blobs/perfil/{courier_id}.jpg")
    );

    let response = app
        .clone()
        .oneshot(get_request(&format!("/blobs/perfil/{courier_id}.jpg"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");

    let (status, _) = send(&app, get_request("/blobs/perfil/missing.jpg", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_navigation_follows_edges() {
    let app = setup();
    let (_, token) = onboard(&app, "joana@example.com").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/navigation",
            Some(&token),
            json!({ "kind": "switch_tab", "screen": "earnings" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["screen"], "earnings");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/navigation",
            Some(&token),
            json!({ "kind": "push", "screen": "confirm_pickup" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, get_request("/navigation", Some(&token))).await;
    assert_eq!(body["stack"], json!(["earnings"]));
}
