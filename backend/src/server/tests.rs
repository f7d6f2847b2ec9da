//! Tests for server wiring: readiness signalling and the assembled app.

use super::*;
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use profile_registry::settings::AppSettings;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

fn memory_state() -> HttpState {
    build_assembly(&AppSettings::default(), None)
        .expect("memory assembly")
        .http_state
}

fn deps(health_state: web::Data<HealthState>, json_limit: usize) -> AppDependencies {
    AppDependencies {
        health_state,
        http_state: web::Data::new(memory_state()),
        json_limit,
    }
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(health_state: web::Data<HealthState>) {
    assert!(!health_state.is_ready(), "state should start unready");

    let config = ServerConfig::new("127.0.0.1:0".parse().expect("addr"), memory_state());
    let _server = create_server(health_state.clone(), config).expect("server should build");

    assert!(
        health_state.is_ready(),
        "server creation should mark readiness"
    );
}

#[rstest]
#[actix_rt::test]
async fn created_users_are_listed_and_their_image_served(health_state: web::Data<HealthState>) {
    let app = actix_test::init_service(build_app(deps(health_state, 1024 * 1024))).await;

    let create = actix_test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({ "name": "Ada", "email": "ada@x.com", "image": "/9j/4A==" }))
        .to_request();
    let created: Value = actix_test::call_and_read_body_json(&app, create).await;
    let id = created["id"].as_str().expect("id").to_owned();

    let list = actix_test::TestRequest::get().uri("/api/v1/users").to_request();
    let listed: Value = actix_test::call_and_read_body_json(&app, list).await;
    let locator = listed["users"][0]["imageLocator"]
        .as_str()
        .expect("locator")
        .to_owned();
    assert_eq!(listed["users"][0]["id"], json!(id));
    assert!(locator.ends_with(&format!("/images/{id}.jpg")));

    let image = actix_test::TestRequest::get()
        .uri(&format!("/images/{id}.jpg"))
        .to_request();
    let response = actix_test::call_service(&app, image).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = actix_test::read_body(response).await;
    assert_eq!(bytes.to_vec(), vec![0xff, 0xd8, 0xff, 0xe0]);
}

#[rstest]
#[actix_rt::test]
async fn bodies_over_the_json_limit_are_rejected(health_state: web::Data<HealthState>) {
    let app = actix_test::init_service(build_app(deps(health_state, 64))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({ "name": "Ada", "email": "ada@x.com", "image": "A".repeat(512) }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["code"], "payload_too_large");
}

#[rstest]
#[actix_rt::test]
async fn cross_origin_requests_are_allowed(health_state: web::Data<HealthState>) {
    let app = actix_test::init_service(build_app(deps(health_state, 1024))).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/users")
        .insert_header(("Origin", "https://client.example"))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[rstest]
#[actix_rt::test]
async fn readiness_follows_health_state(health_state: web::Data<HealthState>) {
    let app = actix_test::init_service(build_app(deps(health_state.clone(), 1024))).await;

    let before = actix_test::TestRequest::get().uri("/health/ready").to_request();
    assert_eq!(
        actix_test::call_service(&app, before).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );

    health_state.mark_ready();
    let after = actix_test::TestRequest::get().uri("/health/ready").to_request();
    assert_eq!(
        actix_test::call_service(&app, after).await.status(),
        StatusCode::OK
    );
}

#[rstest]
#[actix_rt::test]
async fn shutdown_signal_fails_liveness_and_stops_the_server(
    health_state: web::Data<HealthState>,
) {
    let config = ServerConfig::new("127.0.0.1:0".parse().expect("addr"), memory_state());
    let server = create_server(health_state.clone(), config).expect("server should build");
    let handle = server.handle();
    let running = actix_web::rt::spawn(server);

    drain_on(health_state.clone(), handle, async { Ok(()) }).await;

    assert!(!health_state.is_alive(), "drain should fail liveness");
    running
        .await
        .expect("server task joins")
        .expect("server stops cleanly");
}

#[rstest]
#[actix_rt::test]
async fn failed_signal_listener_leaves_the_server_live(health_state: web::Data<HealthState>) {
    let config = ServerConfig::new("127.0.0.1:0".parse().expect("addr"), memory_state());
    let server = create_server(health_state.clone(), config).expect("server should build");
    let handle = server.handle();
    let running = actix_web::rt::spawn(server);

    drain_on(health_state.clone(), handle.clone(), async {
        Err(std::io::Error::other("no signal support"))
    })
    .await;

    assert!(health_state.is_alive());
    handle.stop(false).await;
    running
        .await
        .expect("server task joins")
        .expect("server stops cleanly");
}
