//! End-to-end dispatch through the axum application.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use route_dispatch::http::middleware::{X_SESSION_ROLES, X_SESSION_USER};
use route_dispatch::http::HttpServer;
use route_dispatch::routing::Router;
use serde_json::Value;
use tower::ServiceExt;

mod common;

async fn send(app: axum::Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn site() -> axum::Router {
    HttpServer::new(common::table(common::SITE), true).app()
}

#[tokio::test]
async fn test_dispatches_to_controller() {
    let response = send(site(), get("/de/user/42")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["route"], "user");
    assert_eq!(body["method"], "show");
    assert_eq!(body["locale"], "de");
    assert_eq!(body["parameters"]["id"], "42");
    assert_eq!(body["parameters"]["tab"], "profile");
}

#[tokio::test]
async fn test_unauthorised_request_redirects() {
    let request = Request::builder()
        .uri("/admin")
        .header(header::HOST, "example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(site(), request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "http://example.com/login");
}

#[tokio::test]
async fn test_session_headers_grant_access() {
    let request = Request::builder()
        .uri("/drafts")
        .header(X_SESSION_USER, "alice")
        .header(X_SESSION_ROLES, "admin")
        .body(Body::empty())
        .unwrap();
    let response = send(site(), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["route"], "drafts");
}

#[tokio::test]
async fn test_session_headers_ignored_when_untrusted() {
    let app = HttpServer::new(common::table(common::SITE), false).app();
    let request = Request::builder()
        .uri("/drafts")
        .header(X_SESSION_USER, "alice")
        .header(X_SESSION_ROLES, "admin")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_not_found_and_unbound() {
    let response = send(site(), get("/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not_found");

    let response = send(site(), get("/unbound")).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_encoded_path_decoded_before_matching() {
    let response = send(site(), get("/product/red%20shoe")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["route"], "product");
    assert_eq!(body["parameters"]["id"], "red shoe");
}

#[tokio::test]
async fn test_undecodable_path_is_bad_request() {
    let response = send(site(), get("/product/%FF")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_redirect_points_at_target_path() {
    let app = HttpServer::new(
        common::table(
            r#"
            [[routes]]
            id = "login"
            path = "signin"
            controller = "echo"

            [[routes]]
            id = "admin"
            path = "admin"
            auth = "admin"
            redirect = "login"
            controller = "echo"
            "#,
        ),
        false,
    )
    .app();
    let response = send(app.clone(), get("/admin")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/signin");

    let response = send(app, get("/signin")).await;
    assert_eq!(json_body(response).await["route"], "login");
}

#[tokio::test]
async fn test_circular_redirect_is_server_error() {
    let app = HttpServer::new(
        common::table(
            r#"
            [[routes]]
            id = "admin"
            path = "admin"
            auth = "admin"
            redirect = "admin"
            controller = "echo"
            "#,
        ),
        false,
    )
    .app();
    let response = send(app, get("/admin")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "routing_failed");
}

#[tokio::test]
async fn test_script_name_in_path_without_rewrite() {
    let app = HttpServer::new(
        common::table(
            r#"
            [router]
            server_side_rewrite = false

            [[routes]]
            id = "login"
            path = "login"
            controller = "echo"

            [[routes]]
            id = "user"
            path = "user/{id}"
            auth = "member"
            redirect = "login"
            controller = "echo"
            "#,
        ),
        true,
    )
    .app();

    let response = send(app.clone(), get("/index.php/user/7")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/index.php/login");

    let request = Request::builder()
        .uri("/index.php/user/7")
        .header(X_SESSION_USER, "bob")
        .header(X_SESSION_ROLES, "member")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["parameters"]["id"], "7");
}

#[tokio::test]
async fn test_table_swap_applies_to_next_request() {
    let table = common::table(common::SITE);
    let app = HttpServer::new(Arc::clone(&table), false).app();

    let response = send(app.clone(), get("/contact")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let config = common::config(
        r#"
        [[routes]]
        id = "contact"
        path = "contact"
        controller = "echo"
        "#,
    );
    let router = Arc::new(Router::from_config(&config).unwrap());
    let next = common::registry().resolve(router, "/index.php").unwrap();
    table.store(Arc::new(next));

    let response = send(app, get("/contact")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["route"], "contact");
}
