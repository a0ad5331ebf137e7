use std::time::Duration;

use api_ingress::{ApiIngress, ApiIngressConfig};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Router,
};
use modkit::contracts::{RestHostModule, StatefulModule};
use modkit::ModuleCtxBuilder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn ingress(cfg: ApiIngressConfig) -> ApiIngress {
    ApiIngress::new(cfg)
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = ingress(ApiIngressConfig::default()).build_router();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn cors_headers_follow_config() {
    let request = || {
        Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:8081")
            .body(Body::empty())
            .unwrap()
    };

    let on = ingress(ApiIngressConfig::default()).build_router();
    let response = on.oneshot(request()).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let off = ingress(ApiIngressConfig {
        cors_enabled: false,
        ..Default::default()
    })
    .build_router();
    let response = off.oneshot(request()).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let host = ingress(ApiIngressConfig {
        body_limit_bytes: 16,
        ..Default::default()
    });
    let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
    let routes = host.rest_prepare(&ctx, Router::new()).unwrap().route(
        "/echo",
        post(|body: String| async move { body }),
    );
    let app = host.rest_finalize(&ctx, routes).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from("x".repeat(64)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn serves_over_tcp_until_cancelled() {
    let host = ingress(ApiIngressConfig {
        bind_addr: "127.0.0.1:0".into(),
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    host.start(cancel.clone()).await.unwrap();
    let addr = host.local_addr().expect("bound address");

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");
    assert!(raw.contains("healthy"));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), host.stop(cancel))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn invalid_bind_address_fails_start() {
    let host = ingress(ApiIngressConfig {
        bind_addr: "not-an-address".into(),
        ..Default::default()
    });
    let err = host.start(CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("Invalid bind address"));
}
