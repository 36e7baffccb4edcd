//! Echo client against the real test server, plus the failure modes the
//! client must surface as rejected futures.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::RecordingInternals;
use pagetest_harness::{HarnessError, Page, TestServer};
use pagetest_protocol::EchoDefinition;

#[tokio::test]
async fn create_echo_round_trip_reflects_definition() {
    let guard = common::spawn_test_server().await;
    let server = TestServer::new(&guard.base_url);

    let definition = EchoDefinition::default()
        .with_status(418)
        .with_header("X-Custom-Header", "Custom Value")
        .with_body("short and stout");
    let echo_url = server.create_echo(&definition).await.unwrap();
    assert!(echo_url.starts_with(&format!("{}/echo/", guard.base_url)));

    let response = reqwest::get(&echo_url).await.unwrap();
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(
        response.headers().get("X-Custom-Header").unwrap(),
        "Custom Value"
    );
    assert_eq!(response.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn create_echo_rejects_with_status_text_on_500() {
    // A server whose /create always fails
    let app = Router::new().route(
        "/create",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let server = TestServer::new(format!("http://{addr}"));
    let err = server.create_echo(&EchoDefinition::default()).await.unwrap_err();
    assert!(matches!(err, HarnessError::EchoCreate(_)));
    assert!(
        err.to_string().contains("Internal Server Error"),
        "message should carry the status text: {err}"
    );
}

#[tokio::test]
async fn create_echo_rejects_on_missing_id_field() {
    let app = Router::new().route(
        "/create",
        post(|| async { Json(serde_json::json!({ "nope": 1 })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let server = TestServer::new(format!("http://{addr}"));
    let err = server.create_echo(&EchoDefinition::default()).await.unwrap_err();
    assert!(matches!(err, HarnessError::InvalidServerResponse(_)));
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn static_assets_are_served_and_base_url_matches() {
    let guard = common::spawn_test_server().await;
    guard.write_static("hello.txt", "static hello");
    let server = TestServer::new(&guard.base_url);

    assert_eq!(
        server.static_base_url(),
        format!("{}/static", guard.base_url)
    );

    let response = reqwest::get(server.static_url("hello.txt")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "static hello");
}

#[tokio::test]
async fn ping_answers_pong() {
    let guard = common::spawn_test_server().await;
    let response = reqwest::get(format!("{}/ping", guard.base_url)).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn async_test_drives_a_network_round_trip() {
    let guard = common::spawn_test_server().await;
    let internals = RecordingInternals::new();
    let page = Page::with_test_server(internals.clone(), &guard.base_url);

    let body_page = page.clone();
    page.async_test(move |done, server| async move {
        let echo_url = server
            .create_echo(&EchoDefinition::default().with_body("echoed!"))
            .await?;
        let text = reqwest::get(&echo_url).await?.text().await?;
        body_page.println(&text)?;
        done.finish()?;
        Ok(())
    });

    tokio::time::timeout(Duration::from_secs(10), page.run())
        .await
        .expect("network test did not finish in time");
    assert_eq!(internals.signals(), ["echoed!\n"]);
}
