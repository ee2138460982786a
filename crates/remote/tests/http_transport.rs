//! HttpTransport against a local axum server.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Json, Router};
use dex_core::DexError;
use dex_remote::{mock, Endpoint, HttpTransport, RemoteSource, Transport};
use serde_json::json;

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}/api/v2");

    let first_next = format!("{base}/pokemon?offset=1");
    let detail_url = format!("{base}/pokemon/1/");
    let app = Router::new()
        .route(
            "/api/v2/pokemon",
            get(move || {
                let next = first_next.clone();
                let detail = detail_url.clone();
                async move { Json(mock::page_json(1, Some(next.as_str()), &[("bulbasaur", detail.as_str())])) }
            }),
        )
        .route("/api/v2/pokemon/1/", get(|| async { Json(mock::detail_json(1, "bulbasaur", &["grass", "poison"], &["overgrow"])) }))
        .route("/api/v2/shape", get(|| async { Json(json!({ "count": 1, "items": [] })) }))
        .route("/api/v2/text", get(|| async { "definitely not json" }))
        .route("/api/v2/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new(Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn page_and_detail_decode() {
    let base = start_server().await;
    let src = RemoteSource::new(transport(), Endpoint::new(base.clone(), "pokemon"));
    let page = src.fetch_page(&src.first_page_url()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "bulbasaur");
    assert_eq!(page.next.as_deref(), Some(format!("{base}/pokemon?offset=1").as_str()));

    let rec = src.fetch_detail(&page.items[0].url).await.unwrap();
    assert_eq!(rec.id, 1);
    assert_eq!(rec.url, page.items[0].url);
    assert_eq!(rec.type_names().collect::<Vec<_>>(), vec!["grass", "poison"]);
}

#[tokio::test]
async fn status_mapping() {
    let base = start_server().await;
    let t = transport();

    let err = t.get_json(&format!("{base}/pokemon/9999/")).await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");

    let err = t.get_json(&format!("{base}/boom")).await.unwrap_err();
    assert!(matches!(err, DexError::Network(_)), "got {err:?}");

    let err = t.get_json(&format!("{base}/text")).await.unwrap_err();
    assert!(matches!(err, DexError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_results_is_malformed() {
    let base = start_server().await;
    let src = RemoteSource::new(transport(), Endpoint::new(base.clone(), "shape"));
    let err = src.fetch_page(&src.first_page_url()).await.unwrap_err();
    assert!(matches!(err, DexError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = transport().get_json(&format!("http://{addr}/api/v2/pokemon")).await.unwrap_err();
    assert!(matches!(err, DexError::Network(_)), "got {err:?}");
}
