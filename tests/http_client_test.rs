use serde_json::{json, Value};
use storefront_metrics::client::{HttpQueryClient, QueryExecutor, RESULT_FIELD};
use storefront_metrics::config::EndpointContext;
use storefront_metrics::orchestrator::{fetch_metrics, fetch_metrics_with_deadline};
use storefront_metrics::MetricsError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Captured request: raw head plus parsed JSON body.
struct SeenRequest {
    head: String,
    body: Value,
}

/// Serve canned `(status, body)` responses, one per connection, in order.
async fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<SeenRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let seen = read_request(&mut stream).await;
            let _ = tx.send(seen);
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (format!("http://{}/graphql.json", addr), rx)
}

async fn read_request(stream: &mut TcpStream) -> SeenRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if n == 0 {
            panic!("connection closed before headers");
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap_or(Value::Null);
    SeenRequest { head, body }
}

fn table_body(columns: &[&str], rows: Value) -> String {
    let columns: Vec<Value> = columns.iter().map(|c| json!({"name": c})).collect();
    json!({"data": {RESULT_FIELD: {"tableData": {"columns": columns, "rows": rows}, "parseErrors": []}}}).to_string()
}

fn context(url: &str) -> EndpointContext {
    EndpointContext::new("demo-store.myshopify.com", "shpat_test_token").with_endpoint_url(url)
}

#[tokio::test]
async fn test_request_envelope_and_credential() {
    let (url, mut seen) = serve(vec![(200, table_body(&["sessions"], json!([[12]])))]).await;
    let client = HttpQueryClient::new(context(&url));

    let table = client
        .run_query("FROM sessions SHOW sessions DURING today")
        .await
        .unwrap();
    assert_eq!(table.rows.len(), 1);

    let request = seen.recv().await.unwrap();
    assert!(request.head.starts_with("POST /graphql.json"));
    assert!(request
        .head
        .to_lowercase()
        .contains("x-shopify-access-token: shpat_test_token"));
    assert_eq!(request.body["variables"]["q"], "FROM sessions SHOW sessions DURING today");
    assert!(request.body["query"].as_str().unwrap().contains(RESULT_FIELD));
}

#[tokio::test]
async fn test_non_json_error_page() {
    let (url, _seen) = serve(vec![(503, "<html>Service Unavailable</html>".to_string())]).await;
    let client = HttpQueryClient::new(context(&url));

    let err = client.run_query("FROM sessions SHOW sessions DURING today").await.unwrap_err();
    assert!(matches!(err, MetricsError::InvalidResponse(_)));
    assert_eq!(err.to_string(), "invalid response");
}

#[tokio::test]
async fn test_network_failure_is_truncated() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = HttpQueryClient::new(context(&format!("http://{}/graphql.json", addr)));

    let err = client.run_query("FROM sessions SHOW sessions DURING today").await.unwrap_err();
    assert!(matches!(err, MetricsError::Network(_)));
    assert!(!err.to_string().is_empty());
    assert!(err.to_string().chars().count() <= 80);
}

#[tokio::test]
async fn test_fetch_metrics_end_to_end() {
    let (url, mut seen) = serve(vec![
        (
            200,
            json!({"errors": [{"message": "Field 'conversion_rate' doesn't exist on type 'sessions'"}]}).to_string(),
        ),
        (200, table_body(&["sessions"], json!([["1,250"], [250]]))),
        (
            200,
            json!({"data": {RESULT_FIELD: {"tableData": null, "parseErrors": ["Unknown metric: conversion_rate"]}}}).to_string(),
        ),
        (
            200,
            table_body(
                &["online_store_conversion_rate", "sessions"],
                json!([{"online_store_conversion_rate": "0.02", "sessions": 1000}, {"online_store_conversion_rate": "0.05", "sessions": 500}]),
            ),
        ),
    ])
    .await;

    let outcome = fetch_metrics(&context(&url), "today").await;

    assert_eq!(outcome.sessions, Some(1500));
    assert!((outcome.conversion_rate_percent.unwrap() - 3.0).abs() < 1e-9);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Field 'conversion_rate' doesn't exist on type 'sessions'")
    );

    let mut queries = Vec::new();
    while let Ok(request) = seen.try_recv() {
        queries.push(request.body["variables"]["q"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(
        queries,
        vec![
            "FROM sessions SHOW sessions, conversion_rate DURING today",
            "FROM sessions SHOW sessions DURING today",
            "FROM sessions SHOW conversion_rate DURING today",
            "FROM sessions SHOW online_store_conversion_rate DURING today",
        ]
    );
}

#[tokio::test]
async fn test_deadline_abandons_hung_endpoint() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let ctx = context(&format!("http://{}/graphql.json", addr));
    let outcome = fetch_metrics_with_deadline(&ctx, "today", Duration::from_millis(200)).await;

    assert_eq!(outcome.sessions, None);
    assert_eq!(outcome.conversion_rate_percent, None);
    assert_eq!(outcome.error.as_deref(), Some("deadline exceeded"));
}
