//! Query Client
//!
//! Runs one analytics query over GraphQL and classifies the outcome into a
//! table or a short advisory error. Errors never escape as panics; every
//! failure mode maps onto a `MetricsError` variant so the orchestrator can
//! move on to its next fallback.
//!
//! GraphQL API: POST <graphql url> with JSON body `{query, variables: {q}}`
//! Headers: X-Shopify-Access-Token

use crate::config::{EndpointContext, ACCESS_TOKEN_HEADER};
use crate::error::{truncate, MetricsError, Result, INVALID_RESPONSE, MISSING_RESULT};
use crate::table::TableResult;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Field under `data` that carries the query result.
pub const RESULT_FIELD: &str = "shopifyqlQuery";

const QUERY_DOCUMENT: &str = "query($q: String!) { shopifyqlQuery(query: $q) { tableData { columns { name dataType displayName } rows } parseErrors } }";

const NETWORK_ERROR_MAX: usize = 80;
const API_ERROR_MAX: usize = 120;

/// Anything that can execute analytics query text and hand back a table.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executor name for logs (e.g. "http")
    fn name(&self) -> &'static str;

    /// Execute one query. No retries and no internal timeout: the caller owns
    /// deadlines.
    async fn run_query(&self, query: &str) -> Result<TableResult>;
}

/// `QueryExecutor` backed by the live GraphQL endpoint.
pub struct HttpQueryClient {
    ctx: EndpointContext,
    client: Client,
}

impl HttpQueryClient {
    pub fn new(ctx: EndpointContext) -> Self {
        Self::with_client(ctx, Client::new())
    }

    pub fn with_client(ctx: EndpointContext, client: Client) -> Self {
        Self { ctx, client }
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn run_query(&self, query: &str) -> Result<TableResult> {
        let url = self.ctx.graphql_url();
        debug!("POST {} query: {}", url, query);

        let body = json!({
            "query": QUERY_DOCUMENT,
            "variables": { "q": query },
        });

        let response = self
            .client
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.ctx.access_token)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(network_error)?;

        let outcome = classify_response(status, &text);
        if let Err(e) = &outcome {
            warn!("Query failed ({}, status {}): {}", e.kind(), status, e);
        }
        outcome
    }
}

fn network_error(err: reqwest::Error) -> MetricsError {
    MetricsError::Network(truncate(&err.to_string(), NETWORK_ERROR_MAX))
}

/// Classify a raw HTTP response. First matching rule wins:
///
/// 1. body is not JSON -> `InvalidResponse`
/// 2. non-2xx status -> `Api` with the first GraphQL error, else the status code
/// 3. non-empty top-level `errors` -> `Api`
/// 4. result field absent from `data` -> `MissingData`
/// 5. non-empty `parseErrors` -> `QueryParse`
/// 6. otherwise the table, which may have zero rows
pub fn classify_response(status: u16, body: &str) -> Result<TableResult> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|_| MetricsError::InvalidResponse(INVALID_RESPONSE.to_string()))?;

    if !(200..300).contains(&status) {
        let message = first_graphql_error(&payload).unwrap_or_else(|| status.to_string());
        return Err(MetricsError::Api(truncate(&message, API_ERROR_MAX)));
    }

    if let Some(message) = first_graphql_error(&payload) {
        return Err(MetricsError::Api(truncate(&message, API_ERROR_MAX)));
    }

    let result = payload
        .get("data")
        .and_then(|data| data.get(RESULT_FIELD))
        .filter(|v| !v.is_null())
        .ok_or_else(|| MetricsError::MissingData(MISSING_RESULT.to_string()))?;

    if let Some(first) = result
        .get("parseErrors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        return Err(MetricsError::QueryParse(truncate(
            &error_message(first),
            API_ERROR_MAX,
        )));
    }

    let table_data = result
        .get("tableData")
        .filter(|v| !v.is_null())
        .ok_or_else(|| MetricsError::MissingData(MISSING_RESULT.to_string()))?;

    serde_json::from_value(table_data.clone())
        .map_err(|_| MetricsError::InvalidResponse(INVALID_RESPONSE.to_string()))
}

fn first_graphql_error(payload: &Value) -> Option<String> {
    payload
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .map(error_message)
}

/// Errors arrive either as bare strings or as objects with a `message`.
fn error_message(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        _ => entry
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.to_string()),
    }
}
