// crates/sql-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC server over stdio and HTTP transports.
// Purpose: Expose the gateway tools to assistant clients.
// Dependencies: sql-gate-config, sql-gate-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! The server speaks JSON-RPC 2.0 and routes `tools/list` and `tools/call`
//! through [`ToolRouter`]. The stdio transport uses Content-Length framing
//! and handles each request on its own task; responses are written by a
//! single writer task. The HTTP transport serves `POST /rpc` with axum.
//! Inputs are untrusted: bodies are size-limited before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use sql_gate_config::AuditConfig;
use sql_gate_config::AuditSinkKind;
use sql_gate_config::ExecutorType;
use sql_gate_config::ServerTransport;
use sql_gate_config::SqlGateConfig;
use sql_gate_core::CallerId;
use sql_gate_core::ExecutorError;
use sql_gate_core::PreparedQuery;
use sql_gate_core::QueryExecutor;
use sql_gate_core::RowCursor;
use sql_gate_sqlite::SqliteExecutor;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::audit::AuditSink;
use crate::audit::DailyFileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::gateway::Gateway;
use crate::tools::ToolDefinition;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol revision reported by `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name reported by `initialize`.
const SERVER_NAME: &str = "sql-gate";
/// Responses buffered for the stdio writer.
const STDIO_RESPONSE_QUEUE: usize = 64;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: SqlGateConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config(config: SqlGateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let executor = build_executor(&config)?;
        let sink = build_audit_sink(&config.audit)?;
        let gateway = Gateway::from_config(&config, executor, sink)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        Ok(Self::new(config, gateway))
    }

    /// Builds a server around an existing gateway.
    #[must_use]
    pub fn new(config: SqlGateConfig, gateway: Gateway) -> Self {
        Self {
            config,
            router: ToolRouter::new(Arc::new(gateway)),
        }
    }

    /// Returns the tool router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let max_body_bytes = self.config.server.max_body_bytes;
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(self.router, max_body_bytes).await,
            ServerTransport::Http => serve_http(&self.config, self.router).await,
        }
    }
}

/// Builds the execution collaborator from configuration.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the executor cannot be opened.
pub fn build_executor(config: &SqlGateConfig) -> Result<Arc<dyn QueryExecutor>, McpServerError> {
    match config.executor.executor_type {
        ExecutorType::None => Ok(Arc::new(UnconfiguredExecutor)),
        ExecutorType::Sqlite => {
            let executor = SqliteExecutor::new(config.executor.sqlite_config())
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(executor))
        }
    }
}

/// Builds the audit sink from configuration.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the audit directory cannot be created.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Box<dyn AuditSink>, McpServerError> {
    Ok(match config.sink {
        AuditSinkKind::File => Box::new(
            DailyFileAuditSink::new(&config.directory)
                .map_err(|err| McpServerError::Init(err.to_string()))?,
        ),
        AuditSinkKind::Stderr => Box::new(StderrAuditSink),
        AuditSinkKind::None => Box::new(NoopAuditSink),
    })
}

/// Executor used when no backend is configured; every call is unavailable.
pub struct UnconfiguredExecutor;

#[async_trait]
impl QueryExecutor for UnconfiguredExecutor {
    async fn estimate_cost(&self, _query: &PreparedQuery) -> Result<f64, ExecutorError> {
        Err(ExecutorError::Unavailable("no executor configured".to_string()))
    }

    async fn open(&self, _query: &PreparedQuery) -> Result<Box<dyn RowCursor>, ExecutorError> {
        Err(ExecutorError::Unavailable("no executor configured".to_string()))
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout until stdin closes.
async fn serve_stdio(router: ToolRouter, max_body_bytes: usize) -> Result<(), McpServerError> {
    let (responses, mut outgoing) = mpsc::channel::<Vec<u8>>(STDIO_RESPONSE_QUEUE);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(payload) = outgoing.recv().await {
            write_framed(&mut stdout, &payload).await?;
        }
        Ok::<(), McpServerError>(())
    });

    let mut reader = BufReader::new(tokio::io::stdin());
    let caller = CallerId::default();
    while let Some(bytes) = read_framed(&mut reader, max_body_bytes).await? {
        let router = router.clone();
        let responses = responses.clone();
        let caller = caller.clone();
        tokio::spawn(async move {
            if let Some(response) = dispatch(&router, &caller, &bytes, max_body_bytes).await.1 {
                match serde_json::to_vec(&response) {
                    Ok(payload) => {
                        let _ = responses.send(payload).await;
                    }
                    Err(err) => tracing::warn!(error = %err, "stdio_response_serialization_failed"),
                }
            }
        });
    }
    drop(responses);
    writer.await.map_err(|_| McpServerError::Transport("stdio writer failed".to_string()))?
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(config: &SqlGateConfig, router: ToolRouter) -> Result<(), McpServerError> {
    let addr = config.server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
    if !addr.ip().is_loopback() {
        tracing::warn!(bind = %addr, "http transport bound to a non-loopback address");
    }
    let state = Arc::new(ServerState {
        router,
        max_body_bytes: config.server.max_body_bytes,
    });
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    tracing::info!(bind = %addr, "http transport listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> Response {
    tracing::debug!(peer = %peer.ip(), bytes = bytes.len(), "http_request");
    let caller = CallerId::default();
    match dispatch(&state.router, &caller, &bytes, state.max_body_bytes).await {
        (status, Some(response)) => (status, axum::Json(response)).into_response(),
        (_, None) => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    const fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    const fn error(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON tool output.
    Json {
        /// JSON payload.
        json: Value,
    },
}

/// Parses and dispatches a raw request body.
///
/// Returns `None` as the response for notifications.
async fn dispatch(
    router: &ToolRouter,
    caller: &CallerId,
    bytes: &[u8],
    max_body_bytes: usize,
) -> (StatusCode, Option<JsonRpcResponse>) {
    if bytes.len() > max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Some(JsonRpcResponse::error(Value::Null, -32070, "request body too large".to_string())),
        );
    }
    let Ok(request) = serde_json::from_slice::<JsonRpcRequest>(bytes) else {
        return (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::error(Value::Null, -32600, "invalid json-rpc request".to_string())),
        );
    };
    let Some(id) = request.id.clone() else {
        tracing::debug!(method = request.method.as_str(), "json-rpc notification ignored");
        return (StatusCode::ACCEPTED, None);
    };
    let (status, response) = handle_request(router, caller, id, request).await;
    (status, Some(response))
}

/// Dispatches a JSON-RPC request to the tool router.
async fn handle_request(
    router: &ToolRouter,
    caller: &CallerId,
    id: Value,
    request: JsonRpcRequest,
) -> (StatusCode, JsonRpcResponse) {
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(id, -32600, "invalid json-rpc version".to_string()),
        );
    }
    match request.method.as_str() {
        "initialize" => (
            StatusCode::OK,
            JsonRpcResponse::result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
                }),
            ),
        ),
        "tools/list" => match serde_json::to_value(ToolListResult {
            tools: router.list_tools(),
        }) {
            Ok(value) => (StatusCode::OK, JsonRpcResponse::result(id, value)),
            Err(_) => jsonrpc_error(id, ToolError::Serialization),
        },
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
                return (
                    StatusCode::BAD_REQUEST,
                    JsonRpcResponse::error(id, -32602, "invalid tool params".to_string()),
                );
            };
            match router.handle_tool_call(caller, &call.name, call.arguments).await {
                Ok(result) => match serde_json::to_value(ToolCallResult {
                    content: vec![ToolContent::Json {
                        json: result,
                    }],
                }) {
                    Ok(value) => (StatusCode::OK, JsonRpcResponse::result(id, value)),
                    Err(_) => jsonrpc_error(id, ToolError::Serialization),
                },
                Err(err) => jsonrpc_error(id, err),
            }
        }
        _ => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(id, -32601, "method not found".to_string()),
        ),
    }
}

/// Maps tool errors onto JSON-RPC errors.
fn jsonrpc_error(id: Value, error: ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code, message) = match error {
        ToolError::UnknownTool => (StatusCode::BAD_REQUEST, -32601, "unknown tool".to_string()),
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, -32602, message),
        ToolError::Serialization => (StatusCode::OK, -32060, "serialization failed".to_string()),
    };
    (status, JsonRpcResponse::error(id, code, message))
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using Content-Length headers.
///
/// Returns `None` when the stream ends between frames.
async fn read_framed<R>(reader: &mut R, max_body_bytes: usize) -> Result<Option<Vec<u8>>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut header_started = false;
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if header_started {
                return Err(McpServerError::Transport("stdio closed".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            if header_started {
                break;
            }
            continue;
        }
        header_started = true;
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using Content-Length headers.
async fn write_framed<W>(writer: &mut W, payload: &[u8]) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().await.map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::use_debug,
        reason = "Test-only transport assertions."
    )]

    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::Value;
    use serde_json::json;
    use sql_gate_config::SqlGateConfig;
    use sql_gate_core::CallerId;
    use tokio::io::BufReader;

    use super::UnconfiguredExecutor;
    use super::dispatch;
    use super::read_framed;
    use super::write_framed;
    use crate::audit::NoopAuditSink;
    use crate::gateway::Gateway;
    use crate::tools::ToolRouter;

    fn router() -> ToolRouter {
        let gateway = Gateway::from_config(
            &SqlGateConfig::default(),
            Arc::new(UnconfiguredExecutor),
            Box::new(NoopAuditSink),
        )
        .expect("gateway");
        ToolRouter::new(Arc::new(gateway))
    }

    async fn call(body: &Value) -> (StatusCode, Value) {
        let bytes = serde_json::to_vec(body).unwrap();
        let (status, response) = dispatch(&router(), &CallerId::default(), &bytes, 1024 * 1024).await;
        (status, serde_json::to_value(response.expect("response")).unwrap())
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut framed = format!("Content-Length: {}\r\n\r\n", payload.len()).into_bytes();
        framed.extend_from_slice(payload);
        framed
    }

    #[tokio::test]
    async fn read_framed_rejects_payload_over_limit() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let bytes = framed(payload);
        let mut reader = BufReader::new(bytes.as_slice());
        assert!(read_framed(&mut reader, payload.len() - 1).await.is_err());
    }

    #[tokio::test]
    async fn read_framed_accepts_payload_at_limit() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let bytes = framed(payload);
        let mut reader = BufReader::new(bytes.as_slice());
        let read = read_framed(&mut reader, payload.len()).await.expect("payload read");
        assert_eq!(read.as_deref(), Some(&payload[..]));
        assert!(read_framed(&mut reader, payload.len()).await.expect("clean end").is_none());
    }

    #[tokio::test]
    async fn framed_writes_read_back() {
        let mut buffer = Vec::new();
        write_framed(&mut buffer, b"{}").await.expect("write");
        assert_eq!(buffer, b"Content-Length: 2\r\n\r\n{}");
        let mut reader = BufReader::new(buffer.as_slice());
        assert_eq!(read_framed(&mut reader, 16).await.expect("read"), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn truncated_frame_is_a_transport_error() {
        let mut reader = BufReader::new(&b"Content-Length: 10\r\n"[..]);
        assert!(read_framed(&mut reader, 1024).await.is_err());
    }

    #[tokio::test]
    async fn tools_list_advertises_every_tool() {
        let (status, response) =
            call(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["query_readonly", "review_query", "list_environments", "list_rules"]
        );
    }

    #[tokio::test]
    async fn protocol_errors_use_json_rpc_codes() {
        let (status, response) = call(&json!({"jsonrpc": "1.0", "id": 2, "method": "tools/list"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], -32600);

        let (_, response) = call(&json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], -32601);

        let (_, response) = call(&json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "drop_everything", "arguments": {}}
        }))
        .await;
        assert_eq!(response["error"]["code"], -32601);

        let (_, response) = call(&json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {"name": "query_readonly", "arguments": {"query": "SELECT 1", "environment": "Int", "extra": 1}}
        }))
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["id"], 5);
    }

    #[tokio::test]
    async fn oversized_and_malformed_bodies_are_rejected() {
        let (status, response) = dispatch(&router(), &CallerId::default(), &[b' '; 64], 32).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(serde_json::to_value(response.unwrap()).unwrap()["error"]["code"], -32070);

        let (status, _) = dispatch(&router(), &CallerId::default(), b"{not json", 1024).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let body = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let (status, response) = dispatch(&router(), &CallerId::default(), body, 1024).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn rejected_queries_are_tool_results_not_errors() {
        let (status, response) = call(&json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {"name": "query_readonly", "arguments": {"query": "DROP TABLE Users", "environment": "Stg"}}
        }))
        .await;
        assert_eq!(status, StatusCode::OK);
        let envelope = &response["result"]["content"][0]["json"];
        assert_eq!(response["result"]["content"][0]["type"], "json");
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "ValidationError");
        assert_eq!(envelope["blocking_violations"], json!(["WriteOperationBlocked"]));
    }

    #[tokio::test]
    async fn unconfigured_executor_fails_closed_at_the_cost_check() {
        let (_, response) = call(&json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": {"name": "query_readonly", "arguments": {"query": "SELECT id FROM dbo.t", "environment": "Int"}}
        }))
        .await;
        let envelope = &response["result"]["content"][0]["json"];
        assert_eq!(envelope["error"], "CostCheckUnavailable");
        assert_eq!(envelope["message"], "query cost could not be verified");
    }

    #[tokio::test]
    async fn initialize_reports_tool_capability() {
        let (status, response) =
            call(&json!({"jsonrpc": "2.0", "id": "init", "method": "initialize", "params": {}})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["result"]["serverInfo"]["name"], "sql-gate");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }
}
