use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::{LogQueryError, Result};
use crate::tools::ToolFacade;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

/// Serve JSON-RPC over stdin/stdout, one message per line.
pub async fn run_stdio(facade: Arc<ToolFacade>) -> Result<()> {
    info!("tool facade listening on stdio");
    serve_lines(facade, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

pub async fn serve_lines<R, W>(facade: Arc<ToolFacade>, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(req) => process_request(facade.clone(), req).await,
            Err(e) => Some(RpcResponse::err(Value::Null, -32700, format!("parse error: {e}"))),
        };
        if let Some(resp) = resp {
            write_response(&mut output, &resp).await?;
        }
    }
    Ok(())
}

/// Handle one request. Notifications (no id) yield `None`.
pub async fn process_request(facade: Arc<ToolFacade>, req: RpcRequest) -> Option<RpcResponse> {
    debug!(method = %req.method, "rpc request");
    if req.method.starts_with("notifications/") && req.id.is_null() {
        return None;
    }

    let resp = match req.method.as_str() {
        "initialize" => RpcResponse::ok(
            req.id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "ping" => RpcResponse::ok(req.id, serde_json::json!({})),
        "tools/list" => RpcResponse::ok(
            req.id,
            serde_json::json!({ "tools": ToolFacade::definitions() }),
        ),
        "tools/call" => match serde_json::from_value::<CallToolParams>(req.params) {
            Ok(p) => {
                let outcome = facade.call(&p.name, &p.arguments).await;
                RpcResponse::ok(req.id, outcome.to_value())
            }
            Err(e) => RpcResponse::err(req.id, -32602, format!("invalid params: {e}")),
        },
        _ => RpcResponse::err(req.id, -32601, format!("method not found: {}", req.method)),
    };
    Some(resp)
}

async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, resp: &RpcResponse) -> Result<()> {
    let line = serde_json::to_string(resp)
        .map_err(|e| LogQueryError::Internal(format!("encode rpc response: {e}")))?;
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
