//! Line-delimited JSON protocol over a pair of byte streams.
//!
//! Each input line is one request:
//!
//! ```json
//! {"id": 1, "tool": "bash", "args": {"command": "ls"}}
//! ```
//!
//! and produces exactly one response line `{"id": 1, "output": "..."}`.
//! Malformed requests get an `Error: ...` output; the loop only ends at EOF.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::runtime::{BashArgs, EditorArgs, ToolRuntime};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub output: String,
}

/// Answer requests from `reader` on `writer` until EOF.
///
/// Returns the number of requests handled.
pub async fn serve<R, W>(runtime: &ToolRuntime, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read request line")?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(runtime, &line).await;
        let mut encoded = serde_json::to_string(&response).context("Failed to encode response")?;
        encoded.push('\n');
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("Failed to write response")?;
        writer.flush().await.context("Failed to flush response")?;
        handled += 1;
    }

    info!(handled, "request stream closed");
    Ok(handled)
}

/// Decode and dispatch one request line.
pub async fn handle_line(runtime: &ToolRuntime, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(error) => {
            debug!(%error, "rejecting malformed request");
            return Response {
                id: None,
                output: format!("Error: invalid request: {error}"),
            };
        }
    };

    let args = request
        .args
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    debug!(tool = %request.tool, "dispatching request");

    let output = match request.tool.as_str() {
        "bash" => match serde_json::from_value::<BashArgs>(args) {
            Ok(args) => runtime.bash(args).await,
            Err(error) => format!("Error: invalid bash arguments: {error}"),
        },
        "editor" => match serde_json::from_value::<EditorArgs>(args) {
            Ok(args) => runtime.editor(args).await,
            Err(error) => format!("Error: invalid editor arguments: {error}"),
        },
        other => format!("Error: unknown tool `{other}`; expected `bash` or `editor`"),
    };

    Response {
        id: request.id,
        output,
    }
}
