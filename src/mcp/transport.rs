//! Line-delimited JSON-RPC transport
//!
//! Reads one message per line, dispatches each request on its own task and
//! funnels every outbound message through a single writer so lines are never
//! interleaved.

use std::io;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::errors::TransportError;
use crate::mcp::rpc::{
    extract_id, ErrorResponse, Notification, Request, RequestId, Response, INVALID_REQUEST,
    JSONRPC_VERSION, PARSE_ERROR,
};
use crate::mcp::server::handle_json_rpc_request;
use crate::AppState;

/// Handle for writing to the peer. Clones share the same output stream.
#[derive(Debug, Clone)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { outbound }
    }

    pub fn reply<T: Serialize>(&self, id: &RequestId, result: &T) -> Result<(), TransportError> {
        self.send(&Response::new(id, result))
    }

    pub fn reply_with_error(
        &self,
        id: Option<&RequestId>,
        code: i32,
        message: &str,
    ) -> Result<(), TransportError> {
        self.send(&ErrorResponse::new(id, code, message))
    }

    pub fn notify<P: Serialize>(&self, method: &str, params: &P) -> Result<(), TransportError> {
        self.send(&Notification::new(method, params))
    }

    fn send<T: Serialize>(&self, message: &T) -> Result<(), TransportError> {
        let line = serde_json::to_string(message)?;
        self.outbound
            .send(line)
            .map_err(|_| TransportError::Closed)
    }
}

/// One inbound line. Bytes past the size limit are discarded as they are
/// read, so an oversized line only reports its length.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Complete(Vec<u8>),
    Oversized { len: usize },
}

/// Newline-delimited reader that never buffers more than `max_len` bytes of
/// a line. The partial line lives on the struct, so a `next_line` future
/// dropped by `select!` loses nothing.
struct LineReader<R> {
    inner: BufReader<R>,
    max_len: usize,
    buf: Vec<u8>,
    len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(input: R, max_len: usize) -> Self {
        Self {
            inner: BufReader::new(input),
            max_len,
            buf: Vec::new(),
            len: 0,
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<Line>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.len == 0 {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            let (chunk, complete) = match available.iter().position(|byte| *byte == b'\n') {
                Some(end) => (&available[..end], true),
                None => (available, false),
            };
            let used = chunk.len() + usize::from(complete);

            self.len += chunk.len();
            if self.len <= self.max_len {
                self.buf.extend_from_slice(chunk);
            } else {
                self.buf.clear();
            }
            self.inner.consume(used);

            if complete {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> Line {
        let len = std::mem::take(&mut self.len);
        let bytes = std::mem::take(&mut self.buf);
        if len > self.max_len {
            Line::Oversized { len }
        } else {
            Line::Complete(bytes)
        }
    }
}

/// Serve one peer until `input` reaches EOF and every in-flight request has
/// been answered. A read failure stops intake but still drains accepted
/// requests before it is returned.
pub async fn serve<R, W>(
    state: AppState,
    input: R,
    mut output: W,
    max_message_bytes: usize,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();
    let connection = Connection::new(sender);
    let mut reader = LineReader::new(input, max_message_bytes);
    let mut in_flight = JoinSet::new();
    let mut input_open = true;
    let mut read_error = None;

    info!("mcp server listening on stdio");

    loop {
        if !input_open && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            biased;

            Some(line) = outbound.recv() => {
                write_line(&mut output, &line).await?;
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    error!(error = %err, "request task failed");
                }
            }

            line = reader.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    if let Some(request) = accept_line(&connection, line, max_message_bytes) {
                        let state = state.clone();
                        let connection = connection.clone();
                        in_flight.spawn(async move {
                            handle_json_rpc_request(&state, &connection, request).await;
                        });
                    }
                }
                Ok(None) => {
                    info!("input closed, draining in-flight requests");
                    input_open = false;
                }
                Err(err) => {
                    error!(error = %err, "failed to read input, draining in-flight requests");
                    read_error = Some(err);
                    input_open = false;
                }
            },

            else => break,
        }
    }

    drop(connection);
    while let Some(line) = outbound.recv().await {
        write_line(&mut output, &line).await?;
    }

    match read_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Validate one inbound line, answering framing errors directly.
fn accept_line(connection: &Connection, line: Line, max_message_bytes: usize) -> Option<Request> {
    let bytes = match line {
        Line::Complete(bytes) => bytes,
        Line::Oversized { len } => {
            warn!(size = len, max = max_message_bytes, "rejecting oversized message");
            reply_framing_error(connection, None, INVALID_REQUEST, "Invalid Request");
            return None;
        }
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "inbound message is not valid utf-8");
            reply_framing_error(connection, None, PARSE_ERROR, "Parse error");
            return None;
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "failed to parse inbound message");
            reply_framing_error(connection, None, PARSE_ERROR, "Parse error");
            return None;
        }
    };

    if payload.get("method").is_none()
        && (payload.get("result").is_some() || payload.get("error").is_some())
    {
        debug!("ignoring response from peer");
        return None;
    }

    let request_id = extract_id(&payload);
    match serde_json::from_value::<Request>(payload) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => {
            trace!(method = %request.method, id = ?request.id, "accepted message");
            Some(request)
        }
        Ok(request) => {
            warn!(version = %request.jsonrpc, "unsupported jsonrpc version");
            reply_framing_error(connection, request.id.as_ref(), INVALID_REQUEST, "Invalid Request");
            None
        }
        Err(err) => {
            warn!(error = %err, "inbound message is not a valid request");
            reply_framing_error(connection, request_id.as_ref(), INVALID_REQUEST, "Invalid Request");
            None
        }
    }
}

fn reply_framing_error(connection: &Connection, id: Option<&RequestId>, code: i32, message: &str) {
    if let Err(err) = connection.reply_with_error(id, code, message) {
        error!(error = %err, "problem replying with framing error");
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    trace!(len = line.len(), "writing message");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
