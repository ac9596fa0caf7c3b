//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! routes them through the `HostCommandServer`, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, broadcast};

use crate::error::{FestivalError, Result};
use crate::host::channel::{HostCommandClient, command_channel, forward_dispatch_events};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::handler::FestivalCommandHandler;
use crate::notify::DispatchEvent;

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
const EVENT_CAPACITY: usize = 128;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge on the process stdin/stdout until stdin closes or a
/// `runtime.stop` command is received.
pub async fn run_stdio_bridge(
    handler: FestivalCommandHandler,
    dispatch_events: Option<broadcast::Receiver<DispatchEvent>>,
) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_bridge(handler, dispatch_events, stdin, tokio::io::stdout()).await
}

/// Run the bridge over any line reader and writer.
///
/// Three tasks run concurrently: the command server, an event forwarder
/// writing `EventEnvelope` lines, and the reader loop on the current task.
/// Dispatcher requests arriving on `dispatch_events` are re-published as
/// `notification.*` events.
pub async fn run_bridge<R, W>(
    handler: FestivalCommandHandler,
    dispatch_events: Option<broadcast::Receiver<DispatchEvent>>,
    reader: R,
    writer: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, handler);
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));

    let server_handle = tokio::spawn(server.run());

    let dispatch_handle =
        dispatch_events.map(|rx| forward_dispatch_events(rx, client.event_sender()));

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(client, reader, Arc::clone(&writer)).await;

    // Let the dispatch forwarder drain, then drop the last event sender so
    // the event writer flushes what is queued and exits on `Closed`.
    tokio::task::yield_now().await;
    if let Some(handle) = dispatch_handle {
        handle.abort();
        let _ = handle.await;
    }
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

async fn run_reader<R, W>(
    client: HostCommandClient,
    mut reader: R,
    writer: SharedWriter<W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| FestivalError::Channel(format!("failed to read command line: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down host bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &response).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let request_id = envelope.request_id.clone();

        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, request_id = %request_id, "host command failed");
                ResponseEnvelope::error(request_id, e.to_string())
            }
        };
        write_response(&writer, &response).await?;

        if is_stop {
            tracing::info!("runtime.stop received; shutting down host bridge");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &SharedWriter<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| FestivalError::Channel(format!("failed to serialize response: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| FestivalError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| FestivalError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| FestivalError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::app::FestivalApp;
    use crate::clock::FixedClock;
    use crate::config::FestivalConfig;
    use crate::host::contract::EVENT_VERSION;
    use crate::lineup::Lineup;
    use crate::notify::MemoryDispatcher;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    async fn handler() -> FestivalCommandHandler {
        let now = NaiveDate::from_ymd_opt(2025, 6, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let app = FestivalApp::init(
            FestivalConfig::default(),
            Lineup::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDispatcher::new()),
            Arc::new(FixedClock::new(now)),
        )
        .await
        .unwrap();
        FestivalCommandHandler::new(Arc::new(app))
    }

    fn responses(output: &[u8]) -> Vec<ResponseEnvelope> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn answers_each_line_and_stops_on_runtime_stop() {
        let input = concat!(
            r#"{"v":1,"request_id":"a","command":"host.ping","payload":{}}"#,
            "\n\n",
            "not json\n",
            r#"{"v":1,"request_id":"b","command":"runtime.stop","payload":{}}"#,
            "\n",
            r#"{"v":1,"request_id":"c","command":"host.ping","payload":{}}"#,
            "\n",
        );
        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        run_bridge(handler().await, None, input.as_bytes(), writer)
            .await
            .unwrap();

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut output, &mut buf)
            .await
            .unwrap();
        let resps = responses(&buf);
        let ids: Vec<_> = resps.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "parse-error", "b"]);
        assert!(resps[0].ok);
        assert!(!resps[1].ok);
        assert_eq!(resps[2].v, EVENT_VERSION);
    }

    #[tokio::test]
    async fn command_errors_keep_the_request_id() {
        let input = concat!(
            r#"{"v":1,"request_id":"g1","command":"schedule.grid","payload":{"day":"Monday"}}"#,
            "\n",
        );
        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        run_bridge(handler().await, None, input.as_bytes(), writer)
            .await
            .unwrap();

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut output, &mut buf)
            .await
            .unwrap();
        let resps = responses(&buf);
        assert_eq!(resps.len(), 1);
        assert_eq!(resps[0].request_id, "g1");
        assert!(resps[0].error.as_deref().unwrap().contains("Monday"));
    }
}
