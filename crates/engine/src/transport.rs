//! JSON-line framing over a byte stream pair.
//!
//! One reader loop spawns a task per envelope; every directive funnels into a
//! single writer task so output lines never interleave.

use std::io;
use std::sync::Arc;

use dbridge_executor::Driver;
use dbridge_protocol::{Directive, Envelope, Outbound};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

pub(crate) fn spawn_writer<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Directive>,
) -> JoinHandle<io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(directive) = rx.recv().await {
            let outbound = directive.to_outbound();
            if let Outbound::Eval { code } = &outbound {
                debug!(target: TRANSPORT_TARGET, %code, "eval");
            }
            let line = match outbound.to_line() {
                Ok(line) => line,
                Err(error) => {
                    warn!(target: TRANSPORT_TARGET, %error, "dropping unserialisable directive");
                    continue;
                }
            };
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        writer.shutdown().await
    })
}

/// Read envelopes until EOF, then wait for every in-flight dispatch. Blank
/// and malformed lines, including ones that are not UTF-8, are skipped. A
/// read error stops intake but still drains in-flight dispatches before it
/// is returned.
pub(crate) async fn serve<D, R>(
    dispatcher: Arc<Dispatcher<D>>,
    mut reader: R,
    outbound: mpsc::Sender<Directive>,
) -> io::Result<()>
where
    D: Driver,
    R: AsyncBufRead + Unpin,
{
    let mut in_flight = JoinSet::new();
    let mut line = Vec::new();

    let outcome = loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(error) => {
                warn!(target: TRANSPORT_TARGET, %error, "input read failed; no more envelopes");
                break Err(error);
            }
        }
        if line.trim_ascii().is_empty() {
            continue;
        }
        let envelope = match Envelope::parse(&line) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(target: TRANSPORT_TARGET, %error, "ignoring malformed line");
                continue;
            }
        };

        let dispatcher = Arc::clone(&dispatcher);
        let outbound = outbound.clone();
        in_flight.spawn(async move {
            for directive in dispatcher.dispatch_envelope(&envelope).await {
                if outbound.send(directive).await.is_err() {
                    warn!(target: TRANSPORT_TARGET, "writer closed; dropping directives");
                    break;
                }
            }
        });

        while let Some(finished) = in_flight.try_join_next() {
            log_join(finished);
        }
    };

    debug!(target: TRANSPORT_TARGET, pending = in_flight.len(), "input closed; draining");
    while let Some(finished) = in_flight.join_next().await {
        log_join(finished);
    }
    outcome
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(error) = result {
        warn!(target: TRANSPORT_TARGET, %error, "dispatch task aborted");
    }
}
