//! Network half of a send: runs the buffered or streaming request for a
//! [`Dispatch`] and reports back through a channel.

use futures::StreamExt;
use shared::{ChatRequest, Reply};
use tokio::sync::mpsc;

use crate::api::ProxyClient;
use crate::error::ClientError;
use crate::render::StreamAccumulator;
use crate::session::{Dispatch, SessionEvent};

/// Always ends with exactly one terminal event (`Reply` or `Failed`) unless
/// the receiver is gone.
pub async fn dispatch(client: &ProxyClient, work: Dispatch, events: mpsc::Sender<SessionEvent>) {
    let Dispatch {
        epoch,
        request,
        placeholder,
    } = work;

    let outcome = match placeholder {
        Some(slot) => send_streaming(client, &request, epoch, slot, &events).await,
        None => send_normal(client, &request).await,
    };

    let terminal = match outcome {
        Ok(reply) => SessionEvent::Reply {
            epoch,
            slot: placeholder,
            reply,
        },
        Err(e) => {
            tracing::warn!(error = %e, "chat request failed");
            SessionEvent::Failed {
                epoch,
                slot: placeholder,
                error: e.to_string(),
            }
        }
    };

    if events.send(terminal).await.is_err() {
        tracing::debug!("session closed before reply finished");
    }
}

async fn send_normal(client: &ProxyClient, request: &ChatRequest) -> Result<Reply, ClientError> {
    client
        .chat(request)
        .await?
        .into_reply()
        .ok_or_else(|| ClientError::Malformed("completion has no choices".to_string()))
}

async fn send_streaming(
    client: &ProxyClient,
    request: &ChatRequest,
    epoch: u64,
    slot: usize,
    events: &mpsc::Sender<SessionEvent>,
) -> Result<Reply, ClientError> {
    let mut stream = client.chat_stream(request).await?;
    let mut acc = StreamAccumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if acc.push(&chunk) {
            let progress = SessionEvent::Progress {
                epoch,
                slot,
                content: acc.content().to_string(),
                thinking: acc.thinking().map(str::to_string),
            };
            if events.send(progress).await.is_err() {
                break;
            }
        }
    }

    Ok(acc.finish())
}
