//! Streams one agent reply to the terminal

use anyhow::{Context, Result};
use kxa_client::{ChatMessage, ChatResponse, KxaClient, StreamError, StreamOutcome};
use tracing::debug;

use super::Interrupt;
use crate::output::OutputContext;

/// Send the conversation and render the reply as it arrives
///
/// A cancelled reply is not an error; its response has outcome `Cancelled`.
pub async fn stream_reply(
    client: &KxaClient,
    messages: Vec<ChatMessage>,
    interrupt: &Interrupt,
    ctx: &OutputContext,
) -> Result<ChatResponse> {
    let cancel = interrupt.begin();
    let result = render(client, messages, cancel, ctx).await;
    interrupt.end();
    result
}

async fn render(
    client: &KxaClient,
    messages: Vec<ChatMessage>,
    cancel: kxa_client::CancellationToken,
    ctx: &OutputContext,
) -> Result<ChatResponse> {
    let mut response = ChatResponse::default();

    let mut stream = match client.chat_stream(messages, cancel).await {
        Ok(stream) => stream,
        Err(StreamError::Cancelled) => {
            response.outcome = Some(StreamOutcome::Cancelled);
            ctx.finish(&response);
            return Ok(response);
        }
        Err(e) => return Err(e).context("Failed to start chat stream"),
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                ctx.event(&event);
                response.push(event);
            }
            Err(StreamError::Cancelled) => break,
            Err(e) => {
                // Keep the partial answer on its own line before the error
                if !response.text.is_empty() {
                    println!();
                }
                return Err(e).context("Chat stream failed");
            }
        }
    }

    response.outcome = stream.outcome();
    debug!(outcome = ?response.outcome, chars = response.text.len(), "Reply finished");
    ctx.finish(&response);

    Ok(response)
}
