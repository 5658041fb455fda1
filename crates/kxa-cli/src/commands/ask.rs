//! Ask command - one question, one streamed answer

use anyhow::Result;
use kxa_client::{ChatMessage, KxaClient};

use super::reply::stream_reply;
use super::Interrupt;
use crate::output::OutputContext;

/// Ask a single question
pub async fn ask(
    client: &KxaClient,
    question: &str,
    system_prompt: Option<&str>,
    interrupt: &Interrupt,
    ctx: &OutputContext,
) -> Result<()> {
    let messages = build_messages(question, system_prompt);
    stream_reply(client, messages, interrupt, ctx).await?;
    Ok(())
}

fn build_messages(question: &str, system_prompt: Option<&str>) -> Vec<ChatMessage> {
    system_prompt
        .map(ChatMessage::system)
        .into_iter()
        .chain(std::iter::once(ChatMessage::user(question)))
        .collect()
}
