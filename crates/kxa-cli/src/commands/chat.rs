//! Chat command - interactive conversation with history

use anyhow::Result;
use kxa_client::{ChatMessage, ChatResponse, KxaClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::reply::stream_reply;
use super::Interrupt;
use crate::output::OutputContext;

/// Run an interactive chat session on stdin
pub async fn chat(
    client: &KxaClient,
    system_prompt: Option<&str>,
    interrupt: &Interrupt,
    ctx: &OutputContext,
) -> Result<()> {
    let mut conversation = Conversation::new(system_prompt);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    ctx.info(&format!("Connected to {}", client.stream_url()));
    ctx.info("Type a question. /reset clears history, /exit quits, Ctrl+C stops an answer.");

    loop {
        ctx.prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                conversation.reset();
                ctx.info("History cleared");
                continue;
            }
            question => conversation.ask(question),
        }

        match stream_reply(client, conversation.messages(), interrupt, ctx).await {
            Ok(response) => conversation.record(&response),
            Err(e) => {
                ctx.error(&format!("{:#}", e));
                conversation.rollback();
            }
        }
    }

    Ok(())
}

/// Message history resent on every turn
#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<ChatMessage>,
    /// Leading system messages kept across resets
    preamble: usize,
}

impl Conversation {
    fn new(system_prompt: Option<&str>) -> Self {
        let messages: Vec<ChatMessage> = system_prompt.map(ChatMessage::system).into_iter().collect();
        let preamble = messages.len();
        Self { messages, preamble }
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    fn ask(&mut self, question: &str) {
        self.messages.push(ChatMessage::user(question));
    }

    /// Keep a completed answer; drop the question if it was not answered
    fn record(&mut self, response: &ChatResponse) {
        let answered = response.outcome.is_some_and(|o| o.is_success());
        if answered && !response.text.is_empty() {
            self.messages.push(ChatMessage::assistant(response.text.clone()));
        } else {
            self.rollback();
        }
    }

    /// Remove the unanswered question
    fn rollback(&mut self) {
        if self.messages.len() > self.preamble {
            self.messages.pop();
        }
    }

    fn reset(&mut self) {
        self.messages.truncate(self.preamble);
    }
}
