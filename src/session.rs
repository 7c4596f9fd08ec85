//! Chat session state
//!
//! Owns the conversation, the draft being typed and the request in flight.
//! The UI reads from it on every render and only changes it through the
//! methods below.

use log::{debug, error};
use tokio::task::JoinHandle;

use crate::client::{ChatClient, RequestFailure};
use crate::state::ChatTurn;

/// Shown as the bot's turn whenever a request fails for any reason.
pub const FAILURE_MESSAGE: &str = "请求失败，请稍后再试。";

type ReplyTask = JoinHandle<Result<String, RequestFailure>>;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Default)]
pub struct ChatSession {
    conversation: Vec<ChatTurn>,
    draft: String,
    cursor: usize, // in chars
    pending: Option<ReplyTask>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &[ChatTurn] {
        &self.conversation
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Submit the current draft.
    ///
    /// Returns `false` without touching any state when the draft is blank or
    /// a request is already in flight.
    pub fn submit(&mut self, client: &ChatClient) -> bool {
        if self.is_pending() || self.draft.trim().is_empty() {
            return false;
        }

        let prompt = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.conversation.push(ChatTurn::user(prompt.clone()));

        debug!("submitting prompt ({} chars) to {}", prompt.chars().count(), client.endpoint());

        let client = client.clone();
        self.pending = Some(tokio::spawn(async move { client.send(&prompt).await }));
        true
    }

    /// Settle the pending request if it has finished. Never blocks.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self
            .pending
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return false;
        }
        self.wait_reply().await
    }

    /// Wait for the pending request and append its bot turn.
    ///
    /// Returns `false` if nothing was in flight.
    pub async fn wait_reply(&mut self) -> bool {
        let Some(task) = self.pending.take() else {
            return false;
        };

        let content = match task.await {
            Ok(Ok(message)) => message,
            Ok(Err(err)) => {
                error!("chat request failed: {}", err);
                FAILURE_MESSAGE.to_string()
            }
            Err(err) => {
                error!("chat request task aborted: {}", err);
                FAILURE_MESSAGE.to_string()
            }
        };

        self.conversation.push(ChatTurn::bot(content));
        true
    }

    // Draft editing

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.cursor = self.draft.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Insert pasted text at the cursor. The draft is a single line, so line
    /// breaks are dropped.
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| *c != '\n' && *c != '\r') {
            self.insert_char(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }
}
