//! Conversation session state machine

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use memoir_core::{
    ChatMessage, CompletionRequest, CompletionResponse, EventStream, Provider, Result, Summarizer,
    TokenCounter,
};

/// Configures automatic conversation compaction.
#[derive(Clone)]
pub struct AutocompactConfig {
    /// Message count that triggers compaction.
    pub threshold: usize,
    /// How many recent messages to preserve unsummarized.
    pub keep_recent: usize,
    /// Optional custom summarizer. When unset, the session's own provider
    /// is asked for the summary.
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl Default for AutocompactConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            keep_recent: 4,
            summarizer: None,
        }
    }
}

struct SessionState {
    system: String,
    history: Vec<ChatMessage>,
    /// Accumulated summary of everything compacted out of `history`.
    summary: String,
}

/// Pops the speculative user turn back off history unless defused. Covers
/// both provider errors and the caller dropping an in-flight future.
struct RollbackGuard {
    state: Arc<RwLock<SessionState>>,
    armed: bool,
}

impl RollbackGuard {
    fn new(state: Arc<RwLock<SessionState>>) -> Self {
        Self { state, armed: true }
    }

    fn defuse(&mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if self.armed {
            self.state.write().history.pop();
        }
    }
}

fn append_summary(standing: &mut String, segment: &str) {
    if standing.is_empty() {
        standing.push_str(segment);
    } else {
        standing.push_str("\n\n");
        standing.push_str(segment);
    }
}

/// A conversation session against one provider.
///
/// `send` and `stream` are serialized per session through an async gate; the
/// gate is never the lock protecting history, so `history()` and friends
/// read a consistent snapshot at any time without waiting on an in-flight
/// provider call. Clones share the same session state.
#[derive(Clone)]
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    state: Arc<RwLock<SessionState>>,
    call_gate: Arc<Mutex<()>>,
    history_limit: usize,
    max_tokens: usize,
    token_counter: Option<Arc<dyn TokenCounter>>,
    autocompact: Option<AutocompactConfig>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            state: Arc::new(RwLock::new(SessionState {
                system: String::new(),
                history: Vec::new(),
                summary: String::new(),
            })),
            call_gate: Arc::new(Mutex::new(())),
            history_limit: 100,
            max_tokens: 0,
            token_counter: None,
            autocompact: None,
        }
    }

    pub fn with_system(self, prompt: impl Into<String>) -> Self {
        self.state.write().system = prompt.into();
        self
    }

    /// Seeds the session with existing messages.
    pub fn with_messages(self, messages: Vec<ChatMessage>) -> Self {
        self.state.write().history.extend(messages);
        self
    }

    /// Maximum messages kept in history. 0 means unlimited.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Enables token-based trimming. Takes effect together with a counter.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn with_autocompact(mut self, config: AutocompactConfig) -> Self {
        self.autocompact = Some(config);
        self
    }

    /// Sends a user message and returns the assistant's response.
    ///
    /// The user turn is appended speculatively and rolled back exactly if
    /// the provider call fails or is canceled.
    pub async fn send(&self, message: impl Into<String>) -> Result<CompletionResponse> {
        let _gate = self.call_gate.lock().await;

        let request = {
            let mut state = self.state.write();
            state.history.push(ChatMessage::user(message));
            build_request(&state, false)
        };

        let mut rollback = RollbackGuard::new(Arc::clone(&self.state));
        let response = self.provider.complete(&request).await?;
        rollback.defuse();

        self.state
            .write()
            .history
            .push(ChatMessage::assistant(response.content.clone()));
        self.compact_or_trim().await;

        Ok(response)
    }

    /// Sends a user message and streams the response.
    ///
    /// Events are forwarded as they arrive; the assistant turn is recorded
    /// only once the terminal `done` event is observed. Dropping the stream
    /// before that rolls the speculative user turn back. The session stays
    /// gated against other `send`/`stream` calls until the stream finishes.
    pub async fn stream(&self, message: impl Into<String>) -> Result<EventStream> {
        let gate = Arc::clone(&self.call_gate).lock_owned().await;

        let request = {
            let mut state = self.state.write();
            state.history.push(ChatMessage::user(message));
            build_request(&state, true)
        };

        let mut rollback = RollbackGuard::new(Arc::clone(&self.state));
        let mut upstream = self.provider.stream(&request).await?;

        let session = self.clone();
        let accumulated = stream! {
            let _gate = gate;
            let mut full = String::new();

            while let Some(event) = upstream.next().await {
                let done = event.done;
                full.push_str(&event.content);
                yield event;

                if done {
                    rollback.defuse();
                    session
                        .state
                        .write()
                        .history
                        .push(ChatMessage::assistant(full.clone()));
                    session.compact_or_trim().await;
                    break;
                }
            }
        };

        Ok(Box::pin(accumulated))
    }

    /// Returns a copy of the conversation history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.state.read().history.clone()
    }

    pub fn system(&self) -> String {
        self.state.read().system.clone()
    }

    pub fn set_system(&self, prompt: impl Into<String>) {
        self.state.write().system = prompt.into();
    }

    /// The accumulated summary of compacted-away history.
    pub fn summary(&self) -> String {
        self.state.read().summary.clone()
    }

    /// Resets the session: history and standing summary both go.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.history.clear();
        state.summary.clear();
    }

    /// Post-response bookkeeping: compaction when configured and due,
    /// plain trimming otherwise.
    async fn compact_or_trim(&self) {
        let due = {
            let state = self.state.read();
            match &self.autocompact {
                Some(config)
                    if state.history.len() >= config.threshold
                        && config.keep_recent < state.history.len() =>
                {
                    let split = state.history.len() - config.keep_recent;
                    Some((config.clone(), state.history[..split].to_vec()))
                }
                _ => None,
            }
        };

        let Some((config, old)) = due else {
            self.trim_history();
            return;
        };

        // No state lock held during the summarization call.
        let summary = self.summarize_old(&config, &old).await;

        let mut state = self.state.write();
        // The call gate serializes sends, so only an interleaved clear()
        // can have shrunk history while we were summarizing.
        if state.history.len() >= config.threshold && config.keep_recent < state.history.len() {
            let split = state.history.len() - config.keep_recent;
            state.history.drain(..split);
            match summary {
                Ok(segment) => append_summary(&mut state.summary, &segment),
                Err(err) => {
                    // Lossy degrade: history is trimmed either way, the
                    // summary of what was dropped is simply lost.
                    tracing::warn!(
                        error = %err,
                        "autocompact summarization failed; trimmed without summary"
                    );
                }
            }
        }
    }

    async fn summarize_old(
        &self,
        config: &AutocompactConfig,
        old: &[ChatMessage],
    ) -> Result<String> {
        if let Some(summarizer) = &config.summarizer {
            return summarizer.summarize(old).await;
        }

        let mut conversation = String::new();
        for message in old {
            conversation.push_str(&format!("{}: {}\n\n", message.role, message.content));
        }

        let request = CompletionRequest::new(vec![ChatMessage::user(format!(
            "Summarize this conversation concisely, preserving key information:\n\n{conversation}"
        ))])
        .with_max_tokens(500)
        .with_temperature(0.3);

        let response = self.provider.complete(&request).await?;
        Ok(response.content)
    }

    fn trim_history(&self) {
        let mut state = self.state.write();

        if self.history_limit > 0 && state.history.len() > self.history_limit {
            let excess = state.history.len() - self.history_limit;
            state.history.drain(..excess);
        }

        if self.max_tokens > 0 {
            if let Some(counter) = &self.token_counter {
                while state.history.len() > 1
                    && state
                        .history
                        .iter()
                        .map(|m| counter.count(&m.content))
                        .sum::<usize>()
                        > self.max_tokens
                {
                    state.history.remove(0);
                }
            }
        }
    }
}

/// Assembles the outbound request: system prompt (with the standing summary
/// bracketed in, or a summary-only system turn), then the full history.
fn build_request(state: &SessionState, streaming: bool) -> CompletionRequest {
    let mut messages = Vec::with_capacity(state.history.len() + 1);

    if !state.system.is_empty() {
        let mut content = state.system.clone();
        if !state.summary.is_empty() {
            content.push_str(&format!(
                "\n\n[Previous conversation summary: {}]",
                state.summary
            ));
        }
        messages.push(ChatMessage::system(content));
    } else if !state.summary.is_empty() {
        messages.push(ChatMessage::system(format!(
            "[Previous conversation summary: {}]",
            state.summary
        )));
    }

    messages.extend(state.history.iter().cloned());

    let mut request =
        CompletionRequest::new(messages).with_system_prompt(state.system.clone());
    request.stream = streaming;
    request
}
