//! Provider trait and the middleware decorator contract

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompletionRequest, CompletionResponse, EventStream};

/// A completion backend. Implementations must be safe to call concurrently
/// across sessions; serialization within a session is the session's job.
///
/// Cancellation is expressed the usual async way: dropping the in-flight
/// future abandons the call. Callers that mutate state speculatively around
/// a provider call are responsible for rolling that state back when the
/// future is dropped or returns an error.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Streaming variant. The returned stream yields incremental events and
    /// terminates after an event with `done` set (or an error event).
    async fn stream(&self, request: &CompletionRequest) -> Result<EventStream>;

    /// Cheap token estimate for budget decisions. Providers with a real
    /// tokenizer should override this.
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }

    fn name(&self) -> &str;
}

/// Decorator over a [`Provider`]. Retry, fallback and logging layers all
/// take this shape; their internals live outside this crate.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Provider>) -> Arc<dyn Provider>;
}

/// Composes a middleware chain around `provider`. Applied in reverse order
/// so the first registered middleware is the outermost layer.
pub fn apply_middleware(
    provider: Arc<dyn Provider>,
    middleware: &[Arc<dyn Middleware>],
) -> Arc<dyn Provider> {
    let mut handler = provider;
    for layer in middleware.iter().rev() {
        handler = layer.wrap(handler);
    }
    handler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    struct Tagging {
        tag: &'static str,
    }

    struct Tagged {
        tag: &'static str,
        next: Arc<dyn Provider>,
    }

    impl Middleware for Tagging {
        fn wrap(&self, next: Arc<dyn Provider>) -> Arc<dyn Provider> {
            Arc::new(Tagged {
                tag: self.tag,
                next,
            })
        }
    }

    #[async_trait]
    impl Provider for Tagged {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            let mut response = self.next.complete(request).await?;
            response.content = format!("{}:{}", self.tag, response.content);
            Ok(response)
        }

        async fn stream(&self, request: &CompletionRequest) -> Result<EventStream> {
            self.next.stream(request).await
        }

        fn name(&self) -> &str {
            self.tag
        }
    }

    #[tokio::test]
    async fn test_middleware_applied_in_registration_order() {
        let mock = MockProvider::new();
        mock.push_response("base");

        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Tagging { tag: "outer" }),
            Arc::new(Tagging { tag: "inner" }),
        ];
        let provider = apply_middleware(Arc::new(mock), &chain);

        let response = provider
            .complete(&CompletionRequest::new(vec![]))
            .await
            .unwrap();
        assert_eq!(response.content, "outer:inner:base");
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let mock = MockProvider::new();
        mock.push_response("base");
        let provider = apply_middleware(Arc::new(mock), &[]);
        let response = provider
            .complete(&CompletionRequest::new(vec![]))
            .await
            .unwrap();
        assert_eq!(response.content, "base");
    }
}
