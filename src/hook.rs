//! Host hook contract.
//!
//! The host drives a hook through its message lifecycle: `on_init` once,
//! then per message `on_admission_check`, and for admitted messages
//! `on_before_process` and `on_after_process`, and finally
//! `on_process_complete` once every message has been handled.

use std::path::Path;

use async_trait::async_trait;

use crate::pipeline::types::IncomingMessage;

/// Parameter bag the host renders from.
pub type HookParams = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait Hook: Send + Sync {
    /// One-time initialization before any message is read.
    async fn on_init(&self) {}

    /// Whether the message should be processed at all.
    fn on_admission_check(&self, message: &IncomingMessage) -> bool;

    /// Process an admitted message, populating `params` for rendering.
    async fn on_before_process(&self, message: &IncomingMessage, params: &mut HookParams);

    /// Called after the host has written the rendered message to `written`.
    async fn on_after_process(
        &self,
        _message: &IncomingMessage,
        _params: &HookParams,
        _written: &Path,
    ) {
    }

    /// Called once after every message has been handled.
    async fn on_process_complete(&self) {}
}
