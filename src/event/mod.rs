// Event Module - Webview bridge forwarding
//
// This module forwards raw push payloads and token refreshes to the
// webview layer as Tauri events

pub mod emitter;

// Re-export public API
pub use emitter::{emit_push_received, emit_push_token, init};
