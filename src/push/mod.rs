// Push Module - Inbound push message handling
//
// This module receives provider push frames from the platform transport
// pipe and fans them out to the store, the tray and the webview

pub mod receiver;

// Re-export public API
pub use receiver::start_push_receiver;
