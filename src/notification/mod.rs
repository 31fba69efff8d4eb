// Notification Module - OS tray notification rendering
//
// This module posts tray notifications for incoming push messages
// using a singleton pattern for AppHandle management

pub mod sender;

// Re-export public API
pub use sender::{init, send_test_notification, show_push_notification};
