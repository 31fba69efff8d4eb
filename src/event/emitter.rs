// Event Emitter Module
//
// Centralized Tauri event emission using singleton pattern
// - Raw push payload forwarding (so webview listeners fire)
// - Registration token refreshes
//

use crate::types::PushMessage;
use once_cell::sync::OnceCell;
use tauri::Manager;

/// Global AppHandle singleton for event emission
static APP_HANDLE: OnceCell<tauri::AppHandle> = OnceCell::new();

/// Initialize the event emitter with AppHandle
/// This should be called once during app setup
pub fn init(app_handle: tauri::AppHandle) {
    if APP_HANDLE.set(app_handle).is_err() {
        eprintln!("[EventEmitter] Warning: AppHandle already initialized");
    }
    println!("[EventEmitter] ✅ Event emitter initialized");
}

/// Get the AppHandle (internal helper)
fn get_handle() -> Option<&'static tauri::AppHandle> {
    APP_HANDLE.get()
}

/// Forward a raw push payload to the webview.
///
/// The payload goes out untouched; the webview applies its own handling
/// independently of what the record store decided to persist.
pub fn emit_push_received(msg: &PushMessage) {
    if let Some(handle) = get_handle() {
        if let Err(e) = handle.emit_all("push-received", msg) {
            eprintln!("[EventEmitter] Failed to emit push-received: {}", e);
        } else {
            println!("[EventEmitter] 📡 Emitted push-received");
        }
    } else {
        eprintln!("[EventEmitter] ⚠️ Cannot emit push-received: AppHandle not initialized");
    }
}

/// Forward a refreshed registration token to the webview so its token
/// logic still runs.
pub fn emit_push_token(token: &str) {
    if let Some(handle) = get_handle() {
        if let Err(e) = handle.emit_all("push-token", token) {
            eprintln!("[EventEmitter] Failed to emit push-token: {}", e);
        } else {
            println!("[EventEmitter] 📡 Emitted push-token");
        }
    } else {
        eprintln!("[EventEmitter] ⚠️ Cannot emit push-token: AppHandle not initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_emitter_without_init() {
        // Should not panic, just print warnings
        let msg = PushMessage::default();
        emit_push_received(&msg);
        emit_push_token("token-value");
    }
}
