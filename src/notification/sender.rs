// Notification Sender
//
// Renders OS tray notifications for PushBridge using singleton pattern
// - Tray popups for incoming push messages
// - Test notification for debugging
//

use once_cell::sync::OnceCell;
use tauri::api::notification::Notification;

/// Global AppHandle singleton for notifications
static APP_HANDLE: OnceCell<tauri::AppHandle> = OnceCell::new();

/// Initialize the notification system with AppHandle
/// This should be called once during app setup
pub fn init(app_handle: tauri::AppHandle) {
    if APP_HANDLE.set(app_handle).is_err() {
        eprintln!("[Notification] Warning: AppHandle already initialized");
    }
    println!("[Notification] ✅ Notification system initialized");
}

/// Get the bundle identifier for notifications
fn get_bundle_id() -> String {
    APP_HANDLE
        .get()
        .map(|handle| handle.config().tauri.bundle.identifier.clone())
        .unwrap_or_else(|| {
            eprintln!("[Notification] ⚠️ AppHandle not initialized, using default bundle ID");
            "com.pushbridge.app".to_string()
        })
}

/// Show a tray notification for a received push message.
///
/// The text must be exactly the (title, body) the record store resolved,
/// so the tray always matches the persisted history entry.
pub fn show_push_notification(title: &str, body: &str) {
    let notification_result = Notification::new(get_bundle_id())
        .title(title)
        .body(body)
        .show();

    match notification_result {
        Ok(_) => {
            println!("[Notification] ✅ Tray notification shown: {} | {}", title, body);
        }
        Err(e) => {
            println!("[Notification] ⚠️ Failed to show notification: {}", e);
        }
    }
}

/// Send test notification for debugging
pub fn send_test_notification() {
    println!("[Notification] 🔔 Sending test notification");

    let notification_result = Notification::new(get_bundle_id())
        .title("🧪 Test Notification")
        .body("PushBridge notification system is working correctly!")
        .show();

    match notification_result {
        Ok(_) => {
            println!("[Notification] ✅ Test notification sent successfully");
        }
        Err(e) => {
            println!("[Notification] ⚠️ Failed to send test notification: {}", e);
        }
    }
}
