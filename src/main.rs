// Prevents additional console window on Windows in release
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod event;
mod notification;
mod push;
mod store;
mod types;

use serde::Serialize;
use std::sync::Arc;
use store::{NotificationRecord, NotificationStore};

/// Response shape of `get_saved_notifications`, kept identical to what
/// the webview bridge already consumes.
#[derive(Serialize)]
struct SavedNotifications {
    notifications: Vec<NotificationRecord>,
}

#[tauri::command]
fn get_saved_notifications(store: tauri::State<Arc<NotificationStore>>) -> SavedNotifications {
    let notifications = store.list();
    println!(
        "[Bridge] Returning {} saved notifications",
        notifications.len()
    );

    SavedNotifications { notifications }
}

#[tauri::command]
fn delete_notification(
    store: tauri::State<Arc<NotificationStore>>,
    id: Option<String>,
    title: Option<String>,
    body: Option<String>,
) -> Result<(), String> {
    println!(
        "[Bridge] delete_notification: id={:?}, title={:?}, body={:?}",
        id, title, body
    );

    store
        .delete(id.as_deref(), title.as_deref(), body.as_deref())
        .map_err(|e| {
            eprintln!("[Bridge] Error deleting notification: {}", e);
            "Error deleting notification".to_string()
        })
}

#[tauri::command]
fn clear_saved_notifications(store: tauri::State<Arc<NotificationStore>>) -> Result<(), String> {
    store.clear().map_err(|e| {
        eprintln!("[Bridge] Error clearing notifications: {}", e);
        "Error clearing notifications".to_string()
    })
}

#[tauri::command]
fn send_test_notification() -> Result<String, String> {
    println!("[TestNotification] 🔔 Sending test notification...");
    notification::send_test_notification();
    Ok("Test notification sent!".to_string())
}

fn main() {
    // One store instance shared by the bridge commands and the receiver
    let store = Arc::new(NotificationStore::open_default());
    let store_for_commands = store.clone();

    tauri::Builder::default()
        .manage(store_for_commands)
        .invoke_handler(tauri::generate_handler![
            get_saved_notifications,
            delete_notification,
            clear_saved_notifications,
            send_test_notification
        ])
        .setup(move |app| {
            let app_handle = app.handle();

            // Initialize notification system (singleton pattern)
            notification::init(app_handle.clone());

            // Initialize event emitter (singleton pattern)
            event::init(app_handle.clone());

            // Start listening for push frames from the platform transport
            let _receiver = push::start_push_receiver(store.clone());

            println!("[Main] Push receiver started");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
