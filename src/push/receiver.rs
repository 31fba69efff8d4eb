// Push Receiver Thread
//
// Named pipe communication with the platform push transport, with
// automatic reconnection, error recovery and periodic statistics.
//
// Frames are newline-delimited JSON: push payloads, registration token
// refreshes, or upstream send-error notices.
//

use crate::event;
use crate::notification;
use crate::store::{NotificationStore, SaveOutcome};
use crate::types::PushMessage;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PIPE_PATH: &str = "/tmp/pushbridge_pipe";
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// A single frame read off the transport pipe
#[derive(Debug)]
enum Frame {
    /// Provider push message
    Push(PushMessage),
    /// Registration token refresh
    Token(String),
    /// Upstream send failure notice, log-only
    SendError { msg_id: String, error: String },
}

/// Classify a raw JSON frame.
///
/// Control frames carry an "evt" discriminator; everything else is
/// treated as a push payload.
fn classify_frame(raw: &str) -> Result<Frame, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    if let Some(evt) = value.get("evt").and_then(|v| v.as_str()) {
        match evt {
            "token" => {
                let token = value
                    .get("token")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                return Ok(Frame::Token(token));
            }
            "send_error" => {
                let msg_id = value
                    .get("msg_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let error = value
                    .get("error")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                return Ok(Frame::SendError { msg_id, error });
            }
            _ => {}
        }
    }

    serde_json::from_value(value).map(Frame::Push)
}

/// Receiver statistics
#[derive(Debug)]
struct ReceiverStats {
    messages_received: u64,
    tokens_received: u64,
    parse_errors: u64,
    read_errors: u64,
    reconnects: u64,
    last_frame_time: Option<Instant>,
    start_time: Instant,
}

impl ReceiverStats {
    fn new() -> Self {
        Self {
            messages_received: 0,
            tokens_received: 0,
            parse_errors: 0,
            read_errors: 0,
            reconnects: 0,
            last_frame_time: None,
            start_time: Instant::now(),
        }
    }

    fn log_summary(&self) {
        let uptime = self.start_time.elapsed().as_secs();
        let hours = uptime / 3600;
        let minutes = (uptime % 3600) / 60;

        println!("[PushReceiver] === Statistics ===");
        println!("  Uptime: {}h {}m", hours, minutes);
        println!("  Messages received: {}", self.messages_received);
        println!("  Token refreshes: {}", self.tokens_received);
        println!("  Parse errors: {}", self.parse_errors);
        println!("  Read errors: {}", self.read_errors);
        println!("  Reconnections: {}", self.reconnects);

        if let Some(last_time) = self.last_frame_time {
            let idle_time = last_time.elapsed().as_secs();
            println!("  Last frame: {}s ago", idle_time);
        }
        println!("==================");
    }
}

/// Configuration for the push receiver
pub struct ReceiverConfig {
    pub pipe_path: String,
    pub reconnect_delay: Duration,
    pub max_reconnects: u32,
    pub enable_stats: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            pipe_path: PIPE_PATH.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            max_reconnects: MAX_RECONNECT_ATTEMPTS,
            enable_stats: true,
        }
    }
}

/// Start push receiver thread
pub fn start_push_receiver(store: Arc<NotificationStore>) -> thread::JoinHandle<()> {
    start_push_receiver_with_config(store, ReceiverConfig::default())
}

/// Start push receiver with custom configuration
pub fn start_push_receiver_with_config(
    store: Arc<NotificationStore>,
    config: ReceiverConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        println!("[PushReceiver] Starting push receiver");
        let mut stats = ReceiverStats::new();
        let mut last_stats_log = Instant::now();

        loop {
            // Log statistics periodically
            if config.enable_stats && last_stats_log.elapsed() > Duration::from_secs(300) {
                stats.log_summary();
                last_stats_log = Instant::now();
            }

            match run_receiver_with_recovery(&store, &config, &mut stats) {
                Ok(_) => {
                    println!("[PushReceiver] Receiver completed normally");
                    break;
                }
                Err(e) => {
                    eprintln!("[PushReceiver] Receiver error: {}", e);
                    stats.reconnects += 1;

                    // Exponential backoff
                    let delay = config.reconnect_delay * stats.reconnects.min(5) as u32;
                    thread::sleep(delay);
                }
            }
        }

        // Final statistics
        if config.enable_stats {
            stats.log_summary();
        }
    })
}

/// Run receiver with automatic recovery
fn run_receiver_with_recovery(
    store: &NotificationStore,
    config: &ReceiverConfig,
    stats: &mut ReceiverStats,
) -> std::io::Result<()> {
    let mut consecutive_failures = 0;

    loop {
        // Ensure pipe exists and is healthy
        ensure_pipe_healthy(&config.pipe_path)?;

        match run_receiver_session(store, config, stats) {
            Ok(_) => return Ok(()),
            Err(e) => {
                consecutive_failures += 1;

                if consecutive_failures >= config.max_reconnects {
                    println!("[PushReceiver] Max failures reached, recreating pipe...");
                    recreate_pipe(&config.pipe_path)?;
                    consecutive_failures = 0;
                }

                eprintln!(
                    "[PushReceiver] Session failed (attempt {}/{}): {}",
                    consecutive_failures, config.max_reconnects, e
                );

                thread::sleep(config.reconnect_delay * consecutive_failures);
            }
        }
    }
}

/// Run a single receiver session
fn run_receiver_session(
    store: &NotificationStore,
    config: &ReceiverConfig,
    stats: &mut ReceiverStats,
) -> std::io::Result<()> {
    println!("[PushReceiver] Opening pipe: {}", config.pipe_path);

    let file = open_pipe_robust(&config.pipe_path)?;
    let reader = BufReader::new(file);
    let mut last_activity = Instant::now();
    let mut buffer = String::new();

    println!("[PushReceiver] Pipe opened successfully, listening for push frames...");

    for line_result in reader.lines() {
        // Check for read timeout
        if last_activity.elapsed() > READ_TIMEOUT {
            println!("[PushReceiver] Read timeout, reconnecting...");
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "No data received within timeout period",
            ));
        }

        match line_result {
            Ok(line) => {
                last_activity = Instant::now();

                if line.trim().is_empty() {
                    continue;
                }

                // Handle potential multi-line JSON
                buffer.push_str(&line);

                match classify_frame(&buffer) {
                    Ok(frame) => {
                        buffer.clear();
                        stats.last_frame_time = Some(Instant::now());
                        handle_frame(store, frame, stats);
                    }
                    Err(e) => {
                        // Check if it might be incomplete JSON
                        if buffer.contains('{') && !buffer.contains('}') {
                            // Wait for more data
                            continue;
                        } else {
                            // Invalid JSON, log and clear buffer
                            stats.parse_errors += 1;
                            eprintln!(
                                "[PushReceiver] Parse error #{}: {} - Data: {}",
                                stats.parse_errors, e, buffer
                            );
                            buffer.clear();
                        }
                    }
                }
            }
            Err(e) => {
                stats.read_errors += 1;
                eprintln!("[PushReceiver] Read error #{}: {}", stats.read_errors, e);

                // Check if pipe is broken
                if is_broken_pipe_error(&e) {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "Pipe connection broken",
                    ));
                }
            }
        }
    }

    println!("[PushReceiver] Pipe closed by writer");
    Err(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "Pipe closed",
    ))
}

/// Dispatch a classified frame
fn handle_frame(store: &NotificationStore, frame: Frame, stats: &mut ReceiverStats) {
    match frame {
        Frame::Push(msg) => {
            stats.messages_received += 1;
            println!(
                "[PushReceiver] Message #{}: notification block: {}, data keys: {}",
                stats.messages_received,
                if msg.notification.is_some() { "present" } else { "null" },
                msg.data.len()
            );
            handle_push_message(store, &msg);
        }
        Frame::Token(token) => {
            stats.tokens_received += 1;
            println!("[PushReceiver] New registration token received");
            event::emit_push_token(&token);
        }
        Frame::SendError { msg_id, error } => {
            eprintln!(
                "[PushReceiver] ⚠️ Upstream send error for msg_id={}: {}",
                msg_id, error
            );
        }
    }
}

/// Handle a single push payload: persist, forward, render.
///
/// Storage failures are logged and swallowed so message delivery never
/// visibly fails; the tray and the webview still get the message.
fn handle_push_message(store: &NotificationStore, msg: &PushMessage) {
    let (title, body) = match store.save(msg) {
        Ok(SaveOutcome::Stored(record)) => {
            println!("[PushReceiver] Message saved with id {}", record.id);
            (record.title, record.body)
        }
        Ok(outcome) => {
            println!("[PushReceiver] Duplicate or deleted message suppressed");
            (outcome.title().to_string(), outcome.body().to_string())
        }
        Err(e) => {
            eprintln!("[PushReceiver] Failed to save message: {}", e);
            msg.resolve_content()
        }
    };

    // Forward the raw payload so webview listeners fire
    event::emit_push_received(msg);

    // Tray text matches the persisted record exactly
    notification::show_push_notification(&title, &body);
}

/// Open pipe with robust error handling
fn open_pipe_robust(path: &str) -> std::io::Result<fs::File> {
    let mut attempts = 0;
    const MAX_ATTEMPTS: u32 = 10;

    loop {
        attempts += 1;

        match OpenOptions::new().read(true).open(path) {
            Ok(file) => return Ok(file),
            Err(e) if attempts < MAX_ATTEMPTS => {
                eprintln!(
                    "[PushReceiver] Open attempt {}/{} failed: {}",
                    attempts, MAX_ATTEMPTS, e
                );
                thread::sleep(Duration::from_millis(100 * attempts as u64));
            }
            Err(e) => {
                return Err(std::io::Error::new(
                    e.kind(),
                    format!("Failed to open pipe after {} attempts: {}", MAX_ATTEMPTS, e),
                ));
            }
        }
    }
}

/// Ensure pipe exists and is healthy
fn ensure_pipe_healthy(path: &str) -> std::io::Result<()> {
    let pipe_path = Path::new(path);

    if pipe_path.exists() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            let metadata = fs::metadata(pipe_path)?;
            if !metadata.file_type().is_fifo() {
                println!("[PushReceiver] Path exists but is not a FIFO, recreating...");
                fs::remove_file(pipe_path)?;
                create_named_pipe(path)?;
            }
        }

        Ok(())
    } else {
        println!("[PushReceiver] Creating new pipe: {}", path);
        create_named_pipe(path)
    }
}

/// Recreate the named pipe
fn recreate_pipe(path: &str) -> std::io::Result<()> {
    let pipe_path = Path::new(path);

    if pipe_path.exists() {
        println!("[PushReceiver] Removing old pipe...");
        fs::remove_file(pipe_path)?;
        thread::sleep(Duration::from_millis(100));
    }

    println!("[PushReceiver] Creating fresh pipe...");
    create_named_pipe(path)?;

    Ok(())
}

/// Check if error is a broken pipe
fn is_broken_pipe_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    )
}

#[cfg(target_os = "macos")]
fn create_named_pipe(path: &str) -> std::io::Result<()> {
    use std::process::Command;

    let output = Command::new("mkfifo")
        .arg("-m")
        .arg("622") // rw--w--w-
        .arg(path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.contains("File exists") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("mkfifo failed: {}", stderr),
            ));
        }
    }

    println!("[PushReceiver] Named pipe created: {}", path);
    Ok(())
}

#[cfg(target_os = "linux")]
fn create_named_pipe(path: &str) -> std::io::Result<()> {
    use nix::sys::stat;
    use nix::unistd;

    match unistd::mkfifo(
        path,
        stat::Mode::S_IRUSR | stat::Mode::S_IWUSR | stat::Mode::S_IWGRP | stat::Mode::S_IWOTH,
    ) {
        Ok(_) => {
            println!("[PushReceiver] Named pipe created: {}", path);
            Ok(())
        }
        Err(nix::errno::Errno::EEXIST) => {
            println!("[PushReceiver] Named pipe already exists: {}", path);
            Ok(())
        }
        Err(e) => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("mkfifo failed: {}", e),
        )),
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn create_named_pipe(_path: &str) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Named pipes not supported on this platform",
    ))
}
