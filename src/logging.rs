//! Structured logging module for SewerKing
//!
//! Writes logs to ~/.sewerking/logs/ with categories:
//! - INTENT: Classifier decisions
//! - CONTEXT: Conversation context changes
//! - COMPOSER: Response assembly
//! - SESSION: Message log lifecycle and persistence
//! - MARKET: Token metrics, NFT listings and trade feed
//! - ERROR: Recovered failures

use chrono::{Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use once_cell::sync::Lazy;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Intent,   // Which intent won and on what input
    Context,  // Topic/sentiment/knowledge-level changes
    Composer, // Response assembly and decoration
    Session,  // Store load, append, reset, persistence
    Market,   // Metrics polls, NFT and trade feeds
    Error,    // Recovered failures
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Intent => "INTENT",
            LogCategory::Context => "CONTEXT",
            LogCategory::Composer => "COMPOSER",
            LogCategory::Session => "SESSION",
            LogCategory::Market => "MARKET",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Active log file. `None` until `init_logging` succeeds; console only until then.
static LOG_FILE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Echo lines to stdout. The terminal shell turns this off so logs don't interleave with replies.
static CONSOLE: AtomicBool = AtomicBool::new(true);

pub fn set_console_output(enabled: bool) {
    CONSOLE.store(enabled, Ordering::Relaxed);
}

/// Get the log directory path
fn get_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sewerking").join("logs")
}

/// Get today's log file path
fn get_log_file_path() -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    get_log_dir().join(format!("sewerking-{}.log", today))
}

/// Initialize the logging system - creates log directory if needed
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = get_log_dir();

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    let log_path = get_log_file_path();
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = Some(log_path);

    log(LogCategory::Session, None, "SewerKing logging initialized");

    Ok(())
}

/// Format one log line. Session ids are shortened to 8 chars.
fn format_line(category: LogCategory, session_id: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let session_context = session_id
        .map(|id| {
            let short: String = id.chars().take(8).collect();
            format!("session={} | ", short)
        })
        .unwrap_or_default();

    format!(
        "[{}] [{}] {}{}\n",
        timestamp,
        category.as_str(),
        session_context,
        message
    )
}

/// Log a message with category and optional session context
pub fn log(category: LogCategory, session_id: Option<&str>, message: &str) {
    let log_line = format_line(category, session_id, message);

    if CONSOLE.load(Ordering::Relaxed) {
        print!("{}", log_line);
    }

    let log_path = LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner).clone();
    if let Some(log_path) = log_path {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_line.as_bytes());
        }
    }
}

/// Log a classification decision
pub fn log_intent(session_id: Option<&str>, message: &str) {
    log(LogCategory::Intent, session_id, message);
}

/// Log a context change (topics, sentiment, knowledge level)
pub fn log_context(session_id: Option<&str>, message: &str) {
    log(LogCategory::Context, session_id, message);
}

/// Log a response assembly event
pub fn log_composer(session_id: Option<&str>, message: &str) {
    log(LogCategory::Composer, session_id, message);
}

/// Log a session store event
pub fn log_session(session_id: Option<&str>, message: &str) {
    log(LogCategory::Session, session_id, message);
}

/// Log a market data event
pub fn log_market(session_id: Option<&str>, message: &str) {
    log(LogCategory::Market, session_id, message);
}

/// Log an error
pub fn log_error(session_id: Option<&str>, message: &str) {
    log(LogCategory::Error, session_id, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs() -> Result<usize, Box<dyn std::error::Error>> {
    let log_dir = get_log_dir();
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(7);

    for entry in fs::read_dir(&log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_shortens_session_id() {
        let line = format_line(LogCategory::Intent, Some("0123456789abcdef"), "classified as price");

        assert!(line.contains("[INTENT] session=01234567 | classified as price"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_format_line_without_session() {
        let line = format_line(LogCategory::Error, None, "boom");

        assert!(line.contains("[ERROR] boom"));
        assert!(!line.contains("session="));
    }

    #[test]
    fn test_format_line_short_multibyte_session_id() {
        let line = format_line(LogCategory::Session, Some("ñ🐀"), "reset");

        assert!(line.contains("session=ñ🐀 | reset"));
    }
}
