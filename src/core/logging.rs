// src/core/logging.rs

//! The log configuration facade.
//!
//! A `LogConfig` is created once by whatever owns the process (the binary, a test
//! harness) and handed to the components that need it. It holds the current log
//! level and the registered log handler, and produces a `tracing_subscriber`
//! layer that forwards events to that handler. Clones share the same state, so a
//! change made through any clone is seen by all of them (last write wins).

use crate::core::AdminError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::layer::Context;
use tracing_subscriber::{EnvFilter, Layer, Registry, reload};

/// Log verbosity. The numeric values are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Off = -1,
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Normalizes any integer to a level. Out-of-range values are clamped.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            i64::MIN..=-1 => LogLevel::Off,
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn from_tracing(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }

    /// Parses a level name as used in configuration files (`"info"`, `"debug"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "off" => LogLevel::Off,
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => return None,
        })
    }

    /// The `EnvFilter` directive for this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// True if a record at `record` level passes a threshold of `self`.
    pub fn admits(self, record: LogLevel) -> bool {
        self != LogLevel::Off && record != LogLevel::Off && record <= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// A single log record delivered to a handler.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

/// A process-wide sink for log records.
pub type LogHandler = Arc<dyn Fn(&LogRecord) + Send + Sync>;

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

struct LogShared {
    level: RwLock<LogLevel>,
    handler: RwLock<Option<LogHandler>>,
    reload_handle: RwLock<Option<Arc<ReloadHandle>>>,
}

/// Shared handle to the process log configuration.
#[derive(Clone)]
pub struct LogConfig {
    shared: Arc<LogShared>,
}

impl fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogConfig")
            .field("level", &self.level())
            .field("handler", &self.shared.handler.read().is_some())
            .finish()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            shared: Arc::new(LogShared {
                level: RwLock::new(level),
                handler: RwLock::new(None),
                reload_handle: RwLock::new(None),
            }),
        }
    }

    pub fn level(&self) -> LogLevel {
        *self.shared.level.read()
    }

    /// Sets the log level. `None` is rejected; any integer is accepted and clamped.
    pub fn set_log_level(&self, level: Option<i64>) -> Result<i32, AdminError> {
        let Some(raw) = level else {
            return Err(AdminError::Param("Invalid log level".to_string()));
        };
        let level = LogLevel::from_raw(raw);
        *self.shared.level.write() = level;

        if let Some(handle) = self.shared.reload_handle.read().as_ref()
            && let Err(e) = handle.reload(EnvFilter::new(level.as_directive()))
        {
            warn!("Failed to apply log level change to the output filter: {e}");
        }
        Ok(0)
    }

    /// Registers the process log handler. Without a callback, records go to stderr.
    pub fn enable_log_handler(&self, handler: Option<LogHandler>) -> i32 {
        let handler = handler.unwrap_or_else(|| Arc::new(stderr_handler));
        *self.shared.handler.write() = Some(handler);
        0
    }

    pub fn disable_log_handler(&self) {
        *self.shared.handler.write() = None;
    }

    /// Lets level changes also retune the output filter installed by the binary.
    pub fn attach_reload_handle(&self, handle: Arc<ReloadHandle>) {
        *self.shared.reload_handle.write() = Some(handle);
    }

    /// A layer that forwards admitted events to the registered handler.
    pub fn layer(&self) -> HandlerLayer {
        HandlerLayer {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn stderr_handler(record: &LogRecord) {
    eprintln!(
        "{} {:>5} [{}] {}",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        record.level.as_directive().to_ascii_uppercase(),
        record.target,
        record.message
    );
}

/// The `tracing_subscriber` layer produced by `LogConfig::layer`.
pub struct HandlerLayer {
    shared: Arc<LogShared>,
}

impl<S: Subscriber> Layer<S> for HandlerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let record_level = LogLevel::from_tracing(event.metadata().level());
        if !self.shared.level.read().admits(record_level) {
            return;
        }
        // Clone out of the lock so a handler may itself reconfigure logging.
        let Some(handler) = self.shared.handler.read().clone() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        handler(&LogRecord {
            timestamp: Utc::now(),
            level: record_level,
            target: event.metadata().target().to_string(),
            message: visitor.finish(),
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            if !self.fields.is_empty() {
                self.fields.push(' ');
            }
            let _ = write!(self.fields, "{}={:?}", field.name(), value);
        }
    }
}
