//! Logging macros with `format!`-style arguments.
//!
//! The arguments are only formatted when the level is enabled for the logger.
//!
//! # Examples
//!
//! ```
//! use rust_sink_logging::prelude::*;
//! use rust_sink_logging::info;
//!
//! let provider = LoggerProvider::new(FormattedSink::from_uri("stderr").unwrap());
//! let logger = provider.create_logger("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at the given level.
///
/// An `event = <id>;` prefix attaches an event id.
///
/// # Examples
///
/// ```
/// # use rust_sink_logging::prelude::*;
/// # let provider = LoggerProvider::new(FormattedSink::from_uri("stderr").unwrap());
/// # let logger = provider.create_logger("app");
/// use rust_sink_logging::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warning, event = 42; "slow request: {}ms", 950);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, event = $event:expr; $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.log_with_event(level, $event, format!($($arg)+));
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::log!($logger, $level, event = 0; $($arg)+)
    };
}

/// Log a trace-level message.
///
/// ```
/// # use rust_sink_logging::prelude::*;
/// # let provider = LoggerProvider::new(FormattedSink::from_uri("stderr").unwrap());
/// # let logger = provider.create_logger("app");
/// use rust_sink_logging::trace;
/// trace!(logger, "Entering calculate()");
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// ```
/// # use rust_sink_logging::prelude::*;
/// # let provider = LoggerProvider::new(FormattedSink::from_uri("stderr").unwrap());
/// # let logger = provider.create_logger("app");
/// use rust_sink_logging::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, LogMessage, LoggerProvider, Result, Sink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(LogLevel, i32, String)>>);

    impl Sink for Arc<Lines> {
        fn log(&self, message: &LogMessage) -> Result<()> {
            self.0.lock().push((
                message.level(),
                message.event_id().id,
                message.message().to_string(),
            ));
            Ok(())
        }

        fn dispose(&self) -> Result<()> {
            Ok(())
        }
    }

    fn collect(
        min_level: LogLevel,
        run: impl FnOnce(&crate::core::Logger),
    ) -> Vec<(LogLevel, i32, String)> {
        let lines = Arc::new(Lines::default());
        let provider = LoggerProvider::builder()
            .min_level(min_level)
            .build(Arc::clone(&lines));
        run(&provider.create_logger("macros"));
        provider.dispose();
        let out = lines.0.lock().clone();
        out
    }

    #[test]
    fn test_level_macros() {
        let lines = collect(LogLevel::Trace, |logger| {
            trace!(logger, "t {}", 1);
            debug!(logger, "d");
            info!(logger, "i {}", "x");
            warn!(logger, "w");
            error!(logger, "e");
            critical!(logger, "c");
        });
        let levels: Vec<LogLevel> = lines.iter().map(|(level, _, _)| *level).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
        assert_eq!(lines[0].2, "t 1");
        assert_eq!(lines[2].2, "i x");
    }

    #[test]
    fn test_event_id_prefix() {
        let lines = collect(LogLevel::Trace, |logger| {
            log!(logger, LogLevel::Info, event = 7; "with {}", "id");
            log!(logger, LogLevel::Info, "without");
        });
        assert_eq!(lines[0], (LogLevel::Info, 7, "with id".to_string()));
        assert_eq!(lines[1].1, 0);
    }

    #[test]
    fn test_disabled_level_skips_formatting() {
        struct Loud;
        impl std::fmt::Display for Loud {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("formatted a disabled message");
            }
        }
        let lines = collect(LogLevel::Error, |logger| {
            debug!(logger, "{}", Loud);
        });
        assert!(lines.is_empty());
    }
}
