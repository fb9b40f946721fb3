//
// matching/context.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! A single-pass evaluation context: a "now" timestamp cached once per
//! pass (so that a message-age custom matcher sees a consistent clock
//! across every node it's asked about), plus a log target for trace
//! output. Per-pass memoisation of parsed XML lives on the
//! `ParamMap` itself (see `param::Param::payload`), not here, since the
//! cache must be keyed by parameter name.
//!

use log::Level;
use std::time::SystemTime;

/// Context threaded through a single evaluation pass of a matching-item
/// tree against one parameter map.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext {
    now: SystemTime,
    /// Log level used for evaluation trace messages; `None` disables
    /// tracing entirely (the common case).
    trace_level: Option<Level>,
}

impl MatchContext {
    /// Starts a new pass, capturing "now" once.
    pub fn new() -> Self {
        MatchContext { now: SystemTime::now(), trace_level: None }
    }

    pub fn with_trace(level: Level) -> Self {
        MatchContext { now: SystemTime::now(), trace_level: Some(level) }
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    pub(crate) fn trace(&self, message: impl Fn() -> String) {
        if let Some(level) = self.trace_level {
            log::log!(level, "{}", message());
        }
    }
}

impl Default for MatchContext {
    fn default() -> Self {
        Self::new()
    }
}
