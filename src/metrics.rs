//! Prometheus metrics collection for paird.
//!
//! Tracks matchmaking health: active and waiting sessions, matches made,
//! messages relayed, sweeper evictions, and boundary errors by code.
//! Recording is a no-op until `init()` runs, so unit tests never have to
//! set up the registry.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Currently registered sessions.
pub static ACTIVE_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Sessions currently waiting for a partner.
pub static WAITING_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Total joins (including rejoins via next).
pub static JOINS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Total pairings made.
pub static MATCHES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Total messages relayed between partners.
pub static MESSAGES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Total sessions evicted by the lifecycle sweeper.
pub static SESSIONS_SWEPT: OnceLock<IntCounter> = OnceLock::new();

/// Total event poll requests served.
pub static POLLS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Boundary errors by error code.
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        ACTIVE_SESSIONS,
        IntGauge::new("chat_active_sessions", "Currently registered sessions")
    );
    register!(
        WAITING_SESSIONS,
        IntGauge::new("chat_waiting_sessions", "Sessions waiting for a partner")
    );
    register!(
        JOINS_TOTAL,
        IntCounter::new("chat_joins_total", "Total session joins")
    );
    register!(
        MATCHES_TOTAL,
        IntCounter::new("chat_matches_total", "Total pairings made")
    );
    register!(
        MESSAGES_TOTAL,
        IntCounter::new("chat_messages_total", "Messages relayed between partners")
    );
    register!(
        SESSIONS_SWEPT,
        IntCounter::new("chat_sessions_swept_total", "Sessions evicted as stale")
    );
    register!(
        POLLS_TOTAL,
        IntCounter::new("chat_polls_total", "Event poll requests served")
    );
    register!(
        ERRORS_TOTAL,
        IntCounterVec::new(
            Opts::new("chat_errors_total", "Boundary errors by code"),
            &["code"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn set_active_sessions(count: i64) {
    if let Some(g) = ACTIVE_SESSIONS.get() {
        g.set(count);
    }
}

#[inline]
pub fn set_waiting_sessions(count: i64) {
    if let Some(g) = WAITING_SESSIONS.get() {
        g.set(count);
    }
}

#[inline]
pub fn inc_joins() {
    if let Some(c) = JOINS_TOTAL.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_matches() {
    if let Some(c) = MATCHES_TOTAL.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_messages() {
    if let Some(c) = MESSAGES_TOTAL.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_polls() {
    if let Some(c) = POLLS_TOTAL.get() {
        c.inc();
    }
}

#[inline]
pub fn add_swept(count: usize) {
    if let Some(c) = SESSIONS_SWEPT.get() {
        c.inc_by(count as u64);
    }
}

/// Record a boundary error by its static code.
#[inline]
pub fn record_error(code: &str) {
    if let Some(c) = ERRORS_TOTAL.get() {
        c.with_label_values(&[code]).inc();
    }
}
