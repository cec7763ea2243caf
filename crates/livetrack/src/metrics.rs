use prometheus::{IntCounter, Opts, Registry};

/// Tracker prometheus metrics.
pub struct TrackerMetrics {
    /// Cycles in which this process held leadership.
    pub cycles_led: IntCounter,
    /// Cycles skipped because another instance held the lock.
    pub cycles_skipped: IntCounter,
    /// Led cycles that found no tracked match.
    pub cycles_idle: IntCounter,
    /// Led cycles that aborted with an error.
    pub cycles_failed: IntCounter,
    /// Envelopes pushed to delivery queues.
    pub envelopes_emitted: IntCounter,
    /// State writes that failed and were swallowed.
    pub persist_failures: IntCounter,
    /// Cycles that ran on assumed leadership without a reachable lock backend.
    pub lock_fallbacks: IntCounter,
}

impl TrackerMetrics {
    /// Create metrics and register them with the given prometheus registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self {
            cycles_led: IntCounter::with_opts(Opts::new(
                "tracker_cycles_led_total",
                "Cycles in which this process held leadership",
            ))?,
            cycles_skipped: IntCounter::with_opts(Opts::new(
                "tracker_cycles_skipped_total",
                "Cycles skipped because another instance held the lock",
            ))?,
            cycles_idle: IntCounter::with_opts(Opts::new(
                "tracker_cycles_idle_total",
                "Led cycles with no tracked match",
            ))?,
            cycles_failed: IntCounter::with_opts(Opts::new(
                "tracker_cycles_failed_total",
                "Led cycles that aborted with an error",
            ))?,
            envelopes_emitted: IntCounter::with_opts(Opts::new(
                "tracker_envelopes_emitted_total",
                "Envelopes pushed to delivery queues",
            ))?,
            persist_failures: IntCounter::with_opts(Opts::new(
                "tracker_persist_failures_total",
                "State writes that failed",
            ))?,
            lock_fallbacks: IntCounter::with_opts(Opts::new(
                "tracker_lock_fallbacks_total",
                "Cycles led without coordination",
            ))?,
        };

        registry.register(Box::new(metrics.cycles_led.clone()))?;
        registry.register(Box::new(metrics.cycles_skipped.clone()))?;
        registry.register(Box::new(metrics.cycles_idle.clone()))?;
        registry.register(Box::new(metrics.cycles_failed.clone()))?;
        registry.register(Box::new(metrics.envelopes_emitted.clone()))?;
        registry.register(Box::new(metrics.persist_failures.clone()))?;
        registry.register(Box::new(metrics.lock_fallbacks.clone()))?;

        Ok(metrics)
    }

    /// Create metrics without registering (for testing).
    pub fn unregistered() -> Self {
        Self {
            cycles_led: IntCounter::new("tracker_cycles_led_total", "led")
                .expect("valid metric name"),
            cycles_skipped: IntCounter::new("tracker_cycles_skipped_total", "skipped")
                .expect("valid metric name"),
            cycles_idle: IntCounter::new("tracker_cycles_idle_total", "idle")
                .expect("valid metric name"),
            cycles_failed: IntCounter::new("tracker_cycles_failed_total", "failed")
                .expect("valid metric name"),
            envelopes_emitted: IntCounter::new("tracker_envelopes_emitted_total", "emitted")
                .expect("valid metric name"),
            persist_failures: IntCounter::new("tracker_persist_failures_total", "persist")
                .expect("valid metric name"),
            lock_fallbacks: IntCounter::new("tracker_lock_fallbacks_total", "fallbacks")
                .expect("valid metric name"),
        }
    }
}
