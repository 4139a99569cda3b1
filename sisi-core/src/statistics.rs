//! Run statistics.
//!
//! Call counts and accumulated wall time per subsystem, plus a few result
//! counters. Single-threaded: counters are `Cell`s so components holding a
//! shared [`Context`](crate::Context) can record without `&mut`.

use serde::Serialize;
use std::cell::Cell;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Subsystems whose calls are counted and timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// Plain SAT calls
    Sat,
    /// SAT preprocessing
    Simplify,
    /// MaxSAT calls
    MaxSat,
    /// Consecution queries
    Consecution,
    /// Minimal support extraction
    Support,
    /// Collapse-set queries
    Collapse,
    /// BMC queries
    Bmc,
    /// IC3 runs
    Ic3,
    /// Debugger calls
    Debug,
    /// Correction-set queries
    Mcs,
    /// MIS extraction
    Mis,
    /// Hitting-set queries
    HittingSet,
    /// Safety checks of partial models
    Safety,
}

impl Subsystem {
    /// Every subsystem, in report order.
    pub const ALL: [Subsystem; 13] = [
        Subsystem::Sat,
        Subsystem::Simplify,
        Subsystem::MaxSat,
        Subsystem::Consecution,
        Subsystem::Support,
        Subsystem::Collapse,
        Subsystem::Bmc,
        Subsystem::Ic3,
        Subsystem::Debug,
        Subsystem::Mcs,
        Subsystem::Mis,
        Subsystem::HittingSet,
        Subsystem::Safety,
    ];

    /// Short label used in reports.
    pub const fn label(self) -> &'static str {
        match self {
            Subsystem::Sat => "sat",
            Subsystem::Simplify => "simplify",
            Subsystem::MaxSat => "maxsat",
            Subsystem::Consecution => "consecution",
            Subsystem::Support => "support",
            Subsystem::Collapse => "collapse",
            Subsystem::Bmc => "bmc",
            Subsystem::Ic3 => "ic3",
            Subsystem::Debug => "debug",
            Subsystem::Mcs => "mcs",
            Subsystem::Mis => "mis",
            Subsystem::HittingSet => "hitting_set",
            Subsystem::Safety => "safety",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct Counter {
    calls: Cell<u64>,
    time: Cell<Duration>,
}

/// Per-run statistics.
#[derive(Debug)]
pub struct Statistics {
    started: Instant,
    counters: [Counter; Subsystem::ALL.len()],
    msis_found: Cell<u64>,
    mivc_found: Cell<u64>,
    min_ivc: Cell<Option<usize>>,
    max_ivc: Cell<Option<usize>>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [`Statistics::timer`]; adds the elapsed time on drop.
#[must_use = "the timer records when dropped"]
pub struct Timer<'a> {
    counter: &'a Counter,
    start: Instant,
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.counter
            .time
            .set(self.counter.time.get() + self.start.elapsed());
    }
}

impl Statistics {
    /// Create empty statistics; the run clock starts now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Default::default(),
            msis_found: Cell::new(0),
            mivc_found: Cell::new(0),
            min_ivc: Cell::new(None),
            max_ivc: Cell::new(None),
        }
    }

    /// Count one call to `subsystem` and time it until the guard drops.
    pub fn timer(&self, subsystem: Subsystem) -> Timer<'_> {
        let counter = &self.counters[subsystem.slot()];
        counter.calls.set(counter.calls.get() + 1);
        Timer {
            counter,
            start: Instant::now(),
        }
    }

    /// Number of recorded calls.
    pub fn calls(&self, subsystem: Subsystem) -> u64 {
        self.counters[subsystem.slot()].calls.get()
    }

    /// Accumulated time.
    pub fn time(&self, subsystem: Subsystem) -> Duration {
        self.counters[subsystem.slot()].time.get()
    }

    /// Record a minimal safe inductive subset.
    pub fn record_msis(&self) {
        self.msis_found.set(self.msis_found.get() + 1);
    }

    /// Record an IVC of the given size.
    pub fn record_ivc(&self, size: usize) {
        self.mivc_found.set(self.mivc_found.get() + 1);
        let min = self.min_ivc.get().map_or(size, |m| m.min(size));
        let max = self.max_ivc.get().map_or(size, |m| m.max(size));
        self.min_ivc.set(Some(min));
        self.max_ivc.set(Some(max));
    }

    /// Smallest and largest IVC recorded so far.
    pub fn ivc_bounds(&self) -> Option<(usize, usize)> {
        Some((self.min_ivc.get()?, self.max_ivc.get()?))
    }

    /// Serializable copy of the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            runtime_us: self.started.elapsed().as_micros() as u64,
            subsystems: Subsystem::ALL
                .iter()
                .filter(|&&s| self.calls(s) > 0)
                .map(|&s| SubsystemStats {
                    name: s.label(),
                    calls: self.calls(s),
                    time_us: self.time(s).as_micros() as u64,
                })
                .collect(),
            msis_found: self.msis_found.get(),
            ivcs_found: self.mivc_found.get(),
            min_ivc: self.min_ivc.get(),
            max_ivc: self.max_ivc.get(),
        }
    }

    /// Fixed-width textual report.
    pub fn summary(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::new();
        let _ = writeln!(out, "runtime: {:.3}s", snap.runtime_us as f64 / 1e6);
        let _ = writeln!(out, "{:<14} {:>10} {:>12}", "subsystem", "calls", "time (s)");
        for s in &snap.subsystems {
            let _ = writeln!(
                out,
                "{:<14} {:>10} {:>12.3}",
                s.name,
                s.calls,
                s.time_us as f64 / 1e6
            );
        }
        if snap.msis_found > 0 {
            let _ = writeln!(out, "msis found: {}", snap.msis_found);
        }
        if let (Some(min), Some(max)) = (snap.min_ivc, snap.max_ivc) {
            let _ = writeln!(
                out,
                "ivcs found: {} (sizes {}..={})",
                snap.ivcs_found, min, max
            );
        }
        out
    }
}

/// Per-subsystem entry of a [`StatsSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemStats {
    /// Subsystem label
    pub name: &'static str,
    /// Number of calls
    pub calls: u64,
    /// Accumulated time (microseconds)
    pub time_us: u64,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Time since the statistics were created (microseconds)
    pub runtime_us: u64,
    /// Subsystems with at least one call
    pub subsystems: Vec<SubsystemStats>,
    /// Minimal safe inductive subsets found
    pub msis_found: u64,
    /// IVCs found
    pub ivcs_found: u64,
    /// Smallest IVC size
    pub min_ivc: Option<usize>,
    /// Largest IVC size
    pub max_ivc: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_calls() {
        let stats = Statistics::new();
        {
            let _t = stats.timer(Subsystem::Bmc);
        }
        {
            let _t = stats.timer(Subsystem::Bmc);
        }
        assert_eq!(stats.calls(Subsystem::Bmc), 2);
        assert_eq!(stats.calls(Subsystem::Ic3), 0);
    }

    #[test]
    fn test_ivc_bounds() {
        let stats = Statistics::new();
        assert_eq!(stats.ivc_bounds(), None);
        stats.record_ivc(4);
        stats.record_ivc(2);
        stats.record_ivc(7);
        assert_eq!(stats.ivc_bounds(), Some((2, 7)));
        assert!(stats.summary().contains("sizes 2..=7"));
    }

    #[test]
    fn test_snapshot_skips_idle_subsystems() {
        let stats = Statistics::new();
        drop(stats.timer(Subsystem::MaxSat));
        let snap = stats.snapshot();
        assert_eq!(snap.subsystems.len(), 1);
        assert_eq!(snap.subsystems[0].name, "maxsat");
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"maxsat\""));
    }
}
