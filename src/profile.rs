//! Phase timing for the clustering pipeline.
//!
//! Scopes are only timed when built with the `profiling` feature; otherwise
//! [`profile_scope`] returns an inert guard and [`snapshot`] is always empty.

use serde::Serialize;

/// Accumulated wall time of one named phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub calls: u64,
    pub total_ms: f64,
    pub avg_ms: f64,
}

#[cfg(feature = "profiling")]
mod imp {
    use super::PhaseTiming;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// (phase, calls, total); phases are few, a linear scan is enough
    static PHASES: Mutex<Vec<(&'static str, u64, Duration)>> = Mutex::new(Vec::new());

    pub struct ProfileGuard {
        phase: &'static str,
        started: Instant,
    }

    impl Drop for ProfileGuard {
        fn drop(&mut self) {
            let elapsed = self.started.elapsed();
            let Ok(mut phases) = PHASES.lock() else {
                return;
            };
            match phases.iter_mut().find(|(phase, _, _)| *phase == self.phase) {
                Some((_, calls, total)) => {
                    *calls += 1;
                    *total += elapsed;
                }
                None => phases.push((self.phase, 1, elapsed)),
            }
        }
    }

    pub fn profile_scope(phase: &'static str) -> ProfileGuard {
        ProfileGuard {
            phase,
            started: Instant::now(),
        }
    }

    pub fn snapshot() -> Vec<PhaseTiming> {
        let Ok(phases) = PHASES.lock() else {
            return Vec::new();
        };
        let mut timings: Vec<PhaseTiming> = phases
            .iter()
            .map(|&(phase, calls, total)| {
                let total_ms = total.as_secs_f64() * 1000.0;
                PhaseTiming {
                    phase,
                    calls,
                    total_ms,
                    avg_ms: if calls == 0 { 0.0 } else { total_ms / calls as f64 },
                }
            })
            .collect();
        timings.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms));
        timings
    }
}

#[cfg(not(feature = "profiling"))]
mod imp {
    use super::PhaseTiming;

    pub struct ProfileGuard;

    #[inline]
    pub fn profile_scope(_phase: &'static str) -> ProfileGuard {
        ProfileGuard
    }

    pub fn snapshot() -> Vec<PhaseTiming> {
        Vec::new()
    }
}

pub use imp::{profile_scope, snapshot, ProfileGuard};

/// Log every recorded phase, slowest first.
pub fn log_report() {
    for timing in snapshot() {
        tracing::info!(
            phase = timing.phase,
            calls = timing.calls,
            total_ms = timing.total_ms,
            avg_ms = timing.avg_ms,
            "Phase timing"
        );
    }
}
