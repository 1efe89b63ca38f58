use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cumulative wall time and call count for one profiled stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTiming {
    pub total: Duration,
    pub calls: u32,
}

/// Scoped profiler recording cumulative time per pipeline stage
/// (LHS draw, Cholesky, neighbor search, clustering).
#[derive(Debug, Default)]
pub struct Profiler {
    pub timings: HashMap<&'static str, StageTiming>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        let entry = self.timings.entry(guard.stage).or_default();
        entry.total += guard.start.elapsed();
        entry.calls += 1;
    }

    /// Stages ordered by total time, slowest first.
    pub fn report_sorted(&self) -> Vec<(&'static str, StageTiming)> {
        let mut v: Vec<_> = self.timings.iter().map(|(n, t)| (*n, *t)).collect();
        v.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        v
    }

    pub fn clear(&mut self) {
        self.timings.clear();
    }

    pub fn log_and_clear(&mut self) {
        for (stage, timing) in self.report_sorted() {
            tracing::info!(stage, calls = timing.calls, total = ?timing.total, "profile");
        }
        self.clear();
    }
}

pub struct ProfilerGuard {
    stage: &'static str,
    start: Instant,
}

/// Start a profiling section. The guard reports to the global profiler
/// when dropped.
pub fn start(stage: &'static str) -> ProfilerGuard {
    ProfilerGuard { stage, start: Instant::now() }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Profile the enclosing scope when the `profiling` feature is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_accumulates_calls_per_stage() {
        let mut profiler = Profiler::new();
        let a = start("neighbor_search");
        profiler.finish(&a);
        profiler.finish(&a);
        let b = start("cholesky");
        profiler.finish(&b);

        assert_eq!(profiler.timings["neighbor_search"].calls, 2);
        assert_eq!(profiler.timings["cholesky"].calls, 1);
        assert_eq!(profiler.report_sorted().len(), 2);

        profiler.clear();
        assert!(profiler.timings.is_empty());
    }
}
