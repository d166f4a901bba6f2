#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub phase_time: Duration,
    pub elapsed_time: Duration,
}

/// 記錄每個分析階段 (讀取 / 呼叫模型 / 寫出) 的耗時與記憶體
#[cfg(feature = "cli")]
pub struct RunMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    last_phase: Mutex<Instant>,
    peak_memory_mb: Mutex<u64>,
    phases: Mutex<Vec<PhaseStats>>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if enabled && pid.is_none() {
            tracing::warn!("Could not determine current PID, memory stats will be zero");
        }

        let mut system = System::new();
        if enabled {
            system.refresh_all();
        }

        let now = Instant::now();
        Self {
            system: Mutex::new(system),
            pid,
            start_time: now,
            last_phase: Mutex::new(now),
            peak_memory_mb: Mutex::new(0),
            phases: Mutex::new(Vec::new()),
            enabled,
        }
    }

    pub fn record_phase(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let (cpu_usage, memory_mb) = {
            let mut system = self.system.lock().ok()?;
            system.refresh_all();
            self.pid
                .and_then(|pid| system.process(pid))
                .map(|p| (p.cpu_usage(), p.memory() / 1024 / 1024))
                .unwrap_or((0.0, 0))
        };

        if let Ok(mut peak) = self.peak_memory_mb.lock() {
            *peak = (*peak).max(memory_mb);
        }

        let phase_time = {
            let mut last = self.last_phase.lock().ok()?;
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let stats = PhaseStats {
            phase: phase.to_string(),
            cpu_usage,
            memory_usage_mb: memory_mb,
            phase_time,
            elapsed_time: self.start_time.elapsed(),
        };

        tracing::info!(
            "📊 {} - CPU: {:.1}%, Memory: {}MB, Phase: {:?}, Total: {:?}",
            stats.phase,
            stats.cpu_usage,
            stats.memory_usage_mb,
            stats.phase_time,
            stats.elapsed_time
        );

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(stats.clone());
        }
        Some(stats)
    }

    pub fn log_summary(&self) {
        if !self.enabled {
            return;
        }

        let peak = self.peak_memory_mb.lock().map(|p| *p).unwrap_or(0);
        let slowest = self.phases.lock().ok().and_then(|phases| {
            phases
                .iter()
                .max_by_key(|s| s.phase_time)
                .map(|s| (s.phase.clone(), s.phase_time))
        });

        match slowest {
            Some((phase, time)) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB, Slowest phase: {} ({:?})",
                self.start_time.elapsed(),
                peak,
                phase,
                time
            ),
            None => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.start_time.elapsed(),
                peak
            ),
        }
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置不帶 sysinfo
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct RunMonitor;

#[cfg(not(feature = "cli"))]
impl RunMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn record_phase(&self, _phase: &str) {}

    pub fn log_summary(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = RunMonitor::new(false);
        assert!(monitor.record_phase("extract").is_none());
        assert!(monitor.phases().is_empty());
    }

    #[test]
    fn test_enabled_monitor_keeps_phase_order() {
        let monitor = RunMonitor::new(true);
        monitor.record_phase("extract");
        monitor.record_phase("transform");

        let names: Vec<String> = monitor.phases().into_iter().map(|s| s.phase).collect();
        assert_eq!(names, vec!["extract", "transform"]);
    }
}
