//! Per-frame timing summaries.
//!
//! A [`FrameTimer`] is driven by the window while it renders one frame:
//! each phase is closed with [`FrameTimer::mark`], and [`FrameTimer::finish`]
//! yields the [`FrameTimings`] handed to profile subscribers.
//!
//! ```text
//!   begin ──router──► mark ──gpu──► mark ──present──► finish
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Time spent in each phase of one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTimings {
    /// Frame sequence number
    pub seq: u64,
    pub phases: Vec<(String, Duration)>,
    pub total: Duration,
}

impl FrameTimings {
    pub fn phase(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Compact single-line form, e.g. `tot:1.20ms router:0.10ms gpu:0.90ms`.
impl fmt::Display for FrameTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tot:{:.2}ms", ms(self.total))?;
        for (name, d) in &self.phases {
            write!(f, " {name}:{:.2}ms", ms(*d))?;
        }
        Ok(())
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Stopwatch splitting one frame into named phases.
#[derive(Debug)]
pub struct FrameTimer {
    seq: u64,
    start: Instant,
    last: Instant,
    phases: Vec<(String, Duration)>,
}

impl FrameTimer {
    pub fn begin(seq: u64) -> Self {
        let now = Instant::now();
        Self {
            seq,
            start: now,
            last: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `name`.
    pub fn mark(&mut self, name: &str) {
        let now = Instant::now();
        self.phases.push((name.to_string(), now - self.last));
        self.last = now;
    }

    /// Finish the frame and record a frame marker with the global profiler.
    pub fn finish(self) -> FrameTimings {
        let total = self.start.elapsed();
        crate::record_frame_time(ms(total) as f32);
        FrameTimings {
            seq: self.seq,
            phases: self.phases,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_phases_in_order() {
        let t = FrameTimings {
            seq: 3,
            phases: vec![
                ("router".into(), Duration::from_micros(100)),
                ("gpu".into(), Duration::from_micros(900)),
            ],
            total: Duration::from_micros(1200),
        };
        assert_eq!(t.to_string(), "tot:1.20ms router:0.10ms gpu:0.90ms");
        assert_eq!(t.phase("gpu"), Some(Duration::from_micros(900)));
        assert_eq!(t.phase("present"), None);
    }

    #[test]
    fn test_timer_records_marks() {
        let mut timer = FrameTimer::begin(7);
        timer.mark("router");
        timer.mark("gpu");
        let t = timer.finish();
        assert_eq!(t.seq, 7);
        let names: Vec<&str> = t.phases.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["router", "gpu"]);
        let sum: Duration = t.phases.iter().map(|(_, d)| *d).sum();
        assert!(sum <= t.total);
    }

    #[test]
    fn test_json_export() {
        let t = FrameTimings {
            seq: 1,
            ..Default::default()
        };
        let json = t.to_json().unwrap();
        let back: FrameTimings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
