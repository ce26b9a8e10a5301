//! Debug overlay: frame statistics and live bloom tuning.
//!
//! Stats are reported once per second, both in the window title and as an
//! `info` log line. Number keys nudge the bloom parameters:
//!
//! | Key | Effect             |
//! |-----|--------------------|
//! | 1/2 | strength -/+ 0.1   |
//! | 3/4 | radius -/+ 0.05    |
//! | 5/6 | threshold -/+ 0.05 |

use winit::keyboard::KeyCode;

use crate::input::Input;
use crate::postprocess::BloomSettings;

const REPORT_INTERVAL: f32 = 1.0;

/// Frame timings aggregated over one report interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatsSnapshot {
    pub fps: f32,
    pub avg_ms: f32,
    pub max_ms: f32,
}

impl StatsSnapshot {
    /// Window title with the stats appended.
    pub fn title(&self, base: &str) -> String {
        format!(
            "{base} | {:.0} fps | {:.2} ms avg | {:.2} ms max",
            self.fps, self.avg_ms, self.max_ms
        )
    }
}

/// Brackets each tick with [`begin`](Self::begin)/[`end`](Self::end).
///
/// Times are elapsed seconds from the application clock.
#[derive(Clone, Debug, Default)]
pub struct FrameStats {
    window_start: Option<f32>,
    frame_start: Option<f32>,
    frames: u32,
    total_ms: f32,
    max_ms: f32,
    last: Option<StatsSnapshot>,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, now: f32) {
        self.window_start.get_or_insert(now);
        self.frame_start = Some(now);
    }

    /// Close the current frame. Returns a snapshot when a report interval
    /// has elapsed.
    pub fn end(&mut self, now: f32) -> Option<StatsSnapshot> {
        let start = self.frame_start.take()?;
        let ms = (now - start).max(0.0) * 1000.0;
        self.frames += 1;
        self.total_ms += ms;
        self.max_ms = self.max_ms.max(ms);

        let window_start = self.window_start?;
        let span = now - window_start;
        if span < REPORT_INTERVAL {
            return None;
        }

        let snapshot = StatsSnapshot {
            fps: self.frames as f32 / span,
            avg_ms: self.total_ms / self.frames as f32,
            max_ms: self.max_ms,
        };
        self.window_start = Some(now);
        self.frames = 0;
        self.total_ms = 0.0;
        self.max_ms = 0.0;
        self.last = Some(snapshot);
        Some(snapshot)
    }

    /// The most recent report, if any.
    pub fn last(&self) -> Option<StatsSnapshot> {
        self.last
    }
}

/// Stats plus the bloom tuning panel.
#[derive(Clone, Debug, Default)]
pub struct DebugOverlay {
    pub stats: FrameStats,
    title: Option<String>,
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, now: f32) {
        self.stats.begin(now);
    }

    pub fn end(&mut self, now: f32, base_title: &str) {
        if let Some(snapshot) = self.stats.end(now) {
            tracing::info!(
                fps = format_args!("{:.1}", snapshot.fps),
                avg_ms = format_args!("{:.2}", snapshot.avg_ms),
                max_ms = format_args!("{:.2}", snapshot.max_ms),
                "frame stats"
            );
            self.title = Some(snapshot.title(base_title));
        }
    }

    /// A new window title, once per report. The host applies it.
    pub fn take_title(&mut self) -> Option<String> {
        self.title.take()
    }

    /// Apply tuning keys. Returns true if the settings changed.
    pub fn tune_bloom(&self, input: &Input, bloom: &mut BloomSettings) -> bool {
        let before = *bloom;
        let mut next = before;

        if input.key_pressed(KeyCode::Digit1) {
            next.strength -= 0.1;
        }
        if input.key_pressed(KeyCode::Digit2) {
            next.strength += 0.1;
        }
        if input.key_pressed(KeyCode::Digit3) {
            next.radius -= 0.05;
        }
        if input.key_pressed(KeyCode::Digit4) {
            next.radius += 0.05;
        }
        if input.key_pressed(KeyCode::Digit5) {
            next.threshold -= 0.05;
        }
        if input.key_pressed(KeyCode::Digit6) {
            next.threshold += 0.05;
        }

        *bloom = next.clamped();
        if *bloom != before {
            tracing::info!(
                strength = bloom.strength,
                radius = bloom.radius,
                threshold = bloom.threshold,
                "bloom tuned"
            );
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_second() {
        let mut stats = FrameStats::new();
        let mut reports = Vec::new();
        for i in 0..120 {
            let t = i as f32 * 0.01;
            stats.begin(t);
            if let Some(s) = stats.end(t + 0.004) {
                reports.push(s);
            }
        }
        assert_eq!(reports.len(), 1);
        let s = reports[0];
        assert!((s.avg_ms - 4.0).abs() < 0.01);
        assert!(s.fps > 90.0 && s.fps < 110.0);
        assert_eq!(stats.last(), Some(s));
    }

    #[test]
    fn max_tracks_slowest_frame() {
        let mut stats = FrameStats::new();
        stats.begin(0.0);
        stats.end(0.002);
        stats.begin(0.5);
        stats.end(0.53);
        stats.begin(1.0);
        let s = stats.end(1.001).unwrap();
        assert!((s.max_ms - 30.0).abs() < 0.01);
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut stats = FrameStats::new();
        assert_eq!(stats.end(5.0), None);
    }

    #[test]
    fn title_is_set_on_report() {
        let mut overlay = DebugOverlay::new();
        overlay.begin(0.0);
        overlay.end(1.5, "glowsphere");
        let title = overlay.take_title().unwrap();
        assert!(title.starts_with("glowsphere | "));
        assert!(overlay.take_title().is_none());
    }

    #[test]
    fn number_keys_tune_bloom() {
        let overlay = DebugOverlay::new();
        let mut bloom = BloomSettings::default();

        let mut input = Input::new();
        input.press_key(KeyCode::Digit2);
        input.press_key(KeyCode::Digit5);
        assert!(overlay.tune_bloom(&input, &mut bloom));
        assert!((bloom.strength - 0.9).abs() < 1e-6);
        assert!((bloom.threshold - 0.65).abs() < 1e-6);

        let idle = Input::new();
        assert!(!overlay.tune_bloom(&idle, &mut bloom));
    }
}
