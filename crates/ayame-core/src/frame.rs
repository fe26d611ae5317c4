//! Discretization of edge events into fixed-period frames.

use crate::types::{Frame, KeyCode};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_FRAME_RATE: u32 = 60;

fn period_for_rate(rate: u32) -> Duration {
    // Sub-millisecond resolution; 60 Hz comes out at ~16.7 ms.
    Duration::from_secs_f64(1.0 / rate.max(1) as f64)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Maintains the single current frame. A boundary is crossed when the
/// elapsed time since the last boundary reaches the frame period; crossing
/// copies `held` forward by value and clears both edge sets.
///
/// An edge that would put one code into both `just_pressed` and
/// `just_released` within the same frame forces a boundary first, so the
/// two sets stay disjoint and neither edge is lost.
#[derive(Debug)]
pub struct FrameBuffer {
    current: Frame,
    /// Frame number at which each held code was first pressed.
    press_frames: HashMap<KeyCode, u64>,
    period: Duration,
    last_boundary: Instant,
}

impl FrameBuffer {
    pub fn new(frame_rate: u32, now: Instant) -> Self {
        Self {
            current: Frame {
                frame_number: 1,
                timestamp_ms: unix_millis(),
                ..Frame::default()
            },
            press_frames: HashMap::new(),
            period: period_for_rate(frame_rate),
            last_boundary: now,
        }
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32) {
        self.period = period_for_rate(frame_rate);
    }

    /// Cross a frame boundary if the period has elapsed, then hand back
    /// the current frame.
    pub fn advance(&mut self, now: Instant) -> &Frame {
        if now.saturating_duration_since(self.last_boundary) >= self.period {
            self.roll(now);
        }
        &self.current
    }

    fn roll(&mut self, now: Instant) {
        // `held` carries over in place; the emitted snapshots are clones,
        // so no consumer ever aliases the live set.
        self.current.frame_number += 1;
        self.current.timestamp_ms = unix_millis();
        self.current.just_pressed.clear();
        self.current.just_released.clear();
        self.last_boundary = now;
        self.refresh_hold_durations();
    }

    pub fn record_press(&mut self, code: KeyCode, now: Instant) {
        if self.current.held.contains(&code) {
            // Repeat edge for a settled code.
            return;
        }
        if self.current.just_released.contains(&code) {
            self.roll(now);
        }
        self.current.just_pressed.insert(code);
        self.current.held.insert(code);
        self.press_frames.insert(code, self.current.frame_number);
        self.refresh_hold_durations();
    }

    pub fn record_release(&mut self, code: KeyCode, now: Instant) {
        if !self.current.held.contains(&code) {
            return;
        }
        if self.current.just_pressed.contains(&code) {
            self.roll(now);
        }
        self.current.held.remove(&code);
        self.current.just_released.insert(code);
        self.press_frames.remove(&code);
        self.current.hold_durations.remove(&code);
        self.refresh_hold_durations();
    }

    fn refresh_hold_durations(&mut self) {
        let frame_number = self.current.frame_number;
        for &code in &self.current.held {
            if let Some(&start) = self.press_frames.get(&code) {
                self.current
                    .hold_durations
                    .insert(code, frame_number.saturating_sub(start));
            }
        }
    }

    /// Frames the code has been held, 0 when it is not held.
    pub fn hold_duration_of(&self, code: KeyCode) -> u64 {
        self.current.hold_durations.get(&code).copied().unwrap_or(0)
    }

    pub fn current(&self) -> &Frame {
        &self.current
    }

    pub fn snapshot(&self) -> Frame {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: KeyCode = 0x41;
    const B: KeyCode = 0x42;

    fn buffer() -> (FrameBuffer, Instant) {
        let base = Instant::now();
        (FrameBuffer::new(60, base), base)
    }

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn edges_update_the_current_frame_in_place() {
        let (mut fb, base) = buffer();

        fb.record_press(A, base);
        let frame = fb.current();
        assert!(frame.just_pressed.contains(&A));
        assert!(frame.held.contains(&A));
        assert_eq!(frame.frame_number, 1);
        assert_eq!(fb.hold_duration_of(A), 0);
    }

    #[test]
    fn boundary_carries_held_and_clears_edges() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);

        fb.advance(ms(base, 17));
        let frame = fb.current();
        assert_eq!(frame.frame_number, 2);
        assert!(frame.just_pressed.is_empty());
        assert!(frame.just_released.is_empty());
        assert!(frame.held.contains(&A));
        assert_eq!(fb.hold_duration_of(A), 1);
    }

    #[test]
    fn advance_within_the_period_does_not_roll() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);

        fb.advance(ms(base, 10));
        assert_eq!(fb.current().frame_number, 1);
        assert!(fb.current().just_pressed.contains(&A));
    }

    #[test]
    fn repeat_edges_for_settled_codes_are_no_ops() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        fb.advance(ms(base, 17));

        // A is held but no longer just-pressed; a repeat press changes nothing.
        fb.record_press(A, ms(base, 18));
        assert!(fb.current().just_pressed.is_empty());

        fb.record_release(B, ms(base, 18));
        assert!(fb.current().just_released.is_empty());
    }

    #[test]
    fn same_frame_tap_forces_a_boundary_keeping_edge_sets_disjoint() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        fb.record_release(A, ms(base, 2));

        let frame = fb.current();
        assert_eq!(frame.frame_number, 2);
        assert!(frame.just_pressed.is_empty());
        assert!(frame.just_released.contains(&A));
        assert!(!frame.held.contains(&A));
        assert!(frame.just_pressed.is_disjoint(&frame.just_released));
    }

    #[test]
    fn same_frame_repress_forces_a_boundary() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        fb.advance(ms(base, 17));
        fb.record_release(A, ms(base, 18));
        fb.record_press(A, ms(base, 20));

        let frame = fb.current();
        assert_eq!(frame.frame_number, 3);
        assert!(frame.just_pressed.contains(&A));
        assert!(!frame.just_released.contains(&A));
        assert!(frame.just_pressed.is_disjoint(&frame.just_released));
    }

    #[test]
    fn held_matches_press_release_balance_across_frames() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        fb.record_press(B, ms(base, 1));
        fb.advance(ms(base, 17));
        fb.record_release(A, ms(base, 18));
        fb.advance(ms(base, 34));
        fb.record_press(A, ms(base, 35));
        fb.advance(ms(base, 51));
        fb.record_release(B, ms(base, 52));

        let held = &fb.current().held;
        assert!(held.contains(&A));
        assert!(!held.contains(&B));
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn hold_durations_count_frames_since_press() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        for i in 1..=4 {
            fb.advance(ms(base, 17 * i));
        }
        assert_eq!(fb.hold_duration_of(A), 4);

        fb.record_press(B, ms(base, 69));
        assert_eq!(fb.hold_duration_of(B), 0);

        fb.advance(ms(base, 85));
        assert_eq!(fb.hold_duration_of(A), 5);
        assert_eq!(fb.hold_duration_of(B), 1);

        fb.record_release(A, ms(base, 86));
        assert_eq!(fb.hold_duration_of(A), 0);
    }

    #[test]
    fn snapshot_is_detached_from_the_live_frame() {
        let (mut fb, base) = buffer();
        fb.record_press(A, base);
        let snap = fb.snapshot();

        fb.record_press(B, ms(base, 1));
        assert!(!snap.held.contains(&B));
        assert!(fb.current().held.contains(&B));
    }
}
