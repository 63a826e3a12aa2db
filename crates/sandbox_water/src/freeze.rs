//! Frame freeze and delayed gesture replay.
//!
//! While frozen the terrain shows a captured depth snapshot, so settle events
//! are not applied immediately. They wait `gesture_delay_frames` frozen ticks
//! and are then released in arrival order. Unfreezing drops whatever is still
//! waiting: stale input from a frozen frame must not reappear later.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::FreezeParams;
use crate::depth::DepthFrame;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};
use crate::stability::SettleEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezeMode {
    Live,
    Frozen,
}

/// Depth buffers captured at the moment of freezing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FreezeSnapshot {
    pub width: usize,
    pub height: usize,
    pub raw: Vec<u16>,
    pub processed: Vec<f32>,
}

impl FreezeSnapshot {
    /// Copy into existing storage, reusing its allocation.
    fn capture(&mut self, raw: &DepthFrame, processed: &[f32]) {
        self.width = raw.width;
        self.height = raw.height;
        self.raw.clear();
        self.raw.extend_from_slice(&raw.samples);
        self.processed.clear();
        self.processed.extend_from_slice(processed);
    }
}

/// A settle event waiting out its replay delay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferedGesture {
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub world_position: Vec3,
    /// Session time (s) the gesture arrived.
    pub created_at: f64,
    pub remaining_delay_frames: u32,
    pub source_gesture_id: u64,
}

/// LIVE/FROZEN state machine with the gesture replay queue.
#[derive(Debug)]
pub struct FreezeGestureBuffer {
    mode: FreezeMode,
    snapshot: Option<FreezeSnapshot>,
    buffered: Vec<BufferedGesture>,
    params: FreezeParams,
    /// Frozen ticks since the last freeze.
    frozen_ticks: u64,
}

impl FreezeGestureBuffer {
    pub fn new(params: FreezeParams) -> Self {
        Self {
            mode: FreezeMode::Live,
            snapshot: None,
            buffered: Vec::new(),
            params,
            frozen_ticks: 0,
        }
    }

    pub fn mode(&self) -> FreezeMode {
        self.mode
    }

    pub fn is_frozen(&self) -> bool {
        self.mode == FreezeMode::Frozen
    }

    pub fn buffered(&self) -> &[BufferedGesture] {
        &self.buffered
    }

    pub fn frozen_ticks(&self) -> u64 {
        self.frozen_ticks
    }

    pub fn delay_frames(&self) -> u32 {
        self.params.gesture_delay_frames
    }

    /// Freeze on the given depth buffers. No-op unless LIVE and `ready`.
    pub fn freeze(&mut self, raw: &DepthFrame, processed: &[f32], ready: bool) -> bool {
        if self.is_frozen() || !ready {
            return false;
        }
        self.snapshot
            .get_or_insert_with(FreezeSnapshot::default)
            .capture(raw, processed);
        self.mode = FreezeMode::Frozen;
        self.frozen_ticks = 0;
        log::info!("Frame frozen ({}x{})", raw.width, raw.height);
        true
    }

    /// Back to LIVE. Returns how many waiting gestures were discarded, or
    /// `None` if already LIVE.
    pub fn unfreeze(&mut self) -> Option<usize> {
        if !self.is_frozen() {
            return None;
        }
        self.mode = FreezeMode::Live;
        self.frozen_ticks = 0;
        let discarded = self.buffered.len();
        self.buffered.clear();
        if discarded > 0 {
            log::info!("Frame unfrozen, discarded {} buffered gestures", discarded);
        } else {
            log::info!("Frame unfrozen");
        }
        Some(discarded)
    }

    /// Queue a settle event for delayed replay. No-op while LIVE.
    pub fn store(&mut self, event: &SettleEvent, now: f64) -> bool {
        if !self.is_frozen() {
            return false;
        }
        self.buffered.push(BufferedGesture {
            world_position: event.world_position,
            created_at: now,
            remaining_delay_frames: self.params.gesture_delay_frames,
            source_gesture_id: event.id,
        });
        log::debug!(
            "Buffered gesture {} for {} frames",
            event.id,
            self.params.gesture_delay_frames
        );
        true
    }

    /// Count every waiting gesture down by one frozen tick and return those
    /// that are due, oldest first.
    pub fn tick(&mut self) -> Vec<BufferedGesture> {
        if !self.is_frozen() {
            return Vec::new();
        }
        self.frozen_ticks += 1;
        if self.buffered.is_empty() {
            return Vec::new();
        }

        let mut released = Vec::new();
        self.buffered.retain_mut(|g| {
            g.remaining_delay_frames = g.remaining_delay_frames.saturating_sub(1);
            if g.remaining_delay_frames == 0 {
                released.push(g.clone());
                false
            } else {
                true
            }
        });
        released
    }

    /// Snapshot captured by the active freeze, `None` while LIVE.
    pub fn frozen_depth_buffer(&self) -> Option<&FreezeSnapshot> {
        if self.is_frozen() {
            self.snapshot.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, x: f32) -> SettleEvent {
        SettleEvent {
            id,
            world_position: Vec3::new(x, 10.0, 600.0),
            depth: 600.0,
            data_position: (0, 0),
            out_of_bounds: false,
        }
    }

    fn frozen() -> FreezeGestureBuffer {
        let mut buf = FreezeGestureBuffer::new(FreezeParams::default());
        assert!(buf.freeze(&DepthFrame::filled(4, 4, 900), &[90.0; 16], true));
        buf
    }

    #[test]
    fn test_freeze_requires_ready() {
        let mut buf = FreezeGestureBuffer::new(FreezeParams::default());
        assert!(!buf.freeze(&DepthFrame::filled(2, 2, 1), &[0.0; 4], false));
        assert_eq!(buf.mode(), FreezeMode::Live);
        assert!(buf.frozen_depth_buffer().is_none());
    }

    #[test]
    fn test_second_freeze_is_noop() {
        let mut buf = frozen();
        let first = buf.frozen_depth_buffer().cloned();
        assert!(!buf.freeze(&DepthFrame::filled(4, 4, 123), &[1.0; 16], true));
        assert_eq!(buf.frozen_depth_buffer().cloned(), first);
        assert_eq!(buf.frozen_depth_buffer().map(|s| s.raw[0]), Some(900));
    }

    #[test]
    fn test_store_while_live_is_noop() {
        let mut buf = FreezeGestureBuffer::new(FreezeParams::default());
        assert!(!buf.store(&event(1, 0.0), 0.0));
        assert!(buf.buffered().is_empty());
        assert!(buf.tick().is_empty());
        assert_eq!(buf.unfreeze(), None);
    }

    #[test]
    fn test_release_on_fifteenth_tick() {
        let mut buf = frozen();
        buf.store(&event(1000, 42.0), 1.5);
        for tick in 1..15 {
            assert!(buf.tick().is_empty(), "released early on tick {}", tick);
        }
        let released = buf.tick();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].world_position.x, 42.0);
        assert_eq!(released[0].source_gesture_id, 1000);
        assert_eq!(released[0].created_at, 1.5);
        assert!(buf.buffered().is_empty());
    }

    #[test]
    fn test_release_keeps_arrival_order() {
        let mut buf = frozen();
        buf.store(&event(1, 1.0), 0.0);
        buf.store(&event(2, 2.0), 0.0);
        buf.store(&event(3, 3.0), 0.0);
        let mut released = Vec::new();
        for _ in 0..15 {
            released.extend(buf.tick());
        }
        let ids: Vec<u64> = released.iter().map(|g| g.source_gesture_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_unfreeze_discards_pending() {
        let mut buf = frozen();
        buf.store(&event(1, 1.0), 0.0);
        for _ in 0..10 {
            assert!(buf.tick().is_empty());
        }
        assert_eq!(buf.unfreeze(), Some(1));
        assert!(buf.frozen_depth_buffer().is_none());
        assert!(buf.tick().is_empty());
    }

    #[test]
    fn test_snapshot_storage_reused_across_freezes() {
        let mut buf = frozen();
        let first_ptr = buf.frozen_depth_buffer().map(|s| s.raw.as_ptr());
        buf.unfreeze();
        assert!(buf.freeze(&DepthFrame::filled(4, 4, 777), &[77.7; 16], true));
        let snap = buf.frozen_depth_buffer().expect("snapshot");
        assert_eq!(snap.raw[5], 777);
        assert_eq!(Some(snap.raw.as_ptr()), first_ptr);
    }
}
