use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Windows-style virtual key code. 0 is the invalid sentinel.
pub type KeyCode = u16;

pub const INVALID_KEY: KeyCode = 0;

/// Highest code the poll producer scans (inclusive).
pub const MAX_KEY_CODE: KeyCode = 0xFF;

/// Lifecycle state of the engine as observed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Disabled,
    /// Enabled, gate closed: nothing is being reported.
    Idle,
    /// Enabled, gate open: a reporting window is active.
    GateOpen,
}

/// Value snapshot of one reporting frame.
///
/// `held` at frame N+1 is seeded from frame N by value copy; the edge sets
/// are reset at every boundary. `just_pressed` and `just_released` are
/// disjoint within a single frame. Hold durations are measured in frames
/// since the press was first observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    pub just_pressed: HashSet<KeyCode>,
    pub held: HashSet<KeyCode>,
    pub just_released: HashSet<KeyCode>,
    pub hold_durations: HashMap<KeyCode, u64>,
}

impl Frame {
    /// True when the frame carries no key activity at all.
    pub fn is_quiet(&self) -> bool {
        self.just_pressed.is_empty() && self.held.is_empty() && self.just_released.is_empty()
    }
}
