//! Per-key press/release bookkeeping and remap-target injection.

use crate::backend::Backend;
use crate::key_map;
use crate::types::KeyCode;
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// Bookkeeping for one tracked key. Created on the press edge, destroyed
/// on the release edge; destruction cascades a reverse-order release of
/// the remapped targets.
#[derive(Debug, Clone)]
pub struct KeyState {
    pub pressed: bool,
    pub is_modifier: bool,
    pub press_frame: u64,
    pub targets: Vec<KeyCode>,
}

#[derive(Debug, Default)]
pub struct KeyStateTracker {
    states: HashMap<KeyCode, KeyState>,
    /// Refcounted membership over all live remap targets. Two sources may
    /// map onto the same target; the target stays active until both drop.
    target_refs: HashMap<KeyCode, u32>,
    /// Codes currently being resolved/applied; re-entry is a no-op.
    in_progress: HashSet<KeyCode>,
}

impl KeyStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a press edge. Targets are press-injected in list order,
    /// skipping any target already physically held. Pressing an
    /// already-tracked code (key repeat) is a no-op.
    pub fn on_press(
        &mut self,
        code: KeyCode,
        targets: Vec<KeyCode>,
        press_frame: u64,
        backend: &dyn Backend,
    ) {
        if self.states.contains_key(&code) || self.in_progress.contains(&code) {
            return;
        }
        self.in_progress.insert(code);

        for &target in &targets {
            *self.target_refs.entry(target).or_insert(0) += 1;
            if backend.is_down(target) {
                trace!(code = target, "target already held, skipping press injection");
                continue;
            }
            if let Err(error) = backend.inject_press(target) {
                warn!(code = target, %error, "press injection failed");
            }
        }

        self.states.insert(
            code,
            KeyState {
                pressed: true,
                is_modifier: key_map::is_modifier_key(code),
                press_frame,
                targets,
            },
        );

        self.in_progress.remove(&code);
    }

    /// Track a release edge. Tracked targets are release-injected in
    /// reverse order, then all bookkeeping for targets and source is
    /// dropped. Releasing an untracked code is a no-op.
    pub fn on_release(&mut self, code: KeyCode, backend: &dyn Backend) {
        if self.in_progress.contains(&code) {
            return;
        }
        let Some(state) = self.states.remove(&code) else {
            return;
        };
        self.in_progress.insert(code);

        for &target in state.targets.iter().rev() {
            if let Err(error) = backend.inject_release(target) {
                warn!(code = target, %error, "release injection failed");
            }
            if let Some(refs) = self.target_refs.get_mut(&target) {
                *refs -= 1;
                if *refs == 0 {
                    self.target_refs.remove(&target);
                }
            }
        }

        self.in_progress.remove(&code);
    }

    pub fn is_tracked(&self, code: KeyCode) -> bool {
        self.states.contains_key(&code)
    }

    pub fn is_remapped(&self, code: KeyCode) -> bool {
        self.states
            .get(&code)
            .map(|s| !s.targets.is_empty())
            .unwrap_or(false)
    }

    pub fn active_targets(&self, code: KeyCode) -> &[KeyCode] {
        self.states
            .get(&code)
            .map(|s| s.targets.as_slice())
            .unwrap_or(&[])
    }

    /// True while `code` is a live target of any tracked remap. Guards
    /// injected keys against being remapped in turn.
    pub fn is_active_target(&self, code: KeyCode) -> bool {
        self.target_refs.contains_key(&code)
    }

    /// Authoritative "any key held" signal for the gate.
    pub fn any_pressed(&self) -> bool {
        self.states.values().any(|s| s.pressed)
    }

    pub fn pressed_codes(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.states
            .iter()
            .filter(|(_, s)| s.pressed)
            .map(|(&code, _)| code)
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.target_refs.clear();
        self.in_progress.clear();
    }
}
