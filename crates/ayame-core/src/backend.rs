//! Seam between the engine and the OS input layer.
//!
//! The engine only ever talks to the OS through this trait: key-down
//! snapshots for the poll producer, press/release injection for the
//! tracker, and the lock-key query/toggle primitive. Production code uses
//! the Windows implementation in `hook`; tests drive the engine with an
//! in-memory scripted implementation.

use crate::types::KeyCode;
use anyhow::Result;

pub trait Backend: Send + Sync {
    /// True when the OS reports the key down, physically or synthetically.
    fn is_down(&self, code: KeyCode) -> bool;

    fn inject_press(&self, code: KeyCode) -> Result<()>;

    fn inject_release(&self, code: KeyCode) -> Result<()>;

    /// Current toggle state of a lock key.
    fn lock_state(&self, code: KeyCode) -> bool;

    /// Issue one synthetic toggle of a lock key.
    fn toggle_lock(&self, code: KeyCode) -> Result<()>;
}
