pub mod backend;
pub mod config;
pub mod engine;
pub mod frame;
pub mod gate;
#[cfg(windows)]
pub mod hook;
pub mod key_map;
pub mod remap;
pub mod tracker;
pub mod types;

pub use backend::Backend;
pub use config::{ConfigError, MonitorConfig};
pub use engine::{EngineError, EngineHandle, InputEngine};
pub use remap::{RemapError, RemapRules};
pub use types::{EngineStatus, Frame, KeyCode, INVALID_KEY, MAX_KEY_CODE};
