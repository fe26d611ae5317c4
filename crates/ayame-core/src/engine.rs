//! Engine orchestration: edge intake from both producers, remap
//! application, frame/gate bookkeeping and snapshot emission.
//!
//! All mutable state lives in one `EngineShared` behind a mutex shared by
//! the hook callback and the polling worker. Critical sections stay
//! short: no I/O and no emission work happen under the lock; snapshots
//! are handed to the consumer through a bounded channel that never blocks
//! the producers.

use crate::backend::Backend;
use crate::config::{ConfigError, MonitorConfig};
use crate::frame::FrameBuffer;
use crate::gate::Gate;
use crate::key_map;
use crate::remap::{self, RemapRules};
use crate::tracker::KeyStateTracker;
use crate::types::{EngineStatus, Frame, KeyCode, INVALID_KEY, MAX_KEY_CODE};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const FRAME_QUEUE_CAP: usize = 64;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start polling worker: {0}")]
    ThreadStart(#[from] std::io::Error),
    #[error("failed to install keyboard hook: {0}")]
    HookInstall(String),
}

struct EngineShared {
    config: MonitorConfig,
    rules: RemapRules,
    tracker: KeyStateTracker,
    frames: FrameBuffer,
    gate: Gate,
    running: bool,
}

impl EngineShared {
    fn new(config: MonitorConfig) -> Self {
        let rules = RemapRules::from_config(&config.remaps);
        Self {
            frames: FrameBuffer::new(config.frame_rate, Instant::now()),
            gate: Gate::new(config.gate_timeout()),
            tracker: KeyStateTracker::new(),
            rules,
            config,
            running: false,
        }
    }

    /// The raw lock key stays visible when its own rule names itself or
    /// when reporting is re-enabled by configuration.
    fn lock_report_exception(&self, code: KeyCode) -> bool {
        key_map::is_lock_key(code)
            && (self.rules.rule_targets_self(code) || self.config.report_lock_keys)
    }

    fn on_edge(
        &mut self,
        backend: &dyn Backend,
        code: KeyCode,
        pressed: bool,
        now: Instant,
    ) -> Option<Frame> {
        if !self.running {
            return None;
        }
        if code == INVALID_KEY || key_map::name_for_code(code).is_none() {
            return None;
        }
        self.frames.advance(now);
        if pressed {
            self.on_press_edge(backend, code, now)
        } else {
            self.on_release_edge(backend, code, now)
        }
    }

    fn on_press_edge(
        &mut self,
        backend: &dyn Backend,
        code: KeyCode,
        now: Instant,
    ) -> Option<Frame> {
        // Repeat edges of an already-consumed source stay hidden.
        if self.tracker.is_remapped(code) && !self.lock_report_exception(code) {
            return None;
        }

        let mut consumed = false;
        let mut report = true;
        if self.config.enable_remapper
            && !self.tracker.is_tracked(code)
            && !self.tracker.is_active_target(code)
        {
            // Rules are mutable at runtime, so resolution re-runs on
            // every press edge and is never cached.
            match remap::resolve(&self.rules, code, self.config.max_remap_chain_length) {
                Ok(targets) if !targets.is_empty() => {
                    let press_frame = self.frames.current().frame_number;
                    self.tracker.on_press(code, targets, press_frame, backend);
                    consumed = true;
                    if key_map::is_lock_key(code) {
                        // Undo the native toggle that accompanied this press.
                        if let Err(error) = backend.toggle_lock(code) {
                            warn!(code, %error, "lock toggle suppression failed");
                        }
                        report = self.lock_report_exception(code);
                    } else {
                        report = false;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(code, %error, "remap rejected; key passes through unremapped");
                }
            }
        }

        if !consumed {
            let press_frame = self.frames.current().frame_number;
            self.tracker.on_press(code, Vec::new(), press_frame, backend);
        }

        // Every edge opens the gate, consumed or not: the window must not
        // close while a hidden source key is still held.
        self.gate.open(now);
        if consumed && !report {
            return None;
        }
        self.frames.record_press(code, now);
        Some(self.frames.snapshot())
    }

    fn on_release_edge(
        &mut self,
        backend: &dyn Backend,
        code: KeyCode,
        now: Instant,
    ) -> Option<Frame> {
        let hidden = self.tracker.is_remapped(code) && !self.lock_report_exception(code);
        self.tracker.on_release(code, backend);
        self.gate.open(now);
        if hidden {
            return None;
        }
        self.frames.record_release(code, now);
        Some(self.frames.snapshot())
    }
}

/// Cloneable producer-side handle: the hook callback and the polling
/// worker both feed edges through one of these.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Mutex<EngineShared>>,
    backend: Arc<dyn Backend>,
    tx: Sender<Frame>,
}

impl EngineHandle {
    /// Push-producer entry. Runs inside the host input-dispatch path, so
    /// it must return quickly: one short lock, then a non-blocking send.
    pub fn push_edge(&self, code: KeyCode, pressed: bool) {
        let now = Instant::now();
        let snapshot = {
            let mut shared = self.shared.lock();
            shared.on_edge(self.backend.as_ref(), code, pressed, now)
        };
        if let Some(frame) = snapshot {
            self.emit(frame);
        }
    }

    /// One scan cycle of the poll producer: diff the OS key-down snapshot
    /// against the tracked state, synthesize the edges, then emit the
    /// current frame while the gate is open.
    pub fn poll_once(&self, now: Instant) {
        let snapshot = {
            let mut shared = self.shared.lock();
            if !shared.running {
                return;
            }
            shared.frames.advance(now);
            for code in 1..=MAX_KEY_CODE {
                if key_map::name_for_code(code).is_none() {
                    continue;
                }
                let down = self.backend.is_down(code);
                let was_down = shared.tracker.is_tracked(code);
                if down != was_down {
                    shared.on_edge(self.backend.as_ref(), code, down, now);
                }
            }
            let any_held = shared.tracker.any_pressed();
            let open = shared.gate.update(now, any_held);
            open.then(|| shared.frames.snapshot())
        };
        if let Some(frame) = snapshot {
            self.emit(frame);
        }
    }

    fn emit(&self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("frame queue full, dropping snapshot"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub struct InputEngine {
    handle: EngineHandle,
    rx: Receiver<Frame>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl InputEngine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = bounded(FRAME_QUEUE_CAP);
        Self {
            handle: EngineHandle {
                shared: Arc::new(Mutex::new(EngineShared::new(MonitorConfig::default()))),
                backend,
                tx,
            },
            rx,
            stop_tx: None,
            worker: None,
        }
    }

    /// Producer-side handle for a hook registration.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Frame snapshot stream for the consumer side.
    pub fn frames(&self) -> Receiver<Frame> {
        self.rx.clone()
    }

    /// Validate and apply a configuration. On failure the prior
    /// configuration stays active. Noisy remap rules are accepted with
    /// warnings; per-press resolution rejects bad chains on its own.
    pub fn set_config(&self, config: MonitorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let rules = RemapRules::from_config(&config.remaps);
        for issue in remap::validate_rules(&rules, config.max_remap_chain_length) {
            warn!(%issue, "remap rule issue");
        }

        let mut shared = self.handle.shared.lock();
        shared.frames.set_frame_rate(config.frame_rate);
        shared.gate.set_timeout(config.gate_timeout());
        shared.rules = rules;
        shared.config = config;
        debug!("configuration applied");
        Ok(())
    }

    /// Idempotent. Spawns the polling worker; a spawn failure is fatal
    /// and leaves the engine disabled.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let interval = {
            let mut shared = self.handle.shared.lock();
            shared.running = true;
            shared.config.poll_interval()
        };

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = self.handle.clone();
        let spawned = thread::Builder::new()
            .name("ayame-poll".to_string())
            .spawn(move || {
                debug!("polling worker started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => handle.poll_once(Instant::now()),
                        _ => break,
                    }
                }
                debug!("polling worker exited");
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                self.stop_tx = Some(stop_tx);
                info!("input engine started");
                Ok(())
            }
            Err(error) => {
                self.handle.shared.lock().running = false;
                Err(EngineError::ThreadStart(error))
            }
        }
    }

    /// Install the low-level keyboard hook as a second producer, then
    /// start the engine. A hook failure is fatal and leaves the engine
    /// disabled.
    #[cfg(windows)]
    pub fn start_with_hook(&mut self) -> Result<(), EngineError> {
        crate::hook::install(self.handle())
            .map_err(|error| EngineError::HookInstall(error.to_string()))?;
        if let Err(error) = self.start() {
            crate::hook::uninstall();
            return Err(error);
        }
        Ok(())
    }

    /// Idempotent. Releases the hook registration (if any) and joins the
    /// polling worker before returning.
    pub fn stop(&mut self) {
        #[cfg(windows)]
        crate::hook::uninstall();

        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("polling worker panicked");
            }
        }
        self.handle.shared.lock().running = false;
        info!("input engine stopped");
    }

    pub fn status(&self) -> EngineStatus {
        let shared = self.handle.shared.lock();
        if !shared.running {
            EngineStatus::Disabled
        } else if shared.gate.is_open() {
            EngineStatus::GateOpen
        } else {
            EngineStatus::Idle
        }
    }

    pub fn push_edge(&self, code: KeyCode, pressed: bool) {
        self.handle.push_edge(code, pressed);
    }

    pub fn poll_once(&self, now: Instant) {
        self.handle.poll_once(now);
    }
}

impl Drop for InputEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
