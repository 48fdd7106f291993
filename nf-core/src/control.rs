//! Fan control loop
//!
//! Orchestrates the whole control core: a periodic worker samples and
//! filters the temperature, applies auxiliary register writes, drives each
//! fan's speed engine, writes the results to the EC and publishes an
//! immutable snapshot for readers.
//!
//! # Safety Features
//! - **Wait-gate**: timer and on-demand updates are serialized; a cycle
//!   that cannot take the gate in time is abandoned, never queued
//! - **Bounded EC locking**: every register access happens under the EC
//!   hardware lock, released on all exit paths via an RAII guard
//! - **Graceful degradation**: a failed cycle is skipped whole; the next
//!   cycle starts clean
//! - **Readback retries**: transient out-of-range readbacks are retried
//!   within the cycle
//! - **Reset on stop**: a best-effort multi-pass hardware reset runs
//!   exactly once, even on abnormal termination paths

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::constants::{control as control_const, timing};
use crate::data::{FanControlConfig, FanControlSnapshot};
use crate::engine::{Fan, RegisterWriteEngine, TemperatureFilter};
use crate::error::{NotefanError, Result};
use crate::hw::{EcLockGuard, EmbeddedController, TemperatureSource};

/// Lifecycle state of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl LoopState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
        }
    }
}

type UpdateListener = Box<dyn Fn(&FanControlSnapshot) + Send + Sync>;

/// The control-loop orchestrator.
///
/// Owns the temperature filter, one [`Fan`] engine per configured fan and
/// the register-write engine. Hardware is reached exclusively through the
/// injected [`EmbeddedController`] and [`TemperatureSource`] handles.
///
/// Dropping a running loop stops it and runs the hardware reset pass.
pub struct FanControl {
    shared: Arc<ControlShared>,
    worker: Option<thread::JoinHandle<()>>,
}

struct ControlShared {
    config: FanControlConfig,
    poll_interval: Duration,
    ec: Arc<dyn EmbeddedController>,
    sensor: Arc<dyn TemperatureSource>,
    fans: Mutex<Vec<Fan>>,
    filter: Mutex<TemperatureFilter>,
    registers: RegisterWriteEngine,
    state: Mutex<LoopState>,
    read_only: AtomicBool,
    shutdown: AtomicBool,
    /// Single-slot wait-gate serializing timer and on-demand update paths
    update_gate: Mutex<()>,
    wake: Mutex<bool>,
    wake_cv: Condvar,
    snapshot: RwLock<Arc<FanControlSnapshot>>,
    listeners: Mutex<Vec<UpdateListener>>,
}

impl FanControl {
    /// Build a control loop from an already validated configuration.
    ///
    /// The configuration is taken by value: the loop owns its copy and is
    /// immune to later mutation of the caller's object.
    pub fn new(
        config: FanControlConfig,
        ec: Arc<dyn EmbeddedController>,
        sensor: Arc<dyn TemperatureSource>,
    ) -> Result<Self> {
        let poll_ms = config.poll_interval_ms.max(timing::MIN_POLL_INTERVAL_MS);
        let filter = TemperatureFilter::new(config.temperature_averaging_ms, poll_ms)?;
        let fans: Vec<Fan> = config
            .fans
            .iter()
            .cloned()
            .map(|fan_config| Fan::new(fan_config, config.critical_temperature))
            .collect();
        let registers = RegisterWriteEngine::new(config.register_writes.clone());

        Ok(Self {
            shared: Arc::new(ControlShared {
                config,
                poll_interval: Duration::from_millis(poll_ms),
                ec,
                sensor,
                fans: Mutex::new(fans),
                filter: Mutex::new(filter),
                registers,
                state: Mutex::new(LoopState::Stopped),
                read_only: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                update_gate: Mutex::new(()),
                wake: Mutex::new(false),
                wake_cv: Condvar::new(),
                snapshot: RwLock::new(Arc::new(FanControlSnapshot::default())),
                listeners: Mutex::new(Vec::new()),
            }),
            worker: None,
        })
    }

    /// Start controlling. In read-only mode the loop observes and publishes
    /// snapshots but never writes a register.
    ///
    /// Initialization failure (collaborator unavailable, EC lock not
    /// acquired within the timeout) is fatal: the loop stays `Stopped` and
    /// the error is returned, not retried. Starting a running loop is a
    /// no-op.
    pub fn start(&mut self, read_only: bool) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            match *state {
                LoopState::Running | LoopState::Starting => return Ok(()),
                LoopState::Stopping => {
                    return Err(NotefanError::InvalidState {
                        operation: "start".to_string(),
                        state: state.as_str().to_string(),
                    })
                }
                LoopState::Stopped => *state = LoopState::Starting,
            }
        }

        self.shared.read_only.store(read_only, Ordering::SeqCst);
        if let Err(e) = self.shared.initialize_hardware(read_only) {
            *self.shared.state.lock() = LoopState::Stopped;
            return Err(e);
        }

        // Clear runtime state left over from a previous run.
        self.shared.filter.lock().reset();
        for fan in self.shared.fans.lock().iter_mut() {
            fan.reset();
        }
        self.shared.shutdown.store(false, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let worker = thread::Builder::new()
            .name("nf-control".to_string())
            .spawn(move || worker_loop(shared));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                *self.shared.state.lock() = LoopState::Stopped;
                return Err(e.into());
            }
        };
        self.worker = Some(worker);
        *self.shared.state.lock() = LoopState::Running;

        info!(
            read_only,
            fans = self.shared.config.fans.len(),
            poll_ms = self.shared.poll_interval.as_millis() as u64,
            "fan control started"
        );
        Ok(())
    }

    /// Request a manual fan speed. Values outside 0-100 (conventionally
    /// [`crate::constants::control::AUTO_FAN_SPEED`]) hand selection back
    /// to the threshold table.
    ///
    /// Triggers an immediate out-of-band update cycle; the caller is never
    /// blocked on EC access.
    pub fn set_target_fan_speed(&self, percent: f32, fan_index: usize) -> Result<()> {
        {
            let mut fans = self.shared.fans.lock();
            let count = fans.len();
            let fan = fans
                .get_mut(fan_index)
                .ok_or(NotefanError::FanIndexOutOfRange {
                    index: fan_index,
                    count,
                })?;
            fan.set_requested_percent(percent);
            debug!(fan = fan.name(), percent, "fan speed requested");
        }
        self.shared.request_update();
        Ok(())
    }

    /// Current published snapshot. Never blocks on an in-progress cycle;
    /// the returned snapshot is immutable and shared with other readers.
    pub fn snapshot(&self) -> Arc<FanControlSnapshot> {
        Arc::clone(&self.shared.snapshot.read())
    }

    /// Register a listener fired once per completed poll cycle, after the
    /// new snapshot has been published.
    pub fn on_ec_updated(&self, listener: impl Fn(&FanControlSnapshot) + Send + Sync + 'static) {
        self.shared.listeners.lock().push(Box::new(listener));
    }

    pub fn state(&self) -> LoopState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn read_only(&self) -> bool {
        self.shared.read_only.load(Ordering::SeqCst)
    }

    pub fn fan_count(&self) -> usize {
        self.shared.fans.lock().len()
    }

    /// Stop the loop: halt the timer, wait for any in-flight cycle, then
    /// run the best-effort hardware reset pass. Never fails; reset errors
    /// are logged, not propagated. Stopping a stopped loop is a no-op.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if *state != LoopState::Running {
                return;
            }
            *state = LoopState::Stopping;
        }

        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.request_update();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("control worker panicked");
            }
        }

        // The worker is gone; taking the gate fences any straggling update
        // path before reset writes touch the hardware.
        let _gate = self.shared.update_gate.lock();
        self.shared.reset_hardware();

        *self.shared.state.lock() = LoopState::Stopped;
        info!("fan control stopped");
    }
}

impl Drop for FanControl {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ControlShared {
    /// Wake the worker for an immediate cycle.
    fn request_update(&self) {
        let mut wake = self.wake.lock();
        *wake = true;
        self.wake_cv.notify_all();
    }

    fn ec_lock_timeout(&self) -> Duration {
        Duration::from_millis(timing::EC_LOCK_TIMEOUT_MS)
    }

    /// Half the poll interval, capped by the EC lock timeout: a path that
    /// waits longer would collide with the next scheduled tick anyway.
    fn gate_timeout(&self) -> Duration {
        (self.poll_interval / 2).min(self.ec_lock_timeout())
    }

    fn initialize_hardware(&self, read_only: bool) -> Result<()> {
        if !self.sensor.is_initialized() {
            self.sensor.initialize()?;
        }
        if !self.ec.is_initialized() {
            self.ec.initialize()?;
        }
        debug!(sensor = %self.sensor.display_name(), "hardware collaborators initialized");

        // A read-only session performs no register writes at all, so there
        // is nothing to initialize on the EC side.
        if read_only {
            return Ok(());
        }

        let _lock = EcLockGuard::acquire(&*self.ec, self.ec_lock_timeout()).ok_or(
            NotefanError::EcLockTimeout {
                timeout_ms: timing::EC_LOCK_TIMEOUT_MS,
            },
        )?;
        self.registers.apply(&*self.ec, true)?;
        Ok(())
    }

    /// One full update cycle. Returns an error when the cycle was skipped;
    /// partial per-fan failures degrade gracefully and still complete the
    /// cycle.
    fn run_cycle(&self) -> Result<()> {
        let _cycle = self
            .update_gate
            .try_lock_for(self.gate_timeout())
            .ok_or_else(|| NotefanError::Timeout("update already in progress".to_string()))?;

        // Temperature access competes for the platform bus mutex inside the
        // source; the EC lock is not held here.
        let sample = self.sensor.temperature()?;
        if !sample.is_finite() {
            return Err(NotefanError::TemperatureRead(format!(
                "non-finite sample {sample}"
            )));
        }
        let temperature = self.filter.lock().filter(sample);

        let read_only = self.read_only.load(Ordering::SeqCst);
        let snapshot = {
            let ec_lock = EcLockGuard::acquire(&*self.ec, self.ec_lock_timeout()).ok_or(
                NotefanError::EcLockTimeout {
                    timeout_ms: timing::EC_LOCK_TIMEOUT_MS,
                },
            )?;

            if !read_only {
                if let Err(e) = self.registers.apply(&*self.ec, false) {
                    warn!(error = %e, "register write pass failed");
                }
            }

            let mut fans = self.fans.lock();
            for fan in fans.iter_mut() {
                if let Err(e) = fan.update(temperature) {
                    error!(fan = fan.name(), error = %e, "fan update failed");
                    continue;
                }
                if !read_only {
                    if let Err(e) =
                        self.write_register_value(fan.config().write_register, fan.target_raw_value())
                    {
                        warn!(fan = fan.name(), error = %e, "fan speed write failed");
                    }
                }
                match self.read_back(fan) {
                    Ok(raw) => fan.note_readback(raw),
                    Err(e) => warn!(fan = fan.name(), error = %e, "fan speed readback failed"),
                }
            }

            let snapshot = Arc::new(FanControlSnapshot {
                temperature,
                fans: fans.iter().map(Fan::status).collect(),
            });
            drop(fans);
            drop(ec_lock);
            snapshot
        };

        *self.snapshot.write() = Arc::clone(&snapshot);
        for listener in self.listeners.lock().iter() {
            listener(&snapshot);
        }
        Ok(())
    }

    /// Read a fan's speed register, retrying while the value falls outside
    /// the declared read range. After the last attempt the value is used as
    /// is: display accuracy is best-effort, control is unaffected.
    fn read_back(&self, fan: &Fan) -> Result<u16> {
        let register = fan.config().read_register;
        let mut raw = self.read_register_value(register)?;
        for attempt in 1..control_const::READBACK_ATTEMPTS {
            if fan.is_raw_in_read_range(raw) {
                break;
            }
            debug!(
                fan = fan.name(),
                raw, attempt, "readback outside declared range; retrying"
            );
            raw = self.read_register_value(register)?;
        }
        Ok(raw)
    }

    fn read_register_value(&self, register: u8) -> Result<u16> {
        if self.config.read_write_words {
            self.ec.read_word(register)
        } else {
            self.ec.read_byte(register).map(u16::from)
        }
    }

    fn write_register_value(&self, register: u8, value: u16) -> Result<()> {
        if self.config.read_write_words {
            self.ec.write_word(register, value)
        } else {
            self.ec.write_byte(register, value as u8)
        }
    }

    /// Best-effort hardware reset. The EC lock is attempted, but reset
    /// writes proceed without it to maximize the chance fans return to a
    /// safe state. Individual writes may silently fail, hence the repeated
    /// passes.
    fn reset_hardware(&self) {
        if self.read_only.load(Ordering::SeqCst) {
            debug!("read-only session; no hardware reset needed");
            return;
        }

        let ec_lock = EcLockGuard::acquire(&*self.ec, self.ec_lock_timeout());
        if ec_lock.is_none() {
            warn!("EC lock unavailable during shutdown; attempting reset writes anyway");
        }

        let fans = self.fans.lock();
        for pass in 0..control_const::RESET_PASSES {
            self.registers.reset(&*self.ec);
            for fan in fans.iter() {
                let config = fan.config();
                if !config.reset_required {
                    continue;
                }
                if let Err(e) = self.write_register_value(config.write_register, config.reset_value)
                {
                    warn!(
                        pass,
                        fan = fan.name(),
                        register = config.write_register,
                        error = %e,
                        "fan reset write failed"
                    );
                }
            }
        }
    }
}

fn worker_loop(shared: Arc<ControlShared>) {
    debug!("control worker running");
    let mut consecutive_errors: u32 = 0;

    while !shared.shutdown.load(Ordering::SeqCst) {
        match shared.run_cycle() {
            Ok(()) => {
                if consecutive_errors > 0 {
                    debug!(
                        skipped = consecutive_errors,
                        "control loop recovered after skipped cycles"
                    );
                    consecutive_errors = 0;
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors == 1
                    || consecutive_errors % control_const::MAX_CONSECUTIVE_ERRORS == 0
                {
                    warn!(error = %e, count = consecutive_errors, "poll cycle skipped");
                }
            }
        }

        let mut wake = shared.wake.lock();
        if !*wake && !shared.shutdown.load(Ordering::SeqCst) {
            let _ = shared.wake_cv.wait_for(&mut wake, shared.poll_interval);
        }
        *wake = false;
    }
    debug!("control worker exiting");
}

/// Serialize a snapshot for service front ends.
pub fn snapshot_to_json(snapshot: &FanControlSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).map_err(Into::into)
}

/// Compact single-line variant of [`snapshot_to_json`].
pub fn snapshot_to_json_compact(snapshot: &FanControlSnapshot) -> Result<String> {
    serde_json::to_string(snapshot).map_err(Into::into)
}
