//! Test doubles shared across unit tests
//!
//! A scriptable in-memory EC and temperature source. These deliberately
//! implement the hardware traits with interior mutability so tests can
//! inspect and steer them through the same shared handles the control loop
//! holds.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{NotefanError, Result};
use crate::hw::{EmbeddedController, TemperatureSource};

#[derive(Default)]
struct FakeEcMem {
    bytes: HashMap<u8, u8>,
    words: HashMap<u8, u16>,
    /// Per-register queues of values returned by reads before falling back
    /// to the stored register content
    scripted_reads: HashMap<u8, VecDeque<u16>>,
    /// Every write in order, as (register, value)
    writes: Vec<(u8, u16)>,
}

/// In-memory embedded controller with a write log, scriptable reads and
/// injectable failures.
#[derive(Default)]
pub struct FakeEc {
    mem: Mutex<FakeEcMem>,
    initialized: AtomicBool,
    lock_held: AtomicBool,
    deny_lock: AtomicBool,
    fail_io: AtomicBool,
}

impl FakeEc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_byte(&self, register: u8, value: u8) {
        self.mem.lock().bytes.insert(register, value);
    }

    pub fn set_word(&self, register: u8, value: u16) {
        self.mem.lock().words.insert(register, value);
    }

    pub fn byte(&self, register: u8) -> u8 {
        *self.mem.lock().bytes.get(&register).unwrap_or(&0)
    }

    pub fn word(&self, register: u8) -> u16 {
        *self.mem.lock().words.get(&register).unwrap_or(&0)
    }

    /// Queue values returned by the next reads of `register`, ahead of the
    /// stored content. Used to simulate transient readback glitches.
    pub fn script_reads(&self, register: u8, values: &[u16]) {
        self.mem
            .lock()
            .scripted_reads
            .entry(register)
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn scripted_reads_remaining(&self, register: u8) -> usize {
        self.mem
            .lock()
            .scripted_reads
            .get(&register)
            .map_or(0, VecDeque::len)
    }

    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.mem.lock().writes.clone()
    }

    pub fn writes_to(&self, register: u8) -> Vec<u16> {
        self.mem
            .lock()
            .writes
            .iter()
            .filter(|(r, _)| *r == register)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.mem.lock().writes.clear();
    }

    pub fn deny_lock(&self, deny: bool) {
        self.deny_lock.store(deny, Ordering::SeqCst);
    }

    pub fn fail_io(&self, fail: bool) {
        self.fail_io.store(fail, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.lock_held.load(Ordering::SeqCst)
    }

    fn next_read(&self, register: u8) -> Option<u16> {
        self.mem
            .lock()
            .scripted_reads
            .get_mut(&register)
            .and_then(VecDeque::pop_front)
    }
}

impl EmbeddedController for FakeEc {
    fn initialize(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn read_byte(&self, register: u8) -> Result<u8> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(NotefanError::ec_read(register, "simulated failure"));
        }
        if let Some(scripted) = self.next_read(register) {
            return Ok(scripted as u8);
        }
        Ok(self.byte(register))
    }

    fn write_byte(&self, register: u8, value: u8) -> Result<()> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(NotefanError::ec_write(register, "simulated failure"));
        }
        let mut mem = self.mem.lock();
        mem.bytes.insert(register, value);
        mem.writes.push((register, u16::from(value)));
        Ok(())
    }

    fn read_word(&self, register: u8) -> Result<u16> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(NotefanError::ec_read(register, "simulated failure"));
        }
        if let Some(scripted) = self.next_read(register) {
            return Ok(scripted);
        }
        Ok(self.word(register))
    }

    fn write_word(&self, register: u8, value: u16) -> Result<()> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(NotefanError::ec_write(register, "simulated failure"));
        }
        let mut mem = self.mem.lock();
        mem.words.insert(register, value);
        mem.writes.push((register, value));
        Ok(())
    }

    fn acquire_lock(&self, _timeout: Duration) -> bool {
        if self.deny_lock.load(Ordering::SeqCst) {
            return false;
        }
        self.lock_held.store(true, Ordering::SeqCst);
        true
    }

    fn release_lock(&self) {
        self.lock_held.store(false, Ordering::SeqCst);
    }
}

/// Temperature source returning a settable constant.
pub struct FakeSensor {
    temperature: Mutex<f32>,
    initialized: AtomicBool,
    fail: AtomicBool,
}

impl FakeSensor {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature: Mutex::new(temperature),
            initialized: AtomicBool::new(false),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_temperature(&self, temperature: f32) {
        *self.temperature.lock() = temperature;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TemperatureSource for FakeSensor {
    fn initialize(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn display_name(&self) -> String {
        "fake sensor".to_string()
    }

    fn temperature(&self) -> Result<f32> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotefanError::TemperatureRead(
                "simulated failure".to_string(),
            ));
        }
        Ok(*self.temperature.lock())
    }
}
