//! Software stand-ins for the module and the host capabilities.
//!
//! Used by the tests and demos to drive the driver core without hardware.
//! Every double is a cheap clone over shared state, so a test can hand one
//! copy to [`crate::M58::init`] and keep another to inspect.

use crate::channel::PortMap;
use crate::config::{BufferMode, InputBufferConfig};
use crate::consts::{self, reg};
use crate::error::{Error, Result};
use crate::hal::{
    BufferProvider, BufferStat, InputBuffer, RegisterAccess, Resources, SignalDelivery,
};
use log::trace;
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// One register access seen by [`SimModule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimAccess {
    Read8(u8),
    Write8(u8, u8),
    Read16(u8),
    Write16(u8, u16),
}

#[derive(Debug)]
struct ModuleState {
    ports: [u8; consts::CH_NUMBER],
    /// External pin levels driven onto input ports.
    pins: [u8; consts::CH_NUMBER],
    /// Output latches written by the driver.
    latches: [u8; consts::CH_NUMBER],
    ctrl: [u16; 4],
    prom: [u16; consts::id::SIZE / 2],
    log: Vec<SimAccess>,
}

/// Simulated M58 register file.
///
/// Input ports return the pin levels set with [`SimModule::set_pins`]; ports
/// whose direction bit is clear return their output latch.
#[derive(Debug, Clone)]
pub struct SimModule {
    state: Arc<spin::Mutex<ModuleState>>,
}

impl SimModule {
    pub fn new(port_map: PortMap) -> Self {
        let mut prom = [0u16; consts::id::SIZE / 2];
        prom[0] = consts::id::MAGIC;
        prom[1] = consts::id::MODULE_ID;
        Self {
            state: Arc::new(spin::Mutex::new(ModuleState {
                ports: port_map.offsets(),
                pins: [0; consts::CH_NUMBER],
                latches: [0; consts::CH_NUMBER],
                ctrl: [0; 4],
                prom,
                log: Vec::new(),
            })),
        }
    }

    /// Drives the pins of channel `ch` (0..3).
    pub fn set_pins(&self, ch: u8, value: u8) {
        self.state.lock().pins[ch as usize] = value;
    }

    /// Last value written to the output latch of channel `ch`.
    pub fn latch(&self, ch: u8) -> u8 {
        self.state.lock().latches[ch as usize]
    }

    /// Current value of a control register (0x80..0x86), without the
    /// acknowledge side effect of a real read.
    pub fn ctrl(&self, offset: u8) -> u16 {
        self.state.lock().ctrl[ctrl_index(offset).unwrap_or(0)]
    }

    /// Overwrites the first two PROM words.
    pub fn set_id(&self, magic: u16, id: u16) {
        let mut state = self.state.lock();
        state.prom[0] = magic;
        state.prom[1] = id;
    }

    pub fn set_prom_word(&self, index: usize, word: u16) {
        self.state.lock().prom[index] = word;
    }

    /// All accesses since creation or the last [`SimModule::clear_log`].
    pub fn log(&self) -> Vec<SimAccess> {
        self.state.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Port writes as `(channel, value)`, in order.
    pub fn port_writes(&self) -> Vec<(u8, u8)> {
        let state = self.state.lock();
        state
            .log
            .iter()
            .filter_map(|access| match *access {
                SimAccess::Write8(offset, value) => {
                    channel_of(&state.ports, offset).map(|ch| (ch as u8, value))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of interrupt acknowledges (control 3 reads).
    pub fn acks(&self) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|a| **a == SimAccess::Read16(reg::CTRL3))
            .count()
    }
}

fn ctrl_index(offset: u8) -> Option<usize> {
    match offset {
        reg::CTRL0 | reg::CTRL1 | reg::CTRL2 | reg::CTRL3 => {
            Some(((offset - reg::CTRL0) / 2) as usize)
        }
        _ => None,
    }
}

fn channel_of(ports: &[u8; consts::CH_NUMBER], offset: u8) -> Option<usize> {
    ports.iter().position(|&p| p == offset)
}

impl RegisterAccess for SimModule {
    fn read_u8(&self, offset: u8) -> u8 {
        let mut state = self.state.lock();
        state.log.push(SimAccess::Read8(offset));
        match channel_of(&state.ports, offset) {
            Some(ch) if state.ctrl[0] & (1 << ch) != 0 => state.pins[ch],
            Some(ch) => state.latches[ch],
            None => 0,
        }
    }

    fn write_u8(&self, offset: u8, value: u8) {
        let mut state = self.state.lock();
        state.log.push(SimAccess::Write8(offset, value));
        if let Some(ch) = channel_of(&state.ports, offset) {
            state.latches[ch] = value;
        }
    }

    fn read_u16(&self, offset: u8) -> u16 {
        let mut state = self.state.lock();
        state.log.push(SimAccess::Read16(offset));
        ctrl_index(offset).map(|i| state.ctrl[i]).unwrap_or(0)
    }

    fn write_u16(&self, offset: u8, value: u16) {
        let mut state = self.state.lock();
        state.log.push(SimAccess::Write16(offset, value));
        if let Some(i) = ctrl_index(offset) {
            state.ctrl[i] = value;
        }
    }

    fn read_id_word(&self, index: u8) -> u16 {
        self.state.lock().prom.get(index as usize).copied().unwrap_or(0xFFFF)
    }
}

#[derive(Debug)]
struct BufferState {
    mode: BufferMode,
    capacity: usize,
    timeout: Duration,
    high_water: usize,
    data: VecDeque<u8>,
    overruns: u32,
    removed: bool,
}

/// Bounded byte FIFO standing in for the host's input buffer.
///
/// `UserControlled` and `RingBuffer` refuse new bytes when full;
/// `RingBufferOverwrite` and `CurrentValueOnly` drop the oldest byte.
/// Reads never block, unlike a host buffer. An empty buffer yields
/// `Error::Timeout` when a timeout is configured. With a zero timeout,
/// where a host buffer would wait forever, it returns 0 bytes at once.
#[derive(Debug, Clone)]
pub struct SimBuffer {
    state: Arc<spin::Mutex<BufferState>>,
}

impl SimBuffer {
    fn new(cfg: &InputBufferConfig) -> Self {
        Self {
            state: Arc::new(spin::Mutex::new(BufferState {
                mode: cfg.mode,
                capacity: cfg.size,
                timeout: cfg.timeout,
                high_water: cfg.high_water,
                data: VecDeque::with_capacity(cfg.size),
                overruns: 0,
                removed: false,
            })),
        }
    }

    /// Bytes currently buffered, oldest first.
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().data.iter().copied().collect()
    }

    pub fn overruns(&self) -> u32 {
        self.state.lock().overruns
    }

    /// Whether the driver has released the buffer.
    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    pub fn set_mode(&self, mode: BufferMode) {
        self.state.lock().mode = mode;
    }
}

// The copy owned by the driver; dropping it removes the buffer
struct OwnedSimBuffer(SimBuffer);

impl Drop for OwnedSimBuffer {
    fn drop(&mut self) {
        self.0.state.lock().removed = true;
    }
}

impl InputBuffer for OwnedSimBuffer {
    fn mode(&self) -> BufferMode {
        self.0.state.lock().mode
    }

    fn fill_next(&self, fill: &mut dyn FnMut() -> u8) -> bool {
        let mut state = self.0.state.lock();
        if state.data.len() >= state.capacity {
            match state.mode {
                BufferMode::UserControlled | BufferMode::RingBuffer => {
                    state.overruns += 1;
                    return false;
                }
                BufferMode::RingBufferOverwrite | BufferMode::CurrentValueOnly => {
                    state.data.pop_front();
                }
            }
        }
        let value = fill();
        state.data.push_back(value);
        if state.high_water != 0 && state.data.len() == state.high_water {
            trace!("Sim buffer reached high water ({} bytes)", state.high_water);
        }
        true
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.0.state.lock();
        if state.data.is_empty() && !state.timeout.is_zero() {
            return Err(Error::Timeout);
        }
        let n = buf.len().min(state.data.len());
        for (slot, value) in buf.iter_mut().zip(state.data.drain(..n)) {
            *slot = value;
        }
        Ok(n)
    }

    fn get_stat(&self, code: BufferStat) -> Result<u32> {
        let state = self.0.state.lock();
        match code {
            BufferStat::Mode => Ok(state.mode.into()),
            BufferStat::Timeout => Ok(state.timeout.as_millis() as u32),
            BufferStat::HighWater => Ok(state.high_water as u32),
            BufferStat::Level => Ok(state.data.len() as u32),
            BufferStat::Overruns => Ok(state.overruns),
            BufferStat::Other(_) => Err(Error::UnknownStatusCode(format!("{:?} (get)", code))),
        }
    }

    fn set_stat(&self, code: BufferStat, value: u32) -> Result<()> {
        let mut state = self.0.state.lock();
        match code {
            BufferStat::Mode => state.mode = BufferMode::try_from(value)?,
            BufferStat::Timeout => state.timeout = Duration::from_millis(value as u64),
            BufferStat::HighWater => state.high_water = value as usize,
            _ => return Err(Error::UnknownStatusCode(format!("{:?} (set)", code))),
        }
        Ok(())
    }
}

/// Creates [`SimBuffer`]s and remembers the last one for inspection.
#[derive(Debug, Clone, Default)]
pub struct SimBufferProvider {
    created: Arc<spin::Mutex<Option<SimBuffer>>>,
    fail: bool,
}

impl SimBufferProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose `create` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The most recently created buffer.
    pub fn buffer(&self) -> Option<SimBuffer> {
        self.created.lock().clone()
    }
}

impl BufferProvider for SimBufferProvider {
    fn create(&self, cfg: &InputBufferConfig) -> Result<Box<dyn InputBuffer>> {
        if self.fail {
            return Err(Error::AllocationFailure("sim buffer refused".to_string()));
        }
        let buffer = SimBuffer::new(cfg);
        *self.created.lock() = Some(buffer.clone());
        Ok(Box::new(OwnedSimBuffer(buffer)))
    }
}

#[derive(Debug, Default)]
struct SignalState {
    live: Vec<u32>,
    sent: Vec<u32>,
    busy: bool,
}

/// Records created targets and every signal sent.
#[derive(Debug, Clone, Default)]
pub struct SimSignals {
    state: Arc<spin::Mutex<SignalState>>,
}

impl SimSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets signalled so far, in order.
    pub fn sent(&self) -> Vec<u32> {
        self.state.lock().sent.clone()
    }

    /// Targets currently created.
    pub fn live(&self) -> Vec<u32> {
        self.state.lock().live.clone()
    }

    /// While set, `remove` fails and the target stays created.
    pub fn set_busy(&self, busy: bool) {
        self.state.lock().busy = busy;
    }
}

impl SignalDelivery for SimSignals {
    fn create(&self, target: NonZeroU32) -> Result<()> {
        self.state.lock().live.push(target.get());
        Ok(())
    }

    fn remove(&self, target: NonZeroU32) -> Result<()> {
        let mut state = self.state.lock();
        if state.busy {
            return Err(Error::Signal(format!("target {} busy", target)));
        }
        match state.live.iter().position(|&t| t == target.get()) {
            Some(i) => {
                state.live.remove(i);
                Ok(())
            }
            None => Err(Error::Signal(format!("target {} not created", target))),
        }
    }

    fn send(&self, target: NonZeroU32) {
        let mut state = self.state.lock();
        if state.live.contains(&target.get()) {
            state.sent.push(target.get());
        }
    }
}

/// Bundles clones of the doubles into driver [`Resources`].
pub fn resources(
    module: &SimModule,
    buffers: &SimBufferProvider,
    signals: &SimSignals,
) -> Resources {
    Resources {
        registers: Box::new(module.clone()),
        buffers: Box::new(buffers.clone()),
        signals: Box::new(signals.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_buffer(timeout: Duration) -> (SimBuffer, Box<dyn InputBuffer>) {
        let provider = SimBufferProvider::new();
        let cfg = InputBufferConfig {
            mode: BufferMode::RingBuffer,
            timeout,
            ..InputBufferConfig::default()
        };
        let owned = provider.create(&cfg).unwrap();
        (provider.buffer().unwrap(), owned)
    }

    #[test]
    fn test_empty_read_zero_timeout_returns_nothing() {
        let (_, buffer) = open_buffer(Duration::ZERO);
        let mut buf = [0u8; 4];
        assert_eq!(buffer.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_empty_read_with_timeout_fails() {
        let (_, buffer) = open_buffer(Duration::from_millis(20));
        let mut buf = [0u8; 4];
        assert!(matches!(buffer.read(&mut buf), Err(Error::Timeout)));

        assert!(buffer.fill_next(&mut || 0x42));
        assert_eq!(buffer.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x42);
    }

    #[test]
    fn test_drop_marks_removed() {
        let (shared, buffer) = open_buffer(Duration::ZERO);
        assert!(!shared.is_removed());
        drop(buffer);
        assert!(shared.is_removed());
    }
}
