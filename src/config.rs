//! Driver configuration supplied at init time.

use crate::channel::{Channel, DataMode, Direction, PortMap, Termination, TriggerEdge};
use crate::consts;
use crate::error::{Error, Result};
use std::time::Duration;

/// Block I/O transport mode of the input buffer.
///
/// Raw status values: 0 user controlled, 1 current value, 2 ring buffer,
/// 3 ring buffer with overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// Block reads go straight to the hardware ports.
    #[default]
    UserControlled,
    /// Interrupt-filled ring buffer; harvesting stops when full.
    RingBuffer,
    /// Interrupt-filled ring buffer; oldest data is overwritten when full.
    RingBufferOverwrite,
    /// Only the most recent data is kept.
    CurrentValueOnly,
}

impl BufferMode {
    /// Whether block reads are served from the buffer instead of the ports.
    #[inline]
    pub fn is_buffered(&self) -> bool {
        !matches!(self, BufferMode::UserControlled)
    }
}

impl TryFrom<u32> for BufferMode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(BufferMode::UserControlled),
            1 => Ok(BufferMode::CurrentValueOnly),
            2 => Ok(BufferMode::RingBuffer),
            3 => Ok(BufferMode::RingBufferOverwrite),
            _ => Err(crate::error::illegal_value("buffer mode", value)),
        }
    }
}

impl From<BufferMode> for u32 {
    fn from(mode: BufferMode) -> u32 {
        match mode {
            BufferMode::UserControlled => 0,
            BufferMode::CurrentValueOnly => 1,
            BufferMode::RingBuffer => 2,
            BufferMode::RingBufferOverwrite => 3,
        }
    }
}

/// Parameters handed to the buffer provider when the input buffer is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBufferConfig {
    /// Capacity in bytes (minimum 8).
    pub size: usize,
    pub mode: BufferMode,
    /// Read timeout; zero waits forever. Host buffers implement the wait,
    /// see [`crate::sim::SimBuffer`] for the non-blocking double.
    pub timeout: Duration,
    /// Fill level in bytes that raises the high-water event; zero disables it.
    pub high_water: usize,
}

impl Default for InputBufferConfig {
    fn default() -> Self {
        Self {
            size: consts::buf::MIN_SIZE,
            mode: BufferMode::UserControlled,
            timeout: Duration::ZERO,
            high_water: 0,
        }
    }
}

/// Initial settings of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub direction: Direction,
    pub termination: Termination,
    pub buffering: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Input,
            termination: Termination::Passive,
            buffering: true,
        }
    }
}

/// Complete driver configuration.
///
/// `Default` mirrors the module defaults: id check on, falling edge, mode 0,
/// all channels input/passive/buffered, an 8-byte user-controlled buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub id_check: bool,
    pub trigger_edge: TriggerEdge,
    pub data_mode: DataMode,
    pub channels: [ChannelConfig; consts::CH_NUMBER],
    pub in_buf: InputBufferConfig,
    /// Initial driver debug level, reported through the status interface.
    pub debug_level: u32,
    pub port_map: PortMap,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            id_check: true,
            trigger_edge: TriggerEdge::Falling,
            data_mode: DataMode::default(),
            channels: [ChannelConfig::default(); consts::CH_NUMBER],
            in_buf: InputBufferConfig::default(),
            debug_level: 0,
            port_map: PortMap::native(),
        }
    }
}

impl DriverConfig {
    /// All four channels latched on the trigger edge (mode 5) and harvested
    /// into a ring buffer by the interrupt handler.
    pub fn buffered_input() -> Self {
        Self {
            data_mode: DataMode::new(5).unwrap_or_default(),
            in_buf: InputBufferConfig {
                size: 256,
                mode: BufferMode::RingBuffer,
                ..InputBufferConfig::default()
            },
            ..Self::default()
        }
    }

    /// Replaces the settings of one channel.
    pub fn with_channel(mut self, ch: Channel, cfg: ChannelConfig) -> Self {
        self.channels[ch.index()] = cfg;
        self
    }

    /// Checks the values that cannot be ruled out by construction.
    pub fn validate(&self) -> Result<()> {
        if self.in_buf.size < consts::buf::MIN_SIZE {
            return Err(Error::IllegalParameter(format!(
                "input buffer size {} below minimum {}",
                self.in_buf.size,
                consts::buf::MIN_SIZE
            )));
        }
        Ok(())
    }
}
