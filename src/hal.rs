//! Capabilities the driver core consumes but does not implement.
//!
//! The host supplies three things: access to the module's register space,
//! a factory for the input buffer that interrupt harvesting fills, and the
//! notification layer that delivers the trigger signal to user space. All
//! of them are used from both the call context and the interrupt context,
//! hence `Send + Sync` and `&self` receivers throughout.

use crate::config::{BufferMode, InputBufferConfig};
use crate::error::Result;
use std::num::NonZeroU32;

/// Raw access to the module's 256-byte register space.
///
/// Accesses are infallible. Width and byte order are fixed by the hardware.
pub trait RegisterAccess: Send + Sync {
    fn read_u8(&self, offset: u8) -> u8;
    fn write_u8(&self, offset: u8, value: u8);
    fn read_u16(&self, offset: u8) -> u16;
    fn write_u16(&self, offset: u8, value: u16);

    /// Sets `mask` bits of a 16-bit register.
    fn set_mask_u16(&self, offset: u8, mask: u16) {
        let value = self.read_u16(offset);
        self.write_u16(offset, value | mask);
    }

    /// Clears `mask` bits of a 16-bit register.
    fn clear_mask_u16(&self, offset: u8, mask: u16) {
        let value = self.read_u16(offset);
        self.write_u16(offset, value & !mask);
    }

    /// Reads one 16-bit word of the identification PROM.
    fn read_id_word(&self, index: u8) -> u16;
}

/// Status codes understood by the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStat {
    /// Active transport mode: 0 user controlled, 1 current value, 2 ring
    /// buffer, 3 ring buffer with overwrite.
    Mode,
    /// Read timeout in milliseconds.
    Timeout,
    /// High-water level in bytes.
    HighWater,
    /// Bytes currently buffered (get only).
    Level,
    /// Harvest attempts rejected for lack of space (get only).
    Overruns,
    /// Any other buffer-specific code.
    Other(u16),
}

/// Input buffer filled by the interrupt handler and drained by block reads.
pub trait InputBuffer: Send + Sync {
    /// Currently active transport mode.
    fn mode(&self) -> BufferMode;

    /// Acquires the next slot, fills it with the value returned by `fill`
    /// and marks it ready for readers.
    ///
    /// Returns `false` without calling `fill` when no slot is available.
    /// Must not block: this runs in interrupt context.
    fn fill_next(&self, fill: &mut dyn FnMut() -> u8) -> bool;

    /// Copies up to `buf.len()` buffered bytes into `buf`, waiting up to the
    /// configured timeout for data.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    fn get_stat(&self, code: BufferStat) -> Result<u32>;
    fn set_stat(&self, code: BufferStat, value: u32) -> Result<()>;
}

/// Creates the input buffer at init. Dropping the buffer removes it.
pub trait BufferProvider {
    fn create(&self, cfg: &InputBufferConfig) -> Result<Box<dyn InputBuffer>>;
}

/// Delivers the trigger notification to a user-space target.
pub trait SignalDelivery: Send + Sync {
    /// Reserves delivery to `target`.
    fn create(&self, target: NonZeroU32) -> Result<()>;
    /// Releases a target created earlier.
    fn remove(&self, target: NonZeroU32) -> Result<()>;
    /// Fires the notification. Called from interrupt context; must not block
    /// and must ignore targets that were removed concurrently.
    fn send(&self, target: NonZeroU32);
}

/// Host resources handed to [`crate::M58::init`].
pub struct Resources {
    pub registers: Box<dyn RegisterAccess>,
    pub buffers: Box<dyn BufferProvider>,
    pub signals: Box<dyn SignalDelivery>,
}
