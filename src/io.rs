//! Direct (single channel) and block (all buffered channels) I/O.

use crate::channel::{Channel, Direction};
use crate::config::BufferMode;
use crate::device::M58;
use crate::error::{Error, Result};
use log::{debug, trace};

impl M58 {
    // --- Direct I/O ---

    /// Reads the port of an input channel. Bits D7..D0 map to the port pins.
    ///
    /// Depending on the data storage mode the read may also latch other
    /// channels for their next read, or return a value latched at the last
    /// trigger edge.
    pub fn read_channel(&self, ch: Channel) -> Result<u8> {
        let store = self.store.lock();
        self.check_direction(&store, ch, Direction::Input)?;
        let value = self.port_read(ch);
        debug!("Read channel {}: 0x{:02X}", ch, value);
        Ok(value)
    }

    /// Writes `value` to the port of an output channel.
    pub fn write_channel(&self, ch: Channel, value: u8) -> Result<()> {
        let store = self.store.lock();
        self.check_direction(&store, ch, Direction::Output)?;
        debug!("Write channel {}: 0x{:02X}", ch, value);
        self.port_write(ch, value);
        Ok(())
    }

    // --- Block I/O ---

    /// Reads a block of input data.
    ///
    /// With a user-controlled buffer, every buffered input channel is read
    /// in ascending order, one byte each, and exactly [`M58::read_size`]
    /// bytes are returned. Otherwise the bytes harvested by the interrupt
    /// handler are copied out of the input buffer (up to `buf.len()`),
    /// waiting up to the buffer's timeout.
    ///
    /// Returns the byte count and the buffer mode that served the read.
    pub fn block_read(&self, buf: &mut [u8]) -> Result<(usize, BufferMode)> {
        let mode = self.buffer.mode();
        trace!("Block read: size={}, mode={:?}", buf.len(), mode);

        if mode.is_buffered() {
            let n = self.buffer.read(buf)?;
            debug!("Block read {} bytes from input buffer", n);
            return Ok((n, mode));
        }

        let store = self.store.lock();
        let size = store.read_size();
        if size == 0 {
            return Err(Error::NoChannelsEnabled(Direction::Input));
        }
        if buf.len() < size {
            return Err(Error::BufferTooSmall {
                expected: size,
                actual: buf.len(),
            });
        }
        for (slot, ch) in buf.iter_mut().zip(store.enabled(Direction::Input).channels()) {
            *slot = self.port_read(ch);
        }
        debug!("Block read {} bytes from ports: {:02X?}", size, &buf[..size]);
        Ok((size, mode))
    }

    /// Writes one byte of `buf` to every buffered output channel in
    /// ascending order. Returns [`M58::write_size`].
    pub fn block_write(&self, buf: &[u8]) -> Result<usize> {
        let store = self.store.lock();
        let size = store.write_size();
        if size == 0 {
            return Err(Error::NoChannelsEnabled(Direction::Output));
        }
        if buf.len() < size {
            return Err(Error::BufferTooSmall {
                expected: size,
                actual: buf.len(),
            });
        }
        for (&value, ch) in buf.iter().zip(store.enabled(Direction::Output).channels()) {
            self.port_write(ch, value);
        }
        debug!("Block wrote {} bytes: {:02X?}", size, &buf[..size]);
        Ok(size)
    }
}
