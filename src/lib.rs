//! # m58-dio
//!
//! Control core for the M58 binary I/O module: four 8-bit ports (channels
//! 0-3, ports A-D) with per-channel direction, input termination and block
//! I/O participation, a trigger line that latches data and raises an
//! interrupt, and a configurable data storage mode.
//!
//! The crate owns the configuration state and the I/O semantics. Register
//! access, the input ring buffer and signal delivery are supplied by the
//! host through the traits in [`hal`]; [`sim`] provides software doubles
//! for all three.
//!
//! ## Features
//!
//! *   Driver lifecycle (`M58::init`, `M58::exit`), module id PROM check.
//! *   Channel configuration store:
//!     *   Direction, termination and buffering per channel.
//!     *   Trigger edge and data storage mode (`DataMode`, with the latch table).
//!     *   Derived block sizes (`read_size`, `write_size`).
//! *   Direct I/O (`read_channel`, `write_channel`).
//! *   Block I/O (`block_read`, `block_write`) over all buffered channels,
//!     or from the interrupt-filled input buffer.
//! *   Interrupt service routine (`service_interrupt`) harvesting input
//!     channels and sending the trigger signal.
//! *   Trigger signal control (`enable_trigger_signal`, `disable_trigger_signal`).
//! *   Status get/set dispatch by `StatusCode` and a static capability
//!     query (`M58::info`).
//!
//! ## Register Layout
//!
//! The port registers sit at byte offsets that depend on how the carrier
//! wires the bus byte lanes. `PortMap::native()` picks the map for the
//! build target; enable the `byteswap` feature on carriers that swap lanes.
//!
//! ## Concurrency
//!
//! The host serializes calls per handle; the interrupt handler may run at
//! any time. Configuration changes take a short spin lock and publish the
//! set of channels to harvest atomically when done. The interrupt handler
//! only reads that published set, so it never waits and never sees a
//! half-applied change.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use m58_dio::{
//!     sim::{self, SimBufferProvider, SimModule, SimSignals},
//!     Channel, Direction, DriverConfig, PortMap, Result, M58,
//! };
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let module = SimModule::new(PortMap::native());
//!     let res = sim::resources(&module, &SimBufferProvider::new(), &SimSignals::new());
//!     let dev = M58::init(&DriverConfig::default(), res)?;
//!
//!     let out = Channel::new(2)?;
//!     dev.set_direction(out, Direction::Output);
//!     dev.write_channel(out, 0x55)?;
//!
//!     let input = Channel::new(0)?;
//!     println!("Port {}: 0x{:02X}", input.port(), dev.read_channel(input)?);
//!
//!     dev.exit();
//!     Ok(())
//! }
//! ```

// Make internal modules private, re-export public types
mod consts;
mod device;
mod error;
mod interrupt;
mod io;
mod store;

pub mod channel;
pub mod config;
pub mod hal;
pub mod sim;
pub mod status;

pub use channel::{
    Channel, ChannelMask, DataMode, Direction, Latch, PortMap, Termination, TriggerEdge,
};
pub use config::{BufferMode, ChannelConfig, DriverConfig, InputBufferConfig};
pub use device::M58;
pub use error::{Error, Result};
pub use hal::{BufferStat, Resources};
pub use interrupt::IrqOutcome;
pub use status::{InfoQuery, InfoReply, StatusCode};
// Re-export only essential public constants
pub use consts::{CH_NUMBER, CH_BITS};

/// Identification PROM constants.
pub mod id {
    pub use crate::consts::id::{MAGIC, MODULE_ID, SIZE};
}
