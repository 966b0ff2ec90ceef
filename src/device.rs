//! Driver instance lifecycle: init, hardware setup, exit.

use crate::channel::{Channel, Direction};
use crate::config::DriverConfig;
use crate::consts::{self, reg};
use crate::error::{Error, Result};
use crate::hal::{InputBuffer, RegisterAccess, Resources, SignalDelivery};
use crate::store::ChannelStore;
use log::{debug, error, trace, warn};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// A handle to one initialized M58 module.
///
/// Every board gets its own handle; there is no process-wide state. Calls
/// may come from one call context at a time plus the interrupt context
/// ([`M58::service_interrupt`]), so all methods take `&self`.
///
/// Channel configuration lives behind a spin lock that is held only across
/// register writes. The interrupt handler never takes it: it reads the
/// harvest set published (atomically) at the end of every configuration
/// change.
pub struct M58 {
    pub(crate) regs: Box<dyn RegisterAccess>,
    pub(crate) buffer: Box<dyn InputBuffer>,
    pub(crate) signals: Box<dyn SignalDelivery>,
    pub(crate) ports: [u8; consts::CH_NUMBER],
    pub(crate) store: spin::Mutex<ChannelStore>,
    /// Channels the interrupt handler harvests (ChannelMask bits).
    pub(crate) harvest: AtomicU8,
    pub(crate) irq_count: AtomicU32,
    pub(crate) irq_enabled: AtomicBool,
    /// Installed trigger signal target, 0 when none.
    pub(crate) signal_target: AtomicU32,
    pub(crate) debug_level: AtomicU32,
    id_check: bool,
}

impl M58 {
    /// Validates `config`, creates the input buffer, checks the module
    /// identity and programs the hardware. Interrupts stay disabled.
    ///
    /// On failure every resource acquired so far is released before the
    /// error is returned.
    pub fn init(config: &DriverConfig, res: Resources) -> Result<Self> {
        debug!("M58 init: {:?}", config);
        config.validate()?;

        let Resources {
            registers,
            buffers,
            signals,
        } = res;

        let store = ChannelStore::from_config(config);

        let buffer = buffers.create(&config.in_buf).map_err(|e| {
            warn!("Failed to create input buffer: {}", e);
            match e {
                Error::AllocationFailure(_) => e,
                other => Error::AllocationFailure(other.to_string()),
            }
        })?;

        if config.id_check {
            check_module_id(registers.as_ref())?;
        } else {
            debug!("Module id check skipped");
        }

        let dev = Self {
            regs: registers,
            buffer,
            signals,
            ports: config.port_map.offsets(),
            store: spin::Mutex::new(store),
            harvest: AtomicU8::new(0),
            irq_count: AtomicU32::new(0),
            irq_enabled: AtomicBool::new(false),
            signal_target: AtomicU32::new(0),
            debug_level: AtomicU32::new(config.debug_level),
            id_check: config.id_check,
        };
        dev.init_hardware();
        Ok(dev)
    }

    fn init_hardware(&self) {
        let store = self.store.lock();
        self.regs.write_u16(reg::CTRL3, 0x00);
        for &offset in &self.ports {
            self.regs.write_u8(offset, 0x00);
        }
        self.regs.write_u16(reg::CTRL0, store.direction_bits());
        self.regs.write_u16(reg::CTRL1, store.termination_bits());
        self.regs.write_u16(reg::CTRL2, store.ctrl2_bits());
        self.publish_harvest(&store);
        debug!(
            "Hardware initialized: ctrl0=0x{:02X}, ctrl1=0x{:02X}, ctrl2=0x{:02X}",
            store.direction_bits(),
            store.termination_bits(),
            store.ctrl2_bits()
        );
    }

    /// Shuts the driver down: all channels input/passive, interrupts off,
    /// trigger signal and input buffer released. Same as dropping the handle.
    pub fn exit(self) {
        debug!("M58 exit");
        drop(self);
    }

    /// Driver revision string.
    pub fn ident() -> &'static str {
        concat!("m58-dio ", env!("CARGO_PKG_VERSION"))
    }

    /// Whether the identification PROM was checked at init.
    pub fn id_check(&self) -> bool {
        self.id_check
    }

    /// Copies the raw identification PROM (64 words, native byte order)
    /// into `buf`, which must hold at least 128 bytes.
    pub fn read_id_prom(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < consts::id::SIZE {
            return Err(Error::BufferTooSmall {
                expected: consts::id::SIZE,
                actual: buf.len(),
            });
        }
        for (n, chunk) in buf[..consts::id::SIZE].chunks_exact_mut(2).enumerate() {
            let word = self.regs.read_id_word(n as u8);
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
        trace!("Read {} bytes of id PROM", consts::id::SIZE);
        Ok(consts::id::SIZE)
    }

    // --- Port access ---

    #[inline]
    pub(crate) fn port_read(&self, ch: Channel) -> u8 {
        let value = self.regs.read_u8(self.ports[ch.index()]);
        trace!(
            "Read port {} (reg 0x{:02X}) = 0x{:02X}",
            ch.port(),
            self.ports[ch.index()],
            value
        );
        value
    }

    #[inline]
    pub(crate) fn port_write(&self, ch: Channel, value: u8) {
        trace!(
            "Write port {} (reg 0x{:02X}) = 0x{:02X}",
            ch.port(),
            self.ports[ch.index()],
            value
        );
        self.regs.write_u8(self.ports[ch.index()], value);
    }

    #[inline]
    pub(crate) fn check_direction(
        &self,
        store: &ChannelStore,
        ch: Channel,
        required: Direction,
    ) -> Result<()> {
        let configured = store.direction(ch);
        if configured == required {
            Ok(())
        } else {
            Err(Error::WrongDirection {
                channel: ch,
                configured,
                required,
            })
        }
    }
}

impl Drop for M58 {
    fn drop(&mut self) {
        // Safe state first, whatever happens afterwards
        self.regs.write_u16(reg::CTRL0, 0x0F);
        self.regs.write_u16(reg::CTRL1, 0x0F);
        self.regs.write_u16(reg::CTRL3, 0x00);
        self.irq_enabled.store(false, Ordering::Release);
        self.harvest.store(0, Ordering::Release);

        if let Some(target) = NonZeroU32::new(self.signal_target.swap(0, Ordering::AcqRel)) {
            if let Err(e) = self.signals.remove(target) {
                error!("Failed to remove trigger signal {} on exit: {}", target, e);
            }
        }
        debug!("M58 released (irq count {})", self.irq_count.load(Ordering::Acquire));
    }
}

fn check_module_id(regs: &dyn RegisterAccess) -> Result<()> {
    let magic = regs.read_id_word(0);
    let id = regs.read_id_word(1);
    if magic != consts::id::MAGIC || id != consts::id::MODULE_ID {
        error!("Illegal module identification: magic=0x{:04X}, id={}", magic, id);
        return Err(Error::IdentificationMismatch { magic, id });
    }
    trace!("Module id verified: magic=0x{:04X}, id={}", magic, id);
    Ok(())
}
