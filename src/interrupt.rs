//! Trigger interrupt servicing and trigger signal control.

use crate::channel::ChannelMask;
use crate::consts::reg;
use crate::device::M58;
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::num::NonZeroU32;
use std::sync::atomic::Ordering;

/// What one call of [`M58::service_interrupt`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqOutcome {
    /// Channels copied into the input buffer.
    pub harvested: usize,
    /// Whether the trigger signal was sent.
    pub signalled: bool,
}

impl M58 {
    // --- Interrupt Service ---

    /// Services one trigger-edge interrupt.
    ///
    /// Acknowledges the interrupt, copies every buffered input channel into
    /// the input buffer in ascending order (stopping early if the buffer has
    /// no free slot), sends the trigger signal if one is installed and bumps
    /// the interrupt counter. Never blocks and never touches configuration.
    pub fn service_interrupt(&self) -> IrqOutcome {
        // Acknowledge before harvesting so the next edge is not lost
        let _ = self.regs.read_u16(reg::CTRL3);

        let mask = ChannelMask::from_bits_truncate(self.harvest.load(Ordering::Acquire));
        let mut harvested = 0;
        for ch in mask.channels() {
            if !self.buffer.fill_next(&mut || self.port_read(ch)) {
                debug!(
                    "Input buffer overrun, harvest stopped at channel {} ({} stored)",
                    ch, harvested
                );
                break;
            }
            harvested += 1;
        }

        let signalled = match NonZeroU32::new(self.signal_target.load(Ordering::Acquire)) {
            Some(target) => {
                self.signals.send(target);
                true
            }
            None => false,
        };

        let count = self.irq_count.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        trace!(
            ">>> M58 irq #{}: harvested={}, signalled={}",
            count,
            harvested,
            signalled
        );
        IrqOutcome {
            harvested,
            signalled,
        }
    }

    // --- Interrupt Control ---

    /// Enables or disables the module interrupt.
    pub fn set_irq_enable(&self, enable: bool) {
        if enable {
            self.regs.set_mask_u16(reg::CTRL3, reg::ctrl3::IRQ_ENABLE);
        } else {
            self.regs.clear_mask_u16(reg::CTRL3, reg::ctrl3::IRQ_ENABLE);
        }
        self.irq_enabled.store(enable, Ordering::Release);
        debug!("Interrupt {}", if enable { "enabled" } else { "disabled" });
    }

    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.load(Ordering::Acquire)
    }

    /// Number of interrupts serviced since init or the last reset.
    pub fn irq_count(&self) -> u32 {
        self.irq_count.load(Ordering::Acquire)
    }

    pub fn set_irq_count(&self, count: u32) {
        self.irq_count.store(count, Ordering::Release);
    }

    // --- Trigger Signal ---

    /// Installs the trigger signal sent on every serviced interrupt.
    ///
    /// Only one signal can be installed; target 0 is not allowed.
    pub fn enable_trigger_signal(&self, target: u32) -> Result<()> {
        let sig = NonZeroU32::new(target).ok_or(Error::InvalidTarget(target))?;
        let current = self.signal_target.load(Ordering::Acquire);
        if current != 0 {
            warn!("Trigger signal already installed (target {})", current);
            return Err(Error::AlreadyInstalled(current));
        }

        self.signals.create(sig)?;
        if let Err(current) =
            self.signal_target
                .compare_exchange(0, target, Ordering::AcqRel, Ordering::Acquire)
        {
            let _ = self.signals.remove(sig);
            return Err(Error::AlreadyInstalled(current));
        }
        debug!("Trigger signal {} installed", target);
        Ok(())
    }

    /// Removes the installed trigger signal.
    pub fn disable_trigger_signal(&self) -> Result<()> {
        let sig = NonZeroU32::new(self.signal_target.load(Ordering::Acquire)).ok_or_else(|| {
            warn!("Trigger signal not installed");
            Error::NotInstalled
        })?;
        // The target stays installed until the delivery layer lets go of it
        self.signals.remove(sig).map_err(|e| {
            warn!("Failed to remove trigger signal {}: {}", sig, e);
            e
        })?;
        self.signal_target.store(0, Ordering::Release);
        debug!("Trigger signal {} removed", sig);
        Ok(())
    }

    /// Target of the installed trigger signal, 0 if none.
    pub fn trigger_signal(&self) -> u32 {
        self.signal_target.load(Ordering::Acquire)
    }
}
