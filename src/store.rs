//! Channel configuration store.
//!
//! Holds direction, termination and buffering of every channel plus the
//! device-wide trigger edge and data storage mode. Each setter updates the
//! store, the matching control register bits and the derived block sizes
//! inside one critical section (the store lock), so no I/O path can see a
//! change applied to only part of that state.

use crate::channel::{Channel, ChannelMask, DataMode, Direction, Termination, TriggerEdge};
use crate::config::DriverConfig;
use crate::consts::{self, reg};
use crate::device::M58;
use log::{debug, trace};
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChannelStore {
    direction: [Direction; consts::CH_NUMBER],
    termination: [Termination; consts::CH_NUMBER],
    buffering: [bool; consts::CH_NUMBER],
    pub(crate) trigger_edge: TriggerEdge,
    pub(crate) data_mode: DataMode,
    read_size: usize,
    write_size: usize,
}

impl ChannelStore {
    pub(crate) fn from_config(cfg: &DriverConfig) -> Self {
        let mut store = Self {
            direction: cfg.channels.map(|c| c.direction),
            termination: cfg.channels.map(|c| c.termination),
            buffering: cfg.channels.map(|c| c.buffering),
            trigger_edge: cfg.trigger_edge,
            data_mode: cfg.data_mode,
            read_size: 0,
            write_size: 0,
        };
        store.recompute_sizes();
        store
    }

    /// Channels enabled for buffering whose direction is `dir`.
    pub(crate) fn enabled(&self, dir: Direction) -> ChannelMask {
        Channel::ALL
            .into_iter()
            .filter(|ch| self.buffering[ch.index()] && self.direction[ch.index()] == dir)
            .fold(ChannelMask::empty(), |mask, ch| mask | ch.mask())
    }

    pub(crate) fn recompute_sizes(&mut self) {
        self.read_size = self.enabled(Direction::Input).bits().count_ones() as usize;
        self.write_size = self.enabled(Direction::Output).bits().count_ones() as usize;
        trace!(
            "Block sizes recomputed: read={}, write={}",
            self.read_size,
            self.write_size
        );
    }

    #[inline]
    pub(crate) fn direction(&self, ch: Channel) -> Direction {
        self.direction[ch.index()]
    }

    #[inline]
    pub(crate) fn read_size(&self) -> usize {
        self.read_size
    }

    #[inline]
    pub(crate) fn write_size(&self) -> usize {
        self.write_size
    }

    /// Control register 0 image (bit set = input).
    pub(crate) fn direction_bits(&self) -> u16 {
        Channel::ALL
            .into_iter()
            .filter(|ch| self.direction[ch.index()] == Direction::Input)
            .fold(ChannelMask::empty(), |mask, ch| mask | ch.mask())
            .bits() as u16
    }

    /// Control register 1 image (bit set = passive).
    pub(crate) fn termination_bits(&self) -> u16 {
        Channel::ALL
            .into_iter()
            .filter(|ch| self.termination[ch.index()] == Termination::Passive)
            .fold(ChannelMask::empty(), |mask, ch| mask | ch.mask())
            .bits() as u16
    }

    /// Control register 2 image.
    pub(crate) fn ctrl2_bits(&self) -> u16 {
        let edge = match self.trigger_edge {
            TriggerEdge::Falling => 0,
            TriggerEdge::Rising => reg::ctrl2::TRIG_RISE,
        };
        edge | self.data_mode.value() as u16
    }
}

impl M58 {
    // --- Channel settings ---

    /// Sets the direction of a channel and recomputes the block sizes.
    pub fn set_direction(&self, ch: Channel, direction: Direction) {
        let mut store = self.store.lock();
        // Withdraw the channel from harvesting while its port changes role
        self.harvest.fetch_and(!ch.mask().bits(), Ordering::AcqRel);
        let mask = ch.mask().bits() as u16;
        match direction {
            Direction::Input => self.regs.set_mask_u16(reg::CTRL0, mask),
            Direction::Output => self.regs.clear_mask_u16(reg::CTRL0, mask),
        }
        store.direction[ch.index()] = direction;
        store.recompute_sizes();
        self.publish_harvest(&store);
        debug!("Channel {} direction set to {:?}", ch, direction);
    }

    pub fn direction(&self, ch: Channel) -> Direction {
        self.store.lock().direction(ch)
    }

    /// Sets the termination of a channel. Only meaningful for inputs, but
    /// stored and written to hardware regardless of direction.
    pub fn set_termination(&self, ch: Channel, termination: Termination) {
        let mut store = self.store.lock();
        let mask = ch.mask().bits() as u16;
        match termination {
            Termination::Passive => self.regs.set_mask_u16(reg::CTRL1, mask),
            Termination::Active => self.regs.clear_mask_u16(reg::CTRL1, mask),
        }
        store.termination[ch.index()] = termination;
        debug!("Channel {} termination set to {:?}", ch, termination);
    }

    pub fn termination(&self, ch: Channel) -> Termination {
        self.store.lock().termination[ch.index()]
    }

    /// Enables or disables block I/O and interrupt harvesting for a channel.
    pub fn set_buffering(&self, ch: Channel, enable: bool) {
        let mut store = self.store.lock();
        store.buffering[ch.index()] = enable;
        store.recompute_sizes();
        self.publish_harvest(&store);
        debug!("Channel {} buffering {}", ch, if enable { "enabled" } else { "disabled" });
    }

    pub fn buffering(&self, ch: Channel) -> bool {
        self.store.lock().buffering[ch.index()]
    }

    // --- Device settings ---

    pub fn set_trigger_edge(&self, edge: TriggerEdge) {
        let mut store = self.store.lock();
        match edge {
            TriggerEdge::Rising => self.regs.set_mask_u16(reg::CTRL2, reg::ctrl2::TRIG_RISE),
            TriggerEdge::Falling => self.regs.clear_mask_u16(reg::CTRL2, reg::ctrl2::TRIG_RISE),
        }
        store.trigger_edge = edge;
        debug!("Trigger edge set to {:?}", edge);
    }

    pub fn trigger_edge(&self) -> TriggerEdge {
        self.store.lock().trigger_edge
    }

    /// Sets the data storage mode. The value is written to hardware as is;
    /// whether it suits the I/O pattern in use is up to the caller.
    pub fn set_data_mode(&self, mode: DataMode) {
        let mut store = self.store.lock();
        self.regs.clear_mask_u16(reg::CTRL2, reg::ctrl2::MODE_MASK);
        self.regs.set_mask_u16(reg::CTRL2, mode.value() as u16);
        store.data_mode = mode;
        debug!("Data storage mode set to {}", mode.value());
    }

    pub fn data_mode(&self) -> DataMode {
        self.store.lock().data_mode
    }

    // --- Derived sizes ---

    /// Number of buffered input channels (bytes produced per block read).
    pub fn read_size(&self) -> usize {
        self.store.lock().read_size()
    }

    /// Number of buffered output channels (bytes consumed per block write).
    pub fn write_size(&self) -> usize {
        self.store.lock().write_size()
    }

    // Makes the current harvest set visible to the interrupt handler
    pub(crate) fn publish_harvest(&self, store: &ChannelStore) {
        self.harvest
            .store(store.enabled(Direction::Input).bits(), Ordering::Release);
    }
}
