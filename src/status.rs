//! Status get/set dispatch and the static capability query.

use crate::channel::{Channel, DataMode, Direction, Termination, TriggerEdge};
use crate::consts;
use crate::device::M58;
use crate::error::{Error, Result};
use crate::hal::BufferStat;
use bitflags::bitflags;
use log::{debug, warn};
use std::sync::atomic::Ordering;

/// Channel type reported for every channel: binary I/O.
pub const CHANNEL_TYPE_BINARY: u32 = 0;

/// Status codes accepted by [`M58::get_status`] and [`M58::set_status`].
///
/// Channel-scoped codes act on the channel passed alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Driver debug level (get/set).
    DebugLevel,
    /// Number of channels (get).
    ChannelCount,
    /// Channel direction, 0 = input, 1 = output (get/set).
    ChannelDirection,
    /// Channel width in bits (get).
    ChannelLength,
    /// Channel type, always [`CHANNEL_TYPE_BINARY`] (get).
    ChannelType,
    /// Module interrupt enable (get/set).
    IrqEnable,
    /// Interrupt counter (get/set).
    IrqCount,
    /// Whether the id PROM was checked (get).
    IdCheck,
    /// Id PROM size in bytes (get).
    IdSize,
    /// Channel termination, 0 = active, 1 = passive (get/set).
    PortTermination,
    /// Trigger edge, 0 = falling, 1 = rising (get/set).
    TriggerEdge,
    /// Data storage mode 0..7 (get/set).
    DataMode,
    /// Set: install trigger signal. Get: installed target or 0.
    TriggerSignalSet,
    /// Remove trigger signal (set).
    TriggerSignalClear,
    /// Channel block I/O enable (get/set).
    BufferEnable,
    /// Number of buffered input channels (get).
    BlockReadSize,
    /// Number of buffered output channels (get).
    BlockWriteSize,
    /// Forwarded to the input buffer.
    Buffer(BufferStat),
}

fn unknown(code: StatusCode, dir: &str) -> Error {
    warn!("Unsupported {} status code {:?}", dir, code);
    Error::UnknownStatusCode(format!("{:?} ({})", code, dir))
}

impl M58 {
    /// Reads a status value.
    pub fn get_status(&self, code: StatusCode, ch: Channel) -> Result<u32> {
        let value = match code {
            StatusCode::DebugLevel => self.debug_level.load(Ordering::Acquire),
            StatusCode::ChannelCount => consts::CH_NUMBER as u32,
            StatusCode::ChannelDirection => self.direction(ch).into(),
            StatusCode::ChannelLength => consts::CH_BITS,
            StatusCode::ChannelType => CHANNEL_TYPE_BINARY,
            StatusCode::IrqEnable => self.irq_enabled() as u32,
            StatusCode::IrqCount => self.irq_count(),
            StatusCode::IdCheck => self.id_check() as u32,
            StatusCode::IdSize => consts::id::SIZE as u32,
            StatusCode::PortTermination => self.termination(ch).into(),
            StatusCode::TriggerEdge => self.trigger_edge().into(),
            StatusCode::DataMode => self.data_mode().value() as u32,
            StatusCode::TriggerSignalSet => self.trigger_signal(),
            StatusCode::BufferEnable => self.buffering(ch) as u32,
            StatusCode::BlockReadSize => self.read_size() as u32,
            StatusCode::BlockWriteSize => self.write_size() as u32,
            StatusCode::Buffer(stat) => self.buffer.get_stat(stat)?,
            StatusCode::TriggerSignalClear => return Err(unknown(code, "get")),
        };
        debug!("GetStat ch={} {:?} = {}", ch.number(), code, value);
        Ok(value)
    }

    /// Changes a status value.
    ///
    /// Changing direction, buffering or data mode while a block transfer is
    /// pending on another thread takes effect between transfers, never in
    /// the middle of one.
    pub fn set_status(&self, code: StatusCode, ch: Channel, value: u32) -> Result<()> {
        debug!("SetStat ch={} {:?} = 0x{:X}", ch.number(), code, value);
        match code {
            StatusCode::DebugLevel => self.debug_level.store(value, Ordering::Release),
            StatusCode::IrqEnable => self.set_irq_enable(value != 0),
            StatusCode::IrqCount => self.set_irq_count(value),
            StatusCode::ChannelDirection => self.set_direction(ch, Direction::try_from(value)?),
            StatusCode::PortTermination => self.set_termination(ch, Termination::try_from(value)?),
            StatusCode::TriggerEdge => self.set_trigger_edge(TriggerEdge::try_from(value)?),
            StatusCode::DataMode => self.set_data_mode(DataMode::try_from(value)?),
            StatusCode::TriggerSignalSet => self.enable_trigger_signal(value)?,
            StatusCode::TriggerSignalClear => self.disable_trigger_signal()?,
            StatusCode::BufferEnable => self.set_buffering(ch, value != 0),
            StatusCode::Buffer(stat) => self.buffer.set_stat(stat, value)?,
            StatusCode::ChannelCount
            | StatusCode::ChannelLength
            | StatusCode::ChannelType
            | StatusCode::IdCheck
            | StatusCode::IdSize
            | StatusCode::BlockReadSize
            | StatusCode::BlockWriteSize => return Err(unknown(code, "set")),
        }
        Ok(())
    }
}

// --- Capability Query ---

bitflags! {
    /// Address modes supported by the hardware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AddrModes: u8 {
        const A08 = 1 << 0;
    }
}

bitflags! {
    /// Data access widths supported by the hardware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataWidths: u8 {
        const D08 = 1 << 0;
        const D16 = 1 << 1;
    }
}

/// Process locking the host must apply around driver calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    None,
    /// One call at a time per driver instance.
    Call,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoQuery {
    HwCharacter,
    AddrSpaceCount,
    /// Details of the address space with this index.
    AddrSpace(u32),
    Irq,
    LockMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoReply {
    HwCharacter {
        addr_modes: AddrModes,
        data_modes: DataWidths,
    },
    AddrSpaceCount(u32),
    AddrSpace {
        addr_mode: AddrModes,
        /// Widest access the driver performs.
        data_mode: DataWidths,
        size: u32,
    },
    Irq(bool),
    LockMode(LockMode),
}

impl M58 {
    /// Answers what the host needs to know before init: address spaces,
    /// access widths, interrupt and locking requirements.
    pub fn info(query: InfoQuery) -> Result<InfoReply> {
        match query {
            InfoQuery::HwCharacter => Ok(InfoReply::HwCharacter {
                addr_modes: AddrModes::A08,
                data_modes: DataWidths::D08 | DataWidths::D16,
            }),
            InfoQuery::AddrSpaceCount => Ok(InfoReply::AddrSpaceCount(consts::space::COUNT)),
            InfoQuery::AddrSpace(index) if index < consts::space::COUNT => Ok(InfoReply::AddrSpace {
                addr_mode: AddrModes::A08,
                data_mode: DataWidths::D16,
                size: consts::space::SIZE,
            }),
            InfoQuery::AddrSpace(index) => Err(Error::IllegalParameter(format!(
                "address space index {} (module has {})",
                index,
                consts::space::COUNT
            ))),
            InfoQuery::Irq => Ok(InfoReply::Irq(true)),
            InfoQuery::LockMode => Ok(InfoReply::LockMode(LockMode::Call)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_queries() {
        assert_eq!(
            M58::info(InfoQuery::AddrSpaceCount).unwrap(),
            InfoReply::AddrSpaceCount(1)
        );
        assert_eq!(
            M58::info(InfoQuery::AddrSpace(0)).unwrap(),
            InfoReply::AddrSpace {
                addr_mode: AddrModes::A08,
                data_mode: DataWidths::D16,
                size: 256,
            }
        );
        assert!(matches!(
            M58::info(InfoQuery::AddrSpace(1)),
            Err(Error::IllegalParameter(_))
        ));
        assert_eq!(M58::info(InfoQuery::Irq).unwrap(), InfoReply::Irq(true));
        assert_eq!(
            M58::info(InfoQuery::LockMode).unwrap(),
            InfoReply::LockMode(LockMode::Call)
        );
        match M58::info(InfoQuery::HwCharacter).unwrap() {
            InfoReply::HwCharacter { data_modes, .. } => {
                assert!(data_modes.contains(DataWidths::D08 | DataWidths::D16))
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
