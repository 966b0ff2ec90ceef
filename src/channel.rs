//! Channel identity and the per-channel/device-wide configuration values.

use crate::consts;
use crate::error::{illegal_value, Error, Result};
use bitflags::bitflags;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl TryFrom<u32> for Direction {
    type Error = Error;

    /// Status-call encoding: 0 = input, 1 = output.
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Direction::Input),
            1 => Ok(Direction::Output),
            _ => Err(illegal_value("channel direction", value)),
        }
    }
}

impl From<Direction> for u32 {
    fn from(dir: Direction) -> u32 {
        match dir {
            Direction::Input => 0,
            Direction::Output => 1,
        }
    }
}

/// Physical termination of an input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    Active,
    Passive,
}

impl TryFrom<u32> for Termination {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Termination::Active),
            1 => Ok(Termination::Passive),
            _ => Err(illegal_value("port termination", value)),
        }
    }
}

impl From<Termination> for u32 {
    fn from(term: Termination) -> u32 {
        match term {
            Termination::Active => 0,
            Termination::Passive => 1,
        }
    }
}

/// Edge of the trigger line that latches data and raises the interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEdge {
    Falling,
    Rising,
}

impl TryFrom<u32> for TriggerEdge {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(TriggerEdge::Falling),
            1 => Ok(TriggerEdge::Rising),
            _ => Err(illegal_value("trigger edge", value)),
        }
    }
}

impl From<TriggerEdge> for u32 {
    fn from(edge: TriggerEdge) -> u32 {
        match edge {
            TriggerEdge::Falling => 0,
            TriggerEdge::Rising => 1,
        }
    }
}

/// Represents a valid channel number (0-3), i.e. port A..D.
/// Use `Channel::new(num)` to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// All channels in ascending order.
    pub const ALL: [Channel; consts::CH_NUMBER] = [Channel(0), Channel(1), Channel(2), Channel(3)];

    /// Creates a new Channel, returning an error if the number is out of range (0-3).
    pub fn new(num: u8) -> Result<Self> {
        if (num as usize) < consts::CH_NUMBER {
            Ok(Channel(num))
        } else {
            Err(Error::IllegalParameter(format!(
                "channel {} out of range (0-{})",
                num,
                consts::CH_NUMBER - 1
            )))
        }
    }

    /// Returns the underlying channel number (0-3).
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }

    /// Returns the port letter ('A'..'D') wired to this channel.
    #[inline]
    pub fn port(&self) -> char {
        (b'A' + self.0) as char
    }

    /// Returns the channel's bit in the control registers.
    #[inline]
    pub fn mask(&self) -> ChannelMask {
        ChannelMask::from_bits_truncate(1 << self.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (port {})", self.0, self.port())
    }
}

bitflags! {
    /// One bit per channel, as laid out in the direction and termination
    /// control registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChannelMask: u8 {
        const CH0 = 1 << 0;
        const CH1 = 1 << 1;
        const CH2 = 1 << 2;
        const CH3 = 1 << 3;
    }
}

impl ChannelMask {
    /// Iterates the channels in this mask in ascending order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |ch| self.contains(ch.mask()))
    }
}

/// When a channel's port state gets latched under a given data storage mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latch {
    /// Latched when the given channel is read.
    OnRead(Channel),
    /// Latched on the trigger edge.
    OnTrigger,
    /// Mode 6; the hardware documents no behaviour.
    Reserved,
    /// Mode 7; data storage is blocked.
    Blocked,
}

/// Data storage mode (0-7) written verbatim to control register 2.
///
/// | mode | ch 0    | ch 1    | ch 2    | ch 3    |
/// |------|---------|---------|---------|---------|
/// | 0    | read #0 | read #1 | read #2 | read #3 |
/// | 1    | read #0 | read #0 | read #0 | read #0 |
/// | 2    | read #0 | read #1 | read #2 | trigger |
/// | 3    | read #0 | read #1 | trigger | trigger |
/// | 4    | read #0 | trigger | trigger | trigger |
/// | 5    | trigger | trigger | trigger | trigger |
/// | 6    | (reserved)                            |
/// | 7    | (data storage blocked)                |
///
/// Modes 0-1 suit direct input, mode 5 buffered input, 2-4 mixed use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataMode(u8);

impl DataMode {
    pub const MAX: u8 = consts::reg::ctrl2::MODE_MASK as u8;

    /// Creates a data storage mode, rejecting values above 7.
    ///
    /// Mode 6 is accepted and passed through to hardware unchanged.
    pub fn new(mode: u8) -> Result<Self> {
        if mode <= Self::MAX {
            Ok(DataMode(mode))
        } else {
            Err(illegal_value("data storage mode", mode as u32))
        }
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Looks up when `ch` is latched in this mode.
    pub fn latch(&self, ch: Channel) -> Latch {
        let n = ch.number();
        match self.0 {
            0 => Latch::OnRead(ch),
            1 => Latch::OnRead(Channel(0)),
            2..=4 => {
                // Modes 2, 3, 4 hand the top 1, 2, 3 channels to the trigger
                if n < 5 - self.0 {
                    Latch::OnRead(ch)
                } else {
                    Latch::OnTrigger
                }
            }
            5 => Latch::OnTrigger,
            6 => Latch::Reserved,
            _ => Latch::Blocked,
        }
    }
}

impl TryFrom<u32> for DataMode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        u8::try_from(value)
            .map_err(|_| illegal_value("data storage mode", value))
            .and_then(DataMode::new)
    }
}

/// Byte-lane ordering of the module bus, which decides where each port
/// register sits in the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMap {
    /// Port A at 0x03 .. port D at 0x00.
    BigEndianLanes,
    /// Port A at 0x02, B at 0x03, C at 0x00, D at 0x01.
    LittleEndianLanes,
}

impl PortMap {
    /// Map for the build target, honouring the `byteswap` feature.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") != cfg!(feature = "byteswap") {
            PortMap::BigEndianLanes
        } else {
            PortMap::LittleEndianLanes
        }
    }

    /// Port register offsets indexed by channel.
    pub fn offsets(self) -> [u8; consts::CH_NUMBER] {
        match self {
            PortMap::BigEndianLanes => consts::reg::PORTS_BE,
            PortMap::LittleEndianLanes => consts::reg::PORTS_LE,
        }
    }
}

impl Default for PortMap {
    fn default() -> Self {
        PortMap::native()
    }
}
