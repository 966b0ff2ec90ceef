//! Internal constants, register offsets, and bit definitions.

/// Number of I/O channels (ports A..D).
pub const CH_NUMBER: usize = 4;
/// Width of one channel in bits.
pub const CH_BITS: u32 = 8;

// --- Identification PROM ---
pub mod id {
    /// Magic word expected in PROM word 0.
    pub const MAGIC: u16 = 0x5346;
    /// Module id expected in PROM word 1.
    pub const MODULE_ID: u16 = 58;
    /// PROM size in bytes (read as 16-bit words).
    pub const SIZE: usize = 128;
}

// --- Address space ---
pub mod space {
    pub const COUNT: u32 = 1;
    pub const SIZE: u32 = 256;
}

// --- Register offsets ---
pub mod reg {
    // Port byte offsets, big-endian byte lanes
    pub const PORTS_BE: [u8; 4] = [0x03, 0x02, 0x01, 0x00];
    // Port byte offsets, little-endian byte lanes
    pub const PORTS_LE: [u8; 4] = [0x02, 0x03, 0x00, 0x01];

    /// Direction of channels 0..3 (bit set = input).
    pub const CTRL0: u8 = 0x80;
    /// Termination of channels 0..3 (bit set = passive).
    pub const CTRL1: u8 = 0x82;
    /// Trigger edge and data storage mode.
    pub const CTRL2: u8 = 0x84;
    /// Interrupt enable. Reading it acknowledges a pending interrupt.
    pub const CTRL3: u8 = 0x86;

    pub mod ctrl2 {
        /// Trigger on rising edge when set.
        pub const TRIG_RISE: u16 = 0x08;
        /// Data storage mode field (bits 2..0).
        pub const MODE_MASK: u16 = 0x07;
    }

    pub mod ctrl3 {
        pub const IRQ_ENABLE: u16 = 0x08;
    }
}

// --- Input buffer ---
pub mod buf {
    /// Smallest input buffer accepted at init [bytes].
    pub const MIN_SIZE: usize = 8;
}
