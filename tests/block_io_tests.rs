//! Tests for direct and block I/O
//!
//! Block transfers must touch every buffered channel of the right
//! direction in ascending order, and nothing at all when they fail.

use m58_dio::sim::{self, SimAccess, SimBufferProvider, SimModule, SimSignals};
use m58_dio::{
    BufferMode, BufferStat, Channel, ChannelConfig, DataMode, Direction, DriverConfig, Error,
    PortMap, StatusCode, M58,
};
use std::time::Duration;

struct Bench {
    dev: M58,
    module: SimModule,
    buffers: SimBufferProvider,
}

fn open_sim_device(mut config: DriverConfig) -> Bench {
    let _ = env_logger::builder().is_test(true).try_init();
    config.port_map = PortMap::LittleEndianLanes;
    let module = SimModule::new(config.port_map);
    let buffers = SimBufferProvider::new();
    let res = sim::resources(&module, &buffers, &SimSignals::new());
    let dev = M58::init(&config, res).expect("sim init failed");
    module.clear_log();
    Bench {
        dev,
        module,
        buffers,
    }
}

fn ch(n: u8) -> Channel {
    Channel::new(n).unwrap()
}

fn output() -> ChannelConfig {
    ChannelConfig {
        direction: Direction::Output,
        ..ChannelConfig::default()
    }
}

// Channels 0+1 input, 2+3 output, all buffered
fn split_config() -> DriverConfig {
    DriverConfig::default()
        .with_channel(ch(2), output())
        .with_channel(ch(3), output())
}

fn port_reads(module: &SimModule) -> usize {
    module
        .log()
        .iter()
        .filter(|a| matches!(a, SimAccess::Read8(_)))
        .count()
}

#[test]
fn test_read_channel_returns_pins() {
    let b = open_sim_device(DriverConfig::default());
    b.module.set_pins(0, 0xA5);
    b.module.set_pins(3, 0x3C);
    assert_eq!(b.dev.read_channel(ch(0)).unwrap(), 0xA5);
    assert_eq!(b.dev.read_channel(ch(3)).unwrap(), 0x3C);
    // Port A lives at 0x02 and port D at 0x01 on little-endian lanes
    assert_eq!(b.module.log(), vec![SimAccess::Read8(0x02), SimAccess::Read8(0x01)]);
}

#[test]
fn test_write_channel_uses_port_register() {
    let b = open_sim_device(split_config());
    b.dev.write_channel(ch(2), 0x81).unwrap();
    assert_eq!(b.module.log(), vec![SimAccess::Write8(0x00, 0x81)]);
    assert_eq!(b.module.latch(2), 0x81);
}

#[test]
fn test_wrong_direction_does_no_io() {
    let b = open_sim_device(split_config());
    assert!(matches!(
        b.dev.read_channel(ch(2)),
        Err(Error::WrongDirection { .. })
    ));
    assert!(matches!(
        b.dev.write_channel(ch(0), 0x01),
        Err(Error::WrongDirection { .. })
    ));
    assert!(b.module.log().is_empty());
}

#[test]
fn test_block_write_in_channel_order() {
    let b = open_sim_device(split_config());
    assert_eq!(b.dev.write_size(), 2);

    let written = b.dev.block_write(&[0x22, 0x44]).unwrap();
    assert_eq!(written, 2);
    assert_eq!(b.module.port_writes(), vec![(2, 0x22), (3, 0x44)]);
    assert_eq!(b.module.latch(2), 0x22);
    assert_eq!(b.module.latch(3), 0x44);
}

#[test]
fn test_block_write_extra_bytes_ignored() {
    let b = open_sim_device(split_config());
    assert_eq!(b.dev.block_write(&[1, 2, 3, 4, 5]).unwrap(), 2);
    assert_eq!(b.module.port_writes(), vec![(2, 1), (3, 2)]);
}

#[test]
fn test_block_write_skips_unbuffered_outputs() {
    let b = open_sim_device(split_config());
    b.dev.set_direction(ch(0), Direction::Output);
    b.dev.set_buffering(ch(2), false);
    b.module.clear_log();

    assert_eq!(b.dev.block_write(&[0x10, 0x20]).unwrap(), 2);
    assert_eq!(b.module.port_writes(), vec![(0, 0x10), (3, 0x20)]);
}

#[test]
fn test_block_write_no_channels() {
    let b = open_sim_device(DriverConfig::default());
    assert_eq!(b.dev.write_size(), 0);
    assert!(matches!(
        b.dev.block_write(&[0x00; 4]),
        Err(Error::NoChannelsEnabled(Direction::Output))
    ));
}

#[test]
fn test_block_write_too_small_is_atomic() {
    let b = open_sim_device(split_config());
    match b.dev.block_write(&[0x22]) {
        Err(Error::BufferTooSmall { expected, actual }) => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected BufferTooSmall, got {:?}", other),
    }
    assert!(b.module.port_writes().is_empty());
}

#[test]
fn test_block_read_direct_in_channel_order() {
    let b = open_sim_device(split_config());
    b.module.set_pins(0, 0x11);
    b.module.set_pins(1, 0x99);

    let mut buf = [0u8; 4];
    let (n, mode) = b.dev.block_read(&mut buf).unwrap();
    assert_eq!(n, 2);
    assert_eq!(mode, BufferMode::UserControlled);
    assert_eq!(&buf[..2], &[0x11, 0x99]);
    assert_eq!(buf[2..], [0, 0]);
    assert_eq!(port_reads(&b.module), 2);
}

#[test]
fn test_block_read_too_small_is_atomic() {
    let b = open_sim_device(DriverConfig::default());
    let mut buf = [0u8; 3];
    assert!(matches!(
        b.dev.block_read(&mut buf),
        Err(Error::BufferTooSmall {
            expected: 4,
            actual: 3
        })
    ));
    assert_eq!(port_reads(&b.module), 0);
}

#[test]
fn test_block_read_no_channels() {
    let mut config = DriverConfig::default();
    for c in config.channels.iter_mut() {
        c.buffering = false;
    }
    let b = open_sim_device(config);
    let mut buf = [0u8; 4];
    assert!(matches!(
        b.dev.block_read(&mut buf),
        Err(Error::NoChannelsEnabled(Direction::Input))
    ));
}

#[test]
fn test_block_read_from_buffer() {
    let b = open_sim_device(DriverConfig::buffered_input());
    b.dev.set_buffering(ch(2), false);
    b.dev.set_buffering(ch(3), false);

    b.module.set_pins(0, 0x01);
    b.module.set_pins(1, 0x02);
    b.dev.service_interrupt();
    b.module.set_pins(0, 0x03);
    b.module.set_pins(1, 0x04);
    b.dev.service_interrupt();

    // A small caller buffer takes what fits; the rest stays queued
    let mut buf = [0u8; 3];
    let (n, mode) = b.dev.block_read(&mut buf).unwrap();
    assert_eq!((n, mode), (3, BufferMode::RingBuffer));
    assert_eq!(buf, [0x01, 0x02, 0x03]);

    let mut buf = [0u8; 8];
    let (n, _) = b.dev.block_read(&mut buf).unwrap();
    assert_eq!(n, 1);
    assert_eq!(buf[0], 0x04);
}

#[test]
fn test_block_read_from_buffer_ignores_configuration() {
    let b = open_sim_device(DriverConfig::buffered_input());
    b.module.set_pins(2, 0x77);
    b.dev.service_interrupt();

    // No input channel left, but the harvested bytes are still delivered
    for c in Channel::ALL {
        b.dev.set_direction(c, Direction::Output);
    }
    let mut buf = [0u8; 8];
    let (n, _) = b.dev.block_read(&mut buf).unwrap();
    assert_eq!(n, 4);
    assert_eq!(buf[2], 0x77);
}

#[test]
fn test_buffered_read_timeout() {
    let mut config = DriverConfig::buffered_input();
    config.in_buf.timeout = Duration::from_millis(50);
    let b = open_sim_device(config);
    let mut buf = [0u8; 4];
    assert!(matches!(b.dev.block_read(&mut buf), Err(Error::Timeout)));
}

#[test]
fn test_buffer_mode_switch_via_status() {
    let mut config = split_config();
    config.data_mode = DataMode::new(5).unwrap();
    let b = open_sim_device(config);
    b.module.set_pins(0, 0x5A);
    b.module.set_pins(1, 0xA5);
    b.dev.service_interrupt();

    // Raw mode 2 selects the ring buffer
    b.dev
        .set_status(StatusCode::Buffer(BufferStat::Mode), ch(0), 2)
        .unwrap();
    assert_eq!(
        b.dev
            .get_status(StatusCode::Buffer(BufferStat::Mode), ch(0))
            .unwrap(),
        2
    );

    b.module.clear_log();
    let mut buf = [0u8; 8];
    let (n, mode) = b.dev.block_read(&mut buf).unwrap();
    assert_eq!((n, mode), (2, BufferMode::RingBuffer));
    assert_eq!(&buf[..2], &[0x5A, 0xA5]);
    assert_eq!(port_reads(&b.module), 0);
    assert_eq!(b.buffers.buffer().unwrap().contents(), Vec::<u8>::new());
}

#[test]
fn test_buffer_mode_raw_values() {
    let b = open_sim_device(DriverConfig::default());
    let expected = [
        (0, BufferMode::UserControlled),
        (1, BufferMode::CurrentValueOnly),
        (2, BufferMode::RingBuffer),
        (3, BufferMode::RingBufferOverwrite),
    ];
    for (raw, mode) in expected {
        b.dev
            .set_status(StatusCode::Buffer(BufferStat::Mode), ch(0), raw)
            .unwrap();
        assert_eq!(
            b.dev
                .get_status(StatusCode::Buffer(BufferStat::Mode), ch(0))
                .unwrap(),
            raw
        );
        let mut buf = [0u8; 4];
        let (_, served) = b.dev.block_read(&mut buf).unwrap();
        assert_eq!(served, mode, "raw mode {}", raw);
    }
    assert!(matches!(
        b.dev.set_status(StatusCode::Buffer(BufferStat::Mode), ch(0), 4),
        Err(Error::IllegalParameter(_))
    ));
}
