//! Tests for the interrupt service routine and trigger signal control

use m58_dio::sim::{self, SimAccess, SimBufferProvider, SimModule, SimSignals};
use m58_dio::{
    BufferMode, Channel, ChannelConfig, DataMode, Direction, DriverConfig, Error, IrqOutcome,
    PortMap, StatusCode, M58,
};

const CTRL3: u8 = 0x86;

struct Bench {
    dev: M58,
    module: SimModule,
    buffers: SimBufferProvider,
    signals: SimSignals,
}

fn open_sim_device(mut config: DriverConfig) -> Bench {
    let _ = env_logger::builder().is_test(true).try_init();
    config.port_map = PortMap::LittleEndianLanes;
    let module = SimModule::new(config.port_map);
    let buffers = SimBufferProvider::new();
    let signals = SimSignals::new();
    let dev = M58::init(&config, sim::resources(&module, &buffers, &signals))
        .expect("sim init failed");
    module.clear_log();
    Bench {
        dev,
        module,
        buffers,
        signals,
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

// Channels 0+1 input, 2+3 output, latched on the trigger edge
fn triggered_split_config() -> DriverConfig {
    let mut config = DriverConfig::default()
        .with_channel(ch(2), output())
        .with_channel(ch(3), output());
    config.data_mode = DataMode::new(5).unwrap();
    config
}

#[test]
fn test_isr_harvests_buffered_inputs() {
    let b = open_sim_device(triggered_split_config());
    b.module.set_pins(0, 0x12);
    b.module.set_pins(1, 0x34);
    b.module.set_pins(2, 0xEE);
    assert_eq!(b.dev.irq_count(), 0);

    let outcome = b.dev.service_interrupt();
    assert_eq!(
        outcome,
        IrqOutcome {
            harvested: 2,
            signalled: false
        }
    );
    let buffer = b.buffers.buffer().unwrap();
    assert_eq!(buffer.contents(), vec![0x12, 0x34]);
    assert_eq!(b.dev.irq_count(), 1);
    assert!(b.signals.sent().is_empty());
}

#[test]
fn test_isr_acknowledges_first() {
    let b = open_sim_device(triggered_split_config());
    b.dev.service_interrupt();

    let log = b.module.log();
    assert_eq!(log[0], SimAccess::Read16(CTRL3));
    // Port A then port B on little-endian lanes
    assert_eq!(&log[1..], &[SimAccess::Read8(0x02), SimAccess::Read8(0x03)]);
    assert_eq!(b.module.acks(), 1);
}

#[test]
fn test_isr_overrun_truncates_harvest() {
    let mut config = DriverConfig::default();
    config.channels[3].buffering = false;
    let b = open_sim_device(config);
    let buffer = b.buffers.buffer().unwrap();

    assert_eq!(b.dev.service_interrupt().harvested, 3);
    assert_eq!(b.dev.service_interrupt().harvested, 3);

    // Two free slots left in the 8-byte buffer
    b.module.clear_log();
    assert_eq!(b.dev.service_interrupt().harvested, 2);
    let reads = b
        .module
        .log()
        .iter()
        .filter(|a| matches!(a, SimAccess::Read8(_)))
        .count();
    assert_eq!(reads, 2);
    assert_eq!(buffer.contents().len(), 8);
    assert_eq!(buffer.overruns(), 1);

    // Full buffer: nothing stored, but the interrupt still counts
    assert_eq!(b.dev.service_interrupt().harvested, 0);
    assert_eq!(b.dev.irq_count(), 4);
    assert_eq!(b.module.acks(), 2);
}

#[test]
fn test_isr_overwrite_mode_keeps_newest() {
    let mut config = DriverConfig::buffered_input();
    config.in_buf.size = 8;
    config.in_buf.mode = BufferMode::RingBufferOverwrite;
    let b = open_sim_device(config);

    for round in 0..3u8 {
        for c in 0..4 {
            b.module.set_pins(c, round * 0x10 + c);
        }
        assert_eq!(b.dev.service_interrupt().harvested, 4);
    }
    assert_eq!(
        b.buffers.buffer().unwrap().contents(),
        vec![0x10, 0x11, 0x12, 0x13, 0x20, 0x21, 0x22, 0x23]
    );
}

#[test]
fn test_harvest_follows_configuration() {
    let b = open_sim_device(DriverConfig::default());
    assert_eq!(b.dev.service_interrupt().harvested, 4);

    b.dev.set_direction(ch(1), Direction::Output);
    b.dev.set_buffering(ch(3), false);
    b.module.clear_log();
    assert_eq!(b.dev.service_interrupt().harvested, 2);
    // Ports A and C only
    assert_eq!(
        &b.module.log()[1..],
        &[SimAccess::Read8(0x02), SimAccess::Read8(0x00)]
    );

    for c in Channel::ALL {
        b.dev.set_direction(c, Direction::Output);
    }
    assert_eq!(b.dev.service_interrupt().harvested, 0);
}

#[test]
fn test_trigger_signal_lifecycle() {
    let b = open_sim_device(triggered_split_config());
    assert_eq!(b.dev.trigger_signal(), 0);

    assert!(matches!(
        b.dev.enable_trigger_signal(0),
        Err(Error::InvalidTarget(0))
    ));
    assert!(matches!(
        b.dev.disable_trigger_signal(),
        Err(Error::NotInstalled)
    ));

    b.dev.enable_trigger_signal(10).unwrap();
    assert_eq!(b.dev.trigger_signal(), 10);
    assert_eq!(b.signals.live(), vec![10]);
    assert!(matches!(
        b.dev.enable_trigger_signal(12),
        Err(Error::AlreadyInstalled(10))
    ));
    assert_eq!(b.signals.live(), vec![10]);

    let outcome = b.dev.service_interrupt();
    assert!(outcome.signalled);
    b.dev.service_interrupt();
    assert_eq!(b.signals.sent(), vec![10, 10]);

    b.dev.disable_trigger_signal().unwrap();
    assert_eq!(b.dev.trigger_signal(), 0);
    assert!(b.signals.live().is_empty());
    assert!(!b.dev.service_interrupt().signalled);
    assert_eq!(b.signals.sent().len(), 2);

    // A new signal can be installed after removal
    b.dev.enable_trigger_signal(12).unwrap();
    assert!(b.dev.service_interrupt().signalled);
    assert_eq!(b.signals.sent(), vec![10, 10, 12]);
}

#[test]
fn test_failed_signal_removal_keeps_target() {
    let b = open_sim_device(triggered_split_config());
    b.dev.enable_trigger_signal(10).unwrap();

    b.signals.set_busy(true);
    assert!(matches!(
        b.dev.disable_trigger_signal(),
        Err(Error::Signal(_))
    ));
    // Driver and delivery layer still agree on the installed target
    assert_eq!(b.dev.trigger_signal(), 10);
    assert_eq!(b.signals.live(), vec![10]);
    assert!(matches!(
        b.dev.enable_trigger_signal(11),
        Err(Error::AlreadyInstalled(10))
    ));
    assert!(b.dev.service_interrupt().signalled);

    b.signals.set_busy(false);
    b.dev.disable_trigger_signal().unwrap();
    assert_eq!(b.dev.trigger_signal(), 0);
    assert!(b.signals.live().is_empty());
    assert!(matches!(
        b.dev.disable_trigger_signal(),
        Err(Error::NotInstalled)
    ));
}

#[test]
fn test_trigger_signal_via_status() {
    let b = open_sim_device(DriverConfig::default());
    b.dev
        .set_status(StatusCode::TriggerSignalSet, ch(0), 7)
        .unwrap();
    assert_eq!(
        b.dev.get_status(StatusCode::TriggerSignalSet, ch(0)).unwrap(),
        7
    );
    assert!(matches!(
        b.dev.set_status(StatusCode::TriggerSignalSet, ch(0), 8),
        Err(Error::AlreadyInstalled(7))
    ));
    b.dev
        .set_status(StatusCode::TriggerSignalClear, ch(0), 0)
        .unwrap();
    assert_eq!(
        b.dev.get_status(StatusCode::TriggerSignalSet, ch(0)).unwrap(),
        0
    );
    assert!(matches!(
        b.dev.set_status(StatusCode::TriggerSignalClear, ch(0), 0),
        Err(Error::NotInstalled)
    ));
}

#[test]
fn test_irq_count_reset() {
    let b = open_sim_device(DriverConfig::default());
    for _ in 0..5 {
        b.dev.service_interrupt();
    }
    assert_eq!(b.dev.get_status(StatusCode::IrqCount, ch(0)).unwrap(), 5);

    b.dev.set_status(StatusCode::IrqCount, ch(0), 0).unwrap();
    assert_eq!(b.dev.irq_count(), 0);
    b.dev.service_interrupt();
    assert_eq!(b.dev.irq_count(), 1);
}

#[test]
fn test_irq_enable_sets_ctrl3() {
    let b = open_sim_device(DriverConfig::default());
    assert!(!b.dev.irq_enabled());
    assert_eq!(b.module.ctrl(CTRL3), 0x00);

    b.dev.set_status(StatusCode::IrqEnable, ch(0), 1).unwrap();
    assert!(b.dev.irq_enabled());
    assert_eq!(b.module.ctrl(CTRL3) & 0x08, 0x08);
    assert_eq!(b.dev.get_status(StatusCode::IrqEnable, ch(0)).unwrap(), 1);

    b.dev.set_irq_enable(false);
    assert!(!b.dev.irq_enabled());
    assert_eq!(b.module.ctrl(CTRL3) & 0x08, 0x00);
}
