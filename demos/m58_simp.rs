//! Simple M58 usage on the simulated module.
//!
//! Channels 0+1 are inputs latched on the trigger edge and read as one
//! block; channels 2+3 are outputs written one at a time.

use m58_dio::{
    sim::{self, SimBufferProvider, SimModule, SimSignals},
    Channel, DataMode, Direction, DriverConfig, Result, M58,
};

fn main() -> Result<()> {
    env_logger::init();

    let module = SimModule::new(m58_dio::PortMap::native());
    module.set_pins(0, 0xC3);
    module.set_pins(1, 0x5A);

    println!("Opening {} (simulated module)...", M58::ident());
    let res = sim::resources(&module, &SimBufferProvider::new(), &SimSignals::new());
    let dev = M58::init(&DriverConfig::default(), res)?;

    for n in 0..4 {
        let ch = Channel::new(n)?;
        if n < 2 {
            dev.set_direction(ch, Direction::Input);
            dev.set_buffering(ch, true);
        } else {
            dev.set_direction(ch, Direction::Output);
        }
    }
    dev.set_data_mode(DataMode::new(5)?);
    dev.set_irq_enable(true);

    println!("\nchannels 0+1: block read ({} bytes) ..", dev.read_size());
    let mut blk = [0u8; 2];
    match dev.block_read(&mut blk) {
        Ok((n, _)) => println!("read data: {:02X?}", &blk[..n]),
        Err(e) => eprintln!("*** can't block read: {}", e),
    }

    let mut value: u8 = 0x22;
    for n in 2..4 {
        let ch = Channel::new(n)?;
        println!("\nchannel {}: write 0x{:02X} = {:08b}", ch, value, value);
        match dev.write_channel(ch, value) {
            Ok(()) => println!("success."),
            Err(e) => eprintln!("*** can't write: {}", e),
        }
        value <<= 1;
    }

    println!("\nclose device");
    dev.exit();
    Ok(())
}
