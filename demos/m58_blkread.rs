//! Configures and reads M58 channels blockwise on the simulated module.
//!
//! Usage: `cargo run --example m58_blkread -- [<opts>]`
//!
//! *   `-s=<size>`  block size in bytes (default 128)
//! *   `-b=<mode>`  block i/o mode: 0 user controlled, 1 current value,
//!     2 ring buffer, 3 ring buffer with overwrite (default 0)
//! *   `-<i>=<enb>` channel i block i/o: 0 disable (direction kept),
//!     1 enable and switch to input
//! *   `-e=<edge>`  trigger edge, 0 falling, 1 rising
//! *   `-m=<mode>`  data storage mode 0..7
//! *   `-t=<msec>`  block read timeout (0 = none)
//! *   `-l`         loop mode
//!
//! In the buffered modes a few simulated trigger edges are serviced before
//! each read, so the input buffer has something to hand out.

use log::{debug, warn};
use m58_dio::{
    sim::{self, SimBufferProvider, SimModule, SimSignals},
    BufferMode, BufferStat, Channel, Direction, DriverConfig, Error, PortMap, StatusCode,
    TriggerEdge, M58,
};

const EDGES_PER_READ: u8 = 3;
const LOOP_ROUNDS: usize = 5;

#[derive(Debug)]
struct Options {
    blk_size: usize,
    blk_mode: u32,
    buf_enable: [Option<bool>; 4],
    edge: Option<u32>,
    data_mode: Option<u32>,
    timeout_ms: u32,
    loop_mode: bool,
}

fn usage() {
    println!("Usage: m58_blkread [<opts>]");
    println!("Function: Configure and read M58 channels (blockwise)");
    println!("Options:");
    println!("    -s=<size>    block size                           [128]");
    println!("    -b=<mode>    block i/o mode                       [0]");
    println!("                 0 = user controlled");
    println!("                 1 = current value");
    println!("                 2 = ring buffer");
    println!("                 3 = ring buffer, overwrite");
    println!("    -<i>=<enb>   channel i buffering enable           [none]");
    println!("                 0 = disable block i/o, leave direction");
    println!("                 1 = enable  block i/o, set input direction");
    println!("    -e=<edge>    trigger edge                         [none]");
    println!("    -m=<mode>    data storage mode 0..7               [none]");
    println!("    -t=<msec>    block read timeout [msec] (0=none)   [0]");
    println!("    -l           loop mode");
    println!("\n{}", M58::ident());
}

fn parse_num(opt: &str, value: &str) -> Result<u32, Error> {
    value
        .parse()
        .map_err(|_| Error::IllegalParameter(format!("option {}: '{}'", opt, value)))
}

fn parse_args() -> Result<Option<Options>, Error> {
    let mut opts = Options {
        blk_size: 128,
        blk_mode: 0,
        buf_enable: [None; 4],
        edge: None,
        data_mode: None,
        timeout_ms: 0,
        loop_mode: false,
    };
    for arg in std::env::args().skip(1) {
        let Some((key, value)) = arg.split_once('=') else {
            if arg == "-l" {
                opts.loop_mode = true;
                continue;
            }
            return Ok(None);
        };
        match key {
            "-s" => opts.blk_size = parse_num(key, value)? as usize,
            "-b" => opts.blk_mode = parse_num(key, value)?,
            "-e" => opts.edge = Some(parse_num(key, value)?),
            "-m" => opts.data_mode = Some(parse_num(key, value)?),
            "-t" => opts.timeout_ms = parse_num(key, value)?,
            "-0" | "-1" | "-2" | "-3" => {
                let n = (key.as_bytes()[1] - b'0') as usize;
                opts.buf_enable[n] = Some(parse_num(key, value)? != 0);
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(opts))
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let Some(opts) = parse_args()? else {
        usage();
        return Ok(());
    };
    debug!("Options: {:?}", opts);
    let blk_mode = BufferMode::try_from(opts.blk_mode)?;

    let module = SimModule::new(PortMap::native());
    let mut config = DriverConfig::default();
    config.in_buf.size = opts.blk_size.max(256);
    let res = sim::resources(&module, &SimBufferProvider::new(), &SimSignals::new());
    let dev = M58::init(&config, res)?;
    let ch0 = Channel::new(0)?;

    dev.set_status(StatusCode::Buffer(BufferStat::Mode), ch0, blk_mode.into())?;
    dev.set_status(StatusCode::Buffer(BufferStat::Timeout), ch0, opts.timeout_ms)?;

    for ch in Channel::ALL {
        if let Some(enable) = opts.buf_enable[ch.number() as usize] {
            dev.set_buffering(ch, enable);
            if enable {
                dev.set_direction(ch, Direction::Input);
            }
        }
    }
    if let Some(edge) = opts.edge {
        dev.set_status(StatusCode::TriggerEdge, ch0, edge)?;
    }
    if let Some(mode) = opts.data_mode {
        dev.set_status(StatusCode::DataMode, ch0, mode)?;
    }
    dev.set_irq_enable(true);

    for ch in Channel::ALL {
        println!(
            "channel {}           : {:<7} block i/o {}",
            ch.number(),
            match dev.direction(ch) {
                Direction::Input => "INPUT,",
                Direction::Output => "OUTPUT,",
            },
            if dev.buffering(ch) { "ENABLED" } else { "DISABLED" }
        );
    }
    println!("block i/o mode      : {:?}", blk_mode);
    println!("block size          : {}", opts.blk_size);
    println!("block read timeout  : {} msec", opts.timeout_ms);
    println!(
        "trigger edge        : {}",
        match dev.trigger_edge() {
            TriggerEdge::Falling => "falling",
            TriggerEdge::Rising => "rising",
        }
    );
    println!("data storage mode   : {}\n", dev.data_mode().value());

    let mut blk = vec![0u8; opts.blk_size];
    let mut sample: u8 = 0;
    let rounds = if opts.loop_mode { LOOP_ROUNDS } else { 1 };
    for _ in 0..rounds {
        if blk_mode.is_buffered() {
            for _ in 0..EDGES_PER_READ {
                for ch in 0..4 {
                    module.set_pins(ch, sample.wrapping_add(ch));
                }
                sample = sample.wrapping_add(0x10);
                dev.service_interrupt();
            }
        }

        println!("read {} bytes ..", opts.blk_size);
        match dev.block_read(&mut blk) {
            Ok((n, mode)) => {
                println!("got {} bytes ({:?})", n, mode);
                for (i, line) in blk[..n].chunks(16).enumerate() {
                    println!("{:04x}: {:02x?}", i * 16, line);
                }
            }
            Err(e) => warn!("can't read block: {}", e),
        }
    }

    println!(
        "\n{} interrupts, {} bytes still buffered",
        dev.irq_count(),
        dev.get_status(StatusCode::Buffer(BufferStat::Level), ch0)?
    );
    dev.exit();
    Ok(())
}
