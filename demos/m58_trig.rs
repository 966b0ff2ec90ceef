//! Waits for M58 trigger signals on the simulated module.
//!
//! Usage: `cargo run --example m58_trig -- [-e=<edge>] [-l]`
//!
//! *   `-e=0` falling edge, `-e=1` rising edge (default: leave as configured)
//! *   `-l` loop mode: keep servicing triggers for a few seconds
//!
//! A helper thread stands in for the trigger line and calls the interrupt
//! handler; the main thread reports every signal the driver sends.

use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use m58_dio::{
    sim::{self, SimBufferProvider, SimModule, SimSignals},
    Channel, DriverConfig, Error, PortMap, StatusCode, TriggerEdge, M58,
};

const SIG_USR1: u32 = 10;

fn usage() {
    println!("Usage: m58_trig [-e=<edge>] [-l]");
    println!("Function: Wait for M58 trigger signals");
    println!("Options:");
    println!("    -e=<edge>    trigger edge      [none]");
    println!("                 0 = falling");
    println!("                 1 = rising");
    println!("    -l           loop mode");
    println!("\n{}", M58::ident());
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut edge: Option<TriggerEdge> = None;
    let mut loop_mode = false;
    for arg in std::env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("-e=") {
            let raw: u32 = v.parse().map_err(|_| Error::IllegalParameter(format!("edge '{}'", v)))?;
            edge = Some(TriggerEdge::try_from(raw)?);
        } else if arg == "-l" {
            loop_mode = true;
        } else {
            usage();
            return Ok(());
        }
    }

    let module = SimModule::new(PortMap::native());
    let signals = SimSignals::new();
    let res = sim::resources(&module, &SimBufferProvider::new(), &signals);
    let dev = M58::init(&DriverConfig::default(), res)?;
    let ch0 = Channel::new(0)?;

    let edge = match edge {
        Some(e) => {
            dev.set_status(StatusCode::TriggerEdge, ch0, e.into())?;
            e
        }
        None => TriggerEdge::try_from(dev.get_status(StatusCode::TriggerEdge, ch0)?)?,
    };
    dev.set_status(StatusCode::IrqEnable, ch0, 1)?;
    dev.set_status(StatusCode::TriggerSignalSet, ch0, SIG_USR1)?;

    println!("installed signal : {}", SIG_USR1);
    println!(
        "trigger edge     : {}\n",
        if edge == TriggerEdge::Falling { "falling" } else { "rising" }
    );
    println!("wait for trigger signals ..");

    let run_for = if loop_mode {
        Duration::from_secs(3)
    } else {
        Duration::from_millis(10)
    };

    thread::scope(|s| {
        let dev = &dev;
        s.spawn(move || {
            let start = Instant::now();
            while start.elapsed() < run_for {
                if dev.irq_enabled() {
                    dev.service_interrupt();
                }
                thread::sleep(Duration::from_millis(250));
            }
        });

        let start = Instant::now();
        let mut seen = 0;
        while start.elapsed() < run_for + Duration::from_millis(50) {
            for sig in signals.sent().into_iter().skip(seen) {
                match sig {
                    SIG_USR1 => println!(">>> TRIGGER occurred"),
                    other => println!(">>> signal={} received", other),
                }
                seen += 1;
            }
            thread::sleep(Duration::from_millis(10));
        }
    });

    if let Err(e) = dev.set_status(StatusCode::TriggerSignalClear, ch0, 0) {
        error!("can't clear trigger signal: {}", e);
    }
    info!("{} interrupts serviced", dev.irq_count());
    dev.exit();
    Ok(())
}
