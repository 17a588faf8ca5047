//! The command-line wrapper (§4.4/§6): loads `~/.ale/` configuration,
//! runs the station in text mode (no real modem/radio — those are
//! explicitly out of scope, §1), and accepts `call`/`send`/`quit` lines
//! on stdin.

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing::{info, warn};

use ale_rs::address::Address;
use ale_rs::config::{load_config, load_lqa_history, load_or_init_scanlists, Paths};
use ale_rs::log::init_tracing;
use ale_rs::modem::NullModem;
use ale_rs::radio::NullRadio;
use ale_rs::station::Station;
use ale_rs::clock::SystemClock;

#[derive(Parser)]
#[command(name = "aled")]
#[command(about = "Runs an ALE station in text mode", long_about = None)]
struct Args {
    /// Alternate config directory, defaults to `~/.ale`.
    #[arg(long)]
    config_dir: Option<std::path::PathBuf>,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let paths = match args.config_dir {
        Some(dir) => Paths::at(dir),
        None => Paths::default_dir().unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        }),
    };

    let config = load_config(&paths).unwrap_or_else(|e| {
        eprintln!("failed to load {:?}: {e}", paths.config);
        std::process::exit(1);
    });
    let scanlists = load_or_init_scanlists(&paths);
    let lqa_entries = load_lqa_history(&paths);
    ale_rs::config::reset_log(&paths).ok();

    let mut station = Station::new(
        config,
        paths,
        scanlists,
        lqa_entries,
        Box::new(SystemClock),
        Box::new(NullModem::new(300)),
        Box::new(NullRadio::default()),
    )
    .unwrap_or_else(|e| {
        eprintln!("failed to start station: {e}");
        std::process::exit(1);
    });

    station.set_on_incoming_call(|origin| info!("incoming call from {origin}"));
    station.set_on_connected(|peer| info!("connected to {peer}"));
    station.set_on_disconnected(|peer, duration| info!("disconnected from {peer} after {duration}s"));
    station.set_on_receive(|raw| info!("received {} bytes", raw.len()));

    let (handle, join) = ale_rs::scheduler::spawn(station);

    println!("aled running. commands: call <address>, send <text>, quit");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut parts = line.trim().splitn(2, ' ');
        match (parts.next(), parts.next()) {
            (Some("call"), Some(address)) => match Address::new(address.as_bytes().to_vec()) {
                Ok(address) => handle.call(address),
                Err(e) => warn!("{e}"),
            },
            (Some("send"), Some(text)) => handle.send(text.as_bytes().to_vec(), false),
            (Some("quit"), _) => {
                handle.stop();
                break;
            }
            _ => {
                io::stdout().flush().ok();
                println!("commands: call <address>, send <text>, quit");
            }
        }
    }

    handle.stop();
    let _ = join.join();
}
