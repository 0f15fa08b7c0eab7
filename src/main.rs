use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::{error, info, LevelFilter};

use packet_sniffer::capture::{run_session, EndReason, StopFlag};
use packet_sniffer::config::{CaptureConfig, DEFAULT_SNAPLEN, DEFAULT_TIMEOUT_MS};
use packet_sniffer::sink::Output;
use packet_sniffer::Zone;

/// Capture packets and log one block per packet with its direction
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["interface", "read"])))]
struct Args {
    /// Interface to capture on (repeat for several interfaces)
    #[arg(short, long)]
    interface: Vec<String>,

    /// Replay a pcap savefile instead of capturing live
    #[arg(short, long, value_name = "FILE")]
    read: Option<PathBuf>,

    /// Append packet blocks to this file as well as printing them
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Do not put the interface in promiscuous mode
    #[arg(long)]
    no_promisc: bool,

    /// Bytes captured per frame
    #[arg(short, long, default_value_t = DEFAULT_SNAPLEN)]
    snaplen: i32,

    /// Read timeout; bounds how long a stop request waits on an idle link
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: i32,

    /// Address to treat as local (repeatable)
    #[arg(short, long, value_name = "ADDR")]
    local_addr: Vec<Ipv4Addr>,

    /// Print timestamps in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// More diagnostics on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> CaptureConfig {
        CaptureConfig {
            interfaces: self.interface.clone(),
            savefile: self.read.clone(),
            output: self.output.clone(),
            promiscuous: !self.no_promisc,
            snaplen: self.snaplen,
            timeout_ms: self.timeout_ms,
            local_addrs: self.local_addr.clone(),
            zone: if self.utc { Zone::Utc } else { Zone::Local },
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn sniff(config: &CaptureConfig) -> Result<()> {
    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.stop()).context("installing the interrupt handler")?;

    let mut output = Output::console();
    if let Some(ref path) = config.output {
        output = output
            .with_log_file(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    let summaries = run_session(config, output.shared(), &stop).context("capture failed")?;
    let frames: u64 = summaries.iter().map(|s| s.frames).sum();
    if summaries.iter().any(|s| s.end == EndReason::Stopped) {
        info!("stopped after {} frames", frames);
    } else {
        info!("end of capture after {} frames", frames);
    }
    Ok(())
}

/// Report the outcome of a session on stderr and return the process status
fn exit_status(res: Result<()>) -> u8 {
    match res {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.verbose);
    ExitCode::from(exit_status(sniff(&args.config())))
}
