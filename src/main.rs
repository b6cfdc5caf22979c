use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use maja_pace::constants::{DEFAULT_DURATION_SECS, DEFAULT_PAYLOAD_SIZE, DEFAULT_RATE};
use maja_pace::{
    Endpoint, FloodError, FloodJob, FloodReport, FloodScheduler, PacketFactory, PayloadFactory,
    Progress, RawTcpTransport, StopFlag, SynSegmentFactory, Transport, UdpTransport,
};

#[derive(Debug, Parser)]
#[command(
    name = "maja-pace",
    about = "Rate-paced SYN and UDP packet generator for load-testing hosts you control"
)]
struct Args {
    /// IPv4 address of the host under test
    #[arg(short, long)]
    target: String,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Send TCP SYN segments over a raw socket (needs root or CAP_NET_RAW)
    Syn {
        port: u32,
        /// Seconds to run
        #[arg(default_value_t = DEFAULT_DURATION_SECS, allow_negative_numbers = true)]
        duration: i64,
        /// Packets per second
        #[arg(long, default_value_t = DEFAULT_RATE)]
        rate: u32,
    },
    /// Send fixed-size UDP datagrams
    Udp {
        port: u32,
        /// Seconds to run
        #[arg(default_value_t = DEFAULT_DURATION_SECS, allow_negative_numbers = true)]
        duration: i64,
        /// Packets per second
        #[arg(default_value_t = DEFAULT_RATE)]
        rate: u32,
        /// Payload bytes per datagram
        #[arg(long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
        size: usize,
    },
}

fn run(
    job: &FloodJob,
    factory: &mut dyn PacketFactory,
    transport: &mut dyn Transport,
    stop: StopFlag,
) -> Result<FloodReport, FloodError> {
    let mut scheduler = FloodScheduler::new().with_stop_flag(stop);
    scheduler.launch(job, factory, transport, |p: Progress| {
        info!(
            window = p.window,
            packets_sent = p.packets_sent,
            elapsed = ?p.elapsed,
            "progress"
        );
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let stop = StopFlag::new();
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.as_atomic())
        .context("installing SIGINT handler")?;

    let outcome = match args.mode {
        Mode::Syn {
            port,
            duration,
            rate,
        } => {
            let target = Endpoint::parse(&args.target, &port.to_string())?;
            let job = FloodJob::from_secs(target, duration, rate)?;
            info!(%target, duration, rate, "starting SYN run");
            run(
                &job,
                &mut SynSegmentFactory::new(),
                &mut RawTcpTransport::new(),
                stop,
            )
        }
        Mode::Udp {
            port,
            duration,
            rate,
            size,
        } => {
            let target = Endpoint::parse(&args.target, &port.to_string())?;
            let job = FloodJob::from_secs(target, duration, rate)?.with_payload_size(size)?;
            info!(%target, duration, rate, size, "starting UDP run");
            run(
                &job,
                &mut PayloadFactory::new(size),
                &mut UdpTransport::new(),
                stop,
            )
        }
    };

    match outcome {
        Ok(report) => {
            println!(
                "{:?}: {} packets in {} windows ({:.1?})",
                report.state, report.packets_sent, report.windows, report.elapsed
            );
            Ok(())
        }
        Err(e) => {
            error!(packets_sent = e.packets_sent(), "{e}");
            Err(e).context("run failed")
        }
    }
}
