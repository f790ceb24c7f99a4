use std::time::{Duration, Instant};

use clap::Parser;
use eyeballs::{AddressFamily, DialConfig};

type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dial a dual-stack host and report which address family won.
#[derive(Parser, Debug)]
struct Cli {
    /// Host name or IP address to connect to.
    host: String,

    /// TCP port to connect to.
    #[clap(default_value_t = 80)]
    port: u16,

    /// How long to keep waiting for the preferred family's answer once the
    /// other family has resolved, in milliseconds.
    #[clap(long, default_value_t = 50, env = "EYEBALLS_RESOLUTION_DELAY_MS")]
    resolution_delay_ms: u64,

    /// Spacing between successive connection attempts, in milliseconds.
    #[clap(long, default_value_t = 250, env = "EYEBALLS_ATTEMPT_DELAY_MS")]
    attempt_delay_ms: u64,

    /// Address family to try first.
    #[clap(long, value_enum, default_value_t = AddressFamily::Ipv6)]
    prefer: AddressFamily,

    /// Give up on the whole dial after this many milliseconds.
    #[clap(long)]
    timeout_ms: Option<u64>,
}

async fn run(cli: Cli) -> Result<(), DynError> {
    let mut config = DialConfig::default();
    config
        .resolution_delay(Duration::from_millis(cli.resolution_delay_ms))
        .connection_attempt_delay(Duration::from_millis(cli.attempt_delay_ms))
        .preferred_family(cli.prefer);
    if let Some(ms) = cli.timeout_ms {
        config.overall_timeout(Duration::from_millis(ms));
    }

    let started = Instant::now();
    let stream = eyeballs::connect(&cli.host, cli.port, config).await?;
    let peer = stream.peer_addr()?;
    println!(
        "connected to {} ({}) in {:?}",
        peer,
        AddressFamily::of(&peer.ip()),
        started.elapsed()
    );
    Ok(())
}

fn main() -> Result<(), DynError> {
    eyeballs::config::set_logger(None);
    let cli = Cli::parse();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(cli))
}
