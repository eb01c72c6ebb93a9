//! FlashTTL - Demo Runner
//!
//! Writes a batch of keys through the TTL layer, lets part of them expire on a
//! manual clock, and reports what the sync and async read paths see.

use bytes::Bytes;
use flashttl::state::MemoryState;
use flashttl::ttl::{
    AsyncTtlMapState, ManualClock, TimeProvider, TimestampedValue, TtlConfig, TtlContext,
    TtlMapState,
};
use futures::future;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Demo configuration
struct Config {
    /// Time-to-live of every entry
    ttl: Duration,
    /// Number of keys written per batch
    keys: usize,
    /// Entries per async page
    page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(1000),
            keys: 8,
            page_size: 4,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--ttl-ms" | "-t" => {
                    config.ttl = Duration::from_millis(parse_value(&args, i, "--ttl-ms"));
                    i += 2;
                }
                "--keys" | "-k" => {
                    config.keys = parse_value(&args, i, "--keys");
                    i += 2;
                }
                "--page-size" | "-p" => {
                    config.page_size = parse_value(&args, i, "--page-size");
                    i += 2;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlashTTL version {}", flashttl::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

/// Parses the value following the flag at `i`, exiting on a missing or bad value.
fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i + 1).map(|raw| raw.parse()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            eprintln!("Error: invalid value for {}", flag);
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
FlashTTL - Time-To-Live for Key-Value State

USAGE:
    flashttl [OPTIONS]

OPTIONS:
    -t, --ttl-ms <MS>         Time-to-live of every entry (default: 1000)
    -k, --keys <N>            Keys written per batch (default: 8)
    -p, --page-size <N>       Entries per async page (default: 4)
    -v, --version             Print version information
    -h, --help                Print this help message
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let clock = ManualClock::new(0);
    let ctx = TtlContext::new(TtlConfig::new(config.ttl), clock.clone());
    let store: MemoryState<Bytes, TimestampedValue<Bytes>> =
        MemoryState::new().with_page_size(config.page_size);

    let mut state = TtlMapState::new(store.clone(), ctx.clone());
    let async_state = AsyncTtlMapState::new(store.clone(), ctx);
    let ttl_ms = config.ttl.as_millis() as u64;

    // First batch at t=0
    state.put_all((0..config.keys).map(|i| {
        (
            Bytes::from(format!("old:{}", i)),
            Some(Bytes::from(format!("value:{}", i))),
        )
    }))?;

    // Second batch halfway through the first batch's lifetime
    clock.set(ttl_ms / 2);
    async_state
        .async_put_all((0..config.keys).map(|i| {
            (
                Bytes::from(format!("new:{}", i)),
                Some(Bytes::from(format!("value:{}", i))),
            )
        }))
        .await?;
    async_state
        .async_put(Bytes::from_static(b"new:null"), None)
        .await?;

    // First batch is now expired, second batch is still live
    clock.set(ttl_ms);
    info!(
        now = clock.now(),
        stored = store.len()?,
        "first batch expired"
    );

    let live = state.keys()?.collect::<flashttl::Result<Vec<_>>>()?;
    info!(live = live.len(), "sync iteration");

    {
        let mut entries = state.entries()?;
        if entries.has_next()? {
            let (key, _) = entries.next_item()?;
            entries.remove_current()?;
            info!(key = ?key, "removed first live entry during iteration");
        }
    }

    let values = async_state
        .async_values()
        .await?
        .on_next(|value| future::ready(Ok(value.map(|v| v.len()).unwrap_or(0))))
        .await?;
    info!(
        live = values.len(),
        bytes = values.iter().sum::<usize>(),
        "async paged iteration"
    );

    info!(
        sync_empty = state.is_empty()?,
        async_empty = async_state.async_is_empty().await?,
        "emptiness checks"
    );

    clock.set(ttl_ms.saturating_mul(2));
    info!(
        sync_empty = state.is_empty()?,
        async_empty = async_state.async_is_empty().await?,
        stored = store.len()?,
        "everything expired, nothing deleted"
    );

    info!("Stats: {:?}", store.stats()?);
    Ok(())
}
