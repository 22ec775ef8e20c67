//! Address Tracker - replays reverse geocoding records through the address cache
//!
//! Reads newline-delimited Nominatim records from a file or stdin and prints
//! every street, neighborhood and city change as a JSON line.

mod error;

use crate::error::{Result, TrackerError};
use address_cache::{
    change_callback, create_address_cache_service, AddressCacheConfig, AddressCacheService,
    AddressEvent, ListenerResult, Observer, TrackedField,
};
use clap::Parser;
use nominatim_address::{NominatimStandardizer, RawAddress};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Track street, neighborhood and city changes across geocoding records
#[derive(Parser, Debug)]
#[command(name = "address-tracker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Newline-delimited JSON records; reads stdin when omitted
    input: Option<PathBuf>,

    /// Maximum number of cached addresses
    #[arg(long, env = "ADDRESS_CACHE_MAX_SIZE", default_value_t = 50)]
    max_size: usize,

    /// Cached address lifetime in milliseconds
    #[arg(long, env = "ADDRESS_CACHE_TTL_MS", default_value_t = 300_000)]
    ttl_ms: u64,

    /// Expired entry sweep period in milliseconds
    #[arg(long, env = "ADDRESS_CACHE_SWEEP_MS", default_value_t = 60_000)]
    sweep_ms: u64,
}

/// Counts `addressUpdated` events
#[derive(Default)]
struct UpdateCounter {
    updates: AtomicU64,
}

impl Observer<AddressEvent> for UpdateCounter {
    fn update(&self, _event: &AddressEvent) -> ListenerResult {
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("address_tracker=info".parse()?)
        .add_directive("address_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        max_size = config.max_size,
        ttl_ms = cli.ttl_ms,
        sweep_ms = cli.sweep_ms,
        "Starting address tracker"
    );

    let service = create_address_cache_service(config, Arc::new(NominatimStandardizer))?;
    register_callbacks(&service)?;

    let counter = Arc::new(UpdateCounter::default());
    service.subscribe(counter.clone())?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match cli.input {
        Some(ref path) => {
            info!(path = %path.display(), "Reading records from file");
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let processed = replay(&service, reader).await?;

    let stats = service.stats()?;
    info!(
        processed,
        updates = counter.updates.load(Ordering::Relaxed),
        computed = stats.computed,
        uncacheable = stats.uncacheable,
        cached = stats.cache.entries,
        hits = stats.cache.hits,
        misses = stats.cache.misses,
        evictions = stats.cache.evictions,
        hit_rate = stats.cache.hit_rate(),
        "Replay finished"
    );

    service.shutdown().await;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AddressCacheConfig> {
    let config = AddressCacheConfig {
        max_size: cli.max_size,
        expiration: Duration::from_millis(cli.ttl_ms),
        sweep_interval: Duration::from_millis(cli.sweep_ms),
    };
    config
        .validate()
        .map_err(|e| TrackerError::Config(e.to_string()))?;
    Ok(config)
}

/// Print each field change as one JSON line on stdout
fn register_callbacks(service: &AddressCacheService) -> Result<()> {
    for field in TrackedField::ALL {
        service.set_change_callback(
            field,
            Some(change_callback(|details| {
                println!("{}", serde_json::to_string(details)?);
                Ok(())
            })),
        )?;
    }
    Ok(())
}

/// Feed every record through the cache, returning how many were processed
async fn replay<R>(service: &AddressCacheService, reader: R) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0u64;
    let mut processed = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let Some(raw) = parse_record(&line, line_number) else {
            continue;
        };
        service.get_or_compute(&raw)?;
        processed += 1;
    }

    Ok(processed)
}

/// Parse one input line; blank and malformed lines yield `None`
fn parse_record(line: &str, line_number: u64) -> Option<RawAddress> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!(line = line_number, error = %e, "Skipping malformed record");
            None
        }
    }
}
