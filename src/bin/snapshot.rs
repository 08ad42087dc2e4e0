//! Snapshot Binary - holder rewards per stake address
//!
//! Fetches every unspent output holding a tracked policy, allocates the
//! reward pool across eligible holders and replaces the rewards table.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin discoflow-snapshot
//! cargo run --release --bin discoflow-snapshot -- --save          # also cache Kupo responses
//! cargo run --release --bin discoflow-snapshot -- --local --debug # replay cache with dumps
//! ```
//!
//! ## Environment Variables
//!
//! See `discoflow::config::RuntimeConfig`. `.env` is loaded if present.

use clap::Parser;
use discoflow::config::RuntimeConfig;
use discoflow::snapshot::{
    CardanoAddressDecoder, DebugDumper, KupoClient, PolicyCache, RewardSink, SnapshotConfig,
    SnapshotEngine, SnapshotSource, SqliteRewardSink,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "discoflow-snapshot", about = "Allocate holder rewards from a UTxO snapshot")]
struct Args {
    /// Verbose diagnostics and intermediate JSON dumps
    #[arg(long)]
    debug: bool,

    /// Read policy snapshots from the local cache instead of Kupo
    #[arg(long, conflicts_with = "save")]
    local: bool,

    /// Save fetched policy snapshots to the local cache
    #[arg(long)]
    save: bool,

    /// Compute and dump rewards without publishing
    #[arg(long)]
    dry_run: bool,

    /// JSON snapshot configuration replacing the built-in one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.debug { "discoflow=debug,info" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let runtime = RuntimeConfig::from_env(!args.local)?;
    let snapshot_config = match &args.config {
        Some(path) => SnapshotConfig::from_file(path)?,
        None => SnapshotConfig::default(),
    };

    log::info!("📊 Configuration:");
    for class in &snapshot_config.asset_classes {
        log::info!(
            "   ├─ {} ({}) ratio {}",
            class.display_name,
            class.policy_id,
            class.reward_ratio
        );
    }
    log::info!("   ├─ Reward pool: {}", snapshot_config.reward_pool);
    log::info!("   ├─ Excluded addresses: {}", snapshot_config.excluded_addresses.len());
    log::info!("   └─ Sink: {} (table {})", runtime.db_path, runtime.rewards_table);

    let cache = PolicyCache::new(&runtime.policy_cache_dir);
    let source: Box<dyn SnapshotSource> = if args.local {
        log::info!("📂 Reading policy snapshots from {}", runtime.policy_cache_dir);
        Box::new(cache)
    } else {
        let url = runtime
            .kupo_url
            .as_deref()
            .ok_or("KUPO_URL must be set when not running with --local")?;
        let client = KupoClient::new(url, runtime.dmtr_api_key.clone(), runtime.indexer_timeout)?;
        if args.save {
            log::info!("💾 Saving policy snapshots to {}", runtime.policy_cache_dir);
            Box::new(client.save_to(cache))
        } else {
            Box::new(client)
        }
    };

    let engine = SnapshotEngine::new(snapshot_config, source, Box::new(CardanoAddressDecoder::new()))?
        .verbose(args.debug)
        .with_dumper(DebugDumper::new(&runtime.debug_dir));

    let report = if args.dry_run {
        engine.run(None).await?
    } else {
        let sink = SqliteRewardSink::new(&runtime.db_path)?;
        let sink: &dyn RewardSink = &sink;
        engine.run(Some((sink, runtime.rewards_table.as_str()))).await?
    };

    let distributed: f64 = report.rows.iter().map(|r| r.reward).sum();
    log::info!(
        "🏁 {} stake addresses, {:.1} distributed of {}",
        report.rows.len(),
        distributed,
        engine.config().reward_pool
    );

    Ok(())
}
