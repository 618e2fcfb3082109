mod constants;

use anyhow::{bail, Context};
use blockdag_core::{BlockHash, DagConfig, InsertError, Ledger, SystemClock};
use clap::Parser;
use constants::{DEFAULT_BLOCKS_PER_WRITER, DEFAULT_MERGE_EVERY, DEFAULT_WRITERS};
use rand::{rngs::StdRng, seq::IteratorRandom, SeedableRng};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "blockdag-node")]
#[command(about = "Grow a block DAG with concurrent writers and validate it")]
struct Args {
    /// JSON config file (genesis timestamp/payload, parallel validation)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of concurrent writers
    #[arg(long, default_value_t = DEFAULT_WRITERS)]
    writers: usize,

    /// Blocks inserted by each writer
    #[arg(long, default_value_t = DEFAULT_BLOCKS_PER_WRITER)]
    blocks: usize,

    /// Every n-th block of a writer merges all current tips (0 = never)
    #[arg(long, default_value_t = DEFAULT_MERGE_EVERY)]
    merge_every: usize,

    /// Seed for tip selection; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Print every block as a JSON line when done
    #[arg(long)]
    dump: bool,
}

/// Insert `blocks` blocks, each on a random current tip, or on all tips for
/// every `merge_every`-th block. Returns the last hash written.
fn run_writer(
    ledger: &Ledger,
    writer: usize,
    blocks: usize,
    merge_every: usize,
    rng: &mut StdRng,
) -> Result<Option<BlockHash>, InsertError> {
    let mut last = None;
    for i in 1..=blocks {
        let payload = vec![format!("writer {writer} transaction {i}").into_bytes()];
        let hash = if merge_every > 0 && i % merge_every == 0 {
            ledger.append(payload)?
        } else {
            let tips = ledger.tips();
            let parent = tips
                .iter()
                .copied()
                .choose(&mut *rng)
                .unwrap_or_else(|| ledger.genesis());
            // `parent` may have gained children since `tips()` returned; it is still a valid parent.
            ledger.insert(payload, [parent])?
        };
        last = Some(hash);
    }
    Ok(last)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DagConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DagConfig::default(),
    };

    let ledger = Ledger::with_config(&config, Arc::new(SystemClock));
    info!(genesis = %ledger.genesis(), "blockdag initialised");

    let mut handles = Vec::with_capacity(args.writers);
    for writer in 0..args.writers {
        let ledger = ledger.clone();
        let (blocks, merge_every) = (args.blocks, args.merge_every);
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(writer as u64)),
            None => StdRng::from_entropy(),
        };
        handles.push(tokio::task::spawn_blocking(move || {
            run_writer(&ledger, writer, blocks, merge_every, &mut rng)
        }));
    }
    for (writer, handle) in handles.into_iter().enumerate() {
        let last = handle.await??;
        if let Some(hash) = last {
            info!(writer, last = %hash, "writer finished");
        }
    }

    let report = ledger.validate();
    let tips = ledger.tips();
    info!(
        blocks = report.blocks_checked(),
        tips = tips.len(),
        "dag built"
    );

    if args.dump {
        for block in ledger.all() {
            println!("{}", serde_json::to_string(&*block)?);
        }
    }

    println!("BlockDAG created and validated: {}", report.is_valid());
    if !report.is_valid() {
        for violation in report.violations() {
            warn!(%violation, "integrity violation");
        }
        bail!("validation found {} violation(s)", report.violations().len());
    }
    Ok(())
}
