//! Re-run reconciliation offline from the snapshots `vip-reconcile --snapshot`
//! writes, printing the partition and stats as JSON.
//!
//! Usage: replay <candidates.json> <owned.json> [--show-matches]

use anyhow::{Context, Result};
use clap::Parser;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

use vip_reconcile::config::{JsonFile, Store};
use vip_reconcile::logging::init_logging;
use vip_reconcile::models::{MatchOutcome, MatchTier, OwnedEntry, Reconciliation, Track};
use vip_reconcile::reconcile::{reconcile, OwnedIndex};

#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Reconcile saved VIP candidates against a saved cloud library")]
struct Args {
    /// Snapshot of VIP candidates (candidates.json)
    candidates: PathBuf,

    /// Snapshot of the cloud library (owned.json)
    owned: PathBuf,

    /// Include which owned entry each matched candidate hit, and by which tier
    #[arg(long)]
    show_matches: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct MatchDetail<'a> {
    candidate: &'a Track,
    tier: MatchTier,
    owned: &'a OwnedEntry,
}

#[derive(Serialize)]
struct ReplayOutput<'a> {
    #[serde(flatten)]
    result: &'a Reconciliation,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<MatchDetail<'a>>>,
}

fn load_snapshot<T: Serialize + DeserializeOwned>(path: &Path) -> Result<T> {
    JsonFile::<T>::new(path)
        .load()?
        .with_context(|| format!("Snapshot not found: {}", path.display()))
}

fn match_details<'a>(candidates: &'a [Track], owned: &'a [OwnedEntry]) -> Vec<MatchDetail<'a>> {
    let index = OwnedIndex::build(owned);
    candidates
        .iter()
        .filter_map(|candidate| match index.find_match(candidate) {
            MatchOutcome::Matched { tier, owned } => Some(MatchDetail { candidate, tier, owned }),
            MatchOutcome::Unmatched => None,
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let candidates: Vec<Track> = load_snapshot(&args.candidates)?;
    let owned: Vec<OwnedEntry> = load_snapshot(&args.owned)?;

    let result = reconcile(&candidates, &owned);
    result.stats.log_phase("replay");

    let output = ReplayOutput {
        result: &result,
        matches: args.show_matches.then(|| match_details(&candidates, &owned)),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
