//! BizSync offline merge tool
//!
//! Merges entity blobs exported from several devices into one converged
//! copy per entity, without a sync server.
//!
//! Usage:
//!   bizsync-merge --kind employee laptop.jsonl phone.jsonl > merged.jsonl
//!
//! Every input line is a `to_crdt_json` blob. Rejected blobs are logged and
//! make the exit status non-zero; the rest are still merged and written.

use anyhow::{Context, Result, bail};
use bizsync_merge::{EntityKind, OutputFormat, run};
use bizsync_types::NodeId;
use clap::Parser;
use std::{fs, path::PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "bizsync-merge")]
#[command(about = "Merge persisted BizSync entity blobs")]
struct Args {
    /// Entity kind stored in the input files
    #[arg(short, long, value_enum)]
    kind: EntityKind,

    /// Node id that adopts the merged entities (generated if omitted)
    #[arg(short, long, env = "BIZSYNC_NODE_ID")]
    node_id: Option<String>,

    /// Print flattened values instead of CRDT blobs
    #[arg(long)]
    flat: bool,

    /// Write merged entities to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Blob files, one blob per line
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let node = match &args.node_id {
        Some(raw) => NodeId::parse(raw).context("Invalid --node-id")?,
        None => NodeId::generate(),
    };
    info!("Merging as node {}", node);

    let format = if args.flat { OutputFormat::Flat } else { OutputFormat::Crdt };
    let outcome = run(args.kind, &args.files, &node, format)?;

    let mut rendered = outcome.lines.join("\n");
    if !rendered.is_empty() {
        rendered.push('\n');
    }
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }

    info!(
        "{} blob(s) read: {} merged, {} new, {} rejected",
        outcome.blobs_read,
        outcome.report.merged.len(),
        outcome.report.inserted.len(),
        outcome.report.failed.len()
    );
    for failure in &outcome.report.failed {
        warn!("Blob #{} rejected: {}", failure.index, failure.reason);
    }
    if !outcome.report.is_clean() {
        bail!("{} blob(s) could not be merged", outcome.report.failed.len());
    }
    Ok(())
}
