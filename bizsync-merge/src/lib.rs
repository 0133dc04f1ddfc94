//! Merges persisted BizSync entity blobs offline.
//!
//! Each input file holds one `to_crdt_json` blob per line, as written by a
//! device's persistence layer. All blobs of one entity kind are merged by id
//! and the converged entities are rendered one per line.

use anyhow::{Context, Result};
use bizsync_model::{CrdtModel, Employee, MergeReport, PayrollRecord, merge_batch_json};
use bizsync_types::{EntityId, NodeId};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Entity kinds the tool can merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Employee,
    Payroll,
}

/// How converged entities are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Full-fidelity blobs, suitable for writing back to storage.
    #[default]
    Crdt,
    /// Flattened plain values.
    Flat,
}

/// Result of one merge run.
#[derive(Debug)]
pub struct MergeOutcome {
    /// One rendered entity per line, ordered by id.
    pub lines: Vec<String>,
    pub report: MergeReport,
    /// Input blob count, across all files.
    pub blobs_read: usize,
}

/// Reads every non-empty line of `path` as a blob.
pub fn read_blobs(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read blob file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Merges all blobs in `paths` as entities of type `M`.
///
/// The converged entities are re-homed on `node` before rendering, as a
/// replica adopting them would do. Blobs that fail to decode or merge are
/// reported, not fatal.
pub fn merge_files<M: CrdtModel>(
    paths: &[PathBuf],
    node: &NodeId,
    format: OutputFormat,
) -> Result<MergeOutcome> {
    let mut blobs = Vec::new();
    for path in paths {
        let from_file = read_blobs(path)?;
        debug!("Read {} blob(s) from {}", from_file.len(), path.display());
        blobs.extend(from_file);
    }

    let mut entities: BTreeMap<EntityId, M> = BTreeMap::new();
    let report = merge_batch_json(&mut entities, &blobs);
    info!(
        "Merged {} blob(s) into {} {} entit{}",
        blobs.len(),
        entities.len(),
        M::ENTITY_TYPE,
        if entities.len() == 1 { "y" } else { "ies" }
    );

    let mut lines = Vec::with_capacity(entities.len());
    for entity in entities.values_mut() {
        entity.rebind(node);
        let line = match format {
            OutputFormat::Crdt => entity
                .to_crdt_json()
                .with_context(|| format!("Failed to serialize {}", entity.id()))?,
            OutputFormat::Flat => serde_json::to_string(&entity.to_json())?,
        };
        lines.push(line);
    }

    Ok(MergeOutcome {
        lines,
        report,
        blobs_read: blobs.len(),
    })
}

/// Dispatches [`merge_files`] on the entity kind chosen at runtime.
pub fn run(
    kind: EntityKind,
    paths: &[PathBuf],
    node: &NodeId,
    format: OutputFormat,
) -> Result<MergeOutcome> {
    match kind {
        EntityKind::Employee => merge_files::<Employee>(paths, node, format),
        EntityKind::Payroll => merge_files::<PayrollRecord>(paths, node, format),
    }
}
