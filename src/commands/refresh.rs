use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::citations::{self, RefreshFile};
use crate::cli::RefreshArgs;
use crate::model::CareerContext;
use crate::store::{self, RecordFile};
use crate::util::write_json_pretty;

pub fn run(args: RefreshArgs) -> Result<()> {
    let file = store::load(&args.records)?;
    let context = CareerContext {
        post_appointment: file.context.post_appointment || args.post_appointment,
        post_tenure: file.context.post_tenure || args.post_tenure,
    };
    let mut data = file.resolve(context)?;

    let raw = fs::read(&args.updates)
        .with_context(|| format!("failed to read updates file: {}", args.updates.display()))?;
    let updates: RefreshFile = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse updates file: {}", args.updates.display()))?;

    let summary = citations::apply_refresh(&mut data, &updates);
    info!(
        source = updates.source.as_str(),
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        unmatched = summary.unmatched,
        "refresh complete"
    );

    let out = args.out.unwrap_or(args.records);
    write_json_pretty(&out, &RecordFile::from_resolved(&data))?;
    info!(path = %out.display(), "wrote updated records");

    Ok(())
}
