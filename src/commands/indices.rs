use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::IndicesArgs;
use crate::model::{PubStatus, Publication};
use crate::stats::PubStats;
use crate::util::write_json_pretty;

#[derive(Debug, Serialize)]
struct IndicesReport {
    max_status: PubStatus,
    publications: usize,
    #[serde(flatten)]
    indices: PubStats,
}

pub fn run(args: IndicesArgs) -> Result<()> {
    let data = super::load_resolved(&args.records, args.post_appointment, args.post_tenure)?;
    let ceiling = args.max_status.as_status();

    let considered: Vec<Publication> = data
        .publications
        .iter()
        .filter(|entry| entry.peer_reviewed && entry.status <= ceiling)
        .cloned()
        .collect();

    let indices = PubStats::compute(&considered);
    info!(
        publications = considered.len(),
        h = indices.h,
        g = indices.g,
        m = indices.m,
        i10 = indices.i10,
        o = indices.o,
        "computed bibliometric indices"
    );

    let report = IndicesReport {
        max_status: ceiling,
        publications: considered.len(),
        indices,
    };

    match args.out {
        Some(out) => {
            write_json_pretty(&out, &report)?;
            info!(path = %out.display(), "wrote indices");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
