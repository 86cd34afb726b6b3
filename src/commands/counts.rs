use anyhow::Result;
use tracing::info;

use crate::cli::CountsArgs;
use crate::stats::CountsCache;
use crate::util::write_json_pretty;

pub fn run(args: CountsArgs) -> Result<()> {
    let data = super::load_resolved(&args.records, args.post_appointment, args.post_tenure)?;
    let mut cache = CountsCache::default();
    let counts = cache.counts(&data)?;

    info!(
        peer_reviewed_published = counts.peer_reviewed_published.total,
        articles = counts.articles.total,
        chapters = counts.chapters.total,
        proceedings = counts.proceedings.total,
        books = counts.books.total,
        presentations = counts.oral.total + counts.poster.total,
        awards = counts.awards.total,
        grants_awarded = counts.grants.awarded(),
        grants_pending = counts.grants.pending(),
        grants_rejected = counts.grants.rejected(),
        "counted records"
    );

    match args.out {
        Some(out) => {
            write_json_pretty(&out, counts)?;
            info!(path = %out.display(), "wrote counts");
        }
        None => println!("{}", serde_json::to_string_pretty(counts)?),
    }

    Ok(())
}
