use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::SummaryArgs;
use crate::model::Publication;
use crate::stats::{CountsCache, GrantTally, PeriodTally, PubStats, StageTally};
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
struct CitationTotals {
    web_of_science: u64,
    scopus: u64,
    google_scholar: u64,
    best_per_paper: u64,
}

/// The headline numbers of the dossier: counts per publication class,
/// citation totals, the bibliometric indices, and the service record.
#[derive(Debug, Serialize)]
struct SummaryReport {
    generated_at: String,

    peer_reviewed_published: StageTally,
    articles: StageTally,
    chapters: StageTally,
    proceedings: StageTally,
    proceedings_unreviewed: StageTally,
    books: StageTally,
    in_preparation: u32,

    research_publications: u32,
    teaching_publications: u32,
    primary_peer_reviewed: u32,
    primary_peer_reviewed_post_appointment: u32,

    citations: CitationTotals,
    indices: PubStats,

    oral_presentations: PeriodTally,
    posters: PeriodTally,
    awards: PeriodTally,
    student_awards: PeriodTally,
    grants: GrantTally,
}

pub fn run(args: SummaryArgs) -> Result<()> {
    let data = super::load_resolved(&args.records, args.post_appointment, args.post_tenure)?;
    let mut cache = CountsCache::default();
    let counts = cache.counts(&data)?;

    let published: Vec<Publication> = data
        .publications
        .iter()
        .filter(|entry| entry.is_peer_reviewed_published())
        .cloned()
        .collect();
    let indices = PubStats::compute(&published);

    let research_publications = data
        .publications
        .iter()
        .filter(|entry| entry.is_research() && entry.is_peer_reviewed_published())
        .count() as u32;

    let report = SummaryReport {
        generated_at: now_utc_string(),
        peer_reviewed_published: counts.peer_reviewed_published,
        articles: counts.articles,
        chapters: counts.chapters,
        proceedings: counts.proceedings,
        proceedings_unreviewed: counts.proceedings_unreviewed,
        books: counts.books,
        in_preparation: counts.articles_in_prep
            + counts.chapters_in_prep
            + counts.proceedings_in_prep
            + counts.proceedings_unreviewed_in_prep,
        research_publications,
        teaching_publications: counts.teaching_publications.total,
        primary_peer_reviewed: counts.primary_peer_reviewed,
        primary_peer_reviewed_post_appointment: counts.primary_peer_reviewed_post_appointment,
        citations: CitationTotals {
            web_of_science: counts.cites_wos,
            scopus: counts.cites_scopus,
            google_scholar: counts.cites_google,
            best_per_paper: counts.cites_best,
        },
        indices,
        oral_presentations: counts.oral,
        posters: counts.poster,
        awards: counts.awards,
        student_awards: counts.student_awards,
        grants: counts.grants,
    };

    info!(
        peer_reviewed_published = report.peer_reviewed_published.total,
        since_appointment = report.peer_reviewed_published.post_appointment,
        since_tenure = report.peer_reviewed_published.post_tenure,
        citations_best = report.citations.best_per_paper,
        h = report.indices.h,
        g = report.indices.g,
        i10 = report.indices.i10,
        "career summary"
    );

    match args.out {
        Some(out) => {
            write_json_pretty(&out, &report)?;
            info!(path = %out.display(), "wrote summary");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
