use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{CiteSource, CvData, Publication};

/// Freshly fetched citation data for one publication from one source.
/// An empty year list means the source reports totals only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CitationUpdate {
    pub count: u32,
    #[serde(default)]
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    Updated { previous: u32, current: u32 },
}

/// Reconciles a publication's stored citation data for one source against
/// freshly fetched values.
///
/// The year-by-year comparison walks the fetched window most-recent-first.
/// The oldest year of the window keeps the stored count when it exceeds
/// the fetched one: a fetch window cut off on the left would otherwise
/// shrink the citation history. Every other mismatch takes the fetched
/// value. The stored count is recomputed from the merged year list so the
/// two stay consistent.
pub fn reconcile(
    entry: &mut Publication,
    source: CiteSource,
    update: &CitationUpdate,
) -> ReconcileOutcome {
    let old_count = entry.cites(source);
    let old_years = entry.cite_years(source).to_vec();

    // A count-only source can never confirm the year list, so an equal
    // count alone makes its refresh a no-op.
    if update.count == old_count && (update.years.is_empty() || update.years.len() == old_years.len())
    {
        return ReconcileOutcome::Unchanged;
    }

    warn!(
        entry = %entry.identity(),
        source = source.as_str(),
        previous = old_count,
        fetched = update.count,
        "stale citation count"
    );

    if update.years.is_empty() {
        // Count-only source: replace the total, keep the year history.
        entry.set_cite_count(source, update.count);
        if !old_years.is_empty() && old_years.len() != update.count as usize {
            warn!(
                entry = %entry.identity(),
                source = source.as_str(),
                count = update.count,
                year_entries = old_years.len(),
                "citation count no longer matches stored year list"
            );
        }
        return ReconcileOutcome::Updated {
            previous: old_count,
            current: update.count,
        };
    }

    let min_year = update.years.iter().copied().min().unwrap_or(0);
    let max_year = update.years.iter().copied().max().unwrap_or(0);

    let mut merged = Vec::with_capacity(update.years.len());
    for year in (min_year..=max_year).rev() {
        let stored = count_in(&old_years, year);
        let fetched = count_in(&update.years, year);

        let kept = if year == min_year && stored > fetched {
            // Left-truncated fetch window; the stored history wins here.
            stored
        } else {
            if stored != fetched {
                warn!(
                    entry = %entry.identity(),
                    source = source.as_str(),
                    year,
                    previous = stored,
                    fetched,
                    "citation-year count changed"
                );
            }
            fetched
        };
        merged.extend(std::iter::repeat(year).take(kept));
    }

    let current = merged.len() as u32;
    if current != update.count {
        warn!(
            entry = %entry.identity(),
            source = source.as_str(),
            fetched_count = update.count,
            merged_count = current,
            "fetched count disagrees with merged year list"
        );
    }
    entry.set_cites(source, current, merged);

    ReconcileOutcome::Updated {
        previous: old_count,
        current,
    }
}

fn count_in(years: &[i32], year: i32) -> usize {
    years.iter().filter(|&&entry| entry == year).count()
}

/// A batch of fetched citation results for one source, as produced by an
/// external fetch step and fed to `vitae refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshFile {
    pub source: CiteSource,
    pub entries: Vec<RefreshEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshEntry {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub years: Vec<i32>,
}

impl RefreshEntry {
    fn identity(&self) -> &str {
        self.key
            .as_deref()
            .or(self.doi.as_deref())
            .unwrap_or("<unidentified>")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub unmatched: usize,
}

/// Applies a fetched batch against the record collection. A malformed or
/// unmatched entry is warned about and skipped; one bad record never
/// aborts the rest of the refresh.
pub fn apply_refresh(data: &mut CvData, file: &RefreshFile) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    for fetched in &file.entries {
        if fetched.key.is_none() && fetched.doi.is_none() {
            warn!(
                source = file.source.as_str(),
                "fetched entry has no key or doi; skipping"
            );
            summary.skipped += 1;
            continue;
        }

        let Some(count) = fetched.count else {
            warn!(
                entry = fetched.identity(),
                source = file.source.as_str(),
                "fetched entry has no citation count; skipping"
            );
            summary.skipped += 1;
            continue;
        };

        let Some(publication) = find_publication(data, fetched) else {
            warn!(
                entry = fetched.identity(),
                source = file.source.as_str(),
                "no publication matches fetched entry"
            );
            summary.unmatched += 1;
            continue;
        };

        let update = CitationUpdate {
            count,
            years: fetched.years.clone(),
        };
        match reconcile(publication, file.source, &update) {
            ReconcileOutcome::Unchanged => summary.unchanged += 1,
            ReconcileOutcome::Updated { previous, current } => {
                info!(
                    entry = fetched.identity(),
                    source = file.source.as_str(),
                    previous,
                    current,
                    "citation data refreshed"
                );
                summary.updated += 1;
            }
        }
    }

    summary
}

fn find_publication<'a>(data: &'a mut CvData, fetched: &RefreshEntry) -> Option<&'a mut Publication> {
    data.publications.iter_mut().find(|entry| {
        (fetched.key.is_some() && entry.key == fetched.key)
            || (fetched.doi.is_some() && entry.doi == fetched.doi)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CareerContext, PubKind, PubStatus};

    fn publication(key: &str, scopus_count: u32, scopus_years: Vec<i32>) -> Publication {
        Publication {
            key: Some(key.to_string()),
            doi: Some(format!("10.1000/{key}")),
            title: None,
            year: 2018,
            kind: PubKind::JournalArticle,
            status: PubStatus::Published,
            peer_reviewed: true,
            teaching: false,
            primary: false,
            post_appointment: false,
            post_tenure: false,
            ncites_wos: 0,
            ncites_scopus: scopus_count,
            ncites_google: 0,
            cite_years_wos: Vec::new(),
            cite_years_scopus: scopus_years,
            cite_years_google: Vec::new(),
        }
    }

    #[test]
    fn reconciling_identical_data_is_a_no_op() {
        let mut entry = publication("smith2018", 3, vec![2021, 2020, 2020]);
        let before = entry.clone();
        let update = CitationUpdate {
            count: 3,
            years: vec![2021, 2020, 2020],
        };

        let outcome = reconcile(&mut entry, CiteSource::Scopus, &update);
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(entry, before);
    }

    #[test]
    fn stale_count_replaces_count_and_year_list() {
        let mut entry = publication("smith2018", 10, vec![2020; 10]);
        let mut years = vec![2021];
        years.extend(vec![2020; 10]);
        years.push(2019);
        let update = CitationUpdate { count: 12, years };

        let outcome = reconcile(&mut entry, CiteSource::Scopus, &update);
        assert_eq!(
            outcome,
            ReconcileOutcome::Updated {
                previous: 10,
                current: 12
            }
        );
        assert_eq!(entry.ncites_scopus, 12);
        assert_eq!(entry.cite_years_scopus.len(), 12);
        assert_eq!(entry.cite_years_scopus[0], 2021);
        assert_eq!(*entry.cite_years_scopus.last().unwrap(), 2019);
    }

    #[test]
    fn oldest_window_year_keeps_stored_count_when_larger() {
        // Stored: one cite in 2020, three in 2019. Fetch window starts at
        // 2019 and reports only one there; assume left truncation.
        let mut entry = publication("smith2018", 4, vec![2020, 2019, 2019, 2019]);
        let update = CitationUpdate {
            count: 3,
            years: vec![2020, 2020, 2019],
        };

        let outcome = reconcile(&mut entry, CiteSource::Scopus, &update);
        assert_eq!(
            outcome,
            ReconcileOutcome::Updated {
                previous: 4,
                current: 5
            }
        );
        assert_eq!(entry.cite_years_scopus, vec![2020, 2020, 2019, 2019, 2019]);
        assert_eq!(entry.ncites_scopus, 5);
    }

    #[test]
    fn newest_year_always_takes_fetched_value() {
        // Only the oldest year of the window is protected; a shrunken
        // count in the newest year is accepted as-is.
        let mut entry = publication("smith2018", 3, vec![2021, 2021, 2021]);
        let update = CitationUpdate {
            count: 2,
            years: vec![2021, 2020],
        };

        reconcile(&mut entry, CiteSource::Scopus, &update);
        assert_eq!(entry.cite_years_scopus, vec![2021, 2020]);
        assert_eq!(entry.ncites_scopus, 2);
    }

    #[test]
    fn identical_count_only_update_is_a_no_op() {
        // The provider reports totals only; a matching count must not be
        // flagged stale just because the stored year history is longer.
        let mut entry = publication("smith2018", 5, vec![2020; 5]);
        let before = entry.clone();
        let update = CitationUpdate {
            count: 5,
            years: Vec::new(),
        };

        let outcome = reconcile(&mut entry, CiteSource::Scopus, &update);
        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(entry, before);
    }

    #[test]
    fn count_only_update_keeps_year_history() {
        let mut entry = publication("smith2018", 5, vec![2020; 5]);
        let update = CitationUpdate {
            count: 7,
            years: Vec::new(),
        };

        let outcome = reconcile(&mut entry, CiteSource::GoogleScholar, &update);
        assert_eq!(
            outcome,
            ReconcileOutcome::Updated {
                previous: 0,
                current: 7
            }
        );
        assert_eq!(entry.ncites_google, 7);
        assert_eq!(entry.cite_years_scopus, vec![2020; 5]);
    }

    #[test]
    fn refresh_skips_bad_entries_and_continues() {
        let mut data = CvData {
            context: CareerContext::default(),
            publications: vec![
                publication("smith2018", 2, vec![2020, 2019]),
                publication("jones2019", 0, Vec::new()),
            ],
            presentations: Vec::new(),
            grants: Vec::new(),
            awards: Vec::new(),
        };

        let file = RefreshFile {
            source: CiteSource::Scopus,
            entries: vec![
                // No identity at all.
                RefreshEntry {
                    key: None,
                    doi: None,
                    count: Some(4),
                    years: Vec::new(),
                },
                // Missing count.
                RefreshEntry {
                    key: Some("smith2018".to_string()),
                    doi: None,
                    count: None,
                    years: vec![2021],
                },
                // Matches nothing.
                RefreshEntry {
                    key: Some("nobody2020".to_string()),
                    doi: None,
                    count: Some(1),
                    years: vec![2021],
                },
                // Valid update.
                RefreshEntry {
                    key: Some("jones2019".to_string()),
                    doi: None,
                    count: Some(2),
                    years: vec![2021, 2021],
                },
            ],
        };

        let summary = apply_refresh(&mut data, &file);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unchanged, 0);
        assert_eq!(data.publications[1].ncites_scopus, 2);
        assert_eq!(data.publications[0].ncites_scopus, 2);
    }

    #[test]
    fn refresh_matches_by_doi_when_key_absent() {
        let mut data = CvData {
            context: CareerContext::default(),
            publications: vec![publication("smith2018", 1, vec![2020])],
            presentations: Vec::new(),
            grants: Vec::new(),
            awards: Vec::new(),
        };

        let file = RefreshFile {
            source: CiteSource::Scopus,
            entries: vec![RefreshEntry {
                key: None,
                doi: Some("10.1000/smith2018".to_string()),
                count: Some(3),
                years: vec![2021, 2021, 2020],
            }],
        };

        let summary = apply_refresh(&mut data, &file);
        assert_eq!(summary.updated, 1);
        assert_eq!(data.publications[0].ncites_scopus, 3);
    }
}
