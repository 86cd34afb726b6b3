use anyhow::Result;
use serde::Serialize;

use crate::model::{CareerStage, CvData, GrantOutcome, PubKind, PubStatus, Publication};
use crate::util::fingerprint;

/// Counter triple for records whose stage flags are independent booleans:
/// an item can sit in both post-appointment and post-tenure buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTally {
    pub total: u32,
    pub post_appointment: u32,
    pub post_tenure: u32,
}

impl StageTally {
    fn record(&mut self, post_appointment: bool, post_tenure: bool) {
        self.total += 1;
        if post_appointment {
            self.post_appointment += 1;
        }
        if post_tenure {
            self.post_tenure += 1;
        }
    }
}

/// Counter quadruple keyed by the mutually exclusive career stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTally {
    pub total: u32,
    pub pre_appointment: u32,
    pub post_appointment_pre_tenure: u32,
    pub post_tenure: u32,
}

impl PeriodTally {
    fn record(&mut self, stage: CareerStage) {
        self.total += 1;
        match stage {
            CareerStage::PreAppointment => self.pre_appointment += 1,
            CareerStage::PostAppointmentPreTenure => self.post_appointment_pre_tenure += 1,
            CareerStage::PostTenure => self.post_tenure += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GrantTally {
    pub awarded_federal: u32,
    pub awarded_other: u32,
    pub pending_federal: u32,
    pub pending_other: u32,
    pub rejected_federal: u32,
    pub rejected_other: u32,
    pub teaching: u32,
}

impl GrantTally {
    pub fn awarded(&self) -> u32 {
        self.awarded_federal + self.awarded_other
    }

    pub fn pending(&self) -> u32 {
        self.pending_federal + self.pending_other
    }

    pub fn rejected(&self) -> u32 {
        self.rejected_federal + self.rejected_other
    }
}

/// Full tally of the record collection along every classification
/// dimension, computed in a single pass. The fingerprint ties the counts
/// to the exact collection they were derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PubCount {
    pub fingerprint: String,

    pub peer_reviewed_published: StageTally,
    pub teaching_publications: StageTally,

    pub articles: StageTally,
    pub articles_accepted: u32,
    pub articles_submitted: u32,
    pub articles_in_prep: u32,

    pub chapters: StageTally,
    pub chapters_accepted: u32,
    pub chapters_submitted: u32,
    pub chapters_in_prep: u32,

    pub proceedings: StageTally,
    pub proceedings_accepted: u32,
    pub proceedings_submitted: u32,
    pub proceedings_in_prep: u32,

    pub proceedings_unreviewed: StageTally,
    pub proceedings_unreviewed_in_prep: u32,

    pub books: StageTally,
    pub other: StageTally,

    pub cites_wos: u64,
    pub cites_scopus: u64,
    pub cites_google: u64,
    pub cites_best: u64,

    pub primary_peer_reviewed: u32,
    pub primary_peer_reviewed_post_appointment: u32,

    pub oral: PeriodTally,
    pub poster: PeriodTally,

    pub awards: PeriodTally,
    pub student_awards: PeriodTally,

    pub grants: GrantTally,
}

impl PubCount {
    pub fn compute(data: &CvData) -> Result<PubCount> {
        let mut count = PubCount {
            fingerprint: fingerprint(data)?,
            ..PubCount::default()
        };

        for entry in &data.publications {
            count.record_publication(entry);
        }

        for talk in &data.presentations {
            let tally = if talk.kind.is_poster() {
                &mut count.poster
            } else {
                &mut count.oral
            };
            tally.record(talk.stage());
        }

        for award in &data.awards {
            let tally = if award.is_student_award() {
                &mut count.student_awards
            } else {
                &mut count.awards
            };
            tally.record(award.stage());
        }

        for grant in &data.grants {
            if grant.teaching {
                count.grants.teaching += 1;
            }
            match (grant.outcome, grant.federal) {
                (GrantOutcome::Awarded, true) => count.grants.awarded_federal += 1,
                (GrantOutcome::Awarded, false) => count.grants.awarded_other += 1,
                (GrantOutcome::Pending, true) => count.grants.pending_federal += 1,
                (GrantOutcome::Pending, false) => count.grants.pending_other += 1,
                (GrantOutcome::Rejected, true) => count.grants.rejected_federal += 1,
                (GrantOutcome::Rejected, false) => count.grants.rejected_other += 1,
            }
        }

        Ok(count)
    }

    fn record_publication(&mut self, entry: &Publication) {
        if entry.teaching {
            self.teaching_publications
                .record(entry.post_appointment, entry.post_tenure);
        }

        if entry.is_peer_reviewed_published() {
            self.peer_reviewed_published
                .record(entry.post_appointment, entry.post_tenure);
            self.cites_wos += u64::from(entry.ncites_wos);
            self.cites_scopus += u64::from(entry.ncites_scopus);
            self.cites_google += u64::from(entry.ncites_google);
            self.cites_best += u64::from(entry.ncites());
        }

        if entry.primary && entry.peer_reviewed && entry.status <= PubStatus::Accepted {
            self.primary_peer_reviewed += 1;
            if entry.post_appointment {
                self.primary_peer_reviewed_post_appointment += 1;
            }
        }

        match entry.kind {
            PubKind::JournalArticle if entry.peer_reviewed => match entry.status {
                PubStatus::Published => self
                    .articles
                    .record(entry.post_appointment, entry.post_tenure),
                PubStatus::Accepted => self.articles_accepted += 1,
                PubStatus::Submitted => self.articles_submitted += 1,
                PubStatus::Unsubmitted => self.articles_in_prep += 1,
            },
            PubKind::BookChapter if entry.peer_reviewed => match entry.status {
                PubStatus::Published => self
                    .chapters
                    .record(entry.post_appointment, entry.post_tenure),
                PubStatus::Accepted => self.chapters_accepted += 1,
                PubStatus::Submitted => self.chapters_submitted += 1,
                PubStatus::Unsubmitted => self.chapters_in_prep += 1,
            },
            PubKind::ConferenceProceedings if entry.peer_reviewed => match entry.status {
                PubStatus::Published => self
                    .proceedings
                    .record(entry.post_appointment, entry.post_tenure),
                PubStatus::Accepted => self.proceedings_accepted += 1,
                PubStatus::Submitted => self.proceedings_submitted += 1,
                PubStatus::Unsubmitted => self.proceedings_in_prep += 1,
            },
            PubKind::ConferenceProceedings => {
                if entry.status == PubStatus::Unsubmitted {
                    self.proceedings_unreviewed_in_prep += 1;
                } else {
                    self.proceedings_unreviewed
                        .record(entry.post_appointment, entry.post_tenure);
                }
            }
            PubKind::Book => self.books.record(entry.post_appointment, entry.post_tenure),
            _ => self.other.record(entry.post_appointment, entry.post_tenure),
        }
    }
}

/// Memoized counts keyed by the collection fingerprint. A changed
/// collection invalidates the cache; repeated lookups on an unchanged
/// collection return the same counts without recomputing.
#[derive(Debug, Default)]
pub struct CountsCache {
    cached: Option<PubCount>,
}

impl CountsCache {
    pub fn counts(&mut self, data: &CvData) -> Result<&PubCount> {
        let current = fingerprint(data)?;
        let counts = match self.cached.take() {
            Some(count) if count.fingerprint == current => count,
            _ => PubCount::compute(data)?,
        };
        Ok(self.cached.insert(counts))
    }
}

/// Bibliometric indices over a publication view. Computed fresh on every
/// call from the live citation counts; never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PubStats {
    pub h: u32,
    pub g: u32,
    pub m: f64,
    pub i10: u32,
    pub o: u32,
}

impl PubStats {
    pub fn compute(publications: &[Publication]) -> PubStats {
        let counts: Vec<u32> = publications.iter().map(Publication::index_cites).collect();

        let h = h_index(&counts);
        let g = g_index(&counts);
        let m = m_index(h, publications);
        let i10 = publications
            .iter()
            .filter(|entry| entry.peer_reviewed && entry.index_cites() >= 10)
            .count() as u32;
        let o = o_index(h, &counts);

        PubStats { h, g, m, i10, o }
    }
}

/// Largest h such that at least h publications have at least h citations
/// each, found by decrementing from the collection size.
fn h_index(counts: &[u32]) -> u32 {
    let mut h = counts.len();
    while h > 0 {
        let qualifying = counts.iter().filter(|&&count| count as usize >= h).count();
        if qualifying >= h {
            break;
        }
        h -= 1;
    }
    h as u32
}

/// Largest g such that the top g citation counts sum to at least g^2,
/// capped at the publication count.
fn g_index(counts: &[u32]) -> u32 {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut g = sorted.len();
    while g > 0 {
        let top_sum: u64 = sorted[..g].iter().map(|&count| u64::from(count)).sum();
        if top_sum >= (g * g) as u64 {
            break;
        }
        g -= 1;
    }
    g as u32
}

/// h normalized by the peer-reviewed publishing span in years. A single
/// year of publishing (or none) yields 0 rather than a division error.
fn m_index(h: u32, publications: &[Publication]) -> f64 {
    let years: Vec<i32> = publications
        .iter()
        .filter(|entry| entry.peer_reviewed)
        .map(|entry| entry.year)
        .collect();

    let (Some(&first), Some(&last)) = (years.iter().min(), years.iter().max()) else {
        return 0.0;
    };
    if last == first {
        return 0.0;
    }
    f64::from(h) / f64::from(last - first)
}

fn o_index(h: u32, counts: &[u32]) -> u32 {
    let most_cited = counts.iter().copied().max().unwrap_or(0);
    (f64::from(h) * f64::from(most_cited)).sqrt().floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Award, CareerContext, Grant, Presentation, TalkKind};

    fn publication(key: &str, year: i32, scopus: u32, wos: u32) -> Publication {
        Publication {
            key: Some(key.to_string()),
            doi: None,
            title: None,
            year,
            kind: PubKind::JournalArticle,
            status: PubStatus::Published,
            peer_reviewed: true,
            teaching: false,
            primary: false,
            post_appointment: false,
            post_tenure: false,
            ncites_wos: wos,
            ncites_scopus: scopus,
            ncites_google: 0,
            cite_years_wos: Vec::new(),
            cite_years_scopus: Vec::new(),
            cite_years_google: Vec::new(),
        }
    }

    fn data_with(publications: Vec<Publication>) -> CvData {
        CvData {
            context: CareerContext::default(),
            publications,
            presentations: Vec::new(),
            grants: Vec::new(),
            awards: Vec::new(),
        }
    }

    #[test]
    fn h_index_uses_best_of_scopus_and_wos() {
        // Per-paper counts become [5, 2, 1]; two papers clear 2 citations,
        // the third fails at 3.
        let data = vec![
            publication("a", 2018, 5, 3),
            publication("b", 2019, 2, 2),
            publication("c", 2020, 0, 1),
        ];
        let stats = PubStats::compute(&data);
        assert_eq!(stats.h, 2);
    }

    #[test]
    fn h_index_of_empty_collection_is_zero() {
        let stats = PubStats::compute(&[]);
        assert_eq!(stats.h, 0);
        assert_eq!(stats.g, 0);
        assert_eq!(stats.m, 0.0);
        assert_eq!(stats.i10, 0);
        assert_eq!(stats.o, 0);
    }

    #[test]
    fn g_index_is_at_least_h_index() {
        let samples = vec![
            vec![publication("a", 2015, 10, 0), publication("b", 2016, 4, 0)],
            vec![
                publication("a", 2015, 25, 0),
                publication("b", 2016, 8, 0),
                publication("c", 2017, 5, 0),
                publication("d", 2018, 3, 0),
                publication("e", 2019, 0, 0),
            ],
            vec![publication("a", 2015, 0, 0)],
        ];
        for publications in samples {
            let stats = PubStats::compute(&publications);
            assert!(stats.g >= stats.h, "g={} h={}", stats.g, stats.h);
            assert!(stats.g as usize <= publications.len());
        }
    }

    #[test]
    fn h_index_bounded_by_count_and_max_citations() {
        let publications = vec![
            publication("a", 2015, 100, 0),
            publication("b", 2016, 50, 0),
            publication("c", 2017, 1, 2),
        ];
        let stats = PubStats::compute(&publications);
        let max_cites = publications
            .iter()
            .map(Publication::index_cites)
            .max()
            .unwrap();
        assert!(stats.h <= publications.len() as u32);
        assert!(stats.h <= max_cites);
    }

    #[test]
    fn m_index_single_publishing_year_is_zero() {
        let publications = vec![
            publication("a", 2020, 30, 0),
            publication("b", 2020, 12, 0),
        ];
        let stats = PubStats::compute(&publications);
        assert_eq!(stats.m, 0.0);
    }

    #[test]
    fn m_index_spans_peer_reviewed_years() {
        let publications = vec![
            publication("a", 2016, 30, 0),
            publication("b", 2020, 30, 0),
        ];
        let stats = PubStats::compute(&publications);
        assert_eq!(stats.h, 2);
        assert_eq!(stats.m, 0.5);
    }

    #[test]
    fn i10_counts_peer_reviewed_at_ten_or_more() {
        let mut publications = vec![
            publication("a", 2016, 10, 0),
            publication("b", 2017, 9, 11),
            publication("c", 2018, 9, 9),
            publication("d", 2019, 40, 0),
        ];
        publications[3].peer_reviewed = false;
        let stats = PubStats::compute(&publications);
        assert_eq!(stats.i10, 2);
    }

    #[test]
    fn o_index_is_floor_of_geometric_mean() {
        // h = 2, most-cited = 8 -> floor(sqrt(16)) = 4
        let publications = vec![
            publication("a", 2016, 8, 0),
            publication("b", 2017, 2, 0),
            publication("c", 2018, 1, 0),
        ];
        let stats = PubStats::compute(&publications);
        assert_eq!(stats.h, 2);
        assert_eq!(stats.o, 4);
    }

    #[test]
    fn counting_is_idempotent() {
        let mut entry = publication("a", 2018, 5, 3);
        entry.teaching = true;
        entry.post_appointment = true;
        let data = data_with(vec![entry, publication("b", 2019, 2, 2)]);

        let first = PubCount::compute(&data).unwrap();
        let second = PubCount::compute(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn citation_totals_cover_only_peer_reviewed_published() {
        let mut submitted = publication("b", 2021, 7, 7);
        submitted.status = PubStatus::Submitted;
        let data = data_with(vec![publication("a", 2018, 5, 3), submitted]);

        let count = PubCount::compute(&data).unwrap();
        assert_eq!(count.peer_reviewed_published.total, 1);
        assert_eq!(count.cites_scopus, 5);
        assert_eq!(count.cites_wos, 3);
        assert_eq!(count.cites_best, 5);
        assert_eq!(count.articles_submitted, 1);
    }

    #[test]
    fn unsubmitted_chapter_counts_only_as_in_prep() {
        let mut chapter = publication("chap", 2022, 0, 0);
        chapter.kind = PubKind::BookChapter;
        chapter.status = PubStatus::Unsubmitted;
        let data = data_with(vec![chapter]);

        let count = PubCount::compute(&data).unwrap();
        assert_eq!(count.chapters_in_prep, 1);
        assert_eq!(count.chapters.total, 0);
    }

    #[test]
    fn unreviewed_proceedings_split_from_reviewed() {
        let mut reviewed = publication("p1", 2019, 0, 0);
        reviewed.kind = PubKind::ConferenceProceedings;
        let mut unreviewed = publication("p2", 2019, 0, 0);
        unreviewed.kind = PubKind::ConferenceProceedings;
        unreviewed.peer_reviewed = false;
        let data = data_with(vec![reviewed, unreviewed]);

        let count = PubCount::compute(&data).unwrap();
        assert_eq!(count.proceedings.total, 1);
        assert_eq!(count.proceedings_unreviewed.total, 1);
    }

    #[test]
    fn presentations_and_awards_bucket_by_stage() {
        let mut data = data_with(Vec::new());
        data.presentations = vec![
            Presentation {
                title: "talk".to_string(),
                year: 2018,
                kind: TalkKind::Talk,
                teaching: false,
                post_appointment: true,
                post_tenure: false,
            },
            Presentation {
                title: "poster".to_string(),
                year: 2021,
                kind: TalkKind::Poster,
                teaching: false,
                post_appointment: true,
                post_tenure: true,
            },
        ];
        data.awards = vec![
            Award {
                description: "medal".to_string(),
                year: 2020,
                student: None,
                teaching: false,
                post_appointment: false,
                post_tenure: false,
            },
            Award {
                description: "student poster prize".to_string(),
                year: 2021,
                student: Some("J. Doe".to_string()),
                teaching: false,
                post_appointment: true,
                post_tenure: false,
            },
        ];

        let count = PubCount::compute(&data).unwrap();
        assert_eq!(count.oral.post_appointment_pre_tenure, 1);
        assert_eq!(count.poster.post_tenure, 1);
        assert_eq!(count.awards.pre_appointment, 1);
        assert_eq!(count.student_awards.post_appointment_pre_tenure, 1);
    }

    #[test]
    fn grants_bucket_by_outcome_and_federal() {
        let grant = |outcome, federal| Grant {
            title: "g".to_string(),
            sponsor: "s".to_string(),
            outcome,
            federal,
            teaching: false,
            amount: 1.0,
            external_amount: None,
            shared_credit: None,
            start: "2020".to_string(),
            end: "2021".to_string(),
            post_appointment: false,
            post_tenure: false,
        };
        let mut data = data_with(Vec::new());
        data.grants = vec![
            grant(GrantOutcome::Awarded, true),
            grant(GrantOutcome::Awarded, false),
            grant(GrantOutcome::Pending, true),
            grant(GrantOutcome::Rejected, false),
        ];

        let count = PubCount::compute(&data).unwrap();
        assert_eq!(count.grants.awarded(), 2);
        assert_eq!(count.grants.awarded_federal, 1);
        assert_eq!(count.grants.pending(), 1);
        assert_eq!(count.grants.rejected_other, 1);
    }

    #[test]
    fn cache_returns_identical_counts_for_unchanged_collection() {
        let data = data_with(vec![publication("a", 2018, 5, 3)]);
        let mut cache = CountsCache::default();

        let first = cache.counts(&data).unwrap().clone();
        let second = cache.counts(&data).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn cache_recomputes_when_collection_changes() {
        let mut data = data_with(vec![publication("a", 2018, 5, 3)]);
        let mut cache = CountsCache::default();

        let before = cache.counts(&data).unwrap().clone();
        data.publications.push(publication("b", 2020, 1, 0));
        let after = cache.counts(&data).unwrap().clone();

        assert_eq!(before.peer_reviewed_published.total, 1);
        assert_eq!(after.peer_reviewed_published.total, 2);
        assert_ne!(before.fingerprint, after.fingerprint);
    }
}
