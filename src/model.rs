use serde::{Deserialize, Serialize};

/// Publication lifecycle, ordered with `Published` most final so that
/// status ceilings can be expressed as `status <= ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PubStatus {
    Published,
    Accepted,
    Submitted,
    Unsubmitted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PubKind {
    JournalArticle,
    BookChapter,
    ConferenceProceedings,
    Book,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TalkKind {
    Talk,
    InvitedTalk,
    Interview,
    Poster,
}

impl TalkKind {
    pub fn is_poster(self) -> bool {
        matches!(self, Self::Poster)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiteSource {
    WebOfScience,
    Scopus,
    GoogleScholar,
}

impl CiteSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebOfScience => "web_of_science",
            Self::Scopus => "scopus",
            Self::GoogleScholar => "google_scholar",
        }
    }
}

/// Where a record falls relative to the appointment and tenure milestones.
/// Tenure implies appointment, so the tenure flag wins when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerStage {
    PreAppointment,
    PostAppointmentPreTenure,
    PostTenure,
}

pub fn career_stage(post_appointment: bool, post_tenure: bool) -> CareerStage {
    if post_tenure {
        CareerStage::PostTenure
    } else if post_appointment {
        CareerStage::PostAppointmentPreTenure
    } else {
        CareerStage::PreAppointment
    }
}

/// Process-wide stage defaults, snapshotted into each record during
/// resolution. Records never re-read these after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerContext {
    #[serde(default)]
    pub post_appointment: bool,
    #[serde(default)]
    pub post_tenure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub key: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub year: i32,
    pub kind: PubKind,
    pub status: PubStatus,
    pub peer_reviewed: bool,
    pub teaching: bool,
    pub primary: bool,
    pub post_appointment: bool,
    pub post_tenure: bool,
    pub ncites_wos: u32,
    pub ncites_scopus: u32,
    pub ncites_google: u32,
    pub cite_years_wos: Vec<i32>,
    pub cite_years_scopus: Vec<i32>,
    pub cite_years_google: Vec<i32>,
}

impl Publication {
    /// Human-readable identity: citation key, else DOI, else title.
    /// Resolution guarantees at least one is present.
    pub fn identity(&self) -> &str {
        self.key
            .as_deref()
            .or(self.doi.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("<unidentified>")
    }

    /// Best citation count across all sources, for display totals.
    pub fn ncites(&self) -> u32 {
        self.ncites_wos.max(self.ncites_scopus).max(self.ncites_google)
    }

    /// Citation count used by the bibliometric indices. Google Scholar is
    /// excluded here; its counts feed totals and charts only.
    pub fn index_cites(&self) -> u32 {
        self.ncites_scopus.max(self.ncites_wos)
    }

    pub fn cites(&self, source: CiteSource) -> u32 {
        match source {
            CiteSource::WebOfScience => self.ncites_wos,
            CiteSource::Scopus => self.ncites_scopus,
            CiteSource::GoogleScholar => self.ncites_google,
        }
    }

    pub fn cite_years(&self, source: CiteSource) -> &[i32] {
        match source {
            CiteSource::WebOfScience => &self.cite_years_wos,
            CiteSource::Scopus => &self.cite_years_scopus,
            CiteSource::GoogleScholar => &self.cite_years_google,
        }
    }

    pub fn set_cites(&mut self, source: CiteSource, count: u32, years: Vec<i32>) {
        match source {
            CiteSource::WebOfScience => {
                self.ncites_wos = count;
                self.cite_years_wos = years;
            }
            CiteSource::Scopus => {
                self.ncites_scopus = count;
                self.cite_years_scopus = years;
            }
            CiteSource::GoogleScholar => {
                self.ncites_google = count;
                self.cite_years_google = years;
            }
        }
    }

    /// Count-only update, for sources that report a total without a
    /// per-year breakdown. The stored year history is left alone.
    pub fn set_cite_count(&mut self, source: CiteSource, count: u32) {
        match source {
            CiteSource::WebOfScience => self.ncites_wos = count,
            CiteSource::Scopus => self.ncites_scopus = count,
            CiteSource::GoogleScholar => self.ncites_google = count,
        }
    }

    pub fn is_peer_reviewed_published(&self) -> bool {
        self.peer_reviewed && self.status == PubStatus::Published
    }

    pub fn is_research(&self) -> bool {
        !self.teaching
    }

    pub fn stage(&self) -> CareerStage {
        career_stage(self.post_appointment, self.post_tenure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub year: i32,
    pub kind: TalkKind,
    pub teaching: bool,
    pub post_appointment: bool,
    pub post_tenure: bool,
}

impl Presentation {
    pub fn stage(&self) -> CareerStage {
        career_stage(self.post_appointment, self.post_tenure)
    }
}

/// Mutually exclusive grant disposition, resolved from the declaration's
/// `awarded`/`rejected` booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOutcome {
    Awarded,
    Rejected,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub title: String,
    pub sponsor: String,
    pub outcome: GrantOutcome,
    pub federal: bool,
    pub teaching: bool,
    pub amount: f64,
    pub external_amount: Option<f64>,
    /// Percentage of the grant's value credited to the CV author.
    /// Absent means 100%.
    pub shared_credit: Option<f64>,
    pub start: String,
    pub end: String,
    pub post_appointment: bool,
    pub post_tenure: bool,
}

impl Grant {
    pub fn is_awarded(&self) -> bool {
        self.outcome == GrantOutcome::Awarded
    }

    /// Shared credit as a fraction in [0, 1]. Values above 1 in the record
    /// file are percentages and get divided by 100.
    pub fn credit_fraction(&self) -> f64 {
        match self.shared_credit {
            None => 1.0,
            Some(credit) if credit > 1.0 => credit / 100.0,
            Some(credit) => credit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub description: String,
    pub year: i32,
    /// Non-empty means the award went to an advisee, not the CV author.
    pub student: Option<String>,
    pub teaching: bool,
    pub post_appointment: bool,
    pub post_tenure: bool,
}

impl Award {
    pub fn is_student_award(&self) -> bool {
        self.student.is_some()
    }

    pub fn stage(&self) -> CareerStage {
        career_stage(self.post_appointment, self.post_tenure)
    }
}

/// The full resolved career record for one person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvData {
    pub context: CareerContext,
    pub publications: Vec<Publication>,
    pub presentations: Vec<Presentation>,
    pub grants: Vec<Grant>,
    pub awards: Vec<Award>,
}
