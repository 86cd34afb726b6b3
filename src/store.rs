use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{
    Award, CareerContext, CvData, Grant, GrantOutcome, Presentation, PubKind, PubStatus,
    Publication, TalkKind,
};
use crate::util::parse_flex_date;

/// On-disk career record file. Declarations carry optional stage flags;
/// resolution snapshots the context defaults into every record, so a
/// record declared before or after a context change behaves identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFile {
    #[serde(default)]
    pub context: CareerContext,
    #[serde(default)]
    pub publications: Vec<PublicationDecl>,
    #[serde(default)]
    pub presentations: Vec<PresentationDecl>,
    #[serde(default)]
    pub grants: Vec<GrantDecl>,
    #[serde(default)]
    pub awards: Vec<AwardDecl>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicationDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub year: i32,
    pub kind: PubKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PubStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_reviewed: Option<bool>,
    #[serde(default)]
    pub teaching: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_appointment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tenure: Option<bool>,
    #[serde(default)]
    pub ncites_wos: u32,
    #[serde(default)]
    pub ncites_scopus: u32,
    #[serde(default)]
    pub ncites_google: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cite_years_wos: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cite_years_scopus: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cite_years_google: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresentationDecl {
    pub title: String,
    pub year: i32,
    pub kind: TalkKind,
    #[serde(default)]
    pub teaching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_appointment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tenure: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantDecl {
    pub title: String,
    pub sponsor: String,
    pub amount: f64,
    #[serde(default)]
    pub awarded: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default = "default_true")]
    pub federal: bool,
    #[serde(default)]
    pub teaching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_credit: Option<f64>,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_appointment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tenure: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwardDecl {
    pub description: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    #[serde(default)]
    pub teaching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_appointment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tenure: Option<bool>,
}

fn default_true() -> bool {
    true
}

pub fn load(path: &Path) -> Result<RecordFile> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read record file: {}", path.display()))?;
    let file: RecordFile = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse record file: {}", path.display()))?;
    Ok(file)
}

impl RecordFile {
    /// Validates every declaration and produces the resolved record
    /// collection. Configuration errors fail fast here; data
    /// inconsistencies (citation count vs year-list length) only warn.
    pub fn resolve(&self, context: CareerContext) -> Result<CvData> {
        let mut publications = Vec::with_capacity(self.publications.len());
        for (index, decl) in self.publications.iter().enumerate() {
            publications.push(resolve_publication(decl, context, index)?);
        }

        let presentations = self
            .presentations
            .iter()
            .map(|decl| Presentation {
                title: decl.title.clone(),
                year: decl.year,
                kind: decl.kind,
                teaching: decl.teaching,
                post_appointment: decl.post_appointment.unwrap_or(context.post_appointment),
                post_tenure: decl.post_tenure.unwrap_or(context.post_tenure),
            })
            .collect();

        let mut grants = Vec::with_capacity(self.grants.len());
        for decl in &self.grants {
            grants.push(resolve_grant(decl, context)?);
        }

        let awards = self
            .awards
            .iter()
            .map(|decl| Award {
                description: decl.description.clone(),
                year: decl.year,
                student: decl.student.clone(),
                teaching: decl.teaching,
                post_appointment: decl.post_appointment.unwrap_or(context.post_appointment),
                post_tenure: decl.post_tenure.unwrap_or(context.post_tenure),
            })
            .collect();

        Ok(CvData {
            context,
            publications,
            presentations,
            grants,
            awards,
        })
    }

    /// Rebuilds a declaration file from resolved records, preserving the
    /// resolved stage flags explicitly. Used when a refresh rewrites the
    /// record file with updated citation data.
    pub fn from_resolved(data: &CvData) -> Self {
        RecordFile {
            context: data.context,
            publications: data
                .publications
                .iter()
                .map(|entry| PublicationDecl {
                    key: entry.key.clone(),
                    doi: entry.doi.clone(),
                    title: entry.title.clone(),
                    year: entry.year,
                    kind: entry.kind,
                    status: Some(entry.status),
                    peer_reviewed: Some(entry.peer_reviewed),
                    teaching: entry.teaching,
                    primary: entry.primary,
                    post_appointment: Some(entry.post_appointment),
                    post_tenure: Some(entry.post_tenure),
                    ncites_wos: entry.ncites_wos,
                    ncites_scopus: entry.ncites_scopus,
                    ncites_google: entry.ncites_google,
                    cite_years_wos: entry.cite_years_wos.clone(),
                    cite_years_scopus: entry.cite_years_scopus.clone(),
                    cite_years_google: entry.cite_years_google.clone(),
                })
                .collect(),
            presentations: data
                .presentations
                .iter()
                .map(|entry| PresentationDecl {
                    title: entry.title.clone(),
                    year: entry.year,
                    kind: entry.kind,
                    teaching: entry.teaching,
                    post_appointment: Some(entry.post_appointment),
                    post_tenure: Some(entry.post_tenure),
                })
                .collect(),
            grants: data
                .grants
                .iter()
                .map(|entry| GrantDecl {
                    title: entry.title.clone(),
                    sponsor: entry.sponsor.clone(),
                    amount: entry.amount,
                    awarded: entry.outcome == GrantOutcome::Awarded,
                    rejected: entry.outcome == GrantOutcome::Rejected,
                    federal: entry.federal,
                    teaching: entry.teaching,
                    external_amount: entry.external_amount,
                    shared_credit: entry.shared_credit,
                    start: entry.start.clone(),
                    end: entry.end.clone(),
                    post_appointment: Some(entry.post_appointment),
                    post_tenure: Some(entry.post_tenure),
                })
                .collect(),
            awards: data
                .awards
                .iter()
                .map(|entry| AwardDecl {
                    description: entry.description.clone(),
                    year: entry.year,
                    student: entry.student.clone(),
                    teaching: entry.teaching,
                    post_appointment: Some(entry.post_appointment),
                    post_tenure: Some(entry.post_tenure),
                })
                .collect(),
        }
    }
}

fn resolve_publication(
    decl: &PublicationDecl,
    context: CareerContext,
    index: usize,
) -> Result<Publication> {
    if decl.key.is_none() && decl.doi.is_none() && decl.title.is_none() {
        bail!("publication #{index} has no key, doi, or title");
    }

    // Books default to not-peer-reviewed; everything else defaults to
    // peer-reviewed.
    let peer_reviewed = decl
        .peer_reviewed
        .unwrap_or(decl.kind != PubKind::Book);

    let entry = Publication {
        key: decl.key.clone(),
        doi: decl.doi.clone(),
        title: decl.title.clone(),
        year: decl.year,
        kind: decl.kind,
        status: decl.status.unwrap_or(PubStatus::Published),
        peer_reviewed,
        teaching: decl.teaching,
        primary: decl.primary,
        post_appointment: decl.post_appointment.unwrap_or(context.post_appointment),
        post_tenure: decl.post_tenure.unwrap_or(context.post_tenure),
        ncites_wos: decl.ncites_wos,
        ncites_scopus: decl.ncites_scopus,
        ncites_google: decl.ncites_google,
        cite_years_wos: decl.cite_years_wos.clone(),
        cite_years_scopus: decl.cite_years_scopus.clone(),
        cite_years_google: decl.cite_years_google.clone(),
    };

    check_cite_consistency(&entry, "wos", entry.ncites_wos, &entry.cite_years_wos);
    check_cite_consistency(
        &entry,
        "scopus",
        entry.ncites_scopus,
        &entry.cite_years_scopus,
    );
    check_cite_consistency(
        &entry,
        "google",
        entry.ncites_google,
        &entry.cite_years_google,
    );

    Ok(entry)
}

fn check_cite_consistency(entry: &Publication, source: &str, count: u32, years: &[i32]) {
    if !years.is_empty() && years.len() != count as usize {
        warn!(
            entry = %entry.identity(),
            source,
            count,
            year_entries = years.len(),
            "citation count disagrees with citation-year list"
        );
    }
}

fn resolve_grant(decl: &GrantDecl, context: CareerContext) -> Result<Grant> {
    let outcome = match (decl.awarded, decl.rejected) {
        (true, true) => bail!("grant '{}' is both awarded and rejected", decl.title),
        (true, false) => GrantOutcome::Awarded,
        (false, true) => GrantOutcome::Rejected,
        (false, false) => GrantOutcome::Pending,
    };

    // Dates are only consumed by the funding apportionment, but an
    // unparsable date is a configuration error and should fail now.
    let start = parse_flex_date(&decl.start)
        .with_context(|| format!("grant '{}' has an invalid start date", decl.title))?;
    let end = parse_flex_date(&decl.end)
        .with_context(|| format!("grant '{}' has an invalid end date", decl.title))?;
    if end < start {
        bail!("grant '{}' ends before it starts", decl.title);
    }

    Ok(Grant {
        title: decl.title.clone(),
        sponsor: decl.sponsor.clone(),
        outcome,
        federal: decl.federal,
        teaching: decl.teaching,
        amount: decl.amount,
        external_amount: decl.external_amount,
        shared_credit: decl.shared_credit,
        start: decl.start.clone(),
        end: decl.end.clone(),
        post_appointment: decl.post_appointment.unwrap_or(context.post_appointment),
        post_tenure: decl.post_tenure.unwrap_or(context.post_tenure),
    })
}
