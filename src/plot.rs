use anyhow::{Context, Result};
use chrono::Datelike;
use serde::Serialize;

use crate::model::{CiteSource, CvData, Grant, PubStatus};
use crate::util::parse_flex_date;

/// Generator for human-legible axis intervals: 1, 2, 5, 10, 20, 25, 50,
/// 100, ... The 2.5x step only enters from the second decade, where it is
/// integral.
struct NiceStrides {
    tenths: u64,
    exponent: u32,
}

impl Default for NiceStrides {
    fn default() -> Self {
        NiceStrides {
            tenths: 10,
            exponent: 0,
        }
    }
}

impl Iterator for NiceStrides {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.tenths = match self.tenths {
            10 => 20,
            20 if self.exponent == 0 => 50,
            20 => 25,
            25 => 50,
            _ => {
                self.exponent += 1;
                10
            }
        };
        Some(self.tenths * 10_u64.pow(self.exponent) / 10)
    }
}

/// Axis ceiling and tick spacing for a bar chart over non-negative
/// counts. `nticks` is the interval count; `ticks` runs 0..=max_ordinate
/// in steps of `delta` and has `nticks + 1` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimumOrdinate {
    pub max_value: u64,
    pub max_ordinate: u64,
    pub delta: u64,
    pub nticks: usize,
    pub ticks: Vec<u64>,
}

impl OptimumOrdinate {
    pub fn new(values: &[u64], fixed_delta: Option<u64>, max_ticks: usize) -> OptimumOrdinate {
        let mut strides = NiceStrides::default();
        let mut interval: u64 = 1;

        if let Some(delta) = fixed_delta.filter(|&delta| delta > 0) {
            // Seek the stride generator past the forced granularity, then
            // take the forced value itself as the starting interval.
            while interval < delta {
                interval = strides.next().unwrap_or(interval);
            }
            interval = delta;
        }

        let max_value = values.iter().copied().max().unwrap_or(0);
        let mut nticks = max_value.div_ceil(interval);
        while nticks as usize > max_ticks {
            interval = strides.next().unwrap_or(interval);
            nticks = max_value.div_ceil(interval);
        }

        let max_ordinate = nticks * interval;
        let ticks = (0..=nticks).map(|tick| tick * interval).collect();

        OptimumOrdinate {
            max_value,
            max_ordinate,
            delta: interval,
            nticks: nticks as usize,
            ticks,
        }
    }
}

/// Inclusive calendar-year range for a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearSpan {
    pub first: i32,
    pub last: i32,
}

impl YearSpan {
    pub fn years(&self) -> impl Iterator<Item = i32> + use<> {
        self.first..=self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    fn widen(&mut self, year: i32) {
        self.first = self.first.min(year);
        self.last = self.last.max(year);
    }
}

/// Counts items per calendar year over the span, keeping only those the
/// predicate admits.
pub fn histogram_by_year<T>(
    items: &[T],
    year_of: impl Fn(&T) -> i32,
    predicate: impl Fn(&T) -> bool,
    span: YearSpan,
) -> Vec<u32> {
    let mut buckets = vec![0_u32; span.len()];
    for item in items {
        if !predicate(item) {
            continue;
        }
        let year = year_of(item);
        if year < span.first || year > span.last {
            continue;
        }
        buckets[(year - span.first) as usize] += 1;
    }
    buckets
}

/// Span of the peer-reviewed publishing record: first year of any
/// peer-reviewed entry through the latest peer-reviewed entry that is at
/// least submitted. None when nothing is peer-reviewed.
pub fn publication_span(data: &CvData) -> Option<YearSpan> {
    let first = data
        .publications
        .iter()
        .filter(|entry| entry.peer_reviewed)
        .map(|entry| entry.year)
        .min()?;
    let last = data
        .publications
        .iter()
        .filter(|entry| entry.peer_reviewed && entry.status <= PubStatus::Submitted)
        .map(|entry| entry.year)
        .max()
        .unwrap_or(first)
        .max(first);
    Some(YearSpan { first, last })
}

/// Publication span widened to cover every citing year from the given
/// sources, so citation bars never fall outside the axis.
pub fn citation_span(data: &CvData, sources: &[CiteSource]) -> Option<YearSpan> {
    let mut span = publication_span(data)?;
    for entry in &data.publications {
        for &source in sources {
            for &year in entry.cite_years(source) {
                span.widen(year);
            }
        }
    }
    Some(span)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicationSeries {
    pub span: YearSpan,
    /// Peer-reviewed and published, per year.
    pub published: Vec<u32>,
    /// Peer-reviewed but still accepted/submitted, per year.
    pub pending: Vec<u32>,
}

pub fn publications_per_year(data: &CvData) -> Option<PublicationSeries> {
    let span = publication_span(data)?;
    let published = histogram_by_year(
        &data.publications,
        |entry| entry.year,
        |entry| entry.is_peer_reviewed_published(),
        span,
    );
    let pending = histogram_by_year(
        &data.publications,
        |entry| entry.year,
        |entry| {
            entry.peer_reviewed
                && matches!(entry.status, PubStatus::Accepted | PubStatus::Submitted)
        },
        span,
    );
    Some(PublicationSeries {
        span,
        published,
        pending,
    })
}

/// Explodes every publication's citation-year list for one source into a
/// per-year histogram over the span.
pub fn citations_per_year(data: &CvData, source: CiteSource, span: YearSpan) -> Vec<u32> {
    let mut buckets = vec![0_u32; span.len()];
    for entry in &data.publications {
        for &year in entry.cite_years(source) {
            if year < span.first || year > span.last {
                continue;
            }
            buckets[(year - span.first) as usize] += 1;
        }
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingSeries {
    pub span: YearSpan,
    pub external: Vec<f64>,
    pub internal: Vec<f64>,
}

impl FundingSeries {
    pub fn total(&self) -> Vec<f64> {
        self.external
            .iter()
            .zip(&self.internal)
            .map(|(external, internal)| external + internal)
            .collect()
    }
}

/// Apportions each awarded grant's value pro-rata across the months of
/// its contract falling in each calendar year, scaled by shared credit.
/// A grant without an explicit external amount counts wholly as external.
pub fn funding_per_year(grants: &[Grant]) -> Result<Option<FundingSeries>> {
    let mut span: Option<YearSpan> = None;
    for grant in grants.iter().filter(|grant| grant.is_awarded()) {
        let start = grant_start(grant)?;
        let end = grant_end(grant)?;
        match &mut span {
            Some(span) => {
                span.widen(start.year());
                span.widen(end.year());
            }
            None => {
                span = Some(YearSpan {
                    first: start.year(),
                    last: end.year(),
                });
            }
        }
    }
    let Some(span) = span else {
        return Ok(None);
    };

    let mut external = vec![0.0_f64; span.len()];
    let mut internal = vec![0.0_f64; span.len()];

    for grant in grants.iter().filter(|grant| grant.is_awarded()) {
        let start = grant_start(grant)?;
        let end = grant_end(grant)?;
        let contract_months = ((end - start).num_days() as f64 / 365.25 * 12.0).max(1.0);
        let credit = grant.credit_fraction();

        for year in start.year()..=end.year() {
            let months = if year == start.year() {
                12.0 - f64::from(start.month()) + 1.0
            } else if year == end.year() {
                f64::from(end.month())
            } else {
                12.0
            }
            .max(1.0);

            let fraction = credit * months / contract_months;
            let bucket = (year - span.first) as usize;
            match grant.external_amount {
                None => external[bucket] += grant.amount * fraction,
                Some(external_amount) => {
                    external[bucket] += external_amount * fraction;
                    internal[bucket] += (grant.amount - external_amount) * fraction;
                }
            }
        }
    }

    Ok(Some(FundingSeries {
        span,
        external,
        internal,
    }))
}

fn grant_start(grant: &Grant) -> Result<chrono::NaiveDate> {
    parse_flex_date(&grant.start)
        .with_context(|| format!("grant '{}' has an invalid start date", grant.title))
}

fn grant_end(grant: &Grant) -> Result<chrono::NaiveDate> {
    parse_flex_date(&grant.end)
        .with_context(|| format!("grant '{}' has an invalid end date", grant.title))
}
