use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Stable sha256 fingerprint of any serializable value. Used to key the
/// memoized publication counts to the exact record collection they were
/// computed from.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let data = serde_json::to_vec(value).context("failed to serialize value for fingerprint")?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Parses the date forms record files use for grant spans: `m/d/Y`, `m/Y`,
/// or a bare year. Partial dates resolve to the first day of the period.
pub fn parse_flex_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        return Ok(date);
    }

    let month_year =
        Regex::new(r"^(\d{1,2})/(\d{4})$").context("failed to compile month/year pattern")?;
    if let Some(captures) = month_year.captures(trimmed) {
        let month: u32 = captures[1].parse()?;
        let year: i32 = captures[2].parse()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
            return Ok(date);
        }
        bail!("invalid month/year date: {trimmed}");
    }

    let bare_year = Regex::new(r"^(\d{4})$").context("failed to compile year pattern")?;
    if let Some(captures) = bare_year.captures(trimmed) {
        let year: i32 = captures[1].parse()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
            return Ok(date);
        }
    }

    bail!("unrecognized date format: {trimmed} (expected m/d/Y, m/Y, or Y)")
}
