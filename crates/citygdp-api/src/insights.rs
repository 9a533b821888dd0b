use thiserror::Error;
use tracing::debug;

use citygdp_types::models::{InsightsSummary, KeyMetric};

pub const CITIES: &[&str] = &["Mumbai", "Delhi", "Bangalore", "Hyderabad", "Chennai", "Kolkata"];
pub const SECTORS: &[&str] = &["Agriculture", "Industry", "Services", "Technology", "Tourism"];
pub const FIRST_YEAR: u16 = 2010;
pub const LAST_YEAR: u16 = 2024;

/// (label, value, delta) of the fixed takeaway cards.
const TAKEAWAYS: &[(&str, &str, &str)] = &[
    ("Highest GDP Growth City", "Bangalore", "12.5%"),
    ("Most Innovative City", "Hyderabad", "300 patents/year"),
    ("Top Contributing Sector", "Technology", "5% Increase"),
    ("Average GDP Growth (2020-2024)", "7.8%", "Stable"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsightsError {
    #[error("unknown city: {0}")]
    UnknownCity(String),

    #[error("unknown sector: {0}")]
    UnknownSector(String),

    #[error("years must lie within 2010-2024")]
    YearOutOfRange,

    #[error("year range is reversed")]
    ReversedYears,
}

impl InsightsError {
    pub fn code(&self) -> &'static str {
        "invalid_input"
    }
}

/// Validate the filters and build the panel. Names match exactly; repeats
/// are dropped, first occurrence wins.
pub fn summarize(
    cities: &[String],
    year_from: u16,
    year_to: u16,
    sectors: &[String],
) -> Result<InsightsSummary, InsightsError> {
    let cities = pick(cities, CITIES).map_err(InsightsError::UnknownCity)?;
    let sectors = pick(sectors, SECTORS).map_err(InsightsError::UnknownSector)?;

    let range = FIRST_YEAR..=LAST_YEAR;
    if !range.contains(&year_from) || !range.contains(&year_to) {
        return Err(InsightsError::YearOutOfRange);
    }
    if year_from > year_to {
        return Err(InsightsError::ReversedYears);
    }

    let summary = format!(
        "Showing data for {} from {} to {}, focusing on sectors: {}.",
        cities.join(", "),
        year_from,
        year_to,
        sectors.join(", ")
    );
    debug!("{}", summary);

    Ok(InsightsSummary {
        cities,
        year_from,
        year_to,
        sectors,
        summary,
        takeaways: TAKEAWAYS
            .iter()
            .map(|(label, value, delta)| KeyMetric {
                label: label.to_string(),
                value: value.to_string(),
                delta: delta.to_string(),
            })
            .collect(),
    })
}

fn pick(wanted: &[String], known: &[&str]) -> Result<Vec<String>, String> {
    let mut picked: Vec<String> = Vec::with_capacity(wanted.len());
    for name in wanted {
        if !known.contains(&name.as_str()) {
            return Err(name.clone());
        }
        if !picked.contains(name) {
            picked.push(name.clone());
        }
    }
    Ok(picked)
}
