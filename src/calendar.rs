//! calendar.rs
//!
//! Contribution data model. GitHub reports a year as a list of weeks, each
//! holding up to seven days; we flatten that into one date -> count map per
//! user. The same map type carries the cross-user totals.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::SchemaError;

/// Date -> contribution count. Ordered so persisted files are stable.
pub type ContributionMap = BTreeMap<NaiveDate, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyContribution {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct Week {
    #[serde(rename = "contributionDays")]
    pub contribution_days: Vec<Day>,
}

#[derive(Debug, Deserialize)]
pub struct Day {
    pub date: String,
    #[serde(rename = "contributionCount")]
    pub contribution_count: u64,
}

impl Day {
    pub fn parse(&self) -> Result<DailyContribution, SchemaError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| SchemaError::InvalidDate(self.date.clone()))?;
        Ok(DailyContribution {
            date,
            count: self.contribution_count,
        })
    }
}

/// Flatten weeks into a single map. A repeated date keeps the last value seen;
/// the API is not expected to emit one.
pub fn flatten_weeks(weeks: &[Week]) -> Result<ContributionMap, SchemaError> {
    let mut map = ContributionMap::new();
    for day in weeks.iter().flat_map(|w| w.contribution_days.iter()) {
        let daily = day.parse()?;
        map.insert(daily.date, daily.count);
    }
    Ok(map)
}
