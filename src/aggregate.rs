//! Summing per-user contribution maps into per-day totals.

use tracing::warn;

use crate::calendar::ContributionMap;
use crate::error::{LoadFailure, PersistError};
use crate::store::Store;

/// Totals for whichever users loaded, plus the ones that did not.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub totals: ContributionMap,
    pub failures: Vec<LoadFailure>,
}

impl Aggregation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Element-wise sum. A date missing from a map counts as zero.
pub fn sum_maps<'a, I>(maps: I) -> ContributionMap
where
    I: IntoIterator<Item = &'a ContributionMap>,
{
    let mut totals = ContributionMap::new();
    for map in maps {
        for (date, count) in map {
            let slot = totals.entry(*date).or_insert(0);
            *slot = slot.saturating_add(*count);
        }
    }
    totals
}

/// Load each user's persisted map for `year` and sum them. Users whose file
/// cannot be read or parsed are recorded and skipped.
pub fn load_and_sum(store: &Store, usernames: &[String], year: i32) -> Aggregation {
    let mut loaded = Vec::with_capacity(usernames.len());
    let mut failures = Vec::new();

    for username in usernames {
        match store.load_user(username, year) {
            Ok(map) => loaded.push(map),
            Err(error) => {
                warn!(username = %username, year, "skipping user: {error}");
                failures.push(LoadFailure {
                    username: username.clone(),
                    error,
                });
            }
        }
    }

    Aggregation {
        totals: sum_maps(&loaded),
        failures,
    }
}

/// [`load_and_sum`], then persist the totals for `year`.
pub fn aggregate(store: &Store, usernames: &[String], year: i32) -> Result<Aggregation, PersistError> {
    let aggregation = load_and_sum(store, usernames, year);
    store.save_total(year, &aggregation.totals)?;
    Ok(aggregation)
}
