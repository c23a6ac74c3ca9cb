use futures::future::join_all;
use tracing::{info, warn};

use crate::calendar::ContributionMap;
use crate::error::FetchYearError;
use crate::github::GithubClient;
use crate::store::Store;

/// Fetch one user's year and persist it. Network and storage failures stay
/// distinguishable through [`FetchYearError`].
pub async fn fetch_year(
    client: &GithubClient,
    store: &Store,
    username: &str,
    year: i32,
) -> Result<ContributionMap, FetchYearError> {
    let map = client.contribution_calendar(username, year).await?;
    let path = store.save_user(username, year, &map)?;
    info!(username, year, path = %path.display(), "fetched contributions");
    Ok(map)
}

/// Fetch every user concurrently and wait for all of them. Results come back
/// in the order of `usernames`; one user's failure does not affect the others.
pub async fn fetch_all(
    client: &GithubClient,
    store: &Store,
    usernames: &[String],
    year: i32,
) -> Vec<(String, Result<ContributionMap, FetchYearError>)> {
    let results = join_all(
        usernames
            .iter()
            .map(|username| fetch_year(client, store, username, year)),
    )
    .await;

    usernames
        .iter()
        .cloned()
        .zip(results)
        .inspect(|(username, result)| {
            if let Err(e) = result {
                warn!(username = %username, year, "fetch failed: {e}");
            }
        })
        .collect()
}
