use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::calendar::{ContributionMap, Week, flatten_weeks};
use crate::config::Config;
use crate::error::{FetchError, SchemaError};

const CALENDAR_QUERY: &str = r#"
query ($username: String!, $from: DateTime!, $to: DateTime!) {
    user(login: $username) {
        contributionsCollection(from: $from, to: $to) {
            contributionCalendar {
                weeks {
                    contributionDays {
                        date
                        contributionCount
                    }
                }
            }
        }
    }
}
"#;

const SUMMARY_QUERY: &str = r#"
query ($username: String!) {
    user(login: $username) {
        contributionsCollection {
            totalCommitContributions
            totalPullRequestContributions
            totalIssueContributions
            restrictedContributionsCount
        }
    }
}
"#;

#[derive(Clone)]
pub struct GithubClient {
    token: Arc<String>,
    api_url: Arc<String>,
    http: Arc<Client>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct ContributionSummary {
    #[serde(rename = "totalCommitContributions")]
    pub commits: u64,
    #[serde(rename = "totalPullRequestContributions")]
    pub pull_requests: u64,
    #[serde(rename = "totalIssueContributions")]
    pub issues: u64,
    #[serde(rename = "restrictedContributionsCount")]
    pub restricted: u64,
}

/// Inclusive UTC bounds of a calendar year, formatted for the `DateTime` scalar.
pub fn year_range(year: i32) -> (String, String) {
    (
        format!("{year:04}-01-01T00:00:00Z"),
        format!("{year:04}-12-31T23:59:59Z"),
    )
}

impl GithubClient {
    /// Create a GitHub GraphQL client from an explicit configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let token = config
            .token()
            .context("GITHUB_TOKEN is not set (pass --token or export GITHUB_TOKEN)")?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            token: Arc::new(token.to_string()),
            api_url: Arc::new(config.api_url.clone()),
            http: Arc::new(http),
        })
    }

    /// One GraphQL round trip. Non-2xx statuses and `errors` payloads are errors.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, FetchError> {
        debug!(url = %self.api_url, "sending GraphQL request");

        let resp = self
            .http
            .post(self.api_url.as_str())
            .bearer_auth(&*self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(SchemaError::from)?;
        if let Some(messages) = graphql_errors(&json) {
            return Err(FetchError::Api(messages));
        }
        Ok(json)
    }

    /// Daily contribution counts for `username` over the calendar year `year`.
    pub async fn contribution_calendar(
        &self,
        username: &str,
        year: i32,
    ) -> Result<ContributionMap, FetchError> {
        let (from, to) = year_range(year);
        let json = self
            .graphql(
                CALENDAR_QUERY,
                json!({ "username": username, "from": from, "to": to }),
            )
            .await?;
        parse_calendar(json, username)
    }

    /// All-time contribution totals shown by the `summary` command.
    pub async fn contribution_summary(
        &self,
        username: &str,
    ) -> Result<ContributionSummary, FetchError> {
        #[derive(Deserialize)]
        struct SummaryResponse {
            data: Option<SummaryData>,
        }
        #[derive(Deserialize)]
        struct SummaryData {
            user: Option<SummaryUser>,
        }
        #[derive(Deserialize)]
        struct SummaryUser {
            #[serde(rename = "contributionsCollection")]
            contributions_collection: ContributionSummary,
        }

        let json = self
            .graphql(SUMMARY_QUERY, json!({ "username": username }))
            .await?;
        let parsed: SummaryResponse = serde_json::from_value(json).map_err(SchemaError::from)?;
        let data = parsed.data.ok_or(SchemaError::MissingField("data"))?;
        let user = data
            .user
            .ok_or_else(|| FetchError::UserNotFound(username.to_string()))?;
        Ok(user.contributions_collection)
    }
}

/// Messages from a GraphQL `errors` array, if the payload carries one.
fn graphql_errors(json: &Value) -> Option<Vec<String>> {
    let errors = json.get("errors")?;
    let messages = match errors.as_array() {
        Some(list) if list.is_empty() => return None,
        Some(list) => list
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string())
            })
            .collect(),
        None => vec![errors.to_string()],
    };
    Some(messages)
}

/// Normalise a calendar response body into a contribution map.
pub fn parse_calendar(json: Value, username: &str) -> Result<ContributionMap, FetchError> {
    #[derive(Deserialize)]
    struct CalendarResponse {
        data: Option<CalendarData>,
    }
    #[derive(Deserialize)]
    struct CalendarData {
        user: Option<CalendarUser>,
    }
    #[derive(Deserialize)]
    struct CalendarUser {
        #[serde(rename = "contributionsCollection")]
        contributions_collection: Option<Collection>,
    }
    #[derive(Deserialize)]
    struct Collection {
        #[serde(rename = "contributionCalendar")]
        contribution_calendar: Option<Calendar>,
    }
    #[derive(Deserialize)]
    struct Calendar {
        weeks: Option<Vec<Week>>,
    }

    let parsed: CalendarResponse = serde_json::from_value(json).map_err(SchemaError::from)?;
    let user = parsed
        .data
        .ok_or(SchemaError::MissingField("data"))?
        .user
        .ok_or_else(|| FetchError::UserNotFound(username.to_string()))?;
    let weeks = user
        .contributions_collection
        .ok_or(SchemaError::MissingField("contributionsCollection"))?
        .contribution_calendar
        .ok_or(SchemaError::MissingField("contributionCalendar"))?
        .weeks
        .ok_or(SchemaError::MissingField("weeks"))?;

    Ok(flatten_weeks(&weeks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve_once, serve_silent};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn calendar_json(weeks: Value) -> Value {
        json!({
            "data": {
                "user": {
                    "contributionsCollection": {
                        "contributionCalendar": { "weeks": weeks }
                    }
                }
            }
        })
    }

    fn client_for(url: String) -> GithubClient {
        let config = Config {
            token: Some("test-token".into()),
            api_url: url,
            request_timeout: Duration::from_millis(500),
            ..Config::default()
        };
        GithubClient::new(&config).unwrap()
    }

    #[test]
    fn test_year_range_bounds() {
        let (from, to) = year_range(2024);
        assert_eq!(from, "2024-01-01T00:00:00Z");
        assert_eq!(to, "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_new_requires_token() {
        assert!(GithubClient::new(&Config::default()).is_err());
    }

    #[test]
    fn test_parse_calendar_flattens() {
        let json = calendar_json(json!([
            { "contributionDays": [
                { "date": "2024-01-01", "contributionCount": 3 },
                { "date": "2024-01-02", "contributionCount": 0 }
            ]},
            { "contributionDays": [
                { "date": "2024-01-07", "contributionCount": 5 }
            ]}
        ]));
        let map = parse_calendar(json, "alice").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()], 5);
    }

    #[test]
    fn test_parse_calendar_zero_weeks_is_empty() {
        let map = parse_calendar(calendar_json(json!([])), "alice").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_parse_calendar_null_user() {
        let err = parse_calendar(json!({ "data": { "user": null } }), "ghost").unwrap_err();
        assert!(matches!(err, FetchError::UserNotFound(u) if u == "ghost"));
    }

    #[test]
    fn test_parse_calendar_missing_fields_is_schema_error() {
        let err = parse_calendar(json!({ "unexpected": true }), "alice").unwrap_err();
        assert!(matches!(err, FetchError::Schema(SchemaError::MissingField("data"))));

        let err = parse_calendar(
            json!({ "data": { "user": { "contributionsCollection": {} } } }),
            "alice",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Schema(SchemaError::MissingField("contributionCalendar"))
        ));

        let err = parse_calendar(
            calendar_json(json!([{ "contributionDays": [{ "date": "2024-01-01" }] }])),
            "alice",
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::Schema(SchemaError::Shape(_))));
    }

    #[test]
    fn test_graphql_errors_extracts_messages() {
        let json = json!({ "errors": [{ "message": "Could not resolve to a User" }] });
        assert_eq!(
            graphql_errors(&json),
            Some(vec!["Could not resolve to a User".to_string()])
        );
        assert_eq!(graphql_errors(&json!({ "errors": [] })), None);
        assert_eq!(graphql_errors(&json!({ "data": {} })), None);
    }

    #[tokio::test]
    async fn test_contribution_calendar_over_http() {
        let body = calendar_json(json!([
            { "contributionDays": [{ "date": "2023-06-01", "contributionCount": 2 }] }
        ]));
        let url = serve_once(200, body.to_string()).await;
        let map = client_for(url)
            .contribution_calendar("alice", 2023)
            .await
            .unwrap();
        assert_eq!(map[&NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()], 2);
    }

    #[tokio::test]
    async fn test_http_status_is_fetch_error() {
        let url = serve_once(401, r#"{"message":"Bad credentials"}"#.to_string()).await;
        let err = client_for(url)
            .contribution_calendar("alice", 2023)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_api_errors_payload_is_fetch_error() {
        let body = json!({ "data": { "user": null }, "errors": [{ "message": "nope" }] });
        let url = serve_once(200, body.to_string()).await;
        let err = client_for(url)
            .contribution_calendar("alice", 2023)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Api(m) if m == vec!["nope".to_string()]));
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        let url = serve_silent().await;
        let err = client_for(url)
            .contribution_calendar("alice", 2023)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_contribution_summary() {
        let body = json!({
            "data": { "user": { "contributionsCollection": {
                "totalCommitContributions": 120,
                "totalPullRequestContributions": 14,
                "totalIssueContributions": 3,
                "restrictedContributionsCount": 40
            }}}
        });
        let url = serve_once(200, body.to_string()).await;
        let summary = client_for(url).contribution_summary("alice").await.unwrap();
        assert_eq!(
            summary,
            ContributionSummary {
                commits: 120,
                pull_requests: 14,
                issues: 3,
                restricted: 40,
            }
        );
    }
}
