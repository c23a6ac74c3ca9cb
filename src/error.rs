use std::path::PathBuf;

use thiserror::Error;

/// The response did not have the contribution calendar shape we query for.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("invalid contribution date {0:?}")]
    InvalidDate(String),
}

/// Failure of a single user's request against the GraphQL API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("GitHub API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("GraphQL reported errors: {}", .0.join("; "))]
    Api(Vec<String>),

    #[error("user {0:?} not found")]
    UserNotFound(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Reading or writing a persisted contribution file failed.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{0:?} cannot be used in a contribution file name")]
    InvalidUsername(String),

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Outcome of fetching and persisting one user's year.
#[derive(Error, Debug)]
pub enum FetchYearError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("persist failed: {0}")]
    Persist(#[from] PersistError),
}

/// One user whose persisted map could not be loaded during aggregation.
#[derive(Error, Debug)]
#[error("{username}: {error}")]
pub struct LoadFailure {
    pub username: String,
    #[source]
    pub error: PersistError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_joins_messages() {
        let err = FetchError::Api(vec!["bad login".into(), "rate limited".into()]);
        assert_eq!(err.to_string(), "GraphQL reported errors: bad login; rate limited");
    }

    #[test]
    fn test_schema_error_is_distinct_from_transport() {
        let err: FetchError = SchemaError::MissingField("data.user").into();
        assert!(matches!(err, FetchError::Schema(SchemaError::MissingField(_))));
        assert_eq!(err.to_string(), "response is missing `data.user`");
    }

    #[test]
    fn test_load_failure_names_user() {
        let failure = LoadFailure {
            username: "bob".into(),
            error: PersistError::Io {
                path: PathBuf::from("contributions_bob_2024.yml"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            },
        };
        assert!(failure.to_string().starts_with("bob: io error on contributions_bob_2024.yml"));
    }
}
