use thiserror::Error;

/// Earliest year the tool will query.
pub const MIN_YEAR: i32 = 2000;

/// GitHub caps logins at 39 characters.
pub const MAX_LOGIN_LEN: usize = 39;

/// Login that would map onto the yearly totals file name.
pub const RESERVED_LOGIN: &str = "total";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid year {year}, expected a year between {min} and {current}", min = MIN_YEAR)]
    YearOutOfRange { year: i32, current: i32 },

    #[error("at least one GitHub username is required")]
    NoUsernames,

    #[error("GitHub username must not be blank")]
    BlankUsername,

    #[error("invalid GitHub username {0:?}: use letters, digits and '-' (at most {max} characters)", max = MAX_LOGIN_LEN)]
    InvalidUsername(String),

    #[error("GitHub username {0:?} is reserved for the yearly totals file")]
    ReservedUsername(String),
}

pub fn validate_year(year: i32, current_year: i32) -> Result<i32, InputError> {
    if (MIN_YEAR..=current_year).contains(&year) {
        Ok(year)
    } else {
        Err(InputError::YearOutOfRange {
            year,
            current: current_year,
        })
    }
}

/// ASCII letters, digits and inner hyphens, at most [`MAX_LOGIN_LEN`] long.
pub fn is_valid_login(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_LOGIN_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

pub fn is_reserved_login(name: &str) -> bool {
    name.eq_ignore_ascii_case(RESERVED_LOGIN)
}

/// Trim names, reject blanks, malformed and reserved logins, and drop repeats
/// (logins are case-insensitive) keeping the first occurrence.
pub fn normalize_usernames<I, S>(raw: I) -> Result<Vec<String>, InputError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in raw {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(InputError::BlankUsername);
        }
        if !is_valid_login(name) {
            return Err(InputError::InvalidUsername(name.to_string()));
        }
        if is_reserved_login(name) {
            return Err(InputError::ReservedUsername(name.to_string()));
        }
        if !out.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            out.push(name.to_string());
        }
    }
    if out.is_empty() {
        return Err(InputError::NoUsernames);
    }
    Ok(out)
}
