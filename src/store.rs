//! store.rs
//!
//! On-disk contribution maps. Each file is a flat YAML mapping of
//! `YYYY-MM-DD: count`:
//!     contributions_<username>_<year>.yml   one user, one year
//!     contributions_total_<year>.yml        summed across users

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::calendar::ContributionMap;
use crate::error::PersistError;
use crate::input::{is_reserved_login, is_valid_login};

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn user_path(&self, username: &str, year: i32) -> PathBuf {
        self.dir.join(format!("contributions_{username}_{year}.yml"))
    }

    pub fn total_path(&self, year: i32) -> PathBuf {
        self.dir.join(format!("contributions_total_{year}.yml"))
    }

    /// Per-user path, refusing names that leave the directory or land on the
    /// totals file.
    fn checked_user_path(&self, username: &str, year: i32) -> Result<PathBuf, PersistError> {
        if !is_valid_login(username) || is_reserved_login(username) {
            return Err(PersistError::InvalidUsername(username.to_string()));
        }
        Ok(self.user_path(username, year))
    }

    pub fn save_user(
        &self,
        username: &str,
        year: i32,
        map: &ContributionMap,
    ) -> Result<PathBuf, PersistError> {
        let path = self.checked_user_path(username, year)?;
        write_map(&path, map)?;
        Ok(path)
    }

    pub fn load_user(&self, username: &str, year: i32) -> Result<ContributionMap, PersistError> {
        read_map(&self.checked_user_path(username, year)?)
    }

    pub fn save_total(&self, year: i32, map: &ContributionMap) -> Result<PathBuf, PersistError> {
        let path = self.total_path(year);
        write_map(&path, map)?;
        Ok(path)
    }

    #[cfg(test)]
    pub fn load_total(&self, year: i32) -> Result<ContributionMap, PersistError> {
        read_map(&self.total_path(year))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_map(path: &Path, map: &ContributionMap) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let yaml = serde_yaml::to_string(map).map_err(|source| PersistError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, yaml).map_err(io_err(path))?;
    info!(path = %path.display(), days = map.len(), "wrote contribution map");
    Ok(())
}

fn read_map(path: &Path) -> Result<ContributionMap, PersistError> {
    let content = fs::read_to_string(path).map_err(io_err(path))?;
    serde_yaml::from_str(&content).map_err(|source| PersistError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
