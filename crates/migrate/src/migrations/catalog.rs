//! Migration Catalog - File system side of the migration system
//!
//! Each migration unit lives in its own directory named `{key}-{Name}` under
//! the catalog root, holding an `up.sql` and a `down.sql` script.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use super::definitions::{unit_dir_name, MigrationKey, MigrationUnit};
use crate::error::{MigrateError, MigrateResult};

/// File holding the forward script
pub const UP_SCRIPT: &str = "up.sql";
/// File holding the backward script
pub const DOWN_SCRIPT: &str = "down.sql";

/// Last key handed out by `next_key` in this process
static LAST_KEY: AtomicI64 = AtomicI64::new(0);

/// Reads and scaffolds migration units under a root directory
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    root: PathBuf,
}

impl MigrationCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Catalog root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every migration unit, sorted ascending by key
    pub fn list(&self) -> MigrateResult<Vec<MigrationUnit>> {
        let discovery = |source: io::Error| MigrateError::Discovery {
            path: self.root.clone(),
            source,
        };

        let mut units = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(discovery)? {
            let entry = entry.map_err(discovery)?;
            let path = entry.path();

            if !entry.file_type().map_err(discovery)?.is_dir() {
                continue;
            }

            let dir_name = entry.file_name();
            let Some((key, name)) = dir_name.to_str().and_then(parse_dir_name) else {
                tracing::warn!("Ignoring unrecognized entry in migrations directory: {}", path.display());
                continue;
            };

            units.push(MigrationUnit {
                key,
                name: name.to_string(),
                up_script: read_script(&path.join(UP_SCRIPT))?,
                down_script: read_script(&path.join(DOWN_SCRIPT))?,
                path,
            });
        }

        units.sort_by_key(|unit| unit.key);

        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.key) {
                return Err(MigrateError::InvalidCatalog {
                    message: format!("key {} is used by more than one migration", unit.key),
                });
            }
        }

        tracing::debug!("Discovered {} migration(s) in {}", units.len(), self.root.display());
        Ok(units)
    }

    /// Scaffold a new unit with empty up/down scripts
    pub fn create_unit(&self, title: &str) -> MigrateResult<MigrationUnit> {
        let name = normalize_name(title);
        if name.is_empty() {
            return Err(MigrateError::InvalidName {
                title: title.to_string(),
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| MigrateError::Create {
            path: self.root.clone(),
            source,
        })?;

        let newest_on_disk = self.list()?.last().map(|unit| unit.key).unwrap_or(0);
        let key = next_key(newest_on_disk);
        let path = self.root.join(unit_dir_name(key, &name));

        let create = |source: io::Error| MigrateError::Create {
            path: path.clone(),
            source,
        };

        // Non-recursive so an existing directory is reported as a collision
        fs::create_dir(&path).map_err(create)?;
        fs::write(path.join(UP_SCRIPT), "").map_err(create)?;
        fs::write(path.join(DOWN_SCRIPT), "").map_err(create)?;

        Ok(MigrationUnit {
            key,
            name,
            up_script: String::new(),
            down_script: String::new(),
            path,
        })
    }
}

/// Split `{key}-{name}` into its parts
fn parse_dir_name(dir_name: &str) -> Option<(MigrationKey, &str)> {
    let (prefix, name) = dir_name.split_once('-')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
        return None;
    }
    Some((prefix.parse().ok()?, name))
}

/// Missing script files count as empty scripts
fn read_script(path: &Path) -> MigrateResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(MigrateError::Discovery {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Fresh key from the clock, strictly greater than `floor` and every key
/// previously generated by this process
fn next_key(floor: MigrationKey) -> MigrationKey {
    let now = Utc::now().timestamp_millis();
    let mut key = 0;
    let _ = LAST_KEY.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        key = now.max(last + 1).max(floor + 1);
        Some(key)
    });
    key
}

/// Convert free-form user input into a PascalCase migration name
///
/// Words are split on anything that is not alphanumeric and on
/// lower-to-upper case transitions, so `"add email_to users"`,
/// `"addEmailToUsers"` and `"ADD EMAIL TO USERS"` all become
/// `"AddEmailToUsers"`.
pub fn normalize_name(title: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in title.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}
