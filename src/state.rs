use std::path::{Path, PathBuf};

use crate::error::{AssemblyError, Result};
use crate::formats::CollectionState;

/// Source of the scrape-progress snapshot the assembler reads from.
pub trait StateSource {
    /// Re-read the latest persisted snapshot.
    fn sync(&self) -> Result<CollectionState>;
}

impl StateSource for CollectionState {
    fn sync(&self) -> Result<CollectionState> {
        Ok(self.clone())
    }
}

/// `state.json` on local disk.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, state: &CollectionState) -> Result<()> {
        write_json_atomic(&self.path, state).map_err(|source| AssemblyError::State {
            path: self.path.clone(),
            source,
        })
    }

    /// Merge `update` into the stored snapshot and persist it.
    pub fn update_and_save(&self, update: CollectionState) -> Result<CollectionState> {
        let mut state = self.sync()?;
        if update.title.is_some() {
            state.title = update.title;
        }
        if update.date.is_some() {
            state.date = update.date;
        }
        if !update.urls.is_empty() {
            state.urls = update.urls;
        }
        state.articles.extend(update.articles);
        self.write(&state)?;
        Ok(state)
    }
}

impl StateSource for JsonStateStore {
    fn sync(&self) -> Result<CollectionState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.path.display(),
                    "state file missing; using empty state"
                );
                return Ok(CollectionState::default());
            }
            Err(err) => {
                return Err(AssemblyError::State {
                    path: self.path.clone(),
                    source: err.into(),
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|err| AssemblyError::State {
            path: self.path.clone(),
            source: err.into(),
        })
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn write_json_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> std::result::Result<(), BoxError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value)?;
    std::fs::write(&tmp_path, &data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::ArticleMeta;

    #[test]
    fn missing_file_syncs_to_empty_state() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = JsonStateStore::new(temp.path().join("state.json"));
        assert_eq!(store.sync()?, CollectionState::default());
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json")?;
        let err = JsonStateStore::new(&path).sync().expect_err("malformed");
        assert!(matches!(err, AssemblyError::State { .. }));
        Ok(())
    }

    #[test]
    fn update_merges_and_persists() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = JsonStateStore::new(temp.path().join("nested").join("state.json"));
        store.update_and_save(CollectionState {
            title: Some("Weekly".to_owned()),
            urls: vec!["https://economist.com/europe/2024/01/01/a".to_owned()],
            ..Default::default()
        })?;

        let mut articles = std::collections::BTreeMap::new();
        articles.insert(
            "https://economist.com/europe/2024/01/01/a".to_owned(),
            ArticleMeta {
                title: "A".to_owned(),
                subtitle: String::new(),
                filename: "europe_2024_01_01_a.json".to_owned(),
                section: "europe".to_owned(),
            },
        );
        store.update_and_save(CollectionState {
            articles,
            ..Default::default()
        })?;

        let state = store.sync()?;
        assert_eq!(state.title.as_deref(), Some("Weekly"));
        assert_eq!(state.urls.len(), 1);
        assert_eq!(state.articles.len(), 1);
        Ok(())
    }
}
