//! Info.plist editing

use std::io::Cursor;
use std::path::{Path, PathBuf};

use capbuild_core::{fs, CoreError, EditOutcome, ProjectLayout};
use plist::{Dictionary, Value};
use tracing::{debug, info};

/// Property list errors
#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    #[error("Property list not found: {0}")]
    FileNotFound(String),
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),
    #[error("Root of {0} is not a dictionary")]
    NotADictionary(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Key/value upserts into one XML property list
#[derive(Debug, Clone)]
pub struct InfoPlistEditor {
    path: PathBuf,
}

impl InfoPlistEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Editor for `ios/App/App/Info.plist`
    pub fn for_project(layout: &ProjectLayout) -> Self {
        Self::new(layout.info_plist())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the root dictionary
    pub async fn load(&self) -> Result<Dictionary, PlistError> {
        if !self.path.exists() {
            return Err(PlistError::FileNotFound(self.path.display().to_string()));
        }
        let bytes = tokio::fs::read(&self.path).await?;
        Value::from_reader(Cursor::new(bytes))?
            .into_dictionary()
            .ok_or_else(|| PlistError::NotADictionary(self.path.display().to_string()))
    }

    /// Set `key` to `value`, writing only when the stored value differs
    pub async fn upsert(&self, key: &str, value: impl Into<Value>) -> Result<EditOutcome, PlistError> {
        let value = value.into();
        let mut dict = self.load().await?;

        let outcome = match dict.get(key) {
            Some(current) if *current == value => {
                debug!("Info.plist {} unchanged", key);
                return Ok(EditOutcome::Unchanged);
            }
            Some(current) => {
                info!("Info.plist {}: {:?} -> {:?}", key, current, value);
                EditOutcome::Updated
            }
            None => {
                info!("Info.plist {} = {:?} (new)", key, value);
                EditOutcome::Inserted
            }
        };

        dict.insert(key.to_string(), value);
        self.save(dict).await?;
        Ok(outcome)
    }

    async fn save(&self, dict: Dictionary) -> Result<(), PlistError> {
        let mut buf = Vec::new();
        Value::Dictionary(dict).to_writer_xml(&mut buf)?;
        buf.push(b'\n');
        fs::replace_file(&self.path, buf).await?;
        Ok(())
    }
}

/// Upsert one key of the plist at `path`
pub async fn upsert(path: impl AsRef<Path>, key: &str, value: impl Into<Value>) -> Result<EditOutcome, PlistError> {
    InfoPlistEditor::new(path.as_ref()).upsert(key, value).await
}
