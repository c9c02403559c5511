use std::fs;
use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::aggregate::KeyGroup;
use crate::domain::DateFormat;
use crate::error::DigestError;
use crate::window::DateWindow;

/// The artifact handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub start_date: String,
    pub end_date: String,
    pub groups: Vec<KeyGroup>,
}

impl Dataset {
    pub fn new(window: &DateWindow, format: DateFormat, groups: Vec<KeyGroup>) -> Self {
        Self {
            start_date: format.format(window.start()),
            end_date: format.format(window.end()),
            groups,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<Vec<u8>, DigestError> {
        let encoded = if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        };
        encoded.map_err(|err| DigestError::Filesystem(err.to_string()))
    }
}

pub struct DatasetWriter;

impl DatasetWriter {
    /// Replaces whatever is at `path` with the encoded dataset.
    ///
    /// Goes through a temp file in the same directory so readers never see a
    /// partially written artifact.
    pub fn write(path: &Utf8Path, dataset: &Dataset, pretty: bool) -> Result<(), DigestError> {
        let content = dataset.to_json(pretty)?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DigestError::Filesystem(format!("create {parent}: {err}")))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".activity-digest")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DigestError::Filesystem(format!("temp file in {parent}: {err}")))?;
        temp.write_all(&content)
            .map_err(|err| DigestError::Filesystem(err.to_string()))?;
        temp.flush()
            .map_err(|err| DigestError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| DigestError::Filesystem(format!("write {path}: {}", err.error)))?;
        Ok(())
    }
}
