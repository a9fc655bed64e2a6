use std::fs;
use std::io::{self, Write};

use camino::Utf8PathBuf;
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::PathwayId;
use crate::error::KeggError;

#[derive(Debug, Clone)]
pub struct ReferenceCache {
    root: Utf8PathBuf,
}

impl ReferenceCache {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn default_root() -> Result<Utf8PathBuf, KeggError> {
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("kegg-analyzer"))
                    .ok()
            })
            .map(|root| root.join("ko"))
            .ok_or_else(|| KeggError::Filesystem("unable to resolve cache directory".to_string()))
    }

    pub fn path_for(&self, id: &PathwayId) -> Utf8PathBuf {
        self.root.join(id.as_str())
    }

    pub fn contains(&self, id: &PathwayId) -> bool {
        self.path_for(id).as_std_path().is_file()
    }

    pub fn read(&self, id: &PathwayId) -> Result<Option<String>, KeggError> {
        match fs::read_to_string(self.path_for(id).as_std_path()) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(KeggError::Filesystem(format!(
                "read {}: {err}",
                self.path_for(id)
            ))),
        }
    }

    /// Writes through a temp file in the cache directory so readers never see
    /// a truncated document.
    pub fn write(&self, id: &PathwayId, body: &str) -> Result<Utf8PathBuf, KeggError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".kegg-ref")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        temp.write_all(body.as_bytes())
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        let path = self.path_for(id);
        temp.persist(path.as_std_path())
            .map_err(|err| KeggError::Filesystem(err.to_string()))?;
        Ok(path)
    }
}
