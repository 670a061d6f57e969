use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::spotify::api::from_json;
use crate::spotify::Token;

/// On disk home of the single token record.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Token> {
        let body = std::fs::read_to_string(&self.path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::NotFound(self.path.clone()),
            _ => Error::Read {
                path: self.path.clone(),
                source,
            },
        })?;

        let token: Token = from_json(&body).map_err(|reason| self.corrupt(reason))?;

        match token.missing_field() {
            Some(field) => Err(self.corrupt(format!("{field} is empty"))),
            None => Ok(token),
        }
    }

    /// Replace the stored record. The new content is written next to the target and renamed
    /// over it so a crash never leaves a half written token behind.
    pub fn save(&self, token: &Token) -> Result<()> {
        let write_error = |source| Error::WriteError {
            path: self.path.clone(),
            source,
        };

        let body = serde_json::to_vec_pretty(token)
            .map_err(|err| write_error(std::io::Error::new(ErrorKind::InvalidData, err)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &body).map_err(write_error)?;
        std::fs::rename(&tmp, &self.path).map_err(|err| {
            let _ = std::fs::remove_file(&tmp);
            write_error(err)
        })?;

        log::debug!("token saved to {}", self.path.display());
        Ok(())
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::CorruptData {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(body)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, body)
}
