//! Scoped ephemeral files.
//!
//! The merged request profile only exists for the duration of one issuance.
//! A [`Scratch`] handle owns the backing temp file; the file is removed
//! exactly once when the handle drops, which covers normal completion and
//! `?`-propagated aborts alike. Removal failures (including a file already
//! gone) are ignored: cleanup never turns into a fatal error of its own.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// An ephemeral file holding `content`, deleted when dropped.
#[derive(Debug)]
pub struct Scratch {
    file: NamedTempFile,
}

impl Scratch {
    /// Materialize `content` as a uniquely named temp file.
    pub fn acquire(content: &str) -> crate::Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        debug!("materialized scratch file at {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn holds_content_while_alive() {
        let scratch = Scratch::acquire("[ req ]\ndefault_bits = 2048\n").unwrap();
        let read_back = std::fs::read_to_string(scratch.path()).unwrap();
        assert!(read_back.contains("default_bits"));
    }

    #[test]
    fn removed_on_drop() {
        let path: PathBuf;
        {
            let scratch = Scratch::acquire("gone soon").unwrap();
            path = scratch.path().to_path_buf();
            assert!(path.is_file());
        }
        assert!(!path.exists());
    }

    #[test]
    fn removed_when_owning_scope_errors() {
        fn failing_pipeline(observed: &mut PathBuf) -> crate::Result<()> {
            let scratch = Scratch::acquire("merged profile")?;
            *observed = scratch.path().to_path_buf();
            Err(crate::CaError::Profile("induced failure".into()))
        }

        let mut path = PathBuf::new();
        assert!(failing_pipeline(&mut path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn external_removal_is_benign() {
        let scratch = Scratch::acquire("already gone").unwrap();
        std::fs::remove_file(scratch.path()).unwrap();
        drop(scratch); // must not panic
    }
}
