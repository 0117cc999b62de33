//! Filesystem layout of the CA storage directory.

use std::fs;
use std::path::{Path, PathBuf};

/// Locations of every artifact the pipeline reads or writes.
///
/// All files live flat in one storage directory (default `ca`). Shared
/// templates keep fixed names; per-domain artifacts are named after the
/// domain itself, so leaf material for multiple domains can coexist.
#[derive(Debug, Clone)]
pub struct CaPaths {
    dir: PathBuf,
}

impl Default for CaPaths {
    fn default() -> Self {
        Self::new("ca")
    }
}

impl CaPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet.
    pub fn ensure_dir(&self) -> crate::Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// CA private key (`ca.key`).
    pub fn ca_key(&self) -> PathBuf {
        self.dir.join("ca.key")
    }

    /// Self-signed CA certificate (`ca.crt`).
    pub fn ca_cert(&self) -> PathBuf {
        self.dir.join("ca.crt")
    }

    /// Serial-number state written as a side effect of signing (`ca.srl`).
    pub fn serial(&self) -> PathBuf {
        self.dir.join("ca.srl")
    }

    /// Shared base request template (`openssl.cnf`).
    pub fn base_config(&self) -> PathBuf {
        self.dir.join("openssl.cnf")
    }

    /// CA-only extension profile (`v3_ca.cnf`).
    pub fn ca_extensions(&self) -> PathBuf {
        self.dir.join("v3_ca.cnf")
    }

    /// Leaf-only extension profile (`v3_req.cnf`).
    pub fn leaf_extensions(&self) -> PathBuf {
        self.dir.join("v3_req.cnf")
    }

    /// Per-domain subject-alt-name block (`<domain>.cnf`).
    pub fn domain_config(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.cnf"))
    }

    /// Per-domain subject line (`<domain>.subj`).
    pub fn domain_subject(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.subj"))
    }

    /// Per-domain leaf private key (`<domain>.key`).
    pub fn domain_key(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.key"))
    }

    /// Per-domain leaf certificate (`<domain>.crt`).
    pub fn domain_cert(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.crt"))
    }

    /// Per-domain signing request, removed once the leaf is issued
    /// (`<domain>.csr`).
    pub fn domain_csr(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.csr"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_storage_dir_is_ca() {
        let paths = CaPaths::default();
        assert_eq!(paths.ca_key(), PathBuf::from("ca/ca.key"));
        assert_eq!(paths.domain_cert("example.com"), PathBuf::from("ca/example.com.crt"));
    }

    #[test]
    fn domain_artifacts_are_named_after_the_domain() {
        let paths = CaPaths::new("/tmp/store");
        assert_eq!(
            paths.domain_subject("api.openai.com"),
            PathBuf::from("/tmp/store/api.openai.com.subj")
        );
        assert_eq!(
            paths.domain_csr("api.openai.com"),
            PathBuf::from("/tmp/store/api.openai.com.csr")
        );
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = CaPaths::new(tmp.path().join("nested/ca"));
        paths.ensure_dir().unwrap();
        assert!(paths.dir().is_dir());
    }
}
