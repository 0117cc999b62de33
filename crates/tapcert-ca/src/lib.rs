//! # tapcert-ca
//!
//! Local certificate authority provisioning for TLS-intercepting proxies.
//!
//! ## Pipeline
//!
//! ```text
//! ensure_config ──► issue_ca ──► issue_leaf
//!   templates        ca.key       <domain>.key (PKCS#8)
//!   SAN block        ca.crt       <domain>.crt
//!   subject line                  ca.srl
//! ```
//!
//! Configuration artifacts are created once and never overwritten, so local
//! edits survive re-runs. The CA itself is the opposite: every invocation
//! regenerates it, rotating trust and invalidating previously issued
//! leaves. Leaf issuance merges the stored profiles, builds a signing
//! request for the domain and signs it with the CA; the merged profile only
//! ever exists as a scratch file that is removed on all exit paths.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tapcert_ca::{provision, CaPaths};
//!
//! let paths = CaPaths::default(); // ./ca
//! let (ca, leaf) = provision(&paths, "api.openai.com")?;
//! println!("trust {} for {}", ca.info.subject, leaf.domain);
//! ```

mod ca;
mod config;
mod error;
mod leaf;
mod paths;
mod profile;
mod scratch;
mod serial;

pub use ca::{issue_ca, CaIdentity, CA_COMMON_NAME};
pub use config::ensure_config;
pub use error::CaError;
pub use leaf::{issue_leaf, LeafIdentity};
pub use paths::CaPaths;
pub use profile::{parse_subject, Profile, RequestProfile, MIN_KEY_BITS};
pub use scratch::Scratch;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result type for CA operations.
pub type Result<T> = std::result::Result<T, CaError>;

/// Metadata describing an issued certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    /// Subject common name.
    pub subject: String,
    /// Issuer common name.
    pub issuer: String,
    /// Serial number (hex).
    pub serial: String,
    /// Not valid before.
    pub not_before: DateTime<Utc>,
    /// Not valid after.
    pub not_after: DateTime<Utc>,
}

/// Run the full provisioning pipeline for one domain: materialize the
/// configuration, regenerate the CA, issue the leaf.
pub fn provision(paths: &CaPaths, domain: &str) -> Result<(CaIdentity, LeafIdentity)> {
    ensure_config(paths, domain)?;
    let ca = issue_ca(paths)?;
    let leaf = issue_leaf(paths, domain)?;
    Ok((ca, leaf))
}
