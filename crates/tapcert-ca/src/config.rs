//! Materialization of the on-disk configuration profiles.
//!
//! Every file here follows create-if-absent semantics: defaults are written
//! once and later runs leave existing content untouched, so local edits to
//! the templates survive re-provisioning. This is deliberately the opposite
//! of the CA issuer, which overwrites its material on every run.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::paths::CaPaths;

/// Shared base request template: key parameters, distinguished-name
/// prompts and the default extension profiles.
pub(crate) const BASE_CONFIG: &str = "\
[ req ]
default_bits        = 2048
default_md          = sha256
default_keyfile     = privkey.pem
distinguished_name  = req_distinguished_name
req_extensions      = v3_req
x509_extensions     = v3_ca

[ req_distinguished_name ]
countryName                     = Country Name (2 letter code)
countryName_default             = CN
stateOrProvinceName             = State or Province Name
stateOrProvinceName_default     = State
localityName                    = Locality Name
localityName_default            = City
organizationName                = Organization Name
organizationName_default        = Organization
organizationalUnitName          = Organizational Unit Name
organizationalUnitName_default  = Unit
commonName                      = Common Name
commonName_max                  = 64
commonName_default              = localhost
emailAddress                    = Email Address
emailAddress_max                = 64
emailAddress_default            = admin@example.com

[ v3_req ]
basicConstraints       = CA:FALSE
keyUsage               = nonRepudiation, digitalSignature, keyEncipherment
extendedKeyUsage       = serverAuth
subjectAltName         = @alt_names

[ v3_ca ]
basicConstraints       = critical, CA:true
subjectKeyIdentifier   = hash
authorityKeyIdentifier = keyid:always, issuer:always
keyUsage               = cRLSign, keyCertSign, digitalSignature, nonRepudiation, keyEncipherment, dataEncipherment
";

/// CA extension profile on its own (no subjectAltName).
pub(crate) const CA_EXTENSIONS: &str = "\
[ v3_ca ]
basicConstraints       = critical, CA:true
subjectKeyIdentifier   = hash
authorityKeyIdentifier = keyid:always, issuer:always
keyUsage               = cRLSign, keyCertSign, digitalSignature, nonRepudiation, keyEncipherment, dataEncipherment
";

/// Leaf (server) extension profile on its own.
pub(crate) const LEAF_EXTENSIONS: &str = "\
[ v3_req ]
basicConstraints       = CA:FALSE
keyUsage               = nonRepudiation, digitalSignature, keyEncipherment
extendedKeyUsage       = serverAuth
subjectAltName         = @alt_names
";

/// Default subject-alt-name block for a domain: a single DNS entry.
pub(crate) fn default_san_block(domain: &str) -> String {
    format!("[ alt_names ]\nDNS.1 = {domain}\n")
}

/// Default subject line for a domain.
pub(crate) fn default_subject_line(domain: &str) -> String {
    format!("/C=CN/ST=State/L=City/O=Organization/OU=Unit/CN={domain}")
}

/// Ensure the storage directory and all configuration artifacts exist.
///
/// Writes each of the three shared templates and the two domain-specific
/// files only if the file is not already present. Each write is atomic
/// (temp file + rename), so a partially written template is never
/// observable even if the process dies mid-write.
pub fn ensure_config(paths: &CaPaths, domain: &str) -> crate::Result<()> {
    paths.ensure_dir()?;

    write_if_absent(&paths.base_config(), BASE_CONFIG)?;
    write_if_absent(&paths.ca_extensions(), CA_EXTENSIONS)?;
    write_if_absent(&paths.leaf_extensions(), LEAF_EXTENSIONS)?;
    write_if_absent(&paths.domain_config(domain), &default_san_block(domain))?;
    write_if_absent(&paths.domain_subject(domain), &default_subject_line(domain))?;

    Ok(())
}

fn write_if_absent(path: &Path, content: &str) -> crate::Result<()> {
    if path.exists() {
        debug!("keeping existing {}", path.display());
        return Ok(());
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    debug!("wrote {}", path.display());
    Ok(())
}
