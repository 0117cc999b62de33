//! Self-signed root CA issuance.
//!
//! The CA is regenerated on every invocation: re-running the tool rotates
//! the CA key and certificate, invalidating every leaf signed by the old
//! pair. Configuration templates, by contrast, are create-if-absent.

use std::fs;

use chrono::Utc;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber, PKCS_RSA_SHA256,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::error::{run, CaError};
use crate::paths::CaPaths;
use crate::serial;
use crate::CertificateInfo;

/// Common name of the root certificate.
pub const CA_COMMON_NAME: &str = "TapCert Root CA";

const CA_ORGANIZATION: &str = "TapCert CA";
const CA_UNIT: &str = "TapCert";

/// Effectively permanent: the CA is meant to be installed once in a trust
/// store and never renewed.
const CA_VALIDITY_DAYS: i64 = 36_500;

const CA_KEY_BITS: usize = 2048;

/// A freshly generated CA key and self-signed certificate.
#[derive(Debug)]
pub struct CaIdentity {
    /// PKCS#8 private key PEM, as persisted to `ca.key`.
    pub key_pem: String,
    /// Self-signed certificate PEM, as persisted to `ca.crt`.
    pub cert_pem: String,
    /// Issuance metadata.
    pub info: CertificateInfo,
}

/// Generate a new CA key pair and self-signed certificate, overwriting any
/// existing CA material in the storage directory.
pub fn issue_ca(paths: &CaPaths) -> crate::Result<CaIdentity> {
    paths.ensure_dir()?;
    info!("generating CA certificate");

    let key = run("generate CA private key", || {
        RsaPrivateKey::new(&mut rand::rngs::OsRng, CA_KEY_BITS)
    })?;
    let key_pem = run("encode CA private key", || key.to_pkcs8_pem(LineEnding::LF))?;
    let key_pair = KeyPair::from_pkcs8_pem_and_sign_algo(key_pem.as_str(), &PKCS_RSA_SHA256)
        .map_err(CaError::engine)?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, "CN");
    dn.push(DnType::StateOrProvinceName, "State");
    dn.push(DnType::LocalityName, "City");
    dn.push(DnType::OrganizationName, CA_ORGANIZATION);
    dn.push(DnType::OrganizationalUnitName, CA_UNIT);
    dn.push(DnType::CommonName, CA_COMMON_NAME);

    let mut params = CertificateParams::default();
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.use_authority_key_identifier_extension = true;
    params.key_usages = vec![
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::ContentCommitment,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::DataEncipherment,
    ];

    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::minutes(5); // clock-skew buffer
    params.not_after = now + Duration::days(CA_VALIDITY_DAYS);

    let serial_bytes = serial::random_serial();
    params.serial_number = Some(SerialNumber::from(serial_bytes.clone()));

    let cert = run("self-sign CA certificate", || params.self_signed(&key_pair))?;
    let cert_pem = cert.pem();

    fs::write(paths.ca_key(), key_pem.as_bytes())?;
    fs::write(paths.ca_cert(), cert_pem.as_bytes())?;
    debug!("wrote {} and {}", paths.ca_key().display(), paths.ca_cert().display());

    let issued_at = Utc::now();
    let info = CertificateInfo {
        subject: CA_COMMON_NAME.to_string(),
        issuer: CA_COMMON_NAME.to_string(),
        serial: hex::encode_upper(&serial_bytes),
        not_before: issued_at - chrono::Duration::minutes(5),
        not_after: issued_at + chrono::Duration::days(CA_VALIDITY_DAYS),
    };

    Ok(CaIdentity {
        key_pem: key_pem.to_string(),
        cert_pem,
        info,
    })
}
