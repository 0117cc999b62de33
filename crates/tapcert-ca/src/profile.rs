//! Interpretation of the merged request profile and subject lines.
//!
//! The merged profile is the concatenation of the shared base template, the
//! leaf extension profile and the domain SAN block. Its dialect is the
//! INI-style syntax of the original templates: `[ section ]` headers,
//! `key = value` lines, `#`/`;` comments. When a section name is defined
//! more than once the last definition wins, which gives the concatenation
//! layered-override semantics.

use rcgen::{
    BasicConstraints, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyUsagePurpose,
};
use tracing::warn;

use crate::error::CaError;

/// Smallest RSA modulus the pipeline will generate.
pub const MIN_KEY_BITS: usize = 2048;

/// A parsed profile document: named sections of key/value entries.
#[derive(Debug, Default)]
pub struct Profile {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl Profile {
    /// Parse profile text. A repeated section header replaces the earlier
    /// definition of that section entirely.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut profile = Self::default();
        let mut current: Option<usize> = None;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                if let Some(index) = profile.sections.iter().position(|(n, _)| *n == name) {
                    profile.sections[index].1.clear();
                    current = Some(index);
                } else {
                    profile.sections.push((name, Vec::new()));
                    current = Some(profile.sections.len() - 1);
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(CaError::Profile(format!(
                    "line {}: expected `key = value`, got {line:?}",
                    number + 1
                )));
            };
            let Some(index) = current else {
                return Err(CaError::Profile(format!(
                    "line {}: entry {line:?} appears before any section header",
                    number + 1
                )));
            };
            profile.sections[index]
                .1
                .push((key.trim().to_string(), value.trim().to_string()));
        }

        Ok(profile)
    }

    /// Look up a value; the last entry for a key within a section wins.
    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)?
            .1
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn entries(&self, section: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, entries)| entries.as_slice())
    }
}

/// The certificate-request fields consumed from a merged profile.
#[derive(Debug)]
pub struct RequestProfile {
    /// RSA modulus size from `[req] default_bits`, floored at
    /// [`MIN_KEY_BITS`].
    pub key_bits: usize,
    /// `[v3_req] basicConstraints`.
    pub basic_constraints: IsCa,
    /// `[v3_req] keyUsage`.
    pub key_usages: Vec<KeyUsagePurpose>,
    /// `[v3_req] extendedKeyUsage`.
    pub extended_key_usages: Vec<ExtendedKeyUsagePurpose>,
    /// DNS names from `[v3_req] subjectAltName`, in declaration order.
    pub subject_alt_names: Vec<String>,
}

impl RequestProfile {
    /// Interpret the fields the request pipeline consumes.
    pub fn from_profile(profile: &Profile) -> crate::Result<Self> {
        let key_bits = match profile.value("req", "default_bits") {
            Some(raw) => {
                let bits: usize = raw.parse().map_err(|_| {
                    CaError::Profile(format!("default_bits is not a number: {raw:?}"))
                })?;
                if bits < MIN_KEY_BITS {
                    warn!("default_bits {bits} below minimum, using {MIN_KEY_BITS}");
                    MIN_KEY_BITS
                } else {
                    bits
                }
            }
            None => MIN_KEY_BITS,
        };

        let section = "v3_req";
        if profile.entries(section).is_none() {
            return Err(CaError::Profile(format!("missing [{section}] section")));
        }

        let basic_constraints = match profile.value(section, "basicConstraints") {
            Some(raw) => parse_basic_constraints(raw)?,
            None => IsCa::ExplicitNoCa,
        };

        let key_usages = match profile.value(section, "keyUsage") {
            Some(raw) => raw
                .split(',')
                .map(|token| parse_key_usage(token.trim()))
                .collect::<crate::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let extended_key_usages = match profile.value(section, "extendedKeyUsage") {
            Some(raw) => raw
                .split(',')
                .map(|token| parse_extended_key_usage(token.trim()))
                .collect::<crate::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let subject_alt_names = match profile.value(section, "subjectAltName") {
            Some(raw) => resolve_alt_names(profile, raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            key_bits,
            basic_constraints,
            key_usages,
            extended_key_usages,
            subject_alt_names,
        })
    }
}

/// Resolve a `subjectAltName` value: either an `@section` reference whose
/// `DNS.<n>` entries are collected in index order, or an inline
/// `DNS:name, DNS:name` list.
fn resolve_alt_names(profile: &Profile, value: &str) -> crate::Result<Vec<String>> {
    if let Some(section) = value.strip_prefix('@') {
        let section = section.trim();
        let entries = profile.entries(section).ok_or_else(|| {
            CaError::Profile(format!("subjectAltName references missing [{section}]"))
        })?;

        let mut names: Vec<(u32, String)> = Vec::new();
        for (key, name) in entries {
            let Some(index) = key.strip_prefix("DNS.") else {
                return Err(CaError::Profile(format!(
                    "unsupported subjectAltName entry {key:?} in [{section}]"
                )));
            };
            let index: u32 = index.parse().map_err(|_| {
                CaError::Profile(format!("bad subjectAltName index in {key:?}"))
            })?;
            names.push((index, name.clone()));
        }
        names.sort_by_key(|(index, _)| *index);
        Ok(names.into_iter().map(|(_, name)| name).collect())
    } else {
        value
            .split(',')
            .map(|token| {
                let token = token.trim();
                token
                    .strip_prefix("DNS:")
                    .map(str::to_string)
                    .ok_or_else(|| {
                        CaError::Profile(format!("unsupported subjectAltName entry {token:?}"))
                    })
            })
            .collect()
    }
}

fn parse_basic_constraints(value: &str) -> crate::Result<IsCa> {
    let mut is_ca = None;
    let mut pathlen = None;

    for token in value.split(',').map(str::trim) {
        if token.eq_ignore_ascii_case("critical") {
            // rcgen derives criticality from the CA flag itself.
            continue;
        }
        if let Some(flag) = token.strip_prefix("CA:") {
            is_ca = Some(flag.eq_ignore_ascii_case("true"));
            continue;
        }
        if let Some(depth) = token.strip_prefix("pathlen:") {
            pathlen = Some(depth.parse::<u8>().map_err(|_| {
                CaError::Profile(format!("bad pathlen in basicConstraints: {token:?}"))
            })?);
            continue;
        }
        return Err(CaError::Profile(format!(
            "unknown basicConstraints token {token:?}"
        )));
    }

    match (is_ca, pathlen) {
        (Some(true), Some(depth)) => Ok(IsCa::Ca(BasicConstraints::Constrained(depth))),
        (Some(true), None) => Ok(IsCa::Ca(BasicConstraints::Unconstrained)),
        (Some(false) | None, _) => Ok(IsCa::ExplicitNoCa),
    }
}

fn parse_key_usage(token: &str) -> crate::Result<KeyUsagePurpose> {
    match token {
        "digitalSignature" => Ok(KeyUsagePurpose::DigitalSignature),
        "nonRepudiation" => Ok(KeyUsagePurpose::ContentCommitment),
        "keyEncipherment" => Ok(KeyUsagePurpose::KeyEncipherment),
        "dataEncipherment" => Ok(KeyUsagePurpose::DataEncipherment),
        "keyAgreement" => Ok(KeyUsagePurpose::KeyAgreement),
        "keyCertSign" => Ok(KeyUsagePurpose::KeyCertSign),
        "cRLSign" => Ok(KeyUsagePurpose::CrlSign),
        "encipherOnly" => Ok(KeyUsagePurpose::EncipherOnly),
        "decipherOnly" => Ok(KeyUsagePurpose::DecipherOnly),
        _ => Err(CaError::Profile(format!("unknown keyUsage {token:?}"))),
    }
}

fn parse_extended_key_usage(token: &str) -> crate::Result<ExtendedKeyUsagePurpose> {
    match token {
        "serverAuth" => Ok(ExtendedKeyUsagePurpose::ServerAuth),
        "clientAuth" => Ok(ExtendedKeyUsagePurpose::ClientAuth),
        "codeSigning" => Ok(ExtendedKeyUsagePurpose::CodeSigning),
        "emailProtection" => Ok(ExtendedKeyUsagePurpose::EmailProtection),
        "timeStamping" => Ok(ExtendedKeyUsagePurpose::TimeStamping),
        "OCSPSigning" => Ok(ExtendedKeyUsagePurpose::OcspSigning),
        _ => Err(CaError::Profile(format!(
            "unknown extendedKeyUsage {token:?}"
        ))),
    }
}

/// Parse a subject line of the form `/C=CN/ST=State/.../CN=domain` into a
/// distinguished name, preserving component order.
pub fn parse_subject(line: &str) -> crate::Result<DistinguishedName> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Err(CaError::Profile(format!(
            "subject line must start with '/': {line:?}"
        )));
    }

    let mut dn = DistinguishedName::new();
    for component in line.split('/').filter(|c| !c.is_empty()) {
        let Some((key, value)) = component.split_once('=') else {
            return Err(CaError::Profile(format!(
                "subject component without '=': {component:?}"
            )));
        };
        let dn_type = match key.trim() {
            "C" => DnType::CountryName,
            "ST" => DnType::StateOrProvinceName,
            "L" => DnType::LocalityName,
            "O" => DnType::OrganizationName,
            "OU" => DnType::OrganizationalUnitName,
            "CN" => DnType::CommonName,
            other => {
                return Err(CaError::Profile(format!(
                    "unknown subject component {other:?}"
                )))
            }
        };
        dn.push(dn_type, value.trim());
    }
    Ok(dn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn merged(domain: &str) -> String {
        format!(
            "{}\n{}\n{}",
            config::BASE_CONFIG,
            config::LEAF_EXTENSIONS,
            config::default_san_block(domain)
        )
    }

    #[test]
    fn parses_default_merged_profile() {
        let profile = Profile::parse(&merged("example.com")).unwrap();
        let request = RequestProfile::from_profile(&profile).unwrap();

        assert_eq!(request.key_bits, 2048);
        assert!(matches!(request.basic_constraints, IsCa::ExplicitNoCa));
        assert_eq!(
            request.key_usages,
            vec![
                KeyUsagePurpose::ContentCommitment,
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
            ]
        );
        assert_eq!(
            request.extended_key_usages,
            vec![ExtendedKeyUsagePurpose::ServerAuth]
        );
        assert_eq!(request.subject_alt_names, vec!["example.com".to_string()]);
    }

    #[test]
    fn last_section_definition_wins() {
        let text = "\
[ v3_req ]
basicConstraints = CA:FALSE
keyUsage = digitalSignature
extendedKeyUsage = serverAuth
subjectAltName = DNS:old.test

[ v3_req ]
basicConstraints = CA:FALSE
keyUsage = digitalSignature
extendedKeyUsage = clientAuth
subjectAltName = DNS:new.test
";
        let profile = Profile::parse(text).unwrap();
        let request = RequestProfile::from_profile(&profile).unwrap();
        assert_eq!(request.subject_alt_names, vec!["new.test".to_string()]);
        assert_eq!(
            request.extended_key_usages,
            vec![ExtendedKeyUsagePurpose::ClientAuth]
        );
    }

    #[test]
    fn alt_name_indirection_respects_index_order() {
        let text = "\
[ v3_req ]
subjectAltName = @alt_names

[ alt_names ]
DNS.2 = second.test
DNS.1 = first.test
";
        let profile = Profile::parse(text).unwrap();
        let request = RequestProfile::from_profile(&profile).unwrap();
        assert_eq!(
            request.subject_alt_names,
            vec!["first.test".to_string(), "second.test".to_string()]
        );
    }

    #[test]
    fn rejects_unknown_key_usage() {
        let text = "[ v3_req ]\nkeyUsage = flyToTheMoon\n";
        let profile = Profile::parse(text).unwrap();
        let error = RequestProfile::from_profile(&profile).unwrap_err();
        assert!(error.to_string().contains("flyToTheMoon"));
    }

    #[test]
    fn rejects_missing_alt_name_section() {
        let text = "[ v3_req ]\nsubjectAltName = @alt_names\n";
        let profile = Profile::parse(text).unwrap();
        assert!(RequestProfile::from_profile(&profile).is_err());
    }

    #[test]
    fn enforces_minimum_key_size() {
        let text = "[ req ]\ndefault_bits = 1024\n\n[ v3_req ]\n";
        let profile = Profile::parse(text).unwrap();
        let request = RequestProfile::from_profile(&profile).unwrap();
        assert_eq!(request.key_bits, MIN_KEY_BITS);
    }

    #[test]
    fn ca_basic_constraints_parse() {
        assert!(matches!(
            parse_basic_constraints("critical, CA:true").unwrap(),
            IsCa::Ca(BasicConstraints::Unconstrained)
        ));
        assert!(matches!(
            parse_basic_constraints("critical, CA:true, pathlen:0").unwrap(),
            IsCa::Ca(BasicConstraints::Constrained(0))
        ));
        assert!(matches!(
            parse_basic_constraints("CA:FALSE").unwrap(),
            IsCa::ExplicitNoCa
        ));
        assert!(parse_basic_constraints("CA:maybe, junk").is_err());
    }

    #[test]
    fn subject_line_round_trip() {
        let dn = parse_subject("/C=CN/ST=State/L=City/O=Organization/OU=Unit/CN=example.com")
            .unwrap();
        assert_eq!(
            dn.get(&DnType::CommonName),
            Some(&rcgen::DnValue::Utf8String("example.com".into()))
        );
        assert_eq!(
            dn.get(&DnType::CountryName),
            Some(&rcgen::DnValue::Utf8String("CN".into()))
        );
    }

    #[test]
    fn subject_line_rejects_unknown_component() {
        assert!(parse_subject("/C=CN/SERIALNUMBER=1").is_err());
        assert!(parse_subject("no-leading-slash").is_err());
    }

    #[test]
    fn entry_before_section_is_rejected() {
        assert!(Profile::parse("stray = value\n").is_err());
    }
}
