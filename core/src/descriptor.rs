//! Package descriptors: the `package.json` shipped with a release, or a
//! fallback synthesized from release metadata.

use crate::hosting::{Release, RepoId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reverse-domain prefix for synthesized package names.
pub const FALLBACK_NAMESPACE: &str = "com";

/// Package author, either a bare name or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub path: String,
}

/// Everything a descriptor carries besides its identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unity_release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licenses_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Author>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vpm_dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Sample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Manifest fields not modelled above, or modelled fields whose value
    /// has an unexpected shape, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Pulls typed fields out of a manifest object. A value that does not fit
/// its field type is kept verbatim in `extra`.
struct FieldReader {
    fields: Map<String, Value>,
    extra: BTreeMap<String, Value>,
}

impl FieldReader {
    fn take<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.fields.remove(key)?;
        match T::deserialize(&value) {
            Ok(v) => Some(v),
            Err(_) => {
                self.extra.insert(key.to_string(), value);
                None
            }
        }
    }

    fn take_or_default<T: DeserializeOwned + Default>(&mut self, key: &str) -> T {
        self.take(key).unwrap_or_default()
    }
}

impl PackageDetails {
    fn from_fields(fields: Map<String, Value>) -> Self {
        let mut r = FieldReader {
            fields,
            extra: BTreeMap::new(),
        };
        let mut details = Self {
            display_name: r.take("displayName"),
            description: r.take("description"),
            unity: r.take("unity"),
            unity_release: r.take("unityRelease"),
            license: r.take("license"),
            documentation_url: r.take("documentationUrl"),
            changelog_url: r.take("changelogUrl"),
            licenses_url: r.take("licensesUrl"),
            package_type: r.take("type"),
            author: r.take("author"),
            contributors: r.take_or_default("contributors"),
            dependencies: r.take_or_default("dependencies"),
            vpm_dependencies: r.take_or_default("vpmDependencies"),
            samples: r.take_or_default("samples"),
            keywords: r.take_or_default("keywords"),
            extra: BTreeMap::new(),
        };
        r.extra.extend(r.fields);
        details.extra = r.extra;
        details
    }
}

/// A parsed `package.json`. Name and version may be missing.
#[derive(Debug, Clone, Default)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub details: PackageDetails,
}

impl PackageManifest {
    /// Parse manifest bytes. Only content that is not a JSON object yields
    /// `None`; a non-string name or version is left unset.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let Value::Object(mut fields) = serde_json::from_slice(bytes).ok()? else {
            return None;
        };
        let mut identity = |key: &str| match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let name = identity("name");
        let version = identity("version");

        Some(Self {
            name,
            version,
            details: PackageDetails::from_fields(fields),
        })
    }

    /// Minimal manifest derived from the repository and release.
    pub fn fallback(repo: &RepoId, release: &Release) -> Self {
        let description = release
            .body
            .as_deref()
            .and_then(|body| body.lines().next())
            .map(|line| line.trim_end_matches('\r').to_string())
            .unwrap_or_default();

        Self {
            name: Some(format!(
                "{}.{}.{}",
                FALLBACK_NAMESPACE, repo.owner, repo.name
            )),
            version: Some(version_from_tag(&release.tag_name).to_string()),
            details: PackageDetails {
                display_name: Some(repo.name.clone()),
                description: Some(description),
                ..Default::default()
            },
        }
    }

    /// Promote to a descriptor; fails when name or version is empty.
    pub fn into_descriptor(self) -> Option<PackageDescriptor> {
        let name = self.name.filter(|n| !n.is_empty())?;
        let version = self.version.filter(|v| !v.is_empty())?;
        Some(PackageDescriptor {
            name,
            version,
            details: self.details,
        })
    }
}

/// A validated package descriptor for one release.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    #[serde(flatten)]
    pub details: PackageDetails,
}

/// Strip a single leading non-digit prefix (`v1.0.0` -> `1.0.0`).
pub fn version_from_tag(tag: &str) -> &str {
    match tag.chars().next() {
        Some(c) if !c.is_ascii_digit() => &tag[c.len_utf8()..],
        _ => tag,
    }
}
