//! Chart reference type with polymorphic decoding.
//!
//! A chart reference in a declaration file is either a bare scalar
//! (just the chart name) or a full mapping with version, auth, and
//! verification options. The shape is chosen by inspecting the node
//! kind at decode time, never by trying one shape and falling back to
//! the other. Downstream code always sees the one normalized struct.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// A reference to a chart, resolved to a concrete artifact during
/// plan building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartReference {
    /// Chart name, e.g. `bitnami/nginx` or a local path. Non-empty
    /// after a successful decode.
    pub name: String,
    /// Chart version; unset means "whatever the source offers".
    pub version: Option<String>,
    /// Direct repository URL, overriding the registry lookup.
    pub repo_url: Option<String>,
    /// Repository username.
    pub username: Option<String>,
    /// Repository password.
    pub password: Option<String>,
    /// CA bundle for verifying HTTPS servers.
    pub ca_file: Option<String>,
    /// Client SSL certificate file.
    pub cert_file: Option<String>,
    /// Client SSL key file.
    pub key_file: Option<String>,
    /// Location of public keys used for provenance verification.
    pub keyring: Option<String>,
    /// Skip server certificate verification.
    pub insecure: bool,
    /// Verify chart provenance before use.
    pub verify: bool,
    /// Pass credentials to all domains.
    pub pass_credentials: bool,
    /// Skip updating and downloading dependencies.
    pub skip_dependency_update: bool,
    /// Skip refreshing repository indexes during dependency download.
    pub skip_refresh: bool,
}

/// Serde mirror of [`ChartReference`] used for the mapping shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawChart {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ca_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cert_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keyring: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    insecure: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    verify: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pass_credentials: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    skip_dependency_update: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    skip_refresh: bool,
}

impl From<RawChart> for ChartReference {
    fn from(raw: RawChart) -> Self {
        Self {
            name: raw.name,
            version: raw.version,
            repo_url: raw.repo_url,
            username: raw.username,
            password: raw.password,
            ca_file: raw.ca_file,
            cert_file: raw.cert_file,
            key_file: raw.key_file,
            keyring: raw.keyring,
            insecure: raw.insecure,
            verify: raw.verify,
            pass_credentials: raw.pass_credentials,
            skip_dependency_update: raw.skip_dependency_update,
            skip_refresh: raw.skip_refresh,
        }
    }
}

impl From<&ChartReference> for RawChart {
    fn from(chart: &ChartReference) -> Self {
        Self {
            name: chart.name.clone(),
            version: chart.version.clone(),
            repo_url: chart.repo_url.clone(),
            username: chart.username.clone(),
            password: chart.password.clone(),
            ca_file: chart.ca_file.clone(),
            cert_file: chart.cert_file.clone(),
            key_file: chart.key_file.clone(),
            keyring: chart.keyring.clone(),
            insecure: chart.insecure,
            verify: chart.verify,
            pass_credentials: chart.pass_credentials,
            skip_dependency_update: chart.skip_dependency_update,
            skip_refresh: chart.skip_refresh,
        }
    }
}

impl ChartReference {
    /// Creates a bare reference carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns true if every field other than the name is at its
    /// default, i.e. the reference can round-trip as a bare scalar.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        let bare = Self::named(self.name.clone());
        *self == bare
    }

    /// Returns the version for cache keying; unset versions share the
    /// empty key.
    #[must_use]
    pub fn version_key(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }

    /// Returns the chart's base name: the segment after the last `/`.
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Returns the registry repository name for a `repo/chart` style
    /// reference, or `None` for single-segment names.
    #[must_use]
    pub fn repository_name(&self) -> Option<&str> {
        let (repo, _) = self.name.split_once('/')?;
        Some(repo)
    }

    /// A chart reference is remote unless a path matching its name
    /// exists relative to the base path.
    #[must_use]
    pub fn is_remote(&self, base: &Path) -> bool {
        !base.join(&self.name).exists()
    }

    /// A local (non-remote) reference is an archive unless it resolves
    /// to a directory.
    #[must_use]
    pub fn is_local_archive(&self, base: &Path) -> bool {
        !base.join(&self.name).is_dir()
    }
}

impl Serialize for ChartReference {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_bare() {
            serializer.serialize_str(&self.name)
        } else {
            RawChart::from(self).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ChartReference {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChartVisitor;

        impl<'de> Visitor<'de> for ChartVisitor {
            type Value = ChartReference;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a chart name string or a chart mapping")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value.is_empty() {
                    return Err(E::custom("chart name is empty"));
                }
                Ok(ChartReference::named(value))
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let raw = RawChart::deserialize(de::value::MapAccessDeserializer::new(map))?;
                if raw.name.is_empty() {
                    return Err(de::Error::custom("chart name is empty"));
                }
                Ok(ChartReference::from(raw))
            }
        }

        // Any other node shape falls through to the visitor's
        // `expecting` message, which serde_yaml tags with the source
        // position for diagnostics.
        deserializer.deserialize_any(ChartVisitor)
    }
}

impl fmt::Display for ChartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
