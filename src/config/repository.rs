//! Repository configuration: a named chart source.

use serde::{Deserialize, Serialize};

/// Connection details for one named chart source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Registry-wide unique name, referenced by `repo/chart` names.
    pub name: String,
    /// Repository base URL.
    pub url: String,
    /// Repository username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Repository password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// CA bundle for verifying HTTPS servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,
    /// Client SSL certificate file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<String>,
    /// Client SSL key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    /// Skip server certificate verification.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
}

impl RepositoryConfig {
    /// Creates a repository config with just a name and URL.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        let repo = RepositoryConfig {
            name: String::from("stable"),
            url: String::from("https://charts.example.com/stable"),
            username: Some(String::from("deploy")),
            ..RepositoryConfig::default()
        };

        let yaml = serde_yaml::to_string(&repo).expect("encode failed");
        let back: RepositoryConfig = serde_yaml::from_str(&yaml).expect("decode failed");
        assert_eq!(back, repo);
    }

    #[test]
    fn omits_unset_auth_fields() {
        let repo = RepositoryConfig::new("stable", "https://charts.example.com");
        let yaml = serde_yaml::to_string(&repo).expect("encode failed");
        assert!(!yaml.contains("username"));
        assert!(!yaml.contains("insecure"));
    }
}
