//! Repository registry: the set of named chart sources.
//!
//! The registry enforces registry-wide name uniqueness and validates
//! every entry before mutating its state, so a failed add leaves the
//! registry unchanged.

use reqwest::Url;
use tracing::debug;

use crate::config::RepositoryConfig;
use crate::error::{ChartwaveError, RegistryError, Result};

/// Named chart sources, in registration order.
#[derive(Debug, Default)]
pub struct RepositoryRegistry {
    configs: Vec<RepositoryConfig>,
}

impl RepositoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            configs: Vec::new(),
        }
    }

    /// Adds a repository after validating it.
    ///
    /// # Errors
    ///
    /// Returns `NameEmpty`/`UrlEmpty` for blank required fields,
    /// `InvalidUrl` when the URL fails the syntactic check, and
    /// `Duplicate` when a repository with the same name is already
    /// registered. The registry is unchanged on any failure.
    pub fn add(&mut self, config: RepositoryConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(ChartwaveError::Registry(RegistryError::NameEmpty));
        }
        if config.url.is_empty() {
            return Err(ChartwaveError::Registry(RegistryError::UrlEmpty));
        }
        if Url::parse(&config.url).is_err() {
            return Err(ChartwaveError::Registry(RegistryError::InvalidUrl {
                url: config.url,
            }));
        }
        if self.configs.iter().any(|c| c.name == config.name) {
            return Err(ChartwaveError::Registry(RegistryError::Duplicate {
                name: config.name,
            }));
        }

        debug!("Registered repository {} -> {}", config.name, config.url);
        self.configs.push(config);
        Ok(())
    }

    /// Finds a repository by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no repository has that name.
    pub fn find(&self, name: &str) -> Result<&RepositoryConfig> {
        self.configs.iter().find(|c| c.name == name).ok_or_else(|| {
            ChartwaveError::Registry(RegistryError::NotFound {
                name: name.to_string(),
            })
        })
    }

    /// Removes a repository by name, returning its config.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no repository has that name.
    pub fn remove(&mut self, name: &str) -> Result<RepositoryConfig> {
        let index = self
            .configs
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                ChartwaveError::Registry(RegistryError::NotFound {
                    name: name.to_string(),
                })
            })?;

        Ok(self.configs.remove(index))
    }

    /// Returns all registered repositories in registration order.
    #[must_use]
    pub fn configs(&self) -> &[RepositoryConfig] {
        &self.configs
    }

    /// Consumes the registry, returning the repositories in
    /// registration order.
    #[must_use]
    pub fn into_configs(self) -> Vec<RepositoryConfig> {
        self.configs
    }

    /// Returns the number of registered repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns true if no repositories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn stable() -> RepositoryConfig {
        RepositoryConfig::new("stable", "https://charts.example.com/stable")
    }

    #[test]
    fn add_and_find() {
        let mut registry = RepositoryRegistry::new();
        registry.add(stable()).expect("add failed");

        let found = registry.find("stable").expect("find failed");
        assert_eq!(found.url, "https://charts.example.com/stable");
    }

    #[test]
    fn duplicate_add_fails_with_duplicate_kind() {
        let mut registry = RepositoryRegistry::new();
        registry.add(stable()).expect("first add failed");

        let err = registry.add(stable()).expect_err("second add should fail");
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn find_missing_fails_with_not_found_kind() {
        let registry = RepositoryRegistry::new();
        let err = registry.find("missing").expect_err("find should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn remove_missing_fails_with_not_found_kind() {
        let mut registry = RepositoryRegistry::new();
        let err = registry.remove("missing").expect_err("remove should fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut registry = RepositoryRegistry::new();

        let err = registry
            .add(RepositoryConfig::new("", "https://charts.example.com"))
            .expect_err("empty name should fail");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = registry
            .add(RepositoryConfig::new("stable", ""))
            .expect_err("empty url should fail");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn invalid_url_fails_before_any_mutation() {
        let mut registry = RepositoryRegistry::new();
        let err = registry
            .add(RepositoryConfig::new("stable", "not a url"))
            .expect_err("invalid url should fail");

        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert!(registry.is_empty());
    }
}
