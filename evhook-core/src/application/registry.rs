//! Routing table from endpoint path to application.

use super::Application;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("url path {0:?} is used by more than one application")]
    DuplicatePath(String),
}

/// Applications served by one listener, keyed by their unique path.
#[derive(Debug, Default, Clone)]
pub struct ApplicationRegistry {
    applications: HashMap<String, Arc<Application>>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, failing on the first duplicate path.
    pub fn from_applications(
        applications: impl IntoIterator<Item = Application>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for application in applications {
            registry.insert(application)?;
        }
        Ok(registry)
    }

    /// Add an application. Its handler table is frozen from here on.
    pub fn insert(&mut self, application: Application) -> Result<(), RegistryError> {
        let path = application.url_path().to_owned();
        if self.applications.contains_key(&path) {
            return Err(RegistryError::DuplicatePath(path));
        }
        self.applications.insert(path, Arc::new(application));
        Ok(())
    }

    /// The application serving `path`.
    pub fn get(&self, path: &str) -> Option<&Arc<Application>> {
        self.applications.get(path)
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<_> = self.applications.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}
