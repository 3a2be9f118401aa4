//! Loading template markup from external sources
//!
//! Used by [`Dispatcher::add_from_source`](crate::dispatch::Dispatcher::add_from_source),
//! which treats the source location as the template key.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading markup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Nothing exists at the location
    #[error("template source not found: {path}")]
    NotFound { path: PathBuf },

    /// The location exists but could not be read
    #[error("error reading template source {path}: {message}")]
    Read { path: PathBuf, message: String },
}

/// A source of template markup addressed by location
pub trait MarkupLoader {
    fn load(&self, location: &str) -> Result<String, LoadError>;
}

impl<F> MarkupLoader for F
where
    F: Fn(&str) -> Result<String, LoadError>,
{
    fn load(&self, location: &str) -> Result<String, LoadError> {
        self(location)
    }
}

/// Loads markup from the filesystem
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base_path: Option<PathBuf>,
}

impl FileLoader {
    /// Create a loader resolving locations against the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader resolving relative locations against `base_path`
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    pub fn base_path(&self) -> Option<&PathBuf> {
        self.base_path.as_ref()
    }

    /// Resolve a location to a filesystem path
    pub fn resolve_path(&self, location: &str) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(location),
            None => PathBuf::from(location),
        }
    }
}

impl MarkupLoader for FileLoader {
    fn load(&self, location: &str) -> Result<String, LoadError> {
        let path = self.resolve_path(location);
        if !path.is_file() {
            return Err(LoadError::NotFound { path });
        }
        std::fs::read_to_string(&path).map_err(|e| LoadError::Read {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}
