//! Dispatcher options
//!
//! [`Options`] is the fully resolved configuration for one call. Callers pass
//! [`Overrides`], which are merged over the dispatcher's defaults on every
//! invocation. Overrides can also be read from a loose JSON value, in which
//! case unrecognized `type` / `removeType` values fall back to their defaults
//! and non-boolean flags are ignored. Default options can be loaded from a
//! TOML file with the same keys.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when loading options from a file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse options TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// TOML structure for deserializing default options
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct TomlOptions {
    delete_compiled: Option<bool>,
    store_compiled: Option<bool>,
    refill: Option<bool>,
    remove_type: Option<String>,
    #[serde(rename = "type")]
    output: Option<String>,
    validate: Option<bool>,
}

/// Which rendered nodes to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveType {
    /// Remove nothing
    #[default]
    None,
    /// Only nodes rendered from the same template key
    Same,
    /// Every rendered node under the target
    All,
}

impl RemoveType {
    /// Parse case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(RemoveType::None),
            "SAME" => Some(RemoveType::Same),
            "ALL" => Some(RemoveType::All),
            _ => None,
        }
    }
}

/// Shape of the value produced by an add
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Wrap the fragment in a tagged container appended to the target
    #[default]
    Append,
    /// Return the fragment as a queryable document
    Html,
    /// Return the fragment string
    Raw,
    /// Alias of [`OutputType::Raw`]
    Compiled,
}

impl OutputType {
    /// Parse case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPEND" => Some(OutputType::Append),
            "HTML" => Some(OutputType::Html),
            "RAW" => Some(OutputType::Raw),
            "COMPILED" => Some(OutputType::Compiled),
            _ => None,
        }
    }
}

/// Resolved options for a dispatcher call
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Evict compiled templates of removed nodes
    pub delete_compiled: bool,
    /// Keep compiled templates in the cache after rendering
    pub store_compiled: bool,
    /// Allow rendering a template that is already rendered in the target
    pub refill: bool,
    /// Which existing nodes to remove before adding
    pub remove_type: RemoveType,
    /// Output shape of an add
    pub output: OutputType,
    /// Treat empty data as a no-op
    pub validate: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delete_compiled: true,
            store_compiled: true,
            refill: true,
            remove_type: RemoveType::None,
            output: OutputType::Append,
            validate: true,
        }
    }
}

impl Options {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a TOML file, starting from defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load options from a TOML string, starting from defaults
    ///
    /// Keys use the same camelCase names as loose overrides. Flags must be
    /// booleans; unrecognized `type` / `removeType` names fall back to their
    /// defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlOptions = toml::from_str(content)?;

        let overrides = Overrides {
            delete_compiled: parsed.delete_compiled,
            store_compiled: parsed.store_compiled,
            refill: parsed.refill,
            remove_type: parsed
                .remove_type
                .map(|v| RemoveType::parse(&v).unwrap_or_default()),
            output: parsed
                .output
                .map(|v| OutputType::parse(&v).unwrap_or_default()),
            validate: parsed.validate,
        };
        Ok(Self::default().merge(&overrides))
    }

    pub fn with_delete_compiled(mut self, delete: bool) -> Self {
        self.delete_compiled = delete;
        self
    }

    pub fn with_store_compiled(mut self, store: bool) -> Self {
        self.store_compiled = store;
        self
    }

    pub fn with_refill(mut self, refill: bool) -> Self {
        self.refill = refill;
        self
    }

    pub fn with_remove_type(mut self, remove_type: RemoveType) -> Self {
        self.remove_type = remove_type;
        self
    }

    pub fn with_output(mut self, output: OutputType) -> Self {
        self.output = output;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Apply overrides on top of these options
    pub fn merge(&self, overrides: &Overrides) -> Options {
        Options {
            delete_compiled: overrides.delete_compiled.unwrap_or(self.delete_compiled),
            store_compiled: overrides.store_compiled.unwrap_or(self.store_compiled),
            refill: overrides.refill.unwrap_or(self.refill),
            remove_type: overrides.remove_type.unwrap_or(self.remove_type),
            output: overrides.output.unwrap_or(self.output),
            validate: overrides.validate.unwrap_or(self.validate),
        }
    }
}

/// Partial options supplied by a caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub delete_compiled: Option<bool>,
    pub store_compiled: Option<bool>,
    pub refill: Option<bool>,
    pub remove_type: Option<RemoveType>,
    pub output: Option<OutputType>,
    pub validate: Option<bool>,
}

impl Overrides {
    /// No overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from a loose value such as `{"type": "html", "refill": false}`
    ///
    /// Non-object values yield no overrides.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        let flag = |key: &str| map.get(key).and_then(Value::as_bool);

        Self {
            delete_compiled: flag("deleteCompiled"),
            store_compiled: flag("storeCompiled"),
            refill: flag("refill"),
            remove_type: map.get("removeType").map(|v| {
                v.as_str()
                    .and_then(RemoveType::parse)
                    .unwrap_or_default()
            }),
            output: map
                .get("type")
                .map(|v| v.as_str().and_then(OutputType::parse).unwrap_or_default()),
            validate: flag("validate"),
        }
    }

    /// Later overrides take precedence over earlier ones
    pub fn then(&self, later: &Overrides) -> Overrides {
        Overrides {
            delete_compiled: later.delete_compiled.or(self.delete_compiled),
            store_compiled: later.store_compiled.or(self.store_compiled),
            refill: later.refill.or(self.refill),
            remove_type: later.remove_type.or(self.remove_type),
            output: later.output.or(self.output),
            validate: later.validate.or(self.validate),
        }
    }

    pub fn with_delete_compiled(mut self, delete: bool) -> Self {
        self.delete_compiled = Some(delete);
        self
    }

    pub fn with_store_compiled(mut self, store: bool) -> Self {
        self.store_compiled = Some(store);
        self
    }

    pub fn with_refill(mut self, refill: bool) -> Self {
        self.refill = Some(refill);
        self
    }

    pub fn with_remove_type(mut self, remove_type: RemoveType) -> Self {
        self.remove_type = Some(remove_type);
        self
    }

    pub fn with_output(mut self, output: OutputType) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }
}
