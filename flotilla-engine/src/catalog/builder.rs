//! A builder for a catalog [`Entry`].

use flotilla_config::RawNode;
use indexmap::IndexMap;

use crate::catalog::Entry;
use crate::name;
use crate::reference;

/// An error related to a [`Builder`].
#[derive(Debug)]
pub enum Error {
    /// A required value was missing for a builder field.
    Missing(&'static str),

    /// The benchmark name is not a valid name.
    InvalidName(String),

    /// The references within the default specification could not be
    /// resolved.
    InvalidDefaults(crate::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(field) => {
                write!(f, "missing required value for '{field}' in catalog entry builder")
            }
            Error::InvalidName(value) => {
                write!(f, "invalid benchmark name '{value}': expected {}", name::EXPECTED)
            }
            Error::InvalidDefaults(err) => write!(f, "invalid default specification: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A builder for an [`Entry`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The name of the benchmark.
    name: Option<String>,

    /// An optional description.
    description: Option<String>,

    /// The default specification.
    defaults: Option<RawNode>,

    /// Flags restricted to a set of allowed values.
    choices: IndexMap<String, Vec<RawNode>>,
}

impl Builder {
    /// Sets the name for the [`Builder`].
    ///
    /// # Notes
    ///
    /// This will silently overwrite any previous name set within the builder.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description for the [`Builder`].
    ///
    /// # Notes
    ///
    /// This will silently overwrite any previous description set within the
    /// builder.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default specification for the [`Builder`].
    ///
    /// # Notes
    ///
    /// This will silently overwrite any previous defaults set within the
    /// builder.
    pub fn defaults(mut self, defaults: impl Into<RawNode>) -> Self {
        self.defaults = Some(defaults.into());
        self
    }

    /// Restricts the flag `flag` to the values in `values`.
    ///
    /// # Notes
    ///
    /// This will silently overwrite any previous restriction of the same flag.
    pub fn choice<V>(mut self, flag: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<RawNode>,
    {
        self.choices
            .insert(flag.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Consumes `self` and attempts to build an [`Entry`].
    ///
    /// Any references within the defaults are expanded.
    pub fn try_build(self) -> Result<Entry> {
        let name = self.name.ok_or(Error::Missing("name"))?;
        let defaults = self.defaults.ok_or(Error::Missing("defaults"))?;

        if !name::is_valid(&name) {
            return Err(Error::InvalidName(name));
        }

        let defaults = reference::resolve(&defaults).map_err(Error::InvalidDefaults)?;

        Ok(Entry {
            name,
            description: self.description,
            defaults,
            choices: self.choices,
        })
    }
}
