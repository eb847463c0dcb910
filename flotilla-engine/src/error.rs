//! Errors raised while resolving a document.

use flotilla_config::node::yaml;
use flotilla_config::KeyPath;
use thiserror::Error;

/// An error raised while resolving a document.
///
/// Every variant carries the dotted path of the offending value so that it can
/// be located in the source document without re-parsing it.
#[derive(Error, Debug)]
pub enum Error {
    /// An alias names a reference that is never defined.
    #[error("undefined reference `{name}` at `{path}`")]
    UndefinedReference {
        /// The name of the reference.
        name: String,

        /// The path of the alias.
        path: KeyPath,
    },

    /// A reference contains itself, directly or transitively.
    #[error("circular reference `{name}` at `{path}` (via {})", .chain.join(" -> "))]
    CircularReference {
        /// The name of the reference that closes the cycle.
        name: String,

        /// The references being expanded when the cycle was found, outermost
        /// first.
        chain: Vec<String>,

        /// The path at which the cycle was found.
        path: KeyPath,
    },

    /// A value does not have the expected shape.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path of the value.
        path: KeyPath,

        /// What was expected.
        expected: String,

        /// What was found.
        found: String,
    },

    /// A run-list entry names a benchmark that is not in the catalog.
    #[error("unknown benchmark `{name}` at `{path}`")]
    UnknownBenchmark {
        /// The name of the benchmark.
        name: String,

        /// The path of the run-list entry.
        path: KeyPath,
    },

    /// Not enough compatible static machines are available for a group.
    #[error(
        "insufficient static machines for group `{group}` of benchmark `{benchmark}` at \
         `{path}`: {required} required, {available} available"
    )]
    InsufficientStaticResources {
        /// The name of the benchmark.
        benchmark: String,

        /// The name of the group.
        group: String,

        /// The number of machines the group requires.
        required: usize,

        /// The number of compatible, unclaimed machines.
        available: usize,

        /// The path of the group.
        path: KeyPath,
    },

    /// A name that must be unique was declared more than once.
    #[error("duplicate {kind} `{name}` at `{path}` (first declared at `{first}`)")]
    DuplicateName {
        /// What kind of thing was duplicated (e.g., `static machine`).
        kind: &'static str,

        /// The duplicated name.
        name: String,

        /// The path of the duplicate.
        path: KeyPath,

        /// The path of the first declaration.
        first: KeyPath,
    },

    /// A value is well-typed but violates a constraint of the configuration.
    #[error("invalid configuration at `{path}`: {reason}")]
    InvalidSpec {
        /// The path of the value.
        path: KeyPath,

        /// Why the value is invalid.
        reason: String,
    },

    /// The document could not be loaded.
    #[error(transparent)]
    Load(yaml::Error),
}

impl Error {
    /// Gets the path of the offending value (if the error has one).
    pub fn path(&self) -> Option<&KeyPath> {
        match self {
            Error::UndefinedReference { path, .. }
            | Error::CircularReference { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::UnknownBenchmark { path, .. }
            | Error::InsufficientStaticResources { path, .. }
            | Error::DuplicateName { path, .. }
            | Error::InvalidSpec { path, .. } => Some(path),
            Error::Load(_) => None,
        }
    }

    /// Moves the error to `path`.
    ///
    /// Errors without a path are returned unchanged.
    pub(crate) fn relocate(mut self, to: KeyPath) -> Self {
        match &mut self {
            Error::UndefinedReference { path, .. }
            | Error::CircularReference { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::UnknownBenchmark { path, .. }
            | Error::InsufficientStaticResources { path, .. }
            | Error::DuplicateName { path, .. }
            | Error::InvalidSpec { path, .. } => *path = to,
            Error::Load(_) => {}
        }

        self
    }

    /// Creates a [`Error::TypeMismatch`].
    pub(crate) fn mismatch(
        path: &KeyPath,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            path: path.clone(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an [`Error::InvalidSpec`].
    pub(crate) fn invalid(path: &KeyPath, reason: impl Into<String>) -> Self {
        Error::InvalidSpec {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

impl From<yaml::Error> for Error {
    fn from(err: yaml::Error) -> Self {
        match err {
            yaml::Error::DuplicateKey { key, path } => Error::DuplicateName {
                kind: "mapping key",
                name: key,
                first: path.clone(),
                path,
            },
            err => Error::Load(err),
        }
    }
}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
