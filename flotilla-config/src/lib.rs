//! Configuration used within Flotilla.
//!
//! A few notes on the structure of this crate.
//!
//! * The [`node`] module holds the untyped document tree that loaders produce
//!   and the engine resolves. Nothing in the tree is validated until it is
//!   converted into one of the typed configuration objects.
//! * Typed configuration objects ([`BenchmarkSpec`], [`VmGroup`], [`VmSpec`],
//!   [`StaticMachine`]) are considered immutable once resolved and are
//!   constructed programmatically through their builders.
//! * [`Settings`] control the behavior of the engine itself and are loaded from
//!   layered sources.

pub mod benchmark;
pub mod machine;
pub mod node;
pub mod settings;
pub mod vm;

pub use benchmark::BenchmarkSpec;
pub use benchmark::VmGroup;
pub use machine::StaticMachine;
pub use node::KeyPath;
pub use node::RawNode;
pub use settings::FailurePolicy;
pub use settings::Settings;
pub use vm::DiskSpec;
pub use vm::VmSpec;
