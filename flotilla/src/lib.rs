//! Flotilla.

#[cfg(feature = "config")]
#[doc(inline)]
pub use flotilla_config as config;
#[cfg(feature = "config")]
#[doc(inline)]
pub use flotilla_config::Settings;
#[cfg(feature = "engine")]
#[doc(inline)]
pub use flotilla_engine as engine;
#[cfg(feature = "engine")]
#[doc(inline)]
pub use flotilla_engine::Engine;
