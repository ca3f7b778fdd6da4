//! Provider-facing traits.

mod language_model;

pub use language_model::{LanguageModel, ModelCapabilities, ModelIdentity};

#[cfg(test)]
pub(crate) use language_model::test_support;
