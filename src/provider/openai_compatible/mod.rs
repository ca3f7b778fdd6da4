//! The reference OpenAI-compatible `LanguageModel` adapter (§4.1, §6).
//!
//! This is the only concrete provider shipped with the core; additional
//! providers are expected to implement [`crate::traits::LanguageModel`]
//! out-of-tree against the same contract.

mod model;

pub use model::OpenAiCompatModel;
