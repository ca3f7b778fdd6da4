//! Provider adapters (§4.1). [`openai_compatible`] is the one concrete
//! adapter shipped with the core; anything else implements
//! [`crate::traits::LanguageModel`] out-of-tree against the same contract.

pub mod config;
pub mod openai_compatible;
pub mod wire;

pub use config::OpenAiCompatConfig;
pub use openai_compatible::OpenAiCompatModel;
