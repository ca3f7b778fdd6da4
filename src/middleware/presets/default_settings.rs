//! Merges a baseline [`SamplingParams`] under caller-supplied overrides.

use crate::middleware::LanguageModelMiddleware;
use crate::types::{GenerateOptions, SamplingParams};

/// Fills in whichever `sampling` fields the caller left unset, from a
/// baseline configured once at construction time. Caller-provided values
/// always win; this only plugs holes.
#[derive(Debug, Clone)]
pub struct DefaultSettingsMiddleware {
    baseline: SamplingParams,
}

impl DefaultSettingsMiddleware {
    pub fn new(baseline: SamplingParams) -> Self {
        Self { baseline }
    }
}

impl LanguageModelMiddleware for DefaultSettingsMiddleware {
    fn transform_params(&self, mut options: GenerateOptions) -> GenerateOptions {
        let sampling = &mut options.sampling;
        let baseline = &self.baseline;

        sampling.temperature = sampling.temperature.or(baseline.temperature);
        sampling.top_p = sampling.top_p.or(baseline.top_p);
        sampling.max_tokens = sampling.max_tokens.or(baseline.max_tokens);
        sampling.frequency_penalty = sampling.frequency_penalty.or(baseline.frequency_penalty);
        sampling.presence_penalty = sampling.presence_penalty.or(baseline.presence_penalty);
        sampling.seed = sampling.seed.or(baseline.seed);
        if sampling.stop_sequences.is_empty() {
            sampling.stop_sequences = baseline.stop_sequences.clone();
        }

        options
    }
}
