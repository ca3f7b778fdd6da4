//! Normalized, provider-agnostic token usage accounting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Breakdown of `input_tokens`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDetails {
    pub no_cache_tokens: Option<u64>,
    pub cache_read_tokens: Option<u64>,
    pub cache_write_tokens: Option<u64>,
}

/// Breakdown of `output_tokens`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDetails {
    pub text_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
}

/// Normalized usage for a single provider round-trip, or an aggregate over
/// several. Every field is optional because providers disclose different
/// subsets of this information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub input_details: InputDetails,
    pub output_details: OutputDetails,
    /// Provider-specific fields that don't map onto the normalized shape.
    #[serde(default)]
    pub raw: HashMap<String, serde_json::Value>,
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}

impl Usage {
    /// Component-wise sum. A component is only `None` in the result if it was
    /// `None` in every input; otherwise missing values contribute zero.
    pub fn merge(&self, other: &Usage) -> Usage {
        Usage {
            input_tokens: add_optional(self.input_tokens, other.input_tokens),
            output_tokens: add_optional(self.output_tokens, other.output_tokens),
            total_tokens: add_optional(self.total_tokens, other.total_tokens),
            input_details: InputDetails {
                no_cache_tokens: add_optional(
                    self.input_details.no_cache_tokens,
                    other.input_details.no_cache_tokens,
                ),
                cache_read_tokens: add_optional(
                    self.input_details.cache_read_tokens,
                    other.input_details.cache_read_tokens,
                ),
                cache_write_tokens: add_optional(
                    self.input_details.cache_write_tokens,
                    other.input_details.cache_write_tokens,
                ),
            },
            output_details: OutputDetails {
                text_tokens: add_optional(
                    self.output_details.text_tokens,
                    other.output_details.text_tokens,
                ),
                reasoning_tokens: add_optional(
                    self.output_details.reasoning_tokens,
                    other.output_details.reasoning_tokens,
                ),
            },
            // Raw per-step fields don't have a sensible merge; keep the
            // latter's so aggregation always reflects the most recent step.
            raw: if other.raw.is_empty() { self.raw.clone() } else { other.raw.clone() },
        }
    }

    /// Component-wise sum across a sequence of per-step usages. Returns
    /// `None` only when `steps` is empty.
    pub fn merge_all<'a>(steps: impl IntoIterator<Item = &'a Usage>) -> Option<Usage> {
        let mut iter = steps.into_iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, next| acc.merge(next)))
    }
}
