//! Best-effort JSON repair for structured-output decoding (§4.5).
//!
//! A drop-in replacement for `serde_json::from_str` that, when the
//! `json-repair` feature is enabled, retries a failed parse through the
//! `jsonrepair` crate before giving up. Valid JSON takes the zero-overhead
//! fast path regardless of the feature flag.

#[cfg(feature = "json-repair")]
pub fn parse_json_with_repair<T: serde::de::DeserializeOwned>(
    json_str: &str,
) -> Result<T, serde_json::Error> {
    use jsonrepair::{repair_json, Options};

    match serde_json::from_str::<T>(json_str) {
        Ok(val) => Ok(val),
        Err(original_err) => match repair_json(json_str, &Options::default()) {
            Ok(repaired) => match serde_json::from_str(&repaired) {
                Ok(val) => {
                    tracing::debug!(original = json_str, repaired = %repaired, "repaired malformed structured output");
                    Ok(val)
                }
                Err(_) => Err(original_err),
            },
            Err(repair_err) => {
                tracing::debug!(error = %repair_err, "json repair failed");
                Err(original_err)
            }
        },
    }
}

#[cfg(not(feature = "json-repair"))]
#[inline]
pub fn parse_json_with_repair<T: serde::de::DeserializeOwned>(
    json_str: &str,
) -> Result<T, serde_json::Error> {
    serde_json::from_str(json_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_json_parses_on_the_fast_path() {
        let value: serde_json::Value = parse_json_with_repair(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    #[cfg(not(feature = "json-repair"))]
    fn invalid_json_fails_without_the_feature() {
        let result: Result<serde_json::Value, _> = parse_json_with_repair("{name: 'Ada'}");
        assert!(result.is_err());
    }

    #[test]
    #[cfg(feature = "json-repair")]
    fn invalid_json_is_repaired_with_the_feature() {
        let value: serde_json::Value = parse_json_with_repair("{name: 'Ada', age: 30,}").unwrap();
        assert_eq!(value["name"], "Ada");
    }
}
