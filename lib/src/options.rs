use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::ConfigError;

/// Turns generalization off when explicitly `false`.
pub const GENERALIZE: &str = "generalize";
/// Algorithm selector: `LTTB`, `DP` or unset.
pub const GENERALIZING_ALGORITHM: &str = "generalizing_algorithm";
/// Douglas-Peucker: maximum input size, -1 is unlimited.
pub const MAX_ENTRIES: &str = "MAX_ENTRIES";
/// Douglas-Peucker: advisory reduction rate.
pub const REDUCTION_RATE: &str = "REDUCTION_RATE";
/// Douglas-Peucker: absolute perpendicular distance tolerance.
pub const TOLERANCE_VALUE: &str = "TOLERANCE_VALUE";
/// LTTB: target number of output samples.
pub const THRESHOLD: &str = "threshold";
/// LTTB: fraction of a bucket (<= 1) or absolute count (> 1) of no-data samples.
pub const NO_DATA_GAP_THRESHOLD: &str = "noDataGapThreshold";

/// A flat bag of request options. Keys are matched case-insensitively and
/// values are kept as the raw strings the caller supplied; parsing happens
/// when a generalizer is built from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneralizationOptions {
    params: BTreeMap<String, String>,
}

impl GeneralizationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Display) {
        self.params
            .insert(key.to_ascii_lowercase(), value.to_string().trim().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Copies every option of `other` over this bag.
    pub fn merge(&mut self, other: &GeneralizationOptions) {
        for (k, v) in &other.params {
            self.params.insert(k.clone(), v.clone());
        }
    }

    /// Parses the value stored under `key`. Absent keys yield `Ok(None)`.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Parses a boolean option, accepting `true`/`false` in any case.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(raw) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// Parses a `key=value` pair as given on a command line.
    pub fn parse_pair(pair: &str) -> Result<(String, String), ConfigError> {
        match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
            _ => Err(ConfigError::InvalidValue {
                key: "option".to_string(),
                value: pair.to_string(),
            }),
        }
    }
}

impl<K: AsRef<str>, V: Display> FromIterator<(K, V)> for GeneralizationOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut opts = GeneralizationOptions::new();
        for (k, v) in iter {
            opts.set(k.as_ref(), v);
        }
        opts
    }
}

// Accepts any JSON scalar as a value so that `{"threshold": 100}` and
// `{"threshold": "100"}` mean the same thing.
impl<'de> Deserialize<'de> for GeneralizationOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let opts = GeneralizationOptions::new().with(TOLERANCE_VALUE, 0.5);
        assert_eq!(opts.get("tolerance_value"), Some("0.5"));
        assert_eq!(opts.get("Tolerance_Value"), Some("0.5"));
        assert!(opts.contains(TOLERANCE_VALUE));
        assert!(!opts.contains(THRESHOLD));
    }

    #[test]
    fn parsed_values() {
        let opts = GeneralizationOptions::new()
            .with(MAX_ENTRIES, " 42 ")
            .with(THRESHOLD, "ten");
        assert_eq!(opts.get_parsed::<i64>(MAX_ENTRIES), Ok(Some(42)));
        assert_eq!(opts.get_parsed::<f64>(NO_DATA_GAP_THRESHOLD), Ok(None));
        assert_eq!(
            opts.get_parsed::<f64>(THRESHOLD),
            Err(ConfigError::InvalidValue {
                key: THRESHOLD.to_string(),
                value: "ten".to_string()
            })
        );
    }

    #[test]
    fn bool_values() {
        let opts = GeneralizationOptions::new()
            .with(GENERALIZE, "FALSE")
            .with("other", "yes");
        assert_eq!(opts.get_bool(GENERALIZE), Ok(Some(false)));
        assert!(opts.get_bool("other").is_err());
        assert_eq!(opts.get_bool("missing"), Ok(None));
    }

    #[test]
    fn pairs() {
        assert_eq!(
            GeneralizationOptions::parse_pair("threshold=100"),
            Ok(("threshold".to_string(), "100".to_string()))
        );
        assert!(GeneralizationOptions::parse_pair("threshold").is_err());
        assert!(GeneralizationOptions::parse_pair("=1").is_err());
    }

    #[test]
    fn deserialize_json_scalars() {
        let opts: GeneralizationOptions = serde_json::from_str(
            r#"{"generalizing_algorithm":"lttb","threshold":100,"generalize":true}"#,
        )
        .unwrap();
        assert_eq!(opts.get(GENERALIZING_ALGORITHM), Some("lttb"));
        assert_eq!(opts.get_parsed::<f64>(THRESHOLD), Ok(Some(100.0)));
        assert_eq!(opts.get_bool(GENERALIZE), Ok(Some(true)));
    }

    #[test]
    fn merge_overrides() {
        let mut base = GeneralizationOptions::new().with(THRESHOLD, 10).with(MAX_ENTRIES, 5);
        base.merge(&GeneralizationOptions::new().with(THRESHOLD, 20));
        assert_eq!(base.get(THRESHOLD), Some("20"));
        assert_eq!(base.get(MAX_ENTRIES), Some("5"));
    }
}
