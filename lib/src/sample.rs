use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A single point of a time series. A `None` value is an in-band no-data
/// marker, which is distinct from the sample not existing at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Sample {
            timestamp,
            value: Some(value),
        }
    }

    pub fn no_data(timestamp: i64) -> Self {
        Sample {
            timestamp,
            value: None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.value.is_none()
    }
}

// Side data travelling with a series. Generalization never touches it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reference_series: BTreeMap<String, Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_before_timespan: Option<Sample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_after_timespan: Option<Sample>,
}

/// An ordered sequence of samples for one series identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub metadata: SeriesMetadata,
}

impl Series {
    pub fn new(samples: Vec<Sample>) -> Self {
        Series {
            samples,
            metadata: SeriesMetadata::default(),
        }
    }

    pub fn with_metadata(samples: Vec<Sample>, metadata: SeriesMetadata) -> Self {
        Series { samples, metadata }
    }

    /// Returns a series carrying `samples` and a copy of this series' metadata.
    pub fn with_samples(&self, samples: Vec<Sample>) -> Self {
        Series {
            samples,
            metadata: self.metadata.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn no_data_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_no_data()).count()
    }
}

/// Series keyed by identifier. Iteration order is the key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesCollection(BTreeMap<String, Series>);

impl SeriesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series, returning the one previously stored under `id`.
    pub fn insert(&mut self, id: impl Into<String>, series: Series) -> Option<Series> {
        self.0.insert(id.into(), series)
    }

    pub fn get(&self, id: &str) -> Option<&Series> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Series> {
        self.0.iter()
    }

    /// Moves every series of `other` into this collection, replacing
    /// series stored under the same identifier.
    pub fn extend(&mut self, other: SeriesCollection) {
        self.0.extend(other.0);
    }

    /// Applies `f` to every series and reassembles the results under the
    /// same identifiers. Stops at the first error.
    pub fn try_map<E, F>(&self, mut f: F) -> Result<SeriesCollection, E>
    where
        F: FnMut(&str, &Series) -> Result<Series, E>,
    {
        let mut out = BTreeMap::new();
        for (id, series) in &self.0 {
            out.insert(id.clone(), f(id, series)?);
        }
        Ok(SeriesCollection(out))
    }
}

impl<K: Into<String>> FromIterator<(K, Series)> for SeriesCollection {
    fn from_iter<I: IntoIterator<Item = (K, Series)>>(iter: I) -> Self {
        SeriesCollection(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for SeriesCollection {
    type Item = (String, Series);
    type IntoIter = btree_map::IntoIter<String, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SeriesCollection {
    type Item = (&'a String, &'a Series);
    type IntoIter = btree_map::Iter<'a, String, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
