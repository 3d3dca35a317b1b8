use std::ops::Range;

use crate::options::{GeneralizationOptions, NO_DATA_GAP_THRESHOLD, THRESHOLD};
use crate::{ConfigError, Generalize, GeneralizationError, Sample, Series, SeriesCollection};

/// Largest Triangle Three Buckets (LTTB) downsampling algorithm.
///
/// Reduces a series to `max_output_values` samples while preserving the
/// visual shape of the data. The first and last samples are always kept
/// and every interior bucket contributes exactly one sample.
///
/// Runs of no-data samples are carried through: a bucket whose no-data
/// count exceeds the gap threshold is represented by its average point,
/// and a bucket following a no-data sample is represented by a no-data
/// marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Lttb {
    pub max_output_values: usize,
    /// A fraction of the bucket size when `<= 1`, an absolute count of
    /// no-data samples otherwise.
    pub no_data_gap_threshold: f64,
}

impl Default for Lttb {
    fn default() -> Self {
        Lttb {
            max_output_values: 200,
            no_data_gap_threshold: 0.2,
        }
    }
}

impl Lttb {
    pub fn new(max_output_values: usize) -> Self {
        Lttb {
            max_output_values,
            ..Default::default()
        }
    }

    pub fn with_no_data_gap_threshold(mut self, threshold: f64) -> Self {
        self.no_data_gap_threshold = threshold;
        self
    }

    pub fn from_options(opts: &GeneralizationOptions) -> Result<Self, ConfigError> {
        let mut lttb = Lttb::default();
        if let Some(threshold) = opts.get_parsed::<f64>(THRESHOLD)? {
            lttb.max_output_values = non_negative(THRESHOLD, threshold)? as usize;
        }
        if let Some(gap) = opts.get_parsed::<f64>(NO_DATA_GAP_THRESHOLD)? {
            lttb.no_data_gap_threshold = non_negative(NO_DATA_GAP_THRESHOLD, gap)?;
        }
        Ok(lttb)
    }

    /// Returns the series unchanged if `max_output_values` is 0 or not
    /// smaller than the series length.
    pub fn generalize_series(&self, series: &Series) -> Series {
        let n = series.len();
        if self.max_output_values >= n || self.max_output_values == 0 {
            return series.clone();
        }
        series.with_samples(self.downsample(&series.samples))
    }

    // Requires 0 < max_output_values < samples.len().
    fn downsample(&self, data: &[Sample]) -> Vec<Sample> {
        let n = data.len();
        let threshold = self.max_output_values;

        let mut sampled = Vec::with_capacity(threshold.max(2));
        sampled.push(data[0]);

        if threshold > 2 {
            let bucket_size = (n - 2) as f64 / (threshold - 2) as f64;
            let gap_limit = self.gap_limit(bucket_size);

            // Index of the previous bucket's pick: the left triangle vertex.
            let mut a_idx = 0usize;

            for i in 0..(threshold - 2) {
                let bucket = bucket_range(i, bucket_size, n);

                // A no-data first sample is emitted twice: as itself and as
                // the marker for bucket 0.
                let left = data[a_idx];
                let Some(left_value) = left.value else {
                    sampled.push(Sample::no_data(left.timestamp));
                    a_idx = bucket.end - 1;
                    continue;
                };

                // Average of next bucket for the triangle area calculation.
                let right = BucketAverage::over(&data[bucket_range(i + 1, bucket_size, n)], gap_limit);
                let right_value = right.value.unwrap_or(left_value);
                let left_ts = left.timestamp as f64;

                let mut max_area = -1.0f64;
                let mut max_idx = None;
                let mut no_data = 0usize;
                let mut gap_exceeded = false;

                for j in bucket.clone() {
                    let middle = data[j];
                    let Some(middle_value) = middle.value else {
                        no_data += 1;
                        if no_data as f64 > gap_limit {
                            gap_exceeded = true;
                            break;
                        }
                        continue;
                    };
                    let area = ((left_ts - right.timestamp) * (middle_value - left_value)
                        - (left_ts - middle.timestamp as f64) * (right_value - left_value))
                        .abs()
                        * 0.5;
                    if area > max_area {
                        max_area = area;
                        max_idx = Some(j);
                    }
                }

                match max_idx {
                    Some(j) if !gap_exceeded => {
                        sampled.push(data[j]);
                        a_idx = j;
                    }
                    _ => {
                        tracing::trace!(bucket = i, "no-data gap, using bucket average");
                        sampled.push(BucketAverage::over(&data[bucket.clone()], gap_limit).to_sample());
                        a_idx = bucket.end - 1;
                    }
                }
            }
        }

        sampled.push(data[n - 1]);
        sampled
    }

    // Number of no-data samples a window may hold before it counts as a gap.
    fn gap_limit(&self, bucket_size: f64) -> f64 {
        if self.no_data_gap_threshold <= 1.0 {
            self.no_data_gap_threshold * bucket_size
        } else {
            self.no_data_gap_threshold
        }
    }
}

impl Generalize for Lttb {
    fn name(&self) -> &'static str {
        "LargestTriangleThreeBuckets"
    }

    fn generalize(&self, data: &SeriesCollection) -> Result<SeriesCollection, GeneralizationError> {
        data.try_map(|_, series| Ok(self.generalize_series(series)))
    }
}

fn non_negative(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a finite, non-negative number",
        })
    }
}

// Input indices of interior bucket `i`. The first and last samples sit
// outside every bucket; the window past the last bucket is just the last
// sample.
fn bucket_range(i: usize, bucket_size: f64, n: usize) -> Range<usize> {
    let start = ((i as f64 * bucket_size).floor() as usize + 1).min(n - 1);
    let end = (((i + 1) as f64 * bucket_size).floor() as usize + 1).min(n);
    start..end.max(start + 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BucketAverage {
    timestamp: f64,
    value: Option<f64>,
}

impl BucketAverage {
    /// Mean timestamp over the whole window and mean value over its
    /// samples with data. Values stop accumulating once the window has
    /// seen `gap_limit` no-data samples; timestamps never do.
    fn over(window: &[Sample], gap_limit: f64) -> Self {
        let mut ts_sum = 0i128;
        let mut value_sum = 0.0f64;
        let mut value_count = 0usize;
        let mut no_data = 0usize;
        let mut gap_reached = false;

        for sample in window {
            ts_sum += sample.timestamp as i128;
            if gap_reached {
                continue;
            }
            match sample.value {
                Some(v) => {
                    value_sum += v;
                    value_count += 1;
                }
                None => {
                    no_data += 1;
                    gap_reached = no_data as f64 >= gap_limit;
                }
            }
        }

        BucketAverage {
            timestamp: ts_sum as f64 / window.len().max(1) as f64,
            value: (value_count > 0).then(|| value_sum / value_count as f64),
        }
    }

    fn to_sample(self) -> Sample {
        Sample {
            timestamp: self.timestamp as i64,
            value: self.value,
        }
    }
}
