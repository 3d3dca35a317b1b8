use crate::options::{GeneralizationOptions, MAX_ENTRIES, REDUCTION_RATE, TOLERANCE_VALUE};
use crate::{ConfigError, Generalize, GeneralizationError, Sample, Series, SeriesCollection};

/// Douglas-Peucker simplification over the (timestamp, value) plane.
///
/// Interior samples whose perpendicular distance to the line between the
/// ends of their range stays below `tolerance` are dropped. Timestamps
/// and values are not normalized against each other, so the tolerance
/// has to be chosen in value units with millisecond spacing in mind.
#[derive(Debug, Clone, PartialEq)]
pub struct DouglasPeucker {
    pub tolerance: f64,
    /// Largest series this generalizer accepts; `None` is unlimited.
    pub max_entries: Option<usize>,
    /// Expected reduction (3 means a third of the input). Advisory only,
    /// the simplification never reads it.
    pub reduction_rate: Option<u64>,
}

impl Default for DouglasPeucker {
    fn default() -> Self {
        DouglasPeucker {
            tolerance: 0.1,
            max_entries: None,
            reduction_rate: None,
        }
    }
}

impl DouglasPeucker {
    pub fn new(tolerance: f64) -> Self {
        DouglasPeucker {
            tolerance,
            ..Default::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn from_options(opts: &GeneralizationOptions) -> Result<Self, ConfigError> {
        let mut dp = DouglasPeucker::default();

        if let Some(max) = opts.get_parsed::<i64>(MAX_ENTRIES)? {
            dp.max_entries = unlimited_or_count(MAX_ENTRIES, max)?;
        }
        if let Some(rate) = opts.get_parsed::<i64>(REDUCTION_RATE)? {
            dp.reduction_rate = unlimited_or_count(REDUCTION_RATE, rate)?.map(|r| r as u64);
        }
        if let Some(tolerance) = opts.get_parsed::<f64>(TOLERANCE_VALUE)? {
            if !tolerance.is_finite() {
                return Err(ConfigError::OutOfRange {
                    key: TOLERANCE_VALUE.to_string(),
                    value: tolerance.to_string(),
                    reason: "must be finite",
                });
            }
            dp.tolerance = tolerance;
        }
        Ok(dp)
    }

    pub fn generalize_series(
        &self,
        id: &str,
        series: &Series,
    ) -> Result<Series, GeneralizationError> {
        let n = series.len();
        if n < 3 || self.tolerance <= 0.0 {
            return Ok(series.clone());
        }
        if let Some(allowed) = self.max_entries {
            if n > allowed {
                return Err(GeneralizationError::MaxEntriesExceeded {
                    series: id.to_string(),
                    actual: n,
                    allowed,
                });
            }
        }
        Ok(series.with_samples(simplify(&series.samples, self.tolerance)))
    }
}

impl Generalize for DouglasPeucker {
    fn name(&self) -> &'static str {
        "Douglas-Peucker"
    }

    fn generalize(&self, data: &SeriesCollection) -> Result<SeriesCollection, GeneralizationError> {
        data.try_map(|id, series| self.generalize_series(id, series))
    }
}

fn unlimited_or_count(key: &str, raw: i64) -> Result<Option<usize>, ConfigError> {
    match raw {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as usize)),
        n => Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value: n.to_string(),
            reason: "must be -1 or a non-negative count",
        }),
    }
}

// Marks retained indices with an explicit stack of index ranges. Both
// ends of a range are always retained. No-data samples have no line to
// measure against, so every run of them is kept and only the stretches
// of valid samples between runs are simplified.
fn simplify(samples: &[Sample], tolerance: f64) -> Vec<Sample> {
    let n = samples.len();
    let mut keep: Vec<bool> = samples.iter().map(Sample::is_no_data).collect();
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = valid_stretches(samples);
    for &(first, last) in &stack {
        keep[first] = true;
        keep[last] = true;
    }

    while let Some((first, last)) = stack.pop() {
        if last - first < 2 {
            continue;
        }
        let (Some(v0), Some(v1)) = (samples[first].value, samples[last].value) else {
            keep[first..=last].fill(true);
            continue;
        };
        let line = Line::new(samples[first].timestamp, v0, samples[last].timestamp, v1);

        let mut farthest: Option<(usize, f64)> = None;
        for (i, sample) in samples.iter().enumerate().take(last).skip(first + 1) {
            let Some(v) = sample.value else { continue };
            let d = line.distance(sample.timestamp, v);
            if farthest.map_or(true, |(_, d_max)| d > d_max) {
                farthest = Some((i, d));
            }
        }

        if let Some((i_max, d_max)) = farthest {
            if d_max >= tolerance {
                keep[i_max] = true;
                // Left range on top keeps the depth-first order of a recursion.
                stack.push((i_max, last));
                stack.push((first, i_max));
            }
        }
    }

    samples
        .iter()
        .zip(keep)
        .filter_map(|(s, k)| k.then_some(*s))
        .collect()
}

// Inclusive index ranges of the maximal runs of samples with data.
fn valid_stretches(samples: &[Sample]) -> Vec<(usize, usize)> {
    let mut stretches = Vec::new();
    let mut start = None;
    for (i, sample) in samples.iter().enumerate() {
        match (sample.is_no_data(), start) {
            (false, None) => start = Some(i),
            (true, Some(first)) => {
                stretches.push((first, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(first) = start {
        stretches.push((first, samples.len() - 1));
    }
    stretches
}

// Line through two samples, in coordinates relative to the first one to
// keep epoch-millisecond magnitudes out of the cross product.
struct Line {
    t0: i64,
    v0: f64,
    dt: f64,
    dv: f64,
    len: f64,
}

impl Line {
    fn new(t0: i64, v0: f64, t1: i64, v1: f64) -> Self {
        let dt = (t1 - t0) as f64;
        let dv = v1 - v0;
        Line {
            t0,
            v0,
            dt,
            dv,
            len: dt.hypot(dv),
        }
    }

    /// Perpendicular distance of (t, v) to the line. Degenerates to the
    /// point distance when both ends coincide.
    fn distance(&self, t: i64, v: f64) -> f64 {
        let x = (t - self.t0) as f64;
        let y = v - self.v0;
        if self.len == 0.0 {
            return x.hypot(y);
        }
        (self.dt * y - self.dv * x).abs() / self.len
    }
}
