use crate::options::{GeneralizationOptions, GENERALIZE, GENERALIZING_ALGORITHM};
use crate::{ConfigError, DouglasPeucker, GeneralizationError, Lttb, SeriesCollection};

/// A transform reducing every series of a collection. Implementations
/// keep the key set and each series' metadata as they are.
pub trait Generalize {
    fn name(&self) -> &'static str;
    fn generalize(&self, data: &SeriesCollection) -> Result<SeriesCollection, GeneralizationError>;
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl Generalize for Identity {
    fn name(&self) -> &'static str {
        "Identity"
    }

    fn generalize(&self, data: &SeriesCollection) -> Result<SeriesCollection, GeneralizationError> {
        Ok(data.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Generalizer {
    #[default]
    Identity,
    DouglasPeucker(DouglasPeucker),
    Lttb(Lttb),
}

impl Generalizer {
    /// Selects and configures a generalizer from request options.
    ///
    /// `generalizing_algorithm` is matched case-insensitively: `LTTB` and
    /// `DP` pick the respective algorithm, anything else (or an explicit
    /// `generalize=false`) selects [`Generalizer::Identity`]. Malformed
    /// numeric parameters of the selected algorithm are an error.
    pub fn from_options(opts: &GeneralizationOptions) -> Result<Self, ConfigError> {
        if opts.get_bool(GENERALIZE)? == Some(false) {
            tracing::debug!("generalization disabled");
            return Ok(Generalizer::Identity);
        }

        let generalizer = match opts.get(GENERALIZING_ALGORITHM) {
            None => Generalizer::Identity,
            Some(algorithm) if algorithm.eq_ignore_ascii_case("lttb") => {
                Generalizer::Lttb(Lttb::from_options(opts)?)
            }
            Some(algorithm) if algorithm.eq_ignore_ascii_case("dp") => {
                Generalizer::DouglasPeucker(DouglasPeucker::from_options(opts)?)
            }
            Some(algorithm) => {
                tracing::warn!(algorithm, "unknown generalizing algorithm, not generalizing");
                Generalizer::Identity
            }
        };
        tracing::debug!(generalizer = generalizer.name(), "selected generalizer");
        Ok(generalizer)
    }
}

impl Generalize for Generalizer {
    fn name(&self) -> &'static str {
        match self {
            Generalizer::Identity => Identity.name(),
            Generalizer::DouglasPeucker(dp) => dp.name(),
            Generalizer::Lttb(lttb) => lttb.name(),
        }
    }

    fn generalize(&self, data: &SeriesCollection) -> Result<SeriesCollection, GeneralizationError> {
        match self {
            Generalizer::Identity => Identity.generalize(data),
            Generalizer::DouglasPeucker(dp) => dp.generalize(data),
            Generalizer::Lttb(lttb) => lttb.generalize(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MAX_ENTRIES, THRESHOLD, TOLERANCE_VALUE};
    use crate::{Sample, Series};

    fn data() -> SeriesCollection {
        let zigzag = |n: i64| {
            Series::new(
                (0..n)
                    .map(|i| Sample::new(i * 60_000, if i % 2 == 0 { 1.0 } else { -1.0 }))
                    .collect(),
            )
        };
        vec![("a", zigzag(500)), ("b", zigzag(3))].into_iter().collect()
    }

    fn select(algorithm: &str) -> Generalizer {
        let opts = GeneralizationOptions::new().with(GENERALIZING_ALGORITHM, algorithm);
        Generalizer::from_options(&opts).unwrap()
    }

    #[test]
    fn case_insensitive_selection() {
        for algorithm in ["dp", "DP", "Dp", "dP"] {
            assert_eq!(select(algorithm), Generalizer::DouglasPeucker(DouglasPeucker::default()));
        }
        for algorithm in ["lttb", "LTTB", "Lttb"] {
            assert_eq!(select(algorithm), Generalizer::Lttb(Lttb::default()));
        }
    }

    #[test]
    fn unknown_algorithm_is_identity() {
        for algorithm in ["visvalingam", "", "lttb2"] {
            let generalizer = select(algorithm);
            assert_eq!(generalizer, Generalizer::Identity);
            assert_eq!(generalizer.generalize(&data()), Identity.generalize(&data()));
        }
        assert_eq!(
            Generalizer::from_options(&GeneralizationOptions::new()),
            Ok(Generalizer::Identity)
        );
    }

    #[test]
    fn disabled_is_identity() {
        let opts = GeneralizationOptions::new()
            .with(GENERALIZE, false)
            .with(GENERALIZING_ALGORITHM, "LTTB")
            .with(THRESHOLD, "not a number");
        assert_eq!(Generalizer::from_options(&opts), Ok(Generalizer::Identity));
    }

    #[test]
    fn selected_algorithm_is_configured() {
        let opts = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "lttb")
            .with(THRESHOLD, 50);
        let generalizer = Generalizer::from_options(&opts).unwrap();
        assert_eq!(generalizer.name(), "LargestTriangleThreeBuckets");
        let out = generalizer.generalize(&data()).unwrap();
        assert_eq!(out.get("a").map(Series::len), Some(50));
        assert_eq!(out.get("b"), data().get("b"));
    }

    #[test]
    fn malformed_parameters_fail() {
        let opts = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "dp")
            .with(TOLERANCE_VALUE, "1,5");
        assert!(matches!(
            Generalizer::from_options(&opts),
            Err(ConfigError::InvalidValue { .. })
        ));

        // Parameters of the other algorithm are not read.
        let opts = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "lttb")
            .with(MAX_ENTRIES, "many");
        assert!(Generalizer::from_options(&opts).is_ok());

        let opts = GeneralizationOptions::new().with(GENERALIZE, "maybe");
        assert!(Generalizer::from_options(&opts).is_err());
    }

    #[test]
    fn dp_errors_surface() {
        let opts = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "DP")
            .with(MAX_ENTRIES, 100);
        let generalizer = Generalizer::from_options(&opts).unwrap();
        assert_eq!(generalizer.name(), "Douglas-Peucker");
        assert_eq!(
            generalizer.generalize(&data()),
            Err(GeneralizationError::MaxEntriesExceeded {
                series: "a".to_string(),
                actual: 500,
                allowed: 100,
            })
        );
    }
}
