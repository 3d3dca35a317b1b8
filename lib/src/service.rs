use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;

use crate::{
    ConfigError, Generalize, GeneralizationError, GeneralizationOptions, Generalizer,
    SeriesCollection,
};

/// A source of series collections, e.g. a database or a set of files.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn get_data(&self, opts: &GeneralizationOptions) -> Result<SeriesCollection>;
}

/// Serves a fixed collection regardless of options.
#[derive(Debug, Clone, Default)]
pub struct StaticDataService(pub SeriesCollection);

#[async_trait]
impl DataService for StaticDataService {
    async fn get_data(&self, _opts: &GeneralizationOptions) -> Result<SeriesCollection> {
        Ok(self.0.clone())
    }
}

pub type BoxGeneralizer = Box<dyn Generalize + Send + Sync>;
pub type Selector =
    Arc<dyn Fn(&GeneralizationOptions) -> Result<BoxGeneralizer, ConfigError> + Send + Sync>;
pub type FailureHook = Arc<dyn Fn(&GeneralizationError) + Send + Sync>;

/// Decorates a [`DataService`] with generalization.
///
/// Option errors fail the call before the inner service is asked for
/// data. A generalizer error does not: the inner service's data is
/// returned ungeneralized and the error is logged and handed to the
/// failure hook, if any.
#[derive(Clone)]
pub struct GeneralizingDataService<S> {
    inner: S,
    selector: Selector,
    on_failure: Option<FailureHook>,
}

impl<S: DataService> GeneralizingDataService<S> {
    pub fn new(inner: S) -> Self {
        GeneralizingDataService {
            inner,
            selector: Arc::new(select_generalizer),
            on_failure: None,
        }
    }

    /// Replaces the option-to-generalizer mapping.
    pub fn with_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&GeneralizationOptions) -> Result<BoxGeneralizer, ConfigError> + Send + Sync + 'static,
    {
        self.selector = Arc::new(selector);
        self
    }

    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&GeneralizationError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: DataService> DataService for GeneralizingDataService<S> {
    async fn get_data(&self, opts: &GeneralizationOptions) -> Result<SeriesCollection> {
        let generalizer = (self.selector)(opts)?;
        let data = self.inner.get_data(opts).await?;

        match generalizer.generalize(&data) {
            Ok(generalized) => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    log_generalization_amount(generalizer.name(), &data, &generalized);
                }
                Ok(generalized)
            }
            Err(err) => {
                tracing::error!(
                    generalizer = generalizer.name(),
                    error = %err,
                    "couldn't generalize series collection, returning original data"
                );
                if let Some(hook) = &self.on_failure {
                    hook(&err);
                }
                Ok(data)
            }
        }
    }
}

fn select_generalizer(opts: &GeneralizationOptions) -> Result<BoxGeneralizer, ConfigError> {
    Ok(Box::new(Generalizer::from_options(opts)?))
}

fn log_generalization_amount(
    generalizer: &str,
    original: &SeriesCollection,
    generalized: &SeriesCollection,
) {
    for (id, series) in original {
        let after = generalized.get(id).map_or(0, |s| s.len());
        tracing::debug!(generalizer, series = %id, "generalized series (#{} --> #{})", series.len(), after);
    }
}
