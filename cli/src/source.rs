use async_trait::async_trait;
use eyre::{Result, WrapErr};
use seriesgen::{DataService, GeneralizationOptions, SeriesCollection};

use crate::io::Input;

/// Reads series collections from files (or stdin) on every request.
#[derive(Debug, Clone)]
pub struct FileDataService {
    sources: Vec<String>,
}

impl FileDataService {
    /// An empty file list reads from stdin.
    pub fn new(files: &[String]) -> Self {
        let sources = if files.is_empty() {
            vec!["stdin".to_string()]
        } else {
            files.to_vec()
        };
        FileDataService { sources }
    }
}

#[async_trait]
impl DataService for FileDataService {
    async fn get_data(&self, _opts: &GeneralizationOptions) -> Result<SeriesCollection> {
        let mut data = SeriesCollection::new();
        for source in &self.sources {
            let mut input = Input::from_filename(source).await?;
            let Some(format) = input.detect_format().await? else {
                tracing::debug!(source = %source, "skipping empty input");
                continue;
            };
            let decoded = input
                .decode(format)
                .await
                .wrap_err_with(|| format!("decoding {}", source))?;
            tracing::debug!(source = %source, ?format, series = decoded.len(), "read input");
            data.extend(decoded);
        }
        Ok(data)
    }
}
