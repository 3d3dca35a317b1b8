use clap::Args;
use eyre::{Result, WrapErr};
use seriesgen::options::{
    GENERALIZE, GENERALIZING_ALGORITHM, MAX_ENTRIES, NO_DATA_GAP_THRESHOLD, REDUCTION_RATE,
    THRESHOLD, TOLERANCE_VALUE,
};
use seriesgen::{DataService, GeneralizationOptions, GeneralizingDataService};

use crate::io::Output;
use crate::source::FileDataService;

/// Options selecting and configuring the generalizer. Values are passed to
/// the library as given and validated there.
#[derive(Args, Debug, Clone, Default)]
pub struct GeneralizeArgs {
    /// Generalizing algorithm (lttb, dp); anything else leaves data as is
    #[clap(long, env = "SERIESGEN_ALGORITHM")]
    pub algorithm: Option<String>,

    /// Douglas-Peucker distance tolerance, in value units
    #[clap(long, env = "SERIESGEN_TOLERANCE")]
    pub tolerance: Option<String>,

    /// Douglas-Peucker maximum series length (-1 is unlimited)
    #[clap(long, env = "SERIESGEN_MAX_ENTRIES", allow_hyphen_values = true)]
    pub max_entries: Option<String>,

    /// Douglas-Peucker expected reduction rate (advisory)
    #[clap(long, env = "SERIESGEN_REDUCTION_RATE", allow_hyphen_values = true)]
    pub reduction_rate: Option<String>,

    /// LTTB number of output samples per series
    #[clap(long, env = "SERIESGEN_THRESHOLD")]
    pub threshold: Option<String>,

    /// LTTB no-data gap threshold (<= 1 fraction of a bucket, > 1 count)
    #[clap(long, env = "SERIESGEN_NO_DATA_GAP_THRESHOLD")]
    pub no_data_gap_threshold: Option<String>,

    /// Disable generalization
    #[clap(long)]
    pub no_generalize: bool,

    /// Additional option as key=value (repeatable)
    #[clap(short = 'o', long = "option", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// JSON file with an object of options
    #[clap(long, env = "SERIESGEN_OPTIONS")]
    pub options_file: Option<String>,
}

impl GeneralizeArgs {
    /// Builds the option bag. The options file is applied first, then
    /// `--option` pairs, then the dedicated flags.
    pub async fn to_options(&self) -> Result<GeneralizationOptions> {
        let mut opts = match &self.options_file {
            Some(path) => {
                let buf = tokio::fs::read(path)
                    .await
                    .wrap_err_with(|| format!("reading options file {}", path))?;
                serde_json::from_slice::<GeneralizationOptions>(&buf)
                    .wrap_err_with(|| format!("parsing options file {}", path))?
            }
            None => GeneralizationOptions::new(),
        };

        for (key, value) in &self.options {
            opts.set(key, value);
        }

        let flags = [
            (GENERALIZING_ALGORITHM, &self.algorithm),
            (TOLERANCE_VALUE, &self.tolerance),
            (MAX_ENTRIES, &self.max_entries),
            (REDUCTION_RATE, &self.reduction_rate),
            (THRESHOLD, &self.threshold),
            (NO_DATA_GAP_THRESHOLD, &self.no_data_gap_threshold),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                opts.set(key, value);
            }
        }
        if self.no_generalize {
            opts.set(GENERALIZE, false);
        }
        Ok(opts)
    }
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    GeneralizationOptions::parse_pair(s).map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub generalization: GeneralizeArgs,

    /// Pretty-print the JSON output
    #[clap(long)]
    pub pretty: bool,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files, JSON or CSV [default: stdin]
    pub files: Vec<String>,
}

pub async fn generalize(opts: &Opts) -> Result<()> {
    let options = opts.generalization.to_options().await?;
    let service = GeneralizingDataService::new(FileDataService::new(&opts.files));
    let data = service.get_data(&options).await?;

    let mut buf = if opts.pretty {
        serde_json::to_vec_pretty(&data)?
    } else {
        serde_json::to_vec(&data)?
    };
    buf.push(b'\n');

    let mut output = Output::from_filename(&opts.output).await?;
    output.write_all_flush(&buf).await
}
