use clap::Args;
use eyre::Result;
use serde::Serialize;
use seriesgen::{
    BoxGeneralizer, DataService, GeneralizationOptions, Generalizer, GeneralizingDataService,
    SeriesCollection, StaticDataService,
};
use std::io::Write;
use tabwriter::TabWriter;

use crate::generalize::GeneralizeArgs;
use crate::io::Output;
use crate::source::FileDataService;

#[derive(Args, Debug)]
pub struct Opts {
    /// Report type (text, json)
    #[clap(long, name = "type", default_value = "text")]
    pub report_type: String,

    #[clap(flatten)]
    pub generalization: GeneralizeArgs,

    /// Output file [default: stdout]
    #[clap(long, default_value = "stdout")]
    pub output: String,

    /// Input files, JSON or CSV [default: stdin]
    pub files: Vec<String>,
}

/// Per-series summary of a generalization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub series: String,
    pub samples: usize,
    pub generalized: usize,
    pub no_data: usize,
    pub first: Option<i64>,
    pub last: Option<i64>,
}

pub async fn report(opts: &Opts) -> Result<()> {
    let options = opts.generalization.to_options().await?;
    let rows = collect(&options, &FileDataService::new(&opts.files)).await?;
    let mut buf = Vec::new();
    match opts.report_type.as_str() {
        "text" => report_text(&rows, &mut buf)?,
        "json" => report_json(&rows, &mut buf)?,
        other => eyre::bail!("unknown report type: {}", other),
    }

    let mut output = Output::from_filename(&opts.output).await?;
    output.write_all_flush(&buf).await
}

/// Reads `source` and summarizes it against its generalized form. The
/// options are validated before the source is read.
pub async fn collect<S: DataService>(
    options: &GeneralizationOptions,
    source: &S,
) -> Result<Vec<SeriesReport>> {
    let generalizer = Generalizer::from_options(options)?;
    let raw = source.get_data(options).await?;
    let generalized = GeneralizingDataService::new(StaticDataService(raw.clone()))
        .with_selector(move |_| Ok(Box::new(generalizer.clone()) as BoxGeneralizer))
        .get_data(options)
        .await?;
    Ok(summarize(&raw, &generalized))
}

pub fn summarize(raw: &SeriesCollection, generalized: &SeriesCollection) -> Vec<SeriesReport> {
    raw.iter()
        .map(|(id, series)| SeriesReport {
            series: id.clone(),
            samples: series.len(),
            generalized: generalized.get(id).map_or(0, |s| s.len()),
            no_data: series.no_data_count(),
            first: series.first().map(|s| s.timestamp),
            last: series.last().map(|s| s.timestamp),
        })
        .collect()
}

pub fn report_text(rows: &[SeriesReport], w: &mut dyn Write) -> Result<()> {
    let mut tw = TabWriter::new(w);
    writeln!(tw, "Series\tSamples\tGeneralized\tNo-data\tFirst\tLast")?;
    for r in rows {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.series,
            r.samples,
            r.generalized,
            r.no_data,
            timestamp(r.first),
            timestamp(r.last),
        )?;
    }
    tw.flush()?;
    Ok(())
}

pub fn report_json(rows: &[SeriesReport], w: &mut dyn Write) -> Result<()> {
    serde_json::to_writer(&mut *w, rows)?;
    w.write_all(b"\n")?;
    Ok(())
}

fn timestamp(ts: Option<i64>) -> String {
    ts.map_or_else(|| "-".to_string(), |t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seriesgen::options::{GENERALIZING_ALGORITHM, THRESHOLD};
    use seriesgen::{ConfigError, Generalize, Lttb, Sample, Series};

    fn data() -> SeriesCollection {
        vec![
            (
                "flow",
                Series::new(
                    (0..100)
                        .map(|i| if i == 50 { Sample::no_data(i) } else { Sample::new(i, (i % 9) as f64) })
                        .collect(),
                ),
            ),
            ("empty", Series::default()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn summary_rows() {
        let raw = data();
        let generalized = Lttb::new(10).generalize(&raw).unwrap();
        let rows = summarize(&raw, &generalized);
        assert_eq!(
            rows,
            vec![
                SeriesReport {
                    series: "empty".to_string(),
                    samples: 0,
                    generalized: 0,
                    no_data: 0,
                    first: None,
                    last: None,
                },
                SeriesReport {
                    series: "flow".to_string(),
                    samples: 100,
                    generalized: 10,
                    no_data: 1,
                    first: Some(0),
                    last: Some(99),
                },
            ]
        );
    }

    #[tokio::test]
    async fn collect_generalizes() {
        let options = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "lttb")
            .with(THRESHOLD, 10);
        let rows = collect(&options, &StaticDataService(data())).await.unwrap();
        assert_eq!(rows[1].samples, 100);
        assert_eq!(rows[1].generalized, 10);
    }

    #[tokio::test]
    async fn bad_options_fail_before_reading() {
        let options = GeneralizationOptions::new()
            .with(GENERALIZING_ALGORITHM, "lttb")
            .with(THRESHOLD, "abc");
        let source = FileDataService::new(&["/nonexistent/seriesgen-in.csv".to_string()]);
        let err = collect(&options, &source).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidValue {
                key: THRESHOLD.to_string(),
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn text_report() {
        let raw = data();
        let rows = summarize(&raw, &raw);
        let mut buf = Vec::new();
        report_text(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Series"));
        assert!(lines[1].starts_with("empty"));
        assert!(lines[1].ends_with('-'));
        assert!(lines[2].split_whitespace().eq(["flow", "100", "100", "1", "0", "99"]));
    }

    #[test]
    fn json_report() {
        let raw = data();
        let rows = summarize(&raw, &raw);
        let mut buf = Vec::new();
        report_json(&rows[1..], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "[{\"series\":\"flow\",\"samples\":100,\"generalized\":100,\"no_data\":1,\"first\":0,\"last\":99}]\n"
        );
    }
}
