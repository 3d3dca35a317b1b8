use eyre::{Result, WrapErr};
use seriesgen::{Sample, Series, SeriesCollection};
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt as _, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _,
    BufReader, BufWriter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A JSON object of series keyed by identifier.
    Json,
    /// `series,timestamp,value` rows; an empty value is no-data.
    Csv,
}

/// A named series source: `stdin` or a file path.
pub struct Input {
    name: String,
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
}

impl Input {
    pub async fn from_filename(name: &str) -> Result<Self> {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = match name {
            "stdin" => Box::new(BufReader::new(tokio::io::stdin())),
            _ => {
                let f = File::open(name)
                    .await
                    .wrap_err_with(|| format!("opening {}", name))?;
                Box::new(BufReader::new(f))
            }
        };
        Ok(Input {
            name: name.to_string(),
            reader,
        })
    }

    /// Skips leading whitespace and guesses the encoding from the first
    /// byte. Returns `None` for empty input.
    pub async fn detect_format(&mut self) -> Result<Option<Format>> {
        loop {
            let buf = self
                .reader
                .fill_buf()
                .await
                .wrap_err_with(|| format!("reading {}", self.name))?;
            if buf.is_empty() {
                return Ok(None);
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(i) => {
                    let format = if buf[i] == b'{' { Format::Json } else { Format::Csv };
                    self.reader.consume(i);
                    return Ok(Some(format));
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    pub async fn decode(&mut self, format: Format) -> Result<SeriesCollection> {
        let mut buf = Vec::new();
        self.reader
            .read_to_end(&mut buf)
            .await
            .wrap_err_with(|| format!("reading {}", self.name))?;
        match format {
            Format::Json => Ok(serde_json::from_slice(&buf)?),
            Format::Csv => decode_csv(&buf),
        }
    }
}

/// Where a command writes its result: `stdout` or a file path.
pub struct Output {
    writer: Box<dyn AsyncWrite + Unpin + Send>,
}

impl Output {
    pub async fn from_filename(name: &str) -> Result<Self> {
        let writer: Box<dyn AsyncWrite + Unpin + Send> = match name {
            "stdout" => Box::new(BufWriter::new(tokio::io::stdout())),
            _ => {
                let f = File::create(name)
                    .await
                    .wrap_err_with(|| format!("creating {}", name))?;
                Box::new(BufWriter::new(f))
            }
        };
        Ok(Output { writer })
    }

    pub async fn write_all_flush(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

// Rows are grouped by series and stably sorted by timestamp. A first row
// whose timestamp does not parse is taken as a header.
pub fn decode_csv(buf: &[u8]) -> Result<SeriesCollection> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(buf);

    let mut collection = SeriesCollection::new();
    let mut grouped: Vec<(String, Vec<Sample>)> = Vec::new();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() < 2 || record.len() > 3 {
            eyre::bail!("line {}: expected series,timestamp,value", line + 1);
        }
        let timestamp = match record[1].parse::<i64>() {
            Ok(ts) => ts,
            Err(_) if line == 0 => continue,
            Err(_) => eyre::bail!("line {}: invalid timestamp {:?}", line + 1, &record[1]),
        };
        let value = match record.get(2).unwrap_or("") {
            "" | "null" => None,
            raw => Some(
                raw.parse::<f64>()
                    .wrap_err_with(|| format!("line {}: invalid value {:?}", line + 1, raw))?,
            ),
        };

        let sample = Sample { timestamp, value };
        match grouped.iter_mut().find(|(id, _)| id == &record[0]) {
            Some((_, samples)) => samples.push(sample),
            None => grouped.push((record[0].to_string(), vec![sample])),
        }
    }

    for (id, mut samples) in grouped {
        samples.sort_by_key(|s| s.timestamp);
        collection.insert(id, Series::new(samples));
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows() {
        let input = b"series,timestamp,value\nflow,2000,1.5\nlevel,1000,3\nflow,1000,\nflow,3000,null\n";
        let data = decode_csv(input).unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["flow", "level"]);
        assert_eq!(
            data.get("flow").unwrap().samples,
            vec![Sample::no_data(1000), Sample::new(2000, 1.5), Sample::no_data(3000)]
        );
        assert_eq!(data.get("level").unwrap().samples, vec![Sample::new(1000, 3.0)]);
    }

    #[test]
    fn csv_two_columns_is_no_data() {
        let data = decode_csv(b"a,5\n").unwrap();
        assert_eq!(data.get("a").unwrap().samples, vec![Sample::no_data(5)]);
    }

    #[test]
    fn csv_errors() {
        assert!(decode_csv(b"a,1,1\na,x,1\n").is_err());
        assert!(decode_csv(b"a,1,abc\n").is_err());
        assert!(decode_csv(b"a\n").is_err());
    }

    #[tokio::test]
    async fn detects_format() {
        let dir = std::env::temp_dir().join(format!("seriesgen-io-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let json = dir.join("in.json");
        tokio::fs::write(&json, b"  \n{\"s\":{\"samples\":[{\"timestamp\":1,\"value\":2.0}]}}")
            .await
            .unwrap();
        let mut input = Input::from_filename(json.to_str().unwrap()).await.unwrap();
        assert_eq!(input.detect_format().await.unwrap(), Some(Format::Json));
        let data = input.decode(Format::Json).await.unwrap();
        assert_eq!(data.get("s").unwrap().samples, vec![Sample::new(1, 2.0)]);

        let empty = dir.join("empty.csv");
        tokio::fs::write(&empty, b"\n\n").await.unwrap();
        let mut input = Input::from_filename(empty.to_str().unwrap()).await.unwrap();
        assert_eq!(input.detect_format().await.unwrap(), None);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
