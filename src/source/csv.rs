//! CSV record source.
//!
//! Reads `ip,country_code,country,city,latitude,longitude,mystery_value` rows
//! with `csv-async` and streams them in batches.

use std::path::PathBuf;

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, StringRecord};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::{batch_channel, Imported, RecordSource};
use crate::config::{CSV_COLUMNS, DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY};
use crate::error_handling::SourceError;
use crate::models::GeoRecord;

/// Streams geo records from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    batch_size: usize,
    channel_capacity: usize,
    has_headers: bool,
}

impl CsvSource {
    /// Source reading `path` with default batch size and a header row.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSource {
            path: path.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            has_headers: true,
        }
    }

    /// Records per emitted batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Capacity of the batch and error channels.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Whether the first row is a header to skip (default `true`).
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn import(&self, cancel: CancellationToken) -> Result<Imported, SourceError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| SourceError::Open {
                path: self.path.clone(),
                source,
            })?;

        let (mut sender, imported) =
            batch_channel(self.batch_size, self.channel_capacity, cancel);
        let has_headers = self.has_headers;
        let path = self.path.clone();

        tokio::spawn(async move {
            let mut reader = AsyncReaderBuilder::new()
                .has_headers(has_headers)
                .flexible(true)
                .create_reader(file);
            let mut row = StringRecord::new();
            let mut rows = 0usize;

            loop {
                if sender.is_cancelled() {
                    debug!("CSV import of {} cancelled after {} rows", path.display(), rows);
                    return;
                }

                match reader.read_record(&mut row).await {
                    Ok(true) => {
                        rows += 1;
                        let line = row.position().map(|p| p.line()).unwrap_or(0);
                        let keep_going = match parse_row(&row, line) {
                            Ok(record) => sender.push(record).await,
                            Err(e) => sender.report(e).await,
                        };
                        if !keep_going {
                            return;
                        }
                    }
                    Ok(false) => break,
                    Err(e) => {
                        let fatal = e.is_io_error();
                        if !sender.report(SourceError::Read(e)).await || fatal {
                            if fatal {
                                warn!("CSV import of {} stopped on I/O error", path.display());
                            }
                            return;
                        }
                    }
                }
            }

            sender.finish().await;
            debug!("CSV import of {} finished: {} rows read", path.display(), rows);
        });

        Ok(imported)
    }
}

/// Converts one CSV row into a record.
///
/// An empty numeric field parses to zero; a non-empty one that does not parse
/// exactly (surrounding whitespace included) makes the whole row malformed.
pub fn parse_row(row: &StringRecord, line: u64) -> Result<GeoRecord, SourceError> {
    let field = |index: usize| {
        row.get(index).ok_or(SourceError::MissingColumn {
            line,
            column: CSV_COLUMNS[index],
        })
    };

    Ok(GeoRecord {
        ip: field(0)?.to_string(),
        country_code: field(1)?.to_string(),
        country: field(2)?.to_string(),
        city: field(3)?.to_string(),
        latitude: parse_number(field(4)?, line, CSV_COLUMNS[4])?,
        longitude: parse_number(field(5)?, line, CSV_COLUMNS[5])?,
        mystery_value: parse_number(field(6)?, line, CSV_COLUMNS[6])?,
    })
}

fn parse_number<T>(value: &str, line: u64, column: &'static str) -> Result<T, SourceError>
where
    T: std::str::FromStr + Default,
{
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(|_| SourceError::InvalidField {
        line,
        column,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(contents.as_bytes())
            .expect("Failed to write CSV");
        file.flush().expect("Failed to flush CSV");
        file
    }

    #[test]
    fn test_parse_row_complete() {
        let record = parse_row(
            &row(&[
                "200.106.141.15",
                "SI",
                "Nepal",
                "DuBuquemouth",
                "-84.87503094689836",
                "7.206435933364332",
                "7823011346",
            ]),
            2,
        )
        .expect("row should parse");

        assert_eq!(record.ip, "200.106.141.15");
        assert_eq!(record.city, "DuBuquemouth");
        assert!((record.latitude + 84.87503094689836).abs() < f64::EPSILON);
        assert_eq!(record.mystery_value, 7823011346);
    }

    #[test]
    fn test_parse_row_empty_numbers_default_to_zero() {
        let record = parse_row(&row(&["1.1.1.1", "", "", "", "", "", ""]), 2)
            .expect("empty numeric fields are allowed");
        assert_eq!(record.latitude, 0.0);
        assert_eq!(record.longitude, 0.0);
        assert_eq!(record.mystery_value, 0);
    }

    #[test]
    fn test_parse_row_invalid_number() {
        let err = parse_row(&row(&["1.1.1.1", "SI", "Nepal", "X", "abc", "1.0", "3"]), 7)
            .expect_err("latitude is not a number");
        match err {
            SourceError::InvalidField { line, column, value } => {
                assert_eq!(line, 7);
                assert_eq!(column, "latitude");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_row_rejects_padded_number() {
        let err = parse_row(&row(&["1.1.1.1", "SI", "Nepal", "X", " 1.5", "1.0", "3"]), 3)
            .expect_err("padded latitude is malformed");
        assert!(matches!(
            err,
            SourceError::InvalidField {
                column: "latitude",
                ..
            }
        ));

        let err = parse_row(&row(&["1.1.1.1", "SI", "Nepal", "X", "1.5", "1.0", " "]), 3)
            .expect_err("blank mystery value is malformed");
        assert!(matches!(
            err,
            SourceError::InvalidField {
                column: "mystery_value",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_row_missing_column() {
        let err = parse_row(&row(&["1.1.1.1", "SI", "Nepal"]), 4)
            .expect_err("row is too short");
        assert!(matches!(
            err,
            SourceError::MissingColumn {
                line: 4,
                column: "city"
            }
        ));
    }

    #[tokio::test]
    async fn test_import_missing_file_is_fatal() {
        let source = CsvSource::new("/nonexistent/geo_loader/data.csv");
        let result = source.import(CancellationToken::new()).await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }

    #[tokio::test]
    async fn test_import_batches_and_reports_malformed_rows() {
        let file = write_csv(
            "ip_address,country_code,country,city,latitude,longitude,mystery_value\n\
             1.1.1.1,SI,Nepal,A,1.0,2.0,3\n\
             2.2.2.2,SI,Nepal,B,not-a-number,2.0,3\n\
             3.3.3.3,SI,Nepal,C,1.0,2.0,3\n\
             4.4.4.4,SI\n\
             5.5.5.5,SI,Nepal,E,1.0,2.0,3\n",
        );
        let source = CsvSource::new(file.path())
            .with_batch_size(2)
            .with_channel_capacity(16);
        let mut imported = source
            .import(CancellationToken::new())
            .await
            .expect("file should open");

        let mut batches = Vec::new();
        while let Some(batch) = imported.batches.recv().await {
            batches.push(batch);
        }
        let mut errors = Vec::new();
        while let Some(error) = imported.errors.recv().await {
            errors.push(error);
        }

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 1], "final short batch must be emitted");
        let ips: Vec<&str> = batches.iter().flatten().map(|r| r.ip.as_str()).collect();
        assert_eq!(ips, vec!["1.1.1.1", "3.3.3.3", "5.5.5.5"]);
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_import_without_header_row() {
        let file = write_csv("1.1.1.1,SI,Nepal,A,1.0,2.0,3\n");
        let source = CsvSource::new(file.path()).with_headers(false);
        let mut imported = source
            .import(CancellationToken::new())
            .await
            .expect("file should open");

        let batch = imported.batches.recv().await.expect("one batch");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].ip, "1.1.1.1");
        assert!(imported.batches.recv().await.is_none());
    }
}
