//! Tab-separated results table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{StatisticsError, StatisticsResult};

/// Header plus raw string records of an inference results file
#[derive(Debug, Clone)]
pub struct ResultsTable {
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl ResultsTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> StatisticsResult<Self> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            path = %path.as_ref().display(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Results table read"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> StatisticsResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        if records.is_empty() {
            return Err(StatisticsError::EmptyTable);
        }

        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn num_rows(&self) -> usize {
        self.records.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Parse a named column as floats. Rows are reported 1-based, header excluded.
    pub fn column(&self, name: &str) -> StatisticsResult<Vec<f64>> {
        let idx = self
            .position(name)
            .ok_or_else(|| StatisticsError::MissingColumn(name.to_string()))?;

        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let raw = record.get(idx).unwrap_or("");
                raw.parse::<f64>().map_err(|_| StatisticsError::InvalidValue {
                    column: name.to_string(),
                    row: row + 1,
                    value: raw.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_separated() {
        let data = "true\tpred_mean\tpred_std\n1.0\t1.5\t0.2\n2.0\t1.75\t0.3\n";
        let table = ResultsTable::from_reader(data.as_bytes()).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.headers(), &["true", "pred_mean", "pred_std"]);
        assert_eq!(table.column("pred_mean").unwrap(), vec![1.5, 1.75]);
        assert!(table.has_column("pred_std"));
    }

    #[test]
    fn test_missing_column() {
        let table = ResultsTable::from_reader("a\tb\n1\t2\n".as_bytes()).unwrap();
        assert!(matches!(
            table.column("c"),
            Err(StatisticsError::MissingColumn(name)) if name == "c"
        ));
    }

    #[test]
    fn test_invalid_value_reports_row() {
        let table = ResultsTable::from_reader("a\n1\nfoo\n".as_bytes()).unwrap();
        match table.column("a") {
            Err(StatisticsError::InvalidValue { row, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "foo");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(matches!(
            ResultsTable::from_reader("a\tb\n".as_bytes()),
            Err(StatisticsError::EmptyTable)
        ));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(ResultsTable::from_reader("a\tb\n1\t2\n3\n".as_bytes()).is_err());
    }
}
