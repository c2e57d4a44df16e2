use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{Reader, Writer};
use ndarray::{Array1, Array2};

use crate::data::features::{EngineeredRow, TARGET_COLUMN};
use crate::error::DatasetError;
use crate::model::schema::FeatureSchema;

pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// The local table of engineered rows (`features_data.csv`).
///
/// Every column except `timestamp` is numeric. Empty cells are kept as
/// missing values rather than coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    timestamps: Vec<Option<String>>,
    rows: Vec<Vec<Option<f64>>>,
}

/// A borrowed view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Option<&'a str> {
        self.dataset.timestamps[self.index].as_deref()
    }

    /// `None` when the column is absent or the cell is empty.
    pub fn get(&self, column: &str) -> Option<f64> {
        let position = self.dataset.position(column)?;
        self.dataset.rows[self.index][position]
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.dataset.position(column).is_some()
    }
}

impl Dataset {
    /// Snapshot of engineered rows: `timestamp`, `aqi`, then features.
    pub fn from_rows(rows: &[EngineeredRow]) -> Self {
        let mut columns = vec![TARGET_COLUMN.to_string()];
        if let Some(first) = rows.first() {
            columns.extend(first.features.names().iter().cloned());
        }

        let timestamps = rows.iter().map(|r| Some(r.timestamp.to_rfc3339())).collect();
        let rows = rows
            .iter()
            .map(|r| {
                let mut cells = Vec::with_capacity(columns.len());
                cells.push(r.aqi);
                cells.extend(r.features.values().iter().map(|v| Some(*v)));
                cells
            })
            .collect();

        Dataset {
            columns,
            timestamps,
            rows,
        }
    }

    pub fn read_csv(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut rdr = Reader::from_reader(file);

        let header: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let timestamp_at = header.iter().position(|h| h == TIMESTAMP_COLUMN);
        let columns: Vec<String> = header
            .iter()
            .filter(|h| h.as_str() != TIMESTAMP_COLUMN)
            .cloned()
            .collect();

        let mut timestamps = Vec::new();
        let mut rows = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let mut cells = Vec::with_capacity(columns.len());
            for (i, raw) in record.iter().enumerate() {
                if Some(i) == timestamp_at {
                    continue;
                }
                cells.push(parse_cell(raw).ok_or_else(|| DatasetError::Parse {
                    row,
                    column: header[i].clone(),
                    value: raw.to_string(),
                })?);
            }
            timestamps.push(timestamp_at.map(|i| record[i].to_string()));
            rows.push(cells);
        }

        Ok(Dataset {
            columns,
            timestamps,
            rows,
        })
    }

    /// Writes to a sibling temp file and renames it over `path`.
    pub fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        let tmp = self.stage_csv(path)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Writes the sibling temp file `write_csv` would rename, leaving `path`
    /// untouched. Returns the temp file's path.
    pub fn stage_csv(&self, path: &Path) -> Result<PathBuf, DatasetError> {
        let tmp = path.with_extension("csv.tmp");
        {
            let mut wtr = Writer::from_path(&tmp)?;
            let mut header = vec![TIMESTAMP_COLUMN.to_string()];
            header.extend(self.columns.iter().cloned());
            wtr.write_record(&header)?;

            for (timestamp, cells) in self.timestamps.iter().zip(&self.rows) {
                let mut record = vec![timestamp.clone().unwrap_or_default()];
                record.extend(cells.iter().map(|c| c.map(|v| v.to_string()).unwrap_or_default()));
                wtr.write_record(&record)?;
            }
            wtr.flush()?;
        }
        Ok(tmp)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.rows.len()).then_some(RowView {
            dataset: self,
            index,
        })
    }

    pub fn last(&self) -> Option<RowView<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// The last `n` rows, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = RowView<'_>> {
        let start = self.len().saturating_sub(n);
        (start..self.len()).map(move |index| RowView {
            dataset: self,
            index,
        })
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let position = self.position(name)?;
        Some(self.rows.iter().map(|r| r[position]).collect())
    }

    /// Candidate features: every column except the target, in file order.
    pub fn feature_columns(&self, target: &str) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != target)
            .cloned()
            .collect()
    }

    /// Builds the design matrix in schema order, skipping rows where a
    /// feature or the target is missing. Returns the number of rows skipped.
    pub fn to_training_matrix(
        &self,
        schema: &FeatureSchema,
        target: &str,
    ) -> Result<(Array2<f64>, Array1<f64>, usize), DatasetError> {
        let target_at = self
            .position(target)
            .ok_or_else(|| DatasetError::MissingColumn(target.to_string()))?;
        let feature_at = schema
            .names()
            .iter()
            .map(|name| {
                self.position(name)
                    .ok_or_else(|| DatasetError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::with_capacity(self.rows.len() * feature_at.len());
        let mut targets = Vec::with_capacity(self.rows.len());
        let mut skipped = 0;
        for cells in &self.rows {
            let features: Option<Vec<f64>> = feature_at.iter().map(|&i| cells[i]).collect();
            match (features, cells[target_at]) {
                (Some(features), Some(y)) => {
                    values.extend(features);
                    targets.push(y);
                }
                _ => skipped += 1,
            }
        }

        let x = Array2::from_shape_vec((targets.len(), feature_at.len()), values)?;
        Ok((x, Array1::from(targets), skipped))
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// `None` for text that is not a number; `Some(None)` for a missing value.
/// Empty cells and non-finite numbers (`nan`, `inf`) count as missing.
fn parse_cell(raw: &str) -> Option<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(None);
    }
    raw.parse::<f64>().ok().map(|v| v.is_finite().then_some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_columns_and_keeps_empty_cells_missing() {
        let file = write("timestamp,pm2_5,humidity,aqi\n2024-01-01T00:00:00Z,12.5,,3\n2024-01-01T01:00:00Z,14,60,4\n");
        let dataset = Dataset::read_csv(file.path()).unwrap();

        assert_eq!(dataset.columns(), ["pm2_5", "humidity", "aqi"]);
        assert_eq!(dataset.len(), 2);
        let first = dataset.row(0).unwrap();
        assert_eq!(first.get("humidity"), None);
        assert!(first.has_column("humidity"));
        assert_eq!(first.timestamp(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(dataset.last().unwrap().get("aqi"), Some(4.0));
    }

    #[test]
    fn infinite_cells_count_as_missing() {
        let file = write("timestamp,a,aqi\nt0,inf,1\nt1,-inf,2\nt2,NaN,3\nt3,4,4\n");
        let dataset = Dataset::read_csv(file.path()).unwrap();
        assert_eq!(dataset.column("a").unwrap(), vec![None, None, None, Some(4.0)]);

        let schema = FeatureSchema::new(vec!["a".into()]).unwrap();
        let (x, y, skipped) = dataset.to_training_matrix(&schema, "aqi").unwrap();
        assert_eq!(skipped, 3);
        assert!(x.iter().all(|v| v.is_finite()));
        assert_eq!(y.to_vec(), vec![4.0]);
    }

    #[test]
    fn non_numeric_cells_are_rejected() {
        let file = write("timestamp,pm2_5,aqi\n2024-01-01T00:00:00Z,high,3\n");
        let err = Dataset::read_csv(file.path()).unwrap_err();
        assert!(matches!(err, DatasetError::Parse { ref column, .. } if column == "pm2_5"));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::read_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn training_matrix_follows_schema_order_and_skips_incomplete_rows() {
        let file = write("timestamp,a,b,aqi\nt0,1,2,10\nt1,3,,20\nt2,5,6,\nt3,7,8,40\n");
        let dataset = Dataset::read_csv(file.path()).unwrap();
        let schema = FeatureSchema::new(vec!["b".into(), "a".into()]).unwrap();

        let (x, y, skipped) = dataset.to_training_matrix(&schema, "aqi").unwrap();
        assert_eq!(skipped, 2);
        assert_eq!(x.nrows(), 2);
        assert_eq!(x.row(0).to_vec(), vec![2.0, 1.0]);
        assert_eq!(x.row(1).to_vec(), vec![8.0, 7.0]);
        assert_eq!(y.to_vec(), vec![10.0, 40.0]);
    }

    #[test]
    fn csv_snapshot_survives_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features_data.csv");
        let file = write("timestamp,a,aqi\nt0,1.5,2\nt1,,3\n");
        let dataset = Dataset::read_csv(file.path()).unwrap();

        dataset.write_csv(&path).unwrap();
        assert_eq!(Dataset::read_csv(&path).unwrap(), dataset);
    }
}
