use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::data::dataset::{Dataset, RowView};
use crate::inference::predictor::Predictor;
use crate::utils::plot::plot_series;

const TABLE_FEATURES: usize = 6;
const IMPORTANCE_ROWS: usize = 10;
const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Extra row to predict besides the latest one.
    pub row: Option<usize>,
    pub recent_rows: usize,
    pub plot_columns: Vec<String>,
    pub plot_path: Option<PathBuf>,
    pub plot_rows: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        DashboardOptions {
            row: None,
            recent_rows: 10,
            plot_columns: Vec::new(),
            plot_path: None,
            plot_rows: 500,
        }
    }
}

/// pm2_5, pm10 and the target, where the dataset has them.
pub fn default_plot_columns(dataset: &Dataset, target: &str) -> Vec<String> {
    ["pm2_5", "pm10", target]
        .iter()
        .filter(|c| dataset.columns().iter().any(|d| d == *c))
        .map(|c| c.to_string())
        .collect()
}

pub fn render<W: Write>(
    predictor: &Predictor,
    dataset: &Dataset,
    options: &DashboardOptions,
    out: &mut W,
) -> Result<()> {
    let meta = predictor.metadata();
    writeln!(out, "AQI Predictor Dashboard")?;
    writeln!(out, "=======================")?;
    writeln!(
        out,
        "Model {} ({}), trained {} on {} rows from {:?}",
        meta.version,
        meta.task,
        meta.trained_at.format("%Y-%m-%d %H:%M UTC"),
        meta.train_rows,
        meta.origin
    )?;
    write!(
        out,
        "Validation ({} rows): MAE {:.3}  RMSE {:.3}  R2 {:.3}",
        meta.validation_rows, meta.metrics.mae, meta.metrics.rmse, meta.metrics.r2
    )?;
    if let Some(accuracy) = meta.metrics.accuracy {
        write!(out, "  accuracy {:.1}%", accuracy * 100.0)?;
    }
    writeln!(out)?;

    writeln!(out, "\nRecent rows")?;
    write_recent_rows(predictor, dataset, &meta.target, options.recent_rows, out)?;

    writeln!(out, "\nFeature importances (permutation)")?;
    write_importances(predictor, dataset, out)?;

    writeln!(out, "\nPrediction for latest row")?;
    match dataset.last() {
        Some(row) => write_prediction(predictor, &row, out)?,
        None => writeln!(out, "  dataset is empty")?,
    }

    if let Some(index) = options.row {
        writeln!(out, "\nPrediction for row {index}")?;
        match dataset.row(index) {
            Some(row) => write_prediction(predictor, &row, out)?,
            None => writeln!(
                out,
                "  row {index} is out of range (dataset has {} rows)",
                dataset.len()
            )?,
        }
    }

    if let Some(path) = &options.plot_path {
        let columns = if options.plot_columns.is_empty() {
            default_plot_columns(dataset, &meta.target)
        } else {
            options.plot_columns.clone()
        };
        match plot_series(dataset, &columns, path, options.plot_rows) {
            Ok(()) => writeln!(out, "\nChart of {:?} written to {}", columns, path.display())?,
            Err(e) => writeln!(out, "\nChart not drawn: {e}")?,
        }
    }

    Ok(())
}

fn write_recent_rows<W: Write>(
    predictor: &Predictor,
    dataset: &Dataset,
    target: &str,
    n: usize,
    out: &mut W,
) -> Result<()> {
    let mut columns: Vec<&str> = predictor
        .schema()
        .names()
        .iter()
        .take(TABLE_FEATURES)
        .map(String::as_str)
        .collect();
    if dataset.columns().iter().any(|c| c == target) {
        columns.push(target);
    }

    write!(out, "  {:>5}  {:<25}", "row", "timestamp")?;
    for column in &columns {
        write!(out, " {:>12}", truncate(column, 12))?;
    }
    writeln!(out)?;

    for row in dataset.tail(n) {
        write!(
            out,
            "  {:>5}  {:<25}",
            row.index(),
            truncate(row.timestamp().unwrap_or("-"), 25)
        )?;
        for column in &columns {
            match row.get(column) {
                Some(v) => write!(out, " {:>12.3}", v)?,
                None => write!(out, " {:>12}", "-")?,
            }
        }
        writeln!(out)?;
    }
    if predictor.schema().len() > TABLE_FEATURES {
        writeln!(
            out,
            "  ({} more features not shown)",
            predictor.schema().len() - TABLE_FEATURES
        )?;
    }
    Ok(())
}

fn write_importances<W: Write>(predictor: &Predictor, dataset: &Dataset, out: &mut W) -> Result<()> {
    let importances: Vec<_> = predictor
        .metadata()
        .importances
        .iter()
        .filter(|i| dataset.columns().iter().any(|c| c == &i.feature))
        .take(IMPORTANCE_ROWS)
        .collect();
    if importances.is_empty() {
        writeln!(out, "  no overlap between model features and dataset columns")?;
        return Ok(());
    }

    let max = importances
        .iter()
        .map(|i| i.importance)
        .fold(0.0_f64, f64::max);
    for item in importances {
        let width = if max > 0.0 {
            ((item.importance.max(0.0) / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        writeln!(
            out,
            "  {:<24} {:>10.4} {}",
            truncate(&item.feature, 24),
            item.importance,
            "#".repeat(width)
        )?;
    }
    Ok(())
}

fn write_prediction<W: Write>(predictor: &Predictor, row: &RowView<'_>, out: &mut W) -> Result<()> {
    match predictor.predict_row(row) {
        Ok(result) => writeln!(
            out,
            "  Predicted AQI: {:.2}  (row {}, {})",
            result.prediction,
            row.index(),
            row.timestamp().unwrap_or("no timestamp")
        )?,
        Err(e) => writeln!(out, "  unavailable: {e}")?,
    }
    Ok(())
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((at, _)) => &s[..at],
        None => s,
    }
}
