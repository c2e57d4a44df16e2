use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::data::dataset::Dataset;

const SERIES_COLORS: [RGBColor; 6] = [RED, BLUE, GREEN, MAGENTA, CYAN, BLACK];

/// Line chart of the last `last_n` rows for each requested column.
/// Columns absent from the dataset are skipped; empty cells break the line.
pub fn plot_series(
    dataset: &Dataset,
    columns: &[String],
    path: &Path,
    last_n: usize,
) -> Result<(), Box<dyn Error>> {
    let start = dataset.len().saturating_sub(last_n);
    let series: Vec<(&String, Vec<(u32, f64)>)> = columns
        .iter()
        .filter_map(|name| {
            let values = dataset.column(name)?;
            let points = values
                .into_iter()
                .enumerate()
                .skip(start)
                .filter_map(|(i, v)| v.map(|v| (i as u32, v)))
                .collect();
            Some((name, points))
        })
        .collect();

    let all: Vec<f64> = series.iter().flat_map(|(_, p)| p.iter().map(|(_, y)| *y)).collect();
    if all.is_empty() {
        return Err("nothing to plot".into());
    }
    let y_min = all.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = all.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.05).max(1e-6);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature history", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(start as u32..dataset.len().max(1) as u32, (y_min - pad)..(y_max + pad))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Row")
        .y_desc("Value")
        .draw()?;

    for (k, (name, points)) in series.into_iter().enumerate() {
        let color = SERIES_COLORS[k % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(points, &color))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Predicted against actual target values on the validation split.
pub fn plot_validation(actual: &[f64], predicted: &[f64], path: &Path) -> Result<(), Box<dyn Error>> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err("validation vectors are empty or of different length".into());
    }
    let lo = actual
        .iter()
        .chain(predicted)
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let hi = actual
        .iter()
        .chain(predicted)
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.05).max(1e-6);
    let range = (lo - pad)..(hi + pad);

    let root = BitMapBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Validation: predicted vs actual", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(range.clone(), range)?;

    chart
        .configure_mesh()
        .x_desc("Actual")
        .y_desc("Predicted")
        .draw()?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], &BLACK))?
        .label("ideal")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .draw_series(
            actual
                .iter()
                .zip(predicted)
                .map(|(a, p)| Circle::new((*a, *p), 3, BLUE.filled())),
        )?
        .label("validation rows")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
