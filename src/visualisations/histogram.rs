use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::info;

/// Equal-width bins over `[min, max]` of the samples.
///
/// When every sample is equal a single bin holds them all.
pub fn histogram(samples: &[f64], bins: usize) -> Vec<(Range<f64>, u32)> {
    if samples.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![(min..max, samples.len() as u32)];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0u32; bins];
    for x in samples {
        let bin = (((x - min) / width).floor() as usize).min(bins - 1);
        counts[bin] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let left = min + i as f64 * width;
            (left..left + width, count)
        })
        .collect()
}

/// Padded x-axis; a zero-width span is widened around its price.
fn price_axis(min_price: f64, max_price: f64) -> Range<f64> {
    let span = max_price - min_price;
    let padding = if span > 0.0 {
        span * 0.05
    } else {
        (max_price.abs() * 0.01).max(1e-6)
    };
    (min_price - padding)..(max_price + padding)
}

/// Histogram of simulated terminal prices with the current and expected
/// prices marked.
pub fn plot_terminal_distribution(
    samples: &[f64],
    current_price: f64,
    expected_price: f64,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bars = histogram(samples, 50);
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first.0.start, last.0.end),
        _ => return Err("no samples to plot".into()),
    };
    let x_range = price_axis(first.min(current_price), last.max(current_price));
    let top = bars.iter().map(|(_, c)| *c).max().unwrap_or(0) + 1;

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Simulated Terminal Prices", ("sans-serif", 30))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0..top)?;

    chart
        .configure_mesh()
        .x_desc("Price")
        .y_desc("Frequency")
        .draw()?;

    chart.draw_series(bars.iter().map(|(range, count)| {
        let color = if range.end <= current_price {
            RED.mix(0.6).filled()
        } else if range.start >= current_price {
            GREEN.mix(0.6).filled()
        } else {
            BLUE.mix(0.6).filled()
        };
        Rectangle::new([(range.start, 0), (range.end, *count)], color)
    }))?;

    chart
        .draw_series(LineSeries::new(
            vec![(current_price, 0), (current_price, top)],
            BLACK.stroke_width(2),
        ))?
        .label("Current price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            vec![(expected_price, 0), (expected_price, top)],
            BLUE.stroke_width(2),
        ))?
        .label("Expected price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!(path = %path.display(), "terminal price distribution saved");
    Ok(())
}
