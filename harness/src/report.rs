use crate::{
    bench::{ModeSeries, ResultMatrix},
    config::ReportConfig,
    workload::CollisionMode,
};
use plotters::prelude::*;
use std::{path::Path, process::Command};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create the report output directory")]
    OutputDir(#[source] std::io::Error),
    #[error("Failed to render chart: {0}")]
    Render(String),
}

/// Render one chart per variant and optionally hand each to the platform
/// image viewer. The matrix is read-only here; index i of every series
/// corresponds to `scales[i]`.
#[instrument(skip(matrix, scales, config), level = "info")]
pub fn render(
    matrix: &ResultMatrix,
    scales: &[u64],
    config: &ReportConfig,
) -> Result<(), ReportError> {
    std::fs::create_dir_all(&config.output_dir).map_err(ReportError::OutputDir)?;

    for (variant, series) in matrix {
        let path = config.output_dir.join(format!("performance_{variant}.png"));
        render_chart(&path, variant, series, scales)
            .map_err(|error| ReportError::Render(error.to_string()))?;
        info!("Wrote {}", path.display());

        if config.display {
            display(&path);
        }
    }

    Ok(())
}

/// Split one series into runs of consecutive present measurements. Absent
/// entries become gaps in the curve, they are never coerced to zero;
/// isolated present points survive as single-element runs.
fn segments(scales: &[u64], measurements: &[Option<u64>]) -> Vec<Vec<(u64, u64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (&scale, measurement) in scales.iter().zip(measurements) {
        match measurement {
            Some(value) => current.push((scale, *value)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

fn mode_color(mode: CollisionMode) -> RGBColor {
    match mode {
        CollisionMode::NoCollision => BLUE,
        CollisionMode::SomeCollision => GREEN,
        CollisionMode::MaxCollision => RED,
    }
}

fn render_chart(
    path: &Path,
    variant: &str,
    series: &ModeSeries,
    scales: &[u64],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = scales.iter().copied().min().unwrap_or(0);
    let x_max = scales.iter().copied().max().unwrap_or(1).max(x_min + 1);
    let y_max = series
        .values()
        .flat_map(|measurements| measurements.iter())
        .filter_map(|measurement| *measurement)
        .max()
        .unwrap_or(0)
        .max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Hash Table Operation Time vs. Tuple Count and Collision Mode ({variant})"),
            ("sans-serif", 24),
        )
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(x_min..x_max, 0u64..y_max + y_max / 20 + 1)?;

    chart
        .configure_mesh()
        .x_desc("Number of Tuples")
        .y_desc("Elapsed Time (microseconds)")
        .draw()?;

    for (&mode, measurements) in series {
        let color = mode_color(mode);
        let runs = segments(scales, measurements);

        let mut labeled = false;
        for run in &runs {
            let drawn = chart.draw_series(LineSeries::new(
                run.iter().copied(),
                color.stroke_width(2),
            ))?;
            if !labeled {
                drawn.label(mode.label()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
                labeled = true;
            }
        }

        // a distinct marker shape per mode, including isolated points
        let points = runs.iter().flatten().copied();
        match mode {
            CollisionMode::NoCollision => {
                chart.draw_series(points.map(|point| Circle::new(point, 4, color.filled())))?;
            }
            CollisionMode::SomeCollision => {
                chart.draw_series(
                    points.map(|point| Cross::new(point, 4, color.stroke_width(2))),
                )?;
            }
            CollisionMode::MaxCollision => {
                chart.draw_series(
                    points.map(|point| TriangleMarker::new(point, 5, color.filled())),
                )?;
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;
    root.present()?;

    Ok(())
}

/// Hand a rendered chart to the platform image viewer without blocking; the
/// viewer outlives the harness.
fn display(path: &Path) {
    #[cfg(target_os = "macos")]
    let viewer = "open";
    #[cfg(not(target_os = "macos"))]
    let viewer = "xdg-open";

    if let Err(error) = Command::new(viewer).arg(path).spawn() {
        warn!("Failed to open {} with {viewer}: {error}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_the_curve_into_runs() {
        let scales = [10, 20, 30, 40];
        let measurements = [Some(1), None, Some(3), Some(4)];

        assert_eq!(
            segments(&scales, &measurements),
            vec![vec![(10, 1)], vec![(30, 3), (40, 4)]]
        );
    }

    #[test]
    fn a_gapless_series_is_a_single_run() {
        let scales = [10, 20];
        let measurements = [Some(5), Some(6)];

        assert_eq!(
            segments(&scales, &measurements),
            vec![vec![(10, 5), (20, 6)]]
        );
    }

    #[test]
    fn an_all_absent_series_draws_nothing() {
        let scales = [10, 20];
        let measurements = [None, None];

        assert!(segments(&scales, &measurements).is_empty());
    }

    #[test]
    fn absent_entries_are_never_coerced_to_zero() {
        let scales = [10, 20, 30];
        let measurements = [None, Some(2), None];

        let runs = segments(&scales, &measurements);
        assert_eq!(runs, vec![vec![(20, 2)]]);
        assert!(runs.iter().flatten().all(|(_, value)| *value != 0));
    }
}
