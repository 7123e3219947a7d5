use crate::aggregate::{ExerciseSummary, WorkoutSummary, format_rpe, format_volume};
use crate::analytics::{SeriesPoint, weekly_totals};
use crate::units::WeightUnit;
use maud::{DOCTYPE, Markup, html};
use plotters::prelude::*;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Chart(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "{e}"),
            ReportError::Chart(e) => write!(f, "Chart error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Chart(_) => None,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        ReportError::Io(e)
    }
}

fn chart_err<E: fmt::Display>(e: E) -> ReportError {
    ReportError::Chart(e.to_string())
}

trait FormatOption {
    fn fmt_opt(self) -> String;
}

impl FormatOption for Option<f64> {
    fn fmt_opt(self) -> String {
        self.map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".into())
    }
}

impl FormatOption for f64 {
    fn fmt_opt(self) -> String {
        format!("{:.1}", self)
    }
}

/// Everything rendered into a workout report.
pub struct ReportData<'a> {
    pub title: &'a str,
    pub summary: &'a WorkoutSummary,
    pub exercises: &'a [ExerciseSummary],
    /// Daily volume series, in kilograms, for the weekly chart.
    pub volume_series: &'a [SeriesPoint],
    pub unit: WeightUnit,
}

/// Write an HTML report to `path` and, next to it, a PNG chart of weekly
/// volume. The report still renders when the chart cannot be drawn.
pub fn export_html_report<P: AsRef<Path>>(
    path: P,
    data: &ReportData<'_>,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    let chart_path = path.with_extension("png");
    let chart_file = match generate_volume_chart(data.volume_series, data.unit, &chart_path) {
        Ok(()) => chart_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("")),
        Err(e) => {
            log::warn!("Failed to generate chart: {}", e);
            std::ffi::OsStr::new("")
        }
    };
    let markup = build_html(data, chart_file);
    std::fs::write(path, markup.into_string())?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}

fn generate_volume_chart(
    series: &[SeriesPoint],
    unit: WeightUnit,
    path: &Path,
) -> Result<(), ReportError> {
    let weeks = weekly_totals(series);
    if weeks.is_empty() {
        return Err(ReportError::Chart("no volume history".into()));
    }
    let root = BitMapBackend::new(path, (800, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let factor = WeightUnit::Kg.factor_to(unit);
    let max = weeks
        .iter()
        .map(|(_, v)| v * factor)
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let mut chart = ChartBuilder::on(&root)
        .caption("Weekly Volume", ("sans-serif", 25))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..weeks.len(), 0f64..max * 1.05)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Week")
        .y_desc(format!("Volume ({})", unit))
        .draw()
        .map_err(chart_err)?;
    chart
        .draw_series(LineSeries::new(
            weeks.iter().enumerate().map(|(i, (_, v))| (i, v * factor)),
            &BLUE,
        ))
        .map_err(chart_err)?;
    root.present().map_err(chart_err)?;
    Ok(())
}

fn build_html(data: &ReportData<'_>, chart_file: &std::ffi::OsStr) -> Markup {
    let summary = data.summary;
    html! {
        (DOCTYPE)
        html {
            head { meta charset="utf-8"; title { (data.title) } }
            body {
                h1 { (data.title) }
                table border="1" {
                    tr { th { "Exercises" } td { (summary.exercises) } }
                    tr { th { "Sets" } td { (summary.completed_sets) " / " (summary.total_sets) } }
                    tr { th { "Reps" } td { (summary.total_reps) } }
                    tr { th { "Volume" } td { (format_volume(&summary.volume(), data.unit)) } }
                    tr { th { "Peak RPE" } td { (format_rpe(summary.peak_rpe)) } }
                }
                h2 { "Exercises" }
                table border="1" {
                    tr { th { "Exercise" } th { "Sets" } th { "Reps" } th { "Top Weight" } th { "Volume" } th { "Peak RPE" } }
                    @for ex in data.exercises {
                        tr {
                            td { (ex.exercise) }
                            td { (ex.sets) }
                            td { (ex.reps) }
                            td { (ex.top_weight.fmt_opt()) " " (ex.unit) }
                            td { (ex.volume_kg.fmt_opt()) " kg / " (ex.volume_lb.round()) " lb" }
                            td { (format_rpe(ex.peak_rpe)) }
                        }
                    }
                }
                h2 { "Weekly Volume" }
                @if chart_file.is_empty() {
                    p { "Chart unavailable" }
                } @else {
                    img src=(chart_file.to_string_lossy());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn format_option_for_option_f64() {
        let none: Option<f64> = None;
        assert_eq!(none.fmt_opt(), "-");
        assert_eq!(Some(3.46_f64).fmt_opt(), "3.5");
        assert_eq!(Some(f64::NAN).fmt_opt(), "NaN");
    }

    fn sample_summary(peak_rpe: f64) -> WorkoutSummary {
        WorkoutSummary {
            exercises: 1,
            total_sets: 3,
            completed_sets: 3,
            total_reps: 15,
            volume_kg: 1500.0,
            volume_lb: 3307.0,
            peak_rpe,
        }
    }

    fn sample_exercises() -> Vec<ExerciseSummary> {
        vec![ExerciseSummary {
            exercise: "Squat".into(),
            unit: WeightUnit::Kg,
            sets: 3,
            reps: 15,
            top_weight: Some(100.0),
            volume_kg: 1500.0,
            volume_lb: 3307.0,
            reported_volume: None,
            peak_rpe: 0.0,
        }]
    }

    #[test]
    fn build_html_renders_na_for_missing_rpe() {
        let summary = sample_summary(0.0);
        let exercises = sample_exercises();
        let data = ReportData {
            title: "Day 1",
            summary: &summary,
            exercises: &exercises,
            volume_series: &[],
            unit: WeightUnit::Lb,
        };
        let output = build_html(&data, OsStr::new("chart.png")).into_string();

        assert!(output.contains("<td>N/A</td>"));
        assert!(!output.contains("<td>0</td>"));
        assert!(output.contains("3307 lb"));
        assert!(output.contains("100.0 kg"));
        assert!(output.contains("<img src=\"chart.png\">"));
    }

    #[test]
    fn report_without_history_skips_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        let summary = sample_summary(7.0);
        let data = ReportData {
            title: "Day 3",
            summary: &summary,
            exercises: &[],
            volume_series: &[],
            unit: WeightUnit::Kg,
        };
        export_html_report(&path, &data).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<title>Day 3</title>"));
        assert!(html.contains("Chart unavailable"));
        assert!(!dir.path().join("report.png").exists());
    }

    #[test]
    fn build_html_handles_empty_chart_file() {
        let summary = sample_summary(8.5);
        let data = ReportData {
            title: "Day 2",
            summary: &summary,
            exercises: &[],
            volume_series: &[],
            unit: WeightUnit::Kg,
        };
        let output = build_html(&data, OsStr::new("")).into_string();

        assert!(output.contains("Chart unavailable"));
        assert!(!output.contains("<img"));
        assert!(output.contains("<td>8.5</td>"));
        assert!(output.contains("1500.0 kg"));
    }
}
