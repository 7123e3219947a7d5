use crate::aggregate::{ExerciseSummary, WorkoutSummary, format_rpe};
use crate::analytics::SeriesPoint;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// One exported row per day. The RPE column carries the display form, so a
/// day without recorded RPE reads `N/A` rather than `0`.
#[derive(Serialize)]
struct SummaryRow<'a> {
    day_id: &'a str,
    exercises: usize,
    total_sets: u32,
    completed_sets: u32,
    total_reps: u32,
    volume_kg: f64,
    volume_lb: f64,
    peak_rpe: String,
}

impl<'a> SummaryRow<'a> {
    fn new(day_id: &'a str, s: &WorkoutSummary) -> Self {
        Self {
            day_id,
            exercises: s.exercises,
            total_sets: s.total_sets,
            completed_sets: s.completed_sets,
            total_reps: s.total_reps,
            volume_kg: s.volume_kg,
            volume_lb: s.volume_lb,
            peak_rpe: format_rpe(s.peak_rpe),
        }
    }
}

pub fn write_summaries_csv(
    writer: impl Write,
    summaries: &[(String, WorkoutSummary)],
) -> csv::Result<()> {
    let rows: Vec<SummaryRow> = summaries
        .iter()
        .map(|(day, s)| SummaryRow::new(day, s))
        .collect();
    write_csv(writer, &rows)
}

pub fn save_summaries_csv<P: AsRef<Path>>(
    path: P,
    summaries: &[(String, WorkoutSummary)],
) -> csv::Result<()> {
    write_summaries_csv(std::fs::File::create(path)?, summaries)
}

pub fn save_summaries_json<P: AsRef<Path>>(
    path: P,
    summaries: &[(String, WorkoutSummary)],
) -> std::io::Result<()> {
    #[derive(Serialize)]
    struct Entry<'a> {
        day_id: &'a str,
        #[serde(flatten)]
        summary: &'a WorkoutSummary,
    }
    let entries: Vec<Entry> = summaries
        .iter()
        .map(|(day_id, summary)| Entry { day_id, summary })
        .collect();
    write_json(&entries, path)
}

pub fn save_exercise_summaries_csv<P: AsRef<Path>>(
    path: P,
    exercises: &[ExerciseSummary],
) -> csv::Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        exercise: &'a str,
        unit: &'a str,
        sets: u32,
        reps: u32,
        top_weight: Option<f64>,
        volume_kg: f64,
        volume_lb: f64,
        reported_volume: Option<f64>,
        peak_rpe: String,
    }
    let rows: Vec<Row> = exercises
        .iter()
        .map(|e| Row {
            exercise: &e.exercise,
            unit: e.unit.label(),
            sets: e.sets,
            reps: e.reps,
            top_weight: e.top_weight,
            volume_kg: e.volume_kg,
            volume_lb: e.volume_lb,
            reported_volume: e.reported_volume,
            peak_rpe: format_rpe(e.peak_rpe),
        })
        .collect();
    write_csv(std::fs::File::create(path)?, &rows)
}

pub fn save_series_csv<P: AsRef<Path>>(path: P, points: &[SeriesPoint]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(peak_rpe: f64) -> WorkoutSummary {
        WorkoutSummary {
            exercises: 2,
            total_sets: 6,
            completed_sets: 5,
            total_reps: 30,
            volume_kg: 500.0,
            volume_lb: 1102.0,
            peak_rpe,
        }
    }

    #[test]
    fn summaries_csv_renders_missing_rpe() {
        let mut out = Vec::new();
        write_summaries_csv(
            &mut out,
            &[("d1".into(), summary(8.5)), ("d2".into(), summary(0.0))],
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "day_id,exercises,total_sets,completed_sets,total_reps,volume_kg,volume_lb,peak_rpe"
        );
        assert_eq!(lines[1], "d1,2,6,5,30,500.0,1102.0,8.5");
        assert_eq!(lines[2], "d2,2,6,5,30,500.0,1102.0,N/A");
    }

    #[test]
    fn summaries_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries.json");
        save_summaries_json(&path, &[("d1".into(), summary(9.0))]).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["day_id"], "d1");
        assert_eq!(value[0]["volume_lb"], 1102.0);
        assert_eq!(value[0]["peak_rpe"], 9.0);
    }

    #[test]
    fn exercise_csv_includes_reported_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exercises.csv");
        let exercise = |name: &str, reported: Option<f64>| ExerciseSummary {
            exercise: name.into(),
            unit: crate::units::WeightUnit::Lb,
            sets: 3,
            reps: 30,
            top_weight: Some(100.0),
            volume_kg: 1360.8,
            volume_lb: 3000.0,
            reported_volume: reported,
            peak_rpe: 0.0,
        };
        save_exercise_summaries_csv(
            &path,
            &[exercise("Leg Press", Some(3000.0)), exercise("Cable Fly", None)],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "exercise,unit,sets,reps,top_weight,volume_kg,volume_lb,reported_volume,peak_rpe"
        );
        assert_eq!(lines[1], "Leg Press,lb,3,30,100.0,1360.8,3000.0,3000.0,N/A");
        assert_eq!(lines[2], "Cable Fly,lb,3,30,100.0,1360.8,3000.0,,N/A");
    }

    #[test]
    fn series_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volume.csv");
        let points = vec![SeriesPoint {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            value: 1234.5,
        }];
        save_series_csv(&path, &points).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,value\n2024-03-04,1234.5\n");
    }
}
