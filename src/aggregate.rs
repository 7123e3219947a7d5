// Module for summarizing logged workouts
use crate::units::{KG_TO_LB, LB_TO_KG, WeightUnit};
use crate::workout::{ExerciseEntry, ExerciseSet, SetData, Workout};
use serde::{Deserialize, Serialize};

/// Total training volume expressed in both units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub kg: f64,
    pub lb: f64,
}

/// Volume accumulated in the unit each set was recorded in.
#[derive(Debug, Default, Clone, Copy)]
struct NativeTotals {
    kg: f64,
    lb: f64,
}

impl NativeTotals {
    fn add(&mut self, unit: WeightUnit, volume: f64) {
        match unit {
            WeightUnit::Kg => self.kg += volume,
            WeightUnit::Lb => self.lb += volume,
        }
    }

    /// Convert the complementary totals and round for display: kg to one
    /// decimal place, lb to the nearest integer.
    fn finish(self) -> Volume {
        let kg = self.kg + self.lb * LB_TO_KG;
        let lb = self.lb + self.kg * KG_TO_LB;
        Volume {
            kg: (kg * 10.0).round() / 10.0,
            lb: lb.round(),
        }
    }
}

fn entry_unit<F>(entry: &ExerciseEntry, resolve_unit: &F) -> WeightUnit
where
    F: Fn(Option<&str>) -> WeightUnit,
{
    entry
        .display_unit
        .unwrap_or_else(|| resolve_unit(entry.exercise_name()))
}

fn accumulate_entry<F>(entry: &ExerciseEntry, resolve_unit: &F, totals: &mut NativeTotals)
where
    F: Fn(Option<&str>) -> WeightUnit,
{
    let fallback = entry_unit(entry, resolve_unit);
    match &entry.sets {
        SetData::Detailed(sets) => {
            for set in sets {
                totals.add(set.unit.unwrap_or(fallback), set.weight * set.reps as f64);
            }
        }
        SetData::Flat { sets, reps, weight } => {
            totals.add(fallback, *sets as f64 * *reps as f64 * weight);
        }
    }
}

/// Compute the total volume (weight x reps) of a workout in kg and lb.
///
/// Each set is accumulated in the unit it was recorded in. A set without its
/// own unit uses the exercise's display unit and, failing that, whatever
/// `resolve_unit` returns for the exercise type. Exercises reported in the
/// legacy flat shape contribute `sets * reps * weight`.
pub fn compute_volume<F>(workout: &Workout, resolve_unit: F) -> Volume
where
    F: Fn(Option<&str>) -> WeightUnit,
{
    let mut totals = NativeTotals::default();
    for entry in &workout.exercises {
        accumulate_entry(entry, &resolve_unit, &mut totals);
    }
    totals.finish()
}

fn entry_peak_rpe(entry: &ExerciseEntry) -> f64 {
    match &entry.sets {
        SetData::Detailed(sets) => sets
            .iter()
            .filter_map(|s| s.rpe)
            .filter(|rpe| *rpe > 0.0)
            .fold(0.0, f64::max),
        SetData::Flat { .. } => 0.0,
    }
}

/// Highest RPE recorded across all sets, or `0.0` when none was recorded.
///
/// The `0.0` sentinel must be displayed through [`format_rpe`].
pub fn compute_highest_rpe(workout: &Workout) -> f64 {
    workout
        .exercises
        .iter()
        .map(entry_peak_rpe)
        .fold(0.0, f64::max)
}

/// Render a peak RPE, showing `N/A` for the "nothing recorded" sentinel.
pub fn format_rpe(rpe: f64) -> String {
    if rpe <= 0.0 || !rpe.is_finite() {
        "N/A".into()
    } else if rpe.fract() == 0.0 {
        format!("{rpe:.0}")
    } else {
        format!("{rpe:.1}")
    }
}

pub fn format_volume(volume: &Volume, unit: WeightUnit) -> String {
    match unit {
        WeightUnit::Kg => format!("{:.1} kg", volume.kg),
        WeightUnit::Lb => format!("{:.0} lb", volume.lb),
    }
}

/// Summary statistics about one workout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub exercises: usize,
    pub total_sets: u32,
    pub completed_sets: u32,
    pub total_reps: u32,
    pub volume_kg: f64,
    pub volume_lb: f64,
    pub peak_rpe: f64,
}

impl WorkoutSummary {
    pub fn volume(&self) -> Volume {
        Volume {
            kg: self.volume_kg,
            lb: self.volume_lb,
        }
    }
}

/// Per-exercise breakdown used by reports and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub exercise: String,
    pub unit: WeightUnit,
    pub sets: u32,
    pub reps: u32,
    pub top_weight: Option<f64>,
    pub volume_kg: f64,
    pub volume_lb: f64,
    /// Volume the backend reported for the exercise, in `unit`.
    pub reported_volume: Option<f64>,
    pub peak_rpe: f64,
}

/// Counts from the backend are untrusted; totals saturate at `u32::MAX`.
fn sum_reps(sets: &[ExerciseSet]) -> u32 {
    sets.iter().fold(0u32, |acc, s| acc.saturating_add(s.reps))
}

fn clamp_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Aggregate set, rep, volume and RPE statistics for a workout.
///
/// Sets in the legacy flat shape have no completion flag and are counted as
/// completed.
pub fn summarize<F>(workout: &Workout, resolve_unit: F) -> WorkoutSummary
where
    F: Fn(Option<&str>) -> WeightUnit,
{
    let mut total_sets = 0u32;
    let mut completed_sets = 0u32;
    let mut total_reps = 0u32;

    for entry in &workout.exercises {
        total_sets = total_sets.saturating_add(entry.sets.set_count());
        match &entry.sets {
            SetData::Detailed(sets) => {
                let completed = sets.iter().filter(|s| s.completed).count();
                completed_sets = completed_sets.saturating_add(clamp_count(completed));
                total_reps = total_reps.saturating_add(sum_reps(sets));
            }
            SetData::Flat { sets, reps, .. } => {
                completed_sets = completed_sets.saturating_add(*sets);
                total_reps = total_reps.saturating_add(sets.saturating_mul(*reps));
            }
        }
    }

    let volume = compute_volume(workout, &resolve_unit);
    log::info!(
        "Summarized workout: {} exercises, {} sets",
        workout.exercises.len(),
        total_sets
    );

    WorkoutSummary {
        exercises: workout.exercises.len(),
        total_sets,
        completed_sets,
        total_reps,
        volume_kg: volume.kg,
        volume_lb: volume.lb,
        peak_rpe: compute_highest_rpe(workout),
    }
}

/// Break a workout down per exercise, in the order the exercises were logged.
pub fn summarize_exercises<F>(workout: &Workout, resolve_unit: F) -> Vec<ExerciseSummary>
where
    F: Fn(Option<&str>) -> WeightUnit,
{
    workout
        .exercises
        .iter()
        .map(|entry| {
            let unit = entry_unit(entry, &resolve_unit);
            let mut totals = NativeTotals::default();
            accumulate_entry(entry, &resolve_unit, &mut totals);
            let volume = totals.finish();
            let computed = match unit {
                WeightUnit::Kg => volume.kg,
                WeightUnit::Lb => volume.lb,
            };
            if let Some(reported) = entry.reported_volume {
                if (reported - computed).abs() > (computed * 0.01).max(1.0) {
                    log::warn!(
                        "{}: backend reports volume {reported} {unit}, computed {computed}",
                        entry.exercise_type
                    );
                }
            }
            let (reps, top_weight) = match &entry.sets {
                SetData::Detailed(sets) => (
                    sum_reps(sets),
                    sets.iter()
                        .map(|s| s.unit.unwrap_or(unit).convert(s.weight, unit))
                        .fold(None, |best: Option<f64>, w| Some(best.map_or(w, |b| b.max(w)))),
                ),
                SetData::Flat { sets, reps, weight } => {
                    (sets.saturating_mul(*reps), (*sets > 0).then_some(*weight))
                }
            };
            ExerciseSummary {
                exercise: entry.exercise_type.clone(),
                unit,
                sets: entry.sets.set_count(),
                reps,
                top_weight,
                volume_kg: volume.kg,
                volume_lb: volume.lb,
                reported_volume: entry.reported_volume,
                peak_rpe: entry_peak_rpe(entry),
            }
        })
        .collect()
}
