//! Workout view-model and the normalization of backend workout payloads.
//!
//! Different backend versions report the same data under different field
//! names (`sets_data` vs `sets`, `volume` vs `total_volume`, ...). The raw
//! shapes below absorb those differences; nothing past [`Workout::from_json`]
//! probes optional fields.

use crate::units::WeightUnit;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A single recorded set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExerciseSet {
    pub weight: f64,
    pub reps: u32,
    /// Always within `[0, 10]` when present.
    pub rpe: Option<f64>,
    pub completed: bool,
    /// Unit the weight was recorded in, if the backend said so.
    pub unit: Option<WeightUnit>,
}

/// How the sets of an exercise were reported.
#[derive(Debug, Clone, PartialEq)]
pub enum SetData {
    /// Per-set rows.
    Detailed(Vec<ExerciseSet>),
    /// Legacy shape: one weight and rep count for `sets` identical sets.
    Flat { sets: u32, reps: u32, weight: f64 },
}

impl SetData {
    pub fn set_count(&self) -> u32 {
        match self {
            SetData::Detailed(sets) => u32::try_from(sets.len()).unwrap_or(u32::MAX),
            SetData::Flat { sets, .. } => *sets,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub exercise_type: String,
    pub sets: SetData,
    pub display_unit: Option<WeightUnit>,
    /// Volume as computed by the backend, in the exercise's display unit.
    pub reported_volume: Option<f64>,
}

impl ExerciseEntry {
    /// Exercise type, or `None` when the backend sent an empty name.
    pub fn exercise_name(&self) -> Option<&str> {
        let name = self.exercise_type.trim();
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workout {
    pub exercises: Vec<ExerciseEntry>,
}

impl Workout {
    /// Parse and normalize a workout payload.
    pub fn from_json(json: &str) -> Result<Workout, serde_json::Error> {
        let raw: RawWorkout = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Wire shape of `/days/{id}/workout`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawWorkout {
    pub exercises: Vec<RawExercise>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawExercise {
    #[serde(alias = "exerciseType", alias = "exercise_name", alias = "name")]
    pub exercise_type: Option<String>,
    #[serde(alias = "setsData")]
    pub sets_data: Option<Vec<RawSet>>,
    /// Either an array of sets or the legacy set count.
    pub sets: Option<Value>,
    pub reps: Option<Value>,
    pub weight: Option<Value>,
    #[serde(alias = "total_volume", alias = "totalVolume")]
    pub volume: Option<Value>,
    #[serde(alias = "displayUnit", alias = "unit")]
    pub display_unit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSet {
    pub weight: Option<Value>,
    pub weight_kg: Option<Value>,
    #[serde(alias = "weight_lbs")]
    pub weight_lb: Option<Value>,
    pub reps: Option<Value>,
    pub rpe: Option<Value>,
    #[serde(deserialize_with = "lenient_bool")]
    pub completed: bool,
    pub unit: Option<String>,
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

/// Read a number out of a loosely typed JSON value.
///
/// Numeric strings are accepted; anything else, and any negative or
/// non-finite number, yields `None`.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn count(value: Option<&Value>) -> u32 {
    number(value).map_or(0, |n| n.round().min(u32::MAX as f64) as u32)
}

fn unit(value: Option<&str>) -> Option<WeightUnit> {
    value.and_then(|u| u.parse().ok())
}

impl From<RawSet> for ExerciseSet {
    fn from(raw: RawSet) -> Self {
        let (weight, implied_unit) = if let Some(w) = number(raw.weight.as_ref()) {
            (w, None)
        } else if let Some(w) = number(raw.weight_kg.as_ref()) {
            (w, Some(WeightUnit::Kg))
        } else if let Some(w) = number(raw.weight_lb.as_ref()) {
            (w, Some(WeightUnit::Lb))
        } else {
            (0.0, None)
        };

        let rpe = match raw.rpe.as_ref() {
            None | Some(Value::Null) => None,
            Some(v) => match number(Some(v)) {
                Some(rpe) if rpe <= 10.0 => Some(rpe),
                _ => {
                    log::warn!("Dropping out of range RPE value {v}");
                    None
                }
            },
        };

        ExerciseSet {
            weight,
            reps: count(raw.reps.as_ref()),
            rpe,
            completed: raw.completed,
            unit: unit(raw.unit.as_deref()).or(implied_unit),
        }
    }
}

impl From<RawExercise> for ExerciseEntry {
    fn from(raw: RawExercise) -> Self {
        let detailed: Option<Vec<ExerciseSet>> = match (raw.sets_data, raw.sets.as_ref()) {
            (Some(rows), _) if !rows.is_empty() => Some(rows.into_iter().map(Into::into).collect()),
            (_, Some(Value::Array(rows))) => Some(
                rows.iter()
                    .map(|row| {
                        serde_json::from_value::<RawSet>(row.clone())
                            .unwrap_or_default()
                            .into()
                    })
                    .collect(),
            ),
            _ => None,
        };

        let sets = match detailed {
            Some(sets) => SetData::Detailed(sets),
            None if raw.sets.is_some() || raw.reps.is_some() || raw.weight.is_some() => {
                SetData::Flat {
                    sets: count(raw.sets.as_ref()),
                    reps: count(raw.reps.as_ref()),
                    weight: number(raw.weight.as_ref()).unwrap_or(0.0),
                }
            }
            None => SetData::Detailed(Vec::new()),
        };

        ExerciseEntry {
            exercise_type: raw.exercise_type.unwrap_or_default(),
            sets,
            display_unit: unit(raw.display_unit.as_deref()),
            reported_volume: number(raw.volume.as_ref()),
        }
    }
}

impl From<RawWorkout> for Workout {
    fn from(raw: RawWorkout) -> Self {
        Workout {
            exercises: raw.exercises.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sets_data() {
        let json = r#"{"exercises":[{"exercise_type":"Squat","display_unit":"kg",
            "sets_data":[{"weight":100,"reps":5,"rpe":8,"completed":true},
                         {"weight":"102.5","reps":"3","completed":false}]}]}"#;
        let workout = Workout::from_json(json).unwrap();
        let ex = &workout.exercises[0];
        assert_eq!(ex.exercise_type, "Squat");
        assert_eq!(ex.display_unit, Some(WeightUnit::Kg));
        match &ex.sets {
            SetData::Detailed(sets) => {
                assert_eq!(sets.len(), 2);
                assert_eq!(sets[0].weight, 100.0);
                assert_eq!(sets[0].rpe, Some(8.0));
                assert!(sets[0].completed);
                assert_eq!(sets[1].weight, 102.5);
                assert_eq!(sets[1].reps, 3);
                assert_eq!(sets[1].rpe, None);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_flat_legacy_shape() {
        let json = r#"{"exercises":[{"name":"Leg Press","sets":4,"reps":10,"weight":200,"total_volume":8000}]}"#;
        let workout = Workout::from_json(json).unwrap();
        let ex = &workout.exercises[0];
        assert_eq!(
            ex.sets,
            SetData::Flat {
                sets: 4,
                reps: 10,
                weight: 200.0
            }
        );
        assert_eq!(ex.reported_volume, Some(8000.0));
        assert_eq!(ex.sets.set_count(), 4);
    }

    #[test]
    fn sets_array_is_detailed() {
        let json = r#"{"exercises":[{"exerciseType":"Bench Press","sets":[{"weight_kg":60,"reps":8}]}]}"#;
        let workout = Workout::from_json(json).unwrap();
        match &workout.exercises[0].sets {
            SetData::Detailed(sets) => assert_eq!(sets[0].unit, Some(WeightUnit::Kg)),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn malformed_numbers_become_zero() {
        let json = r#"{"exercises":[{"exercise_type":"Row","sets_data":[
            {"weight":"heavy","reps":null,"rpe":"n/a"},
            {"weight":-20,"reps":5,"rpe":14}]}]}"#;
        let workout = Workout::from_json(json).unwrap();
        match &workout.exercises[0].sets {
            SetData::Detailed(sets) => {
                assert_eq!(sets[0].weight, 0.0);
                assert_eq!(sets[0].reps, 0);
                assert_eq!(sets[0].rpe, None);
                assert_eq!(sets[1].weight, 0.0);
                assert_eq!(sets[1].reps, 5);
                assert_eq!(sets[1].rpe, None);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn rpe_boundaries() {
        let json = r#"{"exercises":[{"exercise_type":"Bench Press","sets_data":[
            {"weight":100,"reps":1,"rpe":10},
            {"weight":90,"reps":3,"rpe":0},
            {"weight":80,"reps":5,"rpe":-1},
            {"weight":80,"reps":5,"rpe":10.5}]}]}"#;
        let workout = Workout::from_json(json).unwrap();
        match &workout.exercises[0].sets {
            SetData::Detailed(sets) => {
                assert_eq!(sets[0].rpe, Some(10.0));
                assert_eq!(sets[1].rpe, Some(0.0));
                assert_eq!(sets[2].rpe, None);
                assert_eq!(sets[3].rpe, None);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(crate::aggregate::compute_highest_rpe(&workout), 10.0);

        let zero_only = Workout::from_json(
            r#"{"exercises":[{"exercise_type":"Squat","sets_data":[{"weight":100,"reps":5,"rpe":0}]}]}"#,
        )
        .unwrap();
        assert_eq!(crate::aggregate::compute_highest_rpe(&zero_only), 0.0);
    }

    #[test]
    fn empty_exercise_has_no_sets() {
        let workout = Workout::from_json(r#"{"exercises":[{}]}"#).unwrap();
        let ex = &workout.exercises[0];
        assert_eq!(ex.sets, SetData::Detailed(Vec::new()));
        assert_eq!(ex.exercise_name(), None);
        assert!(Workout::from_json("{}").unwrap().is_empty());
    }
}
