//! Weight units and the per-exercise unit resolution heuristic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multiply kilograms by this to get pounds.
pub const KG_TO_LB: f64 = 2.20462;
/// Multiply pounds by this to get kilograms.
pub const LB_TO_KG: f64 = 0.453_592;

/// Lifts that are loaded in kilograms on the competition platform.
const COMPETITION_LIFTS: [&str; 3] = ["squat", "bench press", "deadlift"];

/// Unit a weight is recorded or displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }

    /// Factor that converts a value in `self` into `to`.
    pub fn factor_to(self, to: WeightUnit) -> f64 {
        match (self, to) {
            (WeightUnit::Kg, WeightUnit::Lb) => KG_TO_LB,
            (WeightUnit::Lb, WeightUnit::Kg) => LB_TO_KG,
            _ => 1.0,
        }
    }

    pub fn convert(self, value: f64, to: WeightUnit) -> f64 {
        value * self.factor_to(to)
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUnitError(pub String);

impl fmt::Display for ParseUnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown weight unit '{}'", self.0)
    }
}

impl std::error::Error for ParseUnitError {}

impl FromStr for WeightUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            _ => Err(ParseUnitError(s.to_string())),
        }
    }
}

/// The user's weight unit preference.
///
/// `Auto` lets [`resolve`] pick a unit per exercise; the explicit variants
/// always win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPreference {
    #[default]
    Auto,
    Kg,
    Lb,
}

impl fmt::Display for UnitPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitPreference::Auto => f.write_str("auto"),
            UnitPreference::Kg => f.write_str("kg"),
            UnitPreference::Lb => f.write_str("lb"),
        }
    }
}

impl FromStr for UnitPreference {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(UnitPreference::Auto);
        }
        s.parse::<WeightUnit>().map(|unit| match unit {
            WeightUnit::Kg => UnitPreference::Kg,
            WeightUnit::Lb => UnitPreference::Lb,
        })
    }
}

/// Whether the exercise name refers to one of squat, bench press or deadlift.
pub fn is_competition_lift(exercise_type: &str) -> bool {
    let name = exercise_type.to_lowercase();
    COMPETITION_LIFTS.iter().any(|lift| name.contains(lift))
}

/// Resolve the display unit for an exercise.
///
/// An explicit `kg`/`lb` preference is returned as is. With `auto`, the
/// competition lifts resolve to kilograms and everything else (dumbbell,
/// machine and cable work included) to pounds. A missing exercise type
/// resolves to pounds.
pub fn resolve(preference: UnitPreference, exercise_type: Option<&str>) -> WeightUnit {
    match preference {
        UnitPreference::Kg => WeightUnit::Kg,
        UnitPreference::Lb => WeightUnit::Lb,
        UnitPreference::Auto => match exercise_type {
            Some(name) if is_competition_lift(name) => WeightUnit::Kg,
            _ => WeightUnit::Lb,
        },
    }
}

/// Bind a preference into a resolver closure for the aggregation functions.
pub fn resolver(preference: UnitPreference) -> impl Fn(Option<&str>) -> WeightUnit + Copy {
    move |exercise_type| resolve(preference, exercise_type)
}
