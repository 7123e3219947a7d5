use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::units::is_competition_lift;

/// Minimum similarity for a fuzzy name match to be accepted.
const MATCH_THRESHOLD: f64 = 0.85;

/// Typical equipment used for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Machine,
    Cable,
    Bodyweight,
    Other,
}

/// Where an exercise sits relative to the competition lifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Competition,
    Variation,
    Accessory,
}

#[derive(Debug, Clone, Copy)]
pub struct ExerciseInfo {
    pub category: Category,
    pub equipment: Equipment,
}

/// Built-in catalogue, keyed by normalized name.
pub static EXERCISES: phf::Map<&'static str, ExerciseInfo> = phf_map! {
    "squat" => ExerciseInfo { category: Category::Competition, equipment: Equipment::Barbell },
    "bench press" => ExerciseInfo { category: Category::Competition, equipment: Equipment::Barbell },
    "deadlift" => ExerciseInfo { category: Category::Competition, equipment: Equipment::Barbell },
    "pause squat" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "front squat" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "close grip bench press" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "larsen press" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "sumo deadlift" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "deficit deadlift" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "romanian deadlift" => ExerciseInfo { category: Category::Variation, equipment: Equipment::Barbell },
    "overhead press" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Barbell },
    "barbell row" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Barbell },
    "dumbbell row" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Dumbbell },
    "dumbbell bench press" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Dumbbell },
    "leg press" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Machine },
    "lying leg curl" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Machine },
    "lat pulldown" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Cable },
    "cable fly" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Cable },
    "triceps pushdown" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Cable },
    "pull up" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Bodyweight },
    "dip" => ExerciseInfo { category: Category::Accessory, equipment: Equipment::Bodyweight },
};

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid separator pattern"));

/// Lower-case a name and collapse punctuation and whitespace to single
/// spaces, so "Bench-Press (Barbell)" and "bench press barbell" compare equal.
pub fn normalize_name(name: &str) -> String {
    NON_ALNUM
        .replace_all(&name.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Lookup catalogue information for an exercise name.
///
/// Exact normalized names win; otherwise the closest catalogue entry above
/// the similarity threshold is used.
pub fn info_for(exercise: &str) -> Option<&'static ExerciseInfo> {
    let key = normalize_name(exercise);
    EXERCISES
        .get(key.as_str())
        .or_else(|| closest_catalogue_name(&key).and_then(|name| EXERCISES.get(name)))
}

fn closest_catalogue_name(normalized: &str) -> Option<&'static str> {
    EXERCISES
        .keys()
        .map(|k| (*k, strsim::jaro_winkler(normalized, k)))
        .filter(|(_, score)| *score >= MATCH_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k)
}

/// Category of an exercise, falling back to the competition-lift keywords for
/// names the catalogue does not know.
pub fn category_for(exercise: &str) -> Category {
    match info_for(exercise) {
        Some(info) => info.category,
        None if is_competition_lift(exercise) => Category::Variation,
        None => Category::Accessory,
    }
}

/// An exercise type from the backend library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseType {
    #[serde(deserialize_with = "crate::block::id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Backend exercise library with name lookup.
#[derive(Debug, Clone, Default)]
pub struct ExerciseLibrary {
    types: Vec<ExerciseType>,
}

impl ExerciseLibrary {
    pub fn new(types: Vec<ExerciseType>) -> Self {
        Self { types }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Find the exercise type best matching `query`.
    pub fn find(&self, query: &str) -> Option<&ExerciseType> {
        let query = normalize_name(query);
        if let Some(exact) = self.types.iter().find(|t| normalize_name(&t.name) == query) {
            return Some(exact);
        }
        self.types
            .iter()
            .map(|t| (t, strsim::jaro_winkler(&query, &normalize_name(&t.name))))
            .filter(|(_, score)| *score >= MATCH_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t)
    }

    /// Exercise types whose name contains `query`, sorted by name.
    pub fn search(&self, query: &str) -> Vec<&ExerciseType> {
        let query = normalize_name(query);
        let mut hits: Vec<&ExerciseType> = self
            .types
            .iter()
            .filter(|t| normalize_name(&t.name).contains(&query))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ExerciseLibrary {
        ExerciseLibrary::new(vec![
            ExerciseType {
                id: "1".into(),
                name: "Competition Squat".into(),
                category: Some("SBD".into()),
            },
            ExerciseType {
                id: "2".into(),
                name: "Romanian Deadlift".into(),
                category: None,
            },
            ExerciseType {
                id: "3".into(),
                name: "Dumbbell Row".into(),
                category: None,
            },
        ])
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_name("  Bench-Press (Barbell) "), "bench press barbell");
        assert_eq!(normalize_name("Pull-Up"), "pull up");
    }

    #[test]
    fn catalogue_lookup() {
        let info = info_for("Bench Press").unwrap();
        assert_eq!(info.category, Category::Competition);
        assert_eq!(info.equipment, Equipment::Barbell);
        assert_eq!(info_for("Lat Pull-down").unwrap().equipment, Equipment::Cable);
        assert!(info_for("Kettlebell Swing").is_none());
    }

    #[test]
    fn category_falls_back_to_keywords() {
        assert_eq!(category_for("Deadlift"), Category::Competition);
        assert_eq!(category_for("Tempo Squat With Chains"), Category::Variation);
        assert_eq!(category_for("Face Pull"), Category::Accessory);
    }

    #[test]
    fn library_find() {
        let lib = library();
        assert_eq!(lib.find("competition squat").unwrap().id, "1");
        assert_eq!(lib.find("Romanian Deadlifts").unwrap().id, "2");
        assert!(lib.find("Bicep Curl").is_none());
    }

    #[test]
    fn library_search() {
        let lib = library();
        let hits = lib.search("dead");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Romanian Deadlift");
        assert_eq!(lib.search("").len(), 3);
        assert_eq!(lib.len(), 3);
    }
}
