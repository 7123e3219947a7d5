//! Training block view-models: a block holds weeks, a week holds days.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept ids sent either as JSON strings or numbers.
pub(crate) fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, alias = "dayNumber")]
    pub day_number: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, alias = "weekNumber")]
    pub week_number: u32,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl Week {
    pub fn day(&self, day_id: &str) -> Option<&Day> {
        self.days.iter().find(|d| d.id == day_id)
    }

    pub fn day_mut(&mut self, day_id: &str) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.id == day_id)
    }

    pub fn day_by_number(&self, day_number: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.day_number == day_number)
    }
}

/// A periodized training program spanning multiple weeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub weeks: Vec<Week>,
}

impl Block {
    pub fn week(&self, week_id: &str) -> Option<&Week> {
        self.weeks.iter().find(|w| w.id == week_id)
    }

    pub fn week_mut(&mut self, week_id: &str) -> Option<&mut Week> {
        self.weeks.iter_mut().find(|w| w.id == week_id)
    }

    pub fn week_by_number(&self, week_number: u32) -> Option<&Week> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    pub fn day(&self, week_id: &str, day_id: &str) -> Option<&Day> {
        self.week(week_id).and_then(|w| w.day(day_id))
    }

    pub fn day_mut(&mut self, week_id: &str, day_id: &str) -> Option<&mut Day> {
        self.week_mut(week_id).and_then(|w| w.day_mut(day_id))
    }

    /// Swap in a freshly fetched week. Returns `false` if the block has no
    /// week with that id.
    pub fn replace_week(&mut self, week: Week) -> bool {
        match self.week_mut(&week.id) {
            Some(slot) => {
                *slot = week;
                true
            }
            None => false,
        }
    }

    pub fn day_count(&self) -> usize {
        self.weeks.iter().map(|w| w.days.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_ids_and_camel_case() {
        let json = r#"{"id":7,"name":"Peaking","startDate":"2025-03-03","weeks":[
            {"id":"w1","weekNumber":1,"days":[{"id":11,"dayNumber":2,"focus":"Heavy","notes":null}]}]}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.id, "7");
        assert_eq!(block.start_date, NaiveDate::from_ymd_opt(2025, 3, 3));
        let day = block.day("w1", "11").unwrap();
        assert_eq!(day.day_number, 2);
        assert_eq!(day.focus.as_deref(), Some("Heavy"));
        assert_eq!(day.notes, None);
        assert_eq!(block.week_by_number(1).unwrap().id, "w1");
        assert_eq!(block.day_count(), 1);
    }

    #[test]
    fn rejects_object_ids() {
        let json = r#"{"id":{"nested":true}}"#;
        assert!(serde_json::from_str::<Block>(json).is_err());
    }

    #[test]
    fn replace_week_only_known_ids() {
        let mut block: Block = serde_json::from_str(
            r#"{"id":"b","weeks":[{"id":"w1","week_number":1,"days":[{"id":"d1","day_number":1}]}]}"#,
        )
        .unwrap();
        let mut fresh = block.weeks[0].clone();
        fresh.days[0].focus = Some("Volume".into());
        assert!(block.replace_week(fresh));
        assert_eq!(block.day("w1", "d1").unwrap().focus.as_deref(), Some("Volume"));

        let stranger = Week {
            id: "w9".into(),
            week_number: 9,
            days: vec![],
        };
        assert!(!block.replace_week(stranger));
    }
}
