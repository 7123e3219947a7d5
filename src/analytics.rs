//! Analytics series fetched from the backend and helpers to aggregate them.

use crate::api::{ApiClient, ApiError};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::thread;

/// Series shown on the analytics overview.
pub const DEFAULT_SERIES: [&str; 3] = ["volume", "rpe", "e1rm"];

/// One dated value of an analytics series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    #[serde(alias = "volume", alias = "total_volume", alias = "totalVolume")]
    pub value: f64,
}

/// Something that can produce a named series.
pub trait SeriesSource: Sync {
    fn fetch_series(&self, name: &str) -> Result<Vec<SeriesPoint>, ApiError>;
}

impl SeriesSource for ApiClient {
    fn fetch_series(&self, name: &str) -> Result<Vec<SeriesPoint>, ApiError> {
        self.get_series(name)
    }
}

/// Result of fetching several series at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsBundle {
    pub series: BTreeMap<String, Vec<SeriesPoint>>,
    /// Names of series whose fetch failed and were replaced by an empty one.
    pub failed: Vec<String>,
}

impl AnalyticsBundle {
    pub fn get(&self, name: &str) -> &[SeriesPoint] {
        self.series.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Fetch every named series concurrently and wait for all of them.
///
/// A failing or panicking branch does not abort the others; it is logged and
/// contributes an empty series.
pub fn fetch_all<S>(source: &S, names: &[&str]) -> AnalyticsBundle
where
    S: SeriesSource + ?Sized,
{
    let results: Vec<(String, Option<Vec<SeriesPoint>>)> = thread::scope(|scope| {
        let handles: Vec<_> = names
            .iter()
            .map(|name| (*name, scope.spawn(move || source.fetch_series(name))))
            .collect();
        handles
            .into_iter()
            .map(|(name, handle)| {
                let points = match handle.join() {
                    Ok(Ok(points)) => Some(points),
                    Ok(Err(e)) => {
                        log::warn!("Failed to fetch {name} series: {e}");
                        None
                    }
                    Err(_) => {
                        log::warn!("Fetching {name} series panicked");
                        None
                    }
                };
                (name.to_string(), points)
            })
            .collect()
    });

    let mut bundle = AnalyticsBundle::default();
    for (name, points) in results {
        match points {
            Some(mut points) => {
                points.sort_by_key(|p| p.date);
                bundle.series.insert(name, points);
            }
            None => {
                bundle.series.insert(name.clone(), Vec::new());
                bundle.failed.push(name);
            }
        }
    }
    log::info!(
        "Fetched {} analytics series ({} failed)",
        bundle.series.len(),
        bundle.failed.len()
    );
    bundle
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sum a series per ISO week, ordered by week.
pub fn weekly_totals(points: &[SeriesPoint]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for p in points {
        *weeks.entry(week_start(p.date)).or_insert(0.0) += p.value;
    }
    weeks.into_iter().collect()
}

/// Highest value per ISO week, ordered by week.
pub fn weekly_peaks(points: &[SeriesPoint]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for p in points {
        let peak = weeks.entry(week_start(p.date)).or_insert(p.value);
        *peak = peak.max(p.value);
    }
    weeks.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(d: &str, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: date(d),
            value,
        }
    }

    struct PartialSource;

    impl SeriesSource for PartialSource {
        fn fetch_series(&self, name: &str) -> Result<Vec<SeriesPoint>, ApiError> {
            match name {
                "volume" => Ok(vec![point("2024-01-08", 2.0), point("2024-01-01", 1.0)]),
                "rpe" => Err(ApiError::Status(500, "boom".into())),
                _ => panic!("unexpected series {name}"),
            }
        }
    }

    #[test]
    fn failed_branches_become_empty() {
        let bundle = fetch_all(&PartialSource, &["volume", "rpe", "e1rm"]);
        assert_eq!(bundle.series.len(), 3);
        let volume = bundle.get("volume");
        assert_eq!(volume.len(), 2);
        assert_eq!(volume[0].date, date("2024-01-01"));
        assert!(bundle.get("rpe").is_empty());
        assert!(bundle.get("e1rm").is_empty());
        assert_eq!(bundle.failed, vec!["rpe".to_string(), "e1rm".to_string()]);
        assert!(bundle.get("missing").is_empty());
    }

    #[test]
    fn fetches_over_http() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/analytics/volume");
            then.status(200).json_body(json!({
                "points": [{ "date": "2024-02-05", "total_volume": 5400.5 }]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/analytics/rpe");
            then.status(200)
                .json_body(json!([{ "date": "2024-02-05", "value": 8.5 }]));
        });
        server.mock(|when, then| {
            when.method(GET).path("/analytics/e1rm");
            then.status(404).body("no data");
        });

        let client = ApiClient::new(server.base_url(), None);
        let bundle = fetch_all(&client, &DEFAULT_SERIES);
        assert_eq!(bundle.get("volume"), &[point("2024-02-05", 5400.5)]);
        assert_eq!(bundle.get("rpe"), &[point("2024-02-05", 8.5)]);
        assert_eq!(bundle.failed, vec!["e1rm".to_string()]);
    }

    #[test]
    fn weekly_aggregation() {
        let points = vec![
            point("2024-01-01", 100.0), // Monday
            point("2024-01-07", 50.0),  // Sunday, same week
            point("2024-01-09", 30.0),
        ];
        assert_eq!(
            weekly_totals(&points),
            vec![(date("2024-01-01"), 150.0), (date("2024-01-08"), 30.0)]
        );
        assert_eq!(
            weekly_peaks(&points),
            vec![(date("2024-01-01"), 100.0), (date("2024-01-08"), 30.0)]
        );
        assert!(weekly_totals(&[]).is_empty());
    }
}
