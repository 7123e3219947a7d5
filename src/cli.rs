//! Command-line interface definition using clap.

use crate::units::UnitPreference;
use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Flow - training block planner and workout summaries
#[derive(Parser, Debug)]
#[command(name = "flow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override the stored unit preference (auto, kg, lb)
    #[arg(short, long, global = true)]
    pub unit: Option<UnitPreference>,

    /// API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the display unit chosen for an exercise
    ResolveUnit {
        /// Exercise type, e.g. "Competition Squat"
        exercise: Option<String>,
    },

    /// Summarize the workout logged for a day
    Summary {
        /// Day ID
        day_id: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Write the per-exercise breakdown to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// List training blocks
    Blocks,

    /// Show the weeks and days of a block
    Block {
        /// Block ID (defaults to the last block edited)
        block_id: Option<String>,
    },

    /// Set or clear the focus of several days at once
    BulkFocus {
        /// Block ID (defaults to the last block edited)
        #[arg(short, long)]
        block: Option<String>,

        /// Week ID or week number
        #[arg(short, long)]
        week: String,

        /// Day numbers, e.g. "1,3" or "1-3"
        #[arg(short, long)]
        days: String,

        /// Apply to the same day numbers in every week of the block
        #[arg(long)]
        all_weeks: bool,

        /// New focus
        #[arg(short, long, conflicts_with = "clear", required_unless_present = "clear")]
        focus: Option<String>,

        /// Clear the focus instead of setting one
        #[arg(long)]
        clear: bool,
    },

    /// Fetch analytics series
    Analytics {
        /// Series to fetch (defaults to volume, rpe and e1rm)
        #[arg(short, long)]
        series: Vec<String>,

        /// Directory to write one CSV per series into
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Write an HTML report for a day's workout
    Report {
        /// Day ID
        day_id: String,

        /// Output HTML file
        #[arg(short, long, default_value = "report.html")]
        out: PathBuf,

        /// Open the report once written
        #[arg(long)]
        open: bool,
    },

    /// Export summaries of several days
    Export {
        /// Day IDs
        #[arg(required = true)]
        day_ids: Vec<String>,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
    },

    /// List or search the exercise library
    Exercises {
        /// Only show exercises whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Send feedback to the Flow team
    Feedback {
        /// Message to send
        #[arg(required = true)]
        message: String,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print current settings
    Show,
    /// Change one setting, e.g. `bulk.max_retries 2`
    Set { key: String, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

static DAY_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*(?:-\s*(\d+)\s*)?$").expect("valid day range regex"));

/// Parse a day list such as `1,3` or `1-3,5` into sorted, unique day numbers.
pub fn parse_day_numbers(input: &str) -> Result<Vec<u32>, String> {
    let mut days = Vec::new();
    for part in input.split(',').filter(|p| !p.trim().is_empty()) {
        let caps = DAY_RANGE
            .captures(part)
            .ok_or_else(|| format!("invalid day list entry '{}'", part.trim()))?;
        let start: u32 = caps[1].parse().map_err(|_| format!("invalid day '{}'", &caps[1]))?;
        let end: u32 = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| format!("invalid day '{}'", m.as_str()))?,
            None => start,
        };
        if start == 0 || end < start {
            return Err(format!("invalid day range '{}'", part.trim()));
        }
        days.extend(start..=end);
    }
    if days.is_empty() {
        return Err("no days given".into());
    }
    days.sort_unstable();
    days.dedup();
    Ok(days)
}
