//! Command-line client for the Flow training API.

use clap::Parser;
use log::info;
use std::error::Error;
use std::process::ExitCode;

mod aggregate;
use aggregate::{
    ExerciseSummary, WorkoutSummary, format_rpe, format_volume, summarize, summarize_exercises,
};
mod analytics;
use analytics::{DEFAULT_SERIES, SeriesPoint, fetch_all, weekly_peaks, weekly_totals};
mod api;
use api::ApiClient;
mod block;
use block::{Block, Week};
mod bulk_edit;
use bulk_edit::{BlockBulkEditor, BulkOptions, BulkReport, ThreadPacer};
mod cli;
use cli::{Cli, Commands, ConfigAction, ExportFormat, parse_day_numbers};
mod exercise_library;
use exercise_library::{ExerciseLibrary, category_for, info_for};
mod export;
mod report;
mod settings;
use settings::Settings;
mod units;
use units::{UnitPreference, WeightUnit, resolve, resolver};
mod workout;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::load();
    let preference = cli.unit.unwrap_or(settings.unit_preference);
    let client = match &cli.api_url {
        Some(url) => ApiClient::new(url.clone(), settings.api_token()),
        None => ApiClient::from_settings(&settings),
    };
    log::debug!("Using API at {}", client.base_url());

    match cli.command {
        Commands::ResolveUnit { exercise } => {
            println!("{}", resolve(preference, exercise.as_deref()));
        }
        Commands::Summary { day_id, json, csv } => {
            let workout = client.get_day_workout(&day_id)?;
            let summary = summarize(&workout, resolver(preference));
            let exercises = summarize_exercises(&workout, resolver(preference));
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if workout.is_empty() {
                println!("No workout logged for day {day_id}");
            } else {
                for line in summary_lines(&summary, &exercises, preference) {
                    println!("{line}");
                }
            }
            if let Some(path) = csv {
                export::save_exercise_summaries_csv(&path, &exercises)?;
                info!("Wrote exercise breakdown to {}", path.display());
            }
        }
        Commands::Blocks => {
            let blocks = client.list_blocks()?;
            if blocks.is_empty() {
                println!("No blocks");
            }
            for block in blocks {
                let start = block
                    .start_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{}\t{}\tstarts {}\t{} weeks, {} days",
                    block.id,
                    block.name,
                    start,
                    block.weeks.len(),
                    block.day_count()
                );
            }
        }
        Commands::Block { block_id } => {
            let block_id = block_id_or_last(block_id, &settings)?;
            let block = client.get_block(&block_id)?;
            for line in block_lines(&block) {
                println!("{line}");
            }
        }
        Commands::BulkFocus {
            block,
            week,
            days,
            all_weeks,
            focus,
            clear,
        } => {
            let block_id = block_id_or_last(block, &settings)?;
            let day_numbers = parse_day_numbers(&days)?;
            let block = client.get_block(&block_id)?;
            let week_id = find_week(&block, &week)
                .map(|w| w.id.clone())
                .ok_or_else(|| format!("Block {block_id} has no week '{week}'"))?;

            let mut editor = BlockBulkEditor::new(block, BulkOptions::from(&settings.bulk));
            editor.select_day_numbers(&week_id, &day_numbers)?;
            if editor.selection_len() == 0 {
                return Err(format!("No days matching '{days}' in week '{week}'").into());
            }
            let target = if clear { None } else { focus };
            let report = editor.apply(target, all_weeks, &client, &mut ThreadPacer)?;
            info!("Bulk edit finished: {:?}", editor.state());

            settings.last_block_id = Some(block_id);
            if let Err(e) = settings.save() {
                log::warn!("Failed to save settings: {e}");
            }

            for line in bulk_report_lines(&report) {
                println!("{line}");
            }
            for line in block_lines(editor.block()) {
                println!("{line}");
            }
            if !report.failed.is_empty() {
                return Err(format!(
                    "{} of {} updates failed",
                    report.failed.len(),
                    report.requests()
                )
                .into());
            }
        }
        Commands::Analytics { series, csv } => {
            let names: Vec<&str> = if series.is_empty() {
                DEFAULT_SERIES.to_vec()
            } else {
                series.iter().map(String::as_str).collect()
            };
            let bundle = fetch_all(&client, &names);
            for name in &names {
                let points = bundle.get(name);
                match points.last() {
                    Some(last) => println!(
                        "{name}: {} points, latest {:.1} on {}",
                        points.len(),
                        last.value,
                        last.date
                    ),
                    None => println!("{name}: no data"),
                }
                let weekly = if *name == "volume" {
                    weekly_totals(points)
                } else {
                    weekly_peaks(points)
                };
                if let Some((week, value)) = weekly.last() {
                    println!("  week of {week}: {value:.1}");
                }
            }
            if let Some(dir) = csv {
                std::fs::create_dir_all(&dir)?;
                for (name, points) in &bundle.series {
                    export::save_series_csv(dir.join(format!("{name}.csv")), points)?;
                }
                info!("Wrote {} series to {}", bundle.series.len(), dir.display());
            }
            if !bundle.failed.is_empty() {
                eprintln!("Unavailable series: {}", bundle.failed.join(", "));
            }
        }
        Commands::Report { day_id, out, open } => {
            let workout = client.get_day_workout(&day_id)?;
            let summary = summarize(&workout, resolver(preference));
            let exercises = summarize_exercises(&workout, resolver(preference));
            let volume_series = client
                .get_series::<SeriesPoint>("volume")
                .unwrap_or_else(|e| {
                    log::warn!("Volume history unavailable: {e}");
                    Vec::new()
                });
            let title = format!("Workout {day_id}");
            report::export_html_report(
                &out,
                &report::ReportData {
                    title: &title,
                    summary: &summary,
                    exercises: &exercises,
                    volume_series: &volume_series,
                    unit: total_unit(preference),
                },
            )?;
            println!("Wrote {}", out.display());
            for line in weekly_volume_lines(&volume_series, total_unit(preference)) {
                println!("  {line}");
            }
            if open {
                open::that(&out)?;
            }
        }
        Commands::Export {
            day_ids,
            out,
            format,
        } => {
            let mut summaries = Vec::with_capacity(day_ids.len());
            for day_id in day_ids {
                let workout = client.get_day_workout(&day_id)?;
                summaries.push((day_id, summarize(&workout, resolver(preference))));
            }
            match format {
                ExportFormat::Csv => export::save_summaries_csv(&out, &summaries)?,
                ExportFormat::Json => export::save_summaries_json(&out, &summaries)?,
            }
            println!("Exported {} days to {}", summaries.len(), out.display());
        }
        Commands::Exercises { search } => {
            let library = ExerciseLibrary::new(client.list_exercise_types()?);
            info!("Loaded {} exercise types", library.len());
            if library.is_empty() {
                println!("Exercise library is empty");
                return Ok(());
            }
            let query = search.as_deref().unwrap_or("");
            let mut hits = library.search(query);
            if hits.is_empty() {
                hits.extend(library.find(query));
            }
            for t in hits {
                let category = t
                    .category
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", category_for(&t.name)));
                let equipment = info_for(&t.name)
                    .map_or_else(|| "-".to_string(), |info| format!("{:?}", info.equipment));
                println!("{}\t{}\t{}\t{}", t.id, t.name, category, equipment);
            }
        }
        Commands::Feedback { message } => {
            client.send_feedback(&message)?;
            println!("Feedback sent");
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if let Some(path) = Settings::path() {
                    println!("# {}", path.display());
                }
                for (key, value) in settings.describe() {
                    println!("{key} = {value}");
                }
            }
            ConfigAction::Set { key, value } => {
                settings.set(&key, &value)?;
                let path = settings.save()?;
                println!("Updated {key} in {}", path.display());
            }
        },
    }
    Ok(())
}

/// Unit used for whole-workout totals: the explicit preference, or the
/// resolver's default for entries without an exercise type.
fn total_unit(preference: UnitPreference) -> WeightUnit {
    resolve(preference, None)
}

fn block_id_or_last(block_id: Option<String>, settings: &Settings) -> Result<String, String> {
    block_id
        .or_else(|| settings.last_block_id.clone())
        .ok_or_else(|| "No block given and no previous block remembered".to_string())
}

/// Look a week up by ID, then by week number.
fn find_week<'a>(block: &'a Block, key: &str) -> Option<&'a Week> {
    block.week(key).or_else(|| {
        key.trim()
            .parse::<u32>()
            .ok()
            .and_then(|n| block.week_by_number(n))
    })
}

fn summary_lines(
    summary: &WorkoutSummary,
    exercises: &[ExerciseSummary],
    preference: UnitPreference,
) -> Vec<String> {
    let mut lines = vec![
        format!("Exercises: {}", summary.exercises),
        format!("Sets: {} / {}", summary.completed_sets, summary.total_sets),
        format!("Reps: {}", summary.total_reps),
        format!(
            "Volume: {}",
            format_volume(&summary.volume(), total_unit(preference))
        ),
        format!("Peak RPE: {}", format_rpe(summary.peak_rpe)),
    ];
    for ex in exercises {
        let top = ex
            .top_weight
            .map(|w| format!("{w} {}", ex.unit))
            .unwrap_or_else(|| "-".into());
        lines.push(format!(
            "  {}: {}x{} top {} RPE {}",
            ex.exercise,
            ex.sets,
            ex.reps,
            top,
            format_rpe(ex.peak_rpe)
        ));
    }
    lines
}

fn block_lines(block: &Block) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", block.name, block.id)];
    for week in &block.weeks {
        lines.push(format!("Week {} ({})", week.week_number, week.id));
        for day in &week.days {
            let date = day.date.map(|d| format!(" {d}")).unwrap_or_default();
            lines.push(format!(
                "  Day {}{}: {}",
                day.day_number,
                date,
                day.focus.as_deref().unwrap_or("-")
            ));
        }
    }
    lines
}

fn bulk_report_lines(report: &BulkReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Updated {} of {} days",
        report.applied.len(),
        report.requests()
    )];
    for failed in &report.failed {
        lines.push(format!("  day {} failed: {}", failed.edit.day_id, failed.error));
    }
    if !report.refetched_weeks.is_empty() {
        lines.push(format!("Refetched weeks: {}", report.refetched_weeks.join(", ")));
    }
    if !report.restored_days.is_empty() {
        lines.push(format!("Restored days: {}", report.restored_days.join(", ")));
    }
    lines
}

/// Weekly totals of a volume series, shown after a report is written.
fn weekly_volume_lines(points: &[SeriesPoint], unit: WeightUnit) -> Vec<String> {
    weekly_totals(points)
        .into_iter()
        .map(|(week, kg)| format!("{week}: {:.0} {unit}", WeightUnit::Kg.convert(kg, unit)))
        .collect()
}
