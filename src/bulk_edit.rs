//! Bulk focus edits across the days of a training block.
//!
//! Edits are applied to the local block immediately and then sent to the
//! backend one day at a time. A batch is not transactional: days that fail
//! are reported, their weeks are refetched, and if a refetch fails the days
//! are put back to the focus they had before the batch.

use crate::api::{ApiError, DayStore, DayUpdate};
use crate::block::Block;
use crate::settings::BulkSettings;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Selecting,
    Submitting,
    Reconciling,
    Done,
    PartiallyFailed,
}

/// A pending focus change for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFocusEdit {
    pub day_id: String,
    pub week_id: String,
    pub target_focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEdit {
    pub edit: DayFocusEdit,
    pub error: String,
}

/// Outcome of a reconciled batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub state: EditorState,
    pub applied: Vec<DayFocusEdit>,
    pub failed: Vec<FailedEdit>,
    /// Weeks replaced by a fresh copy from the backend.
    pub refetched_weeks: Vec<String>,
    /// Days put back to their pre-batch focus.
    pub restored_days: Vec<String>,
}

impl BulkReport {
    pub fn requests(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkEditError {
    UnknownWeek(String),
    UnknownDay { week_id: String, day_id: String },
    NothingSelected,
    Busy,
    NoPendingBatch,
}

impl fmt::Display for BulkEditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkEditError::UnknownWeek(week_id) => write!(f, "Week {week_id} is not part of the block"),
            BulkEditError::UnknownDay { week_id, day_id } => {
                write!(f, "Day {day_id} is not part of week {week_id}")
            }
            BulkEditError::NothingSelected => write!(f, "No days selected"),
            BulkEditError::Busy => write!(f, "A bulk edit is already being reconciled"),
            BulkEditError::NoPendingBatch => write!(f, "Nothing to reconcile"),
        }
    }
}

impl std::error::Error for BulkEditError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOptions {
    /// Pause after this many requests when more follow. `0` disables pacing.
    pub pacing_every: usize,
    pub pacing_delay: Duration,
    pub max_retries: u32,
    /// First retry delay; doubled on every further attempt.
    pub retry_backoff: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self::from(&BulkSettings::default())
    }
}

impl From<&BulkSettings> for BulkOptions {
    fn from(s: &BulkSettings) -> Self {
        Self {
            pacing_every: s.pacing_every,
            pacing_delay: Duration::from_millis(s.pacing_delay_ms),
            max_retries: s.max_retries,
            retry_backoff: Duration::from_millis(s.retry_backoff_ms),
        }
    }
}

/// Source of the pauses between paced requests and retries.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

/// Blocks the current thread for the requested delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Pre-batch focus per `(week_id, day_id)`.
type Snapshot = HashMap<(String, String), Option<String>>;

#[derive(Debug)]
struct Batch {
    edits: Vec<DayFocusEdit>,
    snapshot: Snapshot,
}

/// Selection, optimistic application and reconciliation of focus edits on
/// one block.
#[derive(Debug)]
pub struct BlockBulkEditor {
    block: Block,
    options: BulkOptions,
    state: EditorState,
    selection: BTreeSet<(String, String)>,
    pending: Option<Batch>,
}

impl BlockBulkEditor {
    pub fn new(block: Block, options: BulkOptions) -> Self {
        Self {
            block,
            options,
            state: EditorState::Idle,
            selection: BTreeSet::new(),
            pending: None,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn is_selected(&self, week_id: &str, day_id: &str) -> bool {
        self.selection
            .contains(&(week_id.to_string(), day_id.to_string()))
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Toggle a day's checkbox. Returns whether the day is now selected.
    pub fn toggle_day(&mut self, week_id: &str, day_id: &str) -> Result<bool, BulkEditError> {
        if matches!(self.state, EditorState::Submitting | EditorState::Reconciling) {
            return Err(BulkEditError::Busy);
        }
        if self.block.day(week_id, day_id).is_none() {
            return Err(BulkEditError::UnknownDay {
                week_id: week_id.to_string(),
                day_id: day_id.to_string(),
            });
        }
        let key = (week_id.to_string(), day_id.to_string());
        let selected = if self.selection.remove(&key) {
            false
        } else {
            self.selection.insert(key);
            true
        };
        self.state = if self.selection.is_empty() {
            EditorState::Idle
        } else {
            EditorState::Selecting
        };
        Ok(selected)
    }

    /// Select days of one week by their day number. Unknown numbers are
    /// logged and skipped.
    pub fn select_day_numbers(
        &mut self,
        week_id: &str,
        day_numbers: &[u32],
    ) -> Result<usize, BulkEditError> {
        let week = self
            .block
            .week(week_id)
            .ok_or_else(|| BulkEditError::UnknownWeek(week_id.to_string()))?;
        let day_ids: Vec<String> = day_numbers
            .iter()
            .filter_map(|n| match week.day_by_number(*n) {
                Some(day) => Some(day.id.clone()),
                None => {
                    log::warn!("Week {week_id} has no day {n}");
                    None
                }
            })
            .collect();
        let mut count = 0;
        for day_id in day_ids {
            if !self.is_selected(week_id, &day_id) && self.toggle_day(week_id, &day_id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The edits a submit would produce for the current selection.
    ///
    /// With `all_weeks`, every selected day expands to the days with the same
    /// day number in every week of the block. Edits are ordered by week, then
    /// by day, as the block lists them, without duplicates.
    pub fn plan(&self, target_focus: Option<&str>, all_weeks: bool) -> Vec<DayFocusEdit> {
        let selected_numbers: BTreeSet<u32> = self
            .selection
            .iter()
            .filter_map(|(w, d)| self.block.day(w, d))
            .map(|day| day.day_number)
            .collect();

        let mut edits = Vec::new();
        for week in &self.block.weeks {
            for day in &week.days {
                let chosen = if all_weeks {
                    selected_numbers.contains(&day.day_number)
                } else {
                    self.is_selected(&week.id, &day.id)
                };
                if chosen {
                    edits.push(DayFocusEdit {
                        day_id: day.id.clone(),
                        week_id: week.id.clone(),
                        target_focus: target_focus.map(str::to_string),
                    });
                }
            }
        }
        edits
    }

    /// Apply a focus change to the selected days locally and queue the
    /// backend updates.
    pub fn submit(
        &mut self,
        target_focus: Option<String>,
        all_weeks: bool,
    ) -> Result<Vec<DayFocusEdit>, BulkEditError> {
        match self.state {
            EditorState::Submitting | EditorState::Reconciling => return Err(BulkEditError::Busy),
            _ if self.selection.is_empty() => return Err(BulkEditError::NothingSelected),
            _ => {}
        }
        self.state = EditorState::Submitting;

        let edits = self.plan(target_focus.as_deref(), all_weeks);
        let mut snapshot = Snapshot::with_capacity(edits.len());
        for edit in &edits {
            if let Some(day) = self.block.day_mut(&edit.week_id, &edit.day_id) {
                snapshot.insert(
                    (edit.week_id.clone(), edit.day_id.clone()),
                    day.focus.clone(),
                );
                day.focus = edit.target_focus.clone();
            }
        }
        log::info!(
            "Applied focus {:?} to {} days locally",
            target_focus,
            edits.len()
        );

        self.selection.clear();
        self.pending = Some(Batch {
            edits: edits.clone(),
            snapshot,
        });
        self.state = EditorState::Reconciling;
        Ok(edits)
    }

    /// Send the queued edits to the backend, one request at a time.
    pub fn reconcile<S, P>(&mut self, store: &S, pacer: &mut P) -> Result<BulkReport, BulkEditError>
    where
        S: DayStore + ?Sized,
        P: Pacer + ?Sized,
    {
        let batch = self.pending.take().ok_or(BulkEditError::NoPendingBatch)?;
        let total = batch.edits.len();
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for (i, edit) in batch.edits.into_iter().enumerate() {
            if self.options.pacing_every > 0 && i > 0 && i % self.options.pacing_every == 0 {
                pacer.pause(self.options.pacing_delay);
            }
            match send_with_retry(store, pacer, &self.options, &edit) {
                Ok(()) => applied.push(edit),
                Err(e) => {
                    log::warn!("Failed to update focus of day {}: {e}", edit.day_id);
                    failed.push(FailedEdit {
                        edit,
                        error: e.to_string(),
                    });
                }
            }
        }

        let (refetched_weeks, restored_days) = if failed.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            self.roll_back(store, &failed, &batch.snapshot)
        };

        self.state = if failed.is_empty() {
            EditorState::Done
        } else {
            log::warn!("{} of {} day updates failed", failed.len(), total);
            EditorState::PartiallyFailed
        };
        log::info!("Bulk edit finished: {} applied, {} failed", applied.len(), failed.len());

        Ok(BulkReport {
            state: self.state,
            applied,
            failed,
            refetched_weeks,
            restored_days,
        })
    }

    /// Submit and reconcile in one go.
    pub fn apply<S, P>(
        &mut self,
        target_focus: Option<String>,
        all_weeks: bool,
        store: &S,
        pacer: &mut P,
    ) -> Result<BulkReport, BulkEditError>
    where
        S: DayStore + ?Sized,
        P: Pacer + ?Sized,
    {
        self.submit(target_focus, all_weeks)?;
        self.reconcile(store, pacer)
    }

    /// Refetch the weeks holding failed days; restore the snapshot for days
    /// whose week could not be refetched.
    fn roll_back<S>(
        &mut self,
        store: &S,
        failed: &[FailedEdit],
        snapshot: &Snapshot,
    ) -> (Vec<String>, Vec<String>)
    where
        S: DayStore + ?Sized,
    {
        let mut weeks: Vec<&str> = Vec::new();
        for f in failed {
            if !weeks.contains(&f.edit.week_id.as_str()) {
                weeks.push(&f.edit.week_id);
            }
        }

        let mut refetched = Vec::new();
        let mut restored = Vec::new();
        for week_id in weeks {
            match store.fetch_week(week_id) {
                Ok(week) if week.id == week_id => {
                    self.block.replace_week(week);
                    refetched.push(week_id.to_string());
                }
                result => {
                    if let Err(e) = result {
                        log::warn!("Refetching week {week_id} failed: {e}");
                    } else {
                        log::warn!("Refetching week {week_id} returned a different week");
                    }
                    for f in failed.iter().filter(|f| f.edit.week_id == week_id) {
                        let key = (f.edit.week_id.clone(), f.edit.day_id.clone());
                        let previous = snapshot.get(&key).cloned().flatten();
                        if let Some(day) = self.block.day_mut(week_id, &f.edit.day_id) {
                            day.focus = previous;
                            restored.push(f.edit.day_id.clone());
                        }
                    }
                }
            }
        }
        (refetched, restored)
    }
}

fn send_with_retry<S, P>(
    store: &S,
    pacer: &mut P,
    options: &BulkOptions,
    edit: &DayFocusEdit,
) -> Result<(), ApiError>
where
    S: DayStore + ?Sized,
    P: Pacer + ?Sized,
{
    let update = DayUpdate::focus(edit.target_focus.clone());
    let mut attempt = 0u32;
    loop {
        match store.update_day(&edit.day_id, &update) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < options.max_retries => {
                let delay = options.retry_backoff.saturating_mul(1u32 << attempt.min(16));
                log::info!(
                    "Retrying day {} in {:?} after transient error: {e}",
                    edit.day_id,
                    delay
                );
                pacer.pause(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
