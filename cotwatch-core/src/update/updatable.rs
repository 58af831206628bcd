//! Single-source update policy: decide what window is missing, fetch it,
//! persist it.
//!
//! A source is either EMPTY (no persisted range) or POPULATED ([first, last]).
//! `update` computes the missing window from persisted state alone, so a
//! retried update on a stale source re-derives the same window — there is no
//! in-memory progress to corrupt. The fetch itself (`initial_fill` / `fill`)
//! is source-specific and supplied by the concrete feed.

use crate::error::UpdateError;
use crate::store::Row;
use chrono::{Duration, NaiveDate};

/// Inclusive persisted date span of a source; `None` while empty.
pub type DateRange = Option<(NaiveDate, NaiveDate)>;

/// Component-wise min/max reduction over sibling ranges, ignoring `None`.
pub fn reduce_ranges<I>(ranges: I) -> DateRange
where
    I: IntoIterator<Item = DateRange>,
{
    ranges
        .into_iter()
        .flatten()
        .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
}

/// Bounds of a fetched row set; `None` when nothing was fetched.
pub fn written_range(rows: &[Row]) -> DateRange {
    let min = rows.iter().map(|r| r.date).min()?;
    let max = rows.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// The per-source update contract.
///
/// Implementors supply the persisted range, the two fetch strategies, and the
/// write; the provided `update` orchestrates when each is called.
pub trait Updatable {
    /// Current persisted bounds.
    fn range(&self) -> Result<DateRange, UpdateError>;

    /// Everything available for a source with no data yet.
    fn initial_fill(&mut self) -> Result<Vec<Row>, UpdateError>;

    /// The rows for an explicit missing window (both bounds inclusive).
    fn fill(&mut self, first: NaiveDate, last: NaiveDate) -> Result<Vec<Row>, UpdateError>;

    /// Persist fetched rows.
    fn write_update(&mut self, rows: &[Row]) -> Result<(), UpdateError>;

    /// Run one update against the given "today".
    ///
    /// EMPTY sources get an initial fill; POPULATED-but-stale sources fetch
    /// exactly `[last + 1 day, today]`; a source whose range already reaches
    /// today is a no-op. Today's data is assumed final once observed — the
    /// same day is never re-fetched (known limitation for same-day revisions).
    fn update(&mut self, today: NaiveDate) -> Result<DateRange, UpdateError> {
        let fetched = match self.range()? {
            Some((_, last)) if last >= today => return Ok(None),
            Some((_, last)) => self.fill(last + Duration::days(1), today)?,
            None => self.initial_fill()?,
        };

        if fetched.is_empty() {
            return Ok(None);
        }

        self.write_update(&fetched)?;
        Ok(written_range(&fetched))
    }
}
