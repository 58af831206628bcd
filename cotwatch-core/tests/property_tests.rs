//! Property tests for store and range invariants.
//!
//! Uses proptest to verify:
//! 1. No duplicate dates — a table holds at most one row per date, no matter
//!    how overlapping the write batches are
//! 2. Range honesty — range() is exactly the min/max of the stored rows and
//!    only ever grows across writes
//! 3. First write wins — a later batch never overwrites a stored date
//! 4. Range reduction — reduce_ranges spans all its inputs and ignores Nones

use chrono::{Duration, NaiveDate};
use cotwatch_core::store::{ColumnType, Row, Schema, TableStore, Value};
use cotwatch_core::update::{reduce_ranges, written_range, DateRange};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("cotwatch_prop_{}_{id}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn day(offset: i64) -> NaiveDate {
    epoch() + Duration::days(offset)
}

fn schema() -> Schema {
    Schema::new(&[("V", ColumnType::Float)])
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// A batch of rows over a small date span, duplicates allowed.
fn arb_batch() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((0i64..60, -1000.0..1000.0_f64), 0..20).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(offset, value)| Row::new(day(offset), vec![Value::Float(value)]))
            .collect()
    })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<Row>>> {
    prop::collection::vec(arb_batch(), 1..6)
}

fn arb_range() -> impl Strategy<Value = DateRange> {
    prop::option::of((0i64..60, 0i64..60)).prop_map(|span| {
        span.map(|(a, b)| (day(a.min(b)), day(a.max(b))))
    })
}

// ── 1 + 2 + 3. Store invariants under arbitrary write sequences ─────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever batches land, each date appears once, range() matches the
    /// stored rows exactly, and the first stored value per date survives.
    #[test]
    fn writes_preserve_store_invariants(batches in arb_batches()) {
        let dir = temp_dir();
        let table = TableStore::open(&dir, "prop", schema());

        // Model: first write per date wins
        let mut model: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut previous_range: DateRange = None;

        for batch in &batches {
            table.write(batch).unwrap();
            for row in batch {
                if let Value::Float(v) = row.values[0] {
                    model.entry(row.date).or_insert(v);
                }
            }

            let stored = table.read(None, None).unwrap();

            // one row per date, sorted
            let dates: Vec<NaiveDate> = stored.iter().map(|r| r.date).collect();
            let mut deduped = dates.clone();
            deduped.dedup();
            prop_assert_eq!(&dates, &deduped);
            let mut sorted = dates.clone();
            sorted.sort();
            prop_assert_eq!(&dates, &sorted);

            // contents match the first-write-wins model
            prop_assert_eq!(stored.len(), model.len());
            for row in &stored {
                prop_assert_eq!(&row.values[0], &Value::Float(model[&row.date]));
            }

            // range is derived from rows and only grows
            let range = table.range().unwrap();
            let expected = model
                .keys()
                .next()
                .and_then(|first| model.keys().last().map(|last| (*first, *last)));
            prop_assert_eq!(range, expected);
            if let Some((prev_first, prev_last)) = previous_range {
                let (first, last) = range.unwrap();
                prop_assert!(first <= prev_first);
                prop_assert!(last >= prev_last);
            }
            previous_range = range;
        }

        let _ = fs::remove_dir_all(&dir);
    }
}

// ── 4. Range reduction ───────────────────────────────────────────────

proptest! {
    /// The reduced range covers every input range and touches nothing else.
    #[test]
    fn reduced_range_spans_all_inputs(ranges in prop::collection::vec(arb_range(), 0..8)) {
        let reduced = reduce_ranges(ranges.iter().copied());

        let spans: Vec<(NaiveDate, NaiveDate)> = ranges.iter().flatten().copied().collect();
        match reduced {
            None => prop_assert!(spans.is_empty()),
            Some((first, last)) => {
                prop_assert!(spans.iter().all(|(a, b)| first <= *a && last >= *b));
                prop_assert!(spans.iter().any(|(a, _)| *a == first));
                prop_assert!(spans.iter().any(|(_, b)| *b == last));
            }
        }
    }

    /// The written range of a batch is the min/max of its dates regardless
    /// of order.
    #[test]
    fn written_range_matches_batch_extremes(batch in arb_batch()) {
        let range = written_range(&batch);
        let min = batch.iter().map(|r| r.date).min();
        let max = batch.iter().map(|r| r.date).max();
        prop_assert_eq!(range, min.zip(max));
    }
}
