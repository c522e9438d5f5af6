//! Date-range and set-membership filtering.
//!
//! A [`FilterSet`] combines an optional inclusive date range with any number
//! of categorical predicates. Within one field the selected values are OR-ed;
//! across fields every predicate must hold. An empty selection matches
//! nothing, there is no implicit "select all".

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use perf_core::models::{Categorized, CategoryField, Dated};
use serde::{Deserialize, Serialize};

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Bounds as written, normalised through [`DateRange::new`] on deserialize.
#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl From<RawDateRange> for DateRange {
    fn from(raw: RawDateRange) -> Self {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Build a range; bounds given in the wrong order are swapped.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ── FilterSet ─────────────────────────────────────────────────────────────────

/// Predicates applied to one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// `None` means no date predicate.
    pub date_range: Option<DateRange>,
    /// Selected values per field. A field absent from the map is unconstrained.
    pub categories: BTreeMap<CategoryField, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to an inclusive date range.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Restrict `field` to `values`. An empty `values` matches no row.
    pub fn with_selection<I, S>(mut self, field: CategoryField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    /// `true` when `row` satisfies every predicate.
    ///
    /// A predicate on a field the record does not carry rejects the row.
    pub fn matches<R: Dated + Categorized>(&self, row: &R) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(row.date()) {
                return false;
            }
        }

        self.categories.iter().all(|(field, selected)| {
            row.category(*field)
                .map(|value| selected.contains(value))
                .unwrap_or(false)
        })
    }

    /// The subsequence of `rows` matching every predicate, order preserved.
    pub fn apply<R>(&self, rows: &[R]) -> Vec<R>
    where
        R: Dated + Categorized + Clone,
    {
        rows.iter().filter(|r| self.matches(*r)).cloned().collect()
    }
}

// ── Option helpers ────────────────────────────────────────────────────────────

/// Sorted distinct values of `field`, e.g. to populate a multi-select.
pub fn distinct_values<R: Categorized>(rows: &[R], field: CategoryField) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.category(field))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Earliest and latest date in `rows`, `None` when empty.
pub fn date_bounds<R: Dated>(rows: &[R]) -> Option<DateRange> {
    let min = rows.iter().map(Dated::date).min()?;
    let max = rows.iter().map(Dated::date).max()?;
    Some(DateRange::new(min, max))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
