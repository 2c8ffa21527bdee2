// src/analytics/mod.rs
//
// Aggregation over normalized rows: grouping, time bucketing, single-value
// reduction, period-over-period comparison and top-N ranking.
// Nothing here fails; empty input gives empty or zero results.

pub mod widgets;

use crate::models::{AggregationResult, FlattenedRow, PeriodComparison};
use crate::normalize::coerce_number;
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub use widgets::{get_widget, Lookback, Widget, WidgetKind, WIDGETS};

/// Group label for rows whose group field is null or missing.
pub const UNSPECIFIED_LABEL: &str = "Unspecified";

static ISO_DATE_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").ok());

// =============================================================================
// Functions and Intervals
// =============================================================================

/// Reduction applied to each group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateFn {
    /// Reduces already-coerced values. `Count` is handled by the callers,
    /// which count rows rather than values.
    fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            AggregateFn::Sum => values.iter().sum(),
            AggregateFn::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregateFn::Count => values.len() as f64,
            AggregateFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Whether a total across groups is meaningful.
    fn is_additive(&self) -> bool {
        matches!(self, AggregateFn::Sum | AggregateFn::Count)
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Count => "count",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for AggregateFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(AggregateFn::Sum),
            "avg" | "average" => Ok(AggregateFn::Avg),
            "count" => Ok(AggregateFn::Count),
            "min" => Ok(AggregateFn::Min),
            "max" => Ok(AggregateFn::Max),
            other => Err(format!("unknown aggregate function `{}`", other)),
        }
    }
}

/// Time bucket width for series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Interval {
    /// Start of the bucket containing `at`, and its display label.
    ///
    /// Weeks are ISO weeks (`2024-W11`) starting Monday; quarters are
    /// `2024-Q1`.
    pub fn bucket(&self, at: NaiveDateTime) -> (NaiveDateTime, String) {
        let date = at.date();
        match self {
            Interval::Hour => {
                let start = date.and_time(NaiveTime::MIN) + chrono::Duration::hours(at.hour() as i64);
                (start, start.format("%Y-%m-%d %H:00").to_string())
            }
            Interval::Day => (date.and_time(NaiveTime::MIN), date.format("%Y-%m-%d").to_string()),
            Interval::Week => {
                let monday = date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64);
                let week = date.iso_week();
                (
                    monday.and_time(NaiveTime::MIN),
                    format!("{}-W{:02}", week.year(), week.week()),
                )
            }
            Interval::Month => (
                first_of_month(date.year(), date.month()),
                format!("{}-{:02}", date.year(), date.month()),
            ),
            Interval::Quarter => {
                let quarter = (date.month() + 2) / 3;
                (
                    first_of_month(date.year(), (quarter - 1) * 3 + 1),
                    format!("{}-Q{}", date.year(), quarter),
                )
            }
            Interval::Year => (first_of_month(date.year(), 1), date.year().to_string()),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Quarter => "quarter",
            Interval::Year => "year",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" => Ok(Interval::Hour),
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            "month" => Ok(Interval::Month),
            "quarter" => Ok(Interval::Quarter),
            "year" => Ok(Interval::Year),
            other => Err(format!("unknown interval `{}`", other)),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

// =============================================================================
// Aggregation
// =============================================================================

/// Reduces every row to one number. `Count` counts rows; the other
/// functions read `field` (missing or non-numeric values count as 0).
pub fn reduce(rows: &[FlattenedRow], field: Option<&str>, function: AggregateFn) -> f64 {
    if function == AggregateFn::Count {
        return rows.len() as f64;
    }
    let values: Vec<f64> = rows.iter().map(|row| field_number(row, field)).collect();
    function.apply(&values)
}

/// Groups rows by the string value of `group_by` and reduces each group.
///
/// Values starting with an ISO date (`2024-03-15...`) group by year-month.
/// Labels come out in lexical order.
pub fn group_and_aggregate(
    rows: &[FlattenedRow],
    group_by: &str,
    aggregate_field: Option<&str>,
    function: AggregateFn,
) -> AggregationResult {
    let mut groups: BTreeMap<String, Vec<&FlattenedRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(group_label(row, group_by)).or_default().push(row);
    }

    build_result(groups, aggregate_field, function)
}

/// Buckets rows by `date_field` truncated to `interval` and reduces each
/// bucket. Rows without a parseable date are left out. Labels come out in
/// chronological order.
pub fn time_series(
    rows: &[FlattenedRow],
    date_field: &str,
    aggregate_field: Option<&str>,
    function: AggregateFn,
    interval: Interval,
) -> AggregationResult {
    let mut buckets: BTreeMap<NaiveDateTime, (String, Vec<&FlattenedRow>)> = BTreeMap::new();
    for row in rows {
        let Some(at) = row.get(date_field).and_then(parse_timestamp) else {
            continue;
        };
        let (start, label) = interval.bucket(at);
        buckets
            .entry(start)
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push(row);
    }

    build_result(buckets.into_values(), aggregate_field, function)
}

fn build_result<'a, I>(groups: I, aggregate_field: Option<&str>, function: AggregateFn) -> AggregationResult
where
    I: IntoIterator<Item = (String, Vec<&'a FlattenedRow>)>,
{
    let mut result = AggregationResult::empty();
    for (label, members) in groups {
        let value = if function == AggregateFn::Count {
            members.len() as f64
        } else {
            let values: Vec<f64> = members
                .iter()
                .map(|row| field_number(row, aggregate_field))
                .collect();
            function.apply(&values)
        };
        result.labels.push(label);
        result.values.push(value);
    }

    if function.is_additive() {
        result.total = Some(result.values.iter().sum());
    }
    result
}

fn field_number(row: &FlattenedRow, field: Option<&str>) -> f64 {
    field
        .and_then(|f| row.get(f))
        .map(coerce_number)
        .unwrap_or(0.0)
}

fn group_label(row: &FlattenedRow, group_by: &str) -> String {
    match row.get_str(group_by) {
        Some(value) if is_iso_date_prefixed(&value) => match value.get(..7) {
            Some(month) => month.to_string(),
            None => value,
        },
        Some(value) if !value.trim().is_empty() => value,
        _ => UNSPECIFIED_LABEL.to_string(),
    }
}

fn is_iso_date_prefixed(value: &str) -> bool {
    ISO_DATE_PREFIX
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Reads RFC 3339, naive datetimes (`T` or space separated) and bare dates.
/// Offsets keep their local wall-clock time.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

// =============================================================================
// Comparison and Ranking
// =============================================================================

/// Percentage change from `previous` to `current`, to one decimal.
///
/// 0 when both are zero and 100 when only `previous` is zero.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    (((current - previous) / previous) * 100.0 * 10.0).round() / 10.0
}

pub fn compare_values(current: f64, previous: f64) -> PeriodComparison {
    PeriodComparison {
        current,
        previous,
        change: percent_change(current, previous),
    }
}

/// Half-open ranges `[start, end)` of the current and previous calendar
/// months relative to `today`.
pub fn month_ranges(today: NaiveDate) -> ((NaiveDate, NaiveDate), (NaiveDate, NaiveDate)) {
    let current_start = today.with_day(1).unwrap_or(today);
    let next_start = current_start + Months::new(1);
    let previous_start = current_start - Months::new(1);
    ((current_start, next_start), (previous_start, current_start))
}

/// Largest `n` groups, descending by value; equal values keep label order.
pub fn top_n(result: &AggregationResult, n: usize) -> AggregationResult {
    let mut pairs: Vec<(&str, f64)> = result.pairs().collect();
    pairs.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    pairs.truncate(n);

    AggregationResult {
        labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
        values: pairs.iter().map(|(_, v)| *v).collect(),
        total: result.total.map(|_| pairs.iter().map(|(_, v)| v).sum()),
    }
}
