// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Column and Filter Types
// =============================================================================

/// Semantic type of a report column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Currency,
    Date,
    Datetime,
    Boolean,
    Email,
}

impl ColumnType {
    /// Number and currency columns are coerced to finite floats.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::Currency)
    }

    /// Renders a cell for on-screen tables.
    ///
    /// Currency gets two decimals and thousands separators, booleans become
    /// Yes/No, dates are cut to their date part, null is empty.
    pub fn format_cell(&self, value: &Value) -> String {
        match (self, value) {
            (_, Value::Null) => String::new(),
            (ColumnType::Currency, Value::Number(n)) => {
                format_grouped(n.as_f64().unwrap_or(0.0), 2)
            }
            (ColumnType::Number, Value::Number(n)) => {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 {
                    format_grouped(f, 0)
                } else {
                    format_grouped(f, 2)
                }
            }
            (ColumnType::Boolean, Value::Bool(b)) => if *b { "Yes" } else { "No" }.to_string(),
            (ColumnType::Date, Value::String(s)) => s.chars().take(10).collect(),
            (ColumnType::Datetime, Value::String(s)) => s.replacen('T', " ", 1).chars().take(19).collect(),
            (_, Value::String(s)) => s.clone(),
            (_, other) => other.to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Currency => "currency",
            ColumnType::Date => "date",
            ColumnType::Datetime => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Email => "email",
        };
        write!(f, "{}", name)
    }
}

/// Formats `value` with `decimals` places and comma thousands separators.
fn format_grouped(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (raw.clone(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && raw.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// A column a module exposes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// A filter a module exposes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterSpec {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub filter_type: ColumnType,
    pub predicates: &'static [Predicate],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'static [&'static str]>,
}

impl FilterSpec {
    pub fn allows(&self, predicate: Predicate) -> bool {
        self.predicates.contains(&predicate)
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// Comparison operators of the remote ransack-style query grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq,
    NotEq,
    Cont,
    NotCont,
    Start,
    End,
    Lt,
    Lteq,
    Gt,
    Gteq,
    Null,
    NotNull,
    In,
    NotIn,
}

impl Predicate {
    /// Every predicate, ordered so that no entry is a suffix of a later one
    /// (`not_eq` before `eq`, `lteq` before `eq`). Suffix matching relies on it.
    pub const ALL: [Predicate; 14] = [
        Predicate::NotNull,
        Predicate::NotCont,
        Predicate::NotEq,
        Predicate::NotIn,
        Predicate::Lteq,
        Predicate::Gteq,
        Predicate::Start,
        Predicate::Cont,
        Predicate::Null,
        Predicate::End,
        Predicate::Eq,
        Predicate::Lt,
        Predicate::Gt,
        Predicate::In,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::NotEq => "not_eq",
            Predicate::Cont => "cont",
            Predicate::NotCont => "not_cont",
            Predicate::Start => "start",
            Predicate::End => "end",
            Predicate::Lt => "lt",
            Predicate::Lteq => "lteq",
            Predicate::Gt => "gt",
            Predicate::Gteq => "gteq",
            Predicate::Null => "null",
            Predicate::NotNull => "not_null",
            Predicate::In => "in",
            Predicate::NotIn => "not_in",
        }
    }

    /// True for predicates whose value is a list (`in`, `not_in`).
    pub fn takes_list(&self) -> bool {
        matches!(self, Predicate::In | Predicate::NotIn)
    }

    /// True for predicates that carry no comparison value.
    pub fn is_presence(&self) -> bool {
        matches!(self, Predicate::Null | Predicate::NotNull)
    }

    /// Splits a ransack attribute name such as `starts_at_gteq` into
    /// its field and predicate.
    pub fn split_attribute(attribute: &str) -> Option<(&str, Predicate)> {
        Predicate::ALL.iter().find_map(|p| {
            let suffix = p.as_str();
            let field = attribute.strip_suffix(suffix)?.strip_suffix('_')?;
            if field.is_empty() {
                None
            } else {
                Some((field, *p))
            }
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Predicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown predicate `{}`", s))
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Value carried by a filter instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

/// One conjunctive filter: `{field, predicate, value}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl Filter {
    pub fn new(field: impl Into<String>, predicate: Predicate, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            predicate,
            value: Some(FilterValue::Single(value.into())),
        }
    }

    /// Filter with a list value, for `in` / `not_in`.
    pub fn list<I, S>(field: impl Into<String>, predicate: Predicate, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            predicate,
            value: Some(FilterValue::List(values.into_iter().map(Into::into).collect())),
        }
    }

    /// Filter without a value, for `null` / `not_null`.
    pub fn presence(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
            value: None,
        }
    }

    /// Parses the CLI shorthand `field:predicate:value`; list values are
    /// separated by `|`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut parts = spec.splitn(3, ':');
        let field = parts.next().filter(|f| !f.is_empty());
        let predicate = parts.next();
        let (field, predicate) = match (field, predicate) {
            (Some(f), Some(p)) => (f, p.parse::<Predicate>()?),
            _ => return Err(format!("expected field:predicate[:value], got `{}`", spec)),
        };

        let value = parts.next();
        Ok(match value {
            _ if predicate.is_presence() => Filter::presence(field, predicate),
            Some(v) if predicate.takes_list() => Filter::list(field, predicate, v.split('|')),
            Some(v) => Filter::new(field, predicate, v),
            None => return Err(format!("filter `{}` needs a value", spec)),
        })
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// The single active sort of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `field` or `field:asc|desc`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.split_once(':') {
            None if !spec.is_empty() => Ok(Sort::asc(spec)),
            Some((field, dir)) if !field.is_empty() => match dir.to_lowercase().as_str() {
                "asc" => Ok(Sort::asc(field)),
                "desc" => Ok(Sort::desc(field)),
                other => Err(format!("unknown sort direction `{}`", other)),
            },
            _ => Err(format!("invalid sort `{}`", spec)),
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

pub const MIN_PER_PAGE: u32 = 1;
pub const MAX_PER_PAGE: u32 = 100;
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Page selection for paged execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Caller-side helper that forces `page >= 1` and `per_page` into 1..=100.
    /// The engine rejects out-of-range values instead of clamping them.
    pub fn clamped(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.page >= 1 && (MIN_PER_PAGE..=MAX_PER_PAGE).contains(&self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// A record normalized to a module's declared columns, in declared order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlattenedRow(Map<String, Value>);

impl FlattenedRow {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String form used for grouping: strings verbatim, integral numbers
    /// without a fractional part, null/missing as `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only `columns`, in the order given.
    pub fn project(&self, columns: &[String]) -> FlattenedRow {
        let mut out = Map::with_capacity(columns.len());
        for column in columns {
            out.insert(
                column.clone(),
                self.0.get(column).cloned().unwrap_or(Value::Null),
            );
        }
        FlattenedRow(out)
    }
}

impl From<Map<String, Value>> for FlattenedRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Chart-ready label/value series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl AggregationResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn value_for(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Current vs previous period aggregate with percentage change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
}
