// src/analytics/widgets.rs
//
// Pre-built dashboard widgets: each names a module, how its rows are grouped
// and which reduction is applied. The service crawls and aggregates them.

use super::{AggregateFn, Interval};
use crate::models::{Filter, Predicate};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// How a widget buckets its rows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetKind {
    Grouped { group_by: &'static str },
    Series { date_field: &'static str, interval: Interval },
}

/// Restricts a widget to the last `months` calendar months (current month
/// included) on a date filter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Lookback {
    pub field: &'static str,
    pub months: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Widget {
    pub key: &'static str,
    pub title: &'static str,
    pub module: &'static str,
    #[serde(flatten)]
    pub kind: WidgetKind,
    pub aggregate_field: Option<&'static str>,
    pub function: AggregateFn,
    /// Keep only the largest groups.
    pub top: Option<usize>,
    pub lookback: Option<Lookback>,
}

impl Widget {
    /// Filters the widget applies for a run on `today`.
    pub fn filters(&self, today: NaiveDate) -> Vec<Filter> {
        let Some(lookback) = self.lookback else {
            return Vec::new();
        };
        let month_start = today.with_day(1).unwrap_or(today);
        let from = month_start - Months::new(lookback.months.saturating_sub(1));
        vec![Filter::new(
            lookback.field,
            Predicate::Gteq,
            from.format("%Y-%m-%d").to_string(),
        )]
    }
}

pub static WIDGETS: [Widget; 6] = [
    Widget {
        key: "revenue_by_month",
        title: "Invoiced Revenue by Month",
        module: "invoices",
        kind: WidgetKind::Series {
            date_field: "invoice_date",
            interval: Interval::Month,
        },
        aggregate_field: Some("grand_total"),
        function: AggregateFn::Sum,
        top: None,
        lookback: Some(Lookback {
            field: "invoice_date",
            months: 12,
        }),
    },
    Widget {
        key: "top_customers",
        title: "Top Customers",
        module: "invoices",
        kind: WidgetKind::Grouped {
            group_by: "member_name",
        },
        aggregate_field: Some("grand_total"),
        function: AggregateFn::Sum,
        top: Some(10),
        lookback: Some(Lookback {
            field: "invoice_date",
            months: 12,
        }),
    },
    Widget {
        key: "opportunities_by_status",
        title: "Opportunities by Status",
        module: "opportunities",
        kind: WidgetKind::Grouped {
            group_by: "status_name",
        },
        aggregate_field: None,
        function: AggregateFn::Count,
        top: None,
        lookback: None,
    },
    Widget {
        key: "stock_by_store",
        title: "Stock Held by Store",
        module: "stock_levels",
        kind: WidgetKind::Grouped {
            group_by: "store_name",
        },
        aggregate_field: Some("quantity_held"),
        function: AggregateFn::Sum,
        top: None,
        lookback: None,
    },
    Widget {
        key: "quarantines_by_type",
        title: "Quarantines by Type",
        module: "quarantines",
        kind: WidgetKind::Grouped {
            group_by: "quarantine_type_name",
        },
        aggregate_field: None,
        function: AggregateFn::Count,
        top: None,
        lookback: None,
    },
    Widget {
        key: "purchase_spend_by_supplier",
        title: "Purchase Spend by Supplier",
        module: "purchase_orders",
        kind: WidgetKind::Grouped {
            group_by: "supplier_name",
        },
        aggregate_field: Some("grand_total"),
        function: AggregateFn::Sum,
        top: Some(10),
        lookback: Some(Lookback {
            field: "ordered_at",
            months: 12,
        }),
    },
];

pub fn get_widget(key: &str) -> Option<&'static Widget> {
    WIDGETS.iter().find(|w| w.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleRegistry;

    #[test]
    fn test_widgets_reference_declared_fields() {
        for widget in WIDGETS.iter() {
            let module = ModuleRegistry::get_module(widget.module).unwrap();
            let bucket_field = match widget.kind {
                WidgetKind::Grouped { group_by } => group_by,
                WidgetKind::Series { date_field, .. } => date_field,
            };
            assert!(module.column(bucket_field).is_some(), "{}", widget.key);
            if let Some(field) = widget.aggregate_field {
                assert!(module.column(field).unwrap().column_type.is_numeric(), "{}", widget.key);
            }
            if let Some(lookback) = widget.lookback {
                let spec = module.filter(lookback.field).unwrap();
                assert!(spec.allows(Predicate::Gteq), "{}", widget.key);
            }
        }
    }

    #[test]
    fn test_lookback_filter() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let filters = get_widget("revenue_by_month").unwrap().filters(today);
        assert_eq!(filters, vec![Filter::new("invoice_date", Predicate::Gteq, "2023-04-01")]);
        assert!(get_widget("stock_by_store").unwrap().filters(today).is_empty());
        assert!(get_widget("nope").is_none());
    }
}
