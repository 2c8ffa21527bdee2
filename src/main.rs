// src/main.rs
//
// Command-line front end for the report engine.
// Runs paged or full reports, ad-hoc aggregations and dashboard widgets
// against the live API, or offline against a recorded replay file.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::Parser;
use rms_reports::analytics::{AggregateFn, Interval, WIDGETS};
use rms_reports::catalog::ModuleRegistry;
use rms_reports::config::{default_config_template, Config};
use rms_reports::connectors::ReplaySource;
use rms_reports::engine::{ReportPage, ReportRequest};
use rms_reports::models::{AggregationResult, Filter, FlattenedRow, Sort};
use rms_reports::service::{AggregateQuery, ReportDefinition, ReportService};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rms-reports")]
#[command(about = "Reports and aggregations over the rental-management API")]
struct Args {
    /// Mode of operation: list, schema, run, full, aggregate, timeseries, compare, widget
    #[arg(long, default_value = "list")]
    mode: String,

    /// Path to configuration file (TOML)
    #[arg(long, short)]
    config: Option<String>,

    /// Module key (e.g. opportunities)
    #[arg(long, short)]
    module: Option<String>,

    /// Comma-separated column keys to project
    #[arg(long)]
    columns: Option<String>,

    /// Filter as field:predicate[:value]; list values separated by `|`
    #[arg(long)]
    filter: Vec<String>,

    /// Sort as field[:asc|desc]
    #[arg(long)]
    sort: Option<String>,

    #[arg(long, default_value = "1")]
    page: u32,

    /// Page size (defaults to the configured default_per_page)
    #[arg(long)]
    per_page: Option<u32>,

    /// Row cap for full crawls and aggregations
    #[arg(long)]
    max_rows: Option<usize>,

    /// Field to group by (aggregate mode)
    #[arg(long)]
    group_by: Option<String>,

    /// Field to aggregate; omitted means count rows
    #[arg(long)]
    field: Option<String>,

    /// sum, avg, count, min or max
    #[arg(long)]
    function: Option<String>,

    /// hour, day, week, month, quarter or year
    #[arg(long, default_value = "month")]
    interval: String,

    /// Date field for timeseries and compare modes
    #[arg(long)]
    date_field: Option<String>,

    /// Widget key (widget mode); omitted lists the widgets
    #[arg(long)]
    widget: Option<String>,

    /// Saved report definition (JSON file) to replay in run mode
    #[arg(long)]
    definition: Option<String>,

    /// Serve requests from a recorded JSON file instead of the live API
    #[arg(long)]
    replay: Option<String>,

    /// Print a human-readable table instead of JSON
    #[arg(long, default_value = "false")]
    table: bool,

    /// Generate a default configuration file
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        println!("{}", default_config_template());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).context("Use --generate-config to create a template")?,
        None => Config::default(),
    };
    config.apply_env();
    init_logging(&config);

    let service = match &args.replay {
        Some(path) => {
            let source = ReplaySource::from_file(path)
                .with_context(|| format!("failed to load replay file {}", path))?;
            ReportService::new(source.shared(), config.report.max_rows)
        }
        None => ReportService::from_config(&config).context("failed to create API client")?,
    };
    let per_page = args.per_page.unwrap_or(config.report.default_per_page);
    let max_rows = args.max_rows.unwrap_or(config.report.max_rows);

    match args.mode.as_str() {
        "list" => emit(&args, &service.list_modules(), |modules| {
            modules
                .iter()
                .map(|m| format!("{:<16} {}", m.key, m.name))
                .collect::<Vec<_>>()
                .join("\n")
        }),
        "schema" => {
            let schema = service.get_module_schema(require(&args.module, "--module")?)?;
            emit(&args, &schema, |schema| {
                let mut lines: Vec<String> = schema
                    .columns
                    .iter()
                    .map(|c| format!("{:<24} {:<20} {}", c.key, c.label, c.column_type))
                    .collect();
                lines.push(String::new());
                lines.extend(schema.filters.iter().map(|f| {
                    let predicates: Vec<&str> = f.predicates.iter().map(|p| p.as_str()).collect();
                    format!("{:<24} {:<20} {}", f.key, f.label, predicates.join(","))
                }));
                lines.join("\n")
            })
        }
        "run" => {
            let page = match &args.definition {
                Some(path) => {
                    let json = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read definition {}", path))?;
                    let definition = ReportDefinition::from_json(&json)?;
                    service.run_definition(&definition, args.page, per_page).await?
                }
                None => service.run_report(&build_request(&args, per_page)?).await?,
            };
            emit(&args, &page, format_page)
        }
        "full" => {
            let request = build_request(&args, per_page)?;
            let rows = service.run_report_full(&request, max_rows).await?;
            emit(&args, &rows, |rows| format_rows(request.module.as_deref(), &request.columns, rows))
        }
        "aggregate" => {
            let group_by = require(&args.group_by, "--group-by")?;
            let result = service
                .aggregate(&aggregate_query(&args)?, group_by, args.field.as_deref(), function(&args)?)
                .await?;
            emit(&args, &result, format_series)
        }
        "timeseries" => {
            let date_field = require(&args.date_field, "--date-field")?;
            let interval: Interval = args.interval.parse().map_err(|e: String| anyhow!(e))?;
            let result = service
                .time_series(
                    &aggregate_query(&args)?,
                    date_field,
                    args.field.as_deref(),
                    function(&args)?,
                    interval,
                )
                .await?;
            emit(&args, &result, format_series)
        }
        "compare" => {
            let date_field = require(&args.date_field, "--date-field")?;
            let today = Local::now().date_naive();
            let comparison = service
                .compare_period(
                    &aggregate_query(&args)?,
                    date_field,
                    args.field.as_deref(),
                    function(&args)?,
                    today,
                )
                .await?;
            emit(&args, &comparison, |c| {
                format!("current  {}\nprevious {}\nchange   {}%", c.current, c.previous, c.change)
            })
        }
        "widget" => match &args.widget {
            Some(key) => {
                let widget = service.run_widget(key, Local::now().date_naive()).await?;
                emit(&args, &widget, |w| format!("{}\n\n{}", w.widget.title, format_series(&w.result)))
            }
            None => emit(&args, &WIDGETS, |widgets| {
                widgets
                    .iter()
                    .map(|w| format!("{:<28} {}", w.key, w.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
        },
        other => bail!(
            "Unknown mode: {}. Use: list, schema, run, full, aggregate, timeseries, compare or widget",
            other
        ),
    }
}

fn init_logging(config: &Config) {
    let level = config.global.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn require<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{} is required in this mode", flag))
}

fn filters(args: &Args) -> Result<Vec<Filter>> {
    args.filter
        .iter()
        .map(|f| Filter::parse(f).map_err(|e| anyhow!(e)))
        .collect()
}

fn build_request(args: &Args, per_page: u32) -> Result<ReportRequest> {
    let mut request = ReportRequest::for_module(require(&args.module, "--module")?)
        .with_filters(filters(args)?)
        .with_page(args.page)
        .with_per_page(per_page);
    if let Some(columns) = &args.columns {
        request = request.with_columns(columns.split(',').map(str::trim).filter(|c| !c.is_empty()));
    }
    if let Some(sort) = &args.sort {
        request = request.with_sort(Sort::parse(sort).map_err(|e| anyhow!(e))?);
    }
    Ok(request)
}

fn aggregate_query(args: &Args) -> Result<AggregateQuery> {
    Ok(AggregateQuery {
        module: require(&args.module, "--module")?.to_string(),
        filters: filters(args)?,
    })
}

/// Defaults to `sum` with `--field`, `count` without.
fn function(args: &Args) -> Result<AggregateFn> {
    match (&args.function, &args.field) {
        (Some(name), _) => name.parse().map_err(|e: String| anyhow!(e)),
        (None, Some(_)) => Ok(AggregateFn::Sum),
        (None, None) => Ok(AggregateFn::Count),
    }
}

// =============================================================================
// Output
// =============================================================================

fn emit<T: Serialize>(args: &Args, value: &T, as_table: impl Fn(&T) -> String) -> Result<()> {
    if args.table {
        println!("{}", as_table(value));
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

fn format_page(page: &ReportPage) -> String {
    let headers: Vec<String> = page.column_schema.iter().map(|c| c.label.to_string()).collect();
    let cells: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|row| {
            page.column_schema
                .iter()
                .map(|c| c.column_type.format_cell(row.get(c.key).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();
    format!(
        "{}\npage {}/{} ({} rows total)",
        render_table(&headers, &cells),
        page.page,
        page.total_pages,
        page.total
    )
}

fn format_rows(module: Option<&str>, columns: &[String], rows: &[FlattenedRow]) -> String {
    let Some(module) = module.and_then(|key| ModuleRegistry::get_module(key).ok()) else {
        return String::new();
    };
    let keys = if columns.is_empty() {
        module.column_keys()
    } else {
        columns.to_vec()
    };
    let specs: Vec<_> = keys.iter().filter_map(|k| module.column(k)).collect();
    let headers: Vec<String> = specs.iter().map(|c| c.label.to_string()).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            specs
                .iter()
                .map(|c| c.column_type.format_cell(row.get(c.key).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();
    format!("{}\n{} rows", render_table(&headers, &cells), rows.len())
}

fn format_series(result: &AggregationResult) -> String {
    let mut lines: Vec<String> = result
        .pairs()
        .map(|(label, value)| format!("{:<32} {:>14.2}", label, value))
        .collect();
    if let Some(total) = result.total {
        lines.push(format!("{:<32} {:>14.2}", "Total", total));
    }
    lines.join("\n")
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = vec![line(headers)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.extend(rows.iter().map(|row| line(row.as_slice())));
    out.join("\n")
}
