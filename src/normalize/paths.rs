// src/normalize/paths.rs
//
// Ordered candidate source paths per module column.
// The remote schema moves fields around depending on endpoint and API version
// (totals nested under `totals`, embedded associations, older aliases), so each
// column lists where to look, most specific first. A column's own top-level
// field always wins and is not repeated here. Segments are dot-separated; a
// numeric segment indexes into an array.

type ColumnPaths = (&'static str, &'static [&'static str]);

static OPPORTUNITIES: &[ColumnPaths] = &[
    ("member_name", &["member.name", "organisation.name", "billing_address.name"]),
    ("owner_name", &["owner.name"]),
    ("venue_name", &["venue.name", "destination.address.name"]),
    ("status_name", &["status.name"]),
    ("state_name", &["state.name"]),
    ("charge_total", &["totals.charge_total", "charge_excluding_tax_total"]),
    ("tax_total", &["totals.tax_total"]),
    ("grand_total", &["totals.grand_total", "charge_including_tax_total"]),
];

static INVOICES: &[ColumnPaths] = &[
    ("member_name", &["member.name", "billing_address.name"]),
    ("status_name", &["status.name"]),
    ("invoice_date", &["issued_at"]),
    ("due_date", &["due_at"]),
    ("charge_total", &["totals.charge_total", "charge_excluding_tax_total"]),
    ("tax_total", &["totals.tax_total"]),
    ("grand_total", &["totals.grand_total", "charge_including_tax_total", "invoice_total"]),
    ("balance", &["totals.balance", "balance_due"]),
];

static PRODUCTS: &[ColumnPaths] = &[
    ("product_group_name", &["product_group.name"]),
    ("product_type", &["product_type_name", "type"]),
    ("rental_price", &["rental_rate.price", "rates.0.price"]),
    ("sale_price", &["sale_rate.price"]),
    ("purchase_price", &["purchase_cost"]),
    ("replacement_charge", &["replacement_cost"]),
];

static MEMBERS: &[ColumnPaths] = &[
    ("email", &["primary_email.address", "emails.0.address"]),
    ("telephone", &["primary_telephone.number", "phones.0.number"]),
    ("city", &["primary_address.city", "addresses.0.city"]),
    ("postcode", &["primary_address.postcode", "addresses.0.postcode"]),
    ("membership_type", &["membership.type"]),
];

static PROJECTS: &[ColumnPaths] = &[
    ("member_name", &["member.name", "organisation.name"]),
    ("starts_at", &["project_starts_at"]),
    ("ends_at", &["project_ends_at"]),
    ("charge_total", &["totals.charge_total", "charge_excluding_tax_total"]),
    ("opportunity_count", &["opportunities_count"]),
];

static PURCHASE_ORDERS: &[ColumnPaths] = &[
    ("supplier_name", &["member.name", "supplier.name"]),
    ("status_name", &["status.name"]),
    ("ordered_at", &["starts_at"]),
    ("due_at", &["ends_at"]),
    ("charge_total", &["totals.charge_total", "charge_excluding_tax_total"]),
    ("grand_total", &["totals.grand_total", "charge_including_tax_total"]),
];

static STOCK_LEVELS: &[ColumnPaths] = &[
    ("item_name", &["item.name", "product.name"]),
    ("store_name", &["store.name"]),
    ("stock_type_name", &["stock_type.name"]),
    ("quantity_available", &["quantities.available"]),
];

static QUARANTINES: &[ColumnPaths] = &[
    ("item_name", &["item.name", "product.name"]),
    ("asset_number", &["stock_level.asset_number"]),
    ("quarantine_type_name", &["quarantine_type.name"]),
];

/// Candidate table for a module, empty for unknown keys.
pub fn module_paths(module: &str) -> &'static [ColumnPaths] {
    match module {
        "opportunities" => OPPORTUNITIES,
        "invoices" => INVOICES,
        "products" => PRODUCTS,
        "members" => MEMBERS,
        "projects" => PROJECTS,
        "purchase_orders" => PURCHASE_ORDERS,
        "stock_levels" => STOCK_LEVELS,
        "quarantines" => QUARANTINES,
        _ => &[],
    }
}

/// Ordered candidate paths for one column.
pub fn candidate_paths(module: &str, column: &str) -> &'static [&'static str] {
    module_paths(module)
        .iter()
        .find(|(key, _)| *key == column)
        .map(|(_, paths)| *paths)
        .unwrap_or(&[])
}
