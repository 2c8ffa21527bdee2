// src/catalog/modules.rs
//
// The static module table.

use super::{
    choice, col, filter, Module, BOOLEAN_PREDICATES, DATE_PREDICATES, NUMERIC_PREDICATES,
    TEXT_PREDICATES,
};
use crate::models::ColumnType::{Boolean, Currency, Date, Datetime, Email, Number, String as Text};

pub static MODULES: [Module; 8] = [
    Module {
        key: "opportunities",
        name: "Opportunities",
        endpoint: "opportunities",
        columns: &[
            col("id", "ID", Number),
            col("number", "Number", Text),
            col("subject", "Subject", Text),
            col("member_name", "Customer", Text),
            col("owner_name", "Owner", Text),
            col("venue_name", "Venue", Text),
            col("status_name", "Status", Text),
            col("state_name", "State", Text),
            col("starts_at", "Starts", Datetime),
            col("ends_at", "Ends", Datetime),
            col("charge_total", "Charge Total", Currency),
            col("tax_total", "Tax", Currency),
            col("grand_total", "Grand Total", Currency),
            col("rating", "Rating", Number),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("subject", "Subject", Text, TEXT_PREDICATES),
            filter("number", "Number", Text, TEXT_PREDICATES),
            filter("member_name", "Customer", Text, TEXT_PREDICATES),
            choice(
                "status",
                "Status",
                &["Open", "Provisional", "Reserved", "Confirmed", "Postponed", "Cancelled", "Lost", "Dead"],
            ),
            choice("state", "State", &["Enquiry", "Draft", "Quotation", "Order"]),
            filter("starts_at", "Starts", Datetime, DATE_PREDICATES),
            filter("ends_at", "Ends", Datetime, DATE_PREDICATES),
            filter("charge_total", "Charge Total", Currency, NUMERIC_PREDICATES),
            filter("owned_by", "Owner ID", Number, NUMERIC_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["member", "owner", "venue"],
    },
    Module {
        key: "invoices",
        name: "Invoices",
        endpoint: "invoices",
        columns: &[
            col("id", "ID", Number),
            col("number", "Number", Text),
            col("subject", "Subject", Text),
            col("member_name", "Customer", Text),
            col("status_name", "Status", Text),
            col("invoice_date", "Invoice Date", Date),
            col("due_date", "Due Date", Date),
            col("charge_total", "Net Total", Currency),
            col("tax_total", "Tax", Currency),
            col("grand_total", "Grand Total", Currency),
            col("balance", "Balance", Currency),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("number", "Number", Text, TEXT_PREDICATES),
            filter("subject", "Subject", Text, TEXT_PREDICATES),
            filter("member_name", "Customer", Text, TEXT_PREDICATES),
            choice("status", "Status", &["Draft", "Issued", "Part Paid", "Paid", "Void"]),
            filter("invoice_date", "Invoice Date", Date, DATE_PREDICATES),
            filter("due_date", "Due Date", Date, DATE_PREDICATES),
            filter("charge_total", "Net Total", Currency, NUMERIC_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["member"],
    },
    Module {
        key: "products",
        name: "Products",
        endpoint: "products",
        columns: &[
            col("id", "ID", Number),
            col("name", "Name", Text),
            col("product_group_name", "Product Group", Text),
            col("product_type", "Type", Text),
            col("rental_price", "Rental Price", Currency),
            col("sale_price", "Sale Price", Currency),
            col("purchase_price", "Purchase Price", Currency),
            col("replacement_charge", "Replacement Charge", Currency),
            col("weight", "Weight", Number),
            col("active", "Active", Boolean),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("name", "Name", Text, TEXT_PREDICATES),
            filter("product_group_name", "Product Group", Text, TEXT_PREDICATES),
            choice("product_type", "Type", &["Rental", "Sale", "Service"]),
            filter("replacement_charge", "Replacement Charge", Currency, NUMERIC_PREDICATES),
            filter("active", "Active", Boolean, BOOLEAN_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["product_group", "rental_rate", "sale_rate"],
    },
    Module {
        key: "members",
        name: "Members",
        endpoint: "members",
        columns: &[
            col("id", "ID", Number),
            col("name", "Name", Text),
            col("membership_type", "Membership Type", Text),
            col("email", "Email", Email),
            col("telephone", "Telephone", Text),
            col("city", "City", Text),
            col("postcode", "Postcode", Text),
            col("active", "Active", Boolean),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("name", "Name", Text, TEXT_PREDICATES),
            choice("membership_type", "Membership Type", &["Contact", "Organisation", "Venue", "User"]),
            filter("active", "Active", Boolean, BOOLEAN_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["emails", "phones", "addresses"],
    },
    Module {
        key: "projects",
        name: "Projects",
        endpoint: "projects",
        columns: &[
            col("id", "ID", Number),
            col("name", "Name", Text),
            col("description", "Description", Text),
            col("member_name", "Customer", Text),
            col("starts_at", "Starts", Datetime),
            col("ends_at", "Ends", Datetime),
            col("charge_total", "Charge Total", Currency),
            col("opportunity_count", "Opportunities", Number),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("name", "Name", Text, TEXT_PREDICATES),
            filter("member_name", "Customer", Text, TEXT_PREDICATES),
            filter("starts_at", "Starts", Datetime, DATE_PREDICATES),
            filter("ends_at", "Ends", Datetime, DATE_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &[],
    },
    Module {
        key: "purchase_orders",
        name: "Purchase Orders",
        endpoint: "purchase_orders",
        columns: &[
            col("id", "ID", Number),
            col("number", "Number", Text),
            col("subject", "Subject", Text),
            col("supplier_name", "Supplier", Text),
            col("status_name", "Status", Text),
            col("ordered_at", "Ordered", Datetime),
            col("due_at", "Due", Datetime),
            col("charge_total", "Net Total", Currency),
            col("grand_total", "Grand Total", Currency),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("number", "Number", Text, TEXT_PREDICATES),
            filter("subject", "Subject", Text, TEXT_PREDICATES),
            filter("member_name", "Supplier", Text, TEXT_PREDICATES),
            choice("status", "Status", &["Open", "Ordered", "Part Received", "Received", "Cancelled"]),
            filter("ordered_at", "Ordered", Datetime, DATE_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["member"],
    },
    Module {
        key: "stock_levels",
        name: "Stock Levels",
        endpoint: "stock_levels",
        columns: &[
            col("id", "ID", Number),
            col("item_name", "Item", Text),
            col("asset_number", "Asset Number", Text),
            col("serial_number", "Serial Number", Text),
            col("store_name", "Store", Text),
            col("stock_type_name", "Stock Type", Text),
            col("quantity_held", "Held", Number),
            col("quantity_allocated", "Allocated", Number),
            col("quantity_available", "Available", Number),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("item_name", "Item", Text, TEXT_PREDICATES),
            filter("asset_number", "Asset Number", Text, TEXT_PREDICATES),
            filter("serial_number", "Serial Number", Text, TEXT_PREDICATES),
            filter("store_id", "Store ID", Number, NUMERIC_PREDICATES),
            filter("quantity_held", "Held", Number, NUMERIC_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["item", "store"],
    },
    Module {
        key: "quarantines",
        name: "Quarantines",
        endpoint: "quarantines",
        columns: &[
            col("id", "ID", Number),
            col("item_name", "Item", Text),
            col("asset_number", "Asset Number", Text),
            col("quarantine_type_name", "Type", Text),
            col("reference", "Reference", Text),
            col("description", "Description", Text),
            col("quantity", "Quantity", Number),
            col("starts_at", "Starts", Datetime),
            col("ends_at", "Ends", Datetime),
            col("created_at", "Created", Datetime),
        ],
        filters: &[
            filter("reference", "Reference", Text, TEXT_PREDICATES),
            filter("description", "Description", Text, TEXT_PREDICATES),
            choice("quarantine_type", "Type", &["Damaged", "Lost", "Stolen", "Repair", "Service"]),
            filter("starts_at", "Starts", Datetime, DATE_PREDICATES),
            filter("ends_at", "Ends", Datetime, DATE_PREDICATES),
            filter("created_at", "Created", Datetime, DATE_PREDICATES),
        ],
        includes: &["item", "stock_level"],
    },
];
