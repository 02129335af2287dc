//! Order export sink: appends every completed order to a CSV log.
//!
//! Runs after the order transaction has committed. Export failures are
//! logged and never propagate back into order placement.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::core::error::AppResult;
use crate::storage::orders::{Order, OrderLine};

const HEADER: &str = "order_id,user_id,delivery_info,created_at,status,product_name,quantity,price\n";

/// Escape a CSV field: quotes doubled, newlines flattened.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\"").replace(['\n', '\r'], " "))
}

/// Appends one row per order line to the CSV file at `path`, creating it
/// with a header row on first use.
pub fn append_order_to_csv(path: &str, order: &Order, lines: &[OrderLine]) -> AppResult<()> {
    let is_new = !Path::new(path).exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if is_new {
        file.write_all(HEADER.as_bytes())?;
    }

    let mut buf = String::new();
    for line in lines {
        buf.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            order.id,
            order.user_id,
            csv_field(&order.delivery_info),
            csv_field(&order.created_at),
            order.status.as_str(),
            csv_field(&line.product_name),
            line.quantity,
            line.product_price,
        ));
    }
    file.write_all(buf.as_bytes())?;

    Ok(())
}
