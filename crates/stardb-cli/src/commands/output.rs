//! Terminal output
//!
//! Results go to stdout as tab-separated text; status lines go to stderr
//! so they never mix with data that may be piped elsewhere.

use colored::Colorize;
use stardb_catalog::DataTable;
use std::fmt::Display;

pub fn print_row<I, T>(cells: I)
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let line: Vec<String> = cells.into_iter().map(|c| c.to_string()).collect();
    println!("{}", line.join("\t"));
}

pub fn print_table(table: &DataTable) {
    print_row(&table.columns);
    for row in &table.rows {
        print_row(row);
    }
}

pub fn optional<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn success(message: &str) {
    eprintln!("{} {}", "✔".bright_green(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "!".bright_yellow().bold(), message.bright_yellow());
}
