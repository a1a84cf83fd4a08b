// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Rendering and parsing of the aligned tables room lists are stored as.
//!
//! The format is the one `psql` prints by default:
//!
//! ```text
//!      room_id      | event_count
//! ------------------+-------------
//!  !abc:example.org |       12345
//! (1 row)
//! ```

use std::sync::LazyLock;

use janitor_matrix::RoomId;
use regex::Regex;
use tracing::warn;

static COUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("count regex to be valid"));

static FOOTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([0-9]+ rows?\)$").expect("footer regex to be valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub alignment: Alignment,
}

impl Column {
    /// A left-aligned column
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            alignment: Alignment::Left,
        }
    }

    /// A right-aligned column
    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            alignment: Alignment::Right,
        }
    }
}

/// A row as fetched from the database, before it is written to a list
pub trait TableRow {
    /// The cells of the row, in column order
    fn cells(&self) -> Vec<String>;
}

/// A record read back from a list file
pub trait ListRecord: Sized {
    /// The database row this record is written from
    type Row: TableRow;

    /// The columns of the table. The first one holds the room ID.
    const COLUMNS: &'static [Column];

    fn room_id(&self) -> &RoomId;

    /// Parse a record from the fields of a line, split on `|`.
    ///
    /// Fields are not trimmed, so that records can rebuild text containing
    /// the separator.
    ///
    /// # Errors
    ///
    /// Returns a human readable reason if the fields don't form a valid
    /// record.
    fn parse(fields: &[&str]) -> Result<Self, String>;
}

/// A line of a list which couldn't be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number in the file
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct ParsedTable<T> {
    pub records: Vec<T>,
    pub malformed: Vec<MalformedLine>,
}

/// Parse a room ID field
///
/// # Errors
///
/// Returns a reason if the field isn't a valid room ID
pub fn parse_room_id(field: &str) -> Result<RoomId, String> {
    let field = field.trim();
    RoomId::parse(field).map_err(|e| format!("invalid room ID {field:?}: {e}"))
}

/// Parse a numeric field of the given column
///
/// # Errors
///
/// Returns a reason if the field isn't made only of digits or doesn't fit in
/// a `u64`
pub fn parse_count(field: &str, column: &str) -> Result<u64, String> {
    let field = field.trim();
    if !COUNT_REGEX.is_match(field) {
        return Err(format!("{column} {field:?} is not a number"));
    }

    field
        .parse()
        .map_err(|e| format!("{column} {field:?} is out of range: {e}"))
}

fn is_divider(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| c == '-' || c == '+')
}

fn first_field(line: &str) -> &str {
    line.split('|').next().unwrap_or_default().trim()
}

/// Newlines would break the line-oriented format
fn sanitize(cell: &str) -> String {
    cell.replace(['\n', '\r'], " ")
}

fn push_line(output: &mut String, cells: &[String]) {
    let line = format!(" {} ", cells.join(" | "));
    output.push_str(line.trim_end());
    output.push('\n');
}

/// Render rows as an aligned table
#[must_use]
pub fn render<R: TableRow>(columns: &[Column], rows: &[R]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.cells().iter().map(|cell| sanitize(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.name.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:^width$}", column.name))
        .collect();
    push_line(&mut output, &header);

    let divider: Vec<String> = widths.iter().map(|width| "-".repeat(width + 2)).collect();
    output.push_str(&divider.join("+"));
    output.push('\n');

    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .zip(row)
            .map(|((column, width), cell)| match column.alignment {
                Alignment::Left => format!("{cell:<width$}"),
                Alignment::Right => format!("{cell:>width$}"),
            })
            .collect();
        push_line(&mut output, &cells);
    }

    if rows.len() == 1 {
        output.push_str("(1 row)\n");
    } else {
        output.push_str(&format!("({} rows)\n", rows.len()));
    }

    output
}

/// Check a rendered table before it replaces a list: it must have the
/// expected header and divider, one line per row fetched with a cell for
/// each column, and a footer agreeing with the number of rows.
///
/// # Errors
///
/// Returns the reason the table is rejected
pub fn check_rendered(columns: &[Column], content: &str, rows: usize) -> Result<(), String> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let expected = columns.first().map(|c| c.name).unwrap_or_default();
    match lines.next() {
        Some(header) if first_field(header) == expected => {}
        Some(header) => return Err(format!("unexpected header line {header:?}")),
        None => return Err("the table is empty".to_owned()),
    }

    match lines.next() {
        Some(divider) if is_divider(divider.trim()) => {}
        _ => return Err("missing divider below the header".to_owned()),
    }

    let mut body: Vec<&str> = lines.collect();
    match body.pop().map(str::trim) {
        Some(footer) if FOOTER_REGEX.is_match(footer) => {
            let expected = if rows == 1 {
                "(1 row)".to_owned()
            } else {
                format!("({rows} rows)")
            };
            if footer != expected {
                return Err(format!("footer {footer:?} doesn't match the {rows} rows fetched"));
            }
        }
        _ => return Err("missing row count footer".to_owned()),
    }

    if body.len() != rows {
        return Err(format!("{} lines for the {rows} rows fetched", body.len()));
    }

    if let Some(line) = body
        .iter()
        .find(|line| line.split('|').count() < columns.len())
    {
        return Err(format!("line {line:?} has fewer than {} cells", columns.len()));
    }

    Ok(())
}

/// Parse a list, skipping the header, dividers, footers and blank lines.
///
/// Lines which don't form a valid record are logged and collected in
/// [`ParsedTable::malformed`]; parsing always goes through the whole input.
#[must_use]
pub fn parse_table<T: ListRecord>(content: &str) -> ParsedTable<T> {
    let header = T::COLUMNS.first().map(|c| c.name).unwrap_or_default();
    let mut records = Vec::new();
    let mut malformed = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || is_divider(trimmed)
            || FOOTER_REGEX.is_match(trimmed)
            || first_field(trimmed) == header
        {
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        let result = if fields.len() < T::COLUMNS.len() {
            Err(format!(
                "expected {} columns, found {}",
                T::COLUMNS.len(),
                fields.len()
            ))
        } else {
            T::parse(&fields)
        };

        match result {
            Ok(record) => records.push(record),
            Err(reason) => {
                let line_number = index + 1;
                warn!(line_number, %reason, "Skipping malformed line");
                malformed.push(MalformedLine {
                    line_number,
                    line: line.to_owned(),
                    reason,
                });
            }
        }
    }

    ParsedTable { records, malformed }
}
