// Excel export

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};
use url::Url;

use lineup_recon::ProjectedTable;

use crate::atomic::write_atomic;
use crate::error::PersistenceError;
use crate::{ExtraSheet, WriteOptions, WriteSummary};

/// Width of the channel-name column, in characters.
pub const NAME_COLUMN_WIDTH: f64 = 25.0;
/// Width of every availability/number column.
pub const DATA_COLUMN_WIDTH: f64 = 10.0;

const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const WIKI_BASE: &str = "https://en.wikipedia.org/wiki/";

/// Write the lineup (and any extra tables) as one workbook.
pub fn export(
    path: &Path,
    table: &ProjectedTable,
    extras: &[ExtraSheet],
    options: &WriteOptions,
) -> Result<WriteSummary, PersistenceError> {
    let mut workbook = Workbook::new();
    let mut used_names: Vec<String> = Vec::new();
    let mut summary = WriteSummary { files: vec![path.to_path_buf()], sheets: 0, rows: 0 };

    let sheets = std::iter::once((options.sheet_name.as_str(), table, options.wiki_links))
        .chain(extras.iter().map(|e| (e.name.as_str(), &e.table, false)));

    for (name, table, links) in sheets {
        let name = unique_sheet_name(&sanitize_sheet_name(name), &used_names);
        let xlsx_err = |e: XlsxError| PersistenceError::Xlsx {
            path: path.to_path_buf(),
            message: format!("sheet '{name}': {e}"),
        };

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(xlsx_err)?;
        write_sheet(worksheet, table, links).map_err(xlsx_err)?;

        summary.sheets += 1;
        summary.rows += table.rows.len();
        used_names.push(name);
    }

    write_atomic(path, |tmp| {
        workbook.save(tmp).map_err(|e| PersistenceError::Xlsx {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    })?;

    Ok(summary)
}

fn write_sheet(worksheet: &mut Worksheet, table: &ProjectedTable, wiki_links: bool) -> Result<(), XlsxError> {
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let wrap_format = Format::new().set_text_wrap();
    let centre_format = Format::new().set_text_wrap().set_align(FormatAlign::Center);

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            if col == 0 {
                let link = if wiki_links { wiki_url(value) } else { None };
                match link {
                    Some(link) => {
                        worksheet.write_url_with_text(row_idx, 0, link.as_str(), value)?;
                    }
                    None => {
                        worksheet.write_string_with_format(row_idx, 0, value, &wrap_format)?;
                    }
                }
            } else {
                worksheet.write_string_with_format(row_idx, col as u16, value, &centre_format)?;
            }
        }
    }

    let width = table.headers.len().max(1);
    worksheet.set_column_width(0, NAME_COLUMN_WIDTH)?;
    for col in 1..width {
        worksheet.set_column_width(col as u16, DATA_COLUMN_WIDTH)?;
    }

    worksheet.set_freeze_panes(1, 1)?;
    worksheet.autofilter(0, 0, table.rows.len() as u32, (width - 1) as u16)?;
    Ok(())
}

/// Make `name` acceptable to Excel: no `[]:*?/\`, no leading or trailing
/// apostrophe, at most 31 characters, not empty.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if truncated.is_empty() {
        crate::DEFAULT_SHEET_NAME.to_string()
    } else {
        truncated
    }
}

/// Excel compares sheet names case-insensitively.
fn unique_sheet_name(name: &str, used: &[String]) -> String {
    let taken = |candidate: &str| used.iter().any(|u| u.eq_ignore_ascii_case(candidate));
    if !taken(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            format!("{}{suffix}", name.chars().take(keep).collect::<String>())
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// `"usa network"` → `https://en.wikipedia.org/wiki/Usa_network`.
pub fn wiki_url(channel: &str) -> Option<Url> {
    let trimmed = channel.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    let title: String = first.to_uppercase().chain(chars).collect::<String>().replace(' ', "_");

    let mut url = Url::parse(WIKI_BASE).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(&title);
    Some(url)
}
