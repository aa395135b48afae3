// CSV/TSV export

use std::path::Path;

use lineup_recon::ProjectedTable;

use crate::atomic::write_atomic;
use crate::error::PersistenceError;

pub fn export(path: &Path, table: &ProjectedTable, delimiter: u8) -> Result<(), PersistenceError> {
    write_atomic(path, |tmp| write_table(tmp, table, delimiter))
}

pub fn export_tsv(path: &Path, table: &ProjectedTable) -> Result<(), PersistenceError> {
    export(path, table, b'\t')
}

fn write_table(path: &Path, table: &ProjectedTable, delimiter: u8) -> Result<(), PersistenceError> {
    let wrap = |source: csv::Error| PersistenceError::Csv { path: path.to_path_buf(), source };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(wrap)?;

    writer.write_record(&table.headers).map_err(wrap)?;
    for row in &table.rows {
        writer.write_record(row).map_err(wrap)?;
    }

    writer
        .flush()
        .map_err(|source| PersistenceError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}
