use crate::error::SweeperError;
use crate::table::Table;
use csv::WriterBuilder;

/// Writes the header and every row; missing cells become empty fields.
pub(super) fn write(table: &Table) -> Result<Vec<u8>, SweeperError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.into_inner().map_err(|error| SweeperError::IoError(error.into_error()))
}
