use comfy_table::{presets::UTF8_FULL, Table};
use milkrun_core::schema::ColumnDescription;
use tracing::info;

/// Logs the schema report one column per event.
pub fn log_columns(table: &str, columns: &[ColumnDescription]) {
    info!(table, columns = columns.len(), "table schema");
    for column in columns {
        info!(table, column = %column.name, data_type = %column.data_type, "column");
    }
}

pub fn render_columns(columns: &[ColumnDescription]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Column", "Type"]);
    for column in columns {
        table.add_row(vec![column.name.as_str(), column.data_type.as_str()]);
    }
    table.to_string()
}
