/// Arrow schema definitions for the regional law index.
pub mod index {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema for the law index mirror (one row per law, spreadsheet column order).
    pub fn law_index_schema() -> Schema {
        Schema::new(vec![
            Field::new("region", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("number", DataType::Utf8, false),
            Field::new("date", DataType::Utf8, false),
            Field::new("filename", DataType::Utf8, false),
            Field::new("source_url", DataType::Utf8, true),
            Field::new("status", DataType::Utf8, false),
        ])
    }
}
