use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Arrow schema for the fragment table. The vector column width is the
/// deployment's embedding dimension.
pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("fragment_id", DataType::Int64, false),
        Field::new("document_id", DataType::Int64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("page_number", DataType::Int32, true),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dim as i32,
            ),
            true,
        ),
    ]))
}
