use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("source", DataType::Utf8, false),
		Field::new("file_path", DataType::Utf8, true),
		Field::new("section_title", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("chunk_index", DataType::Int32, false),
		Field::new("section_chunk_count", DataType::Int32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
