//! LanceDB-backed [`VectorStore`].

use std::path::Path;
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use tracing::info;

use docsearch_core::error::{Error, Result};
use docsearch_core::types::Chunk;

use crate::schema::build_arrow_schema;
use crate::store::{VectorMatch, VectorRecord, VectorStore};

fn store_err(e: impl std::fmt::Display) -> Error {
	Error::Store(e.to_string())
}

pub struct LanceVectorStore {
	db: Connection,
	table_name: String,
	dim: usize,
}

impl LanceVectorStore {
	pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await.map_err(store_err)?;
		info!(path = %db_path.display(), table = table_name, "opened LanceDB");
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	async fn table_exists(&self) -> Result<bool> {
		let names = self.db.table_names().execute().await.map_err(store_err)?;
		Ok(names.iter().any(|n| n == &self.table_name))
	}

	fn to_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim).map_err(store_err)?;
		if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dim) {
			return Err(Error::Store(format!("vector for {} has dimension {}, table uses {}", bad.id(), bad.vector.len(), self.dim)));
		}
		let ids: Vec<&str> = records.iter().map(|r| r.chunk.id.as_str()).collect();
		let sources: Vec<&str> = records.iter().map(|r| r.chunk.source.as_str()).collect();
		let paths: Vec<Option<&str>> = records.iter().map(|r| r.chunk.file_path.as_deref()).collect();
		let titles: Vec<&str> = records.iter().map(|r| r.chunk.section_title.as_str()).collect();
		let texts: Vec<&str> = records.iter().map(|r| r.chunk.text.as_str()).collect();
		let indices: Vec<i32> = records.iter().map(|r| r.chunk.chunk_index as i32).collect();
		let counts: Vec<i32> = records.iter().map(|r| r.chunk.section_chunk_count as i32).collect();
		let vectors = records.iter().map(|r| Some(r.vector.iter().copied().map(Some).collect::<Vec<_>>()));
		RecordBatch::try_new(build_arrow_schema(dim), vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(sources)),
			Arc::new(StringArray::from(paths)),
			Arc::new(StringArray::from(titles)),
			Arc::new(StringArray::from(texts)),
			Arc::new(Int32Array::from(indices)),
			Arc::new(Int32Array::from(counts)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
		])
		.map_err(store_err)
	}
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::Store(format!("column {name} missing")))
}

fn int_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<Int32Array>())
		.ok_or_else(|| Error::Store(format!("column {name} missing")))
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	fn name(&self) -> &str {
		&self.table_name
	}

	async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
		if records.is_empty() {
			return Ok(());
		}
		let batch = self.to_record_batch(&records)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		if self.table_exists().await? {
			let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
			let mut merge = table.merge_insert(&["id"]);
			merge.when_matched_update_all(None).when_not_matched_insert_all();
			merge.execute(reader).await.map_err(store_err)?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await.map_err(store_err)?;
		}
		Ok(())
	}

	async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
		if !self.table_exists().await? {
			return Ok(Vec::new());
		}
		let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
		let mut stream = table
			.vector_search(vector.to_vec())
			.map_err(store_err)?
			.distance_type(DistanceType::Cosine)
			.limit(k)
			.execute()
			.await
			.map_err(store_err)?;
		let mut out = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(store_err)? {
			let ids = string_col(&batch, "id")?;
			let sources = string_col(&batch, "source")?;
			let paths = string_col(&batch, "file_path")?;
			let titles = string_col(&batch, "section_title")?;
			let texts = string_col(&batch, "text")?;
			let indices = int_col(&batch, "chunk_index")?;
			let counts = int_col(&batch, "section_chunk_count")?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| Error::Store("column _distance missing".into()))?;
			for i in 0..batch.num_rows() {
				let chunk = Chunk {
					id: ids.value(i).to_string(),
					source: sources.value(i).to_string(),
					file_path: (!paths.is_null(i)).then(|| paths.value(i).to_string()),
					section_title: titles.value(i).to_string(),
					text: texts.value(i).to_string(),
					chunk_index: indices.value(i).max(0) as usize,
					section_chunk_count: counts.value(i).max(0) as usize,
				};
				out.push(VectorMatch { chunk, distance: distances.value(i) });
			}
		}
		out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		out.truncate(k);
		Ok(out)
	}

	async fn count(&self) -> Result<usize> {
		if !self.table_exists().await? {
			return Ok(0);
		}
		let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
		table.count_rows(None).await.map_err(store_err)
	}

	async fn reset(&self) -> Result<()> {
		if self.table_exists().await? {
			let table = self.db.open_table(&self.table_name).execute().await.map_err(store_err)?;
			table.delete("true").await.map_err(store_err)?;
			info!(table = %self.table_name, "LanceDB table cleared");
		}
		Ok(())
	}
}
