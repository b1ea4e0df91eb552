//! Document flattening.
//!
//! A document becomes one entry per JSON leaf, keyed by
//! `database:document_id:field:...`. Nested objects add their field names as
//! segments and arrays add the element index, so `{"hosts": ["a", "b"]}`
//! yields `db:doc:hosts:0` and `db:doc:hosts:1`. Fields whose name starts with
//! [`RESERVED_PREFIX`](crate::path::RESERVED_PREFIX) are skipped at every
//! depth together with everything below them. Empty objects and arrays yield
//! nothing.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::ScalarValue;
use crate::path;

/// One document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	pub id: String,
	pub content: Value,
}

impl Document {
	pub fn new(id: impl Into<String>, content: Value) -> Self {
		Self { id: id.into(), content }
	}
}

/// Flattens one document rooted at `database:id`.
///
/// Documents whose body is not a JSON object contribute nothing.
pub fn flatten_document(database: &str, document: &Document) -> Vec<(String, ScalarValue)> {
	let Value::Object(fields) = &document.content else {
		tracing::debug!(database, id = %document.id, "config.flatten_skipped_non_object");
		return Vec::new();
	};
	flatten_object(&path::child(database, &document.id), fields)
}

/// Flattens every document into one mapping; on a key collision the later
/// document wins.
pub fn flatten_documents<'a, I>(database: &str, documents: I) -> BTreeMap<String, ScalarValue>
where
	I: IntoIterator<Item = &'a Document>,
{
	documents
		.into_iter()
		.flat_map(|document| flatten_document(database, document))
		.collect()
}

fn flatten_object(prefix: &str, fields: &Map<String, Value>) -> Vec<(String, ScalarValue)> {
	fields
		.iter()
		.filter(|(name, _)| !path::is_reserved(name))
		.flat_map(|(name, value)| flatten_value(path::child(prefix, name), value))
		.collect()
}

fn flatten_value(key: String, value: &Value) -> Vec<(String, ScalarValue)> {
	match value {
		Value::Object(fields) => flatten_object(&key, fields),
		Value::Array(items) => items
			.iter()
			.enumerate()
			.flat_map(|(index, item)| flatten_value(path::child(&key, &index.to_string()), item))
			.collect(),
		leaf => ScalarValue::from_json(leaf).map(|scalar| (key, scalar)).into_iter().collect(),
	}
}
