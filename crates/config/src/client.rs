//! HTTP access to the document store.

use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{ConfigError, CouchDbOptions, Document, Result};

#[derive(Deserialize)]
struct AllDocsResponse {
	#[serde(default)]
	rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	doc: Option<Value>,
}

/// Bulk and single-document reads against one database.
#[derive(Debug, Clone)]
pub struct DocumentClient {
	client: Client,
	options: CouchDbOptions,
}

impl DocumentClient {
	/// Builds a client using the connect timeout from `options.watch`.
	pub fn new(options: CouchDbOptions) -> Result<Self> {
		let client = Client::builder().connect_timeout(options.watch.connect_timeout()).build()?;
		Self::with_client(client, options)
	}

	/// Uses an existing `reqwest` client.
	pub fn with_client(client: Client, options: CouchDbOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self { client, options })
	}

	pub fn options(&self) -> &CouchDbOptions {
		&self.options
	}

	/// Fetches every document in the database.
	///
	/// Rows without an embedded document (deleted or missing ids) are skipped.
	pub async fn fetch_all(&self) -> Result<Vec<Document>> {
		let url = self.options.all_docs_url()?;
		let body = self.send(Method::GET, url).await?.bytes().await?;
		let response: AllDocsResponse = serde_json::from_slice(&body)?;

		let documents: Vec<Document> = response
			.rows
			.into_iter()
			.filter_map(|row| {
				let content = row.doc?;
				let id = row
					.id
					.or_else(|| content.get("_id").and_then(Value::as_str).map(str::to_string))?;
				Some(Document { id, content })
			})
			.collect();

		tracing::debug!(database = %self.options.database, documents = documents.len(), "config.fetch_all");
		Ok(documents)
	}

	/// Size of a document body, or `None` if the document does not exist.
	pub async fn head_document(&self, id: &str) -> Result<Option<u64>> {
		let url = self.options.document_url(id)?;
		let response = self.client.head(url.clone()).send().await?;
		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let response = check_status(url, response)?;
		let length = response
			.headers()
			.get(CONTENT_LENGTH)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.parse().ok())
			.unwrap_or(0);
		Ok(Some(length))
	}

	/// Raw JSON body of one document.
	pub async fn fetch_document(&self, id: &str) -> Result<Bytes> {
		let url = self.options.document_url(id)?;
		Ok(self.send(Method::GET, url).await?.bytes().await?)
	}

	async fn send(&self, method: Method, url: Url) -> Result<Response> {
		let response = self.client.request(method, url.clone()).send().await?;
		check_status(url, response)
	}
}

fn check_status(url: Url, response: Response) -> Result<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	Err(ConfigError::Status {
		url: url.into(),
		status,
	})
}
