use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Time;

/// Hosted document collection endpoint all customer data lives under.
pub const BASE_URL: &str =
	"https://firestore.googleapis.com/v1/projects/bank-management-cde77/databases/(default)/documents";

pub type Result<T> = std::result::Result<T, Error>;

/// Shared handle to the document store, held by every repo.
pub type StoreHandle = Arc<dyn DocumentStore>;

/// A single field value in the store's tagged wrapper encoding.
///
/// `integerValue` travels as a JSON string on the wire; writes emit a string
/// and reads accept either a string or a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	#[serde(rename = "stringValue")]
	String(String),
	#[serde(rename = "integerValue", with = "int_string")]
	Integer(i64),
	#[serde(rename = "booleanValue")]
	Boolean(bool),
	#[serde(rename = "timestampValue")]
	Timestamp(Time),
}

impl Value {
	pub fn str(v: impl Into<String>) -> Value {
		Value::String(v.into())
	}

	pub fn integer(v: i64) -> Value {
		Value::Integer(v)
	}

	pub fn boolean(v: bool) -> Value {
		Value::Boolean(v)
	}

	pub fn timestamp(v: Time) -> Value {
		Value::Timestamp(v)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Integer(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Boolean(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_time(&self) -> Option<Time> {
		match self {
			Value::Timestamp(t) => Some(*t),
			_ => None,
		}
	}
}

mod int_string {
	use serde::de::Error;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(v: &i64, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(v)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Int(i64),
			Str(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Int(v) => Ok(v),
			Raw::Str(s) => s.trim().parse().map_err(D::Error::custom),
		}
	}
}

/// Named fields of one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
	pub fn new() -> Fields {
		Fields::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: Value) {
		self.0.insert(key.into(), value);
	}

	pub fn with(mut self, key: impl Into<String>, value: Value) -> Fields {
		self.insert(key, value);
		self
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	fn require(&self, key: &str) -> Result<&Value> {
		self.get(key).ok_or_else(|| Error::MissingField(key.to_string()))
	}

	pub fn str(&self, key: &str) -> Result<&str> {
		self.require(key)?
			.as_str()
			.ok_or_else(|| Error::Decode(format!("field '{}' is not a string", key)))
	}

	pub fn int(&self, key: &str) -> Result<i64> {
		self.require(key)?
			.as_i64()
			.ok_or_else(|| Error::Decode(format!("field '{}' is not an integer", key)))
	}

	pub fn boolean(&self, key: &str) -> Result<bool> {
		self.require(key)?
			.as_bool()
			.ok_or_else(|| Error::Decode(format!("field '{}' is not a boolean", key)))
	}

	pub fn time(&self, key: &str) -> Result<Time> {
		self.require(key)?
			.as_time()
			.ok_or_else(|| Error::Decode(format!("field '{}' is not a timestamp", key)))
	}
}

/// A stored document: full resource name plus its fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub fields: Fields,
}

impl Document {
	/// Last segment of the resource name, used to address patches.
	pub fn doc_id(&self) -> &str {
		self.name.rsplit('/').next().unwrap_or_default()
	}
}

/// Field-equality query against one collection. A single filter becomes a
/// `fieldFilter`; several are combined under an AND `compositeFilter`.
#[derive(Debug, Clone)]
pub struct Query {
	collection: String,
	filters: Vec<(String, Value)>,
}

impl Query {
	pub fn collection(name: impl Into<String>) -> Query {
		Query {
			collection: name.into(),
			filters: Vec::new(),
		}
	}

	pub fn field_eq(mut self, path: impl Into<String>, value: Value) -> Query {
		self.filters.push((path.into(), value));
		self
	}

	pub fn collection_id(&self) -> &str {
		&self.collection
	}

	pub fn filters(&self) -> &[(String, Value)] {
		&self.filters
	}
}

/// Raw operations the hosted collection API offers. Object-safe so workflows
/// can run against the REST store or an in-memory fake.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	/// Fetch one document by its path under the collection root,
	/// e.g. `counters/customerCounter`.
	async fn get(&self, path: &str) -> Result<Document>;

	/// List every document in a collection.
	async fn list(&self, collection: &str) -> Result<Vec<Document>>;

	/// Run a structured field-equality query. Rows without a document are
	/// dropped; an empty result is not an error here.
	async fn run_query(&self, query: Query) -> Result<Vec<Document>>;

	/// Insert a new document with a server-assigned id.
	async fn insert(&self, collection: &str, fields: Fields) -> Result<Document>;

	/// Patch named fields of a document. `mask` limits the update to those
	/// field paths; an empty mask overwrites without one.
	async fn patch(
		&self,
		collection: &str,
		doc_id: &str,
		fields: Fields,
		mask: &[&str],
	) -> Result<Document>;
}

/// Error from a store round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	RecordNotFound,
	MissingField(String),
	Decode(String),
	Status { code: u16, message: String },
	Http(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::RecordNotFound => write!(f, "record does not exist"),
			Error::MissingField(name) => write!(f, "document is missing field '{}'", name),
			Error::Decode(msg) => write!(f, "decoding document: {}", msg),
			Error::Status { code, message } => write!(f, "store error {}: {}", code, message),
			Error::Http(msg) => write!(f, "store request failed: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		Error::Http(e.to_string())
	}
}

/// REST implementation against the hosted store.
pub struct RestStore {
	http: reqwest::Client,
	base_url: String,
}

impl RestStore {
	pub fn new() -> RestStore {
		RestStore::with_base_url(BASE_URL)
	}

	/// Point at a different documents root, e.g. a local emulator.
	pub fn with_base_url(base_url: impl Into<String>) -> RestStore {
		RestStore {
			http: reqwest::Client::new(),
			base_url: base_url.into(),
		}
	}
}

impl Default for RestStore {
	fn default() -> Self {
		RestStore::new()
	}
}

#[async_trait]
impl DocumentStore for RestStore {
	async fn get(&self, path: &str) -> Result<Document> {
		let url = format!("{}/{}", self.base_url, path);
		let resp = check(self.http.get(&url).send().await?).await?;
		resp.json::<Document>().await.map_err(Into::into)
	}

	async fn list(&self, collection: &str) -> Result<Vec<Document>> {
		let url = format!("{}/{}", self.base_url, collection);
		let resp = check(self.http.get(&url).send().await?).await?;
		let listing = resp.json::<ListResponse>().await?;
		Ok(listing.documents)
	}

	async fn run_query(&self, query: Query) -> Result<Vec<Document>> {
		let url = format!("{}:runQuery", self.base_url);
		let body = to_wire(&query);
		let resp = check(self.http.post(&url).json(&body).send().await?).await?;
		let rows = resp.json::<Vec<QueryRow>>().await?;
		Ok(rows.into_iter().filter_map(|row| row.document).collect())
	}

	async fn insert(&self, collection: &str, fields: Fields) -> Result<Document> {
		let url = format!("{}/{}", self.base_url, collection);
		let body = DocumentBody { fields: &fields };
		let resp = check(self.http.post(&url).json(&body).send().await?).await?;
		resp.json::<Document>().await.map_err(Into::into)
	}

	async fn patch(
		&self,
		collection: &str,
		doc_id: &str,
		fields: Fields,
		mask: &[&str],
	) -> Result<Document> {
		let url = format!("{}/{}/{}", self.base_url, collection, doc_id);
		let mut req = self.http.patch(&url);
		for field in mask {
			req = req.query(&[("updateMask.fieldPaths", *field)]);
		}
		let body = DocumentBody { fields: &fields };
		let resp = check(req.json(&body).send().await?).await?;
		resp.json::<Document>().await.map_err(Into::into)
	}
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
	let status = resp.status();
	if status.is_success() {
		return Ok(resp);
	}
	if status == reqwest::StatusCode::NOT_FOUND {
		return Err(Error::RecordNotFound);
	}
	let message = match resp.json::<ErrorResponse>().await {
		Ok(body) => body.error.message,
		Err(_) => status.to_string(),
	};
	Err(Error::Status {
		code: status.as_u16(),
		message,
	})
}

#[derive(Serialize)]
struct DocumentBody<'a> {
	fields: &'a Fields,
}

#[derive(Deserialize, Default)]
struct ListResponse {
	#[serde(default)]
	documents: Vec<Document>,
}

#[derive(Deserialize)]
struct QueryRow {
	#[serde(default)]
	document: Option<Document>,
}

#[derive(Deserialize)]
struct ErrorResponse {
	error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
	structured_query: WireQuery,
}

#[derive(Serialize)]
struct WireQuery {
	from: Vec<CollectionSelector>,
	#[serde(rename = "where", skip_serializing_if = "Option::is_none")]
	filter: Option<WireFilter>,
}

#[derive(Serialize)]
struct CollectionSelector {
	#[serde(rename = "collectionId")]
	collection_id: String,
}

#[derive(Serialize)]
enum WireFilter {
	#[serde(rename = "fieldFilter")]
	Field(FieldFilter),
	#[serde(rename = "compositeFilter")]
	Composite(CompositeFilter),
}

#[derive(Serialize)]
struct FieldFilter {
	field: FieldReference,
	op: &'static str,
	value: Value,
}

#[derive(Serialize)]
struct FieldReference {
	#[serde(rename = "fieldPath")]
	field_path: String,
}

#[derive(Serialize)]
struct CompositeFilter {
	op: &'static str,
	filters: Vec<WireFilter>,
}

fn to_wire(query: &Query) -> QueryRequest {
	let mut filters: Vec<WireFilter> = query
		.filters()
		.iter()
		.map(|(path, value)| {
			WireFilter::Field(FieldFilter {
				field: FieldReference {
					field_path: path.clone(),
				},
				op: "EQUAL",
				value: value.clone(),
			})
		})
		.collect();

	let filter = match filters.len() {
		0 => None,
		1 => filters.pop(),
		_ => Some(WireFilter::Composite(CompositeFilter {
			op: "AND",
			filters,
		})),
	};

	QueryRequest {
		structured_query: WireQuery {
			from: vec![CollectionSelector {
				collection_id: query.collection_id().to_string(),
			}],
			filter,
		},
	}
}
