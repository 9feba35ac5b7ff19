use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

/// Bucket the KYC and loan files are uploaded into.
pub const BUCKET: &str = "bank-management-cde77.appspot.com";

pub type Result<T> = std::result::Result<T, Error>;

/// A file captured from a form, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
	pub file_name: String,
	pub data: Vec<u8>,
}

impl Upload {
	pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Upload {
		Upload {
			file_name: file_name.into(),
			data,
		}
	}
}

/// Opaque upload-by-path blob service; returns a retrievable URL.
#[async_trait]
pub trait FileStore: Send + Sync {
	async fn upload(&self, path: &str, data: Vec<u8>) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	Http(String),
	Decode(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Http(msg) => write!(f, "file upload failed: {}", msg),
			Error::Decode(msg) => write!(f, "decoding upload response: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		Error::Http(e.to_string())
	}
}

/// REST implementation against the hosted bucket.
pub struct RestFileStore {
	http: reqwest::Client,
	bucket: String,
}

impl RestFileStore {
	pub fn new() -> RestFileStore {
		RestFileStore {
			http: reqwest::Client::new(),
			bucket: BUCKET.to_string(),
		}
	}
}

impl Default for RestFileStore {
	fn default() -> Self {
		RestFileStore::new()
	}
}

#[async_trait]
impl FileStore for RestFileStore {
	async fn upload(&self, path: &str, data: Vec<u8>) -> Result<String> {
		let upload_url = format!(
			"https://firebasestorage.googleapis.com/v0/b/{}/o?name={}",
			self.bucket,
			encode_object_path(path)
		);
		let resp = self.http.post(&upload_url).body(data).send().await?;
		if !resp.status().is_success() {
			return Err(Error::Http(format!("upload returned {}", resp.status())));
		}
		let meta = resp
			.json::<UploadResponse>()
			.await
			.map_err(|e| Error::Decode(e.to_string()))?;

		let mut url = format!(
			"https://firebasestorage.googleapis.com/v0/b/{}/o/{}?alt=media",
			self.bucket,
			encode_object_path(path)
		);
		if let Some(token) = meta.download_tokens {
			url.push_str("&token=");
			url.push_str(&token);
		}
		Ok(url)
	}
}

/// Minimal percent-encoding for object paths inside a URL: the separator and
/// a few characters file names commonly carry.
fn encode_object_path(path: &str) -> String {
	let mut out = String::with_capacity(path.len());
	for c in path.chars() {
		match c {
			'/' => out.push_str("%2F"),
			' ' => out.push_str("%20"),
			'#' => out.push_str("%23"),
			'?' => out.push_str("%3F"),
			_ => out.push(c),
		}
	}
	out
}

#[derive(Deserialize)]
struct UploadResponse {
	#[serde(rename = "downloadTokens")]
	download_tokens: Option<String>,
}
