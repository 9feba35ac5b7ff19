use crate::store::{self, Document, Fields, Query, StoreHandle, Value};
use crate::types::{CustomerId, DocumentId, Time};

const COLLECTION: &str = "documents";

/// The one document type the sign-up flow creates.
pub const DOC_TYPE_PERSONAL: &str = "personal";

/// A customer's KYC bundle: profile photo, Aadhaar and PAN download URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct KycDocument {
	pub document_id: DocumentId,
	pub customer_id: CustomerId,
	pub doc_type: String,
	pub profile_photo: String,
	pub aadhaar: String,
	pub pan: String,
	pub is_delete: bool,
}

impl KycDocument {
	pub fn from_document(doc: &Document) -> store::Result<KycDocument> {
		Ok(KycDocument {
			document_id: doc.fields.int("documentId")?,
			customer_id: doc.fields.int("customerId")?,
			doc_type: doc.fields.str("docType")?.to_string(),
			profile_photo: doc.fields.str("profilePhoto")?.to_string(),
			aadhaar: doc.fields.str("aadhaar")?.to_string(),
			pan: doc.fields.str("pan")?.to_string(),
			is_delete: doc.fields.boolean("isDelete")?,
		})
	}
}

pub struct NewKycDocument {
	pub document_id: DocumentId,
	pub customer_id: CustomerId,
	pub profile_photo: String,
	pub aadhaar: String,
	pub pan: String,
	pub created_at: Time,
}

impl NewKycDocument {
	fn fields(&self) -> Fields {
		Fields::new()
			.with("documentId", Value::integer(self.document_id))
			.with("customerId", Value::integer(self.customer_id))
			.with("docType", Value::str(DOC_TYPE_PERSONAL))
			.with("profilePhoto", Value::str(&self.profile_photo))
			.with("aadhaar", Value::str(&self.aadhaar))
			.with("pan", Value::str(&self.pan))
			.with("isDelete", Value::boolean(false))
			.with("createdAt", Value::timestamp(self.created_at))
	}
}

pub struct Repo {
	store: StoreHandle,
}

impl Repo {
	pub fn new(store: StoreHandle) -> Repo {
		Repo { store }
	}

	pub async fn create(&self, new_doc: NewKycDocument) -> store::Result<KycDocument> {
		let doc = self.store.insert(COLLECTION, new_doc.fields()).await?;
		KycDocument::from_document(&doc)
	}

	/// The customer's "personal" document, fetched by a composite query.
	pub async fn personal_for(&self, customer_id: CustomerId) -> store::Result<KycDocument> {
		let query = Query::collection(COLLECTION)
			.field_eq("customerId", Value::integer(customer_id))
			.field_eq("docType", Value::str(DOC_TYPE_PERSONAL));
		let doc = self
			.store
			.run_query(query)
			.await?
			.into_iter()
			.next()
			.ok_or(store::Error::RecordNotFound)?;
		KycDocument::from_document(&doc)
	}

	/// Profile photo URL for the admin review list. Scans the collection and
	/// filters client-side, the way the review page fetches it per row.
	pub async fn profile_photo(&self, customer_id: CustomerId) -> store::Result<String> {
		let docs = self.store.list(COLLECTION).await?;
		for doc in &docs {
			let matches = doc.fields.int("customerId") == Ok(customer_id)
				&& doc.fields.str("docType") == Ok(DOC_TYPE_PERSONAL);
			if matches {
				return Ok(doc.fields.str("profilePhoto")?.to_string());
			}
		}
		Err(store::Error::RecordNotFound)
	}
}
