use crate::store::{self, Document, Fields, Query, StoreHandle, Value};
use crate::types::{CustomerId, Time};

const COLLECTION: &str = "customer";

/// A customer record. `dob` keeps the form's `YYYY-MM-DD` string, `age` the
/// value computed at sign-up; both are stored verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
	pub customer_id: CustomerId,
	pub name: String,
	pub email: String,
	pub phone: String,
	pub dob: String,
	pub age: i64,
	pub is_approve: bool,
	pub is_hold: bool,
	pub is_block: bool,
	pub is_delete: bool,
}

impl Customer {
	pub fn from_document(doc: &Document) -> store::Result<Customer> {
		Ok(Customer {
			customer_id: doc.fields.int("customerId")?,
			name: doc.fields.str("name")?.to_string(),
			email: doc.fields.str("email")?.to_string(),
			phone: doc.fields.str("phone")?.to_string(),
			dob: doc.fields.str("dob")?.to_string(),
			age: doc.fields.int("age")?,
			is_approve: doc.fields.boolean("isApprove")?,
			is_hold: doc.fields.boolean("isHold")?,
			is_block: doc.fields.boolean("isBlock")?,
			is_delete: doc.fields.boolean("isDelete")?,
		})
	}
}

pub struct NewCustomer {
	pub customer_id: CustomerId,
	pub name: String,
	pub email: String,
	pub phone: String,
	pub dob: String,
	pub age: i64,
	pub created_at: Time,
}

impl NewCustomer {
	fn fields(&self) -> Fields {
		Fields::new()
			.with("customerId", Value::integer(self.customer_id))
			.with("name", Value::str(&self.name))
			.with("email", Value::str(&self.email))
			.with("phone", Value::str(&self.phone))
			.with("dob", Value::str(&self.dob))
			.with("age", Value::integer(self.age))
			.with("isApprove", Value::boolean(false))
			.with("isHold", Value::boolean(false))
			.with("isBlock", Value::boolean(false))
			.with("isDelete", Value::boolean(false))
			.with("createdAt", Value::timestamp(self.created_at))
	}
}

/// Data store operations on the customer collection.
pub struct Repo {
	store: StoreHandle,
}

impl Repo {
	pub fn new(store: StoreHandle) -> Repo {
		Repo { store }
	}

	pub async fn create(&self, new_customer: NewCustomer) -> store::Result<Customer> {
		let doc = self.store.insert(COLLECTION, new_customer.fields()).await?;
		Customer::from_document(&doc)
	}

	pub async fn find(&self, customer_id: CustomerId) -> store::Result<Customer> {
		let doc = self.find_document(customer_id).await?;
		Customer::from_document(&doc)
	}

	/// Customers awaiting review: not yet approved and not soft-deleted.
	/// The admin page scans the whole collection and filters client-side.
	pub async fn pending(&self) -> store::Result<Vec<Customer>> {
		let docs = self.store.list(COLLECTION).await?;
		let mut pending = Vec::new();
		for doc in &docs {
			let customer = Customer::from_document(doc)?;
			if !customer.is_delete && !customer.is_approve {
				pending.push(customer);
			}
		}
		Ok(pending)
	}

	pub async fn approve(&self, customer_id: CustomerId) -> store::Result<()> {
		let doc_id = self.doc_id(customer_id).await?;
		let fields = Fields::new()
			.with("isApprove", Value::boolean(true))
			.with("isHold", Value::boolean(false));
		self.store
			.patch(COLLECTION, &doc_id, fields, &["isApprove", "isHold"])
			.await?;
		Ok(())
	}

	pub async fn hold(&self, customer_id: CustomerId) -> store::Result<()> {
		let doc_id = self.doc_id(customer_id).await?;
		let fields = Fields::new().with("isHold", Value::boolean(true));
		self.store
			.patch(COLLECTION, &doc_id, fields, &["isHold"])
			.await?;
		Ok(())
	}

	pub async fn mark_deleted(&self, customer_id: CustomerId) -> store::Result<()> {
		let doc_id = self.doc_id(customer_id).await?;
		let fields = Fields::new().with("isDelete", Value::boolean(true));
		self.store
			.patch(COLLECTION, &doc_id, fields, &["isDelete"])
			.await?;
		Ok(())
	}

	/// Store document id for a customer, resolved by a fresh query each time
	/// a patch needs it.
	async fn doc_id(&self, customer_id: CustomerId) -> store::Result<String> {
		let doc = self.find_document(customer_id).await?;
		Ok(doc.doc_id().to_string())
	}

	async fn find_document(&self, customer_id: CustomerId) -> store::Result<Document> {
		let query = Query::collection(COLLECTION).field_eq("customerId", Value::integer(customer_id));
		self.store
			.run_query(query)
			.await?
			.into_iter()
			.next()
			.ok_or(store::Error::RecordNotFound)
	}
}
