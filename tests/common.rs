use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::TimeZone;

use bank_client::account::{self, Account, AccountType, NewAccount};
use bank_client::bank::{BankService, Calendar, NewBankService, SignUpForm};
use bank_client::counter::{Allocator, Sequence};
use bank_client::customer::{self, Customer, NewCustomer};
use bank_client::identity::{self, IdentityProvider};
use bank_client::kyc;
use bank_client::loan;
use bank_client::storage::{self, FileStore, Upload};
use bank_client::store::{self, Document, DocumentStore, Fields, Query, StoreHandle, Value};
use bank_client::transaction;
use bank_client::types::{AccountNumber, CustomerId, Date, Money, Time};

pub struct TestCustomers {}

impl<'a> TestCustomers {
	pub const email_bob: &'a str = "bob@gmail.com";
	pub const email_lucy: &'a str = "lucy@gmail.com";
	pub const password: &'a str = "secret@1";
}

/// In-memory document store. Each operation yields once before touching the
/// shared state, so interleavings under `tokio::join!` are deterministic.
pub struct MemStore {
	inner: Mutex<Inner>,
}

struct Inner {
	collections: HashMap<String, Vec<Document>>,
	next_id: u64,
}

impl MemStore {
	pub fn new() -> MemStore {
		MemStore {
			inner: Mutex::new(Inner {
				collections: HashMap::new(),
				next_id: 1,
			}),
		}
	}

	fn doc_name(collection: &str, doc_id: &str) -> String {
		format!(
			"projects/test/databases/(default)/documents/{}/{}",
			collection, doc_id
		)
	}
}

#[async_trait]
impl DocumentStore for MemStore {
	async fn get(&self, path: &str) -> store::Result<Document> {
		tokio::task::yield_now().await;
		let (collection, doc_id) = path
			.rsplit_once('/')
			.ok_or(store::Error::RecordNotFound)?;
		let inner = self.inner.lock().unwrap();
		inner
			.collections
			.get(collection)
			.and_then(|docs| docs.iter().find(|d| d.doc_id() == doc_id))
			.cloned()
			.ok_or(store::Error::RecordNotFound)
	}

	async fn list(&self, collection: &str) -> store::Result<Vec<Document>> {
		tokio::task::yield_now().await;
		let inner = self.inner.lock().unwrap();
		Ok(inner.collections.get(collection).cloned().unwrap_or_default())
	}

	async fn run_query(&self, query: Query) -> store::Result<Vec<Document>> {
		tokio::task::yield_now().await;
		let inner = self.inner.lock().unwrap();
		let docs = inner
			.collections
			.get(query.collection_id())
			.cloned()
			.unwrap_or_default();
		Ok(docs
			.into_iter()
			.filter(|doc| {
				query
					.filters()
					.iter()
					.all(|(path, value)| doc.fields.get(path) == Some(value))
			})
			.collect())
	}

	async fn insert(&self, collection: &str, fields: Fields) -> store::Result<Document> {
		tokio::task::yield_now().await;
		let mut inner = self.inner.lock().unwrap();
		let doc_id = format!("doc{}", inner.next_id);
		inner.next_id += 1;
		let doc = Document {
			name: MemStore::doc_name(collection, &doc_id),
			fields,
		};
		inner
			.collections
			.entry(collection.to_string())
			.or_default()
			.push(doc.clone());
		Ok(doc)
	}

	async fn patch(
		&self,
		collection: &str,
		doc_id: &str,
		fields: Fields,
		mask: &[&str],
	) -> store::Result<Document> {
		tokio::task::yield_now().await;
		let mut inner = self.inner.lock().unwrap();
		let docs = inner.collections.entry(collection.to_string()).or_default();
		if let Some(doc) = docs.iter_mut().find(|d| d.doc_id() == doc_id) {
			if mask.is_empty() {
				doc.fields = fields;
			} else {
				for path in mask {
					if let Some(value) = fields.get(path) {
						doc.fields.insert(*path, value.clone());
					}
				}
			}
			return Ok(doc.clone());
		}
		// A patch against a missing document creates it.
		let doc = Document {
			name: MemStore::doc_name(collection, doc_id),
			fields,
		};
		docs.push(doc.clone());
		Ok(doc)
	}
}

/// Email/password registry standing in for the identity endpoint.
pub struct FakeIdentity {
	passwords: Mutex<HashMap<String, String>>,
	reset_emails: Mutex<Vec<String>>,
}

impl FakeIdentity {
	pub fn new() -> FakeIdentity {
		FakeIdentity {
			passwords: Mutex::new(HashMap::new()),
			reset_emails: Mutex::new(Vec::new()),
		}
	}

	pub fn set_password(&self, email: &str, password: &str) {
		self.passwords
			.lock()
			.unwrap()
			.insert(email.to_string(), password.to_string());
	}

	pub fn has_credential(&self, email: &str) -> bool {
		self.passwords.lock().unwrap().contains_key(email)
	}

	pub fn reset_emails(&self) -> Vec<String> {
		self.reset_emails.lock().unwrap().clone()
	}
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
	async fn sign_up(&self, email: &str, password: &str) -> identity::Result<()> {
		let mut passwords = self.passwords.lock().unwrap();
		if passwords.contains_key(email) {
			return Err(identity::Error::Rejected("EMAIL_EXISTS".to_string()));
		}
		passwords.insert(email.to_string(), password.to_string());
		Ok(())
	}

	async fn sign_in(&self, email: &str, password: &str) -> identity::Result<String> {
		let passwords = self.passwords.lock().unwrap();
		match passwords.get(email) {
			None => Err(identity::Error::Rejected("EMAIL_NOT_FOUND".to_string())),
			Some(stored) if stored != password => {
				Err(identity::Error::Rejected("INVALID_PASSWORD".to_string()))
			}
			Some(_) => Ok("test-token".to_string()),
		}
	}

	async fn send_password_reset(&self, email: &str) -> identity::Result<()> {
		self.reset_emails.lock().unwrap().push(email.to_string());
		Ok(())
	}
}

/// Records uploads and hands back a predictable URL per path.
pub struct MemFiles {
	uploads: Mutex<Vec<String>>,
}

impl MemFiles {
	pub fn new() -> MemFiles {
		MemFiles {
			uploads: Mutex::new(Vec::new()),
		}
	}

	pub fn uploaded(&self) -> Vec<String> {
		self.uploads.lock().unwrap().clone()
	}
}

#[async_trait]
impl FileStore for MemFiles {
	async fn upload(&self, path: &str, _data: Vec<u8>) -> storage::Result<String> {
		self.uploads.lock().unwrap().push(path.to_string());
		Ok(format!("https://files.test/{}", path))
	}
}

/// Calendar pinned to a fixed instant.
pub struct FixedCalendar;

impl FixedCalendar {
	pub fn today() -> Date {
		Date::from_ymd_opt(2024, 5, 15).unwrap()
	}

	pub fn now() -> Time {
		chrono::Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
	}
}

impl Calendar for FixedCalendar {
	fn current_date(&self) -> Date {
		FixedCalendar::today()
	}

	fn current_time(&self) -> Time {
		FixedCalendar::now()
	}
}

pub struct Suite {
	pub store: StoreHandle,
	pub customer_repo: customer::Repo,
	pub kyc_repo: kyc::Repo,
	pub account_repo: account::Repo,
	pub transaction_repo: transaction::Repo,
	pub loan_repo: loan::Repo,
	pub allocator: Allocator,
	pub identity: FakeIdentity,
	pub files: MemFiles,
	pub calendar: FixedCalendar,
}

impl Suite {
	pub async fn setup() -> Suite {
		let store: StoreHandle = Arc::new(MemStore::new());
		seed_counters(&store).await;

		Suite {
			customer_repo: customer::Repo::new(store.clone()),
			kyc_repo: kyc::Repo::new(store.clone()),
			account_repo: account::Repo::new(store.clone()),
			transaction_repo: transaction::Repo::new(store.clone()),
			loan_repo: loan::Repo::new(store.clone()),
			allocator: Allocator::new(store.clone()),
			identity: FakeIdentity::new(),
			files: MemFiles::new(),
			calendar: FixedCalendar,
			store,
		}
	}

	pub fn bank_service(&self) -> BankService {
		BankService::new(NewBankService {
			customer_repo: &self.customer_repo,
			kyc_repo: &self.kyc_repo,
			account_repo: &self.account_repo,
			transaction_repo: &self.transaction_repo,
			loan_repo: &self.loan_repo,
			allocator: &self.allocator,
			identity: &self.identity,
			files: &self.files,
			calendar: &self.calendar,
		})
	}

	/// Insert an already-approved customer with a working credential.
	pub async fn insert_approved_customer(&self, customer_id: CustomerId, email: &str) -> Customer {
		let customer = self
			.customer_repo
			.create(NewCustomer {
				customer_id,
				name: "Test Customer".to_string(),
				email: email.to_string(),
				phone: "9876543210".to_string(),
				dob: "1990-06-15".to_string(),
				age: 33,
				created_at: FixedCalendar::now(),
			})
			.await
			.unwrap();
		self.customer_repo.approve(customer_id).await.unwrap();
		self.identity.set_password(email, TestCustomers::password);
		self.customer_repo.find(customer.customer_id).await.unwrap()
	}

	/// Insert a pending (unapproved) customer.
	pub async fn insert_pending_customer(&self, customer_id: CustomerId, email: &str) -> Customer {
		self.customer_repo
			.create(NewCustomer {
				customer_id,
				name: "Pending Customer".to_string(),
				email: email.to_string(),
				phone: "9876543210".to_string(),
				dob: "1990-06-15".to_string(),
				age: 33,
				created_at: FixedCalendar::now(),
			})
			.await
			.unwrap()
	}

	pub async fn insert_account(
		&self,
		customer_id: CustomerId,
		account_number: AccountNumber,
		account_type: AccountType,
		amount: Money,
	) -> Account {
		self.account_repo
			.create(NewAccount {
				account_number,
				customer_id,
				account_type,
				amount,
				created_at: FixedCalendar::now(),
			})
			.await
			.unwrap()
	}

	/// Flip an account's block flag through the public patch API.
	pub async fn block_account(&self, account_number: AccountNumber) {
		let query =
			Query::collection("account").field_eq("accountNumber", Value::integer(account_number));
		let doc = self
			.store
			.run_query(query)
			.await
			.unwrap()
			.into_iter()
			.next()
			.unwrap();
		let fields = Fields::new().with("isBlock", Value::boolean(true));
		self.store
			.patch("account", doc.doc_id(), fields, &["isBlock"])
			.await
			.unwrap();
	}
}

async fn seed_counters(store: &StoreHandle) {
	let sequences = [
		Sequence::Customer,
		Sequence::KycDocument,
		Sequence::AccountNumber,
		Sequence::TransactionId,
	];
	for sequence in sequences {
		let fields = Fields::new().with(sequence.field(), Value::integer(0));
		store
			.patch("counters", sequence.document(), fields, &[])
			.await
			.unwrap();
	}
}

/// A complete, valid registration form; tests override single fields.
pub fn sign_up_form() -> SignUpForm {
	SignUpForm {
		name: "Bob Roberts".to_string(),
		email: TestCustomers::email_bob.to_string(),
		phone: "9876543210".to_string(),
		dob: Date::from_ymd_opt(1990, 6, 15).unwrap(),
		deposit: 150_000,
		password: TestCustomers::password.to_string(),
		confirm_password: TestCustomers::password.to_string(),
		account_type: AccountType::Savings,
		profile_photo: Some(Upload::new("photo.png", vec![1])),
		aadhaar: Some(Upload::new("aadhaar.pdf", vec![2])),
		pan: Some(Upload::new("pan.pdf", vec![3])),
	}
}
