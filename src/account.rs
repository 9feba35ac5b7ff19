use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::store::{self, Document, Fields, Query, StoreHandle, Value};
use crate::types::{AccountNumber, CustomerId, Money, Time};

const COLLECTION: &str = "account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum AccountType {
	Savings,
	Current,
	#[strum(serialize = "PPF")]
	Ppf,
	#[strum(serialize = "FD")]
	Fd,
	#[strum(serialize = "RD")]
	Rd,
	Loan,
}

impl AccountType {
	/// Only demand-deposit accounts can originate a transfer.
	pub fn can_send(&self) -> bool {
		matches!(self, AccountType::Savings | AccountType::Current)
	}

	/// Minimum balance required to open an account of this type. `None`
	/// means the type cannot be opened from the account page.
	pub fn minimum_opening_balance(&self) -> Option<Money> {
		match self {
			AccountType::Savings | AccountType::Current => Some(100_000),
			AccountType::Ppf | AccountType::Fd | AccountType::Rd => Some(1_000),
			AccountType::Loan => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
	pub account_number: AccountNumber,
	pub customer_id: CustomerId,
	pub account_type: AccountType,
	pub amount: Money,
	pub is_block: bool,
	pub is_delete: bool,
}

impl Account {
	pub fn from_document(doc: &Document) -> store::Result<Account> {
		let type_name = doc.fields.str("accountType")?;
		let account_type = AccountType::from_str(type_name)
			.map_err(|_| store::Error::Decode(format!("unknown account type '{}'", type_name)))?;
		Ok(Account {
			account_number: doc.fields.int("accountNumber")?,
			customer_id: doc.fields.int("customerId")?,
			account_type,
			amount: doc.fields.int("Amount")?,
			is_block: doc.fields.boolean("isBlock")?,
			is_delete: doc.fields.boolean("isDelete")?,
		})
	}
}

pub struct NewAccount {
	pub account_number: AccountNumber,
	pub customer_id: CustomerId,
	pub account_type: AccountType,
	pub amount: Money,
	pub created_at: Time,
}

impl NewAccount {
	fn fields(&self) -> Fields {
		Fields::new()
			.with("accountNumber", Value::integer(self.account_number))
			.with("customerId", Value::integer(self.customer_id))
			.with("accountType", Value::str(self.account_type.to_string()))
			// The balance field is capitalized in the stored records.
			.with("Amount", Value::integer(self.amount))
			.with("isBlock", Value::boolean(false))
			.with("isDelete", Value::boolean(false))
			.with("createdAt", Value::timestamp(self.created_at))
	}
}

/// Data store operations on the account collection.
pub struct Repo {
	store: StoreHandle,
}

impl Repo {
	pub fn new(store: StoreHandle) -> Repo {
		Repo { store }
	}

	pub async fn create(&self, new_account: NewAccount) -> store::Result<Account> {
		let doc = self.store.insert(COLLECTION, new_account.fields()).await?;
		Account::from_document(&doc)
	}

	/// Non-deleted accounts owned by a customer (the dashboard listing).
	pub async fn active_for_customer(&self, customer_id: CustomerId) -> store::Result<Vec<Account>> {
		let query = Query::collection(COLLECTION)
			.field_eq("customerId", Value::integer(customer_id))
			.field_eq("isDelete", Value::boolean(false));
		let docs = self.store.run_query(query).await?;
		docs.iter().map(Account::from_document).collect()
	}

	/// Sender-side lookup: the account must belong to the session's customer
	/// and not be soft-deleted. Blocked/type/balance checks happen above.
	pub async fn find_sender(
		&self,
		customer_id: CustomerId,
		account_number: AccountNumber,
	) -> store::Result<Account> {
		let query = Query::collection(COLLECTION)
			.field_eq("customerId", Value::integer(customer_id))
			.field_eq("accountNumber", Value::integer(account_number))
			.field_eq("isDelete", Value::boolean(false));
		self.first(query).await
	}

	/// Receiver-side lookup: any non-deleted account with this number.
	pub async fn find_active(&self, account_number: AccountNumber) -> store::Result<Account> {
		let query = Query::collection(COLLECTION)
			.field_eq("accountNumber", Value::integer(account_number))
			.field_eq("isDelete", Value::boolean(false));
		self.first(query).await
	}

	/// Unconditional lookup by number; the transfer flow re-reads both sides
	/// through this before computing balances.
	pub async fn find_by_number(&self, account_number: AccountNumber) -> store::Result<Account> {
		let doc = self.find_document(account_number).await?;
		Account::from_document(&doc)
	}

	/// Deletion candidate: number and type must both match, and blocked or
	/// already-deleted accounts are excluded by the query itself. Not scoped
	/// to the requesting customer.
	pub async fn find_for_deletion(
		&self,
		account_number: AccountNumber,
		account_type: AccountType,
	) -> store::Result<Account> {
		let query = Query::collection(COLLECTION)
			.field_eq("accountNumber", Value::integer(account_number))
			.field_eq("accountType", Value::str(account_type.to_string()))
			.field_eq("isBlock", Value::boolean(false))
			.field_eq("isDelete", Value::boolean(false));
		self.first(query).await
	}

	/// Overwrite the balance field. Resolves the document id by number first,
	/// then patches `Amount` alone under an update mask.
	pub async fn set_amount(
		&self,
		account_number: AccountNumber,
		amount: Money,
	) -> store::Result<()> {
		let doc_id = self.doc_id(account_number).await?;
		let fields = Fields::new().with("Amount", Value::integer(amount));
		self.store
			.patch(COLLECTION, &doc_id, fields, &["Amount"])
			.await?;
		Ok(())
	}

	pub async fn mark_deleted(&self, account_number: AccountNumber) -> store::Result<()> {
		let doc_id = self.doc_id(account_number).await?;
		let fields = Fields::new().with("isDelete", Value::boolean(true));
		self.store
			.patch(COLLECTION, &doc_id, fields, &["isDelete"])
			.await?;
		Ok(())
	}

	/// Soft-delete every account a customer owns, one patch per document in
	/// sequence. A failure partway through leaves earlier patches in place.
	pub async fn mark_deleted_by_customer(&self, customer_id: CustomerId) -> store::Result<usize> {
		let query = Query::collection(COLLECTION).field_eq("customerId", Value::integer(customer_id));
		let docs = self.store.run_query(query).await?;
		let mut deleted = 0;
		for doc in &docs {
			let fields = Fields::new().with("isDelete", Value::boolean(true));
			self.store
				.patch(COLLECTION, doc.doc_id(), fields, &["isDelete"])
				.await?;
			deleted += 1;
		}
		Ok(deleted)
	}

	async fn doc_id(&self, account_number: AccountNumber) -> store::Result<String> {
		let doc = self.find_document(account_number).await?;
		Ok(doc.doc_id().to_string())
	}

	async fn find_document(&self, account_number: AccountNumber) -> store::Result<Document> {
		let query =
			Query::collection(COLLECTION).field_eq("accountNumber", Value::integer(account_number));
		self.store
			.run_query(query)
			.await?
			.into_iter()
			.next()
			.ok_or(store::Error::RecordNotFound)
	}

	async fn first(&self, query: Query) -> store::Result<Account> {
		let doc = self
			.store
			.run_query(query)
			.await?
			.into_iter()
			.next()
			.ok_or(store::Error::RecordNotFound)?;
		Account::from_document(&doc)
	}
}
