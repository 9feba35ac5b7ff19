use crate::store::{self, Document, Fields, StoreHandle, Value};
use crate::types::{AccountNumber, Money, Time, TransactionId};

const COLLECTION: &str = "transactions";

/// A completed transfer, recorded after both balances have been written.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
	pub transaction_id: TransactionId,
	pub sender_account_number: AccountNumber,
	pub receiver_account_number: AccountNumber,
	pub sender_ifsc_code: String,
	pub receiver_ifsc_code: String,
	pub amount: Money,
	pub transaction_date: Time,
}

impl Transaction {
	pub fn from_document(doc: &Document) -> store::Result<Transaction> {
		Ok(Transaction {
			transaction_id: doc.fields.int("transactionId")?,
			sender_account_number: doc.fields.int("senderAccountNumber")?,
			receiver_account_number: doc.fields.int("receiverAccountNumber")?,
			sender_ifsc_code: doc.fields.str("senderIfscCode")?.to_string(),
			receiver_ifsc_code: doc.fields.str("receiverIfscCode")?.to_string(),
			amount: doc.fields.int("amount")?,
			transaction_date: doc.fields.time("transactionDate")?,
		})
	}
}

pub struct NewTransaction {
	pub transaction_id: TransactionId,
	pub sender_account_number: AccountNumber,
	pub receiver_account_number: AccountNumber,
	pub sender_ifsc_code: String,
	pub receiver_ifsc_code: String,
	pub amount: Money,
	pub transaction_date: Time,
}

impl NewTransaction {
	fn fields(&self) -> Fields {
		Fields::new()
			.with("transactionId", Value::integer(self.transaction_id))
			.with("senderAccountNumber", Value::integer(self.sender_account_number))
			.with("receiverAccountNumber", Value::integer(self.receiver_account_number))
			.with("senderIfscCode", Value::str(&self.sender_ifsc_code))
			.with("receiverIfscCode", Value::str(&self.receiver_ifsc_code))
			.with("amount", Value::integer(self.amount))
			.with("transactionDate", Value::timestamp(self.transaction_date))
	}
}

pub struct Repo {
	store: StoreHandle,
}

impl Repo {
	pub fn new(store: StoreHandle) -> Repo {
		Repo { store }
	}

	pub async fn create(&self, new_transaction: NewTransaction) -> store::Result<Transaction> {
		let doc = self.store.insert(COLLECTION, new_transaction.fields()).await?;
		Transaction::from_document(&doc)
	}
}
