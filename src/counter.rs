use crate::store::{self, Fields, StoreHandle, Value};

/// Collection the counter documents live in.
const COLLECTION: &str = "counters";

/// The named sequences human-facing identifiers are minted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
	Customer,
	KycDocument,
	AccountNumber,
	TransactionId,
}

impl Sequence {
	/// Counter document holding the sequence.
	pub fn document(&self) -> &'static str {
		match self {
			Sequence::Customer => "customerCounter",
			Sequence::KycDocument => "documentCounter",
			Sequence::AccountNumber => "accountNumberCounter",
			Sequence::TransactionId => "transactionIdCounter",
		}
	}

	/// The single integer field inside that document.
	pub fn field(&self) -> &'static str {
		match self {
			Sequence::Customer => "lastCustomerId",
			Sequence::KycDocument => "lastDocumentId",
			Sequence::AccountNumber => "lastAccountNumber",
			Sequence::TransactionId => "lastTransactionId",
		}
	}
}

/// Mints monotonically increasing identifiers from the counter documents.
///
/// Allocation is a plain read-modify-write with no precondition: two callers
/// that read the same current value will both write and return the same next
/// value. Sequential callers get strictly increasing ids with no gaps;
/// concurrent callers can collide. Known data-layer limitation, kept as-is.
pub struct Allocator {
	store: StoreHandle,
}

impl Allocator {
	pub fn new(store: StoreHandle) -> Allocator {
		Allocator { store }
	}

	pub async fn allocate(&self, sequence: Sequence) -> store::Result<i64> {
		let path = format!("{}/{}", COLLECTION, sequence.document());
		let doc = self.store.get(&path).await?;
		let current = doc.fields.int(sequence.field())?;
		let next = current + 1;

		// Full overwrite of the field, no update mask and no currentDocument
		// precondition, matching the hosted counter documents' shape.
		let fields = Fields::new().with(sequence.field(), Value::integer(next));
		self.store
			.patch(COLLECTION, sequence.document(), fields, &[])
			.await?;

		Ok(next)
	}
}
