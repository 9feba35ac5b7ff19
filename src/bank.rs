pub mod error;
mod service;

pub use error::{Error, ErrorKind};
pub use service::{
	BankService, Calendar, LoanForm, NewBankService, PendingCustomer, SignUpForm, SignUpReceipt,
	SystemCalendar, TransferForm,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Routing code of this institution. Every transfer's sender side must carry
/// it, and it is recorded as the sender routing code on the transaction.
pub const HOME_IFSC_CODE: &str = "Pradeep0001";

/// The one email the review console signs in with.
pub const ADMIN_EMAIL: &str = "pradeepbtech2003@gmail.com";
