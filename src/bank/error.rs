use std::error;
use std::fmt;

use crate::account::AccountType;
use crate::types::AccountNumber;
use crate::{identity, storage, store};

/// An error that can occur while running a banking workflow.
#[derive(Debug, PartialEq)]
pub struct Error {
	kind: ErrorKind,
}

impl Error {
	pub fn new(kind: ErrorKind) -> Error {
		Error { kind }
	}

	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	pub(crate) fn validation(msg: impl Into<String>) -> Error {
		Error::new(ErrorKind::Validation(msg.into()))
	}
}

/// The kind of an error that can occur.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
	/// A form field failed a client-side check; the message is the alert text.
	Validation(String),
	NotSignedIn,
	CustomerNotFound,
	/// The customer exists but may not use the customer pages yet.
	CustomerIneligible(&'static str),
	AccountNotFound,
	AccountBlocked(AccountNumber),
	IneligibleAccountType(AccountType),
	InadequateFunds,
	RoutingMismatch,
	SameAccount,
	Auth(identity::Error),
	Upload(storage::Error),
	Store(store::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.kind {
			ErrorKind::Validation(msg) => write!(f, "{}", msg),
			ErrorKind::NotSignedIn => write!(f, "please login first"),
			ErrorKind::CustomerNotFound => write!(f, "invalid customer id"),
			ErrorKind::CustomerIneligible(reason) => write!(f, "{}", reason),
			ErrorKind::AccountNotFound => write!(f, "account does not exist"),
			ErrorKind::AccountBlocked(number) => write!(f, "account {} is blocked", number),
			ErrorKind::IneligibleAccountType(account_type) => {
				write!(f, "{} account cannot transfer funds", account_type)
			}
			ErrorKind::InadequateFunds => write!(f, "insufficient balance"),
			ErrorKind::RoutingMismatch => write!(f, "invalid IFSC code"),
			ErrorKind::SameAccount => {
				write!(f, "sender and receiver accounts must be different")
			}
			ErrorKind::Auth(e) => write!(f, "auth error: {}", e),
			ErrorKind::Upload(e) => write!(f, "upload error: {}", e),
			ErrorKind::Store(e) => write!(f, "store error: {}", e),
		}
	}
}

impl error::Error for Error {}

impl From<store::Error> for Error {
	fn from(e: store::Error) -> Self {
		Error::new(ErrorKind::Store(e))
	}
}

impl From<identity::Error> for Error {
	fn from(e: identity::Error) -> Self {
		Error::new(ErrorKind::Auth(e))
	}
}

impl From<storage::Error> for Error {
	fn from(e: storage::Error) -> Self {
		Error::new(ErrorKind::Upload(e))
	}
}
