use chrono::{DateTime, Datelike, NaiveDate, Utc};

pub type CustomerId = i64;
pub type AccountNumber = i64;
pub type DocumentId = i64;
pub type TransactionId = i64;

/// Balances and transfer amounts are whole-rupee units.
pub type Money = i64;

pub type Time = DateTime<Utc>;
pub type Date = NaiveDate;

pub trait DateExt {
	fn age_on(&self, today: Date) -> i64;
}

impl DateExt for Date {
	/// Completed years between this date of birth and `today`.
	fn age_on(&self, today: Date) -> i64 {
		let mut age = (today.year() - self.year()) as i64;
		if (today.month(), today.day()) < (self.month(), self.day()) {
			age -= 1;
		}
		age
	}
}
