use strum_macros::{Display, EnumString};

use crate::store::{self, Fields, StoreHandle, Value};
use crate::types::{CustomerId, Money, Time};

const COLLECTION: &str = "loan";

pub const MIN_LOAN_AMOUNT: Money = 100_000;
pub const MAX_LOAN_AMOUNT: Money = 50_000_000;

/// Tenures offered on the application form, in years.
pub const TENURE_YEARS: [u32; 5] = [1, 2, 3, 5, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum LoanType {
	#[strum(serialize = "House Loan")]
	House,
	#[strum(serialize = "Gold Loan")]
	Gold,
	#[strum(serialize = "Automobile Loan")]
	Automobile,
	#[strum(serialize = "Personal Loan")]
	Personal,
	#[strum(serialize = "Agricultural Loan")]
	Agricultural,
}

impl LoanType {
	/// Fixed annual interest rate, percent.
	pub fn annual_rate(&self) -> f64 {
		match self {
			LoanType::House => 9.5,
			LoanType::Gold => 8.25,
			LoanType::Automobile => 9.9,
			LoanType::Personal => 12.0,
			LoanType::Agricultural => 8.5,
		}
	}
}

/// Standard amortization formula, rounded to two decimals:
/// `P * r * (1 + r)^n / ((1 + r)^n - 1)` with a monthly rate `r` and
/// `n` monthly installments.
pub fn monthly_emi(principal: Money, annual_rate: f64, tenure_years: u32) -> f64 {
	let monthly_rate = annual_rate / 12.0 / 100.0;
	let installments = (tenure_years * 12) as f64;
	let growth = (1.0 + monthly_rate).powf(installments);
	let emi = principal as f64 * monthly_rate * growth / (growth - 1.0);
	(emi * 100.0).round() / 100.0
}

pub struct NewLoanApplication {
	pub customer_id: CustomerId,
	pub loan_type: LoanType,
	pub loan_amount: Money,
	pub tenure_years: u32,
	pub emi: f64,
	pub document: String,
	pub created_at: Time,
}

impl NewLoanApplication {
	fn fields(&self) -> Fields {
		Fields::new()
			.with("customerId", Value::integer(self.customer_id))
			.with("loanType", Value::str(self.loan_type.to_string()))
			.with("loanAmount", Value::integer(self.loan_amount))
			.with("tenure", Value::integer(self.tenure_years as i64))
			// The form stored the computed installment as display text.
			.with("emi", Value::str(format!("{:.2}", self.emi)))
			.with("document", Value::str(&self.document))
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

	/// Applications are appended and never read back from this side.
	pub async fn create(&self, application: NewLoanApplication) -> store::Result<()> {
		self.store.insert(COLLECTION, application.fields()).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::str::FromStr;

	use super::*;

	#[test]
	fn loan_type_names_and_rates() {
		let cases = [
			(LoanType::House, "House Loan", 9.5),
			(LoanType::Gold, "Gold Loan", 8.25),
			(LoanType::Automobile, "Automobile Loan", 9.9),
			(LoanType::Personal, "Personal Loan", 12.0),
			(LoanType::Agricultural, "Agricultural Loan", 8.5),
		];
		for (loan_type, name, rate) in cases {
			assert_eq!(loan_type.to_string(), name);
			assert_eq!(LoanType::from_str(name).unwrap(), loan_type);
			assert_eq!(loan_type.annual_rate(), rate);
		}
	}

	#[test]
	fn emi_matches_amortization_formula() {
		assert_eq!(monthly_emi(1_200_000, 9.5, 10), 15_527.71);
		assert_eq!(monthly_emi(100_000, 12.0, 1), 8_884.88);
		assert_eq!(monthly_emi(500_000, 8.25, 5), 10_198.13);
	}

	#[test]
	fn emi_grows_with_rate_and_shrinks_with_tenure() {
		let base = monthly_emi(1_000_000, 9.5, 5);
		assert!(monthly_emi(1_000_000, 12.0, 5) > base);
		assert!(monthly_emi(1_000_000, 9.5, 10) < base);
	}
}
