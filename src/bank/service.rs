use crate::account::{self, Account, AccountType, NewAccount};
use crate::counter::{Allocator, Sequence};
use crate::customer::{self, Customer, NewCustomer};
use crate::identity::IdentityProvider;
use crate::kyc::{self, KycDocument, NewKycDocument};
use crate::loan::{self, LoanType, NewLoanApplication, MAX_LOAN_AMOUNT, MIN_LOAN_AMOUNT, TENURE_YEARS};
use crate::session::Session;
use crate::storage::{FileStore, Upload};
use crate::store;
use crate::transaction::{self, NewTransaction, Transaction};
use crate::types::{AccountNumber, CustomerId, Date, DateExt, Money, Time};

use super::error::{Error, ErrorKind};
use super::{Result, ADMIN_EMAIL, HOME_IFSC_CODE};

/// Service for performing banking workflows against the hosted backends.
pub struct BankService<'a> {
	customer_repo: &'a customer::Repo,
	kyc_repo: &'a kyc::Repo,
	account_repo: &'a account::Repo,
	transaction_repo: &'a transaction::Repo,
	loan_repo: &'a loan::Repo,
	allocator: &'a Allocator,
	identity: &'a dyn IdentityProvider,
	files: &'a dyn FileStore,
	calendar: &'a dyn Calendar,
}

/// Parameter object for creating a new BankService
pub struct NewBankService<'a> {
	pub customer_repo: &'a customer::Repo,
	pub kyc_repo: &'a kyc::Repo,
	pub account_repo: &'a account::Repo,
	pub transaction_repo: &'a transaction::Repo,
	pub loan_repo: &'a loan::Repo,
	pub allocator: &'a Allocator,
	pub identity: &'a dyn IdentityProvider,
	pub files: &'a dyn FileStore,
	pub calendar: &'a dyn Calendar,
}

/// A new customer's sign-up form, exactly the fields the registration page
/// collects. `dob` is the raw date input; age is derived at submission time.
pub struct SignUpForm {
	pub name: String,
	pub email: String,
	pub phone: String,
	pub dob: Date,
	pub deposit: Money,
	pub password: String,
	pub confirm_password: String,
	pub account_type: AccountType,
	pub profile_photo: Option<Upload>,
	pub aadhaar: Option<Upload>,
	pub pan: Option<Upload>,
}

/// Identifiers handed back after a successful sign-up. The customer id is the
/// future login credential.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpReceipt {
	pub customer_id: CustomerId,
	pub account_number: AccountNumber,
}

/// One row of the admin review list: the pending customer joined with their
/// profile photo URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCustomer {
	pub customer: Customer,
	pub profile_photo: String,
}

pub struct TransferForm {
	pub sender_account_number: AccountNumber,
	pub sender_ifsc_code: String,
	pub receiver_account_number: AccountNumber,
	pub receiver_ifsc_code: String,
	pub amount: Money,
}

pub struct LoanForm {
	pub loan_type: LoanType,
	pub amount: Money,
	pub tenure_years: u32,
	pub document: Option<Upload>,
}

impl<'a> BankService<'a> {
	pub fn new(n: NewBankService<'a>) -> Self {
		BankService {
			customer_repo: n.customer_repo,
			kyc_repo: n.kyc_repo,
			account_repo: n.account_repo,
			transaction_repo: n.transaction_repo,
			loan_repo: n.loan_repo,
			allocator: n.allocator,
			identity: n.identity,
			files: n.files,
			calendar: n.calendar,
		}
	}

	/// Register a new customer: validate the form, register the credential,
	/// mint ids, upload the KYC files, then insert the customer, KYC document
	/// and first account.
	pub async fn sign_up(&self, form: SignUpForm) -> Result<SignUpReceipt> {
		self.validate_sign_up(&form)?;
		let profile_photo = required_upload(&form.profile_photo, "profile photo")?;
		let aadhaar = required_upload(&form.aadhaar, "aadhaar card")?;
		let pan = required_upload(&form.pan, "pan card")?;

		self.identity.sign_up(&form.email, &form.password).await?;

		let customer_id = self.allocator.allocate(Sequence::Customer).await?;
		let document_id = self.allocator.allocate(Sequence::KycDocument).await?;
		let account_number = self.allocator.allocate(Sequence::AccountNumber).await?;

		let profile_photo_url = self.upload("profilePhoto", profile_photo).await?;
		let aadhaar_url = self.upload("aadhaar", aadhaar).await?;
		let pan_url = self.upload("pan", pan).await?;

		let now = self.calendar.current_time();
		let age = form.dob.age_on(self.calendar.current_date());

		self.customer_repo
			.create(NewCustomer {
				customer_id,
				name: form.name.clone(),
				email: form.email.clone(),
				phone: form.phone.clone(),
				dob: form.dob.format("%Y-%m-%d").to_string(),
				age,
				created_at: now,
			})
			.await?;

		self.kyc_repo
			.create(NewKycDocument {
				document_id,
				customer_id,
				profile_photo: profile_photo_url,
				aadhaar: aadhaar_url,
				pan: pan_url,
				created_at: now,
			})
			.await?;

		self.account_repo
			.create(NewAccount {
				account_number,
				customer_id,
				account_type: form.account_type,
				amount: form.deposit,
				created_at: now,
			})
			.await?;

		log::info!(
			"registered customer {} with account {}",
			customer_id,
			account_number
		);
		Ok(SignUpReceipt {
			customer_id,
			account_number,
		})
	}

	/// Customer login: the customer id is the username; the password is
	/// verified against the stored email.
	pub async fn sign_in(&self, customer_id: CustomerId, password: &str) -> Result<Session> {
		let customer = self.find_customer(customer_id).await?;
		self.identity.sign_in(&customer.email, password).await?;
		Ok(Session::Customer(customer.customer_id))
	}

	/// Admin login: one fixed email, verified like any other credential.
	pub async fn admin_sign_in(&self, email: &str, password: &str) -> Result<()> {
		if email != ADMIN_EMAIL {
			return Err(Error::validation("invalid admin email"));
		}
		self.identity.sign_in(email, password).await?;
		Ok(())
	}

	pub async fn reset_password(&self, email: &str) -> Result<()> {
		self.identity.send_password_reset(email).await?;
		Ok(())
	}

	/// Gate at the top of every customer page. Rejections follow a fixed
	/// precedence: deleted, then unapproved, then blocked.
	pub async fn authorize(&self, session: Session) -> Result<Customer> {
		let customer_id = self.require_customer(session)?;
		let customer = self.find_customer(customer_id).await?;
		if customer.is_delete {
			return Err(Error::new(ErrorKind::CustomerIneligible(
				"your account has been deleted",
			)));
		}
		if !customer.is_approve {
			return Err(Error::new(ErrorKind::CustomerIneligible(
				"your account is not approved yet",
			)));
		}
		if customer.is_block {
			return Err(Error::new(ErrorKind::CustomerIneligible(
				"your account is blocked",
			)));
		}
		Ok(customer)
	}

	/// The customer's open accounts.
	pub async fn accounts(&self, session: Session) -> Result<Vec<Account>> {
		let customer = self.authorize(session).await?;
		let accounts = self
			.account_repo
			.active_for_customer(customer.customer_id)
			.await?;
		Ok(accounts)
	}

	/// Open an additional account. Only a signed-in session is required; the
	/// account page does not re-check approval.
	pub async fn open_account(
		&self,
		session: Session,
		account_type: AccountType,
		amount: Money,
	) -> Result<AccountNumber> {
		let customer_id = self.require_customer(session)?;
		let minimum = account_type
			.minimum_opening_balance()
			.ok_or_else(|| Error::new(ErrorKind::IneligibleAccountType(account_type)))?;
		if amount < minimum {
			return Err(Error::validation(format!(
				"minimum deposit for a {} account is {}",
				account_type, minimum
			)));
		}

		let account_number = self.allocator.allocate(Sequence::AccountNumber).await?;
		self.account_repo
			.create(NewAccount {
				account_number,
				customer_id,
				account_type,
				amount,
				created_at: self.calendar.current_time(),
			})
			.await?;
		log::info!(
			"opened {} account {} for customer {}",
			account_type,
			account_number,
			customer_id
		);
		Ok(account_number)
	}

	/// Soft-delete an account. The lookup requires number and type to match
	/// and excludes blocked accounts, so those cannot be closed.
	pub async fn close_account(
		&self,
		session: Session,
		account_number: AccountNumber,
		account_type: AccountType,
	) -> Result<()> {
		self.require_customer(session)?;
		let account = self
			.account_repo
			.find_for_deletion(account_number, account_type)
			.await
			.map_err(account_lookup)?;
		self.account_repo.mark_deleted(account.account_number).await?;
		Ok(())
	}

	/// Customers awaiting review, each joined with their profile photo. A
	/// failed photo join logs and yields an empty URL; it never fails the
	/// listing.
	pub async fn pending_customers(&self) -> Result<Vec<PendingCustomer>> {
		let customers = self.customer_repo.pending().await?;
		let mut rows = Vec::with_capacity(customers.len());
		for customer in customers {
			let profile_photo = match self.kyc_repo.profile_photo(customer.customer_id).await {
				Ok(url) => url,
				Err(e) => {
					log::warn!(
						"no profile photo for customer {}: {}",
						customer.customer_id,
						e
					);
					String::new()
				}
			};
			rows.push(PendingCustomer {
				customer,
				profile_photo,
			});
		}
		Ok(rows)
	}

	/// The KYC record shown in the review dialog.
	pub async fn customer_documents(&self, customer_id: CustomerId) -> Result<KycDocument> {
		self.kyc_repo
			.personal_for(customer_id)
			.await
			.map_err(customer_lookup)
	}

	pub async fn approve(&self, customer_id: CustomerId) -> Result<()> {
		self.customer_repo
			.approve(customer_id)
			.await
			.map_err(customer_lookup)
	}

	pub async fn hold(&self, customer_id: CustomerId) -> Result<()> {
		self.customer_repo
			.hold(customer_id)
			.await
			.map_err(customer_lookup)
	}

	/// Reject a pending customer: mark them deleted, then soft-delete each of
	/// their accounts in sequence. A failure partway through is not rolled
	/// back.
	pub async fn reject(&self, customer_id: CustomerId) -> Result<()> {
		self.customer_repo
			.mark_deleted(customer_id)
			.await
			.map_err(customer_lookup)?;
		let deleted = self.account_repo.mark_deleted_by_customer(customer_id).await?;
		log::info!(
			"rejected customer {} and closed {} account(s)",
			customer_id,
			deleted
		);
		Ok(())
	}

	/// Transfer funds between two accounts.
	///
	/// The sender is always debited. The receiver is credited, unless it is a
	/// Loan account, in which case the transfer is a repayment and the
	/// receiver is debited too. The two balance writes are independent; a
	/// failure on either side is logged and the transfer still records a
	/// transaction.
	pub async fn transfer(&self, session: Session, form: TransferForm) -> Result<Transaction> {
		let customer_id = self.require_customer(session)?;
		if form.sender_account_number == form.receiver_account_number {
			return Err(Error::new(ErrorKind::SameAccount));
		}
		if form.amount <= 0 {
			return Err(Error::validation("transfer amount must be greater than zero"));
		}

		let sender = self
			.account_repo
			.find_sender(customer_id, form.sender_account_number)
			.await
			.map_err(account_lookup)?;
		if sender.is_block {
			return Err(Error::new(ErrorKind::AccountBlocked(sender.account_number)));
		}
		if !sender.account_type.can_send() {
			return Err(Error::new(ErrorKind::IneligibleAccountType(
				sender.account_type,
			)));
		}
		if sender.amount < form.amount {
			return Err(Error::new(ErrorKind::InadequateFunds));
		}
		if form.sender_ifsc_code != HOME_IFSC_CODE {
			return Err(Error::new(ErrorKind::RoutingMismatch));
		}

		let receiver = self
			.account_repo
			.find_active(form.receiver_account_number)
			.await
			.map_err(account_lookup)?;
		if receiver.is_block {
			return Err(Error::new(ErrorKind::AccountBlocked(
				receiver.account_number,
			)));
		}

		// Both sides are re-read before computing the new balances.
		let sender = self
			.account_repo
			.find_by_number(form.sender_account_number)
			.await?;
		let receiver = self
			.account_repo
			.find_by_number(form.receiver_account_number)
			.await?;

		let sender_balance = sender.amount - form.amount;
		let receiver_balance = if receiver.account_type == AccountType::Loan {
			receiver.amount - form.amount
		} else {
			receiver.amount + form.amount
		};

		if let Err(e) = self
			.account_repo
			.set_amount(sender.account_number, sender_balance)
			.await
		{
			log::error!(
				"failed to update balance of sender account {}: {}",
				sender.account_number,
				e
			);
		}
		if let Err(e) = self
			.account_repo
			.set_amount(receiver.account_number, receiver_balance)
			.await
		{
			log::error!(
				"failed to update balance of receiver account {}: {}",
				receiver.account_number,
				e
			);
		}

		let transaction_id = self.allocator.allocate(Sequence::TransactionId).await?;
		let transaction = self
			.transaction_repo
			.create(NewTransaction {
				transaction_id,
				sender_account_number: sender.account_number,
				receiver_account_number: receiver.account_number,
				sender_ifsc_code: HOME_IFSC_CODE.to_string(),
				// The receiver routing code is recorded as entered, unverified.
				receiver_ifsc_code: form.receiver_ifsc_code,
				amount: form.amount,
				transaction_date: self.calendar.current_time(),
			})
			.await?;
		log::info!(
			"transaction {}: {} sent {} to {}",
			transaction.transaction_id,
			transaction.sender_account_number,
			transaction.amount,
			transaction.receiver_account_number
		);
		Ok(transaction)
	}

	/// Submit a loan application; returns the monthly installment quoted to
	/// the customer.
	pub async fn apply_loan(&self, session: Session, form: LoanForm) -> Result<f64> {
		let customer_id = self.require_customer(session)?;
		if form.amount < MIN_LOAN_AMOUNT || form.amount > MAX_LOAN_AMOUNT {
			return Err(Error::validation(format!(
				"loan amount must be between {} and {}",
				MIN_LOAN_AMOUNT, MAX_LOAN_AMOUNT
			)));
		}
		if !TENURE_YEARS.contains(&form.tenure_years) {
			return Err(Error::validation("select a valid loan tenure"));
		}
		let document = form
			.document
			.as_ref()
			.ok_or_else(|| Error::validation("loan document is required"))?;

		let emi = loan::monthly_emi(form.amount, form.loan_type.annual_rate(), form.tenure_years);
		let document_url = self.upload("loanDocument", document).await?;

		self.loan_repo
			.create(NewLoanApplication {
				customer_id,
				loan_type: form.loan_type,
				loan_amount: form.amount,
				tenure_years: form.tenure_years,
				emi,
				document: document_url,
				created_at: self.calendar.current_time(),
			})
			.await?;
		Ok(emi)
	}

	fn require_customer(&self, session: Session) -> Result<CustomerId> {
		session
			.customer_id()
			.ok_or_else(|| Error::new(ErrorKind::NotSignedIn))
	}

	async fn find_customer(&self, customer_id: CustomerId) -> Result<Customer> {
		self.customer_repo
			.find(customer_id)
			.await
			.map_err(customer_lookup)
	}

	async fn upload(&self, kind: &str, upload: &Upload) -> Result<String> {
		let path = format!("uploads/{}/{}", kind, upload.file_name);
		let url = self.files.upload(&path, upload.data.clone()).await?;
		Ok(url)
	}

	fn validate_sign_up(&self, form: &SignUpForm) -> Result<()> {
		if !valid_name(&form.name) {
			return Err(Error::validation("name must contain only letters"));
		}
		if !form.email.contains('@') {
			return Err(Error::validation("enter a valid email address"));
		}
		if !valid_phone(&form.phone) {
			return Err(Error::validation("phone number must be 10 digits"));
		}
		if form.dob.age_on(self.calendar.current_date()) <= 0 {
			return Err(Error::validation("enter a valid date of birth"));
		}
		if form.deposit < 100_000 {
			return Err(Error::validation("minimum opening deposit is 100000"));
		}
		if let Err(msg) = validate_password(&form.password) {
			return Err(Error::validation(msg));
		}
		if form.password != form.confirm_password {
			return Err(Error::validation("passwords do not match"));
		}
		if form.profile_photo.is_none() {
			return Err(Error::validation("profile photo is required"));
		}
		if form.aadhaar.is_none() {
			return Err(Error::validation("aadhaar card is required"));
		}
		if form.pan.is_none() {
			return Err(Error::validation("pan card is required"));
		}
		if !matches!(
			form.account_type,
			AccountType::Savings | AccountType::Current
		) {
			return Err(Error::validation(
				"choose a savings or current account to open",
			));
		}
		Ok(())
	}
}

fn required_upload<'f>(upload: &'f Option<Upload>, label: &str) -> Result<&'f Upload> {
	upload
		.as_ref()
		.ok_or_else(|| Error::validation(format!("{} is required", label)))
}

fn customer_lookup(e: store::Error) -> Error {
	match e {
		store::Error::RecordNotFound => Error::new(ErrorKind::CustomerNotFound),
		e => e.into(),
	}
}

fn account_lookup(e: store::Error) -> Error {
	match e {
		store::Error::RecordNotFound => Error::new(ErrorKind::AccountNotFound),
		e => e.into(),
	}
}

fn valid_name(name: &str) -> bool {
	!name.trim().is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

fn valid_phone(phone: &str) -> bool {
	phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

/// At least 6 characters, letters/digits/symbols only, with at least one
/// symbol.
fn validate_password(password: &str) -> std::result::Result<(), &'static str> {
	if password.len() < 6 {
		return Err("password must be at least 6 characters");
	}
	let allowed =
		|c: char| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c);
	if !password.chars().all(allowed) {
		return Err("password contains an invalid character");
	}
	if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
		return Err("password must contain at least one special character");
	}
	Ok(())
}

pub trait Calendar: Sync {
	/// Gets the current date
	fn current_date(&self) -> Date {
		chrono::Utc::now().date_naive()
	}

	/// Gets the current instant
	fn current_time(&self) -> Time {
		chrono::Utc::now()
	}
}

/// Calendar backed by the system clock.
pub struct SystemCalendar;

impl Calendar for SystemCalendar {}
