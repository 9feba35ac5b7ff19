pub mod store;
pub mod identity;
pub mod storage;
pub mod counter;
pub mod session;
pub mod customer;
pub mod kyc;
pub mod account;
pub mod transaction;
pub mod loan;
pub mod bank;
pub mod types;
