use crate::types::CustomerId;

/// Who a workflow is acting for.
///
/// Passed explicitly into every customer-facing operation instead of living
/// in a process-wide slot, so "logged out" is its own state rather than a
/// sentinel customer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
	LoggedOut,
	Customer(CustomerId),
}

impl Session {
	pub fn customer_id(&self) -> Option<CustomerId> {
		match self {
			Session::LoggedOut => None,
			Session::Customer(id) => Some(*id),
		}
	}
}
