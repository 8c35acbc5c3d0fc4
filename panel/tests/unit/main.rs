//! Unit tests for the test panel


mod test_auto_deploy;
mod test_eligibility;
mod test_formalize;
mod test_handlers;
mod test_reconciler;
mod test_store;
