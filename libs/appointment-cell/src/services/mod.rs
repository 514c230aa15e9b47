pub mod flow;
pub mod ledger;
