//! Retry domain: policy, failure classification and observable state.

pub mod classify;
pub mod policy;
pub mod state;
