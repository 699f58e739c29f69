pub mod emergency;
pub mod expiry;
pub mod filter;
pub mod ledger;
pub mod matcher;
pub mod notify;
pub mod rate_limit;
pub mod scoring;
pub mod sessions;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;
