//! Shared resource path definitions for Secret Manager
//!
//! This crate centralizes the resource naming scheme so the provider, its
//! REST transport and the in-memory test double agree on every path.
//!
//! ## Resource names
//!
//! | Resource | Name                                                    |
//! |----------|---------------------------------------------------------|
//! | Account  | `accounts/{account}`                                    |
//! | Secret   | `accounts/{account}/secrets/{key}`                      |
//! | Version  | `accounts/{account}/secrets/{key}/versions/{version}`   |
//!
//! ## Filters
//!
//! The listing endpoint accepts `name:` substring clauses and
//! `labels.<k>=<v>` equality clauses, ANDed when joined with whitespace.

pub mod filter;
pub mod secret_manager;

pub use filter::ListFilter;
pub use secret_manager::{
    account_name, account_segment, logical_key, parse_secret_name, parse_version_name,
    secret_name, version_name, ACCOUNTS_COLLECTION,
    LATEST_VERSION, SECRETS_COLLECTION, VERSIONS_COLLECTION,
};
