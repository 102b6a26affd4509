//! # WorkTrack Shared Library
//!
//! This crate contains the types, database models, and business logic
//! shared by the WorkTrack API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT handling, middleware, and the role
//!   capability policy
//! - `db`: Connection pool and migration management

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the WorkTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
