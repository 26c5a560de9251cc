//! # Takegrant Testkit
//!
//! Testing utilities for takegrant.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A ready-made [`Scenario`] with three users and one object
//! - **Generators**: Proptest strategies for rights operations, plus a pure
//!   reference model to check stores against
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use takegrant_testkit::generators::op_sequence;
//!
//! proptest! {
//!     #[test]
//!     fn never_duplicates(ops in op_sequence(4, 30)) {
//!         // replay `ops` against a store and the model
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use takegrant_testkit::{block_on, Scenario};
//!
//! let scenario = block_on(Scenario::memory());
//! assert!(scenario.user1.is_admin);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    block_on, login, register, test_config, Scenario, FILE1_CONTENT, TEST_PASSWORD_COST,
};
pub use generators::{kind_name, op, op_sequence, right_kind, Op};
