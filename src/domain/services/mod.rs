//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity.
//!
//! ## Services
//!
//! - **MembershipGuard**: room existence and membership checks, member joins

mod membership_guard;

pub use membership_guard::*;
