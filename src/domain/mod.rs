//! # Domain Layer
//!
//! The domain layer contains the core rules of the chatroom backend.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Chatroom, Message, Identity, presence and activity types
//! - **services**: Domain services (membership guard)
//! - **repository**: Storage error type and deadline wrapper
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod repository;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use repository::{within_deadline, within_write_deadline, write_guard, RepositoryError};
