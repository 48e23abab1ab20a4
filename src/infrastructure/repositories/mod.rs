//! Repository Implementations
//!
//! Implementations of the domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgRoomRepository** - Chatrooms with JSONB member lists (PostgreSQL)
//! - **PgMessageRepository** - Message history (PostgreSQL)
//! - **InMemoryRoomRepository** / **InMemoryMessageRepository** - process-local
//!   stores for the `memory` backend and tests
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgMessageRepository, PgRoomRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let rooms = PgRoomRepository::new(pool.clone());
//!     let messages = PgMessageRepository::new(pool);
//! }
//! ```

pub mod memory;
pub mod message_repository;
pub mod room_repository;

pub use memory::{InMemoryMessageRepository, InMemoryRoomRepository};
pub use message_repository::PgMessageRepository;
pub use room_repository::PgRoomRepository;
