//! # Chatroom Server Library
//!
//! This crate provides a multi-room chat backend with:
//! - RESTful HTTP API for chatrooms and message history
//! - WebSocket gateway pushing new messages to connected room members
//! - PostgreSQL or in-process storage
//! - Optional Redis for presence and the activity stream
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, repository traits and the membership guard
//! - **Application Layer**: Messaging service and DTOs
//! - **Infrastructure Layer**: Database, cache, identity and metrics
//! - **Presentation Layer**: HTTP handlers, middleware and WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chatroom_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, repository traits, membership guard
//! +-- application/    Messaging service and DTOs
//! +-- infrastructure/ Repositories, cache, identity, metrics
//! +-- presentation/   HTTP routes and WebSocket gateway
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
