//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL) and in-process stores
//! - Presence cache (Redis)
//! - Activity sinks (structured log, Redis stream)
//! - JWT identity verification
//! - Prometheus metrics

pub mod activity;
pub mod cache;
pub mod database;
pub mod identity;
pub mod metrics;
pub mod repositories;
