//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure (files, HTTP servers). Each sub-module groups
//! adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `feeds`: JSON snapshot odds and market feeds
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSONL intent journal (execution stand-in)

pub mod feeds;
pub mod metrics;
pub mod persistence;
