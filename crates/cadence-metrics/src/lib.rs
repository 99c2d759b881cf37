//! # cadence-metrics
//!
//! Observability and telemetry for Cadence orchestration.
//!
//! This crate provides:
//! - Telemetry events describing plan, task, builder and research changes
//! - The `TelemetrySink` capability with in-process and JSONL sinks
//! - Process-wide counters initialized once at startup

pub mod counters;
mod event;
mod hub;
mod storage;

pub use event::{TelemetryEvent, TelemetryEventKind};
pub use hub::{HubSummary, TelemetryHub, TelemetrySink, DEFAULT_HISTORY_LIMIT};
pub use storage::JsonlTelemetrySink;
