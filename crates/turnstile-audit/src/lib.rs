//! # turnstile-audit
//!
//! Schedule-audit event logging for the Turnstile auth broker.
//!
//! This crate provides:
//! - The [`ScheduleAuditEvent`] type recorded on every `update_hours`,
//!   `set_override`, `clear_override`, and automatic override restore.
//! - The [`AuditSink`] trait, implemented against persistent storage by
//!   `turnstile-store` and against memory/console for tests.
//! - [`AuditLogger`], the thin façade the Window Controller depends on.

pub mod error;
pub mod event;
pub mod logger;
pub mod sink;

pub use error::AuditError;
pub use event::ScheduleAuditEvent;
pub use logger::AuditLogger;
pub use sink::{AuditSink, ConsoleSink, MemorySink};
