//! Embedded Python runtime for lessonbox.
//!
//! This crate provides the process-wide interpreter that executes learner
//! code:
//! - [`RuntimeProvider`]: acquisition, readiness, and the `run` entry point
//! - [`LineSink`]: line-oriented capture of the interpreter's output streams
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   RuntimeProvider                       │
//! │  (One per process, shared by reference)                 │
//! │  - Single-flight acquisition                            │
//! │  - FIFO run gate                                        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              CPython `__main__` namespace               │
//! │  (Shared across runs; reset is the session's job)       │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              LineSink (stdout / stderr)                 │
//! │  (Persistent, re-pointed at per-run callbacks)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod provider;
pub mod sink;

pub use provider::{Readiness, RuntimeProvider};
pub use sink::{LineSink, OutputSink, StreamKind};
