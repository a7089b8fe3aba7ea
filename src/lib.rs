//! Purpose: Shared library crate used by the `statgather` CLI and tests.
//! Exports: `api` (stable surface), `core` (table model and codecs), `notice`.
//! Role: Typed report tables, their fixed-width text format, and the gather step.
//! Invariants: Library code reports failures through `core::error::Error`; it never panics on input.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
