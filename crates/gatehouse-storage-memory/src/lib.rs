//! # gatehouse-storage-memory
//!
//! In-memory implementations of the Gatehouse storage traits.
//!
//! Suitable for tests and single-node deployments. All state lives behind
//! process-local locks; the single-use transitions (code consumption,
//! refresh token revocation) take the write lock for the whole
//! check-and-mark step, which gives them the compare-and-set semantics the
//! core requires.
//!
//! Durable backends implement the same traits against an external store
//! with per-record read-after-write consistency and an atomic CAS on the
//! consumed/revoked fields.

pub mod client;
pub mod grant;

pub use client::MemoryClientStore;
pub use grant::MemoryGrantStore;
