//! # depot-store
//!
//! Storage adapters for the depot kernel's collaborator boundaries.
//!
//! This crate provides:
//! - `VersionState` (canonical in-memory projection + dependant index)
//! - `MemoryVersionStore` and `JsonlVersionStore` (`VersionStore` impls)
//! - JSONL read/write and lock-scoped atomic mutation helpers, shared with
//!   the notification queue and archive
//! - `FixtureRepository` (an `ArtifactRepository` served from JSON)
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per record)
//!     ↕  hydrate / flush under store.lock
//! VersionState (deterministic in-memory projection)
//! ```

pub mod atomic_store;
pub mod fixture;
pub mod index;
pub mod jsonl;
pub mod jsonl_store;
pub mod memory;

pub use atomic_store::{
    AtomicStoreMutationError, FileLockGuard, LOCK_ACQUIRE_ATTEMPTS, lock_path_for, mutate_jsonl,
};
pub use fixture::{FixtureArtifact, FixtureRepository, FixtureVersion, RepositoryFixture};
pub use index::DependantIndex;
pub use jsonl::{
    JsonlError, read_records, read_records_from_path, read_records_or_empty, write_records,
    write_records_to_path,
};
pub use jsonl_store::{JsonlVersionStore, PROJECTS_FILE, STORE_LOCK_FILE, VERSIONS_FILE};
pub use memory::{MemoryVersionStore, VersionState};
