//! # depot-kernel
//!
//! Transitive dependency resolution for an artifact registry.
//!
//! The kernel is storage-agnostic: it defines the records it reasons about
//! and the two collaborator boundaries it consumes, and computes closures
//! over whatever those collaborators report.
//!
//! ## Architecture
//!
//! ```text
//! Coordinate / ProjectVersion   ← identity (group:artifact[:version])
//!     │
//! VersionRecord                 ← declared deps, exclusion, eviction, cached report
//!     │
//! VersionStore / ArtifactRepository   ← collaborator boundaries
//!     │
//! ResolutionEngine              ← closure walk, override dedup, snapshot propagation
//! ```

pub mod coordinate;
pub mod record;
pub mod repository;
pub mod resolve;
pub mod store;

pub use coordinate::{
    Coordinate, CoordinateError, ProjectVersion, SNAPSHOT_MARKER, coordinate_problems,
    is_snapshot_version, validate_part,
};
pub use record::{DEFAULT_PROJECT_KIND, ProjectRecord, TransitiveDependencyReport, VersionRecord};
pub use repository::{ArtifactDependency, ArtifactFile, ArtifactRepository, RepositoryError};
pub use resolve::{MAX_RESOLUTION_DEPTH, ResolutionEngine, ResolveError, validate_dependencies};
pub use store::{StoreError, VersionStore};
