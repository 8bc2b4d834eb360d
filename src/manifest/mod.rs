//! YAML manifests declaring configuration namespaces.
//!
//! A manifest names the namespace, its default backend chain, its items and
//! any plain values. Manifests are discovered in tiers and merged field by
//! field; see [`ManifestLoader`] for the lookup order.

mod loader;
mod types;

pub use loader::{MANIFEST_ENV, MANIFEST_FILE, ManifestLoader, ManifestPaths, ManifestTier};
pub use types::{BackendDecl, ItemDecl, Manifest};
