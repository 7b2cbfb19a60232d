//! Catalog schema for Sideload.
//!
//! This crate defines the data the acquisition engine consumes: typed identifiers
//! (`ItemId`, `PackageId`), immutable `CatalogItem` descriptors, the TOML
//! `SideloadManifest` that carries the catalog and engine settings, and the
//! title-derived naming of downloaded package files.

pub mod catalog;
pub mod manifest;
pub mod naming;
pub mod types;

pub use catalog::{Catalog, CatalogItem};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, FetchSection, HostSection, ItemEntry,
    ManifestError, PermissionSection, SettingsSection, SideloadManifest,
};
pub use naming::{destination_file_name, destination_path, sanitize_title};
pub use types::{ItemId, PackageId};
