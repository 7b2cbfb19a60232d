use crate::manifest::{ItemEntry, ManifestError, SideloadManifest};
use crate::naming::destination_path;
use crate::types::{ItemId, PackageId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One installable entry. Immutable once loaded; runs share it through `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub source_url: String,
    pub target_package: PackageId,
}

impl CatalogItem {
    pub fn destination(&self, downloads_dir: &Path, extension: &str) -> PathBuf {
        destination_path(downloads_dir, &self.title, extension)
    }

    fn from_entry(index: usize, entry: &ItemEntry) -> Result<Self, ManifestError> {
        let id = entry.id.trim();
        if id.is_empty() {
            return Err(ManifestError::EmptyItemId(index));
        }
        if entry.title.trim().is_empty() {
            return Err(ManifestError::EmptyTitle(id.to_owned()));
        }
        let url = entry.source_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ManifestError::InvalidSourceUrl {
                id: id.to_owned(),
                url: entry.source_url.clone(),
            });
        }
        let package = entry.target_package.trim();
        if package.is_empty() {
            return Err(ManifestError::EmptyTargetPackage(id.to_owned()));
        }

        Ok(Self {
            id: ItemId::new(id),
            title: entry.title.clone(),
            description: entry.description.clone(),
            icon: entry.icon.clone(),
            source_url: url.to_owned(),
            target_package: PackageId::new(package),
        })
    }
}

/// Ordered, read-only list of catalog items.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Arc<CatalogItem>>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn items(&self) -> &[Arc<CatalogItem>] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CatalogItem>> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SideloadManifest {
    /// Validate the `[[items]]` entries and build the catalog in manifest order.
    pub fn catalog(&self) -> Result<Catalog, ManifestError> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(self.items.len());
        for (index, entry) in self.items.iter().enumerate() {
            let item = CatalogItem::from_entry(index, entry)?;
            if !seen.insert(item.id.clone()) {
                return Err(ManifestError::DuplicateItemId(item.id.into_inner()));
            }
            items.push(item);
        }
        Ok(Catalog::new(items))
    }
}
