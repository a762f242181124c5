use async_trait::async_trait;
use tracing::debug;

use crate::model::PackageDefinition;
use crate::ports::{PackageCatalog, StoreError};

/// Built-in list used whenever the catalog collaborator returns nothing.
pub fn default_packages() -> Vec<PackageDefinition> {
    vec![
        PackageDefinition {
            id: "solo".into(),
            name: "Solo Session".into(),
            price_minor_units: 399,
            duration_minutes: 30,
        },
        PackageDefinition {
            id: "duo".into(),
            name: "Duo Session".into(),
            price_minor_units: 699,
            duration_minutes: 45,
        },
        PackageDefinition {
            id: "group".into(),
            name: "Group Session".into(),
            price_minor_units: 1199,
            duration_minutes: 60,
        },
    ]
}

/// Catalog contents, falling back to `default_packages` when empty.
/// Transport failures are not masked.
pub async fn resolve_packages(catalog: &dyn PackageCatalog) -> Result<Vec<PackageDefinition>, StoreError> {
    let packages = catalog.list_packages().await?;
    if packages.is_empty() {
        debug!("catalog empty; using default packages");
        return Ok(default_packages());
    }
    Ok(packages)
}

/// A fixed, in-process catalog (service list or promotional override).
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    packages: Vec<PackageDefinition>,
}

impl StaticCatalog {
    pub fn new(packages: Vec<PackageDefinition>) -> Self {
        Self { packages }
    }

    /// Parse a JSON array of packages.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl PackageCatalog for StaticCatalog {
    async fn list_packages(&self) -> Result<Vec<PackageDefinition>, StoreError> {
        Ok(self.packages.clone())
    }
}
