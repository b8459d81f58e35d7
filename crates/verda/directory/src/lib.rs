//! Verda Directory - tenant validation and material catalogs
//!
//! The accounting core consults the directory for two things: whether a
//! tenant id refers to a known client organization, and which materials are
//! acceptable for each disposal stream.

#![deny(unsafe_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;
use thiserror::Error;
use verda_types::{TenantId, WasteCategory};

/// Directory collaborator consulted on every entry submission.
pub trait TenantDirectory: Send + Sync {
    /// Err for an unknown tenant id.
    fn verify_tenant(&self, tenant_id: &TenantId) -> Result<(), DirectoryError>;

    /// Whether a material belongs to the allowed set for a stream.
    fn material_allowed(
        &self,
        category: WasteCategory,
        material: &str,
    ) -> Result<bool, DirectoryError>;

    /// The full allowed set for a stream, for entry-form rendering.
    fn allowed_materials(&self, category: WasteCategory)
        -> Result<BTreeSet<String>, DirectoryError>;
}

/// In-memory directory seeded with the default material catalog.
pub struct StaticDirectory {
    tenants: RwLock<HashSet<TenantId>>,
    catalog: HashMap<WasteCategory, BTreeSet<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashSet::new()),
            catalog: default_catalog(),
        }
    }

    pub fn with_catalog(catalog: HashMap<WasteCategory, BTreeSet<String>>) -> Self {
        Self {
            tenants: RwLock::new(HashSet::new()),
            catalog,
        }
    }

    pub fn register_tenant(&self, tenant_id: TenantId) -> Result<(), DirectoryError> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| DirectoryError::LockError)?;
        tenants.insert(tenant_id);
        Ok(())
    }
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory for StaticDirectory {
    fn verify_tenant(&self, tenant_id: &TenantId) -> Result<(), DirectoryError> {
        let tenants = self.tenants.read().map_err(|_| DirectoryError::LockError)?;
        if tenants.contains(tenant_id) {
            Ok(())
        } else {
            Err(DirectoryError::UnknownTenant(tenant_id.to_string()))
        }
    }

    fn material_allowed(
        &self,
        category: WasteCategory,
        material: &str,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .catalog
            .get(&category)
            .map(|set| set.contains(material))
            .unwrap_or(false))
    }

    fn allowed_materials(
        &self,
        category: WasteCategory,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        Ok(self.catalog.get(&category).cloned().unwrap_or_default())
    }
}

/// Material catalog used when a deployment supplies nothing tenant-specific.
/// Note that "Orgánico" is legal in both compost and landfill: composted
/// organics are diverted, contaminated organics are not.
pub fn default_catalog() -> HashMap<WasteCategory, BTreeSet<String>> {
    let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
    HashMap::from([
        (
            WasteCategory::Recycling,
            set(&["PET", "HDPE", "Cartón", "Papel", "Vidrio", "Aluminio", "Chatarra"]),
        ),
        (WasteCategory::Compost, set(&["Orgánico", "Jardinería"])),
        (WasteCategory::Reuse, set(&["Madera", "Tarimas", "Textil"])),
        (
            WasteCategory::Landfill,
            set(&["Orgánico", "Inorgánico", "Sanitarios"]),
        ),
    ])
}

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("lock error")]
    LockError,
}
