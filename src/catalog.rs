//! Static plan catalog
//!
//! Plans are external catalog data: never mutated at runtime, resolved by
//! `(id, kind, access)`. Resource limits use the panel's conventions
//! (memory/disk in MB, cpu as percent of one core, 0 meaning unlimited).

use serde::{Deserialize, Serialize};

use crate::panel::PanelKind;

/// Access tier sold with a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Regular,
    Admin,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Regular => "regular",
            AccessTier::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "regular" => Some(AccessTier::Regular),
            "admin" => Some(AccessTier::Admin),
            _ => None,
        }
    }
}

/// One sellable hosting-panel plan
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: PanelKind,
    pub access: AccessTier,
    pub memory_mb: u32,
    pub disk_mb: u32,
    pub cpu_percent: u32,
    /// Price in integer rupiah
    pub price: u64,
    pub features: &'static [&'static str],
}

/// Catalog of all sellable plans
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

const REGULAR_FEATURES: &[&str] = &["Garansi 12 hari", "Anti suspend", "Support 24/7"];
const ADMIN_FEATURES: &[&str] = &[
    "Garansi 12 hari",
    "Akses admin panel",
    "Anti suspend",
    "Support 24/7",
];

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// The storefront's default catalog.
    pub fn defaults() -> Self {
        let mut plans = Vec::new();

        // Regular tiers exist on both backends at the same price points.
        for kind in [PanelKind::Private, PanelKind::Public] {
            plans.extend([
                Plan {
                    id: "1gb",
                    name: "1GB / Unlimited",
                    kind,
                    access: AccessTier::Regular,
                    memory_mb: 1024,
                    disk_mb: 0,
                    cpu_percent: 40,
                    price: 15000,
                    features: REGULAR_FEATURES,
                },
                Plan {
                    id: "2gb",
                    name: "2GB / Unlimited",
                    kind,
                    access: AccessTier::Regular,
                    memory_mb: 2048,
                    disk_mb: 0,
                    cpu_percent: 60,
                    price: 20000,
                    features: REGULAR_FEATURES,
                },
                Plan {
                    id: "4gb",
                    name: "4GB / Unlimited",
                    kind,
                    access: AccessTier::Regular,
                    memory_mb: 4096,
                    disk_mb: 0,
                    cpu_percent: 100,
                    price: 30000,
                    features: REGULAR_FEATURES,
                },
                Plan {
                    id: "8gb",
                    name: "8GB / Unlimited",
                    kind,
                    access: AccessTier::Regular,
                    memory_mb: 8192,
                    disk_mb: 0,
                    cpu_percent: 150,
                    price: 45000,
                    features: REGULAR_FEATURES,
                },
                Plan {
                    id: "unli",
                    name: "Unlimited / Unlimited",
                    kind,
                    access: AccessTier::Regular,
                    memory_mb: 0,
                    disk_mb: 0,
                    cpu_percent: 0,
                    price: 60000,
                    features: REGULAR_FEATURES,
                },
            ]);
        }

        // Admin access is only sold on the private backend.
        plans.push(Plan {
            id: "admin",
            name: "Admin Panel",
            kind: PanelKind::Private,
            access: AccessTier::Admin,
            memory_mb: 0,
            disk_mb: 0,
            cpu_percent: 0,
            price: 100000,
            features: ADMIN_FEATURES,
        });

        Self::new(plans)
    }

    /// Resolve a plan by its full identity.
    pub fn resolve(&self, id: &str, kind: PanelKind, access: AccessTier) -> Option<&Plan> {
        self.plans
            .iter()
            .find(|p| p.id == id && p.kind == kind && p.access == access)
    }

    /// Find a plan by id alone (display lookups; ids share limits across kinds).
    pub fn find(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[Plan] {
        &self.plans
    }
}
