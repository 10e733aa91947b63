// Trust Classification - pure interpretation of trust direction and attributes
// Used by the trust map audit and by anything rendering edges.

use serde::{Deserialize, Serialize};

use crate::common_types::trust_attributes;
use crate::trust_edge::{TrustDirection, TrustEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustKind {
    IntraForest,
    Forest,
    External,
}

impl std::fmt::Display for TrustKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustKind::IntraForest => write!(f, "Intra-Forest"),
            TrustKind::Forest => write!(f, "Forest"),
            TrustKind::External => write!(f, "External"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SidFilteringStatus {
    /// Inbound-only or within a forest
    NotApplicable,
    Enforced,
    NotEnforced,
    /// Not enforced on a trust known to serve a migration
    NotEnforcedMigration,
}

impl std::fmt::Display for SidFilteringStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SidFilteringStatus::NotApplicable => write!(f, "Not applicable"),
            SidFilteringStatus::Enforced => write!(f, "Yes"),
            SidFilteringStatus::NotEnforced => write!(f, "No"),
            SidFilteringStatus::NotEnforcedMigration => write!(f, "No (migration)"),
        }
    }
}

const ATTRIBUTE_NAMES: [(u32, &str); 12] = [
    (trust_attributes::NON_TRANSITIVE, "Non-Transitive"),
    (trust_attributes::UPLEVEL_ONLY, "Uplevel-Only"),
    (trust_attributes::QUARANTINED_DOMAIN, "Quarantined-Domain"),
    (trust_attributes::FOREST_TRANSITIVE, "Forest-Transitive"),
    (trust_attributes::CROSS_ORGANIZATION, "Cross-Organization"),
    (trust_attributes::WITHIN_FOREST, "Within-Forest"),
    (trust_attributes::TREAT_AS_EXTERNAL, "Treat-As-External"),
    (trust_attributes::USES_RC4_ENCRYPTION, "Uses-RC4-Encryption"),
    (trust_attributes::USES_AES_KEYS, "Uses-AES-Keys"),
    (trust_attributes::CROSS_ORGANIZATION_NO_TGT_DELEGATION, "No-TGT-Delegation"),
    (trust_attributes::PIM_TRUST, "PIM-Trust"),
    (trust_attributes::CROSS_ORGANIZATION_ENABLE_TGT_DELEGATION, "Enable-TGT-Delegation"),
];

/// Names of the known bits set in `attributes`, lowest bit first
pub fn trust_attribute_names(attributes: u32) -> Vec<&'static str> {
    ATTRIBUTE_NAMES
        .iter()
        .filter(|(bit, _)| attributes & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

pub fn trust_attribute_text(attributes: u32) -> String {
    let names = trust_attribute_names(attributes);
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

pub fn trust_kind(attributes: u32) -> TrustKind {
    if attributes & trust_attributes::WITHIN_FOREST != 0 {
        TrustKind::IntraForest
    } else if attributes & trust_attributes::FOREST_TRANSITIVE != 0 {
        TrustKind::Forest
    } else {
        TrustKind::External
    }
}

/// SID filtering as seen from the trusting side.
///
/// Forest trusts filter unless treated as external without quarantine;
/// external trusts filter only when quarantined.
pub fn sid_filtering_status(
    direction: TrustDirection,
    attributes: u32,
    is_known_migration: Option<&dyn Fn() -> bool>,
) -> SidFilteringStatus {
    if direction == TrustDirection::Inbound {
        return SidFilteringStatus::NotApplicable;
    }
    let quarantined = attributes & trust_attributes::QUARANTINED_DOMAIN != 0;
    let enforced = match trust_kind(attributes) {
        TrustKind::IntraForest => return SidFilteringStatus::NotApplicable,
        TrustKind::Forest => quarantined || attributes & trust_attributes::TREAT_AS_EXTERNAL == 0,
        TrustKind::External => quarantined,
    };
    if enforced {
        SidFilteringStatus::Enforced
    } else if is_known_migration.map_or(false, |check| check()) {
        SidFilteringStatus::NotEnforcedMigration
    } else {
        SidFilteringStatus::NotEnforced
    }
}

/// Everything a consumer needs to label one edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeClassification {
    pub kind: TrustKind,
    pub sid_filtering: SidFilteringStatus,
    pub attribute_text: String,
}

pub fn classify(
    direction: TrustDirection,
    attributes: u32,
    is_known_migration: Option<&dyn Fn() -> bool>,
) -> EdgeClassification {
    EdgeClassification {
        kind: trust_kind(attributes),
        sid_filtering: sid_filtering_status(direction, attributes, is_known_migration),
        attribute_text: trust_attribute_text(attributes),
    }
}

pub fn classify_edge(edge: &TrustEdge, is_known_migration: Option<&dyn Fn() -> bool>) -> EdgeClassification {
    classify(edge.direction(), edge.attributes(), is_known_migration)
}
