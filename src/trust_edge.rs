// Trust Edge Module - directed, attributed trust relationships between domains

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common_types::trust_attributes;
use crate::domain_node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

impl TrustDirection {
    /// Direction of the same trust as seen from the other domain
    pub fn reversed(self) -> Self {
        match self {
            TrustDirection::Inbound => TrustDirection::Outbound,
            TrustDirection::Outbound => TrustDirection::Inbound,
            TrustDirection::Bidirectional => TrustDirection::Bidirectional,
        }
    }
}

impl std::fmt::Display for TrustDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustDirection::Inbound => write!(f, "Inbound"),
            TrustDirection::Outbound => write!(f, "Outbound"),
            TrustDirection::Bidirectional => write!(f, "Bidirectional"),
        }
    }
}

/// Where an edge's facts came from. Transitions are upgrade-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[default]
    Unset,
    /// Mirrored from the other endpoint or inferred from a hint
    Derived,
    /// Reported by the source domain itself
    Authoritative,
}

impl Provenance {
    pub fn from_authoritative(authoritative: bool) -> Self {
        if authoritative {
            Provenance::Authoritative
        } else {
            Provenance::Derived
        }
    }
}

/// The mutable facts carried by an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFacts {
    pub direction: TrustDirection,
    pub attributes: u32,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl EdgeFacts {
    pub fn new(direction: TrustDirection, attributes: u32, active: bool, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            direction,
            attributes,
            active,
            created_at,
        }
    }

    /// Active bidirectional membership link between two domains of one forest
    pub fn intra_forest(created_at: Option<DateTime<Utc>>) -> Self {
        Self::new(TrustDirection::Bidirectional, trust_attributes::WITHIN_FOREST, true, created_at)
    }

    /// Active bidirectional link between two forest roots
    pub fn cross_forest() -> Self {
        Self::new(TrustDirection::Bidirectional, trust_attributes::FOREST_TRANSITIVE, true, None)
    }

    /// The same facts seen from the destination
    pub fn mirrored(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            ..self.clone()
        }
    }

    pub fn is_intra_forest(&self) -> bool {
        self.attributes & trust_attributes::WITHIN_FOREST != 0
    }
}

/// Result of offering facts to an existing edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeUpdate {
    /// No edge existed; forward edge and mirror installed
    Created,
    /// Same or lower tier, nothing written
    Unchanged,
    /// Provenance raised, facts replaced
    Upgraded,
    /// Authoritative over authoritative, facts replaced
    Replaced { previous: EdgeFacts },
}

/// One directed trust relationship, stored on its source node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEdge {
    source: NodeId,
    destination: NodeId,
    facts: EdgeFacts,
    provenance: Provenance,
}

impl TrustEdge {
    pub(crate) fn new(source: NodeId, destination: NodeId, facts: EdgeFacts, provenance: Provenance) -> Self {
        Self {
            source,
            destination,
            facts,
            provenance,
        }
    }

    /// Derived copy installed on the destination node
    pub(crate) fn mirror(&self) -> Self {
        Self {
            source: self.destination,
            destination: self.source,
            facts: self.facts.mirrored(),
            provenance: Provenance::Derived,
        }
    }

    /// Most-authoritative-write-wins. Endpoints never change.
    pub(crate) fn offer(&mut self, facts: EdgeFacts, provenance: Provenance) -> EdgeUpdate {
        if provenance == Provenance::Authoritative && self.provenance == Provenance::Authoritative {
            let previous = std::mem::replace(&mut self.facts, facts);
            return EdgeUpdate::Replaced { previous };
        }
        if provenance > self.provenance {
            self.facts = facts;
            self.provenance = provenance;
            return EdgeUpdate::Upgraded;
        }
        EdgeUpdate::Unchanged
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn facts(&self) -> &EdgeFacts {
        &self.facts
    }

    pub fn direction(&self) -> TrustDirection {
        self.facts.direction
    }

    pub fn attributes(&self) -> u32 {
        self.facts.attributes
    }

    pub fn is_active(&self) -> bool {
        self.facts.active
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.facts.created_at
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_authoritative(&self) -> bool {
        self.provenance == Provenance::Authoritative
    }

    pub fn is_intra_forest(&self) -> bool {
        self.facts.is_intra_forest()
    }
}
