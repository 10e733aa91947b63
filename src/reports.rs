// Report Module - shapes of the per-domain evidence consumed by the graph builder
// Collectors own the wire format; these are the already-parsed objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_identity::DomainIdentity;
use crate::errors::{Result, TrustMapError};
use crate::trust_edge::{EdgeFacts, TrustDirection};

/// A domain's own collected report (highest reliability tier)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainReport {
    pub domain: DomainIdentity,
    #[serde(default)]
    pub forest: Option<DomainIdentity>,
    pub reference_date: DateTime<Utc>,
    #[serde(default)]
    pub direct_trusts: Vec<TrustFact>,
    #[serde(default)]
    pub reachable_domains: Option<Vec<ReachableHint>>,
}

/// One trust as enumerated inside a domain's report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustFact {
    pub remote: DomainIdentity,
    pub direction: TrustDirection,
    #[serde(default)]
    pub attributes: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub known_forest_members: Option<Vec<ForestMemberHint>>,
}

/// A domain the trust partner is known to host in its forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestMemberHint {
    pub domain: DomainIdentity,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub forest: Option<DomainIdentity>,
}

/// Low-confidence domain reference from best-effort exploration; may be SID only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachableHint {
    pub domain: DomainIdentity,
    #[serde(default)]
    pub forest: Option<DomainIdentity>,
}

/// Ownership and visibility metadata layered over the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayRecord {
    pub domain: DomainIdentity,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<String>,
}

fn default_active() -> bool {
    true
}

fn require_named(identity: &DomainIdentity, context: &str) -> Result<()> {
    identity.validate()?;
    if !identity.is_named() {
        return Err(TrustMapError::ValidationError(format!(
            "{} '{}' has no domain name",
            context, identity
        )));
    }
    Ok(())
}

impl DomainReport {
    pub fn new(domain: DomainIdentity, forest: Option<DomainIdentity>, reference_date: DateTime<Utc>) -> Self {
        Self {
            domain,
            forest,
            reference_date,
            direct_trusts: Vec::new(),
            reachable_domains: None,
        }
    }

    pub fn with_trust(mut self, trust: TrustFact) -> Self {
        self.direct_trusts.push(trust);
        self
    }

    pub fn with_reachable(mut self, hint: ReachableHint) -> Self {
        self.reachable_domains.get_or_insert_with(Vec::new).push(hint);
        self
    }

    /// Re-check every identity carried by the report
    pub fn validate(&self) -> Result<()> {
        require_named(&self.domain, "report domain")?;
        if let Some(forest) = &self.forest {
            forest.validate()?;
        }
        for trust in &self.direct_trusts {
            require_named(&trust.remote, "trust partner")?;
            for member in trust.known_forest_members.iter().flatten() {
                require_named(&member.domain, "forest member")?;
                if let Some(forest) = &member.forest {
                    forest.validate()?;
                }
            }
        }
        for hint in self.reachable_domains.iter().flatten() {
            hint.domain.validate()?;
            if let Some(forest) = &hint.forest {
                forest.validate()?;
            }
        }
        Ok(())
    }
}

impl TrustFact {
    pub fn new(
        remote: DomainIdentity,
        direction: TrustDirection,
        attributes: u32,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            remote,
            direction,
            attributes,
            active,
            created_at,
            known_forest_members: None,
        }
    }

    pub fn with_known_member(mut self, member: ForestMemberHint) -> Self {
        self.known_forest_members.get_or_insert_with(Vec::new).push(member);
        self
    }

    pub fn edge_facts(&self) -> EdgeFacts {
        EdgeFacts::new(self.direction, self.attributes, self.active, Some(self.created_at))
    }
}

impl OverlayRecord {
    pub fn hidden(domain: DomainIdentity) -> Self {
        Self {
            domain,
            hide: true,
            owner: None,
            business_unit: None,
        }
    }
}
