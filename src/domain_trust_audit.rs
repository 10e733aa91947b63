// Domain Trust Audit Module - security checks over a consolidated trust map
// Scans the finished graph the way the per-domain trust audit scans one domain.

use serde::{Deserialize, Serialize};

use crate::common_types::{FindingSeverity, Recommendation, SeverityCounts};
use crate::domain_graph::{DataQualityIssue, DomainGraph};
use crate::domain_identity::DomainIdentity;
use crate::domain_node::DomainNode;
use crate::trust_classification::{classify_edge, SidFilteringStatus, TrustKind};
use crate::trust_edge::{TrustDirection, TrustEdge};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustFinding {
    pub category: String,
    pub issue: String,
    pub severity: FindingSeverity,
    pub affected_object: String,
    pub description: String,
    pub impact: String,
    pub remediation: String,
    pub details: TrustDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustDetails {
    pub source: Option<String>,
    pub target: Option<String>,
    pub direction: Option<String>,
    pub trust_type: Option<String>,
    pub attributes: Option<String>,
    pub sid_filtering: Option<SidFilteringStatus>,
    pub authoritative: Option<bool>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustMapAudit {
    pub total_domains: u32,
    pub reported_domains: u32,
    pub total_trusts: u32,
    pub inbound_trusts: u32,
    pub outbound_trusts: u32,
    pub bidirectional_trusts: u32,
    pub forest_trusts: u32,
    pub external_trusts: u32,
    pub intra_forest_trusts: u32,
    pub trusts_without_sid_filtering: u32,
    pub potentially_removed_domains: u32,
    pub data_quality_issues: u32,
    pub findings: Vec<TrustFinding>,
    pub severity_counts: SeverityCounts,
    pub risk_score: u32,
    pub scan_timestamp: String,
    pub recommendations: Vec<Recommendation>,
}

impl Default for TrustMapAudit {
    fn default() -> Self {
        Self::new()
    }
}

fn edge_details(source: &DomainNode, target: &DomainNode, edge: &TrustEdge, kind: TrustKind) -> TrustDetails {
    TrustDetails {
        source: Some(source.identity().to_string()),
        target: Some(target.identity().to_string()),
        direction: Some(edge.direction().to_string()),
        trust_type: Some(kind.to_string()),
        attributes: Some(crate::trust_classification::trust_attribute_text(edge.attributes())),
        sid_filtering: None,
        authoritative: Some(edge.is_authoritative()),
        created: edge.created_at().map(|d| d.to_rfc3339()),
    }
}

impl TrustMapAudit {
    pub fn new() -> Self {
        Self {
            total_domains: 0,
            reported_domains: 0,
            total_trusts: 0,
            inbound_trusts: 0,
            outbound_trusts: 0,
            bidirectional_trusts: 0,
            forest_trusts: 0,
            external_trusts: 0,
            intra_forest_trusts: 0,
            trusts_without_sid_filtering: 0,
            potentially_removed_domains: 0,
            data_quality_issues: 0,
            findings: Vec::new(),
            severity_counts: SeverityCounts::default(),
            risk_score: 0,
            scan_timestamp: chrono::Utc::now().to_rfc3339(),
            recommendations: Vec::new(),
        }
    }

    /// Audit a whole graph. `is_known_migration` names trusts (source, target)
    /// that are expected to run without SID filtering.
    pub fn from_graph(graph: &DomainGraph, is_known_migration: &dyn Fn(&DomainIdentity, &DomainIdentity) -> bool) -> Self {
        let mut audit = Self::new();
        for node in graph.all_nodes() {
            audit.analyze_domain(node);
            for edge in node.edges().filter(|e| e.is_authoritative()) {
                if let Some(target) = graph.node(edge.destination()) {
                    let migration = || is_known_migration(node.identity(), target.identity());
                    audit.analyze_trust(node, target, edge, Some(&migration));
                }
            }
        }
        for issue in graph.data_quality() {
            audit.analyze_data_quality(issue);
        }
        audit.severity_counts = SeverityCounts::from_iter(audit.findings.iter().map(|f| &f.severity));
        audit.generate_recommendations();
        audit
    }

    pub fn analyze_domain(&mut self, node: &DomainNode) {
        self.total_domains += 1;
        if node.has_report() {
            self.reported_domains += 1;
        }

        if node.is_potentially_removed() {
            self.potentially_removed_domains += 1;
            self.findings.push(TrustFinding {
                category: "Trust Map".to_string(),
                issue: "Domain Potentially Removed".to_string(),
                severity: FindingSeverity::Low,
                affected_object: node.identity().to_string(),
                description: format!(
                    "Domain '{}' has no report of its own and every trust pointing at it is inactive.",
                    node.identity()
                ),
                impact: "Leftover trust objects toward decommissioned domains can be hijacked if the domain name is re-registered.".to_string(),
                remediation: "Confirm the domain is decommissioned and remove the remaining trust objects.".to_string(),
                details: TrustDetails {
                    target: Some(node.identity().to_string()),
                    ..Default::default()
                },
            });
            self.risk_score += 5;
        }
    }

    /// Checks one authoritative edge, i.e. a trust the source domain reported itself
    pub fn analyze_trust(
        &mut self,
        source: &DomainNode,
        target: &DomainNode,
        edge: &TrustEdge,
        is_known_migration: Option<&dyn Fn() -> bool>,
    ) {
        self.total_trusts += 1;
        let classification = classify_edge(edge, is_known_migration);

        match edge.direction() {
            TrustDirection::Inbound => self.inbound_trusts += 1,
            TrustDirection::Outbound => self.outbound_trusts += 1,
            TrustDirection::Bidirectional => self.bidirectional_trusts += 1,
        }
        match classification.kind {
            TrustKind::Forest => self.forest_trusts += 1,
            TrustKind::External => self.external_trusts += 1,
            TrustKind::IntraForest => self.intra_forest_trusts += 1,
        }

        if classification.kind == TrustKind::IntraForest {
            return;
        }

        let mut details = edge_details(source, target, edge, classification.kind);
        details.sid_filtering = Some(classification.sid_filtering);

        if edge.direction() == TrustDirection::Bidirectional && edge.is_active() {
            self.findings.push(TrustFinding {
                category: "Domain Trusts".to_string(),
                issue: "Bidirectional Trust Across Forest Boundary".to_string(),
                severity: FindingSeverity::Medium,
                affected_object: target.identity().to_string(),
                description: format!(
                    "'{}' and '{}' trust each other in both directions across a forest boundary.",
                    source.identity(),
                    target.identity()
                ),
                impact: "Compromise of either side gives a foothold in the other. Consider if bidirectional trust is necessary.".to_string(),
                remediation: "Convert to a one-way trust or enable selective authentication.".to_string(),
                details: details.clone(),
            });
            self.risk_score += 15;
        }

        match classification.sid_filtering {
            SidFilteringStatus::NotEnforced => {
                self.trusts_without_sid_filtering += 1;
                let (severity, score) = match classification.kind {
                    TrustKind::Forest => (FindingSeverity::High, 30),
                    _ => (FindingSeverity::Critical, 50),
                };
                self.findings.push(TrustFinding {
                    category: "Domain Trusts".to_string(),
                    issue: "SID Filtering Not Enforced".to_string(),
                    severity,
                    affected_object: target.identity().to_string(),
                    description: format!(
                        "SID filtering is not enforced on the {} trust from '{}' to '{}', allowing SID history injection.",
                        classification.kind.to_string().to_lowercase(),
                        source.identity(),
                        target.identity()
                    ),
                    impact: "Attackers in the trusted domain could forge credentials with privileged SIDs, leading to privilege escalation.".to_string(),
                    remediation: format!(
                        "Enable SID filtering: netdom trust {} /domain:{} /quarantine:yes",
                        source.identity(),
                        target.identity()
                    ),
                    details: details.clone(),
                });
                self.risk_score += score;
            }
            SidFilteringStatus::NotEnforcedMigration => {
                self.findings.push(TrustFinding {
                    category: "Domain Trusts".to_string(),
                    issue: "Migration Trust Without SID Filtering".to_string(),
                    severity: FindingSeverity::Low,
                    affected_object: target.identity().to_string(),
                    description: format!(
                        "The trust from '{}' to '{}' is a known migration trust and does not filter SIDs.",
                        source.identity(),
                        target.identity()
                    ),
                    impact: "Acceptable during a migration; becomes an escalation path once the migration is over.".to_string(),
                    remediation: "Re-enable SID filtering as soon as the migration completes.".to_string(),
                    details: details.clone(),
                });
                self.risk_score += 5;
            }
            _ => {}
        }

        if !edge.is_active() {
            self.findings.push(TrustFinding {
                category: "Domain Trusts".to_string(),
                issue: "Inactive Trust".to_string(),
                severity: FindingSeverity::Low,
                affected_object: target.identity().to_string(),
                description: format!(
                    "'{}' still holds a trust toward '{}' that is no longer in use.",
                    source.identity(),
                    target.identity()
                ),
                impact: "Unused trusts widen the attack surface without business value.".to_string(),
                remediation: format!(
                    "Verify and remove the trust: netdom trust {} /domain:{} /remove",
                    source.identity(),
                    target.identity()
                ),
                details,
            });
            self.risk_score += 5;
        }
    }

    pub fn analyze_data_quality(&mut self, issue: &DataQualityIssue) {
        self.data_quality_issues += 1;
        let (title, severity, affected, description) = match issue {
            DataQualityIssue::ConflictingAuthoritativeTrust { source, destination, .. } => (
                "Conflicting Trust Reports",
                FindingSeverity::Medium,
                destination.to_string(),
                format!("Reports disagree on the trust from '{}' to '{}'; the last processed was kept.", source, destination),
            ),
            DataQualityIssue::DuplicateReport { domain } => (
                "Duplicate Domain Report",
                FindingSeverity::Informational,
                domain.to_string(),
                format!("More than one report was supplied for '{}'.", domain),
            ),
            DataQualityIssue::DuplicateNameDistinctSid { existing, incoming } => (
                "Duplicate Domain Name",
                FindingSeverity::Medium,
                existing.to_string(),
                format!(
                    "Two domains are named '{}' with different SIDs ({} and {}).",
                    existing,
                    existing.sid().unwrap_or_default(),
                    incoming.sid().unwrap_or_default()
                ),
            ),
            DataQualityIssue::UnresolvedIdentity { identity } => (
                "Unresolved Domain Reference",
                FindingSeverity::Informational,
                identity.to_string(),
                format!("Domain known only by SID {} could not be matched and was dropped.", identity),
            ),
            DataQualityIssue::UnresolvedForest { domain, under_propagated } => (
                "Unresolved Forest Membership",
                if *under_propagated { FindingSeverity::Low } else { FindingSeverity::Informational },
                domain.to_string(),
                format!("The forest of '{}' could not be determined.", domain),
            ),
        };

        self.findings.push(TrustFinding {
            category: "Data Quality".to_string(),
            issue: title.to_string(),
            severity,
            affected_object: affected.clone(),
            description,
            impact: "The trust map may misrepresent this part of the environment.".to_string(),
            remediation: "Collect a fresh report from the affected domain.".to_string(),
            details: TrustDetails {
                target: Some(affected),
                ..Default::default()
            },
        });
    }

    pub fn generate_recommendations(&mut self) {
        let mut recommendations = Vec::new();

        if self.trusts_without_sid_filtering > 0 {
            recommendations.push(Recommendation::with_command(
                1,
                "Enforce SID Filtering on Cross-Forest Trusts",
                &format!(
                    "{} trust(s) do not filter SIDs, exposing trusting domains to SID history injection attacks.",
                    self.trusts_without_sid_filtering
                ),
                vec![
                    "Identify all trusts without SID filtering".to_string(),
                    "Verify applications don't rely on SID history for cross-domain access".to_string(),
                    "Enable SID filtering on each trust".to_string(),
                    "Test cross-domain authentication after enabling".to_string(),
                ],
                "netdom trust <TRUSTING_DOMAIN> /domain:<TRUSTED_DOMAIN> /quarantine:yes",
            ));
        }

        if self.bidirectional_trusts > 0 {
            recommendations.push(Recommendation::new(
                2,
                "Review Bidirectional Trust Requirements",
                &format!(
                    "{} bidirectional trust(s) found. Bidirectional trusts increase the attack surface.",
                    self.bidirectional_trusts
                ),
                vec![
                    "For each trust, determine if bidirectional access is actually required".to_string(),
                    "If only one-way access is needed, recreate as a one-way trust".to_string(),
                    "Document the business justification for remaining bidirectional trusts".to_string(),
                ],
            ));
        }

        if self.potentially_removed_domains > 0 {
            recommendations.push(Recommendation::new(
                3,
                "Clean Up Trusts to Decommissioned Domains",
                &format!(
                    "{} domain(s) appear to be gone but are still referenced by trusts.",
                    self.potentially_removed_domains
                ),
                vec![
                    "Confirm each domain is decommissioned".to_string(),
                    "Remove the trust objects on every remaining side".to_string(),
                ],
            ));
        }

        if self.data_quality_issues > 0 {
            recommendations.push(Recommendation::new(
                4,
                "Refresh Domain Reports",
                &format!(
                    "{} data-quality issue(s) were found while consolidating reports.",
                    self.data_quality_issues
                ),
                vec![
                    "Collect new reports from the affected domains".to_string(),
                    "Remove outdated reports from the consolidation input".to_string(),
                ],
            ));
        }

        self.recommendations = recommendations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::trust_attributes;
    use crate::config::GraphConfig;
    use crate::reports::{DomainReport, TrustFact};
    use chrono::Utc;

    fn id(name: &str) -> DomainIdentity {
        DomainIdentity::new(name, None).unwrap()
    }

    fn no_migration(_: &DomainIdentity, _: &DomainIdentity) -> bool {
        false
    }

    #[test]
    fn test_external_trust_without_sid_filtering_is_critical() {
        let report = DomainReport::new(id("corp.local"), None, Utc::now()).with_trust(TrustFact::new(
            id("partner.local"),
            TrustDirection::Outbound,
            0,
            true,
            Utc::now(),
        ));
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();
        let audit = TrustMapAudit::from_graph(&graph, &no_migration);

        assert_eq!(audit.total_domains, 2);
        assert_eq!(audit.total_trusts, 1);
        assert_eq!(audit.external_trusts, 1);
        assert_eq!(audit.trusts_without_sid_filtering, 1);
        assert_eq!(audit.severity_counts.critical, 1);
        assert_eq!(audit.recommendations[0].priority, 1);
    }

    #[test]
    fn test_migration_trust_downgraded() {
        let report = DomainReport::new(id("corp.local"), None, Utc::now()).with_trust(TrustFact::new(
            id("legacy.local"),
            TrustDirection::Outbound,
            0,
            true,
            Utc::now(),
        ));
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();
        let audit = TrustMapAudit::from_graph(&graph, &|_, target| target.name() == "legacy.local");

        assert_eq!(audit.trusts_without_sid_filtering, 0);
        assert!(audit.findings.iter().any(|f| f.issue == "Migration Trust Without SID Filtering"));
        assert_eq!(audit.severity_counts.critical, 0);
    }

    #[test]
    fn test_intra_forest_trusts_counted_not_flagged() {
        let report = DomainReport::new(id("child.corp.local"), Some(id("corp.local")), Utc::now()).with_trust(
            TrustFact::new(
                id("corp.local"),
                TrustDirection::Bidirectional,
                trust_attributes::WITHIN_FOREST,
                true,
                Utc::now(),
            ),
        );
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();
        let audit = TrustMapAudit::from_graph(&graph, &no_migration);

        assert_eq!(audit.intra_forest_trusts, 1);
        assert!(audit.findings.is_empty());
        assert_eq!(audit.risk_score, 0);
    }

    #[test]
    fn test_potentially_removed_domain_flagged() {
        let report = DomainReport::new(id("corp.local"), None, Utc::now()).with_trust(TrustFact::new(
            id("gone.local"),
            TrustDirection::Inbound,
            trust_attributes::QUARANTINED_DOMAIN,
            false,
            Utc::now(),
        ));
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();
        let audit = TrustMapAudit::from_graph(&graph, &no_migration);

        assert_eq!(audit.potentially_removed_domains, 1);
        assert!(audit.findings.iter().any(|f| f.issue == "Domain Potentially Removed"));
        assert!(audit.findings.iter().any(|f| f.issue == "Inactive Trust"));
    }

    #[test]
    fn test_data_quality_becomes_findings() {
        let a = DomainReport::new(id("corp.local"), None, Utc::now());
        let b = DomainReport::new(id("corp.local"), None, Utc::now());
        let graph = DomainGraph::build(&[a, b], &[], &GraphConfig::default()).unwrap();
        let audit = TrustMapAudit::from_graph(&graph, &no_migration);

        assert_eq!(audit.data_quality_issues, 1);
        assert!(audit.findings.iter().all(|f| f.category == "Data Quality"));
        assert!(audit.recommendations.iter().any(|r| r.title == "Refresh Domain Reports"));
    }
}
