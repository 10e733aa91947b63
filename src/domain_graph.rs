//! Domain Graph Module
//!
//! Consolidates independently collected domain reports into one directed graph
//! of domain-to-domain trusts. Evidence is applied in reliability order, each
//! tier over the whole input before the next one starts:
//!
//! 1. every report seeds its own node and forest
//! 2. direct trusts from the reports (authoritative)
//! 3. known forest members nested in trusts (derived)
//! 4. reachable-domain hints from exploration (derived)
//! 5. forest inference across intra-forest edges
//! 6. overlay records
//! 7. pruning of hidden domains
//!
//! Lower tiers never overwrite what a higher tier established. Same-tier
//! contradictions are kept as last-processed-wins and recorded in the
//! data-quality ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::config::{ForestInference, GraphConfig};
use crate::domain_identity::{is_duplicate_name_distinct_sid, DomainIdentity};
use crate::domain_node::{DomainNode, NodeId};
use crate::errors::{Result, TrustMapError};
use crate::reports::{DomainReport, OverlayRecord};
use crate::trust_edge::{EdgeFacts, EdgeUpdate, Provenance, TrustEdge};

/// Input anomalies surfaced while building, never silently fixed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataQualityIssue {
    /// Two authoritative writes disagree on one edge; the later one was kept
    ConflictingAuthoritativeTrust {
        source: DomainIdentity,
        destination: DomainIdentity,
        previous: EdgeFacts,
        incoming: EdgeFacts,
    },
    /// More than one report for the same domain; the later one was kept
    DuplicateReport { domain: DomainIdentity },
    /// Two domains share a name but not a SID; both are kept
    DuplicateNameDistinctSid {
        existing: DomainIdentity,
        incoming: DomainIdentity,
    },
    /// SID-only reference that matches no known domain; dropped
    UnresolvedIdentity { identity: DomainIdentity },
    /// Intra-forest edges but no forest after inference. `under_propagated`
    /// means a neighbor knows a forest and inference stopped early.
    UnresolvedForest {
        domain: DomainIdentity,
        under_propagated: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DomainGraph {
    nodes: BTreeMap<NodeId, DomainNode>,
    /// Canonical (lower-cased) name to nodes; more than one only for
    /// same-name domains with distinct SIDs
    names: HashMap<String, Vec<NodeId>>,
    /// Upper-cased SID to node, filled as SIDs are learned
    sids: HashMap<String, NodeId>,
    next_id: NodeId,
    data_quality: Vec<DataQualityIssue>,
    ignore_data_quality: bool,
}

fn sid_key(sid: &str) -> String {
    sid.to_ascii_uppercase()
}

fn sids_compatible(a: &DomainIdentity, b: &DomainIdentity) -> bool {
    match (a.sid(), b.sid()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => true,
    }
}

impl DomainGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a finished graph from reports and overlay records
    pub fn build(reports: &[DomainReport], overlays: &[OverlayRecord], config: &GraphConfig) -> Result<Self> {
        config.validate()?;
        for report in reports {
            report.validate()?;
        }
        for overlay in overlays {
            overlay.domain.validate()?;
        }

        info!(
            "Building trust map from {} report(s) and {} overlay record(s)",
            reports.len(),
            overlays.len()
        );

        let mut graph = DomainGraph {
            ignore_data_quality: !config.record_data_quality,
            ..Default::default()
        };

        graph.seed_reports(reports)?;
        graph.link_direct_trusts(reports)?;
        graph.apply_forest_member_hints(reports)?;
        graph.apply_reachable_hints(reports)?;
        graph.infer_forests(&config.forest_inference);
        graph.apply_overlays(overlays);
        if config.apply_overlay_hide {
            graph.prune_hidden();
        }

        info!(
            "Trust map built: {} domain(s), {} edge(s), {} data-quality issue(s)",
            graph.nodes.len(),
            graph.edge_count(),
            graph.data_quality.len()
        );
        Ok(graph)
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// Id-ordered snapshot of every node
    pub fn all_nodes(&self) -> Vec<&DomainNode> {
        self.nodes.values().collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomainNode> {
        self.nodes.get(&id)
    }

    pub fn lookup(&self, identity: &DomainIdentity) -> Option<&DomainNode> {
        self.resolve(identity).and_then(|id| self.nodes.get(&id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.edge_count()).sum()
    }

    /// Nodes without a report whose every edge is inactive
    pub fn potentially_removed(&self) -> Vec<&DomainNode> {
        self.nodes.values().filter(|n| n.is_potentially_removed()).collect()
    }

    pub fn data_quality(&self) -> &[DataQualityIssue] {
        &self.data_quality
    }

    /// Find the node an identity refers to, without learning anything
    pub fn resolve(&self, identity: &DomainIdentity) -> Option<NodeId> {
        if let Some(id) = identity.sid().and_then(|sid| self.sids.get(&sid_key(sid))) {
            return Some(*id);
        }
        if !identity.is_named() {
            return None;
        }
        // A node listed under the name key (its own name or an alias) matches
        // unless both sides carry different SIDs
        self.names
            .get(&identity.canonical_name())?
            .iter()
            .copied()
            .find(|id| {
                self.nodes
                    .get(id)
                    .map_or(false, |n| sids_compatible(n.identity(), identity))
            })
    }

    fn has_report(&self, identity: &DomainIdentity) -> bool {
        self.lookup(identity).map_or(false, |n| n.has_report())
    }

    fn identity_of(&self, id: NodeId) -> Result<DomainIdentity> {
        self.nodes
            .get(&id)
            .map(|n| n.identity().clone())
            .ok_or_else(|| TrustMapError::NotFound(format!("domain node {}", id)))
    }

    fn record(&mut self, issue: DataQualityIssue) {
        if !self.ignore_data_quality {
            self.data_quality.push(issue);
        }
    }

    // ----------------------------------------------------------------------
    // Node and edge primitives
    // ----------------------------------------------------------------------

    /// Return the node for `identity`, creating it with the next sequence id
    /// on first reference. An existing node keeps its reference date but
    /// learns a SID it did not know yet.
    pub fn ensure(&mut self, identity: &DomainIdentity, reference_date: DateTime<Utc>) -> Result<NodeId> {
        identity.validate()?;

        if let Some(id) = self.resolve(identity) {
            self.learn_identity(id, identity);
            return Ok(id);
        }

        if !identity.is_named() {
            warn!("Dropping reference to unknown domain known only by SID {}", identity);
            self.record(DataQualityIssue::UnresolvedIdentity {
                identity: identity.clone(),
            });
            return Err(TrustMapError::UnresolvedIdentity(identity.to_string()));
        }

        let canonical = identity.canonical_name();
        let collisions: Vec<DomainIdentity> = self
            .names
            .get(&canonical)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| n.identity())
            .filter(|existing| {
                is_duplicate_name_distinct_sid(existing, identity) || !sids_compatible(existing, identity)
            })
            .cloned()
            .collect();
        for existing in collisions {
            warn!(
                "Domain name {} is used by two SIDs ({} and {})",
                identity,
                existing.sid().unwrap_or_default(),
                identity.sid().unwrap_or_default()
            );
            self.record(DataQualityIssue::DuplicateNameDistinctSid {
                existing,
                incoming: identity.clone(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, DomainNode::new(id, identity.clone(), reference_date));
        self.names.entry(canonical).or_default().push(id);
        if let Some(sid) = identity.sid() {
            self.sids.insert(sid_key(sid), id);
        }
        debug!("Created domain node {} for {}", id, identity);
        Ok(id)
    }

    /// Reconcile a stored identity with a new reference to the same domain
    fn learn_identity(&mut self, id: NodeId, incoming: &DomainIdentity) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let had_sid = node.identity().sid().is_some();
        let mut incoming_copy = incoming.clone();
        node.identity_mut().reconcile_with(&mut incoming_copy);

        if !had_sid {
            if let Some(sid) = node.identity().sid() {
                debug!("Domain {} learned SID {}", node.identity(), sid);
                self.sids.insert(sid_key(sid), id);
            }
        }

        // A SID match under another name (renamed domain) becomes an alias
        if incoming.is_named() {
            let alias = incoming.canonical_name();
            let ids = self.names.entry(alias).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// Upsert the edge `source -> destination`.
    ///
    /// A new edge gets a derived mirror on the destination. An existing edge
    /// only takes authoritative data; derived data never downgrades it.
    pub fn link(
        &mut self,
        source: NodeId,
        destination: NodeId,
        facts: EdgeFacts,
        authoritative: bool,
    ) -> Result<EdgeUpdate> {
        if source == destination {
            debug!("Ignoring trust of domain node {} with itself", source);
            return Ok(EdgeUpdate::Unchanged);
        }
        if !self.nodes.contains_key(&destination) {
            return Err(TrustMapError::NotFound(format!("domain node {}", destination)));
        }
        let provenance = Provenance::from_authoritative(authoritative);
        let source_node = self
            .nodes
            .get_mut(&source)
            .ok_or_else(|| TrustMapError::NotFound(format!("domain node {}", source)))?;

        if let Some(edge) = source_node.edge_mut(destination) {
            let update = edge.offer(facts.clone(), provenance);
            if let EdgeUpdate::Replaced { previous } = &update {
                if *previous != facts {
                    let (source_identity, destination_identity) =
                        (self.identity_of(source)?, self.identity_of(destination)?);
                    warn!(
                        "Conflicting authoritative trust data for {} -> {}; keeping the last processed",
                        source_identity, destination_identity
                    );
                    self.record(DataQualityIssue::ConflictingAuthoritativeTrust {
                        source: source_identity,
                        destination: destination_identity,
                        previous: previous.clone(),
                        incoming: facts,
                    });
                }
            }
            return Ok(update);
        }

        let edge = TrustEdge::new(source, destination, facts, provenance);
        let mirror = edge.mirror();
        source_node.insert_edge(edge);
        if let Some(destination_node) = self.nodes.get_mut(&destination) {
            destination_node.insert_edge_if_absent(mirror);
        }
        Ok(EdgeUpdate::Created)
    }

    pub fn set_forest(&mut self, id: NodeId, forest: Option<&DomainIdentity>) -> bool {
        self.nodes.get_mut(&id).map_or(false, |n| n.set_forest(forest))
    }

    /// One inference step for one node: adopt the forest of the first
    /// intra-forest neighbor that knows it.
    pub fn enrich_forest_information(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if node.forest().is_some() {
            return false;
        }
        let adopted = node
            .intra_forest_neighbors()
            .find_map(|neighbor| self.nodes.get(&neighbor).and_then(|n| n.forest().cloned()));
        match adopted {
            Some(forest) => self.set_forest(id, Some(&forest)),
            None => false,
        }
    }

    /// Run the single-step enrichment over every node once
    pub fn enrichment_pass(&mut self) -> usize {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.into_iter().filter(|id| self.enrich_forest_information(*id)).count()
    }

    /// Breadth-first forest propagation. A node adopts a forest when one of
    /// its intra-forest edges points at a node that knows its forest.
    pub fn propagate_forests(&mut self, hop_limit: Option<usize>) -> usize {
        // node -> nodes holding an intra-forest edge toward it
        let mut adopters: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in self.nodes.values() {
            for neighbor in node.intra_forest_neighbors() {
                adopters.entry(neighbor).or_default().push(node.id());
            }
        }

        let mut frontier: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.forest().is_some())
            .map(|n| n.id())
            .collect();
        let mut hops = 0;
        let mut adopted = 0;

        while !frontier.is_empty() {
            if hop_limit.map_or(false, |limit| hops >= limit) {
                debug!("Forest propagation stopped at hop limit {}", hops);
                break;
            }
            let mut next = Vec::new();
            for id in frontier {
                let forest = self.nodes.get(&id).and_then(|n| n.forest().cloned());
                for candidate in adopters.get(&id).into_iter().flatten() {
                    if self.set_forest(*candidate, forest.as_ref()) {
                        next.push(*candidate);
                        adopted += 1;
                    }
                }
            }
            frontier = next;
            hops += 1;
        }
        adopted
    }

    /// Remove domains and every edge pointing at them. Absent ones are ignored.
    pub fn remove_domains(&mut self, identities: &[DomainIdentity]) -> Vec<DomainIdentity> {
        let ids: BTreeSet<NodeId> = identities.iter().filter_map(|i| self.resolve(i)).collect();
        self.remove_nodes(&ids)
    }

    fn remove_nodes(&mut self, ids: &BTreeSet<NodeId>) -> Vec<DomainIdentity> {
        let removed: Vec<DomainIdentity> = ids
            .iter()
            .filter_map(|id| self.nodes.remove(id))
            .map(|n| n.identity().clone())
            .collect();
        if removed.is_empty() {
            return removed;
        }

        for entries in self.names.values_mut() {
            entries.retain(|id| !ids.contains(id));
        }
        self.names.retain(|_, entries| !entries.is_empty());
        self.sids.retain(|_, id| !ids.contains(id));

        let mut dropped_edges = 0;
        for node in self.nodes.values_mut() {
            dropped_edges += node.remove_edges_to(ids);
        }
        debug!(
            "Removed {} domain(s) and {} edge(s) pointing at them",
            removed.len(),
            dropped_edges
        );
        removed
    }

    // ----------------------------------------------------------------------
    // Build phases
    // ----------------------------------------------------------------------

    fn seed_reports(&mut self, reports: &[DomainReport]) -> Result<()> {
        for report in reports {
            let id = self.ensure(&report.domain, report.reference_date)?;
            let previous = self
                .nodes
                .get_mut(&id)
                .and_then(|n| n.attach_report(report.clone()));
            if previous.is_some() {
                warn!("Domain {} has more than one report; keeping the last processed", report.domain);
                self.record(DataQualityIssue::DuplicateReport {
                    domain: report.domain.clone(),
                });
            }
            self.set_forest(id, report.forest.as_ref());
        }
        debug!("Seeded {} domain(s) from reports", self.nodes.len());
        Ok(())
    }

    fn link_direct_trusts(&mut self, reports: &[DomainReport]) -> Result<()> {
        let mut linked = 0;
        for report in reports {
            let source = self.ensure(&report.domain, report.reference_date)?;
            for trust in &report.direct_trusts {
                let destination = self.ensure(&trust.remote, report.reference_date)?;
                self.link(source, destination, trust.edge_facts(), true)?;
                linked += 1;
            }
        }
        debug!("Linked {} direct trust(s)", linked);
        Ok(())
    }

    fn apply_forest_member_hints(&mut self, reports: &[DomainReport]) -> Result<()> {
        for report in reports {
            for trust in &report.direct_trusts {
                let Some(members) = &trust.known_forest_members else {
                    continue;
                };
                let partner = self.ensure(&trust.remote, report.reference_date)?;
                for member in members {
                    if self.has_report(&member.domain) {
                        debug!("Skipping forest member hint for {}: it has its own report", member.domain);
                        continue;
                    }
                    let member_id = self.ensure(&member.domain, report.reference_date)?;
                    if member_id == partner {
                        continue;
                    }
                    self.link(member_id, partner, EdgeFacts::intra_forest(Some(member.created_at)), false)?;
                    let forest = member
                        .forest
                        .as_ref()
                        .filter(|f| f.is_named())
                        .unwrap_or(&trust.remote);
                    self.set_forest(member_id, Some(forest));
                }
            }
        }
        Ok(())
    }

    fn apply_reachable_hints(&mut self, reports: &[DomainReport]) -> Result<()> {
        for report in reports {
            let Some(hints) = &report.reachable_domains else {
                continue;
            };
            let own_forest = report
                .forest
                .clone()
                .filter(|f| f.is_named())
                .unwrap_or_else(|| report.domain.clone());
            if !own_forest.same_domain(&report.domain) && self.has_report(&own_forest) {
                debug!(
                    "Skipping reachable domains of {}: forest {} has its own report",
                    report.domain, own_forest
                );
                continue;
            }

            let own_root = self.ensure(&own_forest, report.reference_date)?;
            self.set_forest(own_root, Some(&own_forest));

            for hint in hints {
                let remote_forest = hint
                    .forest
                    .as_ref()
                    .filter(|f| f.is_named() && !f.same_domain(&hint.domain));

                match remote_forest {
                    None => {
                        let Ok(hinted) = self.ensure(&hint.domain, report.reference_date) else {
                            continue;
                        };
                        if hinted == own_root {
                            continue;
                        }
                        self.link(own_root, hinted, EdgeFacts::cross_forest(), false)?;
                        let hinted_identity = self.identity_of(hinted)?;
                        self.set_forest(hinted, Some(&hinted_identity));
                    }
                    Some(forest) => {
                        if self.has_report(forest) {
                            continue;
                        }
                        let Ok(child) = self.ensure(&hint.domain, report.reference_date) else {
                            continue;
                        };
                        let remote_root = self.ensure(forest, report.reference_date)?;
                        self.set_forest(remote_root, Some(forest));
                        self.link(own_root, remote_root, EdgeFacts::cross_forest(), false)?;

                        if child != remote_root {
                            self.link(child, remote_root, EdgeFacts::intra_forest(None), false)?;
                            self.set_forest(child, Some(forest));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn infer_forests(&mut self, mode: &ForestInference) {
        let adopted = match mode {
            ForestInference::FixedPasses { passes } => (0..*passes).map(|_| self.enrichment_pass()).sum(),
            ForestInference::Propagate { hop_limit } => self.propagate_forests(*hop_limit),
        };
        debug!("Forest inference assigned {} forest(s)", adopted);
        self.flag_unresolved_forests();
    }

    fn flag_unresolved_forests(&mut self) {
        let unresolved: Vec<(DomainIdentity, bool)> = self
            .nodes
            .values()
            .filter(|n| n.forest().is_none() && n.intra_forest_neighbors().next().is_some())
            .map(|n| {
                let under_propagated = n
                    .intra_forest_neighbors()
                    .any(|neighbor| self.nodes.get(&neighbor).map_or(false, |m| m.forest().is_some()));
                (n.identity().clone(), under_propagated)
            })
            .collect();

        for (domain, under_propagated) in unresolved {
            if under_propagated {
                warn!("Forest of {} left unresolved: inference stopped before reaching it", domain);
            } else {
                debug!("Forest of {} is unknown", domain);
            }
            self.record(DataQualityIssue::UnresolvedForest {
                domain,
                under_propagated,
            });
        }
    }

    fn apply_overlays(&mut self, overlays: &[OverlayRecord]) {
        for overlay in overlays {
            match self.resolve(&overlay.domain) {
                Some(id) => {
                    if let Some(node) = self.nodes.get_mut(&id) {
                        node.attach_overlay(overlay.clone());
                    }
                }
                None => debug!("Overlay record for unknown domain {}", overlay.domain),
            }
        }
    }

    fn prune_hidden(&mut self) {
        let hidden: BTreeSet<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.is_hidden())
            .map(|n| n.id())
            .collect();
        if hidden.is_empty() {
            return;
        }
        let removed = self.remove_nodes(&hidden);
        info!("Pruned {} hidden domain(s)", removed.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::trust_attributes;
    use crate::reports::{ForestMemberHint, ReachableHint, TrustFact};
    use crate::trust_edge::TrustDirection;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn id(name: &str) -> DomainIdentity {
        DomainIdentity::new(name, None).unwrap()
    }

    fn sid_id(name: &str, sid: &str) -> DomainIdentity {
        DomainIdentity::new(name, Some(sid)).unwrap()
    }

    fn facts(direction: TrustDirection, attributes: u32, active: bool) -> EdgeFacts {
        EdgeFacts::new(direction, attributes, active, Some(date()))
    }

    #[test]
    fn test_ensure_assigns_sequence_and_keeps_date() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("a.local"), date()).unwrap();
        let b = graph.ensure(&id("b.local"), date()).unwrap();
        assert_eq!((a, b), (0, 1));

        let later = date() + chrono::Duration::days(30);
        assert_eq!(graph.ensure(&id("A.LOCAL"), later).unwrap(), a);
        assert_eq!(graph.node(a).unwrap().reference_date(), date());
    }

    #[test]
    fn test_ensure_learns_sid_and_resolves_by_it() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("corp.local"), date()).unwrap();
        graph.ensure(&sid_id("CORP.local", "S-1-5-21-1-2-3"), date()).unwrap();

        assert_eq!(graph.node(a).unwrap().identity().sid(), Some("S-1-5-21-1-2-3"));
        let by_sid = DomainIdentity::from_sid("S-1-5-21-1-2-3").unwrap();
        assert_eq!(graph.resolve(&by_sid), Some(a));
    }

    #[test]
    fn test_renamed_domain_matched_by_sid() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&sid_id("old.local", "S-1-5-21-1-2-3"), date()).unwrap();
        let b = graph.ensure(&sid_id("new.local", "S-1-5-21-1-2-3"), date()).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.lookup(&id("new.local")).unwrap().id(), a);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_renamed_domain_alias_resolves_by_name() {
        let mut graph = DomainGraph::new();
        let renamed = graph.ensure(&sid_id("old.local", "S-1-5-21-1-2-3"), date()).unwrap();
        graph.ensure(&sid_id("new.local", "S-1-5-21-1-2-3"), date()).unwrap();

        assert_eq!(graph.resolve(&id("NEW.local")), Some(renamed));
        assert_eq!(graph.ensure(&id("new.local"), date()).unwrap(), renamed);
        assert_eq!(graph.len(), 1);

        let other = graph.ensure(&sid_id("new.local", "S-1-5-21-4-4-4"), date()).unwrap();
        assert_ne!(other, renamed);
        assert!(matches!(
            graph.data_quality(),
            [DataQualityIssue::DuplicateNameDistinctSid { .. }]
        ));
    }

    #[test]
    fn test_trust_to_renamed_domain_reuses_node() {
        let reports = vec![
            DomainReport::new(sid_id("new.local", "S-1-5-21-1-2-3"), None, date()),
            DomainReport::new(id("corp.local"), None, date())
                .with_trust(TrustFact::new(
                    sid_id("old.local", "S-1-5-21-1-2-3"),
                    TrustDirection::Outbound,
                    0,
                    true,
                    date(),
                ))
                .with_trust(TrustFact::new(id("old.local"), TrustDirection::Outbound, 0, true, date())),
        ];
        let graph = DomainGraph::build(&reports, &[], &GraphConfig::default()).unwrap();

        assert_eq!(graph.len(), 2);
        let renamed = graph.lookup(&id("old.local")).unwrap();
        assert_eq!(renamed.identity().name(), "new.local");
        assert_eq!(graph.lookup(&id("corp.local")).unwrap().edge_count(), 1);
    }

    #[test]
    fn test_duplicate_name_distinct_sid_kept_apart() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&sid_id("corp.local", "S-1-5-21-1-1-1"), date()).unwrap();
        let b = graph.ensure(&sid_id("corp.local", "S-1-5-21-2-2-2"), date()).unwrap();
        assert_ne!(a, b);
        assert!(matches!(
            graph.data_quality(),
            [DataQualityIssue::DuplicateNameDistinctSid { .. }]
        ));
    }

    #[test]
    fn test_unknown_sid_only_identity_is_unresolved() {
        let mut graph = DomainGraph::new();
        let partial = DomainIdentity::from_sid("S-1-5-21-9-9-9").unwrap();
        let err = graph.ensure(&partial, date()).unwrap_err();
        assert!(matches!(err, TrustMapError::UnresolvedIdentity(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_link_creates_mirror() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("a.local"), date()).unwrap();
        let b = graph.ensure(&id("b.local"), date()).unwrap();

        let update = graph.link(a, b, facts(TrustDirection::Outbound, 0, true), true).unwrap();
        assert_eq!(update, EdgeUpdate::Created);

        let forward = graph.node(a).unwrap().edge_to(b).unwrap();
        assert!(forward.is_authoritative());
        let mirror = graph.node(b).unwrap().edge_to(a).unwrap();
        assert_eq!(mirror.direction(), TrustDirection::Inbound);
        assert_eq!(mirror.provenance(), Provenance::Derived);
    }

    #[test]
    fn test_link_derived_does_not_downgrade() {
        let mut graph = DomainGraph::new();
        let d = graph.ensure(&id("d.local"), date()).unwrap();
        let e = graph.ensure(&id("e.local"), date()).unwrap();
        graph.link(d, e, facts(TrustDirection::Bidirectional, 0, true), true).unwrap();

        let update = graph.link(d, e, facts(TrustDirection::Inbound, 0, false), false).unwrap();
        assert_eq!(update, EdgeUpdate::Unchanged);
        let edge = graph.node(d).unwrap().edge_to(e).unwrap();
        assert_eq!(edge.direction(), TrustDirection::Bidirectional);
        assert!(edge.is_active());
    }

    #[test]
    fn test_link_authoritative_conflict_recorded() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("a.local"), date()).unwrap();
        let b = graph.ensure(&id("b.local"), date()).unwrap();
        graph.link(a, b, facts(TrustDirection::Outbound, 0, true), true).unwrap();
        graph.link(a, b, facts(TrustDirection::Outbound, 0, true), true).unwrap();
        assert!(graph.data_quality().is_empty());

        graph.link(a, b, facts(TrustDirection::Outbound, 0, false), true).unwrap();
        assert!(!graph.node(a).unwrap().edge_to(b).unwrap().is_active());
        assert!(matches!(
            graph.data_quality(),
            [DataQualityIssue::ConflictingAuthoritativeTrust { .. }]
        ));
    }

    #[test]
    fn test_link_unknown_node_fails() {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("a.local"), date()).unwrap();
        assert!(matches!(
            graph.link(a, 42, facts(TrustDirection::Outbound, 0, true), true),
            Err(TrustMapError::NotFound(_))
        ));
    }

    fn chain() -> (DomainGraph, [NodeId; 3]) {
        let mut graph = DomainGraph::new();
        let a = graph.ensure(&id("a.corp.local"), date()).unwrap();
        let b = graph.ensure(&id("b.corp.local"), date()).unwrap();
        let c = graph.ensure(&id("c.corp.local"), date()).unwrap();
        let within = facts(TrustDirection::Bidirectional, trust_attributes::WITHIN_FOREST, true);
        graph.link(c, b, within.clone(), true).unwrap();
        graph.link(b, a, within, true).unwrap();
        graph.set_forest(a, Some(&id("corp.local")));
        (graph, [a, b, c])
    }

    #[test]
    fn test_two_enrichment_passes_cover_three_chain() {
        let (mut graph, nodes) = chain();
        graph.enrichment_pass();
        graph.enrichment_pass();
        for n in nodes {
            assert_eq!(graph.node(n).unwrap().forest().unwrap().name(), "corp.local");
        }
    }

    #[test]
    fn test_propagation_reaches_deep_chain() {
        let mut graph = DomainGraph::new();
        let within = facts(TrustDirection::Bidirectional, trust_attributes::WITHIN_FOREST, true);
        let ids: Vec<NodeId> = (0..6)
            .map(|i| graph.ensure(&id(&format!("d{}.corp.local", i)), date()).unwrap())
            .collect();
        for pair in ids.windows(2) {
            graph.link(pair[0], pair[1], within.clone(), true).unwrap();
        }
        graph.set_forest(ids[5], Some(&id("corp.local")));

        assert_eq!(graph.propagate_forests(None), 5);
        assert!(ids.iter().all(|n| graph.node(*n).unwrap().forest().is_some()));
    }

    #[test]
    fn test_hop_limit_flags_under_propagation() {
        let mut graph = DomainGraph::new();
        let within = facts(TrustDirection::Bidirectional, trust_attributes::WITHIN_FOREST, true);
        let ids: Vec<NodeId> = (0..4)
            .map(|i| graph.ensure(&id(&format!("d{}.corp.local", i)), date()).unwrap())
            .collect();
        for pair in ids.windows(2) {
            graph.link(pair[0], pair[1], within.clone(), true).unwrap();
        }
        graph.set_forest(ids[0], Some(&id("corp.local")));

        graph.infer_forests(&ForestInference::Propagate { hop_limit: Some(2) });
        assert!(graph.node(ids[3]).unwrap().forest().is_none());
        assert!(graph.data_quality().iter().any(|issue| matches!(
            issue,
            DataQualityIssue::UnresolvedForest { under_propagated: true, .. }
        )));
    }

    #[test]
    fn test_remove_domains_cascades() {
        let mut graph = DomainGraph::new();
        let h = graph.ensure(&id("h.local"), date()).unwrap();
        let a = graph.ensure(&id("a.local"), date()).unwrap();
        let b = graph.ensure(&id("b.local"), date()).unwrap();
        let out = facts(TrustDirection::Outbound, 0, true);
        graph.link(h, a, out.clone(), true).unwrap();
        graph.link(h, b, out.clone(), true).unwrap();
        graph.link(a, b, out, true).unwrap();

        let removed = graph.remove_domains(&[id("h.local"), id("absent.local")]);
        assert_eq!(removed, vec![id("h.local")]);
        assert!(graph.lookup(&id("h.local")).is_none());
        assert!(graph.node(a).unwrap().edge_to(h).is_none());
        assert!(graph.node(b).unwrap().edge_to(h).is_none());
        assert!(graph.node(a).unwrap().edge_to(b).is_some());

        assert!(graph.remove_domains(&[id("h.local")]).is_empty());
    }

    #[test]
    fn test_forest_member_hint_skipped_when_member_reported() {
        let root = DomainReport::new(id("root.local"), Some(id("root.local")), date());
        let child = DomainReport::new(id("child.root.local"), Some(id("root.local")), date());
        let other = DomainReport::new(id("other.local"), None, date()).with_trust(
            TrustFact::new(id("root.local"), TrustDirection::Bidirectional, trust_attributes::FOREST_TRANSITIVE, true, date())
                .with_known_member(ForestMemberHint {
                    domain: id("child.root.local"),
                    created_at: date(),
                    forest: None,
                }),
        );
        let graph = DomainGraph::build(&[root, child, other], &[], &GraphConfig::default()).unwrap();
        let child = graph.lookup(&id("child.root.local")).unwrap();
        assert_eq!(child.edge_count(), 0);
    }

    #[test]
    fn test_reachable_hint_with_distinct_forest() {
        let report = DomainReport::new(id("corp.local"), Some(id("corp.local")), date()).with_reachable(ReachableHint {
            domain: id("eu.partner.local"),
            forest: Some(id("partner.local")),
        });
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();
        assert_eq!(graph.len(), 3);

        let corp = graph.lookup(&id("corp.local")).unwrap();
        let partner = graph.lookup(&id("partner.local")).unwrap();
        let child = graph.lookup(&id("eu.partner.local")).unwrap();

        let cross = corp.edge_to(partner.id()).unwrap();
        assert_eq!(cross.attributes(), trust_attributes::FOREST_TRANSITIVE);
        assert!(!cross.is_authoritative());
        assert!(child.edge_to(partner.id()).unwrap().is_intra_forest());
        assert_eq!(child.forest().unwrap().name(), "partner.local");
        assert_eq!(partner.forest().unwrap().name(), "partner.local");
    }

    #[test]
    fn test_reachable_hint_without_forest_is_self_rooted() {
        let report = DomainReport::new(id("child.corp.local"), Some(id("corp.local")), date())
            .with_reachable(ReachableHint {
                domain: id("lonely.local"),
                forest: Some(id("LONELY.local")),
            });
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();

        let corp = graph.lookup(&id("corp.local")).unwrap();
        let lonely = graph.lookup(&id("lonely.local")).unwrap();
        assert_eq!(corp.forest().unwrap().name(), "corp.local");
        assert_eq!(lonely.forest().unwrap().name(), "lonely.local");
        assert!(corp.edge_to(lonely.id()).is_some());
    }

    #[test]
    fn test_reachable_hints_skipped_when_forest_reported() {
        let root = DomainReport::new(id("corp.local"), Some(id("corp.local")), date());
        let child = DomainReport::new(id("child.corp.local"), Some(id("corp.local")), date())
            .with_reachable(ReachableHint {
                domain: id("elsewhere.local"),
                forest: None,
            });
        let graph = DomainGraph::build(&[root, child], &[], &GraphConfig::default()).unwrap();
        assert!(graph.lookup(&id("elsewhere.local")).is_none());
    }

    #[test]
    fn test_sid_only_hint_resolves_known_domain() {
        let partner = sid_id("partner.local", "S-1-5-21-5-5-5");
        let report = DomainReport::new(id("corp.local"), None, date())
            .with_trust(TrustFact::new(partner.clone(), TrustDirection::Outbound, 0, false, date()))
            .with_reachable(ReachableHint {
                domain: DomainIdentity::from_sid("S-1-5-21-5-5-5").unwrap(),
                forest: None,
            })
            .with_reachable(ReachableHint {
                domain: DomainIdentity::from_sid("S-1-5-21-6-6-6").unwrap(),
                forest: None,
            });
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();

        assert_eq!(graph.len(), 2);
        let corp = graph.lookup(&id("corp.local")).unwrap();
        let partner = graph.lookup(&partner).unwrap();
        let edge = corp.edge_to(partner.id()).unwrap();
        assert!(edge.is_authoritative());
        assert!(!edge.is_active());
        assert!(graph
            .data_quality()
            .iter()
            .any(|issue| matches!(issue, DataQualityIssue::UnresolvedIdentity { .. })));
    }

    #[test]
    fn test_unresolved_child_leaves_no_remote_root() {
        let report = DomainReport::new(id("corp.local"), Some(id("corp.local")), date()).with_reachable(ReachableHint {
            domain: DomainIdentity::from_sid("S-1-5-21-8-8-8").unwrap(),
            forest: Some(id("partner.local")),
        });
        let graph = DomainGraph::build(&[report], &[], &GraphConfig::default()).unwrap();

        assert_eq!(graph.len(), 1);
        assert!(graph.lookup(&id("partner.local")).is_none());
        assert_eq!(graph.lookup(&id("corp.local")).unwrap().edge_count(), 0);
    }

    #[test]
    fn test_duplicate_report_recorded() {
        let first = DomainReport::new(id("corp.local"), None, date());
        let second = DomainReport::new(id("corp.local"), None, date());
        let graph = DomainGraph::build(&[first, second], &[], &GraphConfig::default()).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(matches!(graph.data_quality(), [DataQualityIssue::DuplicateReport { .. }]));
    }

    #[test]
    fn test_data_quality_can_be_disabled() {
        let first = DomainReport::new(id("corp.local"), None, date());
        let second = DomainReport::new(id("corp.local"), None, date());
        let config = GraphConfig {
            record_data_quality: false,
            ..Default::default()
        };
        let graph = DomainGraph::build(&[first, second], &[], &config).unwrap();
        assert!(graph.data_quality().is_empty());
    }

    #[test]
    fn test_overlay_hide_respects_config() {
        let report = DomainReport::new(id("corp.local"), None, date());
        let overlays = vec![OverlayRecord::hidden(id("corp.local"))];

        let pruned = DomainGraph::build(&[report.clone()], &overlays, &GraphConfig::default()).unwrap();
        assert!(pruned.is_empty());

        let config = GraphConfig {
            apply_overlay_hide: false,
            ..Default::default()
        };
        let kept = DomainGraph::build(&[report], &overlays, &config).unwrap();
        assert!(kept.lookup(&id("corp.local")).unwrap().is_hidden());
    }

    #[test]
    fn test_build_rejects_malformed_input() {
        let bad: DomainReport = serde_json::from_str(
            r#"{"domain": {"name": "corp.local", "sid": "S-1-x"}, "reference_date": "2024-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            DomainGraph::build(&[bad], &[], &GraphConfig::default()),
            Err(TrustMapError::ValidationError(_))
        ));
    }
}
