//! Domain Node Module
//!
//! Everything the trust map knows about one domain: its identity, forest,
//! freshness, the authoritative report if one was collected, the overlay
//! record, and the outgoing trust edges keyed by destination node.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain_identity::DomainIdentity;
use crate::reports::{DomainReport, OverlayRecord};
use crate::trust_edge::TrustEdge;

/// Sequence number assigned when a node is first referenced
pub type NodeId = u32;

#[derive(Debug, Clone, Serialize)]
pub struct DomainNode {
    id: NodeId,
    identity: DomainIdentity,
    forest: Option<DomainIdentity>,
    reference_date: DateTime<Utc>,
    report: Option<DomainReport>,
    overlay: Option<OverlayRecord>,
    edges: BTreeMap<NodeId, TrustEdge>,
}

impl DomainNode {
    pub(crate) fn new(id: NodeId, identity: DomainIdentity, reference_date: DateTime<Utc>) -> Self {
        Self {
            id,
            identity,
            forest: None,
            reference_date,
            report: None,
            overlay: None,
            edges: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identity(&self) -> &DomainIdentity {
        &self.identity
    }

    pub(crate) fn identity_mut(&mut self) -> &mut DomainIdentity {
        &mut self.identity
    }

    pub fn forest(&self) -> Option<&DomainIdentity> {
        self.forest.as_ref()
    }

    pub fn reference_date(&self) -> DateTime<Utc> {
        self.reference_date
    }

    pub fn report(&self) -> Option<&DomainReport> {
        self.report.as_ref()
    }

    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }

    pub fn overlay(&self) -> Option<&OverlayRecord> {
        self.overlay.as_ref()
    }

    pub fn is_hidden(&self) -> bool {
        self.overlay.as_ref().map_or(false, |o| o.hide)
    }

    /// Outgoing edges in destination id order
    pub fn edges(&self) -> impl Iterator<Item = &TrustEdge> {
        self.edges.values()
    }

    pub fn edge_to(&self, destination: NodeId) -> Option<&TrustEdge> {
        self.edges.get(&destination)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adopt a forest unless one is already set. Unnamed forests are ignored.
    pub fn set_forest(&mut self, forest: Option<&DomainIdentity>) -> bool {
        match forest {
            Some(forest) if forest.is_named() && self.forest.is_none() => {
                self.forest = Some(forest.clone());
                true
            }
            _ => false,
        }
    }

    /// No report of its own, at least one edge, and every edge inactive
    pub fn is_potentially_removed(&self) -> bool {
        self.report.is_none() && !self.edges.is_empty() && self.edges.values().all(|e| !e.is_active())
    }

    /// Destinations of outgoing edges flagged as intra-forest
    pub fn intra_forest_neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.values().filter(|e| e.is_intra_forest()).map(|e| e.destination())
    }

    /// Attach the domain's own report, returning the one it replaced
    pub(crate) fn attach_report(&mut self, report: DomainReport) -> Option<DomainReport> {
        self.report.replace(report)
    }

    pub(crate) fn attach_overlay(&mut self, overlay: OverlayRecord) {
        self.overlay = Some(overlay);
    }

    pub(crate) fn edge_mut(&mut self, destination: NodeId) -> Option<&mut TrustEdge> {
        self.edges.get_mut(&destination)
    }

    pub(crate) fn insert_edge(&mut self, edge: TrustEdge) {
        self.edges.insert(edge.destination(), edge);
    }

    /// Install an edge only if none exists toward its destination
    pub(crate) fn insert_edge_if_absent(&mut self, edge: TrustEdge) -> bool {
        match self.edges.entry(edge.destination()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(edge);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub(crate) fn remove_edges_to(&mut self, destinations: &BTreeSet<NodeId>) -> usize {
        let before = self.edges.len();
        self.edges.retain(|destination, _| !destinations.contains(destination));
        before - self.edges.len()
    }
}
