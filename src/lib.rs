//! Active Directory trust map consolidation
//!
//! Builds one directed graph of domain-to-domain trusts out of independently
//! collected domain reports of uneven freshness and reliability, then audits it.

pub mod common_types;
pub mod config;
pub mod domain_graph;
pub mod domain_identity;
pub mod domain_node;
pub mod domain_trust_audit;
pub mod errors;
pub mod input;
pub mod reports;
pub mod trust_classification;
pub mod trust_edge;

pub use config::{ForestInference, GraphConfig};
pub use domain_graph::{DataQualityIssue, DomainGraph};
pub use domain_identity::{is_duplicate_name_distinct_sid, reconcile, DomainIdentity};
pub use domain_node::{DomainNode, NodeId};
pub use domain_trust_audit::TrustMapAudit;
pub use errors::{Result, TrustMapError};
pub use reports::{DomainReport, ForestMemberHint, OverlayRecord, ReachableHint, TrustFact};
pub use trust_edge::{EdgeFacts, EdgeUpdate, Provenance, TrustDirection, TrustEdge};
