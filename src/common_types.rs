//! Common Types Module
//!
//! Shared types used by the graph builder, trust classification and the trust
//! map audit: severity levels, recommendation records and trust attribute bits.

use serde::{Deserialize, Serialize};

/// Severity levels for security findings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingSeverity {
    /// Lowest severity - informational only
    Informational,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity
    High,
    /// Highest severity - critical issue
    Critical,
}

/// Counts of findings grouped by severity level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub informational: u32,
    pub total: u32,
}

impl SeverityCounts {
    /// Create counts from an iterator of severity levels
    pub fn from_iter<'a>(severities: impl Iterator<Item = &'a FindingSeverity>) -> Self {
        let mut counts = Self::default();
        for severity in severities {
            match severity {
                FindingSeverity::Critical => counts.critical += 1,
                FindingSeverity::High => counts.high += 1,
                FindingSeverity::Medium => counts.medium += 1,
                FindingSeverity::Low => counts.low += 1,
                FindingSeverity::Informational => counts.informational += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// trustAttributes flag constants
///
/// These are the bits of the `trustAttributes` attribute on trustedDomain objects
pub mod trust_attributes {
    /// Trust is not transitive
    pub const NON_TRANSITIVE: u32 = 0x0001;
    /// Only Windows 2000 and newer clients may use the trust
    pub const UPLEVEL_ONLY: u32 = 0x0002;
    /// SID filtering (quarantine) is enabled
    pub const QUARANTINED_DOMAIN: u32 = 0x0004;
    /// Cross-forest trust between forest roots
    pub const FOREST_TRANSITIVE: u32 = 0x0008;
    /// Selective authentication
    pub const CROSS_ORGANIZATION: u32 = 0x0010;
    /// Trust between two domains of the same forest
    pub const WITHIN_FOREST: u32 = 0x0020;
    /// Forest trust treated as external, SID history allowed
    pub const TREAT_AS_EXTERNAL: u32 = 0x0040;
    /// RC4 keys are used for the trust
    pub const USES_RC4_ENCRYPTION: u32 = 0x0080;
    /// AES keys are used for the trust
    pub const USES_AES_KEYS: u32 = 0x0100;
    /// TGT delegation disabled across the organization boundary
    pub const CROSS_ORGANIZATION_NO_TGT_DELEGATION: u32 = 0x0200;
    /// Privileged Identity Management trust
    pub const PIM_TRUST: u32 = 0x0400;
    /// TGT delegation explicitly enabled across the organization boundary
    pub const CROSS_ORGANIZATION_ENABLE_TGT_DELEGATION: u32 = 0x0800;
}

/// Standard recommendation structure used by the trust map audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority level (1 = highest/critical, 4 = lowest/informational)
    pub priority: u8,
    /// Short title for the recommendation
    pub title: String,
    /// Detailed description of the recommendation
    pub description: String,
    /// Step-by-step remediation steps
    pub steps: Vec<String>,
    /// Optional PowerShell/CLI command for remediation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Recommendation {
    /// Create a new recommendation without a command
    pub fn new(priority: u8, title: &str, description: &str, steps: Vec<String>) -> Self {
        Self {
            priority,
            title: title.to_string(),
            description: description.to_string(),
            steps,
            command: None,
        }
    }

    /// Create a new recommendation with a remediation command
    pub fn with_command(priority: u8, title: &str, description: &str, steps: Vec<String>, command: &str) -> Self {
        Self {
            priority,
            title: title.to_string(),
            description: description.to_string(),
            steps,
            command: Some(command.to_string()),
        }
    }
}
