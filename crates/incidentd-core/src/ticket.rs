//! Ticket domain model.
//!
//! A [`Ticket`] is one active incident record. Tickets are immutable once
//! created: status and resolution metadata are decided at creation time and
//! never transition afterwards. A ticket leaves the active set only through
//! retirement, which copies it into a [`HistoryRecord`] and removes it (and
//! every dependency edge touching it) in a single store transaction.
//!
//! # Invariants
//!
//! - Resolution metadata is present iff the status is `Resolved`. The
//!   [`TicketStatus`] enum makes the in-memory side of this
//!   unrepresentable; [`TicketStatus::from_parts`] re-checks it when
//!   decoding persisted rows.
//! - A ticket's category must be consistent with its error class
//!   (Infrastructure vs Application); [`NewTicket::validate`] enforces
//!   this before anything reaches storage.

use std::fmt;

use thiserror::Error;

/// Errors produced when validating or decoding ticket attributes.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TicketError {
    /// The category does not belong to the ticket's error class.
    #[error("category {category} is not valid for error class {class}")]
    CategoryMismatch {
        /// Declared error class.
        class: ErrorClass,
        /// Offending category.
        category: Category,
    },

    /// The issue summary is empty or whitespace-only.
    #[error("issue summary must not be empty")]
    EmptySummary,

    /// A persisted status string was not recognised.
    #[error("unknown ticket status: {0}")]
    UnknownStatus(String),

    /// A persisted enum string was not recognised.
    #[error("unknown {field} value: {value}")]
    UnknownVariant {
        /// Field being decoded (priority, category, error class).
        field: &'static str,
        /// The unrecognised value.
        value: String,
    },

    /// A resolved row is missing its resolution metadata, or an open row
    /// carries some.
    #[error("resolution metadata inconsistent with status {status}")]
    InconsistentResolution {
        /// The persisted status string.
        status: String,
    },
}

/// Store-assigned ticket identifier.
///
/// Identifiers are unique and strictly increasing across the lifetime of a
/// database, including tickets that have since been retired, so a
/// [`HistoryRecord`] can always be traced back unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(i64);

impl TicketId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned dependency edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(i64);

impl EdgeId {
    /// Wraps a raw row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Routine issue.
    Low,
    /// Degraded service.
    Medium,
    /// Outage or data-loss risk.
    High,
}

impl Priority {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses the stable string form.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::UnknownVariant`] for unrecognised input.
    pub fn parse(value: &str) -> Result<Self, TicketError> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TicketError::UnknownVariant {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad error class a ticket was filed under.
///
/// The class constrains which categories are admissible; see
/// [`Category::allowed_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Faults in the platform underneath applications.
    Infrastructure,
    /// Faults in application code or its immediate surface.
    Application,
}

impl ErrorClass {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Application => "application",
        }
    }

    /// Parses the stable string form.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::UnknownVariant`] for unrecognised input.
    pub fn parse(value: &str) -> Result<Self, TicketError> {
        match value {
            "infrastructure" => Ok(Self::Infrastructure),
            "application" => Ok(Self::Application),
            other => Err(TicketError::UnknownVariant {
                field: "error_class",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Network faults (latency, packet loss, DNS).
    Network,
    /// Host-level faults (CPU, memory, unresponsive machines).
    Server,
    /// Database faults. Valid for both error classes: an unreachable
    /// database server is infrastructure, a slow query is application.
    Database,
    /// API-surface faults (5xx, slow responses).
    Api,
    /// Frontend faults.
    Ui,
    /// Access violations and policy breaches.
    Security,
}

impl Category {
    /// Categories admissible for a given error class.
    #[must_use]
    pub const fn allowed_for(class: ErrorClass) -> &'static [Self] {
        match class {
            ErrorClass::Infrastructure => {
                &[Self::Network, Self::Server, Self::Database, Self::Security]
            },
            ErrorClass::Application => &[Self::Api, Self::Database, Self::Ui],
        }
    }

    /// Whether this category is admissible under `class`.
    #[must_use]
    pub fn is_valid_for(self, class: ErrorClass) -> bool {
        Self::allowed_for(class).contains(&self)
    }

    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Database => "database",
            Self::Api => "api",
            Self::Ui => "ui",
            Self::Security => "security",
        }
    }

    /// Parses the stable string form.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::UnknownVariant`] for unrecognised input.
    pub fn parse(value: &str) -> Result<Self, TicketError> {
        match value {
            "network" => Ok(Self::Network),
            "server" => Ok(Self::Server),
            "database" => Ok(Self::Database),
            "api" => Ok(Self::Api),
            "ui" => Ok(Self::Ui),
            "security" => Ok(Self::Security),
            other => Err(TicketError::UnknownVariant {
                field: "category",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket status, fixed at creation time.
///
/// There is no later transition: a ticket created `Open` stays `Open` until
/// it is retired, and resolution metadata exists exactly when the ticket was
/// created already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    /// Unresolved incident.
    Open,
    /// Incident resolved at creation time.
    Resolved {
        /// Time to resolution, in seconds.
        resolution_secs: u64,
        /// Root-cause analysis notes.
        rca_notes: String,
    },
}

impl TicketStatus {
    /// Stable status string used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved { .. } => "resolved",
        }
    }

    /// Splits into the column triple `(status, resolution_secs, rca_notes)`
    /// used by the persisted layout.
    #[must_use]
    pub fn to_parts(&self) -> (&'static str, Option<u64>, Option<&str>) {
        match self {
            Self::Open => ("open", None, None),
            Self::Resolved {
                resolution_secs,
                rca_notes,
            } => ("resolved", Some(*resolution_secs), Some(rca_notes.as_str())),
        }
    }

    /// Reassembles a status from persisted columns, rejecting rows where
    /// resolution metadata disagrees with the status string.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::UnknownStatus`] for an unrecognised status
    /// string and [`TicketError::InconsistentResolution`] when metadata
    /// presence does not match the status.
    pub fn from_parts(
        status: &str,
        resolution_secs: Option<u64>,
        rca_notes: Option<String>,
    ) -> Result<Self, TicketError> {
        match status {
            "open" => {
                if resolution_secs.is_some() || rca_notes.is_some() {
                    return Err(TicketError::InconsistentResolution {
                        status: status.to_string(),
                    });
                }
                Ok(Self::Open)
            },
            "resolved" => match (resolution_secs, rca_notes) {
                (Some(resolution_secs), Some(rca_notes)) => Ok(Self::Resolved {
                    resolution_secs,
                    rca_notes,
                }),
                _ => Err(TicketError::InconsistentResolution {
                    status: status.to_string(),
                }),
            },
            other => Err(TicketError::UnknownStatus(other.to_string())),
        }
    }

    /// Whether the ticket was created already resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Attributes for a ticket about to be created.
///
/// The store assigns the id and the engine stamps the creation timestamp;
/// everything else is caller-supplied and checked by [`Self::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Application the incident was observed in.
    pub application: String,
    /// Host the incident was observed on.
    pub server: String,
    /// Broad error class.
    pub error_class: ErrorClass,
    /// Free-text issue summary.
    pub summary: String,
    /// Priority.
    pub priority: Priority,
    /// Incident category; must be admissible under `error_class`.
    pub category: Category,
    /// Status fixed at creation.
    pub status: TicketStatus,
}

impl NewTicket {
    /// Checks creation-time invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::CategoryMismatch`] when the category does not
    /// belong to the error class, and [`TicketError::EmptySummary`] for a
    /// blank summary.
    pub fn validate(&self) -> Result<(), TicketError> {
        if !self.category.is_valid_for(self.error_class) {
            return Err(TicketError::CategoryMismatch {
                class: self.error_class,
                category: self.category,
            });
        }
        if self.summary.trim().is_empty() {
            return Err(TicketError::EmptySummary);
        }
        Ok(())
    }
}

/// One active incident record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Store-assigned identifier.
    pub id: TicketId,
    /// Application the incident was observed in.
    pub application: String,
    /// Host the incident was observed on.
    pub server: String,
    /// Broad error class.
    pub error_class: ErrorClass,
    /// Free-text issue summary.
    pub summary: String,
    /// Priority.
    pub priority: Priority,
    /// Incident category.
    pub category: Category,
    /// Status fixed at creation.
    pub status: TicketStatus,
    /// Creation timestamp, nanoseconds since the Unix epoch. Assigned at
    /// insert time, immutable.
    pub created_at_ns: u64,
}

/// Optional fields attached to a historical record at retirement time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEnrichment {
    /// Engineer the retired incident was attributed to.
    pub assigned_engineer: Option<String>,
    /// Steps taken to resolve the incident.
    pub resolution_steps: Option<String>,
}

/// Immutable archival copy of a retired ticket.
///
/// Created exactly once per retirement and never updated or deleted by this
/// system; downstream retention of history is out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Store-assigned history row id.
    pub id: i64,
    /// Id the ticket had while active, for traceability.
    pub original_ticket_id: TicketId,
    /// Application the incident was observed in.
    pub application: String,
    /// Host the incident was observed on.
    pub server: String,
    /// Broad error class.
    pub error_class: ErrorClass,
    /// Free-text issue summary.
    pub summary: String,
    /// Priority.
    pub priority: Priority,
    /// Incident category.
    pub category: Category,
    /// Status the ticket held when retired.
    pub status: TicketStatus,
    /// Original creation timestamp, nanoseconds since the Unix epoch.
    pub created_at_ns: u64,
    /// Retirement timestamp, nanoseconds since the Unix epoch.
    pub archived_at_ns: u64,
    /// Optional retirement-time enrichment.
    pub enrichment: HistoryEnrichment,
}
