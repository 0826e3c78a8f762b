//! Rich diagnostic error types for orgweave.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for orgweave.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OrgError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dynamics(#[from] DynamicsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] crate::import::SeedError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(orgweave::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(orgweave::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try running against a fresh data directory; if the problem persists, \
             file a bug report."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(orgweave::store::serde),
        help(
            "Failed to serialize or deserialize a record. \
             This usually means the stored format changed between versions. \
             Re-import your data into a fresh data directory."
        )
    )]
    Serialization { message: String },

    #[error("{table} record {id} not found")]
    #[diagnostic(
        code(orgweave::store::not_found),
        help("The requested record does not exist. Verify the id is correct.")
    )]
    NotFound { table: &'static str, id: u64 },

    #[error("entity store unavailable: {message}")]
    #[diagnostic(
        code(orgweave::store::unavailable),
        help(
            "The entity store could not be reached. Read queries return empty \
             results while the store is down; writes fail until it is back."
        )
    )]
    Unavailable { message: String },
}

// ---------------------------------------------------------------------------
// Argument errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ArgumentError {
    #[error("{field} = {value} is outside the basis-point range [0, 10000]")]
    #[diagnostic(
        code(orgweave::argument::bps_range),
        help("Percentages and weights are basis points: 10000 = 100.00%, 100 = 1.00%.")
    )]
    BasisPointsOutOfRange { field: &'static str, value: u32 },

    #[error("{field} must not be negative, got {value}")]
    #[diagnostic(
        code(orgweave::argument::negative_amount),
        help("Money is given in minor currency units (cents) and must be >= 0.")
    )]
    NegativeAmount { field: &'static str, value: i64 },

    #[error("traversal depth must be positive, got {depth}")]
    #[diagnostic(
        code(orgweave::argument::invalid_depth),
        help("Pass a `max_depth` of at least 1. The default is 10.")
    )]
    InvalidDepth { depth: usize },

    #[error("{field} must not be empty")]
    #[diagnostic(
        code(orgweave::argument::empty_name),
        help("Provide a non-blank value for {field}.")
    )]
    EmptyName { field: &'static str },

    #[error("lower bound {min} exceeds upper bound {max}")]
    #[diagnostic(
        code(orgweave::argument::invalid_bounds),
        help("A stock's min_value must not exceed its max_value.")
    )]
    InvalidBounds { min: i64, max: i64 },

    #[error("validity window ends ({valid_to}) before it starts ({valid_from})")]
    #[diagnostic(
        code(orgweave::argument::invalid_validity),
        help("`valid_to` must be on or after `valid_from`, or left open-ended.")
    )]
    InvalidValidity {
        valid_from: chrono::NaiveDate,
        valid_to: chrono::NaiveDate,
    },

    #[error("unknown {kind}: {value:?}")]
    #[diagnostic(
        code(orgweave::argument::unknown_variant),
        help("Expected one of: {expected}.")
    )]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: String,
    },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("organization not found: {org_id}")]
    #[diagnostic(
        code(orgweave::graph::org_not_found),
        help("Create the organization first, or check the id / name you passed.")
    )]
    OrganizationNotFound { org_id: u64 },

    #[error("organization name {name:?} is ambiguous or unknown")]
    #[diagnostic(
        code(orgweave::graph::unresolved_org),
        help("Pass the numeric organization id instead of a name.")
    )]
    UnresolvedOrganization { name: String },

    #[error("organization {org_id} cannot hold shares in itself")]
    #[diagnostic(
        code(orgweave::graph::self_ownership),
        help("A shareholding must connect two distinct organizations.")
    )]
    SelfOwnership { org_id: u64 },

    #[error("shareholding {parent} -> {child} already exists")]
    #[diagnostic(
        code(orgweave::graph::duplicate_shareholding),
        help("Each (child, parent) pair holds at most one shareholding. Update it instead.")
    )]
    DuplicateShareholding { child: u64, parent: u64 },

    #[error("setting parent of {child} to {parent} would create a cycle")]
    #[diagnostic(
        code(orgweave::graph::hierarchy_cycle),
        help(
            "The organization tree must stay acyclic. The proposed parent is \
             already a descendant of the child."
        )
    )]
    HierarchyCycle { child: u64, parent: u64 },

    #[error("relationship type {name:?} already exists")]
    #[diagnostic(
        code(orgweave::graph::duplicate_type),
        help("Relationship type names are unique (case-insensitive). Reuse the existing type.")
    )]
    DuplicateRelationshipType { name: String },

    #[error("relationship type not found: {type_id}")]
    #[diagnostic(
        code(orgweave::graph::type_not_found),
        help("Create the relationship type before relating entities with it.")
    )]
    RelationshipTypeNotFound { type_id: u64 },

    #[error("hypergraph node not found: {node_id}")]
    #[diagnostic(
        code(orgweave::graph::node_not_found),
        help("Register the node with `ensure_node()` first.")
    )]
    NodeNotFound { node_id: u64 },

    #[error("hyperedge not found: {hyperedge_id}")]
    #[diagnostic(
        code(orgweave::graph::hyperedge_not_found),
        help("Create the hyperedge with `add_hyperedge()` first.")
    )]
    HyperedgeNotFound { hyperedge_id: u64 },

    #[error("node {node_id} is already incident to hyperedge {hyperedge_id}")]
    #[diagnostic(
        code(orgweave::graph::duplicate_incidence),
        help("A node participates in a given hyperedge at most once.")
    )]
    DuplicateIncidence { hyperedge_id: u64, node_id: u64 },
}

// ---------------------------------------------------------------------------
// Stock-flow errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DynamicsError {
    #[error("stock not found: {stock_id}")]
    #[diagnostic(
        code(orgweave::dynamics::stock_not_found),
        help("Flows may only reference existing stocks. Leave the end empty for an exogenous flow.")
    )]
    StockNotFound { stock_id: u64 },

    #[error("stock {name:?} already exists for {owner}")]
    #[diagnostic(
        code(orgweave::dynamics::duplicate_stock),
        help("Stock names are unique per owning entity.")
    )]
    DuplicateStock { owner: String, name: String },

    #[error("flow not found: {flow_id}")]
    #[diagnostic(
        code(orgweave::dynamics::flow_not_found),
        help("Check the flow id.")
    )]
    FlowNotFound { flow_id: u64 },
}

// ---------------------------------------------------------------------------
// Ledger errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LedgerError {
    #[error("debt not found: {debt_id}")]
    #[diagnostic(
        code(orgweave::ledger::debt_not_found),
        help("No payment was recorded. Check the debt id with `orgweave debt list`.")
    )]
    DebtNotFound { debt_id: u64 },

    #[error("event not found: {event_id}")]
    #[diagnostic(
        code(orgweave::ledger::event_not_found),
        help("A causing event must be appended before the events it causes.")
    )]
    EventNotFound { event_id: u64 },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(orgweave::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(orgweave::engine::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config file: {path}")]
    #[diagnostic(
        code(orgweave::engine::config_file),
        help("Check that the --config path exists and is readable.")
    )]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning orgweave results.
pub type OrgResult<T> = std::result::Result<T, OrgError>;
