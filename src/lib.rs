// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # orgweave
//!
//! Per-organization finances (debts and payments) with a relationship layer
//! over the organization tree: weighted multi-parent ownership, typed
//! multiplex relationships, n-ary hyperedges, and stock-flow accumulators.
//!
//! ## Architecture
//!
//! - **Entity store** (`store`): trait seam with an in-memory and a redb backend
//! - **Ownership** (`graph::ownership`): effective ownership over shareholding chains (petgraph)
//! - **Relationships** (`graph::relationships`): typed edges queried from either end
//! - **Hypergraph** (`graph::hypergraph`): hyperedges and two-hop neighborhoods
//! - **Stock-flow** (`dynamics`): one-step projection of stocks under their flows
//! - **Debt ledger** (`ledger`): payments serialized per debt, committed atomically
//! - **Event log** (`events`): causal event chains and a state-transition table
//!
//! ## Library usage
//!
//! ```no_run
//! use orgweave::config::EngineConfig;
//! use orgweave::engine::Engine;
//! use orgweave::graph::NewShareholding;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let acme = engine.hierarchy().create_organization("Acme", None, 1).unwrap();
//! let beta = engine.hierarchy().create_organization("Beta", None, 1).unwrap();
//! engine
//!     .ownership()
//!     .record_shareholding(NewShareholding::new(acme.id, beta.id, 6_000))
//!     .unwrap();
//! for path in engine.ownership().effective_ownership(acme.id).unwrap() {
//!     println!("{} {}", path.descendant_name, path.effective);
//! }
//! ```

pub mod agents;
pub mod config;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod ids;
pub mod import;
pub mod ledger;
pub mod model;
pub mod store;
