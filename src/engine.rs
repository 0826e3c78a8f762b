//! Engine facade: top-level API for orgweave.
//!
//! The `Engine` owns the store handle and constructs every component with a
//! clone of it. Components never call each other; the engine is the only
//! place they meet.

use std::path::Path;
use std::sync::Arc;

use crate::agents::AgentRegistry;
use crate::config::EngineConfig;
use crate::dynamics::StockFlowProjector;
use crate::error::{EngineError, OrgResult};
use crate::events::EventLog;
use crate::graph::{Hierarchy, Hypergraph, OwnershipResolver, RelationshipQuery};
use crate::import::{self, ImportSummary, Seed};
use crate::ledger::DebtLedger;
use crate::store::durable::DurableStore;
use crate::store::mem::MemStore;
use crate::store::{EntityStore, Repository, Table, degrade};

/// The orgweave engine.
pub struct Engine {
    config: EngineConfig,
    repo: Repository,
    hierarchy: Hierarchy,
    ownership: OwnershipResolver,
    relationships: RelationshipQuery,
    hypergraph: Hypergraph,
    dynamics: StockFlowProjector,
    ledger: DebtLedger,
    events: EventLog,
    agents: AgentRegistry,
}

impl Engine {
    /// Create an engine. A configured `data_dir` selects the durable store;
    /// otherwise everything lives in memory.
    pub fn new(config: EngineConfig) -> OrgResult<Self> {
        config.validate()?;

        let store: Arc<dyn EntityStore> = match config.data_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir).map_err(|source| EngineError::DataDir {
                    path: dir.display().to_string(),
                    source,
                })?;
                Arc::new(DurableStore::open(dir)?)
            }
            None => Arc::new(MemStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Create an engine over a caller-supplied store.
    pub fn with_store(config: EngineConfig, store: Arc<dyn EntityStore>) -> OrgResult<Self> {
        config.validate()?;
        tracing::info!(
            persistent = config.data_dir.is_some(),
            max_depth = config.ownership.max_depth,
            min_effective_bps = config.ownership.min_effective_bps,
            "initializing orgweave engine"
        );

        let repo = Repository::new(store);
        Ok(Self {
            hierarchy: Hierarchy::new(repo.clone()),
            ownership: OwnershipResolver::new(repo.clone(), config.ownership),
            relationships: RelationshipQuery::new(repo.clone()),
            hypergraph: Hypergraph::new(repo.clone()),
            dynamics: StockFlowProjector::new(repo.clone()),
            ledger: DebtLedger::new(repo.clone()),
            events: EventLog::new(repo.clone()),
            agents: AgentRegistry::new(repo.clone()),
            repo,
            config,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn ownership(&self) -> &OwnershipResolver {
        &self.ownership
    }

    pub fn relationships(&self) -> &RelationshipQuery {
        &self.relationships
    }

    pub fn hypergraph(&self) -> &Hypergraph {
        &self.hypergraph
    }

    pub fn dynamics(&self) -> &StockFlowProjector {
        &self.dynamics
    }

    pub fn ledger(&self) -> &DebtLedger {
        &self.ledger
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// The shared repository handle.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply a parsed seed.
    pub fn import(&self, seed: &Seed) -> OrgResult<ImportSummary> {
        import::import(self, seed)
    }

    /// Read and apply a JSON seed file.
    pub fn import_file(&self, path: &Path) -> OrgResult<ImportSummary> {
        let seed = Seed::from_file(path)?;
        self.import(&seed)
    }

    /// Record counts per table. Tables that cannot be read count as zero.
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            persistent: self.config.data_dir.is_some(),
            data_dir: self
                .config
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string()),
            max_depth: self.config.ownership.max_depth,
            tables: Table::ALL
                .iter()
                .map(|&t| (t, degrade(self.repo.count(t), "info")))
                .collect(),
        }
    }
}

/// Summary information about the engine state.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub persistent: bool,
    pub data_dir: Option<String>,
    pub max_depth: usize,
    pub tables: Vec<(Table, usize)>,
}

impl EngineInfo {
    pub fn count(&self, table: Table) -> usize {
        self.tables
            .iter()
            .find(|(t, _)| *t == table)
            .map_or(0, |(_, n)| *n)
    }
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "orgweave engine info")?;
        writeln!(f, "  persistent:   {}", self.persistent)?;
        if let Some(dir) = &self.data_dir {
            writeln!(f, "  data dir:     {dir}")?;
        }
        writeln!(f, "  max depth:    {}", self.max_depth)?;
        for (table, count) in &self.tables {
            writeln!(f, "  {:<22}{count}", format!("{table}:"))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OwnershipConfig;
    use crate::graph::NewShareholding;

    #[test]
    fn create_memory_only_engine() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let info = engine.info();
        assert!(!info.persistent);
        assert_eq!(info.count(Table::Organizations), 0);
        assert_eq!(info.tables.len(), Table::ALL.len());
    }

    #[test]
    fn components_share_one_store() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let a = engine.hierarchy().create_organization("A", None, 1).unwrap();
        let b = engine.hierarchy().create_organization("B", None, 1).unwrap();
        engine
            .ownership()
            .record_shareholding(NewShareholding::new(a.id, b.id, 5_000))
            .unwrap();

        assert_eq!(engine.ownership().effective_ownership(a.id).unwrap().len(), 1);
        assert_eq!(engine.info().count(Table::Shareholdings), 1);
    }

    #[test]
    fn configured_depth_reaches_resolver() {
        let engine = Engine::new(EngineConfig {
            ownership: OwnershipConfig {
                max_depth: 1,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let h = engine.hierarchy();
        let a = h.create_organization("A", None, 1).unwrap().id;
        let b = h.create_organization("B", None, 1).unwrap().id;
        let c = h.create_organization("C", None, 1).unwrap().id;
        engine
            .ownership()
            .record_shareholding(NewShareholding::new(a, b, 10_000))
            .unwrap();
        engine
            .ownership()
            .record_shareholding(NewShareholding::new(b, c, 10_000))
            .unwrap();
        assert_eq!(engine.ownership().effective_ownership(a).unwrap().len(), 1);
    }

    #[test]
    fn engine_with_persistence() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = Engine::new(EngineConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert!(engine.info().persistent);
    }

    #[test]
    fn invalid_config_rejected() {
        let result = Engine::new(EngineConfig {
            ownership: OwnershipConfig {
                max_depth: 0,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
