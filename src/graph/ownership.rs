//! Effective ownership through weighted shareholding chains.
//!
//! Shareholdings form a directed graph `parent --share--> child`. Effective
//! ownership of a descendant along one chain is the product of the shares on
//! the chain, computed in basis points with truncating fixed-point
//! multiplication (60% of 40% is 24%).
//!
//! The graph may contain cycles (cross-shareholding), so the walk is cut off
//! at `max_depth` rather than by cycle detection. Every chain that reaches a
//! descendant is reported as its own row; [`OwnershipResolver::holdings`]
//! sums simple chains per descendant for callers that want one figure each.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::NaiveDate;
use petgraph::Direction as EdgeDirection;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::config::OwnershipConfig;
use crate::error::{ArgumentError, GraphError, OrgResult};
use crate::ids::{Bps, OrgId, ShareholdingId};
use crate::model::{Organization, Shareholding};
use crate::store::{KeyedLocks, Repository, degrade};

/// One ownership chain from the root to a descendant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipPath {
    pub descendant: OrgId,
    pub descendant_name: String,
    pub effective: Bps,
    /// Number of shareholding hops from the root.
    pub depth: usize,
    /// Organization ids from the root to the descendant, both inclusive.
    pub chain: Vec<OrgId>,
}

/// Effective ownership of one descendant summed over its simple chains.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub descendant: OrgId,
    pub descendant_name: String,
    /// Sum over chains, capped at 100%.
    pub effective: Bps,
    /// Number of chains contributing.
    pub paths: usize,
    /// Length of the shortest contributing chain.
    pub min_depth: usize,
}

/// Result of [`OwnershipResolver::ownership_report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipReport {
    pub paths: Vec<OwnershipPath>,
    /// The walk stopped at `max_paths` chains; deeper chains are missing.
    pub truncated: bool,
}

/// Input for [`OwnershipResolver::record_shareholding`].
#[derive(Debug, Clone)]
pub struct NewShareholding {
    pub parent: OrgId,
    pub child: OrgId,
    pub share_bps: u32,
    pub voting_bps: Option<u32>,
    pub share_class: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
}

impl NewShareholding {
    /// `parent` holds `share_bps` of `child`, common class, no voting split.
    pub fn new(parent: OrgId, child: OrgId, share_bps: u32) -> Self {
        Self {
            parent,
            child,
            share_bps,
            voting_bps: None,
            share_class: None,
            acquisition_date: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph walk
// ---------------------------------------------------------------------------

/// Bounds for a single walk.
#[derive(Debug, Clone, Copy)]
struct WalkLimits {
    max_depth: usize,
    /// Chains below this are dropped and not expanded further.
    floor: Bps,
    max_paths: usize,
    /// Skip chains that revisit an organization.
    simple_only: bool,
}

#[derive(Debug, Clone)]
struct Chain {
    descendant: OrgId,
    effective: Bps,
    depth: usize,
    orgs: Vec<OrgId>,
}

#[derive(Debug, Default)]
struct Walk {
    chains: Vec<Chain>,
    truncated: bool,
}

/// In-memory snapshot of the shareholding graph.
#[derive(Debug, Default)]
pub struct OwnershipGraph {
    graph: DiGraph<OrgId, Bps>,
    index: HashMap<OrgId, NodeIndex>,
}

impl OwnershipGraph {
    /// Build the graph from shareholding rows.
    pub fn from_shareholdings<'a>(rows: impl IntoIterator<Item = &'a Shareholding>) -> Self {
        let mut g = Self::default();
        for row in rows {
            let parent = g.ensure_node(row.parent);
            let child = g.ensure_node(row.child);
            g.graph.add_edge(parent, child, row.share);
        }
        g
    }

    fn ensure_node(&mut self, org: OrgId) -> NodeIndex {
        *self
            .index
            .entry(org)
            .or_insert_with(|| self.graph.add_node(org))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Breadth-first expansion of every chain starting at `root`.
    ///
    /// Shares never exceed 100%, so a chain's effective ownership only
    /// shrinks as it grows; chains under the floor are pruned.
    fn walk(&self, root: OrgId, limits: WalkLimits) -> Walk {
        let Some(&start) = self.index.get(&root) else {
            return Walk::default();
        };

        let mut walk = Walk::default();
        // (node, effective ownership so far, chain of orgs)
        let mut queue: VecDeque<(NodeIndex, Bps, Vec<OrgId>)> = VecDeque::new();
        queue.push_back((start, Bps::FULL, vec![root]));

        'expand: while let Some((node, effective, orgs)) = queue.pop_front() {
            let depth = orgs.len() - 1;
            if depth >= limits.max_depth {
                continue;
            }

            for edge in self.graph.edges_directed(node, EdgeDirection::Outgoing) {
                let child = self.graph[edge.target()];
                if limits.simple_only && orgs.contains(&child) {
                    continue;
                }

                let next = effective.compose(*edge.weight());
                if next < limits.floor {
                    continue;
                }

                if walk.chains.len() >= limits.max_paths {
                    walk.truncated = true;
                    break 'expand;
                }

                let mut next_orgs = orgs.clone();
                next_orgs.push(child);
                walk.chains.push(Chain {
                    descendant: child,
                    effective: next,
                    depth: depth + 1,
                    orgs: next_orgs.clone(),
                });
                queue.push_back((edge.target(), next, next_orgs));
            }
        }

        walk
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves direct and transitive ownership over the shareholding graph.
#[derive(Debug, Clone)]
pub struct OwnershipResolver {
    repo: Repository,
    config: OwnershipConfig,
    edges: KeyedLocks<(OrgId, OrgId)>,
}

impl OwnershipResolver {
    pub fn new(repo: Repository, config: OwnershipConfig) -> Self {
        Self {
            repo,
            config,
            edges: KeyedLocks::new(),
        }
    }

    fn floor(&self) -> Bps {
        Bps::saturating(self.config.min_effective_bps)
    }

    fn snapshot(&self) -> OwnershipGraph {
        let rows: Vec<Shareholding> = degrade(self.repo.scan(), "shareholdings");
        OwnershipGraph::from_shareholdings(&rows)
    }

    fn names(&self) -> HashMap<OrgId, String> {
        let orgs: Vec<Organization> = degrade(self.repo.scan(), "organizations");
        orgs.into_iter().map(|o| (o.id, o.name)).collect()
    }

    /// Every chain from `root` within the configured depth, strongest first.
    ///
    /// At most `max_paths` chains are expanded (see
    /// [`OwnershipConfig::max_paths`]); use
    /// [`ownership_report`](Self::ownership_report) to tell whether the cap
    /// was hit.
    pub fn effective_ownership(&self, root: OrgId) -> OrgResult<Vec<OwnershipPath>> {
        self.effective_ownership_within(root, self.config.max_depth)
    }

    /// Every chain from `root` of at most `max_depth` hops, strongest first.
    ///
    /// Chains under the configured floor (1% by default) are left out.
    /// Chains to the same descendant are not merged. Descendants without an
    /// organization record are skipped. Capped at `max_paths`
    /// chains, shortest first.
    pub fn effective_ownership_within(
        &self,
        root: OrgId,
        max_depth: usize,
    ) -> OrgResult<Vec<OwnershipPath>> {
        Ok(self.ownership_report(root, max_depth)?.paths)
    }

    /// Like [`effective_ownership_within`](Self::effective_ownership_within),
    /// also reporting whether the `max_paths` cap cut the walk short.
    pub fn ownership_report(&self, root: OrgId, max_depth: usize) -> OrgResult<OwnershipReport> {
        if max_depth == 0 {
            return Err(ArgumentError::InvalidDepth { depth: max_depth }.into());
        }

        let graph = self.snapshot();
        let walk = graph.walk(
            root,
            WalkLimits {
                max_depth,
                floor: self.floor(),
                max_paths: self.config.max_paths,
                simple_only: false,
            },
        );
        tracing::debug!(
            %root,
            max_depth,
            chains = walk.chains.len(),
            truncated = walk.truncated,
            "resolved effective ownership"
        );
        if walk.truncated {
            tracing::warn!(%root, max_paths = self.config.max_paths, "ownership walk truncated");
        }

        let names = self.names();
        let mut rows: Vec<OwnershipPath> = walk
            .chains
            .into_iter()
            .filter_map(|c| {
                let name = names.get(&c.descendant)?.clone();
                Some(OwnershipPath {
                    descendant: c.descendant,
                    descendant_name: name,
                    effective: c.effective,
                    depth: c.depth,
                    chain: c.orgs,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.effective
                .cmp(&a.effective)
                .then(a.depth.cmp(&b.depth))
                .then(a.descendant.cmp(&b.descendant))
                .then_with(|| a.chain.cmp(&b.chain))
        });
        Ok(OwnershipReport {
            paths: rows,
            truncated: walk.truncated,
        })
    }

    /// Effective ownership per descendant, summed over simple chains.
    ///
    /// Chains that revisit an organization are ignored, so cross-holdings do
    /// not inflate the total. Sums are capped at 100% and filtered by the
    /// configured floor after summing. Only the first `max_paths` chains
    /// contribute.
    pub fn holdings(&self, root: OrgId, max_depth: usize) -> OrgResult<Vec<Holding>> {
        if max_depth == 0 {
            return Err(ArgumentError::InvalidDepth { depth: max_depth }.into());
        }

        let graph = self.snapshot();
        let walk = graph.walk(
            root,
            WalkLimits {
                max_depth,
                floor: Bps::saturating(1),
                max_paths: self.config.max_paths,
                simple_only: true,
            },
        );

        let mut grouped: BTreeMap<OrgId, (Bps, usize, usize)> = BTreeMap::new();
        for chain in &walk.chains {
            let entry = grouped
                .entry(chain.descendant)
                .or_insert((Bps::ZERO, 0, usize::MAX));
            entry.0 = entry.0.saturating_add(chain.effective);
            entry.1 += 1;
            entry.2 = entry.2.min(chain.depth);
        }

        let names = self.names();
        let floor = self.floor();
        let mut out: Vec<Holding> = grouped
            .into_iter()
            .filter(|(_, (effective, _, _))| *effective >= floor)
            .filter_map(|(descendant, (effective, paths, min_depth))| {
                Some(Holding {
                    descendant,
                    descendant_name: names.get(&descendant)?.clone(),
                    effective,
                    paths,
                    min_depth,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.effective
                .cmp(&a.effective)
                .then(a.descendant.cmp(&b.descendant))
        });
        Ok(out)
    }

    /// Register a weighted ownership edge `parent -> child`.
    pub fn record_shareholding(&self, new: NewShareholding) -> OrgResult<Shareholding> {
        let share = Bps::checked("share", new.share_bps)?;
        let voting_rights = new
            .voting_bps
            .map(|v| Bps::checked("voting_rights", v))
            .transpose()?;
        if new.parent == new.child {
            return Err(GraphError::SelfOwnership {
                org_id: new.parent.get(),
            }
            .into());
        }

        for org in [new.parent, new.child] {
            if self.repo.get::<Organization>(org)?.is_none() {
                return Err(GraphError::OrganizationNotFound { org_id: org.get() }.into());
            }
        }

        let row = self
            .edges
            .with((new.parent, new.child), || -> OrgResult<Shareholding> {
                let existing = self
                    .repo
                    .find(|s: &Shareholding| s.parent == new.parent && s.child == new.child)?;
                if existing.is_some() {
                    return Err(GraphError::DuplicateShareholding {
                        child: new.child.get(),
                        parent: new.parent.get(),
                    }
                    .into());
                }
                let share_class = new.share_class.unwrap_or_else(|| "common".into());
                Ok(self.repo.insert(|id| Shareholding {
                    id,
                    child: new.child,
                    parent: new.parent,
                    share,
                    voting_rights,
                    share_class,
                    acquisition_date: new.acquisition_date,
                })?)
            })?;
        tracing::debug!(parent = %row.parent, child = %row.child, share = %row.share, "recorded shareholding");
        Ok(row)
    }

    /// Change the share of an existing shareholding.
    pub fn set_share(&self, id: ShareholdingId, share_bps: u32) -> OrgResult<Shareholding> {
        let share = Bps::checked("share", share_bps)?;
        Ok(self.repo.update::<Shareholding>(id, |s| s.share = share)?)
    }

    /// Direct owners of `child`.
    pub fn shareholders_of(&self, child: OrgId) -> Vec<Shareholding> {
        degrade(
            self.repo.filter(|s: &Shareholding| s.child == child),
            "shareholders_of",
        )
    }

    /// Direct stakes held by `parent`.
    pub fn stakes_of(&self, parent: OrgId) -> Vec<Shareholding> {
        degrade(
            self.repo.filter(|s: &Shareholding| s.parent == parent),
            "stakes_of",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrgError;
    use crate::store::testing::down_repo;

    fn resolver() -> OwnershipResolver {
        OwnershipResolver::new(Repository::memory_only(), OwnershipConfig::default())
    }

    fn org(r: &OwnershipResolver, name: &str) -> OrgId {
        r.repo
            .insert(|id| Organization::new(id, name, None, 1))
            .unwrap()
            .id
    }

    fn hold(r: &OwnershipResolver, parent: OrgId, child: OrgId, bps: u32) {
        r.record_shareholding(NewShareholding::new(parent, child, bps))
            .unwrap();
    }

    #[test]
    fn ownership_multiplies_along_chain() {
        let r = resolver();
        let (a, b, c) = (org(&r, "A"), org(&r, "B"), org(&r, "C"));
        hold(&r, a, b, 6_000);
        hold(&r, b, c, 4_000);

        let rows = r.effective_ownership(a).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].descendant, b);
        assert_eq!(rows[0].effective.get(), 6_000);
        assert_eq!(rows[0].depth, 1);

        let c_row = &rows[1];
        assert_eq!(c_row.descendant, c);
        assert_eq!(c_row.descendant_name, "C");
        assert_eq!(c_row.effective.get(), 2_400);
        assert_eq!(c_row.depth, 2);
        assert_eq!(c_row.chain, vec![a, b, c]);
    }

    #[test]
    fn cycles_stop_at_max_depth() {
        let r = resolver();
        let (a, b) = (org(&r, "A"), org(&r, "B"));
        hold(&r, a, b, 10_000);
        hold(&r, b, a, 10_000);

        let rows = r.effective_ownership(a).unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|row| row.depth <= 10));
        assert_eq!(rows.iter().map(|row| row.depth).max(), Some(10));

        let shallow = r.effective_ownership_within(a, 3).unwrap();
        assert_eq!(shallow.len(), 3);
        // odd depths land on B, even depths back on A
        assert!(shallow.iter().all(|row| (row.depth % 2 == 1) == (row.descendant == b)));
    }

    #[test]
    fn chains_below_one_percent_are_excluded() {
        let r = resolver();
        let (a, b, c) = (org(&r, "A"), org(&r, "B"), org(&r, "C"));
        hold(&r, a, b, 500);
        hold(&r, b, c, 1_000);

        let rows = r.effective_ownership(a).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].descendant, b);
    }

    #[test]
    fn exactly_one_percent_is_kept() {
        let r = resolver();
        let (a, b, c) = (org(&r, "A"), org(&r, "B"), org(&r, "C"));
        hold(&r, a, b, 1_000);
        hold(&r, b, c, 1_000);

        let rows = r.effective_ownership(a).unwrap();
        let c_row = rows.iter().find(|row| row.descendant == c).unwrap();
        assert_eq!(c_row.effective, Bps::ONE_PERCENT);
    }

    #[test]
    fn parallel_chains_are_reported_separately() {
        let r = resolver();
        let (a, b, c, d) = (org(&r, "A"), org(&r, "B"), org(&r, "C"), org(&r, "D"));
        hold(&r, a, b, 5_000);
        hold(&r, a, c, 3_000);
        hold(&r, b, d, 10_000);
        hold(&r, c, d, 10_000);

        let rows = r.effective_ownership(a).unwrap();
        let d_rows: Vec<_> = rows.iter().filter(|row| row.descendant == d).collect();
        assert_eq!(d_rows.len(), 2);
        assert_eq!(d_rows[0].effective.get(), 5_000);
        assert_eq!(d_rows[1].effective.get(), 3_000);

        let holdings = r.holdings(a, 10).unwrap();
        let d_total = holdings.iter().find(|h| h.descendant == d).unwrap();
        assert_eq!(d_total.effective.get(), 8_000);
        assert_eq!(d_total.paths, 2);
        assert_eq!(d_total.min_depth, 2);
    }

    #[test]
    fn holdings_ignore_cross_holding_loops() {
        let r = resolver();
        let (a, b) = (org(&r, "A"), org(&r, "B"));
        hold(&r, a, b, 4_000);
        hold(&r, b, a, 4_000);

        let holdings = r.holdings(a, 10).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].descendant, b);
        assert_eq!(holdings[0].effective.get(), 4_000);
    }

    #[test]
    fn results_sorted_strongest_first() {
        let r = resolver();
        let a = org(&r, "A");
        let small = org(&r, "Small");
        let big = org(&r, "Big");
        hold(&r, a, small, 1_500);
        hold(&r, a, big, 9_000);

        let rows = r.effective_ownership(a).unwrap();
        assert_eq!(rows[0].descendant, big);
        assert_eq!(rows[1].descendant, small);
    }

    #[test]
    fn no_shareholdings_means_no_rows() {
        let r = resolver();
        let a = org(&r, "Lonely");
        assert!(r.effective_ownership(a).unwrap().is_empty());
    }

    #[test]
    fn zero_depth_is_invalid() {
        let r = resolver();
        let a = org(&r, "A");
        assert!(matches!(
            r.effective_ownership_within(a, 0),
            Err(OrgError::Argument(ArgumentError::InvalidDepth { depth: 0 }))
        ));
    }

    #[test]
    fn unavailable_store_degrades_to_empty() {
        let r = OwnershipResolver::new(down_repo(), OwnershipConfig::default());
        let root = OrgId::new(1).unwrap();
        assert!(r.effective_ownership(root).unwrap().is_empty());
        assert!(r.shareholders_of(root).is_empty());
    }

    #[test]
    fn path_cap_truncates_walk() {
        let r = OwnershipResolver::new(
            Repository::memory_only(),
            OwnershipConfig {
                max_paths: 4,
                ..Default::default()
            },
        );
        let (a, b) = (org(&r, "A"), org(&r, "B"));
        hold(&r, a, b, 10_000);
        hold(&r, b, a, 10_000);
        assert_eq!(r.effective_ownership(a).unwrap().len(), 4);

        let report = r.ownership_report(a, 10).unwrap();
        assert!(report.truncated);
        assert_eq!(report.paths.len(), 4);
        assert_eq!(report.paths.iter().map(|p| p.depth).max(), Some(4));

        let shallow = r.ownership_report(a, 3).unwrap();
        assert!(!shallow.truncated);
        assert_eq!(shallow.paths.len(), 3);
    }

    #[test]
    fn concurrent_duplicate_shareholdings_keep_one_row() {
        use std::sync::{Arc, Barrier};

        for _ in 0..50 {
            let r = resolver();
            let (a, b) = (org(&r, "A"), org(&r, "B"));
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let r = r.clone();
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        r.record_shareholding(NewShareholding::new(a, b, 5_000))
                            .is_ok()
                    })
                })
                .collect();
            let created = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|ok| *ok)
                .count();

            assert_eq!(created, 1);
            assert_eq!(r.shareholders_of(b).len(), 1);
        }
    }

    #[test]
    fn shareholding_validation() {
        let r = resolver();
        let (a, b) = (org(&r, "A"), org(&r, "B"));

        let too_big = r.record_shareholding(NewShareholding::new(a, b, 10_001));
        assert!(matches!(
            too_big,
            Err(OrgError::Argument(ArgumentError::BasisPointsOutOfRange { .. }))
        ));

        let own = r.record_shareholding(NewShareholding::new(a, a, 100));
        assert!(matches!(own, Err(OrgError::Graph(GraphError::SelfOwnership { .. }))));

        let ghost = OrgId::new(99).unwrap();
        let missing = r.record_shareholding(NewShareholding::new(a, ghost, 100));
        assert!(matches!(
            missing,
            Err(OrgError::Graph(GraphError::OrganizationNotFound { org_id: 99 }))
        ));

        hold(&r, a, b, 2_500);
        let dup = r.record_shareholding(NewShareholding::new(a, b, 100));
        assert!(matches!(
            dup,
            Err(OrgError::Graph(GraphError::DuplicateShareholding { .. }))
        ));

        let direct = r.shareholders_of(b);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].share_class, "common");
        assert_eq!(r.stakes_of(a).len(), 1);
    }

    #[test]
    fn set_share_changes_resolution() {
        let r = resolver();
        let (a, b) = (org(&r, "A"), org(&r, "B"));
        let row = r
            .record_shareholding(NewShareholding::new(a, b, 2_000))
            .unwrap();
        r.set_share(row.id, 7_500).unwrap();
        assert_eq!(r.effective_ownership(a).unwrap()[0].effective.get(), 7_500);
    }

    #[test]
    fn graph_snapshot_counts() {
        let a = OrgId::new(1).unwrap();
        let b = OrgId::new(2).unwrap();
        let rows = vec![Shareholding {
            id: ShareholdingId::new(1).unwrap(),
            child: b,
            parent: a,
            share: Bps::FULL,
            voting_rights: None,
            share_class: "common".into(),
            acquisition_date: None,
        }];
        let g = OwnershipGraph::from_shareholdings(&rows);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }
}
