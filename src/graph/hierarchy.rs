//! The single-parent organization tree.
//!
//! Coexists with weighted shareholdings; the two are not reconciled.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{GraphError, OrgResult};
use crate::ids::OrgId;
use crate::model::Organization;
use crate::store::{Repository, degrade};

use super::require_name;

#[derive(Debug, Clone)]
pub struct Hierarchy {
    repo: Repository,
    /// Held across the cycle walk and the write in `set_parent`.
    reparent: Arc<Mutex<()>>,
}

impl Hierarchy {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            reparent: Arc::default(),
        }
    }

    /// Create an organization, optionally under an existing parent.
    pub fn create_organization(
        &self,
        name: &str,
        parent: Option<OrgId>,
        owner: u64,
    ) -> OrgResult<Organization> {
        let name = require_name("organization name", name)?;
        if let Some(parent) = parent {
            self.require(parent)?;
        }
        let org = self
            .repo
            .insert(|id| Organization::new(id, name, parent, owner))?;
        tracing::debug!(org = %org.id, name = %org.name, "created organization");
        Ok(org)
    }

    /// Move `child` under `parent`, or detach it with `None`.
    ///
    /// Fails with [`GraphError::HierarchyCycle`] if `parent` is `child` or
    /// one of its descendants.
    pub fn set_parent(&self, child: OrgId, parent: Option<OrgId>) -> OrgResult<Organization> {
        let _guard = self.reparent.lock().unwrap_or_else(PoisonError::into_inner);
        self.require(child)?;
        if let Some(parent) = parent {
            self.require(parent)?;
            let mut cursor = Some(parent);
            let mut seen = HashSet::new();
            while let Some(current) = cursor {
                if current == child {
                    return Err(GraphError::HierarchyCycle {
                        child: child.get(),
                        parent: parent.get(),
                    }
                    .into());
                }
                if !seen.insert(current) {
                    break;
                }
                cursor = self
                    .repo
                    .get::<Organization>(current)?
                    .and_then(|o| o.parent);
            }
        }
        Ok(self.repo.update::<Organization>(child, |o| o.parent = parent)?)
    }

    fn require(&self, id: OrgId) -> OrgResult<Organization> {
        self.repo
            .get::<Organization>(id)?
            .ok_or_else(|| GraphError::OrganizationNotFound { org_id: id.get() }.into())
    }

    /// Every organization, ordered by id.
    pub fn organizations(&self) -> Vec<Organization> {
        degrade(self.repo.scan(), "organizations")
    }

    pub fn organization(&self, id: OrgId) -> Option<Organization> {
        degrade(self.repo.get(id), "organization")
    }

    /// Direct children in the tree.
    pub fn children(&self, org: OrgId) -> Vec<Organization> {
        degrade(
            self.repo.filter(|o: &Organization| o.parent == Some(org)),
            "children",
        )
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, org: OrgId) -> Vec<Organization> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([org]);
        let mut cursor = self.organization(org).and_then(|o| o.parent);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                tracing::warn!(%org, at = %id, "organization tree contains a cycle");
                break;
            }
            let Some(next) = self.organization(id) else {
                break;
            };
            cursor = next.parent;
            out.push(next);
        }
        out
    }

    /// Look an organization up by numeric id or by exact name (case-insensitive).
    ///
    /// Numeric text that is not a known id is tried as a name. A name shared
    /// by several organizations does not resolve.
    pub fn resolve(&self, name_or_id: &str) -> OrgResult<Organization> {
        let needle = name_or_id.trim();
        if let Some(id) = needle.parse::<u64>().ok().and_then(OrgId::new) {
            if let Some(org) = self.repo.get::<Organization>(id)? {
                return Ok(org);
            }
        }

        let mut matches = self
            .repo
            .filter(|o: &Organization| o.name.eq_ignore_ascii_case(needle))?;
        if matches.len() == 1 {
            return Ok(matches.remove(0));
        }
        Err(GraphError::UnresolvedOrganization {
            name: needle.to_string(),
        }
        .into())
    }
}
