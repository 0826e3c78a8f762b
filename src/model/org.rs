//! Organizations and weighted shareholdings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{Bps, OrgId, ShareholdingId};
use crate::store::{Record, Table};

use super::now_secs;

/// An organization. `parent` is the legacy single-parent tree; weighted
/// multi-parent ownership lives in [`Shareholding`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub parent: Option<OrgId>,
    /// User id of the owning account.
    pub owner: u64,
    pub created_at: u64,
}

impl Organization {
    pub fn new(id: OrgId, name: impl Into<String>, parent: Option<OrgId>, owner: u64) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            owner,
            created_at: now_secs(),
        }
    }
}

impl Record for Organization {
    type Id = OrgId;
    const TABLE: Table = Table::Organizations;

    fn id(&self) -> OrgId {
        self.id
    }
}

/// One weighted ownership edge: `parent` holds `share` of `child`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shareholding {
    pub id: ShareholdingId,
    pub child: OrgId,
    pub parent: OrgId,
    pub share: Bps,
    pub voting_rights: Option<Bps>,
    pub share_class: String,
    pub acquisition_date: Option<NaiveDate>,
}

impl Record for Shareholding {
    type Id = ShareholdingId;
    const TABLE: Table = Table::Shareholdings;

    fn id(&self) -> ShareholdingId {
        self.id
    }
}
