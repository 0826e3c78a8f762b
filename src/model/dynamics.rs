//! Stock-flow records.
//!
//! Values and rates are fixed-point integers with four decimal digits:
//! `12_500` is `1.25`.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityRef, FlowId, RunId, StockId};
use crate::store::{Record, Table};

use super::Attributes;

/// Fixed-point scale of stock values and flow rates.
pub const DECIMAL_SCALE: i64 = 10_000;

/// A named accumulator owned by an entity. `(owner, name)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub owner: EntityRef,
    pub name: String,
    pub current_value: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub unit: Option<String>,
}

impl Record for Stock {
    type Id = StockId;
    const TABLE: Table = Table::Stocks;

    fn id(&self) -> StockId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Inflow,
    Outflow,
    Biflow,
}

text_enum!(FlowType, "flow type" {
    Inflow => "inflow",
    Outflow => "outflow",
    Biflow => "biflow",
});

/// A rate moving quantity out of `source` and into `target` each step.
/// A missing end is exogenous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    pub source: Option<StockId>,
    pub target: Option<StockId>,
    pub flow_type: FlowType,
    pub current_rate: i64,
    /// Stored for reference; never evaluated.
    pub rate_formula: Option<String>,
}

impl Record for Flow {
    type Id = FlowId;
    const TABLE: Table = Table::Flows;

    fn id(&self) -> FlowId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

text_enum!(RunStatus, "run status" {
    Completed => "completed",
    Failed => "failed",
});

/// A recorded projection: the stock-flow snapshot of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub id: RunId,
    pub name: String,
    pub subject: EntityRef,
    pub steps: u32,
    pub status: RunStatus,
    pub results: Attributes,
    pub created_at: u64,
}

impl Record for SimulationRun {
    type Id = RunId;
    const TABLE: Table = Table::SimulationRuns;

    fn id(&self) -> RunId {
        self.id
    }
}
