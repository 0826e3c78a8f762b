//! Stock-flow accumulators and their one-step projection.
//!
//! A [`Stock`] holds a quantity; a [`Flow`] moves `current_rate` per step out
//! of its source and into its target. The projection for one step is
//! `current + Σ inflow − Σ outflow`. Rate formulas are stored but never
//! evaluated, and projections are not clamped to stock bounds.

use serde::Serialize;

use crate::error::{ArgumentError, DynamicsError, OrgResult};
use crate::graph::require_name;
use crate::ids::{EntityRef, FlowId, StockId};
use crate::model::{
    Attributes, DECIMAL_SCALE, Flow, FlowType, RunStatus, SimulationRun, Stock, now_secs,
};
use crate::store::{KeyedLocks, Repository, degrade};

/// Render a fixed-point value with four decimal digits: `12_500` → `"1.2500"`.
pub fn format_fixed(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let scale = DECIMAL_SCALE.unsigned_abs();
    format!("{sign}{}.{:04}", abs / scale, abs % scale)
}

/// Which bound a projection crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsBreach {
    BelowMin { min: i64 },
    AboveMax { max: i64 },
}

/// One stock with its aggregated flows and projected next value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockDynamics {
    pub stock_id: StockId,
    pub stock_name: String,
    pub current_value: i64,
    pub unit: Option<String>,
    pub total_inflow: i64,
    pub total_outflow: i64,
    pub projected_value: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
}

impl StockDynamics {
    /// Whether the projection leaves `[min_value, max_value]`.
    pub fn bounds_breach(&self) -> Option<BoundsBreach> {
        if let Some(min) = self.min_value {
            if self.projected_value < min {
                return Some(BoundsBreach::BelowMin { min });
            }
        }
        if let Some(max) = self.max_value {
            if self.projected_value > max {
                return Some(BoundsBreach::AboveMax { max });
            }
        }
        None
    }

    /// Net change for the step.
    pub fn net_flow(&self) -> i64 {
        self.total_inflow.saturating_sub(self.total_outflow)
    }
}

/// Input for [`StockFlowProjector::create_stock`].
#[derive(Debug, Clone)]
pub struct NewStock {
    pub owner: EntityRef,
    pub name: String,
    pub initial_value: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub unit: Option<String>,
}

impl NewStock {
    pub fn new(owner: EntityRef, name: impl Into<String>, initial_value: i64) -> Self {
        Self {
            owner,
            name: name.into(),
            initial_value,
            min_value: None,
            max_value: None,
            unit: None,
        }
    }
}

/// Input for [`StockFlowProjector::create_flow`].
#[derive(Debug, Clone)]
pub struct NewFlow {
    pub name: String,
    pub source: Option<StockId>,
    pub target: Option<StockId>,
    pub flow_type: FlowType,
    pub rate: i64,
    pub rate_formula: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StockFlowProjector {
    repo: Repository,
    stock_names: KeyedLocks<(EntityRef, String)>,
}

impl StockFlowProjector {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            stock_names: KeyedLocks::new(),
        }
    }

    pub fn create_stock(&self, new: NewStock) -> OrgResult<Stock> {
        let name = require_name("stock name", &new.name)?;
        if let (Some(min), Some(max)) = (new.min_value, new.max_value) {
            if min > max {
                return Err(ArgumentError::InvalidBounds { min, max }.into());
            }
        }
        let key = (new.owner, name.clone());
        self.stock_names.with(key, || -> OrgResult<Stock> {
            let clash = self
                .repo
                .find(|s: &Stock| s.owner == new.owner && s.name == name)?;
            if clash.is_some() {
                return Err(DynamicsError::DuplicateStock {
                    owner: new.owner.to_string(),
                    name,
                }
                .into());
            }
            Ok(self.repo.insert(|id| Stock {
                id,
                owner: new.owner,
                name,
                current_value: new.initial_value,
                min_value: new.min_value,
                max_value: new.max_value,
                unit: new.unit,
            })?)
        })
    }

    pub fn create_flow(&self, new: NewFlow) -> OrgResult<Flow> {
        let name = require_name("flow name", &new.name)?;
        for stock in [new.source, new.target].into_iter().flatten() {
            if self.repo.get::<Stock>(stock)?.is_none() {
                return Err(DynamicsError::StockNotFound {
                    stock_id: stock.get(),
                }
                .into());
            }
        }
        Ok(self.repo.insert(|id| Flow {
            id,
            name,
            source: new.source,
            target: new.target,
            flow_type: new.flow_type,
            current_rate: new.rate,
            rate_formula: new.rate_formula,
        })?)
    }

    /// Replace a flow's current rate.
    pub fn set_rate(&self, flow: FlowId, rate: i64) -> OrgResult<Flow> {
        if self.repo.get::<Flow>(flow)?.is_none() {
            return Err(DynamicsError::FlowNotFound {
                flow_id: flow.get(),
            }
            .into());
        }
        Ok(self.repo.update::<Flow>(flow, |f| f.current_rate = rate)?)
    }

    /// Replace a stock's current value.
    pub fn set_value(&self, stock: StockId, value: i64) -> OrgResult<Stock> {
        if self.repo.get::<Stock>(stock)?.is_none() {
            return Err(DynamicsError::StockNotFound {
                stock_id: stock.get(),
            }
            .into());
        }
        Ok(self.repo.update::<Stock>(stock, |s| s.current_value = value)?)
    }

    pub fn stocks_of(&self, owner: EntityRef) -> Vec<Stock> {
        degrade(self.repo.filter(|s: &Stock| s.owner == owner), "stocks_of")
    }

    /// One-step projection of every stock owned by `owner`, ordered by stock id.
    pub fn dynamics(&self, owner: EntityRef) -> Vec<StockDynamics> {
        let stocks = self.stocks_of(owner);
        if stocks.is_empty() {
            return Vec::new();
        }
        let flows: Vec<Flow> = degrade(self.repo.scan(), "flows");

        stocks
            .into_iter()
            .map(|stock| {
                let total_inflow = flows
                    .iter()
                    .filter(|f| f.target == Some(stock.id))
                    .fold(0i64, |acc, f| acc.saturating_add(f.current_rate));
                let total_outflow = flows
                    .iter()
                    .filter(|f| f.source == Some(stock.id))
                    .fold(0i64, |acc, f| acc.saturating_add(f.current_rate));
                let projected_value = stock
                    .current_value
                    .saturating_add(total_inflow)
                    .saturating_sub(total_outflow);
                StockDynamics {
                    stock_id: stock.id,
                    stock_name: stock.name,
                    current_value: stock.current_value,
                    unit: stock.unit,
                    total_inflow,
                    total_outflow,
                    projected_value,
                    min_value: stock.min_value,
                    max_value: stock.max_value,
                }
            })
            .collect()
    }

    /// Project `subject` and store the snapshot as a simulation run.
    pub fn record_run(&self, subject: EntityRef, name: &str) -> OrgResult<SimulationRun> {
        let name = require_name("run name", name)?;
        let snapshot = self.dynamics(subject);
        let (status, results) = match serde_json::to_value(&snapshot) {
            Ok(value) => (RunStatus::Completed, Attributes::from_json(&value)),
            Err(e) => (
                RunStatus::Failed,
                Attributes::from_json(&serde_json::json!({ "error": e.to_string() })),
            ),
        };
        let run = self.repo.insert(|id| SimulationRun {
            id,
            name,
            subject,
            steps: 1,
            status,
            results,
            created_at: now_secs(),
        })?;
        tracing::info!(run = %run.id, %subject, stocks = snapshot.len(), status = %run.status, "recorded simulation run");
        Ok(run)
    }

    pub fn runs_of(&self, subject: EntityRef) -> Vec<SimulationRun> {
        degrade(
            self.repo.filter(|r: &SimulationRun| r.subject == subject),
            "runs_of",
        )
    }
}
