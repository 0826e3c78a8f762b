//! orgweave CLI: organization ownership, relationships, and debts.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use orgweave::config::EngineConfig;
use orgweave::dynamics::format_fixed;
use orgweave::engine::Engine;
use orgweave::ids::{DebtId, EntityKind, EntityRef, NodeId};

#[derive(Parser)]
#[command(name = "orgweave", version, about = "Organization ownership and debt ledger")]
struct Cli {
    /// Data directory for persistent storage.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new orgweave data directory.
    Init,

    /// Import organizations, holdings, relationships, stocks, and debts from a JSON seed.
    Import {
        /// Path to the seed file.
        #[arg(long)]
        file: PathBuf,
    },

    /// Effective ownership held by an organization.
    Ownership {
        /// Organization name or numeric ID.
        org: String,

        /// Maximum chain length (defaults to the configured depth).
        #[arg(long)]
        max_depth: Option<usize>,

        /// Sum chains per descendant instead of listing each one.
        #[arg(long)]
        summed: bool,
    },

    /// Relationships of an entity, in both directions.
    Relationships {
        /// Entity kind: organization, user, or agent.
        kind: String,
        /// Entity ID.
        id: u64,

        /// Only relationships valid on this date (YYYY-MM-DD).
        #[arg(long)]
        on: Option<NaiveDate>,
    },

    /// Hyperedges a hypergraph node belongs to.
    Neighborhood {
        /// Hypergraph node ID.
        node: u64,
    },

    /// One-step stock-flow projection for an entity.
    Dynamics {
        /// Entity kind: organization, user, or agent.
        kind: String,
        /// Entity ID.
        id: u64,

        /// Store the projection as a named simulation run.
        #[arg(long)]
        record: Option<String>,
    },

    /// Inspect and pay debts.
    Debt {
        #[command(subcommand)]
        action: DebtAction,
    },

    /// Show engine info and statistics.
    Info,
}

#[derive(Subcommand)]
enum DebtAction {
    /// Show a debt and its payments.
    Show {
        /// Debt ID.
        id: u64,
    },
    /// Record a payment.
    Pay {
        /// Debt ID.
        id: u64,
        /// Amount in minor currency units (cents).
        amount: i64,
        /// Payment date (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Free-text note.
        #[arg(long)]
        notes: Option<String>,
    },
    /// List debts, optionally for one organization.
    List {
        /// Organization name or numeric ID.
        #[arg(long)]
        org: Option<String>,
    },
    /// Mark active debts past their due date as overdue.
    Overdue {
        /// Reference date (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            let data_dir = config
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".orgweave"));
            config.data_dir = Some(data_dir.clone());
            let engine = Engine::new(config)?;
            println!("Initialized orgweave at {}", data_dir.display());
            println!("{}", engine.info());
        }

        Commands::Import { file } => {
            let engine = Engine::new(config)?;
            let summary = engine.import_file(&file)?;
            println!("{summary}");
        }

        Commands::Ownership {
            org,
            max_depth,
            summed,
        } => {
            let engine = Engine::new(config)?;
            let root = engine.hierarchy().resolve(&org)?;
            let depth = max_depth.unwrap_or(engine.config().ownership.max_depth);

            if summed {
                let holdings = engine.ownership().holdings(root.id, depth)?;
                if json {
                    return print_json(&holdings);
                }
                println!("Holdings of \"{}\" (depth {depth}):", root.name);
                for h in &holdings {
                    println!(
                        "  {:>8}  \"{}\" / {} ({} chains, shortest {})",
                        h.effective.to_string(),
                        h.descendant_name,
                        h.descendant,
                        h.paths,
                        h.min_depth
                    );
                }
            } else {
                let report = engine.ownership().ownership_report(root.id, depth)?;
                if json {
                    return print_json(&report);
                }
                println!("Effective ownership of \"{}\" (depth {depth}):", root.name);
                for p in &report.paths {
                    let chain: Vec<String> = p.chain.iter().map(|id| id.get().to_string()).collect();
                    println!(
                        "  {:>8}  \"{}\" / {} depth={} via {}",
                        p.effective.to_string(),
                        p.descendant_name,
                        p.descendant,
                        p.depth,
                        chain.join(" -> ")
                    );
                }
                if report.truncated {
                    println!(
                        "  (stopped after {} chains; raise ownership.max_paths to see more)",
                        engine.config().ownership.max_paths
                    );
                }
            }
        }

        Commands::Relationships { kind, id, on } => {
            let engine = Engine::new(config)?;
            let entity = EntityRef::new(kind.parse::<EntityKind>()?, id);
            let views = match on {
                Some(date) => engine.relationships().active_relationships_of(entity, date),
                None => engine.relationships().relationships_of(entity),
            };
            if json {
                return print_json(&views);
            }
            if views.is_empty() {
                println!("No relationships for {entity}.");
            }
            for v in &views {
                let arrow = match v.direction {
                    orgweave::graph::Direction::Outgoing => "->",
                    orgweave::graph::Direction::Incoming => "<-",
                };
                println!(
                    "  {} {arrow} {} [{} / {}] weight={}",
                    entity, v.connected, v.type_name, v.category, v.weight
                );
            }
        }

        Commands::Neighborhood { node } => {
            let engine = Engine::new(config)?;
            let Some(node) = NodeId::new(node) else {
                miette::bail!("node id must be positive");
            };
            let hood = engine.hypergraph().neighborhood(node);
            if json {
                return print_json(&hood);
            }
            if hood.is_empty() {
                println!("Node {node} belongs to no hyperedges.");
            }
            for edge in &hood {
                println!("  {} \"{}\" [{}]", edge.hyperedge_id, edge.label, edge.edge_type);
                for label in edge.participant_labels() {
                    println!("    - {label}");
                }
            }
        }

        Commands::Dynamics { kind, id, record } => {
            let engine = Engine::new(config)?;
            let entity = EntityRef::new(kind.parse::<EntityKind>()?, id);
            if let Some(name) = record {
                let run = engine.dynamics().record_run(entity, &name)?;
                if !json {
                    println!("Recorded {} \"{}\" [{}]", run.id, run.name, run.status);
                }
            }
            let dynamics = engine.dynamics().dynamics(entity);
            if json {
                return print_json(&dynamics);
            }
            for d in &dynamics {
                let unit = d.unit.as_deref().unwrap_or("");
                println!(
                    "  \"{}\" {} {unit}: +{} -{} => {}{}",
                    d.stock_name,
                    format_fixed(d.current_value),
                    format_fixed(d.total_inflow),
                    format_fixed(d.total_outflow),
                    format_fixed(d.projected_value),
                    if d.bounds_breach().is_some() { " (out of bounds)" } else { "" }
                );
            }
        }

        Commands::Debt { action } => {
            let engine = Engine::new(config)?;
            let ledger = engine.ledger();
            let today = chrono::Local::now().date_naive();

            match action {
                DebtAction::Show { id } => {
                    let debt = ledger.debt_by_id(debt_id(id)?)?;
                    let payments = ledger.payments_for(debt.id);
                    if json {
                        return print_json(&serde_json::json!({
                            "debt": debt,
                            "payments": payments,
                        }));
                    }
                    println!("Debt {} owed to \"{}\"", debt.id, debt.creditor_name);
                    println!("  organization: {}", debt.organization);
                    println!("  original:     {}", debt.original_amount);
                    println!("  remaining:    {}", debt.remaining_amount);
                    println!("  status:       {}", debt.status);
                    if let Some(due) = debt.due_date {
                        println!("  due:          {due}");
                    }
                    for p in &payments {
                        println!(
                            "    {} {} {}",
                            p.payment_date,
                            p.amount,
                            p.notes.as_deref().unwrap_or("")
                        );
                    }
                }
                DebtAction::Pay {
                    id,
                    amount,
                    date,
                    notes,
                } => {
                    let outcome =
                        ledger.add_payment(debt_id(id)?, amount, date.unwrap_or(today), notes)?;
                    if json {
                        return print_json(&outcome);
                    }
                    println!(
                        "Recorded {} on {}: remaining {} [{}]",
                        outcome.payment_id, outcome.debt_id, outcome.remaining_amount, outcome.status
                    );
                }
                DebtAction::List { org } => {
                    let debts = match org {
                        Some(name) => {
                            let org = engine.hierarchy().resolve(&name)?;
                            ledger.debts_of(org.id)
                        }
                        None => ledger.debts(),
                    };
                    if json {
                        return print_json(&debts);
                    }
                    for d in &debts {
                        println!(
                            "  {} {} -> \"{}\" {}/{} [{}]",
                            d.id,
                            d.organization,
                            d.creditor_name,
                            d.remaining_amount,
                            d.original_amount,
                            d.status
                        );
                    }
                }
                DebtAction::Overdue { today: reference } => {
                    let changed = ledger.mark_overdue(reference.unwrap_or(today))?;
                    if json {
                        return print_json(&changed);
                    }
                    println!("Marked {} debts overdue.", changed.len());
                }
            }
        }

        Commands::Info => {
            let engine = Engine::new(config)?;
            println!("{}", engine.info());
        }
    }

    Ok(())
}

fn debt_id(raw: u64) -> Result<DebtId> {
    DebtId::new(raw).ok_or_else(|| miette::miette!("debt id must be positive"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
