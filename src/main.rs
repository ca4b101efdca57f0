//! epigate CLI: phase gating and lifecycle validation for agent knowledge bases.

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use miette::Result;

use epistemic_gate::config::GateConfig;
use epistemic_gate::gate::PhaseGate;
use epistemic_gate::holon::{Category, HolonRecord, Layer};
use epistemic_gate::paths::{ProjectPaths, is_holon_id};
use epistemic_gate::phase::{Phase, format_phases};
use epistemic_gate::precondition::PreconditionEngine;
use epistemic_gate::role::expected_role;
use epistemic_gate::state::{PhaseSource, PhaseStateFile};
use epistemic_gate::store::{DurableHolonStore, HolonStore};
use epistemic_gate::tool::{ToolArgs, ToolKind};
use epistemic_gate::validity::compute_valid_until;

#[derive(Parser)]
#[command(name = "epigate", version, about = "Phase gating for agent knowledge bases")]
struct Cli {
    /// Project root containing the FPF directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (default: <root>/epigate.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the knowledge directories, store and default config.
    Init,

    /// Check whether a tool call would be permitted right now.
    Check {
        /// Tool name, e.g. "propose".
        tool: String,

        /// Tool argument as key=value (repeatable).
        #[arg(short = 'a', long = "arg", value_parser = parse_key_val)]
        args: Vec<(String, String)>,
    },

    /// Inspect or set the current phase.
    Phase {
        #[command(subcommand)]
        action: PhaseAction,
    },

    /// Resolve a holon's current layer.
    Layer {
        /// Holon identifier.
        id: String,
    },

    /// Print the evidence expiry date for a test type.
    ValidUntil {
        /// "internal", "external", or anything else for the default.
        #[arg(default_value = "")]
        test_type: String,
    },

    /// Maintain holon records in the store.
    Holon {
        #[command(subcommand)]
        action: HolonAction,
    },

    /// Print the phase-gate table and tool roles.
    Gates,
}

#[derive(Subcommand)]
enum PhaseAction {
    /// Show the current phase and the roles it expects.
    Show,
    /// Overwrite the current phase.
    Set {
        /// IDLE, ABDUCTION, DEDUCTION, INDUCTION, AUDIT, DECISION or OPERATION.
        phase: Phase,
    },
}

#[derive(Subcommand)]
enum HolonAction {
    /// Add an L0 hypothesis record.
    Add {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// "system" or "episteme".
        #[arg(long, default_value = "system")]
        kind: String,
        /// Context the holon belongs to.
        #[arg(long)]
        context: Option<String>,
    },
    /// Move a holon to a later layer (L1, L2) or to "invalid".
    ///
    /// Reaching L2 stamps the evidence expiry date.
    Promote {
        id: String,
        layer: Layer,
        /// "internal" (90 days) or "external" (60 days).
        #[arg(long, default_value = "internal")]
        test_type: String,
    },
    /// List every holon in the store.
    List,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got \"{s}\""))?;
    Ok((key.to_string(), value.to_string()))
}

fn load_config(cli: &Cli) -> Result<GateConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| ProjectPaths::config_file(&cli.root));
    Ok(GateConfig::load_or_default(&path)?)
}

fn open_store(paths: &ProjectPaths) -> Result<DurableHolonStore> {
    Ok(DurableHolonStore::open(&paths.store_file)?)
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
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let paths = ProjectPaths::new(&cli.root, &config.fpf_dir);

    match &cli.command {
        Commands::Init => init(&cli.root, &cli.config, &config, &paths)?,

        Commands::Check { tool, args } => {
            let engine = PreconditionEngine::from_config(&cli.root, &config)?;
            let args: ToolArgs = args.iter().cloned().collect();
            let permit = engine.check_preconditions(tool, &args)?;
            if permit.refresh {
                println!("permitted (L2 refresh, phase gate bypassed)");
            } else {
                println!("permitted");
            }
        }

        Commands::Phase { action } => {
            let state = PhaseStateFile::new(paths.state_file.clone());
            match action {
                PhaseAction::Show => {
                    let phase = state.load()?.phase;
                    println!("{phase} (expects {})", expected_role(phase));
                }
                PhaseAction::Set { phase } => {
                    state.record_phase(*phase)?;
                    println!("phase set to {phase}");
                }
            }
        }

        Commands::Layer { id } => {
            let engine = PreconditionEngine::from_config(&cli.root, &config)?;
            let layer = engine.resolve_layer(id)?;
            println!("{id}: {layer}");
        }

        Commands::ValidUntil { test_type } => {
            println!("{}", compute_valid_until(test_type));
        }

        Commands::Holon { action } => holon(action, &config, &paths)?,

        Commands::Gates => {
            let gate = PhaseGate::new(config.gate_policy);
            println!("policy: {:?}", gate.policy());
            for kind in ToolKind::ALL {
                let phases = gate
                    .allowed_phases(kind)
                    .map_or_else(|| "unrestricted".to_string(), format_phases);
                println!("{:<16} {:<12} {phases}", kind.name(), kind.role().as_str());
            }
        }
    }

    Ok(())
}

fn init(
    root: &Path,
    config_arg: &Option<PathBuf>,
    config: &GateConfig,
    paths: &ProjectPaths,
) -> Result<()> {
    paths.ensure_dirs()?;

    let state = PhaseStateFile::new(paths.state_file.clone());
    if !paths.state_file.exists() {
        state.record_phase(Phase::Idle)?;
    }
    if config.use_store {
        open_store(paths)?;
    }
    let config_path = config_arg
        .clone()
        .unwrap_or_else(|| ProjectPaths::config_file(root));
    if !config_path.exists() {
        config.save(&config_path)?;
    }
    println!("Initialized knowledge base at {}", paths.fpf_dir.display());
    Ok(())
}

fn holon(action: &HolonAction, config: &GateConfig, paths: &ProjectPaths) -> Result<()> {
    let store = open_store(paths)?;
    match action {
        HolonAction::Add {
            id,
            title,
            content,
            kind,
            context,
        } => {
            if !is_holon_id(id) {
                miette::bail!("holon id must be a plain file name, got \"{id}\"");
            }
            let category: Category = kind
                .parse()
                .map_err(|()| miette::miette!("kind must be 'system' or 'episteme'"))?;
            let record = HolonRecord::hypothesis(id, category, title, content)
                .with_context(context.clone().unwrap_or_else(|| config.context_id.clone()));
            store.put_holon(&record)?;
            println!("added {id} at L0");
        }
        HolonAction::Promote {
            id,
            layer,
            test_type,
        } => {
            let mut record = store.get_holon(id)?;
            let current = record.layer;
            if !record.advance(*layer, Local::now().date_naive(), test_type) {
                miette::bail!(
                    "cannot move {id} from {current} to {layer}: layers only advance L0 -> L1 -> L2"
                );
            }
            store.put_holon(&record)?;
            match &record.valid_until {
                Some(date) => println!("{id}: {current} -> {layer} (valid until {date})"),
                None => println!("{id}: {current} -> {layer}"),
            }
        }
        HolonAction::List => {
            let holons = store.all_holons()?;
            if holons.is_empty() {
                println!("no holons");
            }
            for h in holons {
                println!(
                    "{:<24} {:<8} {:<9} {:<10} {:<11} {}",
                    h.id,
                    h.layer,
                    h.category.as_str(),
                    h.context_id,
                    h.valid_until.as_deref().unwrap_or("-"),
                    h.title
                );
            }
        }
    }
    Ok(())
}
