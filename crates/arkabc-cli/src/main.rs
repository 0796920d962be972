//! arkabc CLI: run reference circuits through the proof pipeline on any
//! registered curve, and fold leaf proofs into recursive aggregation trees.
//!
//! Four commands: `curves`, `run`, `aggregate` and `calldata`.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "arkabc",
    about = "Groth16 and Marlin over arkworks curves, with recursive proof aggregation",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to arkabc.config.json (default: ./arkabc.config.json)
    #[arg(long, global = true, default_value = "arkabc.config.json")]
    config: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered curves
    Curves {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile, set up, prove and verify a reference circuit
    Run {
        /// Reference circuit to run
        #[arg(long, value_enum, default_value = "product")]
        circuit: CircuitChoice,

        /// Curve name (overrides the config file)
        #[arg(long)]
        curve: Option<String>,

        /// Proving scheme (overrides the config file)
        #[arg(long, value_enum)]
        scheme: Option<SchemeChoice>,

        /// Benchmark iterations per stage (overrides the config file)
        #[arg(long)]
        bench: Option<u32>,

        /// JSON file holding the circuit's values
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Directory to write the artifacts and report to
        #[arg(long, short)]
        out: Option<PathBuf>,

        /// Fixed RNG seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Prove product leaves and aggregate them recursively
    Aggregate {
        /// Path to an arkabc.aggregate.json; replaces the flags below
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Curve the leaves are proved on
        #[arg(long, default_value = "BLS12-377")]
        leaf_curve: String,

        /// Outer curve of each depth, comma separated
        #[arg(long, value_delimiter = ',', default_value = "BW6-761")]
        chain: Vec<String>,

        /// Number of leaf proofs
        #[arg(long, default_value = "2")]
        leaves: usize,

        /// How the child verifying key enters the aggregation circuit
        #[arg(long, value_enum, default_value = "witness")]
        key_material: KeyMaterialChoice,

        /// Directory holding the layer artifacts
        #[arg(long, short, default_value = "aggregate")]
        out: PathBuf,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Format a stored BN254 Groth16 proof as EVM verifier call data
    Calldata {
        /// Path to the proof artifact
        #[arg(long)]
        proof: PathBuf,

        /// Path to the public witness artifact
        #[arg(long)]
        witness: PathBuf,

        /// Write the call data JSON here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CircuitChoice {
    Product,
    Hash,
    Exponentiate,
}

impl CircuitChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Hash => "hash",
            Self::Exponentiate => "exponentiate",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SchemeChoice {
    Groth16,
    Marlin,
}

impl SchemeChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groth16 => "groth16",
            Self::Marlin => "marlin",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KeyMaterialChoice {
    Witness,
    Constant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Curves { json } => {
            commands::curves::run(json).await?;
        }
        Commands::Run {
            circuit,
            curve,
            scheme,
            bench,
            input,
            out,
            seed,
        } => {
            let overrides = commands::run::Overrides {
                curve,
                scheme,
                iterations: bench,
                seed,
            };
            commands::run::run(
                &cli.config,
                circuit,
                overrides,
                input.as_deref(),
                out.as_deref(),
            )
            .await?;
        }
        Commands::Aggregate {
            plan,
            leaf_curve,
            chain,
            leaves,
            key_material,
            out,
            seed,
        } => {
            let flags = commands::aggregate::Flags {
                leaf_curve,
                chain,
                key_material,
                output_dir: out,
                seed,
            };
            commands::aggregate::run(plan.as_deref(), flags, leaves).await?;
        }
        Commands::Calldata {
            proof,
            witness,
            output,
        } => {
            commands::calldata::run(&proof, &witness, output.as_deref()).await?;
        }
    }

    Ok(())
}
