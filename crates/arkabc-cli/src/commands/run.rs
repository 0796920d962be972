use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use arkabc_circuits::{
    Blake2sCircuit, ExponentiateCircuit, ExponentiateShape, ExponentiateValues, HashValues,
    ProductCircuit, ProductValues,
};
use arkabc_core::config::{self, PipelineConfig};
use arkabc_core::pipeline::{build_pipeline_from_config, PortableCircuit};
use arkabc_core::{ArtifactStore, CurveId, CurveRegistry, ProofPipeline, SchemeKind};

use crate::output;
use crate::{CircuitChoice, SchemeChoice};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub curve: Option<String>,
    pub scheme: Option<SchemeChoice>,
    pub iterations: Option<u32>,
    pub seed: Option<u64>,
}

/// Start from the config file if there is one, then apply `overrides`.
pub fn resolve_config(config_path: &Path, overrides: Overrides) -> Result<PipelineConfig> {
    let mut config = if config_path.exists() {
        config::load(config_path)?
    } else {
        PipelineConfig::default()
    };
    if let Some(name) = overrides.curve {
        config.curve = CurveRegistry::new().lookup(&name)?.id;
    }
    if let Some(scheme) = overrides.scheme {
        config.scheme = scheme.as_str().parse()?;
    }
    if let Some(iterations) = overrides.iterations {
        config.iterations = iterations;
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }
    config.validate()?;
    debug!(
        curve = %config.curve,
        scheme = %config.scheme,
        iterations = config.iterations,
        "pipeline config resolved"
    );
    Ok(config)
}

fn read_values<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} does not hold this circuit's values", path.display()))
}

/// Smallest exponent width that fits `e`, never below the default.
fn exponent_shape(values: &ExponentiateValues) -> ExponentiateShape {
    let needed = (u64::BITS - values.e.leading_zeros()) as usize;
    ExponentiateShape {
        exponent_bits: needed.max(ExponentiateShape::default().exponent_bits),
    }
}

/// Run a reference circuit through every stage, then report and store it.
pub async fn run(
    config_path: &Path,
    circuit: CircuitChoice,
    overrides: Overrides,
    input: Option<&Path>,
    out: Option<&Path>,
) -> Result<()> {
    output::print_header("arkabc run");

    let config = resolve_config(config_path, overrides)?;
    output::print_key_value("Circuit", circuit.as_str());
    output::print_key_value("Curve", config.curve.name());
    output::print_key_value("Scheme", config.scheme.name());
    if config.iterations > 1 {
        output::print_key_value("Iterations", &config.iterations.to_string());
    }

    let pipeline = match circuit {
        CircuitChoice::Product => {
            let values = match input {
                Some(path) => read_values(path)?,
                None => ProductValues::factors(13, 17),
            };
            drive::<ProductCircuit>(config.clone(), (), values).await?
        }
        CircuitChoice::Hash => {
            let values = match input {
                Some(path) => read_values(path)?,
                None => HashValues::of(b"arkabc"),
            };
            drive::<Blake2sCircuit>(config.clone(), values.shape(), values).await?
        }
        CircuitChoice::Exponentiate => {
            let values = match input {
                Some(path) => read_values(path)?,
                None => ExponentiateValues::of(3, 5)
                    .context("default exponentiation overflows")?,
            };
            drive::<ExponentiateCircuit>(config.clone(), exponent_shape(&values), values).await?
        }
    };

    report(pipeline.as_ref(), circuit, &config, out)
}

/// Compile, set up, prove and verify on tokio's blocking pool. With more
/// than one iteration each stage is benchmarked instead of run once.
async fn drive<C>(
    config: PipelineConfig,
    shape: C::Shape,
    values: C::Values,
) -> Result<Box<dyn ProofPipeline<C::Values>>>
where
    C: PortableCircuit,
    C::Shape: Send + 'static,
    C::Values: 'static,
{
    let pipeline = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut pipeline = build_pipeline_from_config::<C>(&config, &shape)?;
        let iterations = config.iterations;
        let bench = iterations > 1;

        output::print_step(1, 4, "Compiling circuit...");
        if bench {
            pipeline.benchmark_compile(iterations)?;
        } else {
            pipeline.compile()?;
        }

        let setup = if config.scheme.uses_srs() {
            "Generating universal SRS and indexing keys..."
        } else {
            "Generating circuit keys..."
        };
        output::print_step(2, 4, setup);
        if bench {
            pipeline.benchmark_setup(iterations)?;
        } else {
            pipeline.setup()?;
        }

        output::print_step(3, 4, "Proving...");
        pipeline.prove(&values)?;
        if bench {
            pipeline.benchmark_prove(iterations)?;
        }

        output::print_step(4, 4, "Verifying...");
        if bench {
            pipeline.benchmark_verify(iterations)?;
        }
        let verified = pipeline.verify()?;
        output::print_success(&format!(
            "Proof verified on {} with {} public inputs",
            verified.curve(),
            verified.public_inputs()
        ));
        Ok(pipeline)
    })
    .await??;
    Ok(pipeline)
}

fn report<V>(
    pipeline: &dyn ProofPipeline<V>,
    circuit: CircuitChoice,
    config: &PipelineConfig,
    out: Option<&Path>,
) -> Result<()> {
    let report = pipeline.report();
    println!();
    if let Some(constraints) = report.constraints {
        output::print_key_value("Constraints", &constraints.to_string());
    }
    if let Some(inputs) = pipeline.public_inputs_decimal() {
        output::print_key_value("Public inputs", &inputs.join(", "));
    }
    let label = if config.iterations > 1 { " (mean)" } else { "" };
    output::print_timing(&format!("Compile{label}"), report.compile_ns);
    output::print_timing(&format!("Setup{label}"), report.setup_ns);
    output::print_timing(&format!("Prove{label}"), report.prove_ns);
    output::print_timing(&format!("Verify{label}"), report.verify_ns);

    let Some(dir) = out else {
        return Ok(());
    };
    let store = ArtifactStore::open(dir)?;
    let prefix = circuit.as_str();
    let written = pipeline.save(&store, prefix)?;
    let report_path = dir.join(format!("{prefix}_report.json"));
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    info!(
        dir = %dir.display(),
        bytes = written,
        report = %report_path.display(),
        "artifacts stored"
    );

    output::print_success(&format!("Wrote {written} bytes of artifacts to {}", dir.display()));
    for suffix in ["vk", "proof", "witness"] {
        let name = format!("{prefix}_{suffix}");
        let bytes = std::fs::read(store.path(&name))?;
        output::print_artifact(&name, &bytes);
    }
    if config.curve == CurveId::Bn254 && config.scheme == SchemeKind::Groth16 {
        output::print_key_value(
            "Call data",
            &format!(
                "arkabc calldata --proof {} --witness {}",
                store.path(&format!("{prefix}_proof")).display(),
                store.path(&format!("{prefix}_witness")).display()
            ),
        );
    }
    Ok(())
}
