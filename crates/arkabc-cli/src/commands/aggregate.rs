use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use arkabc_circuits::{ProductCircuit, ProductValues};
use arkabc_core::CurveRegistry;
use arkabc_recursion::{config, AggregationConfig, KeyMaterial, RecursiveComposer, TreeReport};

use crate::output;
use crate::KeyMaterialChoice;

pub struct Flags {
    pub leaf_curve: String,
    pub chain: Vec<String>,
    pub key_material: KeyMaterialChoice,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Flags {
    fn into_config(self) -> Result<AggregationConfig> {
        let registry = CurveRegistry::new();
        let chain = self
            .chain
            .iter()
            .map(|name| registry.lookup(name).map(|entry| entry.id))
            .collect::<arkabc_core::Result<Vec<_>>>()?;
        Ok(AggregationConfig {
            leaf_curve: registry.lookup(&self.leaf_curve)?.id,
            chain,
            key_material: match self.key_material {
                KeyMaterialChoice::Witness => KeyMaterial::Witness,
                KeyMaterialChoice::Constant => KeyMaterial::Constant,
            },
            output_dir: self.output_dir,
            seed: self.seed,
        })
    }
}

/// Leaf `i` proves knowledge of the factors of `(2i + 3)(2i + 5)`.
pub fn leaf_values(count: usize) -> Vec<ProductValues> {
    (0..count as u64)
        .map(|i| ProductValues::factors(2 * i + 3, 2 * i + 5))
        .collect()
}

/// Prove `leaves` product leaves and fold them down the configured chain.
pub async fn run(plan: Option<&Path>, flags: Flags, leaves: usize) -> Result<()> {
    output::print_header("arkabc aggregate");

    let config = match plan {
        Some(path) => config::load(path)?,
        None => flags.into_config()?,
    };
    config.validate()?;

    let chain: Vec<&str> = config.chain.iter().map(|curve| curve.name()).collect();
    output::print_key_value("Leaf curve", config.leaf_curve.name());
    output::print_key_value("Chain", &chain.join(" -> "));
    output::print_key_value("Key material", config.key_material.as_str());
    output::print_key_value("Leaves", &leaves.to_string());

    let report = tokio::task::spawn_blocking(move || aggregate(config, leaves)).await??;
    print_report(&report);
    Ok(())
}

fn aggregate(config: AggregationConfig, leaves: usize) -> Result<TreeReport> {
    let output_dir = config.output_dir.clone();
    let leaf_curve = config.leaf_curve;
    let mut composer = RecursiveComposer::new(config)?;

    output::print_step(1, 3, "Proving leaves...");
    let bar = ProgressBar::new(leaves as u64);
    bar.set_style(
        ProgressStyle::with_template("      [{bar:30}] {pos}/{len} leaves ({elapsed})")?
            .progress_chars("=> "),
    );
    let values = leaf_values(leaves);
    let indices = arkabc_core::with_curve!(leaf_curve, E => composer
        .prove_leaves::<E, ProductCircuit, _>(&(), &values, |_| bar.inc(1)));
    bar.finish_and_clear();
    let indices = indices?;

    output::print_step(2, 3, "Aggregating...");
    let report = composer.build_tree(&indices)?;

    output::print_step(3, 3, "Verifying roots...");
    for &root in &report.roots {
        composer.verify_stored(report.depth, root)?;
    }

    let report_path = output_dir.join("tree_report.json");
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    info!(path = %report_path.display(), roots = report.roots.len(), "tree report written");
    Ok(report)
}

fn print_report(report: &TreeReport) {
    println!();
    for layer in &report.layers {
        let slowest = layer.nodes.iter().map(|node| node.prove_ns).max();
        output::print_key_value(
            &format!("Depth {} ({})", layer.depth, layer.curve),
            &format!(
                "{} nodes, slowest {}",
                layer.nodes.len(),
                output::format_nanos(slowest)
            ),
        );
    }
    output::print_timing("Total", Some(report.elapsed_ns));

    let roots: Vec<String> = report.roots.iter().map(ToString::to_string).collect();
    if report.is_complete() {
        output::print_success(&format!(
            "Aggregated {} leaves into one {} proof at depth {}",
            report.leaves, report.curve, report.depth
        ));
    } else {
        output::print_warning(&format!(
            "Curve chain ended at depth {} with {} proofs left: {}",
            report.depth,
            report.roots.len(),
            roots.join(", ")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkabc_core::CurveId;

    fn flags(chain: &[&str]) -> Flags {
        Flags {
            leaf_curve: "bls12_377".into(),
            chain: chain.iter().map(|name| name.to_string()).collect(),
            key_material: KeyMaterialChoice::Constant,
            output_dir: PathBuf::from("out"),
            seed: None,
        }
    }

    #[test]
    fn test_leaf_values() {
        let values = leaf_values(3);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].n, 15);
        assert_eq!(values[2].n, 7 * 9);
    }

    #[test]
    fn test_flags_into_config() {
        let config = flags(&["bw6-761"]).into_config().unwrap();
        assert_eq!(config.leaf_curve, CurveId::Bls12_377);
        assert_eq!(config.chain, vec![CurveId::Bw6_761]);
        assert_eq!(config.key_material, KeyMaterial::Constant);
        config.validate().unwrap();

        assert!(flags(&["p-256"]).into_config().is_err());
        assert!(flags(&["bls12-377"]).into_config().unwrap().validate().is_err());
    }

    #[test]
    fn test_aggregate_two_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let config = Flags {
            output_dir: dir.path().join("tree"),
            seed: Some(11),
            ..flags(&["BW6-761"])
        }
        .into_config()
        .unwrap();

        let report = aggregate(config, 2).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.curve, CurveId::Bw6_761);
        assert!(dir.path().join("tree").join("tree_report.json").exists());
    }
}
