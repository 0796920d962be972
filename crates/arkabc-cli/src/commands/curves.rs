use anyhow::Result;

use arkabc_core::{CurveId, CurveRegistry};
use arkabc_recursion::WHITELIST;

use crate::output;

/// Outer curves a proof on `inner` can be aggregated into.
fn outer_curves(inner: CurveId) -> Vec<&'static str> {
    WHITELIST
        .iter()
        .filter(|(i, _)| *i == inner)
        .map(|(_, outer)| outer.name())
        .collect()
}

/// Print every registered curve with the facts the pipeline relies on.
pub async fn run(json: bool) -> Result<()> {
    let registry = CurveRegistry::new();

    if json {
        let entries: Vec<_> = registry.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    output::print_header("arkabc curves");
    for entry in registry.entries() {
        println!();
        println!("  {}", console::style(entry.name).bold());
        output::print_key_value(
            "Scalar field",
            &format!(
                "{} bits (capacity {})",
                entry.scalar_bits, entry.scalar_capacity
            ),
        );
        output::print_key_value("Base field", &format!("{} bits", entry.base_bits));
        output::print_key_value(
            "Universal SRS",
            if entry.universal_srs { "yes" } else { "no" },
        );
        output::print_key_value("EVM call data", if entry.evm_calldata { "yes" } else { "no" });
        let outer = outer_curves(entry.id);
        if !outer.is_empty() {
            output::print_key_value("Aggregates into", &outer.join(", "));
        }
    }

    Ok(())
}
