use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

use arkabc_core::codec::{self, ArtifactKind};
use arkabc_core::curve::Bn254;
use arkabc_core::export::{self, EvmCalldata};
use arkabc_core::{CurveId, Groth16, ProvingScheme, PublicWitness};

use crate::output;

type Bn254Proof = <Groth16 as ProvingScheme<Bn254>>::Proof;

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Decode a stored proof and public witness into call data. Only BN254
/// Groth16 proofs have an EVM verifier.
pub fn load_calldata(proof_path: &Path, witness_path: &Path) -> Result<EvmCalldata> {
    let proof_bytes = read(proof_path)?;
    let (curve, kind) = codec::peek_header(&proof_bytes)?;
    debug!(path = %proof_path.display(), %curve, %kind, "proof header read");
    if curve != CurveId::Bn254 || kind != ArtifactKind::Groth16Proof {
        bail!(
            "call data needs a BN254 groth16 proof, {} holds a {curve} {kind}",
            proof_path.display()
        );
    }
    let proof: Bn254Proof = codec::from_bytes(CurveId::Bn254, &proof_bytes)?;
    let public: PublicWitness<Bn254> = codec::from_bytes(CurveId::Bn254, &read(witness_path)?)?;
    Ok(export::groth16_bn254(&proof, &public))
}

pub async fn run(proof_path: &Path, witness_path: &Path, output_path: Option<&Path>) -> Result<()> {
    let calldata = load_calldata(proof_path, witness_path)?;
    let json = serde_json::to_string_pretty(&calldata)?;

    match output_path {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            output::print_success(&format!("Call data written to {}", path.display()));
            output::print_key_value("Public inputs", &calldata.inputs.len().to_string());
        }
        None => println!("{json}"),
    }
    Ok(())
}
