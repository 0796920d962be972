//! Artifact codec.
//!
//! Every artifact is written as a 7-byte header followed by a kind-specific
//! body:
//!
//! ```text
//! magic "AKAB" (4) | format version (1) | curve tag (1) | kind tag (1) | body
//! ```
//!
//! Reading checks the whole header before touching the body, so feeding a
//! BLS12-381 verifying key to a BN254 reader fails up front instead of
//! producing garbage points. The text form is the base64 of the binary form.

use std::fmt;
use std::io::{Read, Write};

use ark_ec::PairingEngine;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::curve::{CurveId, PairingCurve};
use crate::error::{Result, ZkError};
use crate::r1cs::{Matrix, R1cs};
use crate::witness::{FullWitness, PublicWitness};

pub const MAGIC: [u8; 4] = *b"AKAB";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 7;

/// What an encoded blob contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ConstraintSystem,
    FullWitness,
    PublicWitness,
    Groth16ProvingKey,
    Groth16VerifyingKey,
    Groth16Proof,
    MarlinProvingKey,
    MarlinVerifyingKey,
    MarlinProof,
}

impl ArtifactKind {
    const ALL: [ArtifactKind; 9] = [
        ArtifactKind::ConstraintSystem,
        ArtifactKind::FullWitness,
        ArtifactKind::PublicWitness,
        ArtifactKind::Groth16ProvingKey,
        ArtifactKind::Groth16VerifyingKey,
        ArtifactKind::Groth16Proof,
        ArtifactKind::MarlinProvingKey,
        ArtifactKind::MarlinVerifyingKey,
        ArtifactKind::MarlinProof,
    ];

    pub fn tag(self) -> u8 {
        match self {
            Self::ConstraintSystem => 1,
            Self::FullWitness => 2,
            Self::PublicWitness => 3,
            Self::Groth16ProvingKey => 4,
            Self::Groth16VerifyingKey => 5,
            Self::Groth16Proof => 6,
            Self::MarlinProvingKey => 7,
            Self::MarlinVerifyingKey => 8,
            Self::MarlinProof => 9,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConstraintSystem => "constraint system",
            Self::FullWitness => "full witness",
            Self::PublicWitness => "public witness",
            Self::Groth16ProvingKey => "groth16 proving key",
            Self::Groth16VerifyingKey => "groth16 verifying key",
            Self::Groth16Proof => "groth16 proof",
            Self::MarlinProvingKey => "marlin proving key",
            Self::MarlinVerifyingKey => "marlin verifying key",
            Self::MarlinProof => "marlin proof",
        };
        f.write_str(name)
    }
}

/// A value the codec can persist.
pub trait Artifact: Sized {
    const KIND: ArtifactKind;
    const CURVE: CurveId;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError>;

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError>;
}

/// Encode `artifact` with its header. Returns the number of bytes written.
pub fn write<A: Artifact, W: Write>(artifact: &A, mut sink: W) -> Result<u64> {
    let bytes = to_bytes(artifact)?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(bytes.len() as u64)
}

/// Decode an artifact of type `A` on `curve`, checking the header first.
pub fn read<A: Artifact, R: Read>(curve: CurveId, mut source: R) -> Result<A> {
    if curve != A::CURVE {
        return Err(ZkError::ArtifactHeader(format!(
            "cannot read a {} artifact as {} (type is bound to {})",
            curve,
            A::KIND,
            A::CURVE
        )));
    }

    let mut header = [0u8; HEADER_LEN];
    source.read_exact(&mut header)?;
    check_header::<A>(&header)?;

    A::read_body(&mut source).map_err(|source| ZkError::Codec {
        kind: A::KIND,
        source,
    })
}

pub fn to_bytes<A: Artifact>(artifact: &A) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(&MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.push(A::CURVE.tag());
    bytes.push(A::KIND.tag());
    artifact
        .write_body(&mut bytes)
        .map_err(|source| ZkError::Codec {
            kind: A::KIND,
            source,
        })?;
    Ok(bytes)
}

pub fn from_bytes<A: Artifact>(curve: CurveId, bytes: &[u8]) -> Result<A> {
    read(curve, bytes)
}

/// Base64 (standard alphabet) of the full binary form.
pub fn to_base64<A: Artifact>(artifact: &A) -> Result<String> {
    Ok(STANDARD.encode(to_bytes(artifact)?))
}

pub fn from_base64<A: Artifact>(curve: CurveId, text: &str) -> Result<A> {
    let bytes = STANDARD.decode(text.trim())?;
    from_bytes(curve, &bytes)
}

/// Parse just the header of an encoded blob.
pub fn peek_header(bytes: &[u8]) -> Result<(CurveId, ArtifactKind)> {
    if bytes.len() < HEADER_LEN || bytes[..4] != MAGIC {
        return Err(ZkError::ArtifactHeader("not an arkabc artifact".into()));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(ZkError::ArtifactHeader(format!(
            "unsupported format version {}",
            bytes[4]
        )));
    }
    let curve = CurveId::from_tag(bytes[5])
        .ok_or_else(|| ZkError::ArtifactHeader(format!("unknown curve tag {}", bytes[5])))?;
    let kind = ArtifactKind::from_tag(bytes[6])
        .ok_or_else(|| ZkError::ArtifactHeader(format!("unknown kind tag {}", bytes[6])))?;
    Ok((curve, kind))
}

fn check_header<A: Artifact>(header: &[u8; HEADER_LEN]) -> Result<()> {
    let (curve, kind) = peek_header(header)?;
    if curve != A::CURVE || kind != A::KIND {
        return Err(ZkError::ArtifactHeader(format!(
            "expected {} {}, found {} {}",
            A::CURVE,
            A::KIND,
            curve,
            kind
        )));
    }
    Ok(())
}

/// JSON envelope carrying an artifact in text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub curve: CurveId,
    pub kind: ArtifactKind,
    pub data: String,
}

impl ArtifactRecord {
    pub fn new<A: Artifact>(artifact: &A) -> Result<Self> {
        Ok(Self {
            curve: A::CURVE,
            kind: A::KIND,
            data: to_base64(artifact)?,
        })
    }

    pub fn decode<A: Artifact>(&self) -> Result<A> {
        if self.kind != A::KIND {
            return Err(ZkError::ArtifactHeader(format!(
                "record holds a {}, expected {}",
                self.kind,
                A::KIND
            )));
        }
        from_base64(self.curve, &self.data)
    }
}

// --- Body layouts ---

fn write_matrix<F: CanonicalSerialize, W: Write>(
    matrix: &Matrix<F>,
    writer: &mut W,
) -> std::result::Result<(), SerializationError> {
    CanonicalSerialize::serialize(&(matrix.len() as u64), &mut *writer)?;
    for row in matrix {
        CanonicalSerialize::serialize(&(row.len() as u64), &mut *writer)?;
        for (coeff, col) in row {
            coeff.serialize(&mut *writer)?;
            CanonicalSerialize::serialize(&(*col as u64), &mut *writer)?;
        }
    }
    Ok(())
}

fn read_matrix<F: CanonicalDeserialize, R: Read>(
    reader: &mut R,
    num_columns: usize,
) -> std::result::Result<Matrix<F>, SerializationError> {
    let rows = <u64 as CanonicalDeserialize>::deserialize(&mut *reader)? as usize;
    let mut matrix = Vec::with_capacity(rows.min(1 << 20));
    for _ in 0..rows {
        let len = <u64 as CanonicalDeserialize>::deserialize(&mut *reader)? as usize;
        let mut row = Vec::with_capacity(len.min(num_columns));
        for _ in 0..len {
            let coeff = F::deserialize(&mut *reader)?;
            let col = <u64 as CanonicalDeserialize>::deserialize(&mut *reader)? as usize;
            if col >= num_columns {
                return Err(SerializationError::InvalidData);
            }
            row.push((coeff, col));
        }
        matrix.push(row);
    }
    Ok(matrix)
}

impl<E: PairingCurve> Artifact for R1cs<E> {
    const KIND: ArtifactKind = ArtifactKind::ConstraintSystem;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        CanonicalSerialize::serialize(&(self.num_instance as u64), &mut *writer)?;
        CanonicalSerialize::serialize(&(self.num_witness as u64), &mut *writer)?;
        write_matrix(&self.a, writer)?;
        write_matrix(&self.b, writer)?;
        write_matrix(&self.c, writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        let count = |value: u64| usize::try_from(value).map_err(|_| SerializationError::InvalidData);
        let num_instance = count(<u64 as CanonicalDeserialize>::deserialize(&mut *reader)?)?;
        let num_witness = count(<u64 as CanonicalDeserialize>::deserialize(&mut *reader)?)?;
        if num_instance == 0 {
            return Err(SerializationError::InvalidData);
        }
        let columns = num_instance
            .checked_add(num_witness)
            .ok_or(SerializationError::InvalidData)?;
        let a = read_matrix(reader, columns)?;
        let b = read_matrix(reader, columns)?;
        let c = read_matrix(reader, columns)?;
        if a.len() != b.len() || b.len() != c.len() {
            return Err(SerializationError::InvalidData);
        }
        Ok(Self {
            num_instance,
            num_witness,
            a,
            b,
            c,
        })
    }
}

impl<E: PairingCurve> Artifact for FullWitness<E> {
    const KIND: ArtifactKind = ArtifactKind::FullWitness;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.public.serialize(&mut *writer)?;
        self.private.serialize(&mut *writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        let public = Vec::<<E as PairingEngine>::Fr>::deserialize(&mut *reader)?;
        let private = Vec::<<E as PairingEngine>::Fr>::deserialize(&mut *reader)?;
        Ok(Self::new(public, private))
    }
}

impl<E: PairingCurve> Artifact for PublicWitness<E> {
    const KIND: ArtifactKind = ArtifactKind::PublicWitness;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.inputs.serialize(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Ok(Self::new(Vec::<<E as PairingEngine>::Fr>::deserialize(
            reader,
        )?))
    }
}
