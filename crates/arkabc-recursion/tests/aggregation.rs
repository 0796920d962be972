use std::path::Path;

use ark_bls12_377::Fr;
use ark_groth16::VerifyingKey;

use arkabc_circuits::{
    ExponentiateCircuit, ExponentiateShape, ExponentiateValues, ProductCircuit, ProductValues,
};
use arkabc_core::curve::{Bls12_377, BW6_761, MNT4_298};
use arkabc_core::{codec, CurveId, ErrorCategory, Groth16, Pipeline, PublicWitness, ZkError};
use arkabc_recursion::level::{proof_name, witness_name};
use arkabc_recursion::{
    recombine_public_inputs, AggregationConfig, Bls12_377InBw6_761, KeyMaterial,
    RecursiveComposer,
};

fn config(dir: &Path, leaf_curve: CurveId, chain: Vec<CurveId>) -> AggregationConfig {
    AggregationConfig {
        leaf_curve,
        chain,
        key_material: KeyMaterial::Witness,
        output_dir: dir.join("output"),
        seed: Some(7),
    }
}

fn leaves() -> Vec<ProductValues> {
    vec![
        ProductValues::factors(13, 17),
        ProductValues::factors(3, 5),
        ProductValues::factors(7, 11),
        ProductValues::factors(5, 19),
    ]
}

#[test]
fn test_unsupported_pair_rejected_before_proving() {
    let dir = tempfile::tempdir().unwrap();
    let err = RecursiveComposer::new(config(
        dir.path(),
        CurveId::Bls12_381,
        vec![CurveId::Bw6_761],
    ))
    .err()
    .unwrap();
    assert!(matches!(err, ZkError::UnsupportedEmbedding { .. }));
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_same_curve_recursion_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for curve in CurveId::ALL {
        let err = RecursiveComposer::new(config(dir.path(), curve, vec![curve]))
            .err()
            .unwrap();
        assert!(matches!(err, ZkError::SameCurveRecursion { curve: c } if c == curve));
        assert_eq!(err.category(), ErrorCategory::Config);
    }
    // A valid first link does not excuse a same-curve link further up.
    let err = RecursiveComposer::new(config(
        dir.path(),
        CurveId::Mnt4_298,
        vec![CurveId::Mnt6_298, CurveId::Mnt6_298],
    ))
    .err()
    .unwrap();
    assert!(matches!(err, ZkError::SameCurveRecursion { curve: CurveId::Mnt6_298 }));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn test_odd_leaf_count_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut composer =
        RecursiveComposer::new(config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]))
            .unwrap();
    let three = &leaves()[..3];
    let err = composer
        .prove_leaves::<Bls12_377, ProductCircuit, _>(&(), three, |_| {})
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(!composer.store().exists("layer_0_pk"));

    assert_eq!(
        composer.build_tree(&[0, 1, 2]).unwrap_err().category(),
        ErrorCategory::Config
    );
    assert_eq!(
        composer.aggregate_layer(1, &[0, 1, 2]).unwrap_err().category(),
        ErrorCategory::Config
    );
}

#[test]
fn test_leaves_on_wrong_curve() {
    let dir = tempfile::tempdir().unwrap();
    let composer =
        RecursiveComposer::new(config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]))
            .unwrap();
    let err = composer
        .prove_leaves::<MNT4_298, ProductCircuit, _>(&(), &leaves(), |_| {})
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_depth_one_bls12_377_in_bw6_761() {
    let dir = tempfile::tempdir().unwrap();
    let mut composer =
        RecursiveComposer::new(config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]))
            .unwrap();
    let store = composer.store().clone();

    let proved = std::sync::atomic::AtomicUsize::new(0);
    let indices = composer
        .prove_leaves::<Bls12_377, ProductCircuit, _>(&(), &leaves(), |_| {
            proved.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        })
        .unwrap();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(proved.into_inner(), 4);

    // The chain has one outer curve, so four leaves fold into two nodes.
    let report = composer.build_tree(&indices).unwrap();
    assert_eq!(report.depth, 1);
    assert_eq!(report.curve, CurveId::Bw6_761);
    assert_eq!(report.roots, vec![0, 2]);
    assert!(!report.is_complete());
    assert_eq!(report.layers[0].nodes.len(), 2);
    assert_eq!(report.layers[0].nodes[0].public_inputs, 2);

    composer.verify_stored(1, 0).unwrap();
    composer.verify_stored(1, 2).unwrap();

    // Node inputs carry the children's inputs through unchanged.
    let node: PublicWitness<BW6_761> = store.load(CurveId::Bw6_761, &witness_name(1, 0)).unwrap();
    let carried = recombine_public_inputs::<Bls12_377InBw6_761>(node.inputs()).unwrap();
    assert_eq!(carried, vec![Fr::from(221u64), Fr::from(15u64)]);

    // A fresh composer reuses the stored layer keys.
    let layer_vk = std::fs::read(store.path("layer_1_vk")).unwrap();
    let mut resumed =
        RecursiveComposer::new(config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]))
            .unwrap();
    resumed.aggregate_layer(1, &[2, 3]).unwrap();
    assert_eq!(std::fs::read(store.path("layer_1_vk")).unwrap(), layer_vk);
    let vk: VerifyingKey<BW6_761> = store.load(CurveId::Bw6_761, "layer_1_vk").unwrap();
    assert_eq!(vk.gamma_abc_g1.len(), 3);

    // Tampered leaf: one public value changed.
    let genuine: PublicWitness<Bls12_377> =
        store.load(CurveId::Bls12_377, &witness_name(0, 1)).unwrap();
    store
        .save(&witness_name(0, 1), &PublicWitness::<Bls12_377>::new(vec![Fr::from(16u64)]))
        .unwrap();
    let err = composer.aggregate_layer(1, &[0, 1]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Prove);
    store.save(&witness_name(0, 1), &genuine).unwrap();

    // Foreign leaf: same shape, keys from another setup.
    let mut other = Pipeline::<Bls12_377, Groth16, ProductCircuit>::new(&())
        .unwrap()
        .with_seed(99);
    other.compile().unwrap();
    other.setup().unwrap();
    other.prove(&ProductValues::factors(5, 19)).unwrap();
    store.save(&proof_name(0, 3), other.proof().unwrap()).unwrap();
    let err = composer.aggregate_layer(1, &[2, 3]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Prove);

    // Foreign leaf: a different circuit with two public inputs.
    let mut foreign = Pipeline::<Bls12_377, Groth16, ExponentiateCircuit>::new(
        &ExponentiateShape::default(),
    )
    .unwrap()
    .with_seed(5);
    foreign.compile().unwrap();
    foreign.setup().unwrap();
    foreign.prove(&ExponentiateValues::of(3, 5).unwrap()).unwrap();
    store.save(&proof_name(0, 3), foreign.proof().unwrap()).unwrap();
    store
        .save(&witness_name(0, 3), &foreign.public_witness().unwrap())
        .unwrap();
    let err = composer.aggregate_layer(1, &[2, 3]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Shape);

    // A missing child is fatal.
    let err = composer.aggregate_layer(1, &[0, 9]).unwrap_err();
    assert!(matches!(err, ZkError::MissingArtifact(_)));
    assert_eq!(err.category(), ErrorCategory::Io);

    // Stored node proofs cannot pass for one another.
    let swapped = std::fs::read(store.path(&proof_name(1, 2))).unwrap();
    std::fs::write(store.path(&proof_name(1, 0)), swapped).unwrap();
    assert_eq!(
        composer.verify_stored(1, 0).unwrap_err().category(),
        ErrorCategory::Verify
    );
}

#[test]
fn test_constant_key_material() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]);
    config.key_material = KeyMaterial::Constant;
    let mut composer = RecursiveComposer::new(config).unwrap();

    let leaves = composer
        .prove_leaves::<Bls12_377, ProductCircuit, _>(&(), &leaves()[..2], |_| {})
        .unwrap();
    let report = composer.build_tree(&leaves).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.roots, vec![0]);
    composer.verify_stored(1, 0).unwrap();

    let bytes = std::fs::read(composer.store().path("layer_1_proof_0")).unwrap();
    let (curve, kind) = codec::peek_header(&bytes).unwrap();
    assert_eq!(curve, CurveId::Bw6_761);
    assert_eq!(kind, codec::ArtifactKind::Groth16Proof);
}

#[test]
fn test_rerun_with_new_leaf_keys_rebuilds_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut first_vk = None;
    for seed in [1, 2] {
        let mut config = config(dir.path(), CurveId::Bls12_377, vec![CurveId::Bw6_761]);
        config.key_material = KeyMaterial::Constant;
        config.seed = Some(seed);
        let mut composer = RecursiveComposer::new(config).unwrap();

        let leaves = composer
            .prove_leaves::<Bls12_377, ProductCircuit, _>(&(), &leaves()[..2], |_| {})
            .unwrap();
        let report = composer.build_tree(&leaves).unwrap();
        assert!(report.is_complete());
        composer.verify_stored(1, 0).unwrap();

        let layer_vk = std::fs::read(composer.store().path("layer_1_vk")).unwrap();
        match &first_vk {
            None => first_vk = Some(layer_vk),
            // The leaf key is baked into the layer, so fresh leaf keys mean a fresh layer.
            Some(previous) => assert_ne!(previous, &layer_vk),
        }
        assert_eq!(
            std::fs::read(composer.store().path("layer_1_child_vk")).unwrap(),
            std::fs::read(composer.store().path("layer_0_vk")).unwrap()
        );
    }
}

#[test]
#[ignore = "two MNT aggregation layers take minutes"]
fn test_mnt_cycle_two_layers() {
    let dir = tempfile::tempdir().unwrap();
    let mut composer = RecursiveComposer::new(config(
        dir.path(),
        CurveId::Mnt4_298,
        vec![CurveId::Mnt6_298, CurveId::Mnt4_298],
    ))
    .unwrap();
    let leaves = composer
        .prove_leaves::<MNT4_298, ProductCircuit, _>(&(), &leaves(), |_| {})
        .unwrap();
    let report = composer.build_tree(&leaves).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.depth, 2);
    assert_eq!(report.curve, CurveId::Mnt4_298);
    composer.verify_stored(2, 0).unwrap();
}
