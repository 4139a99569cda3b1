//! Readers working on files: circuits, proofs and options.

use sisi_core::proof_file::read_proof;
use sisi_core::{Aig, McsStrategy, Options, SisiError};
use std::env;
use std::fs;
use std::path::PathBuf;

fn temp_file(name: &str, content: &[u8]) -> PathBuf {
    let path = env::temp_dir().join(format!("sisi_core_{}_{name}", std::process::id()));
    fs::write(&path, content).expect("Failed to write temp file");
    path
}

#[test]
fn circuit_and_proof_from_disk() {
    let aig_path = temp_file(
        "rotator.aag",
        b"aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\nl0 head\n",
    );
    let proof_path = temp_file(
        "rotator.proof",
        concat!(
            "One-step Inductive Strengthening of Property (in CNF):\n",
            "Clause 0: !head !l3\nClause 1: l1 l2\n"
        )
        .as_bytes(),
    );
    let aig = Aig::from_file(&aig_path).unwrap();
    assert_eq!(aig.num_properties(), 1);
    assert_eq!(read_proof(&proof_path, &aig).unwrap(), vec![vec![3, 9], vec![4, 6]]);
    fs::remove_file(aig_path).ok();
    fs::remove_file(proof_path).ok();
}

#[test]
fn options_file_overrides_defaults() {
    let path = temp_file("options.txt", b"# uivc run\nuivc_mcs_finder=bmc\nmcs_bmc_kmax=4\n");
    let options = Options::from_file(&path).unwrap();
    assert_eq!(options.uivc_mcs_finder, McsStrategy::Bmc);
    assert_eq!(options.mcs_bmc_kmax, 4);
    assert!(options.simplify);
    fs::remove_file(path).ok();
}

#[test]
fn missing_files_are_io_errors() {
    let missing = env::temp_dir().join("sisi_core_missing/none.aag");
    assert!(matches!(Aig::from_file(&missing), Err(SisiError::Io(_))));
    assert!(matches!(Options::from_file(&missing), Err(SisiError::Io(_))));
}
