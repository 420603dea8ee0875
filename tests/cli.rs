use std::process::{Command, Output};

fn drugsim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_drugsim"))
        .args(args)
        .env_remove("DRUGSIM_BASES")
        .env_remove("DRUGSIM_LOG")
        .output()
        .expect("failed to run drugsim")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn value(line: &str, prefix: &str) -> f64 {
    let rest = line
        .strip_prefix(prefix)
        .unwrap_or_else(|| panic!("{line:?} does not start with {prefix:?}"));
    rest.parse()
        .unwrap_or_else(|e| panic!("{rest:?} is not a float: {e}"))
}

#[test]
fn known_bases_print_three_lines() {
    for base in ["aspirin", "penicillin", "ibuprofen"] {
        let output = drugsim(&[base]);
        assert!(output.status.success(), "{base}");
        let lines = stdout_lines(&output);
        assert_eq!(lines.len(), 3, "{base}: {lines:?}");
        assert!(lines[0].starts_with("Generated SMILES for unspecified: "));
        let mw = value(&lines[1], "Molecular Weight: ");
        let logp = value(&lines[2], "LogP: ");
        assert!(mw > 100.0 && mw < 400.0, "{base}: {mw}");
        assert!(logp.is_finite(), "{base}: {logp}");
    }
}

#[test]
fn aspirin_derivative() {
    let output = drugsim(&["aspirin", "headache"]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(
        lines[0],
        "Generated SMILES for headache: CCC(=O)O.O=C(O)c1ccccc1"
    );
    assert!((value(&lines[1], "Molecular Weight: ") - 196.202).abs() < 1e-3);
    assert!((value(&lines[2], "LogP: ") - 1.8658).abs() < 1e-3);
}

#[test]
fn ibuprofen_is_unchanged() {
    let output = drugsim(&["ibuprofen"]);
    let lines = stdout_lines(&output);
    let smiles = lines[0].rsplit(": ").next().unwrap_or_default();
    let canonical = drugsim::Molecule::from_smiles("CC(C)CC1=CC=C(C=C1)C(C)C(=O)O")
        .unwrap()
        .to_smiles();
    assert_eq!(smiles, canonical);
}

#[test]
fn disease_is_echoed_verbatim() {
    let output = drugsim(&["penicillin", "strep throat: acute"]);
    let lines = stdout_lines(&output);
    assert!(lines[0].starts_with("Generated SMILES for strep throat: acute: "));
}

#[test]
fn missing_base_prints_usage() {
    let output = drugsim(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_lines(&output), vec!["Usage: drugsim <base> [disease]"]);
}

#[test]
fn unknown_base() {
    let output = drugsim(&["unobtainium"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_lines(&output), vec!["Unknown base"]);
}

#[test]
fn external_base_table() {
    let path = std::env::temp_dir().join(format!("drugsim-bases-{}.csv", std::process::id()));
    std::fs::write(&path, "key,name,smiles\nethanol,Ethanol,OCC\n").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_drugsim"))
        .arg("ethanol")
        .env("DRUGSIM_BASES", &path)
        .output()
        .expect("failed to run drugsim");
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output)[0],
        "Generated SMILES for unspecified: CCO"
    );
}

#[test]
fn logging_stays_off_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_drugsim"))
        .arg("aspirin")
        .env_remove("DRUGSIM_BASES")
        .env("DRUGSIM_LOG", "trace")
        .output()
        .expect("failed to run drugsim");
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output).len(), 3);
    assert!(!output.stderr.is_empty());
}
