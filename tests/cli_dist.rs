use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn command_dist() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("dist")
        .arg("GTAC--GTAC")
        .arg("GTACTTGTAC")
        .assert()
        .success()
        .stdout(predicate::eq("2\n"));

    // 1, 1 and 2, truncated average
    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("dist")
        .arg("ACGT")
        .arg("ACGTT")
        .arg("AGT")
        .assert()
        .success()
        .stdout(predicate::eq("1\n"));

    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("dist")
        .arg("ACGT")
        .assert()
        .success()
        .stdout(predicate::eq("0\n"));

    Ok(())
}

#[test]
fn command_dist_costs() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("dist")
        .arg("ACGT")
        .arg("ACCT")
        .arg("--sub")
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::eq("2\n"));

    Ok(())
}
