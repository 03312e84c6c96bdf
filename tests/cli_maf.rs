use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn copy_fixture(tempdir: &TempDir) -> anyhow::Result<String> {
    let maf = tempdir.path().join("example.maf");
    fs::copy("tests/maf/example.maf", &maf)?;
    Ok(maf.to_str().unwrap().to_string())
}

#[test]
fn command_maf_index() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let maf = copy_fixture(&tempdir)?;

    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("maf")
        .arg("index")
        .arg(&maf)
        .arg("--species")
        .arg("hg38,mm39")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let index = fs::read_to_string(tempdir.path().join("example.maf.index"))?;
    assert!(index.starts_with("##maf-index version=1\n"));
    assert!(index.contains(">hg38.chr1 248956422\n"));
    assert!(index.contains("89\t130\t64\n"));
    assert!(index.contains("200\t218\t395\n"));
    assert!(index.contains(">mm39.chr4 156860686\n"));
    assert!(!index.contains("rn7"));
    assert!(!index.contains("canFam6"), "e lines are not rows");

    // all rows
    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("maf").arg("index").arg(&maf).assert().success();

    let index = fs::read_to_string(tempdir.path().join("example.maf.index"))?;
    assert!(index.contains(">rn7.chr2 266435125\n"));
    assert!(index.contains("900\t918\t395\n"));

    tempdir.close()?;
    Ok(())
}

#[test]
fn command_maf_query() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let maf = copy_fixture(&tempdir)?;

    let mut cmd = Command::cargo_bin("aso")?;
    let output = cmd
        .arg("maf")
        .arg("query")
        .arg(&maf)
        .arg("chr1(-):100-116")
        .arg("chr1(+):201-210")
        .arg("--ref")
        .arg("hg38")
        .arg("--query")
        .arg("mm39")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert_eq!(
        stdout,
        ">hg38\nGTAC--GTACGTACGTACG\n>mm39\nGTACTTGTACCTACGTACG\n\n#NoCoverage chr1(+):201-210\n"
    );
    // built on first use
    assert!(tempdir.path().join("example.maf.index").is_file());

    tempdir.close()?;
    Ok(())
}

#[test]
fn command_maf_query_verbose() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let maf = copy_fixture(&tempdir)?;

    let mut cmd = Command::cargo_bin("aso")?;
    let output = cmd
        .arg("maf")
        .arg("query")
        .arg(&maf)
        .arg("chr1(+):201-210")
        .arg("--query")
        .arg("rn7")
        .arg("--verbose")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert_eq!(stdout.lines().count(), 5);
    assert!(stdout.contains(">hg38.chr1\nTTGACCATGG\n"));
    assert!(stdout.contains(">rn7.chr2\nTTGACCATGG\n"));

    tempdir.close()?;
    Ok(())
}

#[test]
fn command_maf_query_one_by_one() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let maf = copy_fixture(&tempdir)?;

    let regions = tempdir.path().join("regions.txt");
    fs::write(&regions, "# regions\nchr1(-):100-116\n\nchr1:95-99\n")?;

    let mut cmd = Command::cargo_bin("aso")?;
    let output = cmd
        .arg("maf")
        .arg("query")
        .arg(&maf)
        .arg("--regions")
        .arg(regions.to_str().unwrap())
        .arg("--query")
        .arg("mm39")
        .arg("--one-by-one")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains(">hg38\nGTAC--GTACGTACGTACG\n>mm39\nGTACTTGTACCTACGTACG\n"));
    assert!(stdout.contains(">hg38\nCGTAC\n>mm39\nCGAAC\n"));
    assert!(!stdout.contains("#NoCoverage"));

    tempdir.close()?;
    Ok(())
}

#[test]
fn command_maf_query_bad_locus() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let maf = copy_fixture(&tempdir)?;

    let mut cmd = Command::cargo_bin("aso")?;
    cmd.arg("maf")
        .arg("query")
        .arg(&maf)
        .arg("chr1:120-100")
        .arg("--query")
        .arg("mm39")
        .assert()
        .failure();

    tempdir.close()?;
    Ok(())
}
