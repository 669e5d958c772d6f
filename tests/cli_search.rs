use assert_cmd::Command;
use predicates::prelude::*;

// Nothing listens on the discard port, so every request is refused
const DEAD_URL: &str = "http://127.0.0.1:9/Blast.cgi";

#[test]
fn command_search_needs_a_query() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("blastsift")?;
    cmd.arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Please enter a sequence with --seq or give a FASTA file",
        ));

    let mut cmd = Command::cargo_bin("blastsift")?;
    cmd.arg("search")
        .arg("--seq")
        .arg("  \n ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter a sequence"));

    Ok(())
}

#[test]
fn command_search_unknown_program() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("blastsift")?;
    cmd.arg("search")
        .arg("--seq")
        .arg("ACGT")
        .arg("-p")
        .arg("megablast")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'megablast'"));

    Ok(())
}

#[test]
fn command_search_unavailable() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("blastsift")?;
    let output = cmd
        .arg("search")
        .arg("--seq")
        .arg("acgtacgtac gtacgt")
        .arg("--url")
        .arg(DEAD_URL)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    assert!(!output.status.success());
    assert!(stdout.contains("# Query: input (16 letters)\nSearch unavailable: "));
    assert!(!stdout.contains("No hits found."));
    assert!(stderr.contains("1 of 1 queries failed"));

    Ok(())
}

#[test]
fn command_search_seq_with_header() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("blastsift")?;
    let output = cmd
        .arg("search")
        .arg("--seq")
        .arg(">q1 pasted record\nacgt\nACGT\n")
        .arg("--url")
        .arg(DEAD_URL)
        .arg("-q")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(!output.status.success());
    assert!(stdout.contains("# Query: q1 (8 letters)\n"));

    Ok(())
}

#[test]
fn command_search_batch_continues() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("blastsift")?;
    let output = cmd
        .arg("search")
        .arg("tests/blast/query.fa")
        .arg("--url")
        .arg(DEAD_URL)
        .arg("-q")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    assert!(!output.status.success());
    assert!(stdout.contains("# Query: seq1 (100 letters)\nSearch unavailable: "));
    assert!(stdout.contains("# Query: seq2 (200 letters)\nSearch unavailable: "));
    assert!(stderr.contains("2 of 2 queries failed"));

    Ok(())
}
