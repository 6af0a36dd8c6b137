// Black-box CLI tests: the `bitalign` binary driven through
// std::process::Command.
//
// Covers the flag surface, exit codes, the Moses link output, the jump
// statistics dump, sentence scoring, prior loading, stdin/stdout streaming,
// and the input validation errors.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Locate the binary produced by Cargo.
fn bitalign_bin() -> PathBuf {
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_bitalign") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("bitalign");
    p
}

const SOURCE_TEXT: &str = "2 3\n3 0 1 2\n2 1 0\n";
const TARGET_TEXT: &str = "2 3\n3 2 1 0\n2 0 1\n";

fn write_pair(dir: &TempDir) -> (PathBuf, PathBuf) {
    let src = dir.path().join("src.txt");
    let tgt = dir.path().join("tgt.txt");
    fs::write(&src, SOURCE_TEXT).unwrap();
    fs::write(&tgt, TARGET_TEXT).unwrap();
    (src, tgt)
}

/// Parses one Moses line into (i, j) pairs.
fn parse_moses_line(line: &str) -> Vec<(usize, usize)> {
    line.split_whitespace()
        .map(|pair| {
            let (i, j) = pair.split_once('-').expect("malformed pair");
            (i.parse().unwrap(), j.parse().unwrap())
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Alignment output
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn forward_links_cover_every_target_position() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let out = dir.path().join("fwd.moses");

    // -N 0 disables NULL links entirely, so every j must appear exactly once
    let status = Command::new(bitalign_bin())
        .args(["-m", "2", "-1", "1", "-2", "1", "-N", "0", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-f", out.to_str().unwrap()])
        .status()
        .expect("failed to run bitalign");
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for (sent, (line, (s_len, t_len))) in lines.iter().zip([(3usize, 3usize), (2, 2)]).enumerate() {
        let pairs = parse_moses_line(line);
        let mut seen_j = HashSet::new();
        for (i, j) in &pairs {
            assert!(*i < s_len, "sentence {sent}: source position {i} out of range");
            assert!(*j < t_len, "sentence {sent}: target position {j} out of range");
            assert!(seen_j.insert(*j), "sentence {sent}: target {j} linked twice");
        }
        assert_eq!(seen_j.len(), t_len, "sentence {sent}: some target unlinked");
    }
}

#[test]
fn reverse_links_are_transposed() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let out = dir.path().join("rev.moses");

    let status = Command::new(bitalign_bin())
        .args(["-m", "1", "-N", "0", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-r", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    // the reverse run swaps the corpora, so the pairs come out as
    // source-target again: i indexes the original source side
    for (line, (s_len, t_len)) in lines.iter().zip([(3usize, 3usize), (2, 2)]) {
        for (i, j) in parse_moses_line(line) {
            assert!(i < s_len);
            assert!(j < t_len);
        }
    }
}

#[test]
fn skipped_pairs_produce_empty_lines() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.txt");
    let tgt = dir.path().join("tgt.txt");
    fs::write(&src, "2 3\n0\n2 1 0\n").unwrap();
    fs::write(&tgt, "2 3\n3 2 1 0\n2 0 1\n").unwrap();
    let out = dir.path().join("fwd.moses");

    let status = Command::new(bitalign_bin())
        .args(["-m", "1", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-f", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].is_empty(), "skipped pair must yield an empty line");
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics and scores
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stats_dump_has_header_and_full_histogram() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let out = dir.path().join("stats.txt");

    let status = Command::new(bitalign_bin())
        .args(["-m", "2", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-S", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2049);
    assert_eq!(lines[0], "2048");
    for line in &lines[1..] {
        line.parse::<i64>().expect("histogram entries are integers");
    }
}

#[test]
fn forward_scores_are_nonnegative_floats() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let out = dir.path().join("scores.txt");

    let status = Command::new(bitalign_bin())
        .args(["-m", "2", "-M", "1", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-F", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let v: f32 = line.parse().expect("scores are floats");
        assert!(v >= 0.0, "negative score {v}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Priors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn priors_file_is_accepted() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let priors = dir.path().join("priors.txt");
    // header sizes are the internal vocabularies (user size + 1)
    fs::write(&priors, "4 4 2 1 1 1 1\n1 1 2.5\n2 3 0.5\n1 1.0\n-1 1.0\n1 2 0.75\n2 1 0.25\n")
        .unwrap();
    let out = dir.path().join("fwd.moses");

    let status = Command::new(bitalign_bin())
        .args(["-m", "3", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-p", priors.to_str().unwrap()])
        .args(["-f", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 2);
}

#[test]
fn priors_vocabulary_mismatch_fails() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let priors = dir.path().join("priors.txt");
    fs::write(&priors, "9 9 0 0 0 0 0\n").unwrap();

    let output = Command::new(bitalign_bin())
        .args(["-m", "1", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-p", priors.to_str().unwrap()])
        .args(["-f", dir.path().join("x").to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vocabulary"), "stderr: {stderr}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn concatenated_stdin_to_stdout() {
    let mut child = Command::new(bitalign_bin())
        .args(["-m", "1", "-q", "-f", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(format!("{SOURCE_TEXT}{TARGET_TEXT}").as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors and usage
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_model_flag_exits_one() {
    let output = Command::new(bitalign_bin()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.to_lowercase().contains("usage"), "stderr: {stderr}");
}

#[test]
fn out_of_range_model_exits_one() {
    let output = Command::new(bitalign_bin()).args(["-m", "4"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn token_beyond_vocabulary_exits_one_with_line_number() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.txt");
    let tgt = dir.path().join("tgt.txt");
    fs::write(&src, "1 3\n2 0 7\n").unwrap();
    fs::write(&tgt, "1 3\n1 0\n").unwrap();

    let output = Command::new(bitalign_bin())
        .args(["-m", "1", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn mismatched_sentence_counts_exit_one() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.txt");
    let tgt = dir.path().join("tgt.txt");
    fs::write(&src, "2 3\n1 0\n1 1\n").unwrap();
    fs::write(&tgt, "1 3\n1 0\n").unwrap();

    let output = Command::new(bitalign_bin())
        .args(["-m", "1", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sentences"), "stderr: {stderr}");
}

#[test]
fn missing_input_file_exits_one() {
    let output = Command::new(bitalign_bin())
        .args(["-m", "1", "-q", "-s", "/nonexistent/path.txt", "-t", "/nonexistent/other.txt"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_and_version_exit_zero() {
    let help = Command::new(bitalign_bin()).arg("--help").output().unwrap();
    assert!(help.status.success());
    let text = String::from_utf8_lossy(&help.stdout).to_lowercase();
    assert!(text.contains("usage"));

    let version = Command::new(bitalign_bin()).arg("--version").output().unwrap();
    assert!(version.status.success());
}

#[test]
fn multiple_samplers_still_produce_valid_output() {
    let dir = TempDir::new().unwrap();
    let (src, tgt) = write_pair(&dir);
    let out = dir.path().join("fwd.moses");

    let status = Command::new(bitalign_bin())
        .args(["-m", "3", "-n", "4", "-1", "2", "-2", "2", "-3", "2", "-q"])
        .args(["-s", src.to_str().unwrap()])
        .args(["-t", tgt.to_str().unwrap()])
        .args(["-f", out.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, (s_len, t_len)) in lines.iter().zip([(3usize, 3usize), (2, 2)]) {
        for (i, j) in parse_moses_line(line) {
            assert!(i < s_len && j < t_len);
        }
    }
}
