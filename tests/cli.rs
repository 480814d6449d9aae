use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const CORPUS: &str = "天下大道，天下为公。\n大道之行也, 天下为公!\n选贤与能 讲信修睦\n天下大道 大道至简\n";

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn wenseg() -> Command {
    Command::cargo_bin("wenseg").expect("binary exists")
}

#[test]
fn lexicon_writes_review_csv_and_metrics() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("corpus.txt"), CORPUS.repeat(5)).expect("write corpus");

    wenseg()
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "lexicon",
            "corpus.txt",
            "--min-frequency",
            "2",
            "--min-pmi",
            "0",
            "--min-entropy",
            "0",
            "--no-progress",
            "--metrics",
            "metrics.json",
            "-o",
            "lexicon.csv",
        ])
        .assert()
        .success();

    let csv = fs::read_to_string(workspace.path().join("lexicon.csv")).expect("lexicon written");
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Word,Frequency,PMI,R_Entropy,L_Entropy"));
    let words: Vec<&str> = lines.map(|line| line.split(',').next().unwrap()).collect();
    assert!(words.contains(&"天下"), "{words:?}");
    assert!(!words.iter().any(|word| word.chars().count() > 1 && word.contains('之')));

    let metrics: Value = serde_json::from_slice(
        &fs::read(workspace.path().join("metrics.json")).expect("metrics written"),
    )
    .expect("metrics are JSON");
    assert_eq!(metrics["runs"].as_u64(), Some(40));
    assert_eq!(metrics["accepted"].as_u64(), Some(words.len() as u64));
}

#[test]
fn cut_prints_json_tokens_and_builds_cache() {
    let workspace = temp_workspace();
    fs::write(
        workspace.path().join("dict.txt"),
        "天下,50\n天,30\n下,20\n大道,15\n为公,8\n",
    )
    .expect("write dict");
    fs::write(workspace.path().join("input.txt"), "天下大道\n天下为公。\n").expect("write input");

    let output = wenseg()
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "cut",
            "--dict",
            "dict.txt",
            "--cache",
            "dict.cache",
            "input.txt",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).expect("utf8 output");
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], serde_json::json!(["天下", "大道"]));
    assert_eq!(lines[1], serde_json::json!(["天下", "为公", "。"]));
    assert!(workspace.path().join("dict.cache").exists());
}

#[test]
fn cut_reads_stdin() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("dict.txt"), "天下,50\n").expect("write dict");

    wenseg()
        .current_dir(workspace.path())
        .args(["--quiet", "cut", "--dict", "dict.txt"])
        .write_stdin("天下龘\n")
        .assert()
        .success()
        .stdout("天下 龘\n");
}

#[test]
fn missing_dictionary_fails() {
    let workspace = temp_workspace();
    wenseg()
        .current_dir(workspace.path())
        .args(["--quiet", "cut", "--dict", "absent.txt"])
        .write_stdin("天下\n")
        .assert()
        .failure();
}

#[test]
fn train_lm_then_hmm_cut_covers_input() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("corpus.txt"), CORPUS).expect("write corpus");

    wenseg()
        .current_dir(workspace.path())
        .args(["--quiet", "train-lm", "corpus.txt", "--order", "3", "-o", "model.bin"])
        .assert()
        .success();
    assert!(workspace.path().join("model.bin").exists());

    let output = wenseg()
        .current_dir(workspace.path())
        .args(["--quiet", "hmm-cut", "-m", "model.bin", "--json"])
        .write_stdin("天下大道 之行也\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let tokens: Vec<String> =
        serde_json::from_slice(&output).expect("single JSON line of tokens");
    assert_eq!(tokens.concat(), "天下大道之行也");
}

#[test]
fn lm_text_spaces_characters() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("corpus.txt"), "天下大道，为公\n").expect("write corpus");

    wenseg()
        .current_dir(workspace.path())
        .args(["--quiet", "lm-text", "corpus.txt"])
        .assert()
        .success()
        .stdout("天 下 大 道\n为 公\n");
}
