use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_wordsieve")))
}

/// Scratch workspace with its own settings file and snapshot directory.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> PathBuf {
        self.path("config")
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cmd();
        cmd.arg("--config")
            .arg(self.config())
            .arg("--tmp-dir")
            .arg(self.path("tmp"));
        cmd
    }

    fn run(&self, input: &Path, output: &Path, steps: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .arg("run")
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(steps)
            .assert()
    }
}

#[test]
fn cli_strip_translations() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "hello\tcześć\nhouse\tdom\nsolo\n");
    let output = ws.path("out.txt");

    ws.run(&input, &output, &["strip"]).success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "hello\nhouse\nsolo\n");
    assert_eq!(fs::read_to_string(ws.path("tmp/tmp0")).unwrap(), "hello\nhouse\nsolo\n");
    // origin untouched
    assert_eq!(
        fs::read_to_string(&input).unwrap(),
        "hello\tcześć\nhouse\tdom\nsolo\n"
    );
}

#[test]
fn cli_undo_restores_origin() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "hello\tcześć\n");
    let output = ws.path("out.txt");

    ws.run(&input, &output, &["strip", "undo", "undo"]).success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "hello\tcześć\n");
}

#[test]
fn cli_refuses_snapshot_as_input() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "hello\tcześć\n");
    ws.cmd()
        .arg("run")
        .arg("-i")
        .arg(&input)
        .arg("strip")
        .assert()
        .success();

    let snapshot = ws.path("tmp/tmp0");
    ws.run(&snapshot, &ws.path("out.txt"), &["strip"])
        .failure()
        .stderr(predicate::str::contains("is a snapshot file"));
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "hello\n");
}

#[test]
fn cli_strip_latin1_deck() {
    let ws = Workspace::new();
    let input = ws.path("deck.txt");
    fs::write(&input, b"caf\xe9\tcoffee\nthe\tle\n").unwrap();
    let output = ws.path("out.txt");

    ws.run(&input, &output, &["strip"]).success();
    assert_eq!(fs::read_to_string(&output).unwrap(), "caf\u{FFFD}\nthe\n");
}

#[test]
fn cli_filter_with_bound_list() {
    let ws = Workspace::new();
    let list = ws.write("stop.txt", "the\na\n");
    let input = ws.write("ranked.txt", "the\n1 cat 2\ndog\n");
    let output = ws.path("out.txt");

    ws.cmd()
        .args(["config", "filter", "English"])
        .arg(&list)
        .assert()
        .success();

    ws.run(&input, &output, &["filter"]).success();
    assert_eq!(fs::read_to_string(&output).unwrap(), "1 cat 2\ndog\n");
}

#[test]
fn cli_filter_without_binding_fails() {
    let ws = Workspace::new();
    let input = ws.write("ranked.txt", "the\n");
    let output = ws.path("out.txt");

    ws.run(&input, &output, &["filter"])
        .failure()
        .stderr(predicate::str::contains("no filter file was specified for English"));

    assert!(!ws.path("tmp").exists());
    assert!(!output.exists());
}

#[test]
fn cli_missing_input() {
    let ws = Workspace::new();
    ws.run(&ws.path("absent.txt"), &ws.path("out.txt"), &["strip"])
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn cli_unknown_step() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "a\tb\n");
    ws.run(&input, &ws.path("out.txt"), &["shuffle"])
        .failure()
        .stderr(predicate::str::contains("unknown step 'shuffle'"));
}

#[test]
fn cli_tmp_path_occupied_by_file() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "a\tb\n");
    ws.write("tmp", "in the way");

    ws.run(&input, &ws.path("out.txt"), &["strip"])
        .failure()
        .stderr(predicate::str::contains("directory is needed but such file exists"));
}

#[test]
fn cli_preview_after_each_step() {
    let ws = Workspace::new();
    let body: String = (1..=20).map(|n| format!("w{n}\tt{n}\n")).collect();
    let input = ws.write("deck.txt", &body);

    let assert = ws
        .cmd()
        .args(["run", "--preview", "-i"])
        .arg(&input)
        .arg("strip")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(stdout.contains("== loaded\nw1\tt1\n"), "Got: {stdout}");
    assert!(stdout.contains("== strip\nw1\nw2\n"), "Got: {stdout}");
    assert!(stdout.contains("w11\n"), "Got: {stdout}");
    assert!(!stdout.contains("w12"), "Got: {stdout}");
}

#[test]
fn cli_config_round_trip() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["config", "language", "german"])
        .assert()
        .success();
    ws.cmd()
        .args(["config", "tagger", "German", "/opt/tree-tagger/cmd/tree-tagger-german"])
        .assert()
        .success();

    ws.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lastUsedLanguage=German"))
        .stdout(predicate::str::contains(
            "taggerGerman=/opt/tree-tagger/cmd/tree-tagger-german",
        ));
}

#[test]
fn cli_config_skips_malformed_lines() {
    let ws = Workspace::new();
    ws.write(
        "config",
        "lastUsedLanguage=French\nthis line is junk\nfilterFrench=/a=b\nfilterSpanish=/lists/es.txt\n",
    );

    ws.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lastUsedLanguage=French"))
        .stdout(predicate::str::contains("filterSpanish=/lists/es.txt"))
        .stdout(predicate::str::contains("filterFrench").not());
}

#[test]
fn cli_run_records_working_directory_and_language() {
    let ws = Workspace::new();
    let input = ws.write("deck.txt", "a\tb\n");

    ws.cmd()
        .args(["run", "-l", "italian", "-i"])
        .arg(&input)
        .arg("strip")
        .assert()
        .success();

    let saved = fs::read_to_string(ws.config()).unwrap();
    assert!(saved.contains("lastUsedLanguage=Italian"), "Got: {saved}");
    let dir = std::path::absolute(ws.dir.path()).unwrap();
    assert!(
        saved.contains(&format!("lastWorkingDirectory={}", dir.display())),
        "Got: {saved}"
    );
}

#[cfg(unix)]
mod tagger {
    use super::*;

    fn bind_tagger(ws: &Workspace, body: &str) {
        let script = ws.write("tagger.sh", body);
        ws.cmd()
            .args(["config", "tagger", "English"])
            .arg(format!("/bin/sh {}", script.display()))
            .assert()
            .success();
    }

    const TAGGER: &str =
        "for w in the cat the dog the cat; do printf '%s\\tTAG\\t%s\\n' \"$w\" \"$w\"; done\n";

    #[test]
    fn cli_count_sort_with_stats() {
        let ws = Workspace::new();
        bind_tagger(&ws, TAGGER);
        let input = ws.write("text.txt", "ignored by the fake tagger\n");
        let output = ws.path("out.txt");

        ws.run(&input, &output, &["count-stats"]).success();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "1 the 3\n2 cat 2\n3 dog 1\n"
        );
    }

    #[test]
    fn cli_count_then_filter() {
        let ws = Workspace::new();
        bind_tagger(&ws, TAGGER);
        let list = ws.write("stop.txt", "the\n");
        ws.cmd()
            .args(["config", "filter", "English"])
            .arg(&list)
            .assert()
            .success();
        let input = ws.write("text.txt", "ignored\n");
        let output = ws.path("out.txt");

        ws.run(&input, &output, &["count-stats", "filter"]).success();
        assert_eq!(fs::read_to_string(&output).unwrap(), "2 cat 2\n3 dog 1\n");
    }

    #[test]
    fn cli_count_without_stats() {
        let ws = Workspace::new();
        bind_tagger(&ws, TAGGER);
        let input = ws.write("text.txt", "ignored\n");
        let output = ws.path("out.txt");

        ws.run(&input, &output, &["count"]).success();
        assert_eq!(fs::read_to_string(&output).unwrap(), "the\ncat\ndog\n");
    }

    #[test]
    fn cli_count_rejects_spaced_path() {
        let ws = Workspace::new();
        bind_tagger(&ws, TAGGER);
        let input = ws.write("my text.txt", "ignored\n");
        let output = ws.path("out.txt");

        ws.run(&input, &output, &["count-stats"])
            .failure()
            .stderr(predicate::str::contains("spaces in their path"));
        assert!(!ws.path("tmp").exists());
    }

    #[test]
    fn cli_count_without_tagger_fails() {
        let ws = Workspace::new();
        let input = ws.write("text.txt", "ignored\n");

        ws.run(&input, &ws.path("out.txt"), &["count"])
            .failure()
            .stderr(predicate::str::contains("no tagger was specified for English"));
    }
}
