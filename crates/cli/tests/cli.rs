use assert_cmd::Command;
use tempfile::TempDir;

fn shelfbot(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shelfbot").unwrap();
    cmd.env("SHELFBOT_CONFIG_DIR", config_dir.path())
        .env("SHELFBOT_ENV", "local")
        .env_remove("RUST_LOG")
        .arg("--catalogue")
        .arg(config_dir.path().join("data.json"));
    cmd
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn books_on_fresh_catalogue_creates_file() {
    let dir = TempDir::new().unwrap();

    let stdout = stdout_of(shelfbot(&dir).arg("books").assert().success());

    assert!(stdout.contains("The catalogue is empty."));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("data.json")).unwrap(),
        "[]"
    );
}

#[test]
fn chat_session_adds_a_book() {
    let dir = TempDir::new().unwrap();
    let script = "/create_book\nDune\ndesc\n9\nsci-fi\nFrank Herbert, Kevin J. Anderson\nhttp://x/y.jpg\n/books\n";

    let stdout = stdout_of(
        shelfbot(&dir)
            .args(["chat", "--user", "42"])
            .write_stdin(script)
            .assert()
            .success(),
    );
    assert!(stdout.contains("Book \"Dune\" added to the catalogue."));
    assert!(stdout.contains("[book:0] Dune"));

    let stdout = stdout_of(shelfbot(&dir).args(["show", "0"]).assert().success());
    assert!(stdout.contains("Authors: Frank Herbert,Kevin J. Anderson"));
}

#[test]
fn show_out_of_range_fails() {
    let dir = TempDir::new().unwrap();

    let assert = shelfbot(&dir).args(["show", "3"]).assert().failure();

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("no book at position 3"));
}

#[test]
fn chat_title_may_look_like_a_selection() {
    let dir = TempDir::new().unwrap();
    let script = "/create_book\nbook: a memoir\ndesc\n7\nmemoir\nAnon\nhttp://x/m.png\n";

    let stdout = stdout_of(
        shelfbot(&dir)
            .arg("chat")
            .write_stdin(script)
            .assert()
            .success(),
    );
    assert!(stdout.contains("Book \"book: a memoir\" added to the catalogue."));

    let stdout = stdout_of(shelfbot(&dir).arg("books").assert().success());
    assert!(stdout.contains("  0  book: a memoir  (Anon)"));
}
