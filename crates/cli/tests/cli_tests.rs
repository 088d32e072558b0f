// End-to-end tests for the `lahimena` binary.
// Every run points --config at a file inside the temp dir so the user's
// settings are never read or written.

use std::path::Path;
use std::process::{Command, Output};

fn lahimena(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lahimena"))
        .arg("--config")
        .arg(dir.join("settings.json"))
        .arg("--data-dir")
        .arg(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run lahimena")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn client_add_update_delete() {
    let dir = tempfile::tempdir().unwrap();

    let out = lahimena(dir.path(), &["clients", "add", "--set", "ref_client=C1", "--set", "nom=Dupont"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("row 2"));
    assert!(dir.path().join("data.xlsx").exists());

    let out = lahimena(dir.path(), &["clients", "update", "2", "--set", "Nom=Durand"]);
    assert!(out.status.success());

    let out = lahimena(dir.path(), &["clients", "list", "--json"]);
    let clients: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(clients[0]["nom"], "Durand");
    assert_eq!(clients[0]["ref_client"], "C1");

    let out = lahimena(dir.path(), &["clients", "delete", "2"]);
    assert!(out.status.success());
    let out = lahimena(dir.path(), &["clients", "list", "--json"]);
    let clients: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(clients.as_array().map(Vec::len), Some(0));

    let out = lahimena(dir.path(), &["backups", "clients"]);
    assert!(stdout(&out).contains("data.xlsx."));
}

#[test]
fn missing_row_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let out = lahimena(dir.path(), &["clients", "delete", "5"]);
    assert_eq!(out.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
}

#[test]
fn malformed_assignment_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = lahimena(dir.path(), &["hotels", "add", "--set", "HTL"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("hint:"));

    let out = lahimena(dir.path(), &["hotels", "add", "--set", "lieu=Tana"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn quotation_summary_json() {
    let dir = tempfile::tempdir().unwrap();
    for (numero, client, total) in [("D1", "A", "100"), ("D2", "B", "50"), ("D3", "A", "25")] {
        let out = lahimena(
            dir.path(),
            &[
                "quotes",
                "add",
                "--set",
                &format!("numero={numero}"),
                "--set",
                &format!("client_ref={client}"),
                "--set",
                &format!("total_price={total}"),
            ],
        );
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    let out = lahimena(dir.path(), &["quotes", "summary", "--by", "client", "--json"]);
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["by"], "client");
    assert_eq!(summary["grand_total"], 175.0);
    assert_eq!(summary["groups"][0]["key"], "A");
    assert_eq!(summary["groups"][0]["total"], 125.0);
}

#[test]
fn offline_rates_and_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let out = lahimena(
        dir.path(),
        &["rates", "--offline", "--json", "--amount", "2", "--from", "EUR", "--to", "Ariary"],
    );
    assert!(out.status.success());
    let view: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(view["rates"]["eur"], 5235.0);
    assert_eq!(view["conversion"]["result"], 10470.0);

    let out = lahimena(dir.path(), &["rates", "--offline", "--amount", "1", "--from", "yen", "--to", "EUR"]);
    assert_eq!(out.status.code(), Some(2));
}
