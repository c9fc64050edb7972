//! End-to-end runs of the `techmarket` binary against a file-backed catalog.
//!
//! Every test works on a temp copy of `tests/fixtures/products.json` and
//! runs from an empty temp directory, so neither a stray `techmarket.toml`
//! nor `TECHMARKET_*` variables from the environment leak in.

use assert_cmd::Command;
use expect_test::expect;
use std::path::{Path, PathBuf};

const ENV_VARS: &[&str] = &[
    "TECHMARKET_CONFIG",
    "TECHMARKET_URL",
    "TECHMARKET_ANON_KEY",
    "TECHMARKET_TABLE",
    "TECHMARKET_CATALOG_FILE",
    "TECHMARKET_PASSCODE",
    "TECHMARKET_LOG_FILE",
    "RUST_LOG",
];

fn fixture_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests/fixtures/products.json")
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(fixture_path(), dir.path().join("products.json")).unwrap();
        Self { dir }
    }

    /// The binary with a clean environment, pointed at the temp catalog.
    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_techmarket"));
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.dir.path())
            .arg("--catalog-file")
            .arg(self.dir.path().join("products.json"));
        cmd
    }

    fn list(&self) -> String {
        let output = self.cmd().arg("list").assert().success();
        String::from_utf8(output.get_output().stdout.clone()).unwrap()
    }
}

#[test]
fn list_latest_first() {
    let ws = Workspace::new();
    expect![[r#"
        7      Monitor 27"                     R$ 1899,00  IPS, 144 Hz
        5      Adaptador USB-C                   R$ 79,00  -
        3      Teclado Mecânico                 R$ 349,90  Switches marrons, ABNT2
    "#]]
    .assert_eq(&ws.list());
}

#[test]
fn list_alphabetical_json() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["list", "--order", "alphabetical", "--json"])
        .assert()
        .success();
    let rows: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let titles: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Adaptador USB-C", "Monitor 27\"", "Teclado Mecânico"]);
}

#[test]
fn add_then_list_shows_new_product_first() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["add", "--title", "iPhone 15 Pro", "--price", "4999,90"])
        .assert()
        .success()
        .stdout("✓ Product added: iPhone 15 Pro (R$ 4999,90)\n");

    let listing = ws.list();
    let first = listing.lines().next().unwrap();
    assert!(first.starts_with("8 "), "{listing}");
    assert!(first.contains("iPhone 15 Pro"), "{listing}");
    assert!(first.contains("R$ 4999,90"), "{listing}");
}

#[test]
fn update_patches_one_field() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["update", "3", "--price", "299"])
        .assert()
        .success();

    let listing = ws.list();
    let teclado = listing.lines().find(|l| l.starts_with("3 ")).unwrap();
    assert!(teclado.contains("R$ 299,00"), "{listing}");
    assert!(teclado.contains("Switches marrons, ABNT2"), "{listing}");
}

#[test]
fn delete_with_yes_removes_product() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["delete", "7", "--yes"])
        .assert()
        .success()
        .stdout("✓ Product 7 removed.\n");
    assert!(!ws.list().contains("Monitor"));
}

#[test]
fn delete_unknown_id_fails() {
    let ws = Workspace::new();
    let before = ws.list();
    let output = ws.cmd().args(["delete", "999", "--yes"]).assert().failure();
    let stderr = String::from_utf8(output.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("No product with ID 999."), "{stderr}");
    assert_eq!(ws.list(), before);
}

#[test]
fn invalid_price_fails_without_changes() {
    let ws = Workspace::new();
    let before = ws.list();
    let output = ws
        .cmd()
        .args(["add", "--title", "Mouse", "--price", "dez"])
        .assert()
        .failure();
    let stderr = String::from_utf8(output.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("'dez' is not a valid price."), "{stderr}");
    assert_eq!(ws.list(), before);
}

#[test]
fn missing_backend_settings_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_techmarket"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    let output = cmd.current_dir(dir.path()).arg("list").assert().failure();
    let stderr = String::from_utf8(output.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("No catalog configured"), "{stderr}");
}
