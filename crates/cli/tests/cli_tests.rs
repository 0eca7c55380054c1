// End-to-end tests for the `stockfeed` binary: exit codes, output files,
// the --json contract and stdin catalogs.
//
// Run with: cargo test -p stockfeed-cli --test cli_tests -- --nocapture

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use stockfeed_recon::config::TokenRepair;
use stockfeed_recon::{Table, Value};

const CATALOG: &str = "product_sku;name;quantity;price\nA1;Widget;10;2,50\n1024;Bout M8;0;0,10\n";
const FEED_NAME: &str = "Gefilterde_Stocklijst_2024-03-09.csv";
const EXPECTED_FEED: &str = "product_sku;name;quantity\nA1;Widget;7\n1024;Bout;0\n";

fn stockfeed() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stockfeed"))
}

fn stock_table() -> Table {
    let mut table = Table::new(vec!["Code".into(), "Omschrijving".into(), "Voorraad".into(), "Locatie".into()]);
    table.push_row(vec![Value::text("A1"), Value::text("Widget"), Value::Number(7.0), Value::text("R1")]);
    table.push_row(vec![Value::text("Z9"), Value::text("Unlisted"), Value::Number(4.0), Value::text("R2")]);
    table.push_row(vec![Value::Number(1024.0), Value::text("Bout"), Value::text("n/a"), Value::Empty]);
    table
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fx = Self { dir: tempfile::tempdir().unwrap() };
        fx.write("voorraad.xlsx", &stockfeed_io::xlsx::export_feed(&stock_table(), "Blad1").unwrap());
        fx.write("catalog.csv", CATALOG.as_bytes());
        fx
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn arg(&self, name: &str) -> String {
        self.path(name).to_str().unwrap().to_string()
    }

    fn write(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.path(name), bytes).unwrap();
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    /// `stockfeed run <stock> <catalog> --out-dir <tmp> --date 2024-03-09 <extra...>`
    fn run(&self, stock: &str, catalog: &str, extra: &[&str]) -> Output {
        let stock = self.arg(stock);
        let catalog = if catalog == "-" { "-".to_string() } else { self.arg(catalog) };
        let out_dir = self.arg("");
        let mut args = vec!["run", stock.as_str(), catalog.as_str(), "--out-dir", out_dir.as_str(), "--date", "2024-03-09", "-q"];
        args.extend_from_slice(extra);
        stockfeed().args(&args).output().expect("run stockfeed")
    }

    fn run_with_stdin(&self, extra: &[&str], stdin: &[u8]) -> Output {
        let stock = self.arg("voorraad.xlsx");
        let out_dir = self.arg("");
        let mut args = vec!["run", stock.as_str(), "-", "--out-dir", out_dir.as_str(), "--date", "2024-03-09", "-q"];
        args.extend_from_slice(extra);

        let mut child = stockfeed()
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn stockfeed");
        child.stdin.take().unwrap().write_all(stdin).unwrap();
        child.wait_with_output().expect("wait stockfeed")
    }
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_success(output: &Output) {
    assert!(output.status.success(), "exit code: {:?}\nstderr: {}", output.status, stderr(output));
}

// ===========================================================================
// stockfeed run
// ===========================================================================

#[test]
fn run_writes_dated_feed() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &[]);
    assert_success(&output);
    assert_eq!(fx.read(FEED_NAME), EXPECTED_FEED);
    // No delta requested: nothing on stdout
    assert!(stdout(&output).is_empty());
}

#[test]
fn run_is_byte_identical_across_invocations() {
    let fx = Fixture::new();
    assert_success(&fx.run("voorraad.xlsx", "catalog.csv", &[]));
    let first = std::fs::read(fx.path(FEED_NAME)).unwrap();
    std::fs::remove_file(fx.path(FEED_NAME)).unwrap();

    assert_success(&fx.run("voorraad.xlsx", "catalog.csv", &[]));
    assert_eq!(std::fs::read(fx.path(FEED_NAME)).unwrap(), first);
}

#[test]
fn run_output_dash_writes_feed_to_stdout() {
    let fx = Fixture::new();
    let stock = fx.arg("voorraad.xlsx");
    let catalog = fx.arg("catalog.csv");
    let output = stockfeed()
        .args(["run", &stock, &catalog, "-o", "-", "-q"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output), EXPECTED_FEED);
}

#[test]
fn run_diff_prints_delta_table() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--diff"]);
    assert_success(&output);

    let out = stdout(&output);
    let widget = out.lines().find(|l| l.contains("Widget")).expect("Widget row");
    assert!(widget.starts_with("▼"), "{widget}");
    assert!(widget.contains("-3"), "{widget}");
    assert!(widget.ends_with("7.50"), "{widget}");
    assert!(out.contains("total loss 7.50"), "{out}");
    // 1024 is unchanged (0 -> 0) and must not be listed
    assert!(!out.contains("Bout"), "{out}");
}

#[test]
fn run_json_contract() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--diff", "--json"]);
    assert_success(&output);

    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).expect("stdout must be one JSON value");
    let feed = &val["feed"];
    assert_eq!(feed["rows"], 2);
    assert_eq!(feed["format"], "csv");
    assert_eq!(feed["recovered"], false);
    assert_eq!(feed["columns"], serde_json::json!(["product_sku", "name", "quantity"]));
    assert!(feed["path"].as_str().unwrap().ends_with(FEED_NAME));
    assert_eq!(feed["summary"]["dropped_rows"], 1);
    assert_eq!(feed["summary"]["coerced_defaults"], 1);

    let rows = val["delta"]["rows"].as_array().expect("delta rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Widget");
    assert_eq!(rows[0]["previous_quantity"], 10);
    assert_eq!(rows[0]["new_quantity"], 7);
    assert_eq!(rows[0]["delta"], -3);
    assert_eq!(rows[0]["loss_value"], 7.5);
}

#[test]
fn run_json_without_delta_has_null_delta() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--json"]);
    assert_success(&output);
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert!(val["delta"].is_null());
}

#[test]
fn run_previous_snapshot() {
    let fx = Fixture::new();
    fx.write("last-week.csv", b"product_sku,name,quantity,price\nA1,Widget,5,2.50\n");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--previous", &fx.arg("last-week.csv"), "--json"]);
    assert_success(&output);

    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    let rows = val["delta"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["delta"], 2);
    assert_eq!(rows[0]["loss_value"], 0.0);
}

#[test]
fn run_xlsx_feed_reads_back() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--format", "xlsx"]);
    assert_success(&output);

    let bytes = std::fs::read(fx.path("Gefilterde_Stocklijst_2024-03-09.xlsx")).unwrap();
    let feed = stockfeed_io::xlsx::ingest_stock(&bytes, &Default::default()).unwrap();
    assert_eq!(feed.table.headers(), &["product_sku", "name", "quantity"]);
    let keys: Vec<String> = feed.table.rows().iter().map(|r| r[0].as_key()).collect();
    assert_eq!(keys, vec!["A1", "1024"]);
}

#[test]
fn run_recovers_corrupted_styles() {
    let fx = Fixture::new();
    let clean = std::fs::read(fx.path("voorraad.xlsx")).unwrap();
    let breakage = [TokenRepair { find: "xfId=".into(), replace: "xfid=".into() }];
    let broken = stockfeed_io::repair::repair_styles(&clean, &breakage).unwrap();
    fx.write("broken.xlsx", &broken.bytes);

    let output = fx.run("broken.xlsx", "catalog.csv", &["--json"]);
    assert_success(&output);
    assert_eq!(fx.read(FEED_NAME), EXPECTED_FEED);

    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["feed"]["recovered"], true);
}

// ===========================================================================
// stdin catalogs
// ===========================================================================

#[test]
fn stdin_catalog_with_snapshot_diff() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["--diff"], CATALOG.as_bytes());
    assert_success(&output);
    assert_eq!(fx.read(FEED_NAME), EXPECTED_FEED);
    assert!(stdout(&output).contains("Widget"));
}

#[test]
fn stdin_catalog_reread_fails_delta_but_keeps_feed() {
    let fx = Fixture::new();
    let output = fx.run_with_stdin(&["--previous", "-"], CATALOG.as_bytes());
    assert_eq!(code(&output), 7, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("stdin cannot be read a second time"), "{}", stderr(&output));
    assert_eq!(fx.read(FEED_NAME), EXPECTED_FEED);
}

#[test]
fn file_catalog_previous_dash_rereads_the_file() {
    let fx = Fixture::new();
    let stock = fx.arg("voorraad.xlsx");
    let catalog = fx.arg("catalog.csv");
    let out_dir = fx.arg("");
    let mut child = stockfeed()
        .args(["run", &stock, &catalog, "--previous", "-", "--out-dir", &out_dir, "--date", "2024-03-09", "-q"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // Matches the stock quantity, so reading it would report no changes. The
    // process may exit without reading, so a broken pipe is fine here.
    let _ = child.stdin.take().unwrap().write_all(b"product_sku;name;quantity;price\nA1;Widget;7;2,50\n");
    let output = child.wait_with_output().unwrap();
    assert_success(&output);

    let out = stdout(&output);
    let widget = out.lines().find(|l| l.contains("Widget")).expect("Widget row");
    assert!(widget.starts_with("▼"), "{widget}");
    assert!(widget.contains("-3"), "{widget}");
}

// ===========================================================================
// Failures and exit codes
// ===========================================================================

#[test]
fn missing_stock_column_is_exit_4_and_writes_nothing() {
    let fx = Fixture::new();
    fx.write("ean.toml", b"[join]\nstock_column = \"EAN\"\n\n[[columns]]\nsource = \"EAN\"\ntarget = \"product_sku\"\n\n[[columns]]\nsource = \"Voorraad\"\ntarget = \"quantity\"\ncoerce = \"quantity\"\n");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--config", &fx.arg("ean.toml")]);
    assert_eq!(code(&output), 4, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("stock: missing column 'EAN'"), "{}", stderr(&output));
    assert!(!fx.path(FEED_NAME).exists());
}

#[test]
fn unreadable_stock_is_exit_3() {
    let fx = Fixture::new();
    fx.write("voorraad.xlsx", b"this is not a spreadsheet");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &[]);
    assert_eq!(code(&output), 3, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("cannot read stock export"));
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn catalog_without_join_column_is_exit_4() {
    let fx = Fixture::new();
    fx.write("catalog.csv", b"sku;name\nA1;Widget\n");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &[]);
    assert_eq!(code(&output), 4, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("catalog: missing column 'product_sku'"), "{}", stderr(&output));
    assert!(!fx.path(FEED_NAME).exists());
}

#[test]
fn ragged_catalog_is_exit_3() {
    let fx = Fixture::new();
    fx.write("catalog.csv", b"a,b;c\n1;2\n3,4,5\n");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &[]);
    assert_eq!(code(&output), 3, "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("hint:"), "{}", stderr(&output));
}

#[test]
fn invalid_config_is_exit_5() {
    let fx = Fixture::new();
    fx.write("bad.toml", b"[output]\ndelimiter = \"\\\"\"\n");
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--config", &fx.arg("bad.toml")]);
    assert_eq!(code(&output), 5, "stderr: {}", stderr(&output));
}

#[test]
fn missing_stock_file_is_usage_error() {
    let fx = Fixture::new();
    let output = fx.run("nope.xlsx", "catalog.csv", &[]);
    assert_eq!(code(&output), 2);
}

#[test]
fn json_with_stdout_feed_is_usage_error() {
    let fx = Fixture::new();
    let stock = fx.arg("voorraad.xlsx");
    let catalog = fx.arg("catalog.csv");
    let output = stockfeed()
        .args(["run", &stock, &catalog, "--json", "-o", "-"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 2);
    assert!(stderr(&output).contains("both write to stdout"), "{}", stderr(&output));
}

#[test]
fn diff_and_previous_conflict() {
    let fx = Fixture::new();
    let output = fx.run("voorraad.xlsx", "catalog.csv", &["--diff", "--previous", "x.csv"]);
    assert_eq!(code(&output), 2);
}

// ===========================================================================
// stockfeed config
// ===========================================================================

#[test]
fn config_show_round_trips_through_validate() {
    let fx = Fixture::new();
    let output = stockfeed().args(["config", "show"]).output().unwrap();
    assert_success(&output);
    let shown = stdout(&output);
    assert!(shown.contains("stock_column = \"Code\""), "{shown}");
    assert!(shown.contains("file_prefix = \"Gefilterde_Stocklijst\""), "{shown}");

    fx.write("shown.toml", shown.as_bytes());
    let output = stockfeed().args(["config", "validate", &fx.arg("shown.toml")]).output().unwrap();
    assert_success(&output);
    let report = stdout(&output);
    assert!(report.contains("join: Code -> product_sku"), "{report}");
    assert!(report.contains("column: Voorraad -> quantity (quantity)"), "{report}");
}

#[test]
fn config_validate_reports_problem() {
    let fx = Fixture::new();
    fx.write("dup.toml", b"[[columns]]\nsource = \"Code\"\ntarget = \"x\"\n\n[[columns]]\nsource = \"Voorraad\"\ntarget = \"x\"\n");
    let output = stockfeed().args(["config", "validate", &fx.arg("dup.toml")]).output().unwrap();
    assert_eq!(code(&output), 5);
    assert!(stderr(&output).contains("duplicate output column 'x'"), "{}", stderr(&output));
}
