mod common;

use std::fs;

use assert_cmd::Command;
use common::temp_data_dir;
use predicates::str::contains;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("extrato_cli").unwrap();
    cmd.env("EXTRATO_HOME", home)
        .env("EXTRATO_CLI_SCRIPT", "1")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn script_mode_records_reverses_and_exports() {
    let home = temp_data_dir();
    let exports = temp_data_dir();
    let input = format!(
        "add 2024-11-01 entrada 100 Salary\n\
         add 2024-11-02 saida 30 Groceries\n\
         toggle 1\n\
         reverse\n\
         list\n\
         balance\n\
         export {}\n\
         exit\n",
        exports.display()
    );

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Entry added"))
        .stdout(contains("1 entry reversed"))
        .stdout(contains("EXTORNO - Salary"))
        .stdout(contains("Balance: R$ -30,00 (0 selected)"))
        .stdout(contains("Wrote"));

    let exported: Vec<_> = fs::read_dir(&exports)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(exported.len(), 1);
    assert!(exported[0].starts_with("extrato_extrato_"));
    assert!(home.join("ledger.json").exists());
}

#[test]
fn script_mode_imports_an_export_file() {
    let home = temp_data_dir();
    let file = home.join("incoming.json");
    fs::write(
        &file,
        r#"{"lancamentos": [
            {"id": 1, "data": "2023-05-01", "movimento": "entrada", "historico": "Legacy", "valor": "12.5"},
            {"id": 2, "data": "2023-05-02", "movimento": "saida", "historico": "Fee", "valor": 2.5}
        ]}"#,
    )
    .unwrap();

    cli(&home)
        .write_stdin(format!("import {}\nlist\n", file.display()))
        .assert()
        .success()
        .stdout(contains("non-UUID id"))
        .stdout(contains("2 entries imported"))
        .stdout(contains("Balance: R$ 10,00"));
}

#[test]
fn validation_failures_and_typos_do_not_stop_the_script() {
    let home = temp_data_dir();
    cli(&home)
        .write_stdin("add 2024-11-01 entrada 0 Nothing\nrevrse\nreverse\nbalance\n")
        .assert()
        .success()
        .stdout(contains("amount must be greater than zero"))
        .stdout(contains("Suggestion: `reverse`?"))
        .stdout(contains("Select at least one entry to reverse"))
        .stdout(contains("Balance: R$ 0,00"));
}

#[test]
fn unreadable_ledger_file_does_not_stop_the_shell() {
    let home = temp_data_dir();
    fs::write(home.join("ledger.json"), "{ definitely not json").unwrap();

    cli(&home)
        .write_stdin("add 2024-11-01 entrada 10 Cash
balance
")
        .assert()
        .success()
        .stdout(contains("Saved ledger could not be read"))
        .stdout(contains("ledger.json.corrupt"))
        .stdout(contains("Entry added"))
        .stdout(contains("Balance: R$ 10,00"));

    assert_eq!(
        fs::read_to_string(home.join("ledger.json.corrupt")).unwrap(),
        "{ definitely not json"
    );
}
