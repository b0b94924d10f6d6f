use std::io::Write;

use assert_cmd::Command;
use predicates as pred;
use predicates::prelude::PredicateBooleanExt;
use tempfile::NamedTempFile;

fn batch(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(file, "{}", contents).unwrap();
    file
}

fn ledger() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wallet_ledger"));
    cmd.env_remove("WALLET_LEDGER_CONFIG")
        .env_remove("RUST_LOG")
        .env("WALLET_LEDGER_LOG", "warn");
    cmd
}

#[test]
fn end_to_end_outputs_expected_balances() {
    // agent-1: 100 in, 30 out, 10 held, credit line 500 with 200 drawn
    // agent-2: frozen after a 50 top-up, so the debit is rejected
    let file = batch(
        "op, owner, amount, type, category, method\n\
         open, agent-2,,,,\n\
         open, agent-1,,,,\n\
         credit, agent-1, 100.004,,, Bank Transfer\n\
         debit, agent-1, 30,,,\n\
         hold, agent-1, 10,,,\n\
         limit, agent-1, 500,,,\n\
         movement, agent-1, 200, Debit, Credit Used,\n\
         credit, agent-2, 50,,,\n\
         freeze, agent-2,,,,\n\
         debit, agent-2, 20,,,\n\
         debit, agent-1, 1000,,,\n\
         teleport, agent-1,,,,",
    );

    ledger()
        .arg(file.path())
        .assert()
        .success()
        .stdout(pred::str::starts_with(
            "owner,current,blocked,available,credit_limit,used_credit,available_credit,status\n\
             agent-1,70.00,10.00,60.00,500.00,200.00,300.00,Active\n\
             agent-2,50.00,0.00,50.00,0.00,0.00,0.00,Frozen\n",
        ))
        .stderr(pred::str::contains("DLQ Report"));
}

#[test]
fn rejected_commands_leave_balances_untouched() {
    let file = batch(
        "op, owner, amount, type, category, method\n\
         open, agent-1,,,,\n\
         credit, agent-1, 25,,,\n\
         release, agent-1, 5,,,\n\
         movement, agent-1, 5, Credit, Credit Repayment,\n\
         limit, agent-1, -1,,,\n\
         credit, ghost, 10,,,",
    );

    ledger()
        .arg(file.path())
        .assert()
        .success()
        .stdout(pred::str::contains(
            "agent-1,25.00,0.00,25.00,0.00,0.00,0.00,Active",
        ))
        .stdout(pred::str::contains("ghost").not());
}

#[test]
fn config_file_is_honoured() {
    let mut config = NamedTempFile::new().expect("create temp file");
    writeln!(config, "[ledger]\nsequence_width = 0").unwrap();
    let file = batch("op, owner\nopen, agent-1");

    ledger()
        .env("WALLET_LEDGER_CONFIG", config.path())
        .arg(file.path())
        .assert()
        .failure()
        .stderr(pred::str::contains("sequence_width"));
}

#[test]
fn missing_input_fails() {
    ledger()
        .arg("/definitely/not/here.csv")
        .assert()
        .failure();
}
