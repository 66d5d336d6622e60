use assert_cmd::Command;
use predicates::prelude::*;

fn vipcoin() -> Command {
    Command::cargo_bin("vipcoin").expect("binary built")
}

#[test]
fn demo_reports_valid_chain() {
    vipcoin()
        .args(["demo", "--difficulty", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mining Block 2...."))
        .stdout(predicate::str::contains("Is blockchain valid? true"));
}

#[test]
fn demo_dump_prints_chain_json() {
    vipcoin()
        .args(["--difficulty", "1", "--parallel", "demo", "--dump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"previousHash\": \"0\""))
        .stdout(predicate::str::contains("\"difficulty\": 1"));
}

#[test]
fn tamper_is_detected() {
    vipcoin()
        .args(["tamper", "--difficulty", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Is blockchain valid? true"))
        .stdout(predicate::str::contains("false (block 1: stored hash"))
        .stdout(predicate::str::contains("false (block 2: previous hash"));
}

#[test]
fn ledger_prints_balances() {
    vipcoin()
        .args([
            "ledger",
            "--difficulty",
            "1",
            "--miner",
            "M",
            "--transfer",
            "A:B:100",
            "--transfer",
            "B:A:50",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance of A is -50"))
        .stdout(predicate::str::contains("Balance of B is 50"))
        .stdout(predicate::str::contains("Balance of M is 100"));
}

#[test]
fn ledger_single_round_withholds_reward() {
    vipcoin()
        .args([
            "ledger", "--no-pow", "--miner", "M", "--rounds", "1", "--transfer", "A:B:7",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance of M is 0"))
        .stdout(predicate::str::contains("Balance of B is 7"));
}

#[test]
fn rejects_bad_transfer() {
    vipcoin()
        .args(["ledger", "--transfer", "A-B-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FROM:TO:AMOUNT"));
}

#[test]
fn rejects_unreachable_difficulty() {
    vipcoin()
        .args(["demo", "--difficulty", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("difficulty 99"));
}

#[test]
fn ledger_saturates_huge_balances() {
    vipcoin()
        .args([
            "ledger",
            "--no-pow",
            "--miner",
            "M",
            "--transfer",
            "A:B:9223372036854775807",
            "--transfer",
            "A:B:9223372036854775807",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance of A is -9223372036854775808"))
        .stdout(predicate::str::contains("Balance of B is 9223372036854775807"));
}
