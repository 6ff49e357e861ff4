use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.assert().success().stdout(contains("mango"));
}

#[test]
fn runs_count_program() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run").arg("tests/files/count.asm");

    cmd.assert()
        .success()
        .stdout(contains("Running"))
        .stdout(contains("Halted"));
}

#[test]
fn runs_path_argument() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("tests/files/stack.asm");
    cmd.assert().success().stdout(contains("Completed"));
}

#[test]
fn minimal_prints_registers() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run").arg("tests/files/count.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout("A=0x0a B=0x00 C=0x00 D=0x00 PC=0x02 SP=0xe7 Z=1 C=0 O=0 N=0\n");
}

#[test]
fn registers_from_environment() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run")
        .arg("tests/files/countdown.asm")
        .env("MANGO_REGISTERS", "1");

    cmd.assert()
        .success()
        .stdout(contains("Registers"))
        .stdout(contains("A=0x00"));
}

#[test]
fn stops_on_breakpoint() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    // Line 5 is `CMP A, 0xA`
    cmd.arg("run")
        .arg("tests/files/count.asm")
        .arg("--break")
        .arg("5")
        .arg("--minimal");

    let output = cmd.assert().success().get_output().stdout.clone();
    let output = String::from_utf8(output).unwrap();
    // Ten stops plus the final dump
    assert_eq!(output.lines().count(), 11);
    assert!(output.lines().next().unwrap().starts_with("A=0x01"));
}

#[test]
fn lists_breakpoints() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run")
        .arg("tests/files/count.asm")
        .arg("--break")
        .arg("5")
        .arg("--break")
        .arg("4");

    cmd.assert()
        .success()
        .stdout(contains("set on line 5 (address 0x05)"))
        .stdout(contains("set on line 4 (address 0x03)"))
        .stdout(contains("Halted"));
}

#[test]
fn respects_step_limit() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run")
        .arg("tests/files/bad/forever.asm")
        .arg("--max-steps")
        .arg("20");
    cmd.assert().success().stdout(contains("step limit of 20"));

    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run")
        .arg("tests/files/bad/forever.asm")
        .env("MANGO_MAX_STEPS", "7");
    cmd.assert().success().stdout(contains("step limit of 7"));
}

#[test]
fn checks_programs() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("check").arg("tests/files/hello.asm");
    cmd.assert().success().stdout(contains("no errors found!"));
}

#[test]
fn reports_assembly_errors() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("check").arg("tests/files/bad/undefined.asm");
    cmd.assert()
        .failure()
        .stderr(contains("asm::undefined_label"))
        .stderr(contains("nowhere"));

    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run").arg("tests/files/bad/duplicate.asm");
    cmd.assert()
        .failure()
        .stderr(contains("Duplicate label"));
}

#[test]
fn rejects_unknown_extension() {
    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run").arg("Cargo.toml");
    cmd.assert().failure().stderr(contains("unknown extension"));
}

#[test]
fn compiles_and_runs_binary() {
    let dest = std::env::temp_dir().join(format!("mango-fib-{}.bin", std::process::id()));

    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("compile").arg("tests/files/fib.asm").arg(&dest);
    cmd.assert().success().stdout(contains("Saved"));

    let image = std::fs::read(&dest).unwrap();
    assert_eq!(image, mango::assemble(include_str!("files/fib.asm")).unwrap().code);

    let mut cmd = Command::cargo_bin("mango").unwrap();
    cmd.arg("run").arg(&dest).arg("--minimal");
    cmd.assert().success().stdout(contains("A=0x37 B=0x59"));

    std::fs::remove_file(&dest).unwrap();
}

#[test]
fn all_demo_programs_assemble() {
    let mut count = 0;
    for entry in glob::glob("tests/files/*.asm").unwrap() {
        let path = entry.unwrap();
        let src = std::fs::read_to_string(&path).unwrap();
        assert!(mango::assemble(&src).is_ok(), "{}", path.display());
        count += 1;
    }
    assert!(count >= 5);
}
