// Tests for weaveld
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const LOGGING_OUTPUT: &str = "enter\nhello world\nleave\n\
                              enter\nhello aspects\nleave\n\
                              calls: 2\n";

#[test]
fn link_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--no-inline"));

    Ok(())
}

#[test]
fn link_invalid_argument() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn link_missing_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("INPUT"));

    Ok(())
}

#[test]
fn link_invalid_jobs() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs").arg("-j").arg("lots");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("--jobs lots"));

    Ok(())
}

#[test]
fn link_input_file_does_not_exist() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/does-not-exist.cs");
    cmd.assert()
        .failure()
        .code(exitcode::IOERR)
        .stderr(predicate::str::contains("No such file or directory"));

    Ok(())
}

#[test]
fn link_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("void Greet(string name)"))
        .stdout(predicate::str::contains("Console.WriteLine(\"hello \", name);"))
        .stdout(predicate::str::contains("GreetLogging").not())
        .stdout(predicate::str::contains("LayerOrder").not())
        .stdout(predicate::str::contains("link(").not());

    Ok(())
}

#[test]
fn link_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let dest = std::path::Path::new(env!("CARGO_TARGET_TMPDIR"))
        .join("weaveld-logging.cs");

    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs").arg("-o").arg(&dest);
    cmd.assert().success().stdout(predicate::str::is_empty());

    let linked = std::fs::read_to_string(&dest)?;
    assert!(linked.contains("void Greet(string name)"), "{linked}");

    Ok(())
}

#[test]
fn link_and_eval() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs").arg("--eval").arg("Program.Main");
    cmd.assert().success().stdout(LOGGING_OUTPUT);

    Ok(())
}

#[test]
fn link_without_inlining_behaves_the_same() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs")
        .arg("--no-inline")
        .arg("-j")
        .arg("1")
        .arg("--eval")
        .arg("Program.Main");
    cmd.assert().success().stdout(LOGGING_OUTPUT);

    Ok(())
}

#[test]
fn link_without_inlining_keeps_intermediates() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs").arg("--no-inline");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("private void Greet_Source(string name)"))
        .stdout(predicate::str::contains("private void Greet_Logging(string name)"))
        .stdout(predicate::str::contains("this.Greet_Logging(name);"));

    Ok(())
}

#[test]
fn link_reports_member_errors() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/no-base.cs");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stdout(predicate::str::contains("link(Hello, base)()"))
        .stderr(predicate::str::contains(
            "`Hello` has no declaration preceding this layer",
        ))
        .stderr(predicate::str::contains("no-base.cs:13"))
        .stderr(predicate::str::contains("due to 1 previous error(s)"));

    Ok(())
}

#[test]
fn link_reports_parse_errors() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/unterminated.cs");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unterminated string literal"))
        .stderr(predicate::str::contains("fatal: failed to link"));

    Ok(())
}

#[test]
fn eval_reports_unknown_entry_point() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("weaveld")?;
    cmd.arg("tests/data/logging.cs").arg("--eval").arg("Program.Missing");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("Missing"));

    Ok(())
}
