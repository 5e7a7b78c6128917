use assert_cmd::Command;
use tempfile::tempdir;

fn nexus(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("nexus").unwrap();
    cmd.arg(dir);
    cmd
}

#[test]
fn s8_set_inc_get_round_trip() {
    let dir = tempdir().unwrap();
    nexus(dir.path()).args(["set", "42", "x=42"]).assert().success();
    nexus(dir.path()).args(["inc", "42", "x=1"]).assert().success();
    nexus(dir.path())
        .args(["get", "42", "x"])
        .assert()
        .success()
        .stdout("43\n");
}

#[test]
fn get_with_no_key_prints_every_field() {
    let dir = tempdir().unwrap();
    nexus(dir.path()).args(["set", "42", "x=1", "name=\"Ted\""]).assert().success();
    nexus(dir.path())
        .args(["get", "42"])
        .assert()
        .success()
        .stdout("x = 1\nname = Ted\n");
}

#[test]
fn delete_whole_record_then_get_fails() {
    let dir = tempdir().unwrap();
    nexus(dir.path()).args(["set", "42", "x=1"]).assert().success();
    nexus(dir.path()).args(["delete", "42"]).assert().success();
    nexus(dir.path())
        .args(["get", "42"])
        .assert()
        .failure()
        .stderr("no such record \"42\"\n");
}

#[test]
fn get_of_missing_key_reports_the_key() {
    let dir = tempdir().unwrap();
    nexus(dir.path()).args(["set", "42", "x=1"]).assert().success();
    nexus(dir.path())
        .args(["get", "42", "y"])
        .assert()
        .failure()
        .stderr("record \"42\" has no key \"y\"\n");
}

#[test]
fn find_matches_prefix_and_prints_requested_fields() {
    let dir = tempdir().unwrap();
    nexus(dir.path()).args(["set", "alpha-1", "status=\"up\""]).assert().success();
    nexus(dir.path()).args(["set", "alpha-2", "status=\"down\""]).assert().success();
    nexus(dir.path()).args(["set", "beta-1", "status=\"up\""]).assert().success();

    nexus(dir.path())
        .args(["find", "alpha-", "status=\"up\"", "status"])
        .assert()
        .success()
        .stdout("alpha-1\tup\n");
}

#[test]
fn two_devices_on_one_directory_merge_on_read() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("nexus")
        .unwrap()
        .arg(dir.path())
        .args(["--device", "deva", "set", "1", "foo=\"a\""])
        .assert()
        .success();
    Command::cargo_bin("nexus")
        .unwrap()
        .arg(dir.path())
        .args(["--device", "devb", "set", "1", "bar=\"b\""])
        .assert()
        .success();

    Command::cargo_bin("nexus")
        .unwrap()
        .arg(dir.path())
        .args(["--device", "deva", "get", "1"])
        .assert()
        .success()
        .stdout("foo = a\nbar = b\n");
}
