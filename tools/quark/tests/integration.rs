//! Integration tests for the quark binary.
//!
//! These tests invoke the quark binary as a subprocess against a minimal
//! fixture board. They are marked `#[ignore]` because they require the
//! quark binary to be pre-built.
//!
//! Run with: `cargo test --test integration -- --ignored`

use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Locate the compiled quark binary.
///
/// `cargo test` places the test binary under `target/debug/deps/`. The main
/// binary lives one level up at `target/debug/quark`.
fn quark_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("could not determine test binary path");
    // Go up from deps/ directory to debug/.
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("quark");
    path
}

/// Path to the minimal fixture board.
fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/minimal")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn generates_header_and_conf() {
    let fixture = fixture_dir();
    let out = TempDir::new().expect("failed to create output directory");
    let header = out.path().join("generated_dts_board.h");
    let conf = out.path().join("generated_dts_board.conf");

    let output = Command::new(quark_binary())
        .arg("-d")
        .arg(fixture.join("board.dts"))
        .arg("-y")
        .arg(fixture.join("bindings"))
        .arg("-i")
        .arg(&header)
        .arg("-k")
        .arg(&conf)
        .output()
        .expect("failed to execute quark");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "quark failed (exit={:?}):\nstdout:\n{stdout}\nstderr:\n{stderr}",
        output.status.code(),
    );

    let header_text = std::fs::read_to_string(&header).expect("header was not written");
    assert!(header_text.starts_with("/*\n * Generated by the quark devicetree processor."));
    assert!(header_text.contains("#ifndef GENERATED_DTS_DEFINES_H"));
    assert!(header_text.contains("#define DT_VND_SERIAL_40011000_BASE_ADDRESS"));
    assert!(header_text.ends_with("#endif\n"));

    let conf_text = std::fs::read_to_string(&conf).expect("conf was not written");
    assert!(conf_text.contains("DT_VND_SERIAL_40011000_BASE_ADDRESS=0x40011000\n"));
    assert!(conf_text.contains("DT_UART_CONSOLE_ON_DEV_NAME=\"UART_0\"\n"));
}

#[test]
#[ignore]
fn old_alias_names_emits_deprecated_labels() {
    let fixture = fixture_dir();
    let out = TempDir::new().expect("failed to create output directory");
    let header = out.path().join("generated_dts_board.h");

    let output = Command::new(quark_binary())
        .arg("-d")
        .arg(fixture.join("board.dts"))
        .arg("-y")
        .arg(fixture.join("bindings"))
        .arg("-i")
        .arg(&header)
        .arg("--old-alias-names")
        .output()
        .expect("failed to execute quark");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "quark failed (exit={:?}):\nstdout:\n{stdout}\nstderr:\n{stderr}",
        output.status.code(),
    );

    let header_text = std::fs::read_to_string(&header).expect("header was not written");
    assert!(
        header_text.contains("#define CON_BASE_ADDRESS"),
        "bare alias label missing from header:\n{header_text}",
    );
    assert!(header_text.contains("__DEPRECATED_MACRO"));
}

#[test]
#[ignore]
fn missing_source_file_fails() {
    let fixture = fixture_dir();
    let output = Command::new(quark_binary())
        .arg("-d")
        .arg(fixture.join("no-such-board.dts"))
        .arg("-y")
        .arg(fixture.join("bindings"))
        .output()
        .expect("failed to execute quark");

    assert!(
        !output.status.success(),
        "quark with a missing source file should have failed but exited with {:?}",
        output.status.code(),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no-such-board.dts"),
        "error does not name the missing file:\nstderr:\n{stderr}",
    );
}

#[test]
#[ignore]
fn missing_bindings_directory_fails() {
    let fixture = fixture_dir();
    let output = Command::new(quark_binary())
        .arg("-d")
        .arg(fixture.join("board.dts"))
        .arg("-y")
        .arg(fixture.join("no-such-bindings"))
        .output()
        .expect("failed to execute quark");

    assert!(
        !output.status.success(),
        "quark with an empty binding search path should have failed but exited with {:?}",
        output.status.code(),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no bindings resolved"),
        "error does not mention binding resolution:\nstderr:\n{stderr}",
    );
}
