//! Delegation to the installed binary: arguments, environment, exit codes

#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kirha_mcp_launcher::launcher::{resolve_binary_for, run_binary};
use kirha_mcp_launcher::{Arch, LauncherConfig, LauncherError, Os, PlatformKey};

// Writing a script while another test thread forks can make exec fail with
// ETXTBSY, so script creation and execution are serialized.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> std::sync::MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

#[test]
fn forwards_arguments_verbatim_and_in_order() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("argv.txt");
    let bin = script(dir.path(), "echo-args", r#"out="$1"; shift; printf '%s\n' "$@" > "$out""#);

    let code = run_binary(
        &bin,
        &args(&[out.to_str().unwrap(), "install", "--client", "claude", "with space", ""]),
    )
    .unwrap();

    assert_eq!(code, 0);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "install\n--client\nclaude\nwith space\n\n"
    );
}

#[test]
fn child_exit_code_is_passed_through() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    for code in [0, 1, 7, 255] {
        let bin = script(dir.path(), &format!("exit-{code}"), &format!("exit {code}"));
        assert_eq!(run_binary(&bin, &[]).unwrap(), code);
    }
}

#[test]
fn environment_is_inherited() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    // SAFETY: no other test reads or writes this variable
    unsafe { std::env::set_var("KIRHA_LAUNCHER_TEST_MARKER", "inherited") };
    let bin = script(
        dir.path(),
        "check-env",
        r#"[ "$KIRHA_LAUNCHER_TEST_MARKER" = "inherited" ] && exit 0 || exit 9"#,
    );
    assert_eq!(run_binary(&bin, &[]).unwrap(), 0);
}

#[test]
fn signal_death_maps_to_shell_convention() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let bin = script(dir.path(), "self-term", "kill -TERM $$\nsleep 5");
    assert_eq!(run_binary(&bin, &[]).unwrap(), 128 + 15);
}

#[test]
fn non_executable_binary_is_a_spawn_error() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-executable");
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let err = run_binary(&path, &[]).unwrap_err();
    assert!(matches!(err, LauncherError::Spawn { .. }), "{err:?}");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_binary_names_path_and_platform() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = LauncherConfig {
        install_dir: Some(dir.path().to_path_buf()),
        ..LauncherConfig::default()
    };
    let platform = PlatformKey::new(Os::Darwin, Arch::Arm64);

    match resolve_binary_for(&cfg, &platform) {
        Err(LauncherError::BinaryNotFound { path, platform }) => {
            assert_eq!(path, dir.path().join("kirha-mcp-installer-darwin-arm64"));
            assert_eq!(platform, "darwin/arm64");
        }
        other => panic!("expected BinaryNotFound, got {other:?}"),
    }
}

#[test]
fn resolves_installed_binary_from_the_same_layout_as_the_installer() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = LauncherConfig {
        install_dir: Some(dir.path().to_path_buf()),
        ..LauncherConfig::default()
    };
    let platform = PlatformKey::new(Os::Linux, Arch::Amd64);
    let layout = kirha_mcp_launcher::install::InstallLayout::from_config(&cfg, &platform);
    std::fs::write(&layout.binary, b"bin").unwrap();

    assert_eq!(resolve_binary_for(&cfg, &platform).unwrap(), layout.binary);
}
