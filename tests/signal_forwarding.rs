//! SIGINT sent to the launcher reaches the child; the launcher outlives it

#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::getpid;

use kirha_mcp_launcher::launcher::run_binary;

#[test]
fn interrupt_is_forwarded_and_exit_code_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let ready = dir.path().join("ready");
    let bin = dir.path().join("interruptible");
    std::fs::write(
        &bin,
        "#!/bin/sh\ntrap 'sleep 0.3; exit 42' INT\ntouch \"$1\"\nwhile :; do sleep 0.05; done\n",
    )
    .unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

    let arg = OsString::from(ready.as_os_str());
    let launcher = std::thread::spawn(move || run_binary(&bin, &[arg]));

    // The forwarding handler is registered before the child starts
    let deadline = Instant::now() + Duration::from_secs(10);
    while !ready.exists() {
        assert!(Instant::now() < deadline, "child never became ready");
        std::thread::sleep(Duration::from_millis(10));
    }

    let sent = Instant::now();
    kill(getpid(), Signal::SIGINT).unwrap();
    let code = launcher.join().unwrap().unwrap();

    assert_eq!(code, 42);
    assert!(
        sent.elapsed() >= Duration::from_millis(300),
        "launcher returned before the child finished its trap"
    );
}
