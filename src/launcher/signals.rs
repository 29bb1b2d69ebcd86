//! SIGINT/SIGTERM forwarding to a delegated child (lock-free handler, polled).
//!
//! Handlers are registered while at least one `SignalForwarder` is alive and
//! the previous dispositions are restored when the last one is dropped.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

const FORWARDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

/// Delivery count per forwarded signal, bumped from the handler
static RECEIVED: [AtomicUsize; 2] = [AtomicUsize::new(0), AtomicUsize::new(0)];

struct Registration {
    users: usize,
    previous: Vec<(Signal, SigAction)>,
}

static REGISTRATION: Mutex<Registration> = Mutex::new(Registration {
    users: 0,
    previous: Vec::new(),
});

extern "C" fn record(sig: i32) {
    for (i, forwarded) in FORWARDED.iter().enumerate() {
        if *forwarded as i32 == sig {
            RECEIVED[i].fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn restore(previous: &mut Vec<(Signal, SigAction)>) {
    for (sig, action) in previous.drain(..) {
        // SAFETY: reinstating the disposition that was active before ours
        if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
            warn!("Failed to restore {sig} handler: {e}");
        }
    }
}

/// Registration guard; forwards signals received since it was created
pub struct SignalForwarder {
    seen: [usize; 2],
}

impl SignalForwarder {
    pub fn install() -> nix::Result<Self> {
        let mut reg = match REGISTRATION.lock() {
            Ok(reg) => reg,
            Err(poisoned) => poisoned.into_inner(),
        };

        if reg.users == 0 {
            let action = SigAction::new(
                SigHandler::Handler(record),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );
            for sig in FORWARDED {
                // SAFETY: the handler only touches atomics
                match unsafe { signal::sigaction(sig, &action) } {
                    Ok(previous) => reg.previous.push((sig, previous)),
                    Err(e) => {
                        restore(&mut reg.previous);
                        return Err(e);
                    }
                }
            }
            debug!("Signal forwarding registered");
        }
        reg.users += 1;

        Ok(Self {
            seen: [
                RECEIVED[0].load(Ordering::SeqCst),
                RECEIVED[1].load(Ordering::SeqCst),
            ],
        })
    }

    /// Signals delivered since the last call, once each
    pub fn take_pending(&mut self) -> Vec<Signal> {
        let mut pending = Vec::new();
        for (i, sig) in FORWARDED.iter().enumerate() {
            let count = RECEIVED[i].load(Ordering::SeqCst);
            if count != self.seen[i] {
                self.seen[i] = count;
                pending.push(*sig);
            }
        }
        pending
    }

    /// Relay pending signals to `pid`
    pub fn forward_to(&mut self, pid: u32) {
        let Ok(raw) = i32::try_from(pid) else {
            return;
        };
        for sig in self.take_pending() {
            debug!("Forwarding {sig} to child {pid}");
            match signal::kill(Pid::from_raw(raw), sig) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to forward {sig} to child {pid}: {e}"),
            }
        }
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        let mut reg = match REGISTRATION.lock() {
            Ok(reg) => reg,
            Err(poisoned) => poisoned.into_inner(),
        };
        reg.users = reg.users.saturating_sub(1);
        if reg.users == 0 {
            restore(&mut reg.previous);
            debug!("Signal forwarding deregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_signals_after_install() {
        record(Signal::SIGTERM as i32);
        let mut forwarder = SignalForwarder::install().unwrap();
        assert!(forwarder.take_pending().is_empty());

        record(Signal::SIGINT as i32);
        record(Signal::SIGINT as i32);
        assert_eq!(forwarder.take_pending(), vec![Signal::SIGINT]);
        assert!(forwarder.take_pending().is_empty());

        record(Signal::SIGHUP as i32);
        assert!(forwarder.take_pending().is_empty());
    }
}
