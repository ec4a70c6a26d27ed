//! Unbuffered handoff used for close notifications.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Creates a one-shot rendezvous between one notifier and one waiter.
///
/// The notifier is registered where the awaited state lives; whoever changes
/// that state takes it and calls [`Notifier::notify`]. Since each waiter owns
/// its receiver, a signal can never be taken by a different waiter.
pub(crate) fn rendezvous() -> (Notifier, Waiter) {
    let (tx, rx) = mpsc::sync_channel(0);
    (Notifier(tx), Waiter(rx))
}

pub(crate) struct Notifier(SyncSender<()>);

impl Notifier {
    /// Blocks until the waiter has taken the signal. Returns at once if the
    /// waiter is gone.
    pub(crate) fn notify(self) {
        let _ = self.0.send(());
    }
}

pub(crate) struct Waiter(Receiver<()>);

impl Waiter {
    /// Blocks until notified, or until the notifier is dropped unused.
    pub(crate) fn wait(self) {
        let _ = self.0.recv();
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn notify_blocks_until_received() {
        let (notifier, waiter) = rendezvous();
        let (done_tx, done_rx) = mpsc::channel();

        let sender = thread::spawn(move || {
            notifier.notify();
            done_tx.send(()).unwrap();
        });

        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        waiter.wait();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        sender.join().unwrap();
    }

    #[test]
    fn notify_without_waiter_returns() {
        let (notifier, waiter) = rendezvous();
        drop(waiter);
        notifier.notify();
    }

    #[test]
    fn dropped_notifier_releases_waiter() {
        let (notifier, waiter) = rendezvous();
        drop(notifier);
        waiter.wait();
    }

    #[test]
    fn each_waiter_gets_its_own_signal() {
        let (woke_tx, woke_rx) = mpsc::channel();
        let mut notifiers = Vec::new();
        let mut handles = Vec::new();

        for i in 0..3 {
            let (notifier, waiter) = rendezvous();
            notifiers.push(notifier);
            let woke_tx = woke_tx.clone();
            handles.push(thread::spawn(move || {
                waiter.wait();
                woke_tx.send(i).unwrap();
            }));
        }

        // Only the middle waiter is signalled.
        let second = notifiers.remove(1);
        second.notify();
        assert_eq!(woke_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert!(woke_rx.recv_timeout(Duration::from_millis(100)).is_err());

        for n in notifiers {
            n.notify();
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
