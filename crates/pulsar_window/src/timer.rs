//! Redraw timer for future frame deadlines.
//!
//! One helper thread per window sleeps until the earliest requested deadline
//! and then calls the fire callback once. A new deadline replaces the
//! pending one, so a superseded deadline never fires.

use std::thread::JoinHandle;
use std::time::{Instant, SystemTime};

use crossbeam_channel::{select, Receiver, Sender};

pub(crate) struct AnimationTimer {
    tx: Sender<Option<SystemTime>>,
    thread: Option<JoinHandle<()>>,
}

impl AnimationTimer {
    pub(crate) fn spawn(fire: impl Fn() + Send + 'static) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let thread = std::thread::Builder::new()
            .name("pulsar-window-timer".into())
            .spawn(move || run(rx, fire))?;
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    /// Fire at `at`, replacing any pending deadline.
    pub(crate) fn schedule(&self, at: SystemTime) {
        let _ = self.tx.send(Some(at));
    }

    pub(crate) fn stop(&self) {
        let _ = self.tx.send(None);
    }
}

impl Drop for AnimationTimer {
    fn drop(&mut self) {
        // Closing the channel ends the thread.
        let (tx, _) = crossbeam_channel::bounded(0);
        drop(std::mem::replace(&mut self.tx, tx));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(rx: Receiver<Option<SystemTime>>, fire: impl Fn()) {
    let mut deadline: Option<Instant> = None;
    loop {
        let timeout = match deadline {
            Some(d) => crossbeam_channel::at(d),
            None => crossbeam_channel::never(),
        };
        select! {
            recv(rx) -> msg => match msg {
                Ok(at) => deadline = at.map(to_instant),
                Err(_) => return,
            },
            recv(timeout) -> _ => {
                deadline = None;
                fire();
            }
        }
    }
}

/// Map a wall-clock deadline onto the monotonic clock. Past deadlines map
/// to now.
fn to_instant(at: SystemTime) -> Instant {
    let now = Instant::now();
    match at.duration_since(SystemTime::now()) {
        Ok(d) => now + d,
        Err(_) => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_at_deadline() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let timer = AnimationTimer::spawn(move || {
            let _ = tx.send(());
        })
        .unwrap();
        timer.schedule(SystemTime::now() + Duration::from_millis(10));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_replaced_deadline_does_not_fire() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let timer = AnimationTimer::spawn(move || {
            let _ = tx.send(Instant::now());
        })
        .unwrap();
        timer.schedule(SystemTime::now() + Duration::from_millis(20));
        timer.stop();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        timer.schedule(SystemTime::UNIX_EPOCH);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
