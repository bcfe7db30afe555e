use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Timer-reset debounce: every `restart` pushes the deadline out by the
/// full quiet period.
#[derive(Debug)]
pub struct Debounce {
    quiet_period: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            deadline: None,
        }
    }

    pub fn restart(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet_period);
    }

    /// Disarms the timer, returning whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the current deadline passes; never resolves if disarmed.
    /// The returned future does not borrow `self`, so it can sit in a
    /// `select!` next to branches that restart the timer.
    pub fn expiry(&self) -> impl Future<Output = ()> + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        }
    }
}
