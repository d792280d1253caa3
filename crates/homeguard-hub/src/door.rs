//! Door actuator controller.
//!
//! A two-state machine driving the latch servo. Every unlock arms a single
//! relock deadline; a later unlock moves that deadline instead of adding a
//! second one, so at most one relock is ever pending.
//!
//! ```text
//!              unlock()              unlock() (deadline moves)
//!   Locked ──────────────► Unlocked ◄───────┐
//!     ▲                      │   └──────────┘
//!     └──────────────────────┘
//!      lock() or deadline reached
//! ```
//!
//! The controller owns no task and no timer. The control loop calls
//! [`DoorController::poll_relock`] every tick and wraps every wait that could
//! outlast the window in [`DoorController::relock_while`], which closes the
//! door at the deadline even while something else is in flight.

use homeguard_hardware::{DoorActuator, Result, ServoPosition};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Delay before retrying a relock the servo refused.
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Logical state of the door latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorState {
    Locked,
    Unlocked,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorState::Locked => write!(f, "LOCKED"),
            DoorState::Unlocked => write!(f, "UNLOCKED"),
        }
    }
}

/// Door state machine with a single pending-relock slot.
///
/// # Examples
///
/// ```
/// use homeguard_hardware::mock::MockDoor;
/// use homeguard_hub::door::{DoorController, DoorState};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> homeguard_hardware::Result<()> {
/// let (mut servo, _handle) = MockDoor::new();
/// let mut door = DoorController::new(Duration::from_secs(3));
///
/// door.unlock(&mut servo).await?;
/// assert_eq!(door.state(), DoorState::Unlocked);
/// assert!(door.relock_deadline().is_some());
///
/// door.lock(&mut servo).await?;
/// assert!(door.is_locked());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DoorController {
    state: DoorState,
    unlock_duration: Duration,
    relock_at: Option<Instant>,
}

impl DoorController {
    /// Create a controller in the `Locked` state.
    #[must_use]
    pub fn new(unlock_duration: Duration) -> Self {
        Self {
            state: DoorState::Locked,
            unlock_duration,
            relock_at: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> DoorState {
        self.state
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state == DoorState::Locked
    }

    /// When the pending relock fires, if one is armed.
    #[must_use]
    pub fn relock_deadline(&self) -> Option<Instant> {
        self.relock_at
    }

    #[must_use]
    pub fn unlock_duration(&self) -> Duration {
        self.unlock_duration
    }

    /// Open the latch and (re)arm the relock deadline.
    ///
    /// A pending deadline is replaced, never stacked.
    ///
    /// # Errors
    /// Returns the servo error; the controller state is unchanged.
    pub async fn unlock<D: DoorActuator>(&mut self, actuator: &mut D) -> Result<Instant> {
        actuator.set_position(ServoPosition::Open).await?;

        let deadline = Instant::now() + self.unlock_duration;
        if self.relock_at.replace(deadline).is_some() {
            debug!("Pending relock superseded by new unlock");
        }
        self.state = DoorState::Unlocked;
        info!(
            relock_in_ms = u64::try_from(self.unlock_duration.as_millis()).unwrap_or(u64::MAX),
            "Door unlocked"
        );
        Ok(deadline)
    }

    /// Close the latch and clear any pending relock.
    ///
    /// # Errors
    /// Returns the servo error. The relock slot is re-armed a short moment
    /// ahead so the next poll tries again.
    pub async fn lock<D: DoorActuator>(&mut self, actuator: &mut D) -> Result<()> {
        match actuator.set_position(ServoPosition::Closed).await {
            Ok(()) => {
                self.relock_at = None;
                if self.state == DoorState::Unlocked {
                    info!("Door locked");
                }
                self.state = DoorState::Locked;
                Ok(())
            }
            Err(e) => {
                self.relock_at = Some(Instant::now() + LOCK_RETRY_DELAY);
                Err(e)
            }
        }
    }

    /// Lock if the relock deadline has passed.
    ///
    /// Returns `true` if the door was locked by this call.
    ///
    /// # Errors
    /// Returns the servo error from the relock attempt.
    pub async fn poll_relock<D: DoorActuator>(&mut self, actuator: &mut D) -> Result<bool> {
        match self.relock_at {
            Some(deadline) if Instant::now() >= deadline => {
                self.lock(actuator).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Drive `future` to completion, relocking at the deadline if it falls
    /// while the future is still pending.
    pub async fn relock_while<D, F>(&mut self, actuator: &mut D, future: F) -> F::Output
    where
        D: DoorActuator,
        F: Future,
    {
        tokio::pin!(future);
        loop {
            let deadline = self.relock_at;
            tokio::select! {
                biased;
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Err(e) = self.lock(actuator).await {
                        warn!(error = %e, "Relock failed, retrying");
                    }
                }
                output = &mut future => return output,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeguard_hardware::mock::MockDoor;
    use tokio::time::{advance, sleep};

    const WINDOW: Duration = Duration::from_secs(3);

    fn closes(history: &[(ServoPosition, Instant)]) -> Vec<Instant> {
        history
            .iter()
            .filter(|(position, _)| *position == ServoPosition::Closed)
            .map(|(_, at)| *at)
            .collect()
    }

    #[test]
    fn test_initial_state_is_locked() {
        let door = DoorController::new(WINDOW);
        assert_eq!(door.state(), DoorState::Locked);
        assert!(door.relock_deadline().is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DoorState::Locked.to_string(), "LOCKED");
        assert_eq!(DoorState::Unlocked.to_string(), "UNLOCKED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_relock_after_window() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);

        door.unlock(&mut servo).await.unwrap();
        assert_eq!(handle.position(), ServoPosition::Open);

        advance(WINDOW - Duration::from_millis(1)).await;
        assert!(!door.poll_relock(&mut servo).await.unwrap());
        assert!(!door.is_locked());

        advance(Duration::from_millis(1)).await;
        assert!(door.poll_relock(&mut servo).await.unwrap());
        assert!(door.is_locked());
        assert_eq!(handle.position(), ServoPosition::Closed);
        assert!(door.relock_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_unlock_supersedes_deadline() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);

        let first = door.unlock(&mut servo).await.unwrap();
        advance(Duration::from_secs(2)).await;
        let second = door.unlock(&mut servo).await.unwrap();
        assert_eq!(second - first, Duration::from_secs(2));
        assert_eq!(door.relock_deadline(), Some(second));

        // The first deadline passes without effect.
        advance(Duration::from_millis(1500)).await;
        assert!(!door.poll_relock(&mut servo).await.unwrap());

        advance(Duration::from_millis(1500)).await;
        assert!(door.poll_relock(&mut servo).await.unwrap());
        assert_eq!(closes(&handle.history()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relock_while_closes_at_deadline() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);

        door.unlock(&mut servo).await.unwrap();
        let value = door
            .relock_while(&mut servo, async {
                sleep(Duration::from_secs(10)).await;
                7
            })
            .await;

        assert_eq!(value, 7);
        assert!(door.is_locked());

        let history = handle.history();
        let opened = history[0].1;
        assert_eq!(closes(&history), vec![opened + WINDOW]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relock_while_without_deadline_just_waits() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);

        door.relock_while(&mut servo, sleep(Duration::from_secs(1)))
            .await;
        assert!(handle.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lock_is_retried() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);
        door.unlock(&mut servo).await.unwrap();

        handle.set_failing(true);
        advance(WINDOW).await;
        assert!(door.poll_relock(&mut servo).await.is_err());
        assert!(!door.is_locked());
        let retry = door.relock_deadline().unwrap();
        assert_eq!(retry - Instant::now(), LOCK_RETRY_DELAY);

        handle.set_failing(false);
        advance(LOCK_RETRY_DELAY).await;
        assert!(door.poll_relock(&mut servo).await.unwrap());
        assert!(door.is_locked());
    }

    #[tokio::test]
    async fn test_failed_unlock_keeps_door_locked() {
        let (mut servo, handle) = MockDoor::new();
        let mut door = DoorController::new(WINDOW);
        handle.set_failing(true);

        assert!(door.unlock(&mut servo).await.is_err());
        assert!(door.is_locked());
        assert!(door.relock_deadline().is_none());
    }
}
