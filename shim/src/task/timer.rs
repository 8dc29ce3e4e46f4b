//! Timer tasks (§4.6). Each entry in the arrangement's `timeout_tasks` list
//! becomes one `ArmedTimer`; the reactor always waits on the earliest of
//! these alongside the listener, the peer socket, and client connections.

use crate::arrangement::{Arrangement, HandlerResult, TimeoutTask};
use std::time::{Duration, Instant};

pub struct ArmedTimer<A: Arrangement> {
    task: TimeoutTask<A>,
    wake_at: Instant,
}

impl<A: Arrangement> ArmedTimer<A> {
    /// Arms a newly-created timer at `interval(me, initial_state)` past now
    /// (§4.6).
    pub fn new(task: TimeoutTask<A>, me: &A::Name, initial_state: &A::State) -> Self {
        let delay = (task.interval)(me, initial_state);
        let wake_at = Instant::now() + duration_from_secs(delay);
        Self { task, wake_at }
    }

    pub fn name(&self) -> &'static str {
        self.task.name
    }

    pub fn wake_at(&self) -> Instant {
        self.wake_at
    }

    /// Fires the handler and re-arms against the interval function applied
    /// to the *post*-dispatch state (§4.6 step 2, §8 invariant 5).
    pub fn fire(&mut self, me: &A::Name, state: A::State) -> HandlerResult<A> {
        let result = (self.task.handler)(me, state);
        let delay = (self.task.interval)(me, &result.state);
        self.wake_at = Instant::now() + duration_from_secs(delay);
        result
    }
}

fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO)
}
