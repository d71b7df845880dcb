use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where the supervisor is in its restart cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Exited,
    Signaled,
}

/// Keeps one child task alive, restarting it after it exits.
///
/// The child gets its own cancellation token, a child of the shutdown token,
/// so shutdown reaches it directly. Once shutdown is observed the supervisor
/// never starts another child.
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    /// Pause between a child exiting and the next start
    pub restart_delay: Duration,
    /// How long a signaled child may take to wind down before it is aborted
    pub shutdown_grace: Duration,
}

impl Supervisor {
    pub fn new(restart_delay: Duration, shutdown_grace: Duration) -> Self {
        Self {
            restart_delay,
            shutdown_grace,
        }
    }

    /// Run `spawn_child` repeatedly until `shutdown` is cancelled.
    ///
    /// Each call receives the token the child must watch. Returns the number
    /// of children started.
    pub async fn run<F, Fut>(&self, mut spawn_child: F, shutdown: CancellationToken) -> usize
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut started = 0usize;
        let mut state = SupervisorState::Starting;

        loop {
            if shutdown.is_cancelled() {
                transition(&mut state, SupervisorState::Signaled);
                break;
            }

            let child_token = shutdown.child_token();
            let mut child = tokio::spawn(spawn_child(child_token.clone()));
            started += 1;
            transition(&mut state, SupervisorState::Running);
            tracing::info!(run = started, "Collector started");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    transition(&mut state, SupervisorState::Signaled);
                    child_token.cancel();
                    tracing::info!(grace = ?self.shutdown_grace, "Stopping collector");
                    match tokio::time::timeout(self.shutdown_grace, &mut child).await {
                        Ok(joined) => log_exit(joined),
                        Err(_) => {
                            tracing::warn!("Collector did not stop in time, aborting");
                            child.abort();
                        }
                    }
                    break;
                }
                joined = &mut child => {
                    transition(&mut state, SupervisorState::Exited);
                    log_exit(joined);
                }
            }

            tracing::info!(delay = ?self.restart_delay, "Restarting collector");
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    transition(&mut state, SupervisorState::Signaled);
                    tracing::info!("Shutdown during restart delay");
                    break;
                }
                _ = tokio::time::sleep(self.restart_delay) => {
                    transition(&mut state, SupervisorState::Starting);
                }
            }
        }

        tracing::info!(runs = started, "Supervisor stopped");
        started
    }
}

fn transition(state: &mut SupervisorState, next: SupervisorState) {
    tracing::debug!(from = ?*state, to = ?next, "Supervisor state");
    *state = next;
}

fn log_exit(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => tracing::info!("Collector exited"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Collector failed"),
        Err(e) if e.is_panic() => tracing::error!(error = %e, "Collector panicked"),
        Err(e) => tracing::warn!(error = %e, "Collector cancelled"),
    }
}
