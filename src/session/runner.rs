use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::actuator::Transport;
use crate::persist::NvStore;

use super::error::SessionError;
use super::handle::SessionHandle;

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<u64>,
}

/// Drives [`SessionHandle::tick_now`] on a fixed period from a background task.
pub struct SessionRunner<T, S> {
    handle: SessionHandle<T, S>,
    period: Duration,
    worker: Option<WorkerHandle>,
}

impl<T, S> SessionRunner<T, S>
where
    T: Transport + 'static,
    S: NvStore + 'static,
{
    pub fn new(handle: SessionHandle<T, S>, period: Duration) -> Self {
        Self {
            handle,
            period,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let handle = self.handle.clone();
        let period = self.period;
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_session_loop(handle, period, stop_rx));
        self.worker = Some(WorkerHandle { stop_tx, join });
        info!("Session loop started, period {:?}", period);
        Ok(())
    }

    /// Stops the loop and returns how many ticks it ran.
    pub async fn stop(&mut self) -> u64 {
        let Some(worker) = self.worker.take() else {
            return 0;
        };
        let _ = worker.stop_tx.send(());
        match worker.join.await {
            Ok(ticks) => {
                info!("Session loop stopped after {} ticks", ticks);
                ticks
            }
            Err(e) => {
                error!("Session loop task failed: {}", e);
                0
            }
        }
    }
}

async fn run_session_loop<T, S>(
    handle: SessionHandle<T, S>,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> u64
where
    T: Transport + 'static,
    S: NvStore + 'static,
{
    let mut ticks = 0u64;
    let mut next = Instant::now();

    loop {
        // Bus calls sleep between retries, so the tick runs off the async workers.
        let tick_handle = handle.clone();
        match tokio::task::spawn_blocking(move || tick_handle.tick_now()).await {
            Ok(report) => {
                ticks += 1;
                if report.saved.is_some() {
                    debug!("Tick {}: {:?}", ticks, report);
                }
            }
            Err(e) => error!("Tick panicked: {}", e),
        }

        next += period;
        let now = Instant::now();
        if next < now {
            next = now;
        }

        let should_stop = tokio::select! {
            _ = sleep_until(next) => false,
            _ = &mut stop_rx => true,
        };
        if should_stop {
            return ticks;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::actuator::{Actuator, ActuatorSettings, AxisSpec, SimulatedTransport};
    use crate::bus::SharedBus;
    use crate::catalog::TleCache;
    use crate::clock::{Clock, ManualClock};
    use crate::persist::{FlashFile, MemoryNvStore, PersistManager};
    use crate::session::{Mode, SessionController, SessionSettings};

    fn handle(dir: &std::path::Path) -> SessionHandle<SimulatedTransport, MemoryNvStore> {
        let bus = SharedBus::new(SimulatedTransport::default().with_motor(1, 0.0).with_motor(2, 0.0));
        let axis = |motor_id| AxisSpec {
            motor_id,
            gear_ratio: 1.0,
            velocity_limit: 2,
        };
        let settings = ActuatorSettings::default();
        let persist = PersistManager::new(
            Some(SharedBus::new(MemoryNvStore::new(236))),
            FlashFile::new(dir.join("state.json")),
        );
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_unix(1_700_000_000));
        SessionHandle::new(SessionController::new(
            Actuator::connect("aov", bus.clone(), axis(2), settings),
            Actuator::connect("eqx", bus, axis(1), settings),
            persist,
            TleCache::open(dir.join("tle.json")),
            clock,
            SessionSettings::default(),
        ))
    }

    #[tokio::test]
    async fn loop_ticks_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let handle = handle(dir.path());
        handle.enter_orbit().unwrap();

        let mut runner = SessionRunner::new(handle.clone(), Duration::from_millis(5));
        runner.start().unwrap();
        assert!(matches!(runner.start(), Err(SessionError::AlreadyRunning)));
        assert!(runner.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let ticks = runner.stop().await;
        assert!(ticks >= 1);
        assert!(!runner.is_running());
        assert_eq!(handle.mode(), Mode::Orbit);
        assert_eq!(runner.stop().await, 0);
    }
}
