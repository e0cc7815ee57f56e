use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::Future;
use snafu::ResultExt;

use super::store::{ChildSource, CounterStore};
use super::{CounterError, CounterManager, Recount, StoreUnavailableSnafu};

type QuitSignal = tokio::sync::oneshot::Receiver<Quit>;

#[derive(Debug, Clone, Copy)]
struct Quit;

/// A background task that can be asked to stop.
#[derive(Debug)]
pub struct SweepTask {
    tx: tokio::sync::oneshot::Sender<Quit>,
    handle: tokio::task::JoinHandle<()>,
}

impl SweepTask {
    fn spawn<F>(f: impl FnOnce(QuitSignal) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::task::spawn(f(rx));
        Self { tx, handle }
    }

    /// Stops the task and waits for the sweep in progress, if any, to finish.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Quit);
        let _ = self.handle.await;
    }
}

/// Periodically recounts every known subject of a set of counters, correcting whatever drift accumulated between
/// child writes and counter writes.
#[derive(Debug)]
pub struct Reconciler<S, C> {
    managers: Vec<Arc<CounterManager<S>>>,
    children: C,
}

impl<S, C> Reconciler<S, C>
where
    S: CounterStore + 'static,
    C: ChildSource + 'static,
{
    pub fn new(managers: Vec<Arc<CounterManager<S>>>, children: C) -> Self {
        Self { managers, children }
    }

    /// Recounts every subject that has either children or a counter record. Subjects that fail are logged and
    /// skipped, the corrected ones are returned.
    pub async fn sweep(&self) -> Vec<Recount> {
        let mut corrected = Vec::new();

        for manager in &self.managers {
            let subjects = match self.subjects(manager).await {
                Ok(subjects) => subjects,
                Err(error) => {
                    tracing::warn!(kind = %manager.kind(), %error, "could not list subjects to reconcile");
                    continue;
                }
            };

            tracing::debug!(kind = %manager.kind(), subjects = subjects.len(), "reconciling counters");

            for subject in subjects {
                match manager.recount(&subject, &self.children).await {
                    Ok(recount) if recount.drifted() => corrected.push(recount),
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(kind = %manager.kind(), %subject, %error, "could not reconcile counter")
                    }
                }
            }
        }

        corrected
    }

    async fn subjects(&self, manager: &CounterManager<S>) -> Result<BTreeSet<String>, CounterError> {
        let kind = manager.kind();
        let context = || StoreUnavailableSnafu {
            kind,
            subject: "*",
        };

        let mut subjects: BTreeSet<String> = manager
            .store()
            .subjects(kind)
            .await
            .with_context(|_| context())?
            .into_iter()
            .collect();

        subjects.extend(
            self.children
                .parents(kind)
                .await
                .with_context(|_| context())?,
        );

        Ok(subjects)
    }

    /// Runs [Reconciler::sweep] every `period`, starting one period from now. Ticks missed while a sweep is still
    /// running are skipped.
    pub fn spawn(self, period: Duration) -> SweepTask {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(period = %humantime::format_duration(period), "scheduled counter reconciliation");

        SweepTask::spawn(|mut quit| async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let corrected = self.sweep().await;
                        tracing::info!(corrected = corrected.len(), "counter reconciliation finished");
                    }
                    _ = &mut quit => break,
                }
            }
        })
    }
}
