use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use tracing::{debug, error, info, warn};

use crate::alert::{AlertDispatcher, MailTransport};
use crate::config::MonitorConfig;
use crate::models::{AlertEvent, HistoryRow, ProbeOutcome};
use crate::probe::Prober;
use crate::store::{partition_collisions, sanitize, HistoryLog};

/// Wall clock that never repeats or goes backwards within one run.
#[derive(Debug, Default)]
pub struct RunClock {
    last: Option<DateTime<Local>>,
}

impl RunClock {
    pub fn tick(&mut self) -> DateTime<Local> {
        self.advance(Local::now())
    }

    fn advance(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        let ts = match self.last {
            Some(last) if now <= last => last + ChronoDuration::microseconds(1),
            _ => now,
        };
        self.last = Some(ts);
        ts
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub up: usize,
    pub down: usize,
    pub alerts_sent: usize,
    pub store_failures: usize,
}

impl RunSummary {
    pub fn all_up(&self) -> bool {
        self.down == 0
    }
}

/// One pass over every configured target: probe, record, alert if down.
pub struct Monitor<'a, L, T> {
    config: &'a MonitorConfig,
    prober: Prober,
    history: L,
    dispatcher: AlertDispatcher<T>,
    clock: RunClock,
}

impl<'a, L: HistoryLog, T: MailTransport> Monitor<'a, L, T> {
    pub fn new(config: &'a MonitorConfig, history: L, transport: T) -> Result<Self> {
        let prober = Prober::new(&config.proxy, config.timeout)
            .context("Failed to create HTTP client")?;
        Ok(Self {
            config,
            prober,
            history,
            dispatcher: AlertDispatcher::new(config.alerts.clone(), transport),
            clock: RunClock::default(),
        })
    }

    #[cfg(test)]
    pub fn history(&self) -> &L {
        &self.history
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &AlertDispatcher<T> {
        &self.dispatcher
    }

    pub async fn run(&mut self) -> RunSummary {
        for (key, targets) in partition_collisions(&self.config.websites) {
            warn!(
                "Targets {:?} share history partition {:?}; their rows will be merged",
                targets, key
            );
        }

        let mut summary = RunSummary::default();
        let config = self.config;
        for target in &config.websites {
            let outcome = self.check(target).await;
            summary.checked += 1;

            if !self.record(&outcome) {
                summary.store_failures += 1;
            }

            if outcome.is_down() {
                summary.down += 1;
                let event = AlertEvent::proxy_down(&config.proxy.to_string(), &outcome);
                if self.dispatcher.notify(&event).await.is_some() {
                    summary.alerts_sent += 1;
                }
            } else {
                summary.up += 1;
            }
        }

        info!(
            "Run complete: {} checked, {} up, {} down, {} alerts sent",
            summary.checked, summary.up, summary.down, summary.alerts_sent
        );
        summary
    }

    async fn check(&mut self, target: &str) -> ProbeOutcome {
        println!("Checking {} through proxy {}...", target, self.config.proxy.host);
        let result = self.prober.probe(target).await;
        let timestamp = self.clock.tick();
        match result {
            Ok(elapsed) => {
                println!(
                    "Successfully connected to {}. Download time: {:.4} seconds.",
                    target,
                    elapsed.as_secs_f64()
                );
                ProbeOutcome::up(target, timestamp, elapsed)
            }
            Err(e) => {
                warn!("Error connecting to {} via proxy: {}", target, e);
                println!("Failed to connect to {} through the proxy.", target);
                ProbeOutcome::down(target, timestamp)
            }
        }
    }

    fn record(&self, outcome: &ProbeOutcome) -> bool {
        let key = sanitize(outcome.target());
        match self.history.append(&key, HistoryRow::from(outcome)) {
            Ok(()) => {
                debug!("Recorded {} for {} in partition {}", outcome.status(), outcome.target(), key);
                true
            }
            Err(e) => {
                error!("Error writing to history for {}: {}", outcome.target(), e);
                false
            }
        }
    }
}
