//! Log and audible notifications for new opportunities.

use std::io::Write;

use tracing::info;

use super::ResultSink;
use crate::arbitrage::ArbitrageOpportunity;
use crate::error::SinkError;

const RULE: &str = "#------------------------------------------------------------------";

/// Logs each new opportunity with its betting instructions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ResultSink for LogNotifier {
    fn publish(
        &mut self,
        latest: &ArbitrageOpportunity,
        _all: &[ArbitrageOpportunity],
        suppress: bool,
    ) -> Result<(), SinkError> {
        if suppress {
            return Ok(());
        }

        info!("{}", RULE);
        info!("ARBITRAGE OPPORTUNITY OF {} FOUND!", latest.profit);
        info!("GAME: {}", latest.game());
        info!("MARKET: {}", latest.market());
        info!("LINK: {}", latest.url);
        info!("{}", RULE);
        for instruction in &latest.instructions {
            info!("{}", instruction);
        }
        info!("{}", RULE);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Rings the terminal bell for each new opportunity.
#[derive(Debug)]
pub struct AlertNotifier<W: Write + Send = std::io::Stderr> {
    out: W,
    alerts: usize,
}

impl AlertNotifier {
    /// Ring the bell on stderr.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> AlertNotifier<W> {
    /// Ring the bell on `out`.
    pub fn new(out: W) -> Self {
        Self { out, alerts: 0 }
    }

    /// Number of alerts raised.
    pub fn alerts(&self) -> usize {
        self.alerts
    }

    /// Consume the notifier, returning its writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ResultSink for AlertNotifier<W> {
    fn publish(
        &mut self,
        latest: &ArbitrageOpportunity,
        _all: &[ArbitrageOpportunity],
        suppress: bool,
    ) -> Result<(), SinkError> {
        if suppress {
            return Ok(());
        }

        self.out
            .write_all(b"\x07")
            .and_then(|_| self.out.flush())
            .map_err(|source| SinkError::Io {
                path: format!("alert for {}", latest.url),
                source,
            })?;
        self.alerts += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "alert"
    }
}
