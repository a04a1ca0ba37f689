//! Opportunity collection and result sinks.
//!
//! This module handles:
//! - The owned, per-run [`OpportunityCollector`]
//! - The [`ResultSink`] seam each discovery is fanned out to
//! - Report files, log notifications and the audible alert
//! - An in-memory sink for testing

pub mod notify;
pub mod report;

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::arbitrage::ArbitrageOpportunity;
use crate::error::SinkError;

pub use notify::{AlertNotifier, LogNotifier};
pub use report::{load_opportunities, render_html, ReportWriter};

/// Receives every discovery together with the run's full result list.
pub trait ResultSink: Send {
    /// Called after `latest` was appended to `all`. `suppress` is set during
    /// re-verification, when the opportunity was already announced.
    fn publish(
        &mut self,
        latest: &ArbitrageOpportunity,
        all: &[ArbitrageOpportunity],
        suppress: bool,
    ) -> Result<(), SinkError>;

    /// Called when the accumulated list is cleared.
    fn cleared(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Accumulates the opportunities of one run and forwards each to its sinks.
#[derive(Default)]
pub struct OpportunityCollector {
    opportunities: Vec<ArbitrageOpportunity>,
    sinks: Vec<Box<dyn ResultSink>>,
}

impl std::fmt::Debug for OpportunityCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpportunityCollector")
            .field("opportunities", &self.opportunities.len())
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl OpportunityCollector {
    /// Create a collector with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Append an opportunity and publish it. Sink failures are logged and
    /// never lose the opportunity.
    pub fn record(&mut self, opportunity: ArbitrageOpportunity, suppress: bool) {
        self.opportunities.push(opportunity);
        let all = self.opportunities.as_slice();
        let Some(latest) = all.last() else {
            return;
        };

        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(latest, all, suppress) {
                warn!(sink = sink.name(), error = %e, "Result sink failed");
            }
        }
    }

    /// Seed the collector with previously found opportunities without
    /// publishing them.
    pub fn restore(&mut self, opportunities: Vec<ArbitrageOpportunity>) {
        self.opportunities.extend(opportunities);
    }

    /// Clear the accumulated list and return the `(name, url)` of every
    /// entry, for re-verification.
    pub fn take_targets(&mut self) -> Vec<(String, String)> {
        let targets = self
            .opportunities
            .drain(..)
            .map(|o| (o.name, o.url))
            .collect();

        for sink in &mut self.sinks {
            if let Err(e) = sink.cleared() {
                warn!(sink = sink.name(), error = %e, "Result sink failed to clear");
            }
        }
        targets
    }

    /// Opportunities found so far, in discovery order.
    pub fn opportunities(&self) -> &[ArbitrageOpportunity] {
        &self.opportunities
    }

    /// Number of opportunities found so far.
    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    /// Whether nothing was found yet.
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}

/// One publish call seen by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Name of the opportunity published.
    pub name: String,
    /// Size of the full list at publish time.
    pub total: usize,
    /// Whether notification was suppressed.
    pub suppressed: bool,
}

/// Sink that records publications in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    publications: Arc<Mutex<Vec<Publication>>>,
    clears: Arc<Mutex<usize>>,
}

impl MemorySink {
    /// Create an empty sink; clones share the same log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publications seen so far.
    pub fn publications(&self) -> Vec<Publication> {
        self.publications.lock().unwrap().clone()
    }

    /// Number of times the collector was cleared.
    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

impl ResultSink for MemorySink {
    fn publish(
        &mut self,
        latest: &ArbitrageOpportunity,
        all: &[ArbitrageOpportunity],
        suppress: bool,
    ) -> Result<(), SinkError> {
        self.publications.lock().unwrap().push(Publication {
            name: latest.name.clone(),
            total: all.len(),
            suppressed: suppress,
        });
        Ok(())
    }

    fn cleared(&mut self) -> Result<(), SinkError> {
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
