//! Observational trace of a solve call.
//!
//! The engine reports canonical forms, order detector outcomes, isolated right-hand sides,
//! per-order derivative values and residual checks to an injected `TraceSink`. Sinks never
//! influence results.
use log::debug;
use std::sync::Mutex;
use strum_macros::{Display, EnumIter};

/// Stages of the layered order detector, first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum DetectionStage {
    StructuralScan,
    PresenceSweep,
    IsolationAttempt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Canonical {
        function: String,
        form: String,
    },
    DetectorStage {
        function: String,
        stage: DetectionStage,
        outcome: Option<usize>,
    },
    RhsIsolated {
        function: String,
        order: usize,
        rhs: String,
    },
    DerivativeValue {
        function: String,
        order: usize,
        value: String,
    },
    Coefficient {
        function: String,
        power: usize,
        value: String,
    },
    ResidualCheck {
        function: String,
        derivative_order: usize,
        value: String,
    },
}

pub trait TraceSink: Send + Sync {
    fn record(&self, event: TraceEvent);
}

/// Default sink: drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn record(&self, _event: TraceEvent) {}
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&self, event: TraceEvent) {
        match event {
            TraceEvent::Canonical { function, form } => {
                debug!("[{}] canonical form: {}", function, form)
            }
            TraceEvent::DetectorStage {
                function,
                stage,
                outcome,
            } => debug!("[{}] {} -> {:?}", function, stage, outcome),
            TraceEvent::RhsIsolated {
                function,
                order,
                rhs,
            } => debug!("[{}] order {} isolated, H = {}", function, order, rhs),
            TraceEvent::DerivativeValue {
                function,
                order,
                value,
            } => debug!("[{}] derivative of order {} at x0 = {}", function, order, value),
            TraceEvent::Coefficient {
                function,
                power,
                value,
            } => debug!("[{}] a_{} = {}", function, power, value),
            TraceEvent::ResidualCheck {
                function,
                derivative_order,
                value,
            } => debug!(
                "[{}] residual derivative {} at x0 = {}",
                function, derivative_order, value
            ),
        }
    }
}

/// Collects every event, mainly for tests.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TraceSink for RecordingTrace {
    fn record(&self, event: TraceEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl<T: TraceSink + ?Sized> TraceSink for std::sync::Arc<T> {
    fn record(&self, event: TraceEvent) {
        (**self).record(event)
    }
}
