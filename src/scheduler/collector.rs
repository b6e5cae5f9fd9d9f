//! Per-cycle result slots
//!
//! Probe tasks report `(index, outcome)` in completion order; the collector
//! puts each outcome in its inventory slot and, once every task is done,
//! seals the slots into an inventory-ordered [`CycleSnapshot`].

use chrono::Local;
use tokio::time::Instant;

use crate::models::{CycleSnapshot, Endpoint, EndpointResult, ProbeOutcome, ProbeTier};
use crate::utils::duration_millis;

/// Why an outcome was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    OutOfRange,
    AlreadyFilled,
}

/// Fixed-size slot vector, one slot per endpoint
#[derive(Debug)]
pub struct CycleCollector {
    cycle: u64,
    started: Instant,
    slots: Vec<Option<ProbeOutcome>>,
}

impl CycleCollector {
    pub fn new(cycle: u64, size: usize) -> Self {
        Self {
            cycle,
            started: Instant::now(),
            slots: vec![None; size],
        }
    }

    /// Fill one slot; the first outcome for a slot wins
    pub fn record(&mut self, index: usize, outcome: ProbeOutcome) -> Result<(), SlotError> {
        let slot = self.slots.get_mut(index).ok_or(SlotError::OutOfRange)?;
        if slot.is_some() {
            return Err(SlotError::AlreadyFilled);
        }
        *slot = Some(outcome);
        Ok(())
    }

    /// Seal into a snapshot in inventory order
    ///
    /// Empty slots become "not checked" outcomes on the tier returned by
    /// `tier_of` for that index.
    pub fn seal<F>(self, endpoints: &[Endpoint], tier_of: F) -> CycleSnapshot
    where
        F: Fn(usize) -> ProbeTier,
    {
        let elapsed_ms = duration_millis(self.started.elapsed());

        let results = endpoints
            .iter()
            .zip(self.slots)
            .enumerate()
            .map(|(i, (endpoint, slot))| {
                let outcome = slot.unwrap_or_else(|| ProbeOutcome::not_checked(tier_of(i)));
                EndpointResult::new(endpoint, outcome)
            })
            .collect();

        CycleSnapshot {
            cycle: self.cycle,
            generated_at: Local::now(),
            elapsed_ms,
            results,
        }
    }
}
