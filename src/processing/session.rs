//! Caller-side bookkeeping of the live throws
//!
//! Collections are never edited in place: every edit builds a new
//! [`ObservationSet`] and the session keeps the one it replaced, which is all
//! the one-level undo needs.

use log::debug;

use crate::core::constants::MAX_OBSERVATIONS;
use crate::core::Observation;

/// Immutable ordered collection of observations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn with_added(&self, observation: Observation) -> Self {
        let mut observations = self.observations.clone();
        observations.push(observation);
        Self { observations }
    }

    /// New set with the last observation's corrected angle moved by `delta`
    pub fn with_last_angle_nudged(&self, delta: f64) -> Option<Self> {
        self.with_last_replaced(|last| last.with_angle_nudged(delta))
    }

    pub fn with_last_robust_toggled(&self) -> Option<Self> {
        self.with_last_replaced(|last| last.with_robust_toggled())
    }

    pub fn without(&self, index: usize) -> Option<Self> {
        if index >= self.observations.len() {
            return None;
        }
        let mut observations = self.observations.clone();
        observations.remove(index);
        Some(Self { observations })
    }

    fn with_last_replaced<F>(&self, edit: F) -> Option<Self>
    where
        F: FnOnce(&Observation) -> Observation,
    {
        let (last, rest) = self.observations.split_last()?;
        let mut observations = rest.to_vec();
        observations.push(edit(last));
        Some(Self { observations })
    }
}

impl From<Vec<Observation>> for ObservationSet {
    fn from(observations: Vec<Observation>) -> Self {
        Self { observations }
    }
}

/// Live throws plus the collection they replaced
#[derive(Debug, Clone)]
pub struct ThrowSession {
    current: ObservationSet,
    previous: ObservationSet,
    capacity: usize,
}

impl Default for ThrowSession {
    fn default() -> Self {
        Self::new(MAX_OBSERVATIONS)
    }
}

impl ThrowSession {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: ObservationSet::new(),
            previous: ObservationSet::new(),
            capacity,
        }
    }

    pub fn observations(&self) -> &ObservationSet {
        &self.current
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.current.len() >= self.capacity
    }

    /// Append a throw; returns false once the session is full
    pub fn add(&mut self, observation: Observation) -> bool {
        if self.is_full() {
            debug!("Session full at {} throws, ignoring new throw", self.capacity);
            return false;
        }
        let next = self.current.with_added(observation);
        self.commit(next);
        true
    }

    pub fn change_last_angle(&mut self, delta: f64) -> bool {
        match self.current.with_last_angle_nudged(delta) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    pub fn toggle_last_robust(&mut self) -> bool {
        match self.current.with_last_robust_toggled() {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> bool {
        match self.current.without(index) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    /// Swap the live and previous collections; a second undo redoes
    pub fn undo(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    /// Clear the live throws, keeping them available to undo
    pub fn reset(&mut self) -> bool {
        if self.current.is_empty() {
            return false;
        }
        self.commit(ObservationSet::new());
        true
    }

    fn commit(&mut self, next: ObservationSet) {
        self.previous = std::mem::replace(&mut self.current, next);
    }
}
