use std::collections::VecDeque;

use crate::config::{TriangulationConfig, MAX_OBSERVATIONS};
use crate::error::{TrackerError, TrackerResult};
use crate::triangulation::fuser::MultiObserverFuser;
use crate::triangulation::intersect::{Sightline, TwoObserverIntersector};
use crate::types::{Intersection, Observation, TriangulationResult};

/// Bounded, ordered set of observations backing one triangulation
///
/// When full, pushing a new observation evicts the oldest one. The result is
/// recomputed from scratch after every change and cleared when fewer than two
/// observations remain.
pub struct ObservationSession {
    observations: VecDeque<Observation>,
    capacity: usize,
    fuser: MultiObserverFuser,
    intersector: TwoObserverIntersector,
    result: Option<TriangulationResult>,
}

impl Default for ObservationSession {
    fn default() -> Self {
        Self::new(&TriangulationConfig::default())
    }
}

impl ObservationSession {
    pub fn new(config: &TriangulationConfig) -> Self {
        let capacity = config.max_observations.clamp(2, MAX_OBSERVATIONS);
        ObservationSession {
            observations: VecDeque::with_capacity(capacity),
            capacity,
            fuser: MultiObserverFuser::new(config),
            intersector: TwoObserverIntersector::new(config),
            result: None,
        }
    }

    /// Rebuild a session from persisted observations (oldest first)
    pub fn restore(config: &TriangulationConfig, observations: Vec<Observation>) -> TrackerResult<Self> {
        let mut session = Self::new(config);
        for obs in observations {
            session.push(obs)?;
        }
        Ok(session)
    }

    /// Add an observation, returning the one evicted to make room (if any)
    pub fn push(&mut self, observation: Observation) -> TrackerResult<Option<Observation>> {
        observation.validate()?;

        let evicted = if self.observations.len() >= self.capacity {
            self.observations.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            log::info!("Session full ({}), evicted observation {}", self.capacity, old.id);
        }

        self.observations.push_back(observation);
        self.recompute()?;
        Ok(evicted)
    }

    /// Remove an observation by id
    pub fn remove(&mut self, id: &str) -> TrackerResult<Option<Observation>> {
        let removed = self
            .observations
            .iter()
            .position(|o| o.id == id)
            .and_then(|idx| self.observations.remove(idx));
        if removed.is_some() {
            self.recompute()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.observations.clear();
        self.result = None;
    }

    /// Latest result; `None` while fewer than two observations are held
    pub fn result(&self) -> Option<&TriangulationResult> {
        self.result.as_ref()
    }

    /// Great-circle intersection of the two held sightlines
    pub fn intersect_pair(&self) -> TrackerResult<Intersection> {
        if self.observations.len() != 2 {
            return Err(TrackerError::InvalidObservation(format!(
                "pair intersection needs exactly 2 observations, session holds {}",
                self.observations.len()
            )));
        }
        let first = &self.observations[0];
        let second = &self.observations[1];
        self.intersector.intersect(
            &Sightline::new(first.position, first.heading),
            &Sightline::new(second.position, second.heading),
        )
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// Owned copy of the observations, oldest first
    pub fn snapshot(&self) -> Vec<Observation> {
        self.observations.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    fn recompute(&mut self) -> TrackerResult<()> {
        if self.observations.len() < 2 {
            self.result = None;
            return Ok(());
        }
        let observations = self.observations.make_contiguous();
        let result = self.fuser.fuse(observations)?;
        if result.error_metric > 0.1 {
            log::warn!(
                "Low-confidence triangulation: error metric {:.3} over {} observers",
                result.error_metric,
                result.observer_count
            );
        }
        self.result = Some(result);
        Ok(())
    }
}
