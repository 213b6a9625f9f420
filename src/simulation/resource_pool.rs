//! Counting resource pools for workers and tools
//!
//! A pool hands out whole units all-or-nothing. Requests that cannot be served
//! wait in an ordered list, one entry per requester. Releasing units may grant
//! a waiter; the grant is made inside `release` so the caller only resumes it.

use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::types::{PartId, PoolConfig, PoolId, ReleasePolicy, ResourceKind};

/// Result of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Units taken
    Granted,
    /// Requester parked in the wait list
    Queued,
    /// The request exceeds the pool capacity and can never be served
    Rejected,
}

/// A parked request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitingRequest {
    /// Part that asked
    pub requester: PartId,
    /// Units asked for
    pub count: u32,
}

/// Capacity-bounded pool with an ordered wait list
#[derive(Debug, Clone)]
pub struct ResourcePool {
    /// Pool identifier
    pub id: PoolId,
    /// Display name
    pub name: String,
    /// Workers or tools
    pub kind: ResourceKind,
    /// Total units
    pub capacity: u32,
    /// Travel speed (m/s)
    pub speed: f64,
    /// Attendance cost per unit and paid hour
    pub cost_per_hour: f64,
    available: u32,
    wait_queue: VecDeque<WaitingRequest>,
    busy_hours: f64,
    policy: ReleasePolicy,
}

impl ResourcePool {
    /// Create a full pool
    pub fn new(
        id: PoolId,
        kind: ResourceKind,
        capacity: u32,
        speed: f64,
        cost_per_hour: f64,
        policy: ReleasePolicy,
    ) -> Self {
        Self {
            name: id.to_string(),
            id,
            kind,
            capacity,
            speed: if speed > 0.0 { speed } else { 1.0 },
            cost_per_hour,
            available: capacity,
            wait_queue: VecDeque::new(),
            busy_hours: 0.0,
            policy,
        }
    }

    /// Create a pool from its configuration
    pub fn from_config(config: &PoolConfig, kind: ResourceKind, policy: ReleasePolicy) -> Self {
        let mut pool =
            Self::new(config.id.clone(), kind, config.capacity, config.speed, config.cost_per_hour, policy);
        if !config.name.is_empty() {
            pool.name = config.name.clone();
        }
        pool
    }

    /// Units currently free
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Units currently granted
    pub fn outstanding(&self) -> u32 {
        self.capacity - self.available
    }

    /// Accumulated unit-hours of use
    pub fn busy_hours(&self) -> f64 {
        self.busy_hours
    }

    /// Parked requests, head first
    pub fn waiting(&self) -> impl Iterator<Item = &WaitingRequest> {
        self.wait_queue.iter()
    }

    /// Whether a requester is parked
    pub fn is_waiting(&self, requester: PartId) -> bool {
        self.wait_queue.iter().any(|w| w.requester == requester)
    }

    /// Ask for `count` units
    pub fn request(&mut self, requester: PartId, count: u32) -> RequestOutcome {
        if count > self.capacity {
            debug!(pool = %self.id, %requester, count, capacity = self.capacity, "Request exceeds capacity");
            return RequestOutcome::Rejected;
        }
        if self.available >= count {
            self.available -= count;
            trace!(pool = %self.id, %requester, count, available = self.available, "Granted");
            return RequestOutcome::Granted;
        }
        if !self.is_waiting(requester) {
            self.wait_queue.push_back(WaitingRequest { requester, count });
        }
        trace!(pool = %self.id, %requester, count, waiting = self.wait_queue.len(), "Queued");
        RequestOutcome::Queued
    }

    /// Return `count` units used for `usage_hours` each; may grant a waiter
    pub fn release(&mut self, count: u32, usage_hours: f64) -> Option<WaitingRequest> {
        self.available = (self.available + count).min(self.capacity);
        self.busy_hours += usage_hours * count as f64;
        self.grant_next()
    }

    /// Grant the next waiter the release policy selects, if the free units cover it
    pub fn grant_next(&mut self) -> Option<WaitingRequest> {
        let index = match self.policy {
            ReleasePolicy::HeadOfLine => {
                self.wait_queue.front().filter(|w| w.count <= self.available).map(|_| 0)
            }
            ReleasePolicy::FirstFit => self.wait_queue.iter().position(|w| w.count <= self.available),
        }?;

        let granted = self.wait_queue.remove(index)?;
        self.available -= granted.count;
        debug!(pool = %self.id, requester = %granted.requester, count = granted.count, "Unblocked waiter");
        Some(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: u32, policy: ReleasePolicy) -> ResourcePool {
        ResourcePool::new(PoolId::new("pool"), ResourceKind::Worker, capacity, 1.0, 30.0, policy)
    }

    #[test]
    fn test_grant_queue_reject() {
        let mut pool = pool(3, ReleasePolicy::HeadOfLine);
        assert_eq!(pool.request(PartId(0), 2), RequestOutcome::Granted);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.request(PartId(1), 2), RequestOutcome::Queued);
        assert_eq!(pool.request(PartId(1), 2), RequestOutcome::Queued);
        assert_eq!(pool.waiting().count(), 1);
        assert_eq!(pool.request(PartId(2), 4), RequestOutcome::Rejected);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn test_release_grants_head() {
        let mut pool = pool(2, ReleasePolicy::HeadOfLine);
        pool.request(PartId(0), 2);
        pool.request(PartId(1), 1);

        let unblocked = pool.release(2, 1.5).unwrap();
        assert_eq!(unblocked, WaitingRequest { requester: PartId(1), count: 1 });
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.busy_hours(), 3.0);
        assert!(pool.release(1, 0.0).is_none());
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_head_of_line_blocks_smaller_requests() {
        let mut pool = pool(3, ReleasePolicy::HeadOfLine);
        pool.request(PartId(0), 3);
        pool.request(PartId(1), 3);
        pool.request(PartId(2), 1);

        // One unit back: the head needs three, so nobody is served
        assert!(pool.release(1, 0.0).is_none());
        assert_eq!(pool.available(), 1);
        assert!(pool.is_waiting(PartId(2)));
    }

    #[test]
    fn test_first_fit_serves_smaller_requests() {
        let mut pool = pool(3, ReleasePolicy::FirstFit);
        pool.request(PartId(0), 3);
        pool.request(PartId(1), 3);
        pool.request(PartId(2), 1);

        let unblocked = pool.release(1, 0.0).unwrap();
        assert_eq!(unblocked.requester, PartId(2));
        assert_eq!(pool.available(), 0);
        assert!(pool.is_waiting(PartId(1)));
    }

    #[test]
    fn test_grant_next_serves_every_fitting_waiter() {
        let mut pool = pool(3, ReleasePolicy::HeadOfLine);
        pool.request(PartId(0), 3);
        pool.request(PartId(1), 1);
        pool.request(PartId(2), 1);
        pool.request(PartId(3), 2);

        assert_eq!(pool.release(3, 0.0).unwrap().requester, PartId(1));
        assert_eq!(pool.grant_next().unwrap().requester, PartId(2));
        // One unit left, the head wants two
        assert!(pool.grant_next().is_none());
        assert_eq!(pool.available(), 1);
        assert!(pool.is_waiting(PartId(3)));
    }

    #[test]
    fn test_release_is_clamped() {
        let mut pool = pool(2, ReleasePolicy::HeadOfLine);
        assert!(pool.release(5, 0.0).is_none());
        assert_eq!(pool.available(), 2);
    }
}
