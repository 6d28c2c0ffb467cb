//! Bounded in-memory store of player updates

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::difficulty::{DifficultyTier, PerformanceSnapshot};
use crate::feedback::DifficultyRequest;

/// One processed update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: Uuid,
    pub score: f64,
    pub reaction_time: f64,
    pub mistakes: f64,
    pub speed: f64,
    pub difficulty: DifficultyTier,
    /// Unix timestamp (ms)
    pub created_at: u64,
}

impl PlayerRecord {
    pub fn new(request: &DifficultyRequest, difficulty: DifficultyTier) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            score: request.score,
            reaction_time: request.reaction_time,
            mistakes: request.mistakes,
            speed: request.speed,
            difficulty,
            created_at,
        }
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            score: self.score,
            reaction_time_ms: self.reaction_time,
            mistakes: self.mistakes,
            speed: self.speed,
            ..Default::default()
        }
    }
}

/// Oldest records are evicted once `capacity` is reached
pub struct PlayerStore {
    records: RwLock<VecDeque<PlayerRecord>>,
    capacity: usize,
}

impl PlayerStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, record: PlayerRecord) {
        let mut records = self.records.write();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn get(&self, id: Uuid) -> Option<PlayerRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// Up to `limit` records, newest first
    pub fn latest(&self, limit: usize) -> Vec<PlayerRecord> {
        self.records.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
