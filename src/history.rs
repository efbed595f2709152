use std::collections::VecDeque;

use crate::types::GameState;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Undo stack of full `GameState` snapshots. Once full, the oldest entry is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameHistory {
    snapshots: VecDeque<GameState>,
    limit: usize,
}

impl GameHistory {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            snapshots: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, snapshot: GameState) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<GameState> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GameState> {
        self.snapshots.iter()
    }
}

impl Default for GameHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(left_score: u32) -> GameState {
        let mut state = GameState::default();
        state.teams.left.score = left_score;
        state
    }

    #[test]
    fn pop_returns_most_recent_snapshot() {
        let mut history = GameHistory::default();
        history.push(snapshot(1));
        history.push(snapshot(2));

        assert_eq!(history.pop().unwrap().teams.left.score, 2);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest_and_keeps_most_recent_twenty() {
        let mut history = GameHistory::default();
        for score in 0..25 {
            history.push(snapshot(score));
        }

        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        let kept: Vec<u32> = history.iter().map(|s| s.teams.left.score).collect();
        assert_eq!(kept, (5..25).collect::<Vec<_>>());
    }

    #[test]
    fn pop_on_empty_history_is_none() {
        let mut history = GameHistory::new(3);
        assert!(history.pop().is_none());
        assert!(history.is_empty());
    }
}
