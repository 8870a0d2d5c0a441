use kibitz_types::Match;

/// Finished games, oldest first.
#[derive(Clone, Debug, Default)]
pub struct MatchHistory {
    matches: Vec<Match>,
}

impl MatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, record: Match) {
        self.matches.push(record);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn last(&self) -> Option<&Match> {
        self.matches.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    /// Sum of rating changes over all recorded games.
    pub fn net_elo(&self) -> i64 {
        self.matches.iter().map(|record| record.elo_delta).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_types::{MatchResult, User};

    fn record(result: MatchResult, elo_delta: i64) -> Match {
        Match {
            player: User::default(),
            opponent: User::default(),
            result,
            elo_delta,
            final_position: "1. e4".to_string(),
        }
    }

    #[test]
    fn test_records_in_order() {
        let mut history = MatchHistory::new();
        assert!(history.is_empty());
        history.record(record(MatchResult::Win, 16));
        history.record(record(MatchResult::Loss, -8));
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().result, MatchResult::Loss);
        let results: Vec<_> = history.iter().map(|m| m.result).collect();
        assert_eq!(results, vec![MatchResult::Win, MatchResult::Loss]);
        assert_eq!(history.net_elo(), 8);
    }
}
