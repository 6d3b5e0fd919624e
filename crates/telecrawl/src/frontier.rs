//! Channel discovery frontier.
//!
//! Every known channel holds exactly one [`ChannelState`]. Channels only ever
//! move forward (`Discovered -> Joining -> Joined -> Processed`), so a channel
//! that has been picked up is never queued again and cyclic references
//! between channels cannot loop the crawl.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::links::{normalize, ChannelId};

/// Label used for channels that came from the configuration.
pub const INITIAL_AFFILIATION: &str = "Initial Config";

/// Traversal state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// Known, waiting to be picked.
    Discovered,
    /// Picked, join in flight.
    Joining,
    /// Joined, messages not yet scraped.
    Joined,
    /// Scrape attempted. Terminal.
    Processed,
}

/// Which channel first referenced another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affiliation {
    /// Seed channel from the configuration.
    Initial,
    /// Discovered in the messages of this channel.
    Source(ChannelId),
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affiliation::Initial => f.write_str(INITIAL_AFFILIATION),
            Affiliation::Source(id) => write!(f, "{id}"),
        }
    }
}

/// Number of channels in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrontierCounts {
    pub discovered: usize,
    pub joining: usize,
    pub joined: usize,
    pub processed: usize,
}

impl fmt::Display for FrontierCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} joining, {} joined, {} processed",
            self.discovered, self.joining, self.joined, self.processed
        )
    }
}

/// Discovery state machine with first-wins affiliation edges.
///
/// Pop order is FIFO over discovery order.
#[derive(Debug, Default)]
pub struct FrontierTracker {
    states: HashMap<ChannelId, ChannelState>,
    queue: VecDeque<ChannelId>,
    affiliations: HashMap<ChannelId, Affiliation>,
}

impl FrontierTracker {
    /// Create an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a raw reference.
    ///
    /// `source` is the channel whose messages contained the reference, or
    /// `None` for seeds. Returns the id if it was newly discovered;
    /// unrecognizable references and already tracked channels yield `None`.
    pub fn add(&mut self, raw: &str, source: Option<&ChannelId>) -> Option<ChannelId> {
        let Some(id) = normalize(raw) else {
            tracing::debug!(reference = raw, "Skipping unrecognized reference");
            return None;
        };

        self.affiliations.entry(id.clone()).or_insert_with(|| {
            source.map_or(Affiliation::Initial, |s| Affiliation::Source(s.clone()))
        });

        if self.states.contains_key(&id) {
            return None;
        }

        self.states.insert(id.clone(), ChannelState::Discovered);
        self.queue.push_back(id.clone());
        tracing::debug!(
            channel = %id,
            source = ?source.map(ChannelId::as_str),
            "Discovered channel"
        );
        Some(id)
    }

    /// Take the next discovered channel, moving it to `Joining`.
    pub fn pop_next(&mut self) -> Option<ChannelId> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(state) = self.states.get_mut(&id) {
                if *state == ChannelState::Discovered {
                    *state = ChannelState::Joining;
                    return Some(id);
                }
            }
        }
        None
    }

    /// Record a successful join. Processed channels stay processed.
    pub fn mark_joined(&mut self, id: &ChannelId) {
        let state = self
            .states
            .entry(id.clone())
            .or_insert(ChannelState::Joined);
        if *state != ChannelState::Processed {
            *state = ChannelState::Joined;
        }
    }

    /// Mark a channel processed. Idempotent.
    pub fn mark_processed(&mut self, id: &ChannelId) {
        self.states.insert(id.clone(), ChannelState::Processed);
    }

    /// Whether any channel is waiting to be picked.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Number of channels waiting to be picked.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(ChannelState::Discovered)
    }

    /// Current state of a channel, if tracked.
    #[must_use]
    pub fn state_of(&self, id: &ChannelId) -> Option<ChannelState> {
        self.states.get(id).copied()
    }

    /// Who first referenced a channel.
    #[must_use]
    pub fn affiliation_of(&self, id: &ChannelId) -> Option<&Affiliation> {
        self.affiliations.get(id)
    }

    /// Channels currently in `state`.
    #[must_use]
    pub fn count(&self, state: ChannelState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    /// Snapshot of all state counts.
    #[must_use]
    pub fn counts(&self) -> FrontierCounts {
        let mut counts = FrontierCounts::default();
        for state in self.states.values() {
            match state {
                ChannelState::Discovered => counts.discovered += 1,
                ChannelState::Joining => counts.joining += 1,
                ChannelState::Joined => counts.joined += 1,
                ChannelState::Processed => counts.processed += 1,
            }
        }
        counts
    }

    /// Ids in `state`, sorted for stable display.
    #[must_use]
    pub fn channels_in(&self, state: ChannelState) -> Vec<&ChannelId> {
        let mut ids: Vec<&ChannelId> = self
            .states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ChannelId {
        normalize(raw).unwrap()
    }

    #[test]
    fn test_add_seeds_and_pop_fifo() {
        let mut frontier = FrontierTracker::new();
        frontier.add("t.me/alpha_chan", None);
        frontier.add("beta_chan", None);
        frontier.add("https://t.me/joinchat/Gamma99", None);

        assert_eq!(frontier.pending_count(), 3);
        assert_eq!(frontier.pop_next(), Some(id("alpha_chan")));
        assert_eq!(frontier.pop_next(), Some(id("beta_chan")));
        assert_eq!(frontier.pop_next(), Some(id("t.me/joinchat/Gamma99")));
        assert_eq!(frontier.pop_next(), None);
        assert!(!frontier.has_pending());
        assert_eq!(frontier.count(ChannelState::Joining), 3);
    }

    #[test]
    fn test_unrecognized_and_duplicate_references() {
        let mut frontier = FrontierTracker::new();
        assert!(frontier.add("not a link", None).is_none());
        assert!(frontier.add("t.me/alpha_chan", None).is_some());
        assert!(frontier.add("https://t.me/alpha_chan) mirror", None).is_none());
        assert_eq!(frontier.pending_count(), 1);
    }

    #[test]
    fn test_processed_never_rediscovered() {
        let mut frontier = FrontierTracker::new();
        frontier.add("alpha_chan", None);
        let alpha = frontier.pop_next().unwrap();
        frontier.mark_joined(&alpha);
        frontier.mark_processed(&alpha);
        frontier.mark_processed(&alpha);

        assert!(frontier.add("t.me/alpha_chan", Some(&id("beta_chan"))).is_none());
        assert_eq!(frontier.state_of(&alpha), Some(ChannelState::Processed));
        assert!(!frontier.has_pending());
    }

    #[test]
    fn test_joining_channel_not_requeued() {
        let mut frontier = FrontierTracker::new();
        frontier.add("alpha_chan", None);
        let alpha = frontier.pop_next().unwrap();

        // The channel links to itself
        assert!(frontier.add("t.me/alpha_chan", Some(&alpha)).is_none());
        assert_eq!(frontier.pop_next(), None);
    }

    #[test]
    fn test_states_are_disjoint() {
        let mut frontier = FrontierTracker::new();
        for name in ["one_chan", "two_chan", "three_chan", "four_chan"] {
            frontier.add(name, None);
        }
        let first = frontier.pop_next().unwrap();
        frontier.mark_joined(&first);
        let second = frontier.pop_next().unwrap();
        frontier.mark_processed(&second);
        frontier.mark_joined(&second);

        let counts = frontier.counts();
        assert_eq!(
            counts,
            FrontierCounts {
                discovered: 2,
                joining: 0,
                joined: 1,
                processed: 1,
            }
        );
        let total = counts.discovered + counts.joining + counts.joined + counts.processed;
        assert_eq!(total, 4);
        assert_eq!(frontier.channels_in(ChannelState::Processed), vec![&second]);
    }

    #[test]
    fn test_affiliation_first_wins() {
        let mut frontier = FrontierTracker::new();
        let seed = frontier.add("seed_chan", None).unwrap();
        let child = frontier.add("t.me/child_chan", Some(&seed)).unwrap();
        frontier.add("t.me/child_chan", Some(&id("other_chan")));

        assert_eq!(frontier.affiliation_of(&seed), Some(&Affiliation::Initial));
        assert_eq!(
            frontier.affiliation_of(&child),
            Some(&Affiliation::Source(seed.clone()))
        );
        assert_eq!(Affiliation::Initial.to_string(), "Initial Config");
        assert_eq!(Affiliation::Source(seed).to_string(), "seed_chan");
    }

    #[test]
    fn test_cycle_terminates() {
        let mut frontier = FrontierTracker::new();
        frontier.add("alpha_chan", None);

        let mut visited = Vec::new();
        while let Some(current) = frontier.pop_next() {
            // alpha -> beta -> alpha
            let next = if current.as_str() == "alpha_chan" {
                "t.me/beta_chan"
            } else {
                "t.me/alpha_chan"
            };
            frontier.add(next, Some(&current));
            frontier.mark_processed(&current);
            visited.push(current);
        }

        assert_eq!(visited, vec![id("alpha_chan"), id("beta_chan")]);
    }
}
