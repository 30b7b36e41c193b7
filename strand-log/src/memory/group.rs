//! Consumer group coordination for subscriptions.
//!
//! Every join and leave recomputes a range assignment over the sorted
//! members and bumps the generation. Tailers compare generations on read
//! and apply the difference lazily.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use strand_core::{Generation, LogPartition, MemberId};

/// Membership and assignment of one consumer group.
#[derive(Debug, Default)]
pub(crate) struct GroupState {
    generation: Generation,
    members: BTreeMap<MemberId, Vec<String>>,
    assignment: HashMap<MemberId, Vec<LogPartition>>,
}

impl GroupState {
    pub(crate) const fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true if any member subscribes to the log.
    pub(crate) fn watches(&self, name: &str) -> bool {
        self.members
            .values()
            .any(|names| names.iter().any(|n| n == name))
    }

    /// Adds a member and rebalances.
    pub(crate) fn join<F>(&mut self, member: MemberId, names: Vec<String>, size_of: F)
    where
        F: Fn(&str) -> Option<u32>,
    {
        self.members.insert(member, names);
        self.rebalance(size_of);
    }

    /// Removes a member and rebalances. Returns false if it was not a member.
    pub(crate) fn leave<F>(&mut self, member: MemberId, size_of: F) -> bool
    where
        F: Fn(&str) -> Option<u32>,
    {
        if self.members.remove(&member).is_none() {
            return false;
        }
        self.rebalance(size_of);
        true
    }

    /// Recomputes the assignment and starts a new generation.
    pub(crate) fn rebalance<F>(&mut self, size_of: F)
    where
        F: Fn(&str) -> Option<u32>,
    {
        self.assignment = assign_ranges(&self.members, size_of);
        self.generation = self.generation.next();
    }

    /// Returns the current generation and the member's partitions.
    pub(crate) fn assignment(&self, member: MemberId) -> (Generation, Vec<LogPartition>) {
        let partitions = self.assignment.get(&member).cloned().unwrap_or_default();
        (self.generation, partitions)
    }
}

/// Splits every subscribed log into contiguous ranges, one per member
/// subscribing to it. The first `size % members` members take one extra
/// partition. Logs that do not exist are skipped.
fn assign_ranges<F>(
    members: &BTreeMap<MemberId, Vec<String>>,
    size_of: F,
) -> HashMap<MemberId, Vec<LogPartition>>
where
    F: Fn(&str) -> Option<u32>,
{
    let mut assignment: HashMap<MemberId, Vec<LogPartition>> =
        members.keys().map(|member| (*member, Vec::new())).collect();

    let names: BTreeSet<&str> = members.values().flatten().map(String::as_str).collect();
    for name in names {
        let Some(size) = size_of(name) else {
            continue;
        };
        let consumers: Vec<MemberId> = members
            .iter()
            .filter(|(_, names)| names.iter().any(|n| n == name))
            .map(|(member, _)| *member)
            .collect();
        #[allow(clippy::cast_possible_truncation)] // Member count is far below u32::MAX.
        let count = consumers.len() as u32;
        let per_member = size / count;
        let extra = size % count;

        let mut start = 0;
        for (index, member) in (0_u32..).zip(consumers) {
            let len = per_member + u32::from(index < extra);
            let partitions = assignment.entry(member).or_default();
            partitions.extend((start..start + len).map(|p| LogPartition::new(name, p)));
            start += len;
        }
    }
    assignment
}
