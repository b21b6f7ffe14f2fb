use crate::key::Key;
use std::collections::HashSet;

///
/// EntityPair
///
/// One row of a collection diff. `None` stands for absence on that side.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EntityPair<D, A> {
    pub detached: Option<D>,
    pub attached: Option<A>,
}

impl<D, A> EntityPair<D, A> {
    const fn new(detached: Option<D>, attached: Option<A>) -> Self {
        Self { detached, attached }
    }
}

/// Pair detached and attached collection members by identifier.
///
/// Members are given with their (possibly unassigned) keys. An absent
/// collection enumerates the other side unpaired; it never implies deletion.
/// Unassigned keys never match, and each identifier is paired at most once.
/// When both sides are present, attached members without a key (created
/// earlier in the same reconcile) are left out, so they are never mistaken
/// for members the detached side dropped.
#[must_use]
pub fn pair_members<D: Copy, A: Copy>(
    detached: Option<&[(D, Option<Key>)]>,
    attached: Option<&[(A, Option<Key>)]>,
) -> Vec<EntityPair<D, A>> {
    let (detached, attached) = match (detached, attached) {
        (None, None) => return Vec::new(),
        (None, Some(attached)) => {
            return attached
                .iter()
                .map(|(a, _)| EntityPair::new(None, Some(*a)))
                .collect();
        }
        (Some(detached), None) => {
            return detached
                .iter()
                .map(|(d, _)| EntityPair::new(Some(*d), None))
                .collect();
        }
        (Some(detached), Some(attached)) => (detached, attached),
    };

    let mut pairs = Vec::with_capacity(detached.len().max(attached.len()));
    let mut paired: HashSet<&Key> = HashSet::new();

    for (a, key) in attached {
        let Some(key) = key else {
            continue;
        };
        let matched = detached
            .iter()
            .find(|(_, candidate)| candidate.as_ref() == Some(key))
            .map(|(d, _)| *d);

        paired.insert(key);
        pairs.push(EntityPair::new(matched, Some(*a)));
    }

    for (d, key) in detached {
        match key {
            None => pairs.push(EntityPair::new(Some(*d), None)),
            Some(key) => {
                if paired.insert(key) {
                    pairs.push(EntityPair::new(Some(*d), None));
                }
            }
        }
    }

    pairs
}

///
/// TESTS
///
