use fnv::FnvHashMap;
use smallvec::SmallVec;
use wavesel_core::MAX_COMPONENTS;

use crate::{Temp, TempId};

#[cfg(test)]
mod tests;

/// Remembers which components a composite value has already been split into, so every
/// extraction of the same component yields the same value and a composite is split at most
/// once.
#[derive(Debug, Default, Clone)]
pub struct DecompositionCache {
    parts: FnvHashMap<TempId, SmallVec<[Temp; 4]>>,
}

impl DecompositionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `parts` as the full breakdown of `composite`, replacing any previous one.
    ///
    /// Returns `false` and records nothing if the parts don't add up to exactly `composite`.
    pub fn insert(&mut self, composite: Temp, parts: &[Temp]) -> bool {
        if !covers(composite, parts) {
            return false;
        }

        self.parts.insert(composite.id(), parts.iter().copied().collect());

        true
    }

    /// The recorded breakdown of `composite`, if there is a complete one.
    #[must_use]
    pub fn get(&self, composite: Temp) -> Option<&[Temp]> {
        self.parts
            .get(&composite.id())
            .map(SmallVec::as_slice)
            .filter(|parts| covers(composite, parts))
    }

    pub fn invalidate(&mut self, composite: TempId) {
        self.parts.remove(&composite);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

fn covers(composite: Temp, parts: &[Temp]) -> bool {
    !parts.is_empty()
        && parts.len() <= MAX_COMPONENTS
        && parts.iter().map(|it| u32::from(it.bytes())).sum::<u32>() == u32::from(composite.bytes())
}
