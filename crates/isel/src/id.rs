use std::fmt;

pub struct IdAllocator {
    next_id: TempId,
}

impl IdAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_start(TempId(0))
    }

    #[must_use]
    pub const fn with_start(start: TempId) -> Self {
        Self { next_id: start }
    }

    #[must_use = "ignoring the return of this function will leak an ID slot and is almost never what you want"]
    pub fn allocate(&mut self) -> TempId {
        let id_num = self.next_id.0;

        assert!(id_num < u32::MAX);

        std::mem::replace(&mut self.next_id, TempId(id_num + 1))
    }

    /// The number of ids handed out so far (when starting from zero).
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.next_id.0
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IdAllocator").field("next_id", &self.next_id).finish()
    }
}

/// Opaque handle of an SSA value produced by selection.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct TempId(pub(crate) u32);

impl TempId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}
