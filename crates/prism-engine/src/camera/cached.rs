/// A lazily recomputed value: the last computed value plus a dirty bit.
///
/// Mutators call [`Cached::invalidate`]; the accessor calls
/// [`Cached::get_or_update`]. Recomputation happens nowhere else, and the
/// dirty bit is cleared only after a recompute.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    value: T,
    dirty: bool,
}

impl<T> Cached<T> {
    /// Starts dirty; `initial` is a placeholder until the first read.
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            dirty: true,
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the cached value, recomputing it first when dirty.
    pub fn get_or_update(&mut self, recompute: impl FnOnce() -> T) -> &T {
        if self.dirty {
            self.value = recompute();
            self.dirty = false;
        }
        &self.value
    }

    /// Last computed value without recomputing. Stale while dirty.
    pub fn peek(&self) -> &T {
        &self.value
    }
}
