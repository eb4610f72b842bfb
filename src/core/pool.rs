//! Object Pool
//!
//! Arena of reusable instances addressed by index. Released instances stay in
//! the arena on an idle list until the next acquire; once the idle list is at
//! capacity further releases drop the instance and only keep its index.

/// Reset hooks run when an instance moves in or out of the pool.
pub trait Poolable {
    /// Called whenever the instance is handed out.
    fn on_acquire(&mut self) {}

    /// Called whenever the instance is returned.
    fn on_release(&mut self) {}
}

/// Handle to a live pool entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey(usize);

impl PoolKey {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: Option<T>,
    live: bool,
}

/// Index arena with an idle free-list.
#[derive(Debug)]
pub struct ObjectPool<T> {
    entries: Vec<Entry<T>>,
    /// Entries holding a released instance ready for reuse.
    idle: Vec<usize>,
    /// Entries whose instance was dropped.
    vacant: Vec<usize>,
    max_idle: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create an empty pool keeping at most `max_idle` released instances.
    pub fn new(max_idle: usize) -> Self {
        Self {
            entries: Vec::new(),
            idle: Vec::new(),
            vacant: Vec::new(),
            max_idle,
        }
    }

    /// Hand out an instance, reusing an idle one when available.
    pub fn acquire<F>(&mut self, make: F) -> PoolKey
    where
        F: FnOnce() -> T,
    {
        while let Some(index) = self.idle.pop() {
            let entry = &mut self.entries[index];
            if let Some(value) = entry.value.as_mut() {
                value.on_acquire();
                entry.live = true;
                return PoolKey(index);
            }
            self.vacant.push(index);
        }

        let mut value = make();
        value.on_acquire();
        let entry = Entry {
            value: Some(value),
            live: true,
        };

        match self.vacant.pop() {
            Some(index) => {
                self.entries[index] = entry;
                PoolKey(index)
            }
            None => {
                self.entries.push(entry);
                PoolKey(self.entries.len() - 1)
            }
        }
    }

    /// Return an instance to the pool.
    ///
    /// Returns `false` if the key is not live (double release is a no-op).
    pub fn release(&mut self, key: PoolKey) -> bool {
        let Some(entry) = self.entries.get_mut(key.0) else {
            return false;
        };
        if !entry.live {
            return false;
        }

        entry.live = false;
        if let Some(value) = entry.value.as_mut() {
            value.on_release();
        }

        if self.idle.len() < self.max_idle {
            self.idle.push(key.0);
        } else {
            entry.value = None;
            self.vacant.push(key.0);
        }
        true
    }

    /// Borrow a live instance.
    pub fn get(&self, key: PoolKey) -> Option<&T> {
        self.entries
            .get(key.0)
            .filter(|e| e.live)
            .and_then(|e| e.value.as_ref())
    }

    /// Mutably borrow a live instance.
    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut T> {
        self.entries
            .get_mut(key.0)
            .filter(|e| e.live)
            .and_then(|e| e.value.as_mut())
    }

    /// Number of instances currently handed out.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.live).count()
    }

    /// Number of released instances waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Drop every idle instance.
    pub fn clear(&mut self) {
        for index in self.idle.drain(..) {
            self.entries[index].value = None;
            self.vacant.push(index);
        }
    }
}
