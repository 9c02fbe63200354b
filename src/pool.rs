/// Capacity every pool starts with and never shrinks below.
pub const INITIAL_CAPACITY: usize = 32;

/// Growable array shared by the instruction buffer, the constant/global pools and
/// the VM heap.
///
/// Capacity is tracked logically so growth is deterministic: it doubles when an
/// append finds the pool full, and halves once a delete leaves it a quarter
/// occupied. The floor at [`INITIAL_CAPACITY`] keeps alternating append/delete
/// near the bottom from resizing on every call.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    items: Vec<T>,
    cap: usize,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Pool { items: Vec::with_capacity(INITIAL_CAPACITY), cap: INITIAL_CAPACITY }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Overwrites an existing slot. Returns `false` (and drops `item`) when
    /// `index` is out of bounds.
    pub fn set(&mut self, index: usize, item: T) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Appends and returns the new element's index.
    pub fn append(&mut self, item: T) -> usize {
        if self.items.len() == self.cap {
            self.resize(self.cap * 2);
        }
        self.items.push(item);
        self.items.len() - 1
    }

    /// Removes `index`, shifting later elements left.
    pub fn delete(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        if self.cap > INITIAL_CAPACITY && self.items.len() <= self.cap / 4 {
            self.resize((self.cap / 2).max(INITIAL_CAPACITY));
        }
        Some(item)
    }

    fn resize(&mut self, new_cap: usize) {
        if new_cap > self.items.capacity() {
            self.items.reserve_exact(new_cap - self.items.len());
        } else {
            self.items.shrink_to(new_cap);
        }
        self.cap = new_cap;
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool::new()
    }
}

impl<T> FromIterator<T> for Pool<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut pool = Pool::new();
        for item in iter {
            pool.append(item);
        }
        pool
    }
}

impl<'a, T> IntoIterator for &'a Pool<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
