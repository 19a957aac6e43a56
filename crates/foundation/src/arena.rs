/// Index-addressed arena.
///
/// Records are never moved or freed individually; links between records
/// are stored as `usize` indices returned by [`Arena::alloc`].
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn alloc(&mut self, v: T) -> usize {
        self.items.push(v);
        self.items.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn alloc_returns_dense_indices() {
        let mut arena = Arena::new();
        assert_eq!(arena.alloc("a"), 0);
        assert_eq!(arena.alloc("b"), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(1), Some(&"b"));
        assert!(arena.get(2).is_none());
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut arena = Arena::with_capacity(1);
        let i = arena.alloc(1);
        *arena.get_mut(i).unwrap() += 41;
        assert_eq!(arena.iter().collect::<Vec<_>>(), vec![(0, &42)]);
    }
}
