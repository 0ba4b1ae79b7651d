use std::{marker::PhantomData, num::NonZero};

const _OPT_HANDLE_SIZE: () = if size_of::<Option<Handle<u32>>>() != size_of::<Handle<u32>>() {
    panic!("size of Option<Handle<T>> not equal to size of Handle<T>");
};

/// Generational index used as a raw GPU object name by the headless device.
///
/// A freed slot bumps its generation, so a stale handle kept past `free`
/// never resolves to the object that reused the slot.
pub struct Handle<T> {
    pub(super) index: u32,
    pub(super) generation: NonZero<u32>,
    _marker: PhantomData<T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("gen", &self.generation())
            .finish()
    }
}

impl<T> Handle<T> {
    pub fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation: NonZero::new(generation).expect("handle generation must be non-zero"),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn idx(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }
}

#[derive(Debug)]
pub struct HandleAllocator<T> {
    generations: Vec<u32>,
    free_list: Vec<u32>,
    _marker: PhantomData<T>,
}

impl<T> Default for HandleAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleAllocator<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn allocate(&mut self) -> Handle<T> {
        match self.free_list.pop() {
            Some(idx) => Handle::new(idx, self.generations[idx as usize]),
            None => {
                let idx = self.generations.len() as u32;
                self.generations.push(1);
                Handle::new(idx, 1)
            }
        }
    }

    #[inline]
    pub fn is_live(&self, handle: Handle<T>) -> bool {
        self.generations
            .get(handle.index as usize)
            .is_some_and(|g| *g == handle.generation.get())
    }

    #[inline]
    pub fn free(&mut self, handle: Handle<T>) {
        if let Some(generation) = self.generations.get_mut(handle.index as usize) {
            if *generation == handle.generation.get() {
                *generation += 1;
                self.free_list.push(handle.index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag;

    #[test]
    fn reused_slot_invalidates_old_handle() {
        let mut alloc = HandleAllocator::<Tag>::new();
        let first = alloc.allocate();
        alloc.free(first);
        let second = alloc.allocate();

        assert_eq!(first.idx(), second.idx());
        assert_ne!(first, second);
        assert!(!alloc.is_live(first));
        assert!(alloc.is_live(second));
    }

    #[test]
    fn double_free_is_ignored() {
        let mut alloc = HandleAllocator::<Tag>::new();
        let handle = alloc.allocate();
        alloc.free(handle);
        alloc.free(handle);

        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a.idx(), b.idx());
    }
}
