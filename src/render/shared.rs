use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// Refcounted storage for data produced by one stage and consumed by
/// others within the same frame. The producing stage constructs the owner
/// and keeps it; consumers copy views at construction time.
///
/// Access is borrow-checked at runtime per call: any number of overlapping
/// `read`s, exclusive `write`. The pipeline is single-threaded, so views
/// are cheap `Rc` clones.
#[derive(Debug, Default)]
pub struct SharedStorage<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> SharedStorage<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn share_view(&self) -> SharedStorageView<T> {
        SharedStorageView {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Write access for a single downstream consumer. Not clonable; the
    /// producer decides who gets one.
    pub fn share_mutable_view(&self) -> SharedStorageMutableView<T> {
        SharedStorageMutableView {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn read(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn write(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}

/// Immutable view over a stage's shared output.
#[derive(Debug)]
pub struct SharedStorageView<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for SharedStorageView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> SharedStorageView<T> {
    pub fn read(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }
}

/// Unique-write view over a stage's shared output.
#[derive(Debug)]
pub struct SharedStorageMutableView<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> SharedStorageMutableView<T> {
    pub fn read(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn write(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_observe_owner_writes() {
        let storage = SharedStorage::new(1u32);
        let view = storage.share_view();

        *storage.write() = 5;
        assert_eq!(*view.read(), 5);
    }

    #[test]
    fn mutable_view_writes_are_visible_to_owner() {
        let storage = SharedStorage::new(String::new());
        let writer = storage.share_mutable_view();

        writer.write().push_str("resized");
        assert_eq!(&*storage.read(), "resized");
    }

    #[test]
    fn owner_outlives_cloned_views_in_any_drop_order() {
        let storage = SharedStorage::new(vec![1, 2, 3]);
        let a = storage.share_view();
        let b = a.clone();
        drop(a);
        drop(storage);
        assert_eq!(b.read().len(), 3);
    }
}
