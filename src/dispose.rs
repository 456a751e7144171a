//! Disposal behavior injection.
//!
//! The table owns every stored key and value, and releases that ownership
//! through a [`Disposer`] supplied at construction: on replacement (the old
//! payload, before the new entry is linked), on removal, and on teardown.
//! Relocation during a resize transfers ownership without releasing it, so
//! no disposer call is made there.

/// Caller-controlled destruction behavior for keys and values leaving the
/// table. A disposer that retains external ownership of payloads can be a
/// pair of no-ops.
pub trait Disposer<K, V> {
    fn dispose_key(&self, key: K);
    fn dispose_value(&self, value: V);
}

/// Default disposer: lets Rust drop the payload.
#[derive(Copy, Clone, Debug, Default)]
pub struct DropDisposer;

impl<K, V> Disposer<K, V> for DropDisposer {
    #[inline]
    fn dispose_key(&self, key: K) {
        drop(key);
    }

    #[inline]
    fn dispose_value(&self, value: V) {
        drop(value);
    }
}
