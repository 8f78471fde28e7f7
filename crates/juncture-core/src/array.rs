//! Native arrays.
//!
//! [`NativeArray`] is the framework's growable array: a data pointer followed
//! by 32-bit allocated and used counts. Its storage is always a `Vec`'s
//! allocation, so conversion to and from `Vec` moves the buffer instead of
//! copying. Capability operations receive and return plain `Vec`s and slices;
//! adapters append results element-wise into native arrays.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::leak::LeakedObjectDetector;
use crate::string::NativeString;

// =============================================================================
// NativeArray
// =============================================================================

/// Growable array of `T` with a fixed `(pointer, i32, i32)` layout.
#[repr(C)]
pub struct NativeArray<T> {
    data: NonNull<T>,
    num_allocated: i32,
    num_used: i32,
    _marker: PhantomData<T>,
}

/// Native array of `i32`.
pub type IntArray = NativeArray<i32>;
/// Native array of `f32`.
pub type FloatArray = NativeArray<f32>;
/// Native array of `f64`.
pub type DoubleArray = NativeArray<f64>;

crate::layout_contract! {
    /// Declared layout of [`IntArray`].
    pub const INT_ARRAY_LAYOUT: IntArray {
        size = 16,
        align = 8,
        data = 0,
        num_allocated = 8,
        num_used = 12,
    }
}

crate::layout_contract! {
    /// Declared layout of [`DoubleArray`].
    pub const DOUBLE_ARRAY_LAYOUT: DoubleArray {
        size = 16,
        align = 8,
        data = 0,
        num_allocated = 8,
        num_used = 12,
    }
}

// SAFETY: the array uniquely owns its elements.
unsafe impl<T: Send> Send for NativeArray<T> {}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync> Sync for NativeArray<T> {}

impl<T> NativeArray<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Takes over the allocation of `vec`.
    pub fn from_vec(vec: Vec<T>) -> Self {
        const { assert!(mem::size_of::<T>() != 0, "zero-sized elements are not supported") };
        debug_assert!(vec.capacity() <= i32::MAX as usize);
        let mut vec = ManuallyDrop::new(vec);
        Self {
            // SAFETY: a `Vec` pointer is never null, even before allocating.
            data: unsafe { NonNull::new_unchecked(vec.as_mut_ptr()) },
            num_allocated: vec.capacity() as i32,
            num_used: vec.len() as i32,
            _marker: PhantomData,
        }
    }

    /// Hands the allocation back as a `Vec`.
    pub fn into_vec(self) -> Vec<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: pointer, length and capacity all come from a `Vec<T>` and
        // are only ever updated through `edit`.
        unsafe {
            Vec::from_raw_parts(
                this.data.as_ptr(),
                this.num_used as usize,
                this.num_allocated as usize,
            )
        }
    }

    fn edit<R>(&mut self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let mut vec = mem::take(self).into_vec();
        let result = f(&mut vec);
        *self = Self::from_vec(vec);
        result
    }

    /// Appends one element.
    pub fn add(&mut self, value: T) {
        self.edit(|vec| vec.push(value));
    }

    pub fn insert(&mut self, index: usize, value: T) {
        self.edit(|vec| {
            let index = index.min(vec.len());
            vec.insert(index, value);
        });
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.edit(|vec| (index < vec.len()).then(|| vec.remove(index)))
    }

    /// Removes the last element.
    pub fn pop(&mut self) -> Option<T> {
        self.edit(Vec::pop)
    }

    pub fn clear(&mut self) {
        self.edit(Vec::clear);
    }

    pub fn ensure_storage_allocated(&mut self, capacity: usize) {
        self.edit(|vec| vec.reserve(capacity.saturating_sub(vec.len())));
    }

    pub fn capacity(&self) -> usize {
        self.num_allocated as usize
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `num_used` elements are initialised.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.num_used as usize) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, with exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.num_used as usize) }
    }
}

impl<T: PartialEq> NativeArray<T> {
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.iter().position(|item| item == value)
    }

    /// Appends `value` unless it is already present.
    pub fn add_if_not_already_there(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.add(value);
        true
    }
}

impl<T> Drop for NativeArray<T> {
    fn drop(&mut self) {
        drop(mem::take(self).into_vec());
    }
}

impl<T> Default for NativeArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for NativeArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for NativeArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone> Clone for NativeArray<T> {
    fn clone(&self) -> Self {
        Self::from_vec(self.as_slice().to_vec())
    }
}

impl<T: PartialEq> PartialEq for NativeArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for NativeArray<T> {}

impl<T: fmt::Debug> fmt::Debug for NativeArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> From<Vec<T>> for NativeArray<T> {
    fn from(vec: Vec<T>) -> Self {
        Self::from_vec(vec)
    }
}

impl<T: Clone> From<&[T]> for NativeArray<T> {
    fn from(items: &[T]) -> Self {
        Self::from_vec(items.to_vec())
    }
}

impl<T> From<NativeArray<T>> for Vec<T> {
    fn from(array: NativeArray<T>) -> Self {
        array.into_vec()
    }
}

impl<T> FromIterator<T> for NativeArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> Extend<T> for NativeArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.edit(|vec| vec.extend(iter));
    }
}

impl<'a, T> IntoIterator for &'a NativeArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T> IntoIterator for NativeArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<T: Serialize> Serialize for NativeArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NativeArray<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}

// =============================================================================
// StringArray
// =============================================================================

/// Array of native strings.
#[repr(C)]
#[derive(Clone, Default)]
pub struct StringArray {
    strings: NativeArray<NativeString>,
    #[cfg(debug_assertions)]
    leak_detector: LeakedObjectDetector<StringArray>,
}

crate::leak_tracked!(StringArray);

crate::layout_contract! {
    /// Declared layout of [`StringArray`] in debug builds.
    pub const STRING_ARRAY_LAYOUT: StringArray where cfg(debug_assertions) {
        size = 24,
        align = 8,
        strings = 0,
        leak_detector = 16,
    }
}

crate::layout_contract! {
    /// Declared layout of [`StringArray`] in release builds.
    pub const STRING_ARRAY_LAYOUT: StringArray where cfg(not(debug_assertions)) {
        size = 16,
        align = 8,
        strings = 0,
    }
}

crate::layout_contract! {
    /// Declared layout of [`LeakedObjectDetector`].
    pub const LEAK_DETECTOR_LAYOUT: LeakedObjectDetector<StringArray> {
        size = 1,
        align = 1,
    }
}

impl StringArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, text: impl Into<NativeString>) {
        self.strings.add(text.into());
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NativeString> {
        self.strings.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.strings.iter().map(NativeString::as_str)
    }

    pub fn as_slice(&self) -> &[NativeString] {
        self.strings.as_slice()
    }

    pub fn index_of(&self, text: &str) -> Option<usize> {
        self.iter().position(|item| item == text)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.index_of(text).is_some()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
    }

    pub fn join(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

impl PartialEq for StringArray {
    fn eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }
}

impl Eq for StringArray {}

impl fmt::Debug for StringArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<S: Into<NativeString>> FromIterator<S> for StringArray {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut array = Self::new();
        array.strings.extend(iter.into_iter().map(Into::into));
        array
    }
}

impl From<StringArray> for Vec<String> {
    fn from(array: StringArray) -> Self {
        array.to_vec()
    }
}

impl Serialize for StringArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.strings.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StringArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<NativeString>::deserialize(deserializer).map(|strings| strings.into_iter().collect())
    }
}

// =============================================================================
// OwnedArray
// =============================================================================

/// Array owning heap-allocated objects, whose addresses stay stable while
/// the array grows.
pub struct OwnedArray<T> {
    items: NativeArray<Box<T>>,
}

impl<T> OwnedArray<T> {
    pub fn new() -> Self {
        Self {
            items: NativeArray::new(),
        }
    }

    /// Appends an object and returns a reference to it.
    pub fn add(&mut self, item: T) -> &mut T {
        self.items.add(Box::new(item));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).map(|item| &**item)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index).map(|item| &mut **item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().map(|item| &**item)
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.items.remove(index).map(|item| *item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into_iter().map(|item| *item).collect()
    }
}

impl<T> Default for OwnedArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OwnedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for OwnedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Box::new).collect(),
        }
    }
}
