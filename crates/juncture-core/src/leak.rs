//! Live-instance counting for native value types.
//!
//! Types that want leak tracking embed a [`LeakedObjectDetector`] (usually
//! only in debug builds) and implement [`LeakTracked`] to name the counter.
//! Dropping more instances than were created means an object was destroyed
//! twice, which is reported through `log::error!`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicIsize, Ordering};

/// A type whose live instances are counted.
pub trait LeakTracked {
    /// Counter of live instances of this type.
    fn live_instances() -> &'static AtomicIsize;
}

/// One-byte member that counts live instances of `T`.
#[repr(C)]
pub struct LeakedObjectDetector<T: LeakTracked> {
    _tag: u8,
    _marker: PhantomData<fn() -> T>,
}

impl<T: LeakTracked> LeakedObjectDetector<T> {
    pub fn new() -> Self {
        T::live_instances().fetch_add(1, Ordering::Relaxed);
        Self {
            _tag: 0,
            _marker: PhantomData,
        }
    }

    /// Number of live instances of `T`.
    pub fn live_count() -> isize {
        T::live_instances().load(Ordering::Relaxed)
    }
}

impl<T: LeakTracked> Default for LeakedObjectDetector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LeakTracked> Clone for LeakedObjectDetector<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: LeakTracked> Drop for LeakedObjectDetector<T> {
    fn drop(&mut self) {
        let previous = T::live_instances().fetch_sub(1, Ordering::Relaxed);
        if previous <= 0 {
            log::error!(
                "deleted a {} more times than it was created",
                std::any::type_name::<T>()
            );
        }
    }
}

impl<T: LeakTracked> fmt::Debug for LeakedObjectDetector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakedObjectDetector")
            .field("type", &std::any::type_name::<T>())
            .field("live", &Self::live_count())
            .finish()
    }
}

/// Implements [`LeakTracked`] with a dedicated static counter.
#[macro_export]
macro_rules! leak_tracked {
    ($ty:ty) => {
        impl $crate::leak::LeakTracked for $ty {
            fn live_instances() -> &'static ::std::sync::atomic::AtomicIsize {
                static LIVE: ::std::sync::atomic::AtomicIsize =
                    ::std::sync::atomic::AtomicIsize::new(0);
                &LIVE
            }
        }
    };
}
