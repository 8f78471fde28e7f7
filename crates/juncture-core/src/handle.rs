//! Owned handles to foreign capability objects.
//!
//! A [`BoxDyn`] carries one boxed trait object across the native boundary as
//! a plain two-word value. The native side never looks inside it: it only
//! moves it, hands it back to the capability operations, and finally asks the
//! capability's registered drop callback to reclaim it.
//!
//! # Lifecycle
//!
//! ```text
//! Box<dyn AudioDevice>                  (foreign object)
//!        ↓ BoxDyn::new
//! BoxDyn<dyn AudioDevice>               (two words: data + vtable)
//!        ↓ From<BoxDyn<..>> (wrap)
//! Box<dyn native::AudioIODevice>        (adapter owns the handle)
//!        ↓ adapter dropped by the framework
//! <dyn AudioDevice as Capability>::DROP (exactly once)
//! ```
//!
//! # Ownership rules
//!
//! - A handle is move-only. [`BoxDyn::take`] is the explicit move: it leaves
//!   the source holding the all-zero sentinel.
//! - Dropping an empty handle does nothing, so a moved-from handle can never
//!   reclaim its object a second time.
//! - Dropping a non-empty handle invokes the drop callback with the handle's
//!   address. The callback may run on any thread.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop, MaybeUninit};
use std::ptr;

use crate::boundary;

// =============================================================================
// FatPtr
// =============================================================================

/// Two-word opaque representation of a boxed trait object.
///
/// The all-zero value is the empty sentinel. A live trait object pointer is
/// never all-zero because its data word is non-null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatPtr(*const (), *const ());

impl FatPtr {
    /// The sentinel carried by empty and moved-from handles.
    pub const EMPTY: Self = Self(ptr::null(), ptr::null());

    /// Returns `true` for the all-zero sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    fn from_value<T: Sized>(value: T) -> Self {
        const { assert!(mem::size_of::<T>() == mem::size_of::<FatPtr>()) };
        let mut repr = MaybeUninit::<FatPtr>::zeroed();
        // SAFETY: `T` is exactly as large as `FatPtr` (asserted above) and the
        // storage is aligned for two pointers.
        unsafe {
            ptr::write(repr.as_mut_ptr().cast::<T>(), value);
            repr.assume_init()
        }
    }

    /// # Safety
    ///
    /// `self` must have been produced by `from_value::<T>`.
    unsafe fn into_value<T: Sized>(self) -> T {
        const { assert!(mem::size_of::<T>() == mem::size_of::<FatPtr>()) };
        // SAFETY: the caller guarantees the bytes hold a valid `T`.
        unsafe { ptr::read((&self as *const FatPtr).cast::<T>()) }
    }
}

crate::layout_contract! {
    /// Declared layout of [`FatPtr`].
    pub const FAT_PTR_LAYOUT: FatPtr {
        size = 16,
        align = 8,
        0 = 0,
        1 = 8,
    }
}

// =============================================================================
// Capability
// =============================================================================

/// Callback that reclaims the object owned by a handle.
///
/// It receives the address of the handle. After it returns the handle is
/// empty.
pub type DropCallback<C> = unsafe extern "C" fn(handle: *mut BoxDyn<C>);

/// A named contract a foreign object satisfies to stand in for a native
/// interface.
///
/// # Safety
///
/// Implementors must be trait objects (`dyn Trait`), whose raw pointers are
/// two words wide, and `DROP` must reclaim through [`BoxDyn::reclaim`].
/// Use [`capability!`](crate::capability) instead of implementing this by hand.
pub unsafe trait Capability {
    /// Name used in log output, e.g. `"AudioDevice"`.
    const NAME: &'static str;

    /// Registered drop callback.
    const DROP: DropCallback<Self>;
}

// =============================================================================
// BoxDyn
// =============================================================================

/// Move-only owning handle to a foreign object implementing capability `C`.
#[repr(C)]
pub struct BoxDyn<C: Capability + ?Sized> {
    repr: FatPtr,
    _marker: PhantomData<Box<C>>,
}

// SAFETY: the handle owns a `Box<C>`; it is as thread-safe as `C` itself.
unsafe impl<C: Capability + Send + ?Sized> Send for BoxDyn<C> {}

// SAFETY: shared access only hands out `&C`.
unsafe impl<C: Capability + Sync + ?Sized> Sync for BoxDyn<C> {}

impl<C: Capability + ?Sized> BoxDyn<C> {
    /// Takes ownership of a boxed foreign object.
    pub fn new(object: Box<C>) -> Self {
        Self {
            repr: FatPtr::from_value(Box::into_raw(object)),
            _marker: PhantomData,
        }
    }

    /// Returns an empty handle.
    pub const fn empty() -> Self {
        Self {
            repr: FatPtr::EMPTY,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the handle holds no object.
    pub fn is_empty(&self) -> bool {
        self.repr.is_empty()
    }

    /// Moves the object out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        Self {
            repr: mem::replace(&mut self.repr, FatPtr::EMPTY),
            _marker: PhantomData,
        }
    }

    /// The raw two-word representation.
    pub fn repr(&self) -> FatPtr {
        self.repr
    }

    /// Releases the representation without running the drop callback.
    pub fn into_repr(self) -> FatPtr {
        ManuallyDrop::new(self).repr
    }

    /// Rebuilds a handle from a representation released by [`into_repr`](Self::into_repr).
    ///
    /// # Safety
    ///
    /// `repr` must come from `into_repr` on a handle of the same capability,
    /// and ownership must not have been reclaimed in between.
    pub unsafe fn from_repr(repr: FatPtr) -> Self {
        Self {
            repr,
            _marker: PhantomData,
        }
    }

    fn as_raw(&self) -> Option<*mut C> {
        if self.repr.is_empty() {
            return None;
        }
        // SAFETY: non-empty representations are only produced by `new` from
        // `Box::into_raw`.
        Some(unsafe { self.repr.into_value::<*mut C>() })
    }

    /// Borrows the foreign object.
    pub fn get(&self) -> Option<&C> {
        // SAFETY: the box is live for as long as the handle owns it.
        self.as_raw().map(|object| unsafe { &*object })
    }

    /// Mutably borrows the foreign object.
    pub fn get_mut(&mut self) -> Option<&mut C> {
        // SAFETY: `&mut self` guarantees exclusive access to the box.
        self.as_raw().map(|object| unsafe { &mut *object })
    }

    /// Converts back into the box, bypassing the drop callback.
    pub fn into_box(self) -> Option<Box<C>> {
        let object = self.as_raw();
        let _ = self.into_repr();
        // SAFETY: the pointer came from `Box::into_raw` and ownership moves
        // out of the (now forgotten) handle.
        object.map(|object| unsafe { Box::from_raw(object) })
    }

    /// Calls a capability operation through a shared borrow.
    ///
    /// Returns `default` when the handle is empty or the operation panics.
    pub fn forward<R>(&self, operation: &'static str, default: R, call: impl FnOnce(&C) -> R) -> R {
        match self.get() {
            Some(object) => boundary::guard(C::NAME, operation, default, || call(object)),
            None => default,
        }
    }

    /// Calls a capability operation through an exclusive borrow.
    ///
    /// Returns `default` when the handle is empty or the operation panics.
    pub fn forward_mut<R>(
        &mut self,
        operation: &'static str,
        default: R,
        call: impl FnOnce(&mut C) -> R,
    ) -> R {
        match self.get_mut() {
            Some(object) => boundary::guard(C::NAME, operation, default, || call(object)),
            None => default,
        }
    }

    /// Reclaims the object owned by the handle at `handle`, leaving it empty.
    ///
    /// This is the body of every registered drop callback. Panics raised by
    /// the object's destructor are stopped here.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live `BoxDyn<C>`.
    pub unsafe fn reclaim(handle: *mut Self) {
        // SAFETY: guaranteed by the caller.
        let Some(handle) = (unsafe { handle.as_mut() }) else {
            return;
        };
        let Some(object) = handle.take().into_box() else {
            return;
        };
        log::debug!("reclaiming {} handle", C::NAME);
        boundary::guard(C::NAME, "drop", (), move || drop(object));
    }
}

impl<C: Capability + ?Sized> Drop for BoxDyn<C> {
    fn drop(&mut self) {
        if self.repr.is_empty() {
            return;
        }
        // SAFETY: `self` is a live handle of capability `C`.
        unsafe { (C::DROP)(self) }
    }
}

impl<C: Capability + ?Sized> Default for BoxDyn<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: Capability + ?Sized> fmt::Debug for BoxDyn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxDyn")
            .field("capability", &C::NAME)
            .field("empty", &self.is_empty())
            .finish()
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registers a capability trait.
///
/// Generates the handle alias, the [`Capability`] implementation (name and
/// drop callback) for `dyn Trait`, and the "wrap" conversions that lift a
/// handle (or a plain `Box<dyn Trait>`) into the boxed native interface
/// through the given adapter. The adapter must provide
/// `fn new(handle) -> Self`.
///
/// ```ignore
/// juncture_core::capability! {
///     /// Owned handle to an [`AudioDevice`].
///     pub type BoxDynAudioDevice = dyn AudioDevice as "AudioDevice";
///     wrap = AudioDeviceAdapter => dyn native::AudioIODevice;
/// }
/// ```
#[macro_export]
macro_rules! capability {
    (
        $(#[$meta:meta])*
        $vis:vis type $alias:ident = dyn $trait:ident as $name:literal;
        wrap = $adapter:ty => dyn $native:path;
    ) => {
        $(#[$meta])*
        $vis type $alias = $crate::BoxDyn<dyn $trait>;

        // SAFETY: `dyn $trait` is a trait object and its drop callback
        // reclaims through `BoxDyn::reclaim`.
        unsafe impl $crate::Capability for dyn $trait {
            const NAME: &'static str = $name;
            const DROP: $crate::DropCallback<Self> = {
                #[allow(improper_ctypes_definitions)]
                unsafe extern "C" fn drop_handle(handle: *mut $crate::BoxDyn<dyn $trait>) {
                    // SAFETY: handles pass their own address from `Drop`.
                    unsafe { $crate::BoxDyn::reclaim(handle) }
                }
                drop_handle
            };
        }

        impl ::std::convert::From<$alias> for ::std::boxed::Box<dyn $native> {
            fn from(handle: $alias) -> Self {
                ::std::boxed::Box::new(<$adapter>::new(handle))
            }
        }

        impl ::std::convert::From<::std::boxed::Box<dyn $trait>> for ::std::boxed::Box<dyn $native> {
            fn from(object: ::std::boxed::Box<dyn $trait>) -> Self {
                <$alias>::new(object).into()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    trait Greeter: Send {
        fn greet(&self) -> String;
        fn rename(&mut self, name: &str);
    }

    trait NativeGreeter {
        fn hello(&mut self) -> String;
    }

    struct GreeterAdapter {
        greeter: BoxDynGreeter,
    }

    impl GreeterAdapter {
        fn new(greeter: BoxDynGreeter) -> Self {
            Self { greeter }
        }
    }

    impl NativeGreeter for GreeterAdapter {
        fn hello(&mut self) -> String {
            self.greeter.forward("greet", String::new(), |greeter| greeter.greet())
        }
    }

    crate::capability! {
        type BoxDynGreeter = dyn Greeter as "Greeter";
        wrap = GreeterAdapter => dyn NativeGreeter;
    }

    struct Counted {
        name: String,
        drops: Arc<AtomicUsize>,
    }

    impl Greeter for Counted {
        fn greet(&self) -> String {
            format!("hello {}", self.name)
        }

        fn rename(&mut self, name: &str) {
            self.name = name.to_string();
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted(name: &str) -> (BoxDynGreeter, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let handle = BoxDynGreeter::new(Box::new(Counted {
            name: name.to_string(),
            drops: Arc::clone(&drops),
        }));
        (handle, drops)
    }

    #[test]
    fn test_handle_is_two_words() {
        assert_eq!(mem::size_of::<BoxDynGreeter>(), 2 * mem::size_of::<usize>());
    }

    #[test]
    fn test_empty_handle_has_zero_repr() {
        let handle = BoxDynGreeter::empty();
        assert!(handle.is_empty());
        assert_eq!(handle.repr(), FatPtr::EMPTY);
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_moving_never_drops() {
        let (mut source, drops) = counted("a");

        let mut moved = source.take();
        assert!(source.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        let relocated = moved.take();
        let relocated = vec![relocated].pop();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(source);
        drop(moved);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(relocated);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroying_moved_from_chain_is_noop() {
        let (mut owner, drops) = counted("b");
        let mut emptied = owner.take();
        let _ = emptied.take();
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        let mut from_empty = emptied.take();
        let twice_moved = from_empty.take();
        drop(twice_moved);
        drop(from_empty);
        drop(emptied);
        drop(owner);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reclaim_runs_once() {
        let (mut handle, drops) = counted("c");
        // SAFETY: `handle` is a live handle.
        unsafe { BoxDyn::reclaim(&mut handle) };
        assert!(handle.is_empty());
        // SAFETY: `handle` is still live, only empty.
        unsafe { BoxDyn::reclaim(&mut handle) };
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repr_round_trip_keeps_ownership() {
        let (handle, drops) = counted("d");
        let repr = handle.into_repr();
        assert!(!repr.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        // SAFETY: `repr` was released by `into_repr` above.
        let handle = unsafe { BoxDynGreeter::from_repr(repr) };
        assert_eq!(handle.get().map(|g| g.greet()).as_deref(), Some("hello d"));
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrap_forwards_and_drops_with_adapter() {
        let (mut handle, drops) = counted("e");
        handle.forward_mut("rename", (), |greeter| greeter.rename("f"));

        let mut native: Box<dyn NativeGreeter> = handle.into();
        assert_eq!(native.hello(), "hello f");
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(native);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forward_stops_panics() {
        struct Panicky;

        impl Greeter for Panicky {
            fn greet(&self) -> String {
                panic!("greet failed");
            }

            fn rename(&mut self, _name: &str) {}
        }

        let handle = BoxDynGreeter::new(Box::new(Panicky));
        let greeting = handle.forward("greet", "fallback".to_string(), |greeter| greeter.greet());
        assert_eq!(greeting, "fallback");
    }

    #[test]
    fn test_forward_on_empty_returns_default() {
        let mut handle = BoxDynGreeter::empty();
        assert_eq!(handle.forward_mut("greet", 7, |_| 1), 7);
    }

    #[test]
    fn test_drop_on_other_thread() {
        let (handle, drops) = counted("g");
        std::thread::spawn(move || drop(handle))
            .join()
            .expect("drop thread panicked");
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
