//! Native strings and borrowed UTF-8 views.
//!
//! [`NativeString`] is the framework's owned string: one pointer wide,
//! reference counted and immutable, with the empty string represented by a
//! null pointer. [`StrView`] is what crosses into capability operations: a
//! borrowed byte span with an explicit length, valid for one call.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// =============================================================================
// NativeString
// =============================================================================

/// Reference-counted immutable UTF-8 string.
///
/// Cloning shares the text. The empty string never allocates.
#[repr(C)]
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeString {
    text: Option<Arc<Box<str>>>,
}

crate::layout_contract! {
    /// Declared layout of [`NativeString`].
    pub const STRING_LAYOUT: NativeString {
        size = 8,
        align = 8,
        text = 0,
    }
}

impl NativeString {
    /// The empty string.
    pub const fn empty() -> Self {
        Self { text: None }
    }

    /// Copies `text` into a new native string.
    pub fn new(text: &str) -> Self {
        if text.is_empty() {
            Self::empty()
        } else {
            Self {
                text: Some(Arc::new(text.into())),
            }
        }
    }

    /// Copies the bytes of a view.
    pub fn from_view(view: StrView<'_>) -> Self {
        Self::new(view.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.text.as_deref().map_or("", |text| &**text)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    /// Borrows the text as a view for a capability call.
    pub fn view(&self) -> StrView<'_> {
        StrView::new(self.as_str())
    }

    /// Interprets the string as a status: empty means success.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Native(self.as_str().to_string()))
        }
    }
}

impl AsRef<str> for NativeString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for NativeString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<&String> for NativeString {
    fn from(text: &String) -> Self {
        Self::new(text)
    }
}

impl From<String> for NativeString {
    fn from(text: String) -> Self {
        if text.is_empty() {
            Self::empty()
        } else {
            Self {
                text: Some(Arc::new(text.into_boxed_str())),
            }
        }
    }
}

impl From<StrView<'_>> for NativeString {
    fn from(view: StrView<'_>) -> Self {
        Self::from_view(view)
    }
}

impl From<NativeString> for String {
    fn from(text: NativeString) -> Self {
        text.as_str().to_string()
    }
}

impl PartialEq<str> for NativeString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for NativeString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for NativeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for NativeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl Serialize for NativeString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NativeString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

// =============================================================================
// StrView
// =============================================================================

/// Borrowed UTF-8 byte span with an explicit length.
///
/// The empty view has a null data pointer.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StrView<'a> {
    data: *const u8,
    len: usize,
    _marker: PhantomData<&'a str>,
}

// SAFETY: a view is a `&str` in disguise.
unsafe impl Send for StrView<'_> {}

// SAFETY: as above.
unsafe impl Sync for StrView<'_> {}

impl<'a> StrView<'a> {
    /// The empty view.
    pub const EMPTY: StrView<'static> = StrView {
        data: ptr::null(),
        len: 0,
        _marker: PhantomData,
    };

    pub fn new(text: &'a str) -> Self {
        if text.is_empty() {
            return StrView::EMPTY;
        }
        Self {
            data: text.as_ptr(),
            len: text.len(),
            _marker: PhantomData,
        }
    }

    /// Builds a view from raw parts.
    ///
    /// # Safety
    ///
    /// Unless `data` is null, it must point to `len` bytes of valid UTF-8
    /// that stay alive and unmodified for `'a`.
    pub unsafe fn from_raw_parts(data: *const u8, len: usize) -> Self {
        Self {
            data,
            len: if data.is_null() { 0 } else { len },
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &'a str {
        if self.data.is_null() || self.len == 0 {
            return "";
        }
        // SAFETY: views are only built from `&str` or from raw parts the
        // caller vouched for.
        unsafe {
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(self.data, self.len))
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.as_str().as_bytes()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for StrView<'_> {
    fn default() -> Self {
        StrView::EMPTY
    }
}

impl<'a> From<&'a str> for StrView<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl PartialEq for StrView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StrView<'_> {}

impl PartialEq<&str> for StrView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

crate::layout_contract! {
    /// Declared layout of [`StrView`].
    pub const STR_VIEW_LAYOUT: StrView<'static> {
        size = 16,
        align = 8,
        data = 0,
        len = 8,
    }
}
