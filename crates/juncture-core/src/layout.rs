//! Declared memory layouts for native value types.
//!
//! Native value types are shared with the framework by value, so their size,
//! alignment and field offsets are part of the contract. Each type declares
//! its layout with [`layout_contract!`](crate::layout_contract), which emits
//! the description as a constant and checks it at compile time. A mismatch
//! fails the build.
//!
//! Contracts describe 64-bit targets only; on other targets neither the
//! constant nor the checks exist.

/// Declared offset of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOffset {
    pub field: &'static str,
    pub offset: usize,
}

/// Declared size, alignment and field offsets of a native value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutContract {
    pub type_name: &'static str,
    pub size: usize,
    pub align: usize,
    pub fields: &'static [FieldOffset],
}

impl LayoutContract {
    /// Declared offset of `field`, if the contract names it.
    pub fn offset_of(&self, field: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|declared| declared.field == field)
            .map(|declared| declared.offset)
    }

    /// Compares the declaration with measured values.
    ///
    /// Returns a description of the first difference found.
    pub fn check(&self, size: usize, align: usize, offsets: &[(&str, usize)]) -> Result<(), String> {
        if self.size != size {
            return Err(format!(
                "{}: declared size {}, measured {}",
                self.type_name, self.size, size
            ));
        }
        if self.align != align {
            return Err(format!(
                "{}: declared align {}, measured {}",
                self.type_name, self.align, align
            ));
        }
        for &(field, measured) in offsets {
            match self.offset_of(field) {
                Some(declared) if declared == measured => {}
                Some(declared) => {
                    return Err(format!(
                        "{}::{field}: declared offset {declared}, measured {measured}",
                        self.type_name
                    ))
                }
                None => return Err(format!("{}::{field}: not declared", self.type_name)),
            }
        }
        Ok(())
    }
}

/// Declares and checks the layout of a native value type.
///
/// ```ignore
/// layout_contract! {
///     /// Declared layout of `Time`.
///     pub const TIME_LAYOUT: Time {
///         size = 8,
///         align = 8,
///         millis_since_epoch = 0,
///     }
/// }
/// ```
///
/// An optional `where cfg(..)` clause after the type restricts the contract
/// to a configuration, for types whose fields depend on it.
#[macro_export]
macro_rules! layout_contract {
    (
        $(#[$attr:meta])*
        $vis:vis const $contract:ident: $ty:ty $(where cfg($pred:meta))? {
            size = $size:expr,
            align = $align:expr
            $(, $field:tt = $offset:expr)* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[cfg(all($($pred,)? target_pointer_width = "64"))]
        $vis const $contract: $crate::layout::LayoutContract = $crate::layout::LayoutContract {
            type_name: stringify!($ty),
            size: $size,
            align: $align,
            fields: &[
                $($crate::layout::FieldOffset {
                    field: stringify!($field),
                    offset: $offset,
                }),*
            ],
        };

        #[cfg(all($($pred,)? target_pointer_width = "64"))]
        const _: () = {
            assert!(
                ::std::mem::size_of::<$ty>() == $size,
                concat!("size of ", stringify!($ty), " differs from its layout contract"),
            );
            assert!(
                ::std::mem::align_of::<$ty>() == $align,
                concat!("alignment of ", stringify!($ty), " differs from its layout contract"),
            );
            $(
                assert!(
                    ::std::mem::offset_of!($ty, $field) == $offset,
                    concat!(
                        "offset of ",
                        stringify!($ty),
                        "::",
                        stringify!($field),
                        " differs from its layout contract",
                    ),
                );
            )*
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    struct Pair {
        first: u32,
        second: u64,
    }

    crate::layout_contract! {
        const PAIR_LAYOUT: Pair {
            size = 16,
            align = 8,
            first = 0,
            second = 8,
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_offset_lookup() {
        assert_eq!(PAIR_LAYOUT.type_name, "Pair");
        assert_eq!(PAIR_LAYOUT.offset_of("second"), Some(8));
        assert_eq!(PAIR_LAYOUT.offset_of("third"), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_check_reports_first_difference() {
        assert!(PAIR_LAYOUT
            .check(16, 8, &[("first", 0), ("second", 8)])
            .is_ok());
        assert_eq!(
            PAIR_LAYOUT.check(24, 8, &[]),
            Err("Pair: declared size 16, measured 24".to_string())
        );
        assert_eq!(
            PAIR_LAYOUT.check(16, 8, &[("second", 4)]),
            Err("Pair::second: declared offset 8, measured 4".to_string())
        );
        assert!(PAIR_LAYOUT.check(16, 8, &[("third", 0)]).is_err());
    }
}
