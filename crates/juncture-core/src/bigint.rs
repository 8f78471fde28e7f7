//! Arbitrary-width bit sets.
//!
//! The framework uses [`BigInteger`] as a channel mask: bit `n` set means
//! channel `n` is active.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::array::NativeArray;

/// Unsigned integer of arbitrary width, stored as little-endian 32-bit words.
///
/// Trailing zero words are never kept, so equal values compare equal.
#[repr(C)]
#[derive(Clone, PartialEq, Eq)]
pub struct BigInteger {
    words: NativeArray<u32>,
    highest_bit: i32,
}

crate::layout_contract! {
    /// Declared layout of [`BigInteger`].
    pub const BIG_INTEGER_LAYOUT: BigInteger {
        size = 24,
        align = 8,
        words = 0,
        highest_bit = 16,
    }
}

impl BigInteger {
    /// Zero.
    pub fn new() -> Self {
        Self {
            words: NativeArray::new(),
            highest_bit: -1,
        }
    }

    /// A value with bits `0..num_bits` set.
    pub fn with_low_bits(num_bits: i32) -> Self {
        let mut value = Self::new();
        value.set_range(0, num_bits, true);
        value
    }

    pub fn bit(&self, bit: i32) -> bool {
        if bit < 0 {
            return false;
        }
        let bit = bit as usize;
        self.words
            .get(bit / 32)
            .is_some_and(|word| word & (1 << (bit % 32)) != 0)
    }

    pub fn set_bit(&mut self, bit: i32) -> &mut Self {
        self.set_bit_value(bit, true)
    }

    pub fn clear_bit(&mut self, bit: i32) -> &mut Self {
        self.set_bit_value(bit, false)
    }

    /// Sets or clears one bit. Negative bit indices are ignored.
    pub fn set_bit_value(&mut self, bit: i32, value: bool) -> &mut Self {
        if bit < 0 || self.bit(bit) == value {
            return self;
        }
        let index = bit as usize / 32;
        let mask = 1_u32 << (bit as usize % 32);
        if value {
            if index >= self.words.len() {
                self.words.extend(std::iter::repeat(0).take(index + 1 - self.words.len()));
            }
            self.words[index] |= mask;
        } else {
            self.words[index] &= !mask;
        }
        self.normalise();
        self
    }

    /// Sets or clears `num_bits` bits starting at `start_bit`, a word at a
    /// time.
    ///
    /// A negative start shortens the range accordingly.
    pub fn set_range(&mut self, start_bit: i32, num_bits: i32, value: bool) -> &mut Self {
        let (mut start, mut count) = (start_bit, num_bits);
        if start < 0 {
            count += start;
            start = 0;
        }
        if count <= 0 {
            return self;
        }
        let start = start as usize;
        let end = start + count as usize;
        let (first_word, last_word) = (start / 32, (end - 1) / 32);

        if value && last_word >= self.words.len() {
            self.words.extend(std::iter::repeat(0).take(last_word + 1 - self.words.len()));
        }
        let last_word = last_word.min(self.words.len().saturating_sub(1));

        for index in first_word..=last_word.max(first_word) {
            let Some(word) = self.words.get_mut(index) else {
                break;
            };
            let low = if index == first_word { start % 32 } else { 0 };
            let high = if index == (end - 1) / 32 { (end - 1) % 32 + 1 } else { 32 };
            let mask = (u32::MAX >> (32 - (high - low))) << low;
            if value {
                *word |= mask;
            } else {
                *word &= !mask;
            }
        }
        self.normalise();
        self
    }

    /// Resets to zero.
    pub fn clear(&mut self) -> &mut Self {
        self.words.clear();
        self.highest_bit = -1;
        self
    }

    pub fn count_number_of_set_bits(&self) -> i32 {
        self.words.iter().map(|word| word.count_ones() as i32).sum()
    }

    /// Index of the highest set bit, or -1 for zero.
    pub fn highest_bit(&self) -> i32 {
        self.highest_bit
    }

    pub fn is_zero(&self) -> bool {
        self.highest_bit < 0
    }

    /// Indices of the set bits, ascending.
    pub fn set_bits(&self) -> impl Iterator<Item = i32> + '_ {
        (0..=self.highest_bit).filter(|&bit| self.bit(bit))
    }

    fn normalise(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        self.highest_bit = match self.words.last() {
            Some(&word) => {
                (self.words.len() as i32 - 1) * 32 + (31 - word.leading_zeros() as i32)
            }
            None => -1,
        };
    }
}

impl Default for BigInteger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BigInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.set_bits()).finish()
    }
}

impl FromIterator<i32> for BigInteger {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut value = Self::new();
        for bit in iter {
            value.set_bit(bit);
        }
        value
    }
}

impl Serialize for BigInteger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.set_bits())
    }
}

impl<'de> Deserialize<'de> for BigInteger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<i32>::deserialize(deserializer).map(|bits| bits.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear_bits() {
        let mut mask = BigInteger::new();
        assert!(mask.is_zero());
        assert_eq!(mask.highest_bit(), -1);

        mask.set_bit(0).set_bit(33);
        assert!(mask.bit(0));
        assert!(mask.bit(33));
        assert!(!mask.bit(1));
        assert_eq!(mask.highest_bit(), 33);
        assert_eq!(mask.count_number_of_set_bits(), 2);

        mask.clear_bit(33);
        assert_eq!(mask.highest_bit(), 0);
        assert_eq!(mask, BigInteger::from_iter([0]));
    }

    #[test]
    fn test_set_range() {
        let mut mask = BigInteger::new();
        mask.set_range(2, 4, true);
        assert_eq!(mask.set_bits().collect::<Vec<_>>(), [2, 3, 4, 5]);

        mask.set_range(-2, 5, false);
        assert_eq!(mask.set_bits().collect::<Vec<_>>(), [3, 4, 5]);

        mask.set_range(0, 0, true).set_range(10, -3, true);
        assert_eq!(mask.count_number_of_set_bits(), 3);

        mask.clear();
        assert!(mask.is_zero());
    }

    #[test]
    fn test_set_range_across_words() {
        let mut mask = BigInteger::new();
        mask.set_range(5, 70, true);
        assert_eq!(mask.count_number_of_set_bits(), 70);
        assert_eq!(mask.highest_bit(), 74);
        assert!(!mask.bit(4));

        mask.set_range(30, 10, false);
        assert_eq!(mask.count_number_of_set_bits(), 60);
        assert!(mask.bit(29) && !mask.bit(30) && !mask.bit(39) && mask.bit(40));

        mask.set_range(64, 100, false);
        assert_eq!(mask.highest_bit(), 63);

        let all = BigInteger::with_low_bits(64);
        assert_eq!(all.count_number_of_set_bits(), 64);
        assert_eq!(all.highest_bit(), 63);
        assert_eq!(all.set_bits().last(), Some(63));
    }

    #[test]
    fn test_negative_bits_are_ignored() {
        let mut mask = BigInteger::with_low_bits(2);
        mask.set_bit(-1).clear_bit(-5);
        assert!(!mask.bit(-1));
        assert_eq!(mask.count_number_of_set_bits(), 2);
    }

    #[test]
    fn test_serde_as_bit_list() {
        let mask: BigInteger = [1, 4, 40].into_iter().collect();
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, "[1,4,40]");
        let back: BigInteger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_layout_matches_contract() {
        assert_eq!(
            BIG_INTEGER_LAYOUT.check(
                std::mem::size_of::<BigInteger>(),
                std::mem::align_of::<BigInteger>(),
                &[
                    ("words", std::mem::offset_of!(BigInteger, words)),
                    ("highest_bit", std::mem::offset_of!(BigInteger, highest_bit)),
                ],
            ),
            Ok(())
        );
    }
}
