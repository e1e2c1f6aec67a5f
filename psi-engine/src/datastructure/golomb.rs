//! Golomb-Rice coding of sorted integer sets.
//!
//! A sorted set is stored as the sequence of gaps between consecutive
//! values. Each gap `d` is split by the divisor `2^div` into a quotient,
//! written in unary (`q` zero bits then a one bit), and a `div`-bit
//! remainder. Bits are packed least-significant first within each byte.

use crate::error::{PsiError, Result};
use std::f64::consts::LN_2;

/// Largest divisor exponent a decoder accepts.
pub const MAX_DIVISOR_BITS: u32 = 63;

/// A Golomb-Rice coded set together with its divisor exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GolombCompressed {
    pub div: u32,
    pub bits: Vec<u8>,
}

struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            len: 0,
        }
    }

    fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    fn push_unary(&mut self, quotient: u64) {
        for _ in 0..quotient {
            self.push_bit(false);
        }
        self.push_bit(true);
    }

    fn push_bits(&mut self, value: u64, width: u32) {
        for i in 0..width {
            self.push_bit((value >> i) & 1 == 1);
        }
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.bytes.get(self.pos / 8)?;
        let bit = (byte >> (self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    /// Count zero bits up to the next one bit. `None` once the stream is
    /// exhausted, which also covers the zero padding of the last byte.
    fn read_unary(&mut self) -> Option<u64> {
        let mut quotient = 0u64;
        loop {
            // Whole zero bytes are skipped at once.
            if self.pos % 8 == 0 && self.bytes.get(self.pos / 8) == Some(&0) {
                quotient += 8;
                self.pos += 8;
                continue;
            }
            if self.read_bit()? {
                return Some(quotient);
            }
            quotient += 1;
        }
    }

    fn read_bits(&mut self, width: u32) -> Option<u64> {
        let mut value = 0u64;
        for i in 0..width {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Some(value)
    }
}

/// Pick the divisor exponent for a sorted set.
///
/// Gaps between uniformly hashed values are roughly geometric with mean
/// `avg = (max + 1) / count`; the optimal Rice parameter for a geometric
/// distribution with success probability `p = 1 / avg` is
/// `round(-log2(-log2(1 - p)))`.
pub fn optimal_divisor(sorted: &[u64]) -> u32 {
    let Some(&max) = sorted.last() else {
        return 0;
    };
    let avg = (max as f64 + 1.0) / sorted.len() as f64;
    let prob = 1.0 / avg;
    // ln_1p keeps -log2(1 - p) accurate when p is tiny.
    let div = (-(-(-prob).ln_1p() / LN_2).log2()).round();
    if div.is_finite() && div > 0.0 {
        (div as u32).min(MAX_DIVISOR_BITS)
    } else {
        0
    }
}

/// Golomb-Rice encode `sorted` with an automatically chosen divisor.
///
/// Duplicates are dropped; the input must be sorted ascending.
pub fn golomb_compress(sorted: &[u64]) -> GolombCompressed {
    let div = optimal_divisor(sorted);
    GolombCompressed {
        div,
        bits: golomb_compress_with(sorted, div),
    }
}

/// Golomb-Rice encode `sorted` with the divisor `2^div`.
pub fn golomb_compress_with(sorted: &[u64], div: u32) -> Vec<u8> {
    debug_assert!(div <= MAX_DIVISOR_BITS);
    debug_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

    let mask = (1u64 << div) - 1;
    let mut writer = BitWriter::new();
    let mut prev = None;
    for &value in sorted {
        if prev == Some(value) {
            continue;
        }
        let delta = value - prev.unwrap_or(0);
        writer.push_unary(delta >> div);
        writer.push_bits(delta & mask, div);
        prev = Some(value);
    }
    writer.bytes
}

/// Streaming decoder yielding the encoded values in ascending order.
pub struct GolombDecoder<'a> {
    reader: BitReader<'a>,
    div: u32,
    prefix_sum: u64,
    failed: bool,
}

impl<'a> GolombDecoder<'a> {
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if `div` exceeds
    /// [`MAX_DIVISOR_BITS`]
    pub fn new(bits: &'a [u8], div: u32) -> Result<Self> {
        if div > MAX_DIVISOR_BITS {
            return Err(corrupt(format!("Golomb divisor 2^{} is too large", div)));
        }
        Ok(Self {
            reader: BitReader::new(bits),
            div,
            prefix_sum: 0,
            failed: false,
        })
    }

    fn next_value(&mut self) -> Option<Result<u64>> {
        let quotient = self.reader.read_unary()?;
        let Some(remainder) = self.reader.read_bits(self.div) else {
            return Some(Err(corrupt("truncated Golomb remainder".to_string())));
        };
        let delta = quotient
            .checked_mul(1u64 << self.div)
            .and_then(|high| high.checked_add(remainder));
        let Some(value) = delta.and_then(|d| self.prefix_sum.checked_add(d)) else {
            return Some(Err(corrupt("Golomb value overflows".to_string())));
        };
        self.prefix_sum = value;
        Some(Ok(value))
    }
}

impl Iterator for GolombDecoder<'_> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_value();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

fn corrupt(reason: String) -> PsiError {
    PsiError::InvalidArgument(format!("server setup is corrupt: {}", reason))
}

/// Decode every value of a Golomb-Rice coded set.
///
/// # Errors
/// Returns `PsiError::InvalidArgument` for truncated or overflowing streams
pub fn golomb_decompress(bits: &[u8], div: u32) -> Result<Vec<u64>> {
    GolombDecoder::new(bits, div)?.collect()
}

/// Intersect a coded set with `queries`, a list of `(value, index)` pairs
/// sorted by value, in one linear pass.
///
/// # Returns
/// The indices of all queries whose value is in the set, in the order the
/// queries were given
///
/// # Errors
/// Same contract as [`golomb_decompress`]
pub fn golomb_intersect(bits: &[u8], div: u32, queries: &[(u64, usize)]) -> Result<Vec<usize>> {
    let mut result = Vec::new();
    let mut cursor = 0;
    for value in GolombDecoder::new(bits, div)? {
        if cursor == queries.len() {
            break;
        }
        let value = value?;
        while cursor < queries.len() && queries[cursor].0 < value {
            cursor += 1;
        }
        while cursor < queries.len() && queries[cursor].0 == value {
            result.push(queries[cursor].1);
            cursor += 1;
        }
    }
    Ok(result)
}
