//! Cache geometry and address decomposition.

use std::fmt;

use thiserror::Error;

/// Fixed width of simulated addresses. Tag extraction aligns to the top of
/// this range, so keep the width explicit rather than buried in shift math.
pub const ADDRESS_BITS: u32 = 32;

/// 4-byte words, so the byte offset inside a word is always 2 bits.
pub const BYTE_OFFSET_BITS: u32 = 2;

pub const WORD_BYTES: u32 = 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("block size {0}B is not a power of two")]
    BlockSizeNotPowerOfTwo(u32),
    #[error("block size {0}B is below one word ({WORD_BYTES}B)")]
    BlockSizeTooSmall(u32),
    #[error("associativity {0} is not a nonzero power of two")]
    BadAssociativity(u32),
    #[error("capacity {capacity_bytes}B does not divide evenly into {associativity}-way sets of {block_size}B blocks")]
    CapacityNotDivisible {
        capacity_bytes: u32,
        block_size: u32,
        associativity: u32,
    },
    #[error("capacity {0}KiB does not fit in a 32-bit byte count")]
    CapacityOverflow(u32),
    #[error("{block_size}B blocks of {associativity} ways overflow a 32-bit set size")]
    SetSizeOverflow {
        block_size: u32,
        associativity: u32,
    },
    #[error("derived set count {0} is not a nonzero power of two")]
    BadSetCount(u32),
    #[error("a miss latency of 0 cycles would make misses indistinguishable from hits")]
    ZeroMissLatency,
    #[error("index and offset fields ({0} bits) leave no room for a tag in a {ADDRESS_BITS}-bit address")]
    NoTagBits(u32),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Validated topology of one cache: every field here is checked once at
/// construction so the decoder can use plain shift/mask arithmetic after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    capacity_bytes: u32,
    block_size: u32,
    associativity: u32,
    num_sets: u32,
    miss_latency: u32,
}

/// One decoded address, split per the fixed 32-bit convention:
/// `[ tag | index | word offset | byte offset ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFields {
    pub tag: u32,
    pub index: u32,
    pub word_offset: u32,
    pub byte_offset: u32,
}

impl CacheGeometry {
    pub fn new(
        capacity_kb: u32,
        block_size: u32,
        associativity: u32,
        miss_latency: u32,
    ) -> Result<Self> {
        if block_size < WORD_BYTES {
            return Err(ConfigError::BlockSizeTooSmall(block_size));
        }
        if !block_size.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo(block_size));
        }
        if associativity == 0 || !associativity.is_power_of_two() {
            return Err(ConfigError::BadAssociativity(associativity));
        }
        if miss_latency == 0 {
            return Err(ConfigError::ZeroMissLatency);
        }
        let capacity_bytes = capacity_kb
            .checked_mul(1024)
            .ok_or(ConfigError::CapacityOverflow(capacity_kb))?;
        let set_bytes = block_size
            .checked_mul(associativity)
            .ok_or(ConfigError::SetSizeOverflow {
                block_size,
                associativity,
            })?;
        if capacity_bytes % set_bytes != 0 {
            return Err(ConfigError::CapacityNotDivisible {
                capacity_bytes,
                block_size,
                associativity,
            });
        }
        let num_sets = (capacity_bytes / block_size) / associativity;
        if num_sets == 0 || !num_sets.is_power_of_two() {
            return Err(ConfigError::BadSetCount(num_sets));
        }
        let geometry = Self {
            capacity_bytes,
            block_size,
            associativity,
            num_sets,
            miss_latency,
        };
        let non_tag_bits = BYTE_OFFSET_BITS + geometry.word_offset_bits() + geometry.index_bits();
        if non_tag_bits >= ADDRESS_BITS {
            return Err(ConfigError::NoTagBits(non_tag_bits));
        }
        Ok(geometry)
    }

    pub fn capacity_bytes(&self) -> u32 {
        self.capacity_bytes
    }
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
    pub fn associativity(&self) -> u32 {
        self.associativity
    }
    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }
    pub fn miss_latency(&self) -> u32 {
        self.miss_latency
    }

    pub fn word_offset_bits(&self) -> u32 {
        log2_exact(self.block_size / WORD_BYTES)
    }
    pub fn index_bits(&self) -> u32 {
        log2_exact(self.num_sets)
    }
    pub fn tag_bits(&self) -> u32 {
        ADDRESS_BITS - self.index_bits() - self.word_offset_bits() - BYTE_OFFSET_BITS
    }

    /// Splits `address` into its fields. Pure with respect to the geometry;
    /// the tag is taken from the top `tag_bits()` of the 32-bit address.
    pub fn decompose(&self, address: u32) -> AddressFields {
        let word_bits = self.word_offset_bits();
        let index_bits = self.index_bits();
        AddressFields {
            tag: address >> (ADDRESS_BITS - self.tag_bits()),
            index: (address >> (BYTE_OFFSET_BITS + word_bits)) & field_mask(index_bits),
            word_offset: (address >> BYTE_OFFSET_BITS) & field_mask(word_bits),
            byte_offset: address & field_mask(BYTE_OFFSET_BITS),
        }
    }
}

impl fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}B capacity, {}B blocks, {}-way, {} sets, {}-cycle miss",
            self.capacity_bytes, self.block_size, self.associativity, self.num_sets,
            self.miss_latency
        )
    }
}

/// Exact base-2 log. Callers guarantee `v` is a nonzero power of two;
/// `CacheGeometry::new` rejects anything else up front.
fn log2_exact(v: u32) -> u32 {
    debug_assert!(v.is_power_of_two());
    v.trailing_zeros()
}

fn field_mask(bits: u32) -> u32 {
    if bits == 0 {
        0
    } else {
        (1 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_geometry() -> CacheGeometry {
        // 1KiB / 32B blocks / 2-way => 16 sets
        CacheGeometry::new(1, 32, 2, 100).unwrap()
    }

    #[test]
    fn test_field_widths() {
        let g = small_geometry();
        assert_eq!(g.num_sets(), 16);
        assert_eq!(g.word_offset_bits(), 3);
        assert_eq!(g.index_bits(), 4);
        assert_eq!(g.tag_bits(), 23);
    }

    #[test]
    fn test_decompose() {
        let g = small_geometry();
        let f = g.decompose(0xDEAD_BEEF);
        assert_eq!(f.byte_offset, 0xDEAD_BEEF & 0b11);
        assert_eq!(f.word_offset, (0xDEAD_BEEF >> 2) & 0b111);
        assert_eq!(f.index, (0xDEAD_BEEF >> 5) & 0xF);
        assert_eq!(f.tag, 0xDEAD_BEEF >> 9);
    }

    #[test]
    fn test_decompose_fully_associative() {
        // one set: index field collapses to 0 bits
        let g = CacheGeometry::new(1, 32, 32, 100).unwrap();
        assert_eq!(g.num_sets(), 1);
        assert_eq!(g.index_bits(), 0);
        assert_eq!(g.decompose(0xFFFF_FFFF).index, 0);
        assert_eq!(g.decompose(0xFFFF_FFFF).tag, 0xFFFF_FFFF >> 5);
    }

    #[test]
    fn test_rejects_bad_block_size() {
        assert_eq!(
            CacheGeometry::new(1, 24, 2, 100),
            Err(ConfigError::BlockSizeNotPowerOfTwo(24))
        );
        assert_eq!(
            CacheGeometry::new(1, 2, 2, 100),
            Err(ConfigError::BlockSizeTooSmall(2))
        );
    }

    #[test]
    fn test_rejects_bad_associativity() {
        assert_eq!(
            CacheGeometry::new(1, 32, 0, 100),
            Err(ConfigError::BadAssociativity(0))
        );
        assert_eq!(
            CacheGeometry::new(1, 32, 3, 100),
            Err(ConfigError::BadAssociativity(3))
        );
    }

    #[test]
    fn test_rejects_bad_set_count() {
        // 3KiB / 32B / 2-way => 48 sets, not a power of two
        assert_eq!(
            CacheGeometry::new(3, 32, 2, 100),
            Err(ConfigError::BadSetCount(48))
        );
        // zero capacity divides evenly but yields zero sets
        assert_eq!(
            CacheGeometry::new(0, 32, 2, 100),
            Err(ConfigError::BadSetCount(0))
        );
    }

    #[test]
    fn test_rejects_overflowing_capacity() {
        // 4194305KiB exceeds a 32-bit byte count; wrapping would alias it to
        // a tiny 1KiB geometry
        assert_eq!(
            CacheGeometry::new(4_194_305, 32, 2, 100),
            Err(ConfigError::CapacityOverflow(4_194_305))
        );
        assert_eq!(
            CacheGeometry::new(u32::MAX, 32, 2, 100),
            Err(ConfigError::CapacityOverflow(u32::MAX))
        );
    }

    #[test]
    fn test_rejects_overflowing_set_size() {
        // both factors are valid powers of two but their product wraps to 0
        assert_eq!(
            CacheGeometry::new(1, 1 << 31, 1 << 31, 100),
            Err(ConfigError::SetSizeOverflow {
                block_size: 1 << 31,
                associativity: 1 << 31,
            })
        );
    }

    #[test]
    fn test_rejects_zero_miss_latency() {
        assert_eq!(
            CacheGeometry::new(1, 32, 2, 0),
            Err(ConfigError::ZeroMissLatency)
        );
    }

    #[test]
    fn test_rejects_indivisible_capacity() {
        assert_eq!(
            CacheGeometry::new(1, 64, 32, 100),
            Err(ConfigError::CapacityNotDivisible {
                capacity_bytes: 1024,
                block_size: 64,
                associativity: 32,
            })
        );
    }
}
