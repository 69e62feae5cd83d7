//! Gear rolling-hash boundary detection
//!
//! Chunk boundaries are content-defined: a 64-bit gear hash rolls over the
//! input and a boundary is cut wherever its low bits are zero, so inserting
//! or deleting bytes only disturbs boundaries near the edit. The 256-entry
//! gear table is expanded from the secret's polynomial, which makes the
//! boundary positions themselves secret-dependent.

/// Chunk size bounds. `avg` is rounded up to a power of two to form the
/// boundary mask; the final chunk of a stream may be shorter than `min`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSizes {
    pub min: usize,
    pub avg: usize,
    pub max: usize,
}

impl ChunkSizes {
    /// Default bounds: min 512 KiB, avg 1 MiB, max 8 MiB.
    pub const DEFAULT: ChunkSizes = ChunkSizes {
        min: 512 * 1024,
        avg: 1024 * 1024,
        max: 8 * 1024 * 1024,
    };

    /// Small bounds for tests that want many chunks from little data.
    pub const SMALL: ChunkSizes = ChunkSizes {
        min: 2 * 1024,
        avg: 4 * 1024,
        max: 16 * 1024,
    };

    fn mask(&self) -> u64 {
        self.avg.next_power_of_two() as u64 - 1
    }
}

/// Gear hashing shifts one bit per byte, so only the last 64 bytes influence
/// the hash at any position.
const WINDOW: usize = 64;

pub(crate) struct GearTable([u64; 256]);

impl GearTable {
    /// Expand the secret's polynomial into the gear table with splitmix64.
    pub(crate) fn derive(polynomial: u64) -> GearTable {
        let mut state = polynomial;
        let mut table = [0u64; 256];
        for entry in &mut table {
            *entry = splitmix64(&mut state);
        }
        GearTable(table)
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Find the cut point for the next chunk.
///
/// `data` must be either at least `sizes.max` bytes, or the complete
/// remainder of the stream; the returned length is then a valid chunk.
pub(crate) fn cut_point(table: &GearTable, sizes: &ChunkSizes, data: &[u8]) -> usize {
    if data.len() <= sizes.min {
        return data.len();
    }
    let end = data.len().min(sizes.max);
    let mask = sizes.mask();

    // warm the window so the hash at `min` has seen the preceding bytes
    let start = sizes.min.saturating_sub(WINDOW);
    let mut hash = 0u64;
    for (i, &byte) in data[start..end].iter().enumerate() {
        hash = (hash << 1).wrapping_add(table.0[byte as usize]);
        let cut = start + i + 1;
        if cut >= sizes.min && hash & mask == 0 {
            return cut;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_differ_per_polynomial() {
        let a = GearTable::derive(1);
        let b = GearTable::derive(2);
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn table_derivation_is_deterministic() {
        let a = GearTable::derive(0xdead_beef);
        let b = GearTable::derive(0xdead_beef);
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn short_input_is_one_chunk() {
        let table = GearTable::derive(7);
        let data = vec![0xAB; 100];
        assert_eq!(cut_point(&table, &ChunkSizes::SMALL, &data), 100);
    }

    #[test]
    fn cut_respects_bounds() {
        let table = GearTable::derive(7);
        let sizes = ChunkSizes::SMALL;
        let data: Vec<u8> = (0u32..64 * 1024).map(|i| (i * 31 % 251) as u8).collect();
        let cut = cut_point(&table, &sizes, &data);
        assert!(cut >= sizes.min);
        assert!(cut <= sizes.max);
    }
}
