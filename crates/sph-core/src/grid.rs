use glam::{IVec3, Vec3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::SimError;

/// Marks a hash bucket with no particles in the offsets table.
pub const EMPTY_OFFSET: u32 = u32::MAX;

/// One particle's slot in the sorted hash array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpatialEntry {
    pub index: u32,
    /// Bucket index in `0..table_size`.
    pub hash: u32,
    /// Integer grid cell the particle sits in.
    pub cell: IVec3,
}

/// Uniform spatial hash grid for neighbor queries.
///
/// Every step the particles are hashed into buckets, the `(hash, index)`
/// entries are fully sorted, and an offsets table records where each bucket's
/// run starts. Buckets may be shared by several cells (hash collisions);
/// queries filter by cell so that only the requested cell is reported.
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    table_size: usize,
    /// Entries sorted by hash after `sort_and_offsets`.
    entries: Vec<SpatialEntry>,
    /// offsets[hash] = first index in `entries` with that hash, or EMPTY_OFFSET.
    offsets: Vec<u32>,
}

impl SpatialHashGrid {
    /// Create grid with given cell size and hash table size.
    ///
    /// `cell_size` should equal the smoothing radius so the 3x3x3 block
    /// around a particle covers its whole kernel support.
    pub fn new(cell_size: f32, table_size: usize) -> Result<Self, SimError> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(SimError::InvalidCellSize(cell_size));
        }
        let table_size = table_size.max(1);
        Ok(Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            table_size,
            entries: Vec::new(),
            offsets: vec![EMPTY_OFFSET; table_size],
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Sorted entries from the last build.
    pub fn entries(&self) -> &[SpatialEntry] {
        &self.entries
    }

    /// Offsets table from the last build.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Build the grid from current positions: hash, sort, rebuild offsets.
    pub fn build(&mut self, positions: &[Vec3]) {
        self.hash_particles(positions);
        self.sort_and_offsets();
    }

    /// Compute the unsorted `(index, hash, cell)` entry for every particle.
    pub fn hash_particles(&mut self, positions: &[Vec3]) {
        self.entries.clear();
        self.entries.reserve(positions.len());
        for (i, &pos) in positions.iter().enumerate() {
            let cell = self.cell_coords(pos);
            self.entries.push(SpatialEntry {
                index: i as u32,
                hash: self.hash_cell(cell),
                cell,
            });
        }
    }

    /// Sort entries by hash and derive the offsets table from that order.
    pub fn sort_and_offsets(&mut self) {
        #[cfg(feature = "parallel")]
        self.entries.par_sort_unstable_by_key(|e| (e.hash, e.index));
        #[cfg(not(feature = "parallel"))]
        self.entries.sort_unstable_by_key(|e| (e.hash, e.index));

        self.offsets.fill(EMPTY_OFFSET);
        let mut prev = None;
        for (k, entry) in self.entries.iter().enumerate() {
            if prev != Some(entry.hash) {
                self.offsets[entry.hash as usize] = k as u32;
                prev = Some(entry.hash);
            }
        }
    }

    /// Particle indices stored in `cell`.
    ///
    /// One offsets lookup, then a scan until the hash changes; entries from
    /// colliding cells in the same bucket are skipped.
    pub fn query_cell(&self, cell: IVec3) -> impl Iterator<Item = u32> + '_ {
        let hash = self.hash_cell(cell);
        let start = self.offsets[hash as usize];
        let run = if start == EMPTY_OFFSET {
            &self.entries[0..0]
        } else {
            &self.entries[start as usize..]
        };
        run.iter()
            .take_while(move |e| e.hash == hash)
            .filter(move |e| e.cell == cell)
            .map(|e| e.index)
    }

    /// Query all particles within the given position's cell and its 26
    /// neighbors (3x3x3). Calls `callback(particle_index)` for each one.
    /// The caller is responsible for distance checks.
    pub fn query_neighbors<F: FnMut(u32)>(&self, pos: Vec3, mut callback: F) {
        let center = self.cell_coords(pos);
        for dx in -1..=1_i32 {
            for dy in -1..=1_i32 {
                for dz in -1..=1_i32 {
                    for idx in self.query_cell(center.wrapping_add(IVec3::new(dx, dy, dz))) {
                        callback(idx);
                    }
                }
            }
        }
    }

    /// Hash function: cell coords -> table index
    #[inline]
    pub fn hash_cell(&self, cell: IVec3) -> u32 {
        let h = (cell.x as u32).wrapping_mul(73856093)
            ^ (cell.y as u32).wrapping_mul(19349663)
            ^ (cell.z as u32).wrapping_mul(83492791);
        (h as usize % self.table_size) as u32
    }

    /// Convert world position to cell coordinates
    #[inline]
    pub fn cell_coords(&self, pos: Vec3) -> IVec3 {
        (pos * self.inv_cell_size).floor().as_ivec3()
    }
}
