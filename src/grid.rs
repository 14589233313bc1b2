use glam::{IVec3, Vec3};

use crate::config::GridConfig;
use crate::error::SolverError;
use crate::sort::{sort_pairs, SortScratch};

/// Uniform spatial grid over a fixed cell block, rebuilt every sub-step.
///
/// Cells are addressed by flooring positions into the block and wrapping
/// each axis with a positive modulo, so out-of-domain particles still land
/// in valid cells (they may alias distant cells as scan candidates; the
/// distance checks downstream gate all actual interactions). Construction
/// sorts (cell, particle) pairs by cell id and records the first sorted
/// index of each occupied cell, giving contiguous per-cell runs.
pub struct SpatialGrid {
    dims: IVec3,
    cell_size: f32,
    origin: Vec3,
    num_cells: usize,
    max_per_cell: usize,
    cell_id: Vec<u32>,
    particle_id: Vec<u32>,
    sorted_cell_id: Vec<u32>,
    sorted_particle_id: Vec<u32>,
    /// First sorted index per cell, -1 when the cell is empty.
    cell_start: Vec<i32>,
}

impl SpatialGrid {
    pub fn new(
        config: &GridConfig,
        max_particles: usize,
        max_per_cell: usize,
    ) -> Result<Self, SolverError> {
        let num_cells = config.cell_count();
        let mut cell_start = Vec::new();
        cell_start
            .try_reserve_exact(num_cells)
            .map_err(|_| SolverError::AllocationFailed("grid cell table"))?;
        cell_start.resize(num_cells, -1);

        Ok(Self {
            dims: config.dims.as_ivec3(),
            cell_size: config.cell_size,
            origin: config.origin,
            num_cells,
            max_per_cell,
            cell_id: reserved(max_particles, "grid cell ids")?,
            particle_id: reserved(max_particles, "grid particle ids")?,
            sorted_cell_id: reserved(max_particles, "grid sorted cell ids")?,
            sorted_particle_id: reserved(max_particles, "grid sorted particle ids")?,
            cell_start,
        })
    }

    /// Rebuild the cell lookup from scratch for the given positions.
    pub fn update(&mut self, positions: &[Vec3], scratch: &mut SortScratch) {
        let n = positions.len();
        self.cell_start.fill(-1);

        self.cell_id.clear();
        self.particle_id.clear();
        for (i, &p) in positions.iter().enumerate() {
            let cell = self.cell_of(p);
            self.cell_id.push(cell);
            self.particle_id.push(i as u32);
        }

        self.sorted_cell_id.clear();
        self.sorted_cell_id.extend_from_slice(&self.cell_id);
        self.sorted_particle_id.clear();
        self.sorted_particle_id.extend_from_slice(&self.particle_id);

        let max_key = self.num_cells.saturating_sub(1) as u32;
        sort_pairs(
            &mut self.sorted_cell_id,
            &mut self.sorted_particle_id,
            max_key,
            scratch,
        );

        if n > 0 {
            self.cell_start[self.sorted_cell_id[0] as usize] = 0;
            for i in 1..n {
                let cell = self.sorted_cell_id[i];
                if cell != self.sorted_cell_id[i - 1] {
                    self.cell_start[cell as usize] = i as i32;
                }
            }
        }
    }

    /// Visit candidate particle indices in the (2k+1)^3 cell block around
    /// `pos`. Each cell's sorted run is scanned from its start, truncating
    /// after `max_per_cell` entries; callers do their own distance checks.
    pub fn for_each_neighbour<F: FnMut(usize)>(&self, pos: Vec3, range: i32, mut f: F) {
        let center = self.cell_coords(pos);
        for dz in -range..=range {
            for dy in -range..=range {
                for dx in -range..=range {
                    let cell = self.index_of(center + IVec3::new(dx, dy, dz));
                    let start = self.cell_start[cell as usize];
                    if start < 0 {
                        continue;
                    }
                    let mut i = start as usize;
                    let mut scanned = 0;
                    while i < self.sorted_cell_id.len()
                        && self.sorted_cell_id[i] == cell
                        && scanned < self.max_per_cell
                    {
                        f(self.sorted_particle_id[i] as usize);
                        i += 1;
                        scanned += 1;
                    }
                }
            }
        }
    }

    /// Unwrapped integer cell coordinates of a position.
    #[inline]
    pub fn cell_coords(&self, p: Vec3) -> IVec3 {
        ((p - self.origin) / self.cell_size).floor().as_ivec3()
    }

    /// Linear cell id of a position, after wrapping.
    #[inline]
    pub fn cell_of(&self, p: Vec3) -> u32 {
        self.index_of(self.cell_coords(p))
    }

    #[inline]
    fn index_of(&self, coords: IVec3) -> u32 {
        let w = IVec3::new(
            coords.x.rem_euclid(self.dims.x),
            coords.y.rem_euclid(self.dims.y),
            coords.z.rem_euclid(self.dims.z),
        );
        (w.x + self.dims.x * (w.y + self.dims.y * w.z)) as u32
    }

    pub fn cell_start_of(&self, cell: u32) -> i32 {
        self.cell_start[cell as usize]
    }

    pub fn sorted_cell_ids(&self) -> &[u32] {
        &self.sorted_cell_id
    }

    pub fn sorted_particle_ids(&self) -> &[u32] {
        &self.sorted_particle_id
    }
}

fn reserved(n: usize, what: &'static str) -> Result<Vec<u32>, SolverError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|_| SolverError::AllocationFailed(what))?;
    Ok(v)
}
