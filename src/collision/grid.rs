//! Uniform-grid broad phase
//!
//! World space is quantized into square cells; each entity's AABB is
//! registered in every cell it overlaps, and a query unions the buckets its
//! box touches. A reverse index (handle to occupied cell range) makes removal
//! O(cells occupied) instead of a full sweep, and lets a move skip the bucket
//! churn entirely when the entity stays within its current cells.

use std::collections::{HashMap, HashSet};

use glam::IVec2;

use super::aabb::Aabb;
use crate::error::EngineError;
use crate::pool::Handle;

/// Inclusive range of cell keys an AABB overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: IVec2,
    max: IVec2,
}

impl CellRange {
    fn iter(self) -> impl Iterator<Item = IVec2> {
        (self.min.x..=self.max.x)
            .flat_map(move |x| (self.min.y..=self.max.y).map(move |y| IVec2::new(x, y)))
    }
}

#[derive(Debug)]
struct Entry {
    aabb: Aabb,
    range: CellRange,
}

/// Spatial partitioning grid for broad-phase collision queries.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<IVec2, Vec<Handle>>,
    entries: HashMap<Handle, Entry>,
}

impl SpatialGrid {
    /// Create a grid with the given cell size in world units.
    ///
    /// Fails with [`EngineError::OutOfRangeConfig`] unless the cell size is
    /// positive and finite.
    pub fn new(cell_size: f32) -> Result<Self, EngineError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(EngineError::OutOfRangeConfig(
                "grid cell size must be positive and finite",
            ));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            entries: HashMap::new(),
        })
    }

    /// Cell size this grid was built with.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_range(&self, aabb: &Aabb) -> CellRange {
        CellRange {
            min: IVec2::new(
                (aabb.min.x / self.cell_size).floor() as i32,
                (aabb.min.y / self.cell_size).floor() as i32,
            ),
            max: IVec2::new(
                (aabb.max.x / self.cell_size).floor() as i32,
                (aabb.max.y / self.cell_size).floor() as i32,
            ),
        }
    }

    fn link(&mut self, handle: Handle, range: CellRange) {
        for cell in range.iter() {
            self.cells.entry(cell).or_default().push(handle);
        }
    }

    fn unlink(&mut self, handle: Handle, range: CellRange) {
        for cell in range.iter() {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|&h| h != handle);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Register `handle` under `aabb`, adding it to every cell the box
    /// overlaps. Re-inserting a registered handle behaves like
    /// [`SpatialGrid::update`].
    pub fn insert(&mut self, handle: Handle, aabb: Aabb) {
        if self.entries.contains_key(&handle) {
            self.update(handle, aabb);
            return;
        }
        let range = self.cell_range(&aabb);
        self.link(handle, range);
        self.entries.insert(handle, Entry { aabb, range });
    }

    /// Unregister `handle` from exactly the cells it occupies.
    ///
    /// Returns whether the handle was registered.
    pub fn remove(&mut self, handle: Handle) -> bool {
        match self.entries.remove(&handle) {
            Some(entry) => {
                self.unlink(handle, entry.range);
                true
            }
            None => false,
        }
    }

    /// Re-register `handle` under a new box.
    ///
    /// When the new box occupies the same cell range as the old one, only the
    /// stored AABB is refreshed and the buckets are left untouched, which
    /// keeps slow-moving entities cheap. An unregistered handle is inserted.
    pub fn update(&mut self, handle: Handle, aabb: Aabb) {
        let new_range = self.cell_range(&aabb);
        match self.entries.get_mut(&handle) {
            Some(entry) if entry.range == new_range => {
                entry.aabb = aabb;
            }
            Some(entry) => {
                let old_range = entry.range;
                entry.aabb = aabb;
                entry.range = new_range;
                self.unlink(handle, old_range);
                self.link(handle, new_range);
            }
            None => {
                self.link(handle, new_range);
                self.entries.insert(
                    handle,
                    Entry {
                        aabb,
                        range: new_range,
                    },
                );
            }
        }
    }

    /// Broad-phase query: every registered handle whose box overlaps `aabb`.
    ///
    /// Candidates are de-duplicated; ordering is unspecified, so
    /// deterministic consumers should post-sort by handle. This is only the
    /// broad phase — confirm candidates with an exact narrow-phase test
    /// before treating them as collisions.
    pub fn query(&self, aabb: &Aabb) -> Vec<Handle> {
        let range = self.cell_range(aabb);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for cell in range.iter() {
            let Some(bucket) = self.cells.get(&cell) else {
                continue;
            };
            for &handle in bucket {
                if !seen.insert(handle) {
                    continue;
                }
                // Cheap AABB-level reject of same-cell neighbours
                if self.entries[&handle].aabb.intersects(aabb) {
                    out.push(handle);
                }
            }
        }
        out
    }

    /// The box `handle` is currently registered under.
    pub fn aabb_of(&self, handle: Handle) -> Option<Aabb> {
        self.entries.get(&handle).map(|entry| entry.aabb)
    }

    /// Number of registered handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }
}
