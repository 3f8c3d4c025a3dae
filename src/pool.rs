//! Generational object pooling
//!
//! Entities, particles and other short-lived objects are acquired from and
//! released back to a pool of reusable slots, so steady-state frames allocate
//! nothing. Each slot carries a generation counter that is bumped on release:
//! a handle whose generation no longer matches its slot is stale and is
//! rejected everywhere, which closes the classic ABA hole of recycled
//! indices.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque identifier for a pooled object.
///
/// A handle stays valid until its slot is released; after that, every
/// dereference fails with [`EngineError::InvalidHandle`] even if the slot has
/// been reused. Handles order by slot index then generation, so tests can
/// post-sort broad-phase candidates deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index (stable for the lifetime of the handle).
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued under.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// What a pool does when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Growth {
    /// `acquire` fails with [`EngineError::PoolExhausted`].
    #[default]
    Fixed,
    /// The backing storage grows by one slot.
    OnDemand,
}

/// A vacant payload is the "inactive" flag.
#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    payload: Option<T>,
}

/// Reusable-slot allocator with O(1) acquire and release.
#[derive(Debug)]
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    /// Free-list stack of released slot indices.
    free: Vec<u32>,
    growth: Growth,
    capacity: usize,
    active: usize,
}

impl<T> ObjectPool<T> {
    /// Create a pool with the given capacity and growth policy.
    ///
    /// Fails with [`EngineError::OutOfRangeConfig`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize, growth: Growth) -> Result<Self, EngineError> {
        if capacity == 0 {
            return Err(EngineError::OutOfRangeConfig("pool capacity must be positive"));
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            growth,
            capacity,
            active: 0,
        })
    }

    /// Take a free slot, store `payload` in it and return its handle.
    ///
    /// With [`Growth::Fixed`] and no free slot this fails with
    /// [`EngineError::PoolExhausted`]; with [`Growth::OnDemand`] the pool
    /// grows instead.
    pub fn acquire(&mut self, payload: T) -> Result<Handle, EngineError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.payload = Some(payload);
            self.active += 1;
            return Ok(Handle {
                index,
                generation: slot.generation,
            });
        }

        if self.slots.len() == self.capacity {
            match self.growth {
                Growth::Fixed => {
                    return Err(EngineError::PoolExhausted {
                        capacity: self.capacity,
                    });
                }
                Growth::OnDemand => {
                    self.capacity += 1;
                    log::debug!("object pool grew to {} slots", self.capacity);
                }
            }
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            payload: Some(payload),
        });
        self.active += 1;
        Ok(Handle {
            index,
            generation: 0,
        })
    }

    /// Release the slot behind `handle`, returning its payload.
    ///
    /// Idempotent: a stale or already-released handle is a no-op returning
    /// `None`. Releasing bumps the slot generation, so every retained copy of
    /// the handle becomes invalid.
    pub fn release(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let payload = slot.payload.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.active -= 1;
        Some(payload)
    }

    /// Borrow the payload behind `handle`.
    pub fn get(&self, handle: Handle) -> Result<&T, EngineError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.payload.as_ref())
            .ok_or(EngineError::InvalidHandle(handle))
    }

    /// Mutably borrow the payload behind `handle`.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, EngineError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.payload.as_mut())
            .ok_or(EngineError::InvalidHandle(handle))
    }

    /// Whether `handle` still refers to a live slot.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    /// Iterate live slots in ascending slot-index order.
    ///
    /// Lazy and restartable; vacant slots are skipped. The fixed order keeps
    /// per-frame iteration reproducible.
    pub fn iter_active(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.payload.as_ref().map(|payload| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    payload,
                )
            })
        })
    }

    /// Like [`ObjectPool::iter_active`], with mutable payload access.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.payload.as_mut().map(|payload| {
                    (
                        Handle {
                            index: index as u32,
                            generation,
                        },
                        payload,
                    )
                })
            })
    }

    /// Release every live slot at once.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.payload.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.active = 0;
    }

    /// Number of live slots.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Current capacity (grows under [`Growth::OnDemand`]).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
