// src/chunks/chunk_mesh.rs

use glam::{Mat4, Vec3};

use crate::error::{Error, Result};

use super::slab::{Attribute, Slab, SlabArena, SlabLayout};

/// Culling sphere for one group, in mesh-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Renderable sub-range of the arena, 1:1 with an active slab.
/// `count` tracks the live vertex count and changes on every geometry
/// update; `start` and the sphere are fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Group {
    pub start: u32,
    pub count: u32,
    pub sphere: BoundingSphere,
}

/// The group list plus the save slot used by the visibility filter.
/// Filter and restore must pair up around every render; the scene guard
/// enforces that, and the debug asserts catch a missed restore.
#[derive(Default)]
pub struct GroupSet {
    groups: Vec<Group>,
    saved: Option<Vec<Group>>,
}

impl GroupSet {
    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn push(&mut self, group: Group) {
        debug_assert!(self.saved.is_none(), "group added while filtered");
        self.groups.push(group);
    }

    pub fn remove_by_start(&mut self, start: u32) -> bool {
        debug_assert!(self.saved.is_none(), "group removed while filtered");
        match self.groups.iter().position(|g| g.start == start) {
            Some(i) => {
                self.groups.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn get_by_start_mut(&mut self, start: u32) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.start == start)
    }

    /// Swap in the subset selected by `keep`, saving the full list.
    pub fn filter(&mut self, keep: impl Fn(&Group) -> bool) {
        debug_assert!(self.saved.is_none(), "filter without restore");
        let full = self.groups.clone();
        self.groups.retain(|g| keep(g));
        self.saved = Some(full);
    }

    /// Restore the list saved by [`GroupSet::filter`]. No-op when unfiltered.
    pub fn restore(&mut self) {
        if let Some(full) = self.saved.take() {
            self.groups = full;
        }
    }

    #[cfg(test)]
    pub fn is_filtered(&self) -> bool {
        self.saved.is_some()
    }
}

/// Update payload for one slab: four parallel attribute arrays with a
/// consistent vertex count (positions and barycentrics carry 3 floats per
/// vertex, ids and indices one per vertex).
pub struct GeometryUpdate<'a> {
    pub positions: &'a [f32],
    pub barycentrics: &'a [f32],
    pub ids: &'a [f32],
    pub indices: &'a [f32],
}

/// Aggregate geometry for one streamed region: the arena, the active and
/// free slab lists, and the group set mirroring the active slabs.
pub struct ChunkMesh {
    pub mesh_id: u32,
    pub origin: Vec3,
    pub parcel_size: u32,
    pub subparcel_size: u32,

    arena: SlabArena,
    slabs: Vec<Slab>,
    free_slabs: Vec<Slab>,
    /// Monotonic slot cursor; slots above it have never been claimed.
    next_slot: u32,

    pub groups: GroupSet,
}

impl ChunkMesh {
    pub fn new(
        device: &wgpu::Device,
        mesh_id: u32,
        origin: Vec3,
        parcel_size: u32,
        subparcel_size: u32,
        layout: SlabLayout,
    ) -> Self {
        let arena = SlabArena::new(device, &format!("chunk_{mesh_id}_arena"), layout);
        Self {
            mesh_id,
            origin,
            parcel_size,
            subparcel_size,
            arena,
            slabs: Vec::new(),
            free_slabs: Vec::new(),
            next_slot: 0,
            groups: GroupSet::default(),
        }
    }

    #[inline]
    pub fn arena(&self) -> &SlabArena {
        &self.arena
    }

    #[inline]
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_translation(self.origin)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    #[inline]
    pub fn active_slabs(&self) -> &[Slab] {
        &self.slabs
    }

    fn sphere_for(&self, x: i32, y: i32, z: i32) -> BoundingSphere {
        let s = self.subparcel_size as f32;
        let half = s / 2.0;
        BoundingSphere {
            center: Vec3::new(x as f32, y as f32, z as f32) * s + Vec3::splat(half),
            radius: (half * half * 3.0).sqrt(),
        }
    }

    /// Existing slab at `(x,y,z)`, or a slot claimed from the freelist, or
    /// the next unused slot. Linear scan; active slab counts stay small.
    pub fn get_slab(&mut self, x: i32, y: i32, z: i32) -> Result<Slab> {
        if let Some(slab) = self
            .slabs
            .iter()
            .find(|s| s.x == x && s.y == y && s.z == z)
        {
            return Ok(*slab);
        }

        let slot = match self.free_slabs.pop() {
            Some(free) => free.slot,
            None => {
                let layout = self.arena.layout();
                if self.next_slot >= layout.num_slices {
                    return Err(Error::SlabCapacity {
                        requested: self.next_slot,
                        num_slices: layout.num_slices,
                    });
                }
                let slot = self.next_slot;
                self.next_slot += 1;
                slot
            }
        };

        let slab = Slab { x, y, z, slot };
        self.slabs.push(slab);
        // Fresh groups start empty; update_geometry sets the live count.
        self.groups.push(Group {
            start: slot * self.arena.layout().vertices_per_slice,
            count: 0,
            sphere: self.sphere_for(x, y, z),
        });
        Ok(slab)
    }

    /// Detach the slab at `(x,y,z)`: its group leaves the render set and the
    /// slab moves to the freelist. Buffer bytes stay as-is; the next claimant
    /// of the slot must rewrite all four attribute arrays.
    pub fn remove_slab(&mut self, x: i32, y: i32, z: i32) -> bool {
        let Some(i) = self
            .slabs
            .iter()
            .position(|s| s.x == x && s.y == y && s.z == z)
        else {
            return false;
        };

        let slab = self.slabs.remove(i);
        let start = slab.slot * self.arena.layout().vertices_per_slice;
        let removed = self.groups.remove_by_start(start);
        debug_assert!(removed, "active slab had no group");
        self.free_slabs.push(slab);
        true
    }

    /// Copy the caller's attribute arrays into the slab's fixed views and
    /// refresh the group's visible vertex count.
    pub fn update_geometry(&mut self, queue: &wgpu::Queue, slab: Slab, update: &GeometryUpdate) {
        let vertex_count = update.positions.len() / 3;
        debug_assert_eq!(update.positions.len() % 3, 0);
        debug_assert_eq!(update.barycentrics.len(), update.positions.len());
        debug_assert_eq!(update.ids.len(), vertex_count);
        debug_assert_eq!(update.indices.len(), vertex_count);

        self.arena
            .write(queue, Attribute::Position, slab.slot, update.positions);
        self.arena
            .write(queue, Attribute::Barycentric, slab.slot, update.barycentrics);
        self.arena.write(queue, Attribute::Id, slab.slot, update.ids);
        self.arena
            .write(queue, Attribute::TriIndex, slab.slot, update.indices);

        let start = slab.slot * self.arena.layout().vertices_per_slice;
        if let Some(group) = self.groups.get_by_start_mut(start) {
            group.count = vertex_count as u32;
        } else {
            debug_assert!(false, "update_geometry on detached slab");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(start: u32) -> Group {
        Group {
            start,
            count: 3,
            sphere: BoundingSphere {
                center: Vec3::splat(start as f32),
                radius: 1.0,
            },
        }
    }

    #[test]
    fn filter_restore_round_trips_exactly() {
        let mut set = GroupSet::default();
        for start in [0, 30, 60, 90] {
            set.push(group(start));
        }
        let before = set.groups().to_vec();

        set.filter(|g| g.start >= 60);
        assert_eq!(set.groups().len(), 2);
        assert!(set.is_filtered());

        set.restore();
        assert_eq!(set.groups(), before.as_slice());
        assert!(!set.is_filtered());
    }

    #[test]
    fn restore_without_filter_is_a_no_op() {
        let mut set = GroupSet::default();
        set.push(group(0));
        set.restore();
        assert_eq!(set.groups().len(), 1);
    }

    #[test]
    fn filter_keeping_nothing_still_restores() {
        let mut set = GroupSet::default();
        set.push(group(0));
        set.push(group(30));

        set.filter(|_| false);
        assert!(set.groups().is_empty());
        set.restore();
        assert_eq!(set.groups().len(), 2);
    }
}
