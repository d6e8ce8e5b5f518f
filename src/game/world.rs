//! The entity model: placed objects and the tile background.
//!
//! Objects live in a dense vector in placement order. An object's position
//! in that vector is not stable; the `id → slot` index is patched on every
//! insertion and deletion and is the only way to find an object by id.

use std::collections::HashMap;

use crate::project::{Grid, Layer};
use crate::sprite::NameTable;

/// A live object. Positions are screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub sprite: usize,
    pub layer: Layer,
}

#[derive(Debug, Clone)]
pub struct World {
    grid: Grid,
    objects: Vec<GameObject>,
    index: HashMap<String, usize>,
    background: Vec<usize>,
    tile_names: NameTable,
    object_names: NameTable,
}

impl World {
    pub fn new(
        grid: Grid,
        objects: Vec<GameObject>,
        background: Vec<usize>,
        tile_names: NameTable,
        object_names: NameTable,
    ) -> Self {
        let mut world = Self {
            grid,
            objects,
            index: HashMap::new(),
            background,
            tile_names,
            object_names,
        };
        world.reindex_from(0);
        world
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&GameObject> {
        self.objects.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut GameObject> {
        self.objects.get_mut(slot)
    }

    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Append an object; returns its slot. The caller guarantees the id is
    /// unused.
    pub fn insert(&mut self, object: GameObject) -> usize {
        let slot = self.objects.len();
        self.index.insert(object.id.clone(), slot);
        self.objects.push(object);
        slot
    }

    /// Remove an object by id. Objects after it shift down one slot.
    pub fn remove(&mut self, id: &str) -> Option<(usize, GameObject)> {
        let slot = self.index.remove(id)?;
        let object = self.objects.remove(slot);
        self.reindex_from(slot);
        Some((slot, object))
    }

    fn reindex_from(&mut self, start: usize) {
        for (slot, object) in self.objects.iter().enumerate().skip(start) {
            self.index.insert(object.id.clone(), slot);
        }
    }

    /// Whether a sprite at `(x, y)` lies entirely on the map.
    pub fn fits(&self, x: f64, y: f64) -> bool {
        let max = f64::from(self.grid.map_pixels() - self.grid.sprite_pixels());
        (0.0..=max).contains(&x) && (0.0..=max).contains(&y)
    }

    fn cell(&self, tx: f64, ty: f64) -> Option<usize> {
        let size = f64::from(self.grid.map_size);
        if !(0.0..size).contains(&tx) || !(0.0..size).contains(&ty) {
            return None;
        }
        Some(ty.floor() as usize * self.grid.map_size as usize + tx.floor() as usize)
    }

    pub fn background(&self) -> &[usize] {
        &self.background
    }

    /// Name of the tile at tile coordinates, `None` off the map.
    pub fn tile_at(&self, tx: f64, ty: f64) -> Option<&str> {
        let cell = self.cell(tx, ty)?;
        self.tile_names.name(*self.background.get(cell)?)
    }

    /// Set a map cell. Returns `false` if the coordinates are off the map.
    pub fn set_tile_at(&mut self, tx: f64, ty: f64, tile: usize) -> bool {
        match self.cell(tx, ty).and_then(|cell| self.background.get_mut(cell)) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    pub fn tile_index(&self, name: &str) -> Option<usize> {
        self.tile_names.index_of(name)
    }

    pub fn object_sprite(&self, name: &str) -> Option<usize> {
        self.object_names.index_of(name)
    }

    pub fn object_name(&self, sprite: usize) -> Option<&str> {
        self.object_names.name(sprite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str) -> GameObject {
        GameObject {
            id: id.to_string(),
            x: 0.0,
            y: 0.0,
            sprite: 0,
            layer: Layer::Main,
        }
    }

    fn world(ids: &[&str]) -> World {
        World::new(
            Grid {
                map_size: 2,
                sprite_size: 2,
                pixel_pixels: 4,
            },
            ids.iter().map(|id| object(id)).collect(),
            vec![0, 1, 0, 1],
            NameTable::new(vec!["grass".to_string(), "water".to_string()]),
            NameTable::new(vec!["player".to_string()]),
        )
    }

    #[test]
    fn remove_compacts_and_reindexes() {
        let mut world = world(&["a", "b", "c"]);
        assert_eq!(world.remove("a").map(|(slot, _)| slot), Some(0));
        assert_eq!(world.slot_of("b"), Some(0));
        assert_eq!(world.slot_of("c"), Some(1));
        assert_eq!(world.slot_of("a"), None);
        assert!(world.remove("a").is_none());
    }

    #[test]
    fn insert_appends() {
        let mut world = world(&["a"]);
        assert_eq!(world.insert(object("z")), 1);
        assert_eq!(world.get(1).map(|o| o.id.as_str()), Some("z"));
        assert!(world.contains_id("z"));
    }

    #[test]
    fn bounds_keep_sprite_on_map() {
        let world = world(&[]);
        assert!(world.fits(0.0, 8.0));
        assert!(!world.fits(16.0, 0.0));
        assert!(!world.fits(-1.0, 0.0));
    }

    #[test]
    fn tiles_by_coordinate() {
        let mut world = world(&[]);
        assert_eq!(world.tile_at(1.0, 0.0), Some("water"));
        assert_eq!(world.tile_at(2.0, 0.0), None);
        assert!(world.set_tile_at(0.0, 1.0, 1));
        assert_eq!(world.background(), &[0, 1, 1, 1]);
        assert!(!world.set_tile_at(0.0, -1.0, 1));
        assert_eq!(world.tile_index("water"), Some(1));
        assert_eq!(world.object_sprite("enemy"), None);
    }

    #[test]
    fn short_background_reads_as_off_map() {
        let mut world = World::new(
            Grid {
                map_size: 2,
                sprite_size: 2,
                pixel_pixels: 4,
            },
            Vec::new(),
            vec![1],
            NameTable::new(vec!["grass".to_string(), "water".to_string()]),
            NameTable::new(Vec::new()),
        );
        assert_eq!(world.tile_at(0.0, 0.0), Some("water"));
        assert_eq!(world.tile_at(1.0, 1.0), None);
        assert!(!world.set_tile_at(1.0, 1.0, 0));
        assert_eq!(world.background(), &[1]);
    }
}
