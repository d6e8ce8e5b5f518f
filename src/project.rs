//! The project snapshot handed over by the editor, and its validation.
//!
//! A snapshot is the whole contract between the editor and the engine: it
//! is what the editor saves, and it is what gets exported.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::sprite::{Color, TRANSPARENT};

/// Draw layer of a game object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Back,
    #[default]
    Main,
    Front,
}

impl Layer {
    /// Paint order.
    pub const ALL: [Layer; 3] = [Layer::Back, Layer::Main, Layer::Front];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Back => "back",
            Layer::Main => "main",
            Layer::Front => "front",
        }
    }
}

impl FromStr for Layer {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "back" => Ok(Layer::Back),
            "main" => Ok(Layer::Main),
            "front" => Ok(Layer::Front),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid constants. Everything on screen is measured in multiples of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    /// Map width and height in tiles.
    pub map_size: u32,
    /// Sprite width and height in sprite pixels.
    pub sprite_size: u32,
    /// Screen pixels per sprite pixel.
    pub pixel_pixels: u32,
}

/// Widest canvas, in screen pixels, a grid may describe.
pub const MAX_MAP_PIXELS: u32 = 4096;

impl Grid {
    /// Reject zero dimensions and maps wider than [`MAX_MAP_PIXELS`].
    pub fn check(&self) -> Result<(), SnapshotError> {
        for (field, value) in [
            ("mapSize", self.map_size),
            ("spriteSize", self.sprite_size),
            ("pixelPixels", self.pixel_pixels),
        ] {
            if value == 0 {
                return Err(SnapshotError::ZeroDimension { field });
            }
        }

        let map_pixels = self
            .sprite_size
            .checked_mul(self.pixel_pixels)
            .and_then(|p| p.checked_mul(self.map_size));
        match map_pixels {
            Some(p) if p <= MAX_MAP_PIXELS => Ok(()),
            _ => Err(SnapshotError::GridTooLarge {
                map_size: self.map_size,
                sprite_size: self.sprite_size,
                pixel_pixels: self.pixel_pixels,
                limit: MAX_MAP_PIXELS,
            }),
        }
    }

    /// Screen pixels per tile.
    pub fn sprite_pixels(&self) -> u32 {
        self.sprite_size.saturating_mul(self.pixel_pixels)
    }

    /// Screen pixels across the whole map.
    pub fn map_pixels(&self) -> u32 {
        self.map_size.saturating_mul(self.sprite_pixels())
    }

    pub fn map_cells(&self) -> usize {
        (self.map_size as usize).saturating_mul(self.map_size as usize)
    }

    pub fn sprite_cells(&self) -> usize {
        (self.sprite_size as usize).saturating_mul(self.sprite_size as usize)
    }
}

/// A game object as the editor saves it: position in sprite pixels,
/// optional id and layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub sprite: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<Layer>,
}

/// Finalised editor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub grid: Grid,
    pub colors: Vec<String>,
    pub tile_names: Vec<String>,
    pub tiles: Vec<Vec<i32>>,
    pub object_names: Vec<String>,
    pub objects: Vec<Vec<i32>>,
    /// Script source per object sprite.
    pub codes: Vec<String>,
    pub background: Vec<usize>,
    pub game_objects: Vec<PlacedObject>,
}

impl ProjectSnapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check every structural invariant the engine relies on. The first
    /// violation is reported; nothing is coerced.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let grid = &self.grid;
        grid.check()?;

        if self.colors.is_empty() {
            return Err(SnapshotError::EmptyPalette);
        }
        for (index, value) in self.colors.iter().enumerate() {
            if Color::parse(value).is_none() {
                return Err(SnapshotError::BadColor {
                    index,
                    value: value.clone(),
                });
            }
        }

        if self.tiles.is_empty() {
            return Err(SnapshotError::NoTiles);
        }
        check_table("tiles", &self.tile_names, &self.tiles, false, grid, self.colors.len())?;
        check_table("objects", &self.object_names, &self.objects, true, grid, self.colors.len())?;
        if self.codes.len() != self.object_names.len() {
            return Err(SnapshotError::LengthMismatch {
                table: "objects",
                names: self.object_names.len(),
                entries: self.codes.len(),
                what: "scripts",
            });
        }

        if self.background.len() != grid.map_cells() {
            return Err(SnapshotError::BackgroundSize {
                len: self.background.len(),
                expected: grid.map_cells(),
            });
        }
        if let Some((cell, &tile)) = self
            .background
            .iter()
            .enumerate()
            .find(|(_, &t)| t >= self.tiles.len())
        {
            return Err(SnapshotError::TileOutOfRange {
                cell,
                tile,
                tiles: self.tiles.len(),
            });
        }

        let mut ids = HashSet::new();
        for (index, object) in self.game_objects.iter().enumerate() {
            if object.sprite >= self.objects.len() {
                return Err(SnapshotError::ObjectSpriteOutOfRange {
                    index,
                    sprite: object.sprite,
                    objects: self.objects.len(),
                });
            }
            if !object.x.is_finite() || !object.y.is_finite() {
                return Err(SnapshotError::BadPosition { index });
            }
            if let Some(id) = &object.id {
                if !ids.insert(id.as_str()) {
                    return Err(SnapshotError::DuplicateId(id.clone()));
                }
            }
        }
        Ok(())
    }
}

fn check_table(
    table: &'static str,
    names: &[String],
    sprites: &[Vec<i32>],
    allow_transparent: bool,
    grid: &Grid,
    palette: usize,
) -> Result<(), SnapshotError> {
    if names.len() != sprites.len() {
        return Err(SnapshotError::LengthMismatch {
            table,
            names: names.len(),
            entries: sprites.len(),
            what: "sprites",
        });
    }

    let mut seen = HashSet::new();
    for (index, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(SnapshotError::EmptyName { table, index });
        }
        if !seen.insert(name.as_str()) {
            return Err(SnapshotError::DuplicateName {
                table,
                name: name.clone(),
            });
        }
    }

    let expected = grid.sprite_cells();
    for (index, sprite) in sprites.iter().enumerate() {
        if sprite.len() != expected {
            return Err(SnapshotError::SpriteSize {
                table,
                index,
                len: sprite.len(),
                expected,
            });
        }
        let bad = sprite.iter().enumerate().find(|(_, &color)| {
            let transparent = allow_transparent && color == TRANSPARENT;
            !transparent && usize::try_from(color).map_or(true, |c| c >= palette)
        });
        if let Some((cell, &color)) = bad {
            return Err(SnapshotError::ColorOutOfRange {
                table,
                index,
                cell,
                color,
                palette,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 2×2 map of grass with one player at the origin.
    pub(crate) fn sample() -> ProjectSnapshot {
        ProjectSnapshot {
            title: Some("Sample".to_string()),
            grid: Grid {
                map_size: 2,
                sprite_size: 2,
                pixel_pixels: 4,
            },
            colors: vec!["#000".to_string(), "#0f0".to_string()],
            tile_names: vec!["grass".to_string()],
            tiles: vec![vec![1, 1, 1, 1]],
            object_names: vec!["player".to_string()],
            objects: vec![vec![0, -1, -1, 0]],
            codes: vec!["function update() { move('right'); }".to_string()],
            background: vec![0, 0, 0, 0],
            game_objects: vec![PlacedObject {
                id: None,
                x: 0.0,
                y: 0.0,
                sprite: 0,
                layer: None,
            }],
        }
    }

    #[test]
    fn grid_units() {
        let grid = sample().grid;
        assert_eq!(grid.sprite_pixels(), 8);
        assert_eq!(grid.map_pixels(), 16);
        assert_eq!(grid.map_cells(), 4);
    }

    #[test]
    fn sample_is_valid() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = r##"{
            "mapSize": 1, "spriteSize": 1, "pixelPixels": 1,
            "colors": ["#fff"], "tileNames": ["t"], "tiles": [[0]],
            "objectNames": [], "objects": [], "codes": [],
            "background": [0],
            "gameObjects": []
        }"##;
        let snapshot = ProjectSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.grid.map_size, 1);
        assert_eq!(snapshot.title, None);
        assert_eq!(snapshot.validate(), Ok(()));
    }

    #[test]
    fn layer_parses_lowercase() {
        let object: PlacedObject =
            serde_json::from_str(r#"{"x":1,"y":2,"sprite":0,"layer":"front"}"#).unwrap();
        assert_eq!(object.layer, Some(Layer::Front));
        assert_eq!("back".parse::<Layer>(), Ok(Layer::Back));
        assert!("top".parse::<Layer>().is_err());
    }

    #[test]
    fn rejects_zero_dimension() {
        let mut snapshot = sample();
        snapshot.grid.sprite_size = 0;
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::ZeroDimension { field: "spriteSize" })
        );
    }

    #[test]
    fn rejects_oversized_grid() {
        let mut snapshot = sample();
        snapshot.grid = Grid {
            map_size: 65536,
            sprite_size: 65536,
            pixel_pixels: 2,
        };
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::GridTooLarge {
                map_size: 65536,
                sprite_size: 65536,
                pixel_pixels: 2,
                limit: MAX_MAP_PIXELS,
            })
        );

        // fits in u32 but not on a canvas
        snapshot.grid = Grid {
            map_size: 512,
            sprite_size: 8,
            pixel_pixels: 2,
        };
        assert!(matches!(snapshot.validate(), Err(SnapshotError::GridTooLarge { .. })));

        snapshot.grid = Grid {
            map_size: 256,
            sprite_size: 8,
            pixel_pixels: 2,
        };
        assert_eq!(snapshot.grid.check(), Ok(()));
        assert_eq!(snapshot.grid.map_pixels(), MAX_MAP_PIXELS);
    }

    #[test]
    fn rejects_bad_palette_entry() {
        let mut snapshot = sample();
        snapshot.colors.push("chartreuse-ish".to_string());
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::BadColor { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_transparent_tile() {
        let mut snapshot = sample();
        snapshot.tiles[0][3] = -1;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::ColorOutOfRange { table: "tiles", cell: 3, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names_and_ids() {
        let mut snapshot = sample();
        snapshot.tile_names.push("grass".to_string());
        snapshot.tiles.push(vec![0; 4]);
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateName { table: "tiles", .. })
        ));

        let mut snapshot = sample();
        let mut twin = snapshot.game_objects[0].clone();
        twin.id = Some("p".to_string());
        snapshot.game_objects = vec![twin.clone(), twin];
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateId("p".to_string()))
        );
    }

    #[test]
    fn rejects_missing_script() {
        let mut snapshot = sample();
        snapshot.codes.clear();
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::LengthMismatch { what: "scripts", .. })
        ));
    }

    #[test]
    fn rejects_background_problems() {
        let mut snapshot = sample();
        snapshot.background.pop();
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::BackgroundSize { len: 3, expected: 4 })
        ));

        let mut snapshot = sample();
        snapshot.background[2] = 7;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::TileOutOfRange { cell: 2, tile: 7, .. })
        ));
    }

    #[test]
    fn rejects_unknown_object_sprite() {
        let mut snapshot = sample();
        snapshot.game_objects[0].sprite = 3;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::ObjectSpriteOutOfRange { sprite: 3, .. })
        ));
    }
}
