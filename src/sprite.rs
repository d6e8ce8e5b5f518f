//! Palette colours, pixel sprites and the name tables that index them.

use std::fmt;

/// Palette index meaning "do not paint" in object sprites.
pub const TRANSPARENT: i32 = -1;

/// An RGBA colour parsed from a CSS colour string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`
    /// or one of a handful of CSS colour names.
    pub fn parse(input: &str) -> Option<Color> {
        let s = input.trim().to_ascii_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgba(").or_else(|| s.strip_prefix("rgb(")) {
            let body = body.strip_suffix(')')?;
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            let channel = |p: &str| p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
            return match parts.as_slice() {
                [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
                [r, g, b, a] => {
                    let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
                    Some(Color {
                        a: (alpha * 255.0).round() as u8,
                        ..Color::rgb(channel(r)?, channel(g)?, channel(b)?)
                    })
                }
                _ => None,
            };
        }
        named(&s)
    }

    /// Alpha-composite `self` over `dst`.
    pub fn over(self, dst: Color) -> Color {
        if self.a == 255 {
            return self;
        }
        let a = u32::from(self.a);
        let mix = |s: u8, d: u8| ((u32::from(s) * a + u32::from(d) * (255 - a)) / 255) as u8;
        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: dst.a.max(self.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color {
            a: nibble(3)?,
            ..Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)
        }),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color {
            a: byte(6)?,
            ..Color::rgb(byte(0)?, byte(2)?, byte(4)?)
        }),
        _ => None,
    }
}

fn named(name: &str) -> Option<Color> {
    Some(match name {
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::RED,
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "transparent" => Color { a: 0, ..Color::BLACK },
        _ => return None,
    })
}

/// Ordered colours, referenced from sprites by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(Vec<Color>);

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    /// Colour for a sprite cell, `None` for the transparent sentinel or an
    /// index outside the palette.
    pub fn get(&self, index: i32) -> Option<Color> {
        usize::try_from(index).ok().and_then(|i| self.0.get(i).copied())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A square grid of palette indices, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    cells: Vec<i32>,
}

impl Sprite {
    pub fn new(cells: Vec<i32>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Painted cells as `(column, row, palette index)`, skipping transparent
    /// ones.
    pub fn painted(&self, size: usize) -> impl Iterator<Item = (usize, usize, i32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != TRANSPARENT)
            .map(move |(i, &c)| (i % size, i / size, c))
    }
}

/// Human-readable names for a sprite table; a name's position is the index
/// scripts and the background refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything the renderer needs to paint sprites.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub palette: Palette,
    pub tiles: Vec<Sprite>,
    pub objects: Vec<Sprite>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_forms() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("#FF0000"), Some(Color::RED));
        assert_eq!(
            Color::parse("#00000080"),
            Some(Color { a: 128, ..Color::BLACK })
        );
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#ggg"), None);
    }

    #[test]
    fn parse_functional_and_named() {
        assert_eq!(Color::parse("rgb(10, 20, 30)"), Some(Color::rgb(10, 20, 30)));
        assert_eq!(Color::parse("rgba(0,0,0,0.5)").map(|c| c.a), Some(128));
        assert_eq!(Color::parse("Black"), Some(Color::BLACK));
        assert_eq!(Color::parse("not-a-color"), None);
    }

    #[test]
    fn display_round_trips_hex() {
        assert_eq!(Color::rgb(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn transparent_cells_are_not_painted() {
        let sprite = Sprite::new(vec![0, TRANSPARENT, TRANSPARENT, 1]);
        let painted: Vec<_> = sprite.painted(2).collect();
        assert_eq!(painted, vec![(0, 0, 0), (1, 1, 1)]);
    }

    #[test]
    fn palette_rejects_sentinel() {
        let palette = Palette::new(vec![Color::BLACK]);
        assert_eq!(palette.get(TRANSPARENT), None);
        assert_eq!(palette.get(0), Some(Color::BLACK));
    }
}
