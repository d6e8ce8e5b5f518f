//! Frame painting.
//!
//! The renderer talks to a [`Canvas`], which mirrors the two 2D-context
//! calls the exported document makes (`fillRect`, `fillText`). Painting a
//! frame through [`DrawList`] therefore yields exactly the call sequence the
//! browser would see.

use crate::project::{Grid, Layer};
use crate::sprite::{Color, Sprite, SpriteSheet};

use super::world::GameObject;
use super::TextEntry;

/// Dialogue font size in screen pixels.
pub const DIALOGUE_FONT: f64 = 16.0;
/// Characters per dialogue line.
pub const DIALOGUE_LINE: usize = 20;
/// Dialogue lines shown; the rest is cut off.
pub const DIALOGUE_LINES: usize = 4;
const DIALOGUE_PADDING: f64 = 8.0;
const ERROR_FONT: f64 = 14.0;

/// A 2D drawing surface.
pub trait Canvas {
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);
    /// `y` is the text baseline.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, size: f64, color: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        size: f64,
        color: Color,
    },
}

/// Records draw calls instead of painting them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Text runs only, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            DrawCommand::Rect { .. } => None,
        })
    }
}

impl Canvas for DrawList {
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, size: f64, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            size,
            color,
        });
    }
}

/// A text run recorded by [`Raster`]; glyphs are not rasterised.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: Color,
}

/// An RGBA pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    pub texts: Vec<TextRun>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width as usize * height as usize],
            texts: Vec::new(),
        }
    }

    /// A raster covering the whole map.
    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.map_pixels(), grid.map_pixels())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Pixels as packed RGBA bytes, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect()
    }

    /// Write the raster to a PNG file.
    #[cfg(feature = "snapshot")]
    pub fn save_png(&self, path: &std::path::Path) -> Result<(), image::ImageError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba())
            .ok_or_else(|| {
                image::ImageError::Parameter(image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ))
            })?;
        buffer.save_with_format(path, image::ImageFormat::Png)
    }
}

impl Canvas for Raster {
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let clamp = |v: f64, max: u32| v.round().clamp(0.0, f64::from(max)) as u32;
        let (x0, x1) = (clamp(x, self.width), clamp(x + width, self.width));
        let (y0, y1) = (clamp(y, self.height), clamp(y + height, self.height));
        for py in y0..y1 {
            for px in x0..x1 {
                let i = (py * self.width + px) as usize;
                self.pixels[i] = color.over(self.pixels[i]);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, size: f64, color: Color) {
        self.texts.push(TextRun {
            text: text.to_string(),
            x,
            y,
            size,
            color,
        });
    }
}

/// Everything one frame shows.
pub struct Frame<'a> {
    pub grid: &'a Grid,
    pub sheet: &'a SpriteSheet,
    pub background: &'a [usize],
    pub objects: &'a [GameObject],
    pub texts: &'a [TextEntry],
    pub dialogue: Option<&'a str>,
}

/// Paint a frame: clear, tiles, object layers, texts, dialogue.
pub fn render_frame(frame: &Frame<'_>, canvas: &mut dyn Canvas) {
    let grid = frame.grid;
    let map_pixels = f64::from(grid.map_pixels());
    let sprite_pixels = f64::from(grid.sprite_pixels());
    canvas.fill_rect(0.0, 0.0, map_pixels, map_pixels, Color::WHITE);

    let map_size = grid.map_size as usize;
    for (cell, &tile) in frame.background.iter().enumerate() {
        if let Some(sprite) = frame.sheet.tiles.get(tile) {
            let x = (cell % map_size) as f64 * sprite_pixels;
            let y = (cell / map_size) as f64 * sprite_pixels;
            draw_sprite(frame, sprite, x, y, canvas);
        }
    }

    for layer in Layer::ALL {
        for object in frame.objects.iter().filter(|o| o.layer == layer) {
            if let Some(sprite) = frame.sheet.objects.get(object.sprite) {
                draw_sprite(frame, sprite, object.x, object.y, canvas);
            }
        }
    }

    let pixel = f64::from(grid.pixel_pixels);
    for text in frame.texts {
        let color = Color::parse(&text.color).unwrap_or(Color::BLACK);
        canvas.fill_text(
            &text.text,
            text.x * pixel,
            text.y * pixel + text.size,
            text.size,
            color,
        );
    }

    if let Some(dialogue) = frame.dialogue.filter(|d| !d.is_empty()) {
        draw_dialogue(dialogue, map_pixels, canvas);
    }
}

fn draw_sprite(frame: &Frame<'_>, sprite: &Sprite, x: f64, y: f64, canvas: &mut dyn Canvas) {
    let pixel = f64::from(frame.grid.pixel_pixels);
    for (col, row, index) in sprite.painted(frame.grid.sprite_size as usize) {
        if let Some(color) = frame.sheet.palette.get(index) {
            canvas.fill_rect(x + col as f64 * pixel, y + row as f64 * pixel, pixel, pixel, color);
        }
    }
}

/// Split dialogue into the fixed-width lines the box shows.
pub fn dialogue_lines(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(DIALOGUE_LINE)
        .take(DIALOGUE_LINES)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn draw_dialogue(text: &str, map_pixels: f64, canvas: &mut dyn Canvas) {
    let left = map_pixels / 8.0;
    let top = map_pixels * 3.0 / 8.0;
    canvas.fill_rect(
        left - DIALOGUE_PADDING,
        top - DIALOGUE_PADDING,
        map_pixels * 3.0 / 4.0 + DIALOGUE_PADDING * 2.0,
        map_pixels / 4.0 + DIALOGUE_PADDING * 2.0,
        Color::WHITE,
    );
    for (i, line) in dialogue_lines(text).iter().enumerate() {
        let baseline = top + DIALOGUE_FONT * (i + 1) as f64;
        canvas.fill_text(line, left, baseline, DIALOGUE_FONT, Color::BLACK);
    }
}

/// Replace the frame with a failure report.
pub fn render_error(grid: &Grid, message: &str, canvas: &mut dyn Canvas) {
    let map_pixels = f64::from(grid.map_pixels());
    canvas.fill_rect(0.0, 0.0, map_pixels, map_pixels, Color::WHITE);
    for (i, line) in message.lines().enumerate() {
        let baseline = 10.0 + (ERROR_FONT + 2.0) * (i + 1) as f64;
        canvas.fill_text(line, 10.0, baseline, ERROR_FONT, Color::RED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Palette;

    fn grid() -> Grid {
        Grid {
            map_size: 2,
            sprite_size: 2,
            pixel_pixels: 1,
        }
    }

    fn sheet() -> SpriteSheet {
        SpriteSheet {
            palette: Palette::new(vec![Color::BLACK, Color::RED, Color::rgb(0, 0, 255)]),
            tiles: vec![Sprite::new(vec![0; 4])],
            objects: vec![Sprite::new(vec![1, 1, 1, -1]), Sprite::new(vec![2; 4])],
        }
    }

    fn object(id: &str, sprite: usize, layer: Layer) -> GameObject {
        GameObject {
            id: id.to_string(),
            x: 0.0,
            y: 0.0,
            sprite,
            layer,
        }
    }

    #[test]
    fn front_layer_paints_over_back() {
        let grid = grid();
        let sheet = sheet();
        // front object is placed first, back object second
        let objects = vec![object("a", 0, Layer::Front), object("b", 1, Layer::Back)];
        let frame = Frame {
            grid: &grid,
            sheet: &sheet,
            background: &[0, 0, 0, 0],
            objects: &objects,
            texts: &[],
            dialogue: None,
        };
        let mut raster = Raster::for_grid(&grid);
        render_frame(&frame, &mut raster);

        assert_eq!(raster.pixel(0, 0), Some(Color::RED));
        // transparent cell of the front sprite shows the back one
        assert_eq!(raster.pixel(1, 1), Some(Color::rgb(0, 0, 255)));
        // background elsewhere
        assert_eq!(raster.pixel(3, 3), Some(Color::BLACK));
    }

    #[test]
    fn transparent_cells_issue_no_draw_call() {
        let grid = grid();
        let sheet = sheet();
        let objects = vec![object("a", 0, Layer::Main)];
        let frame = Frame {
            grid: &grid,
            sheet: &sheet,
            background: &[0, 0, 0, 0],
            objects: &objects,
            texts: &[],
            dialogue: None,
        };
        let mut list = DrawList::new();
        render_frame(&frame, &mut list);
        // clear + 4 tiles × 4 cells + 3 painted object cells
        assert_eq!(list.commands.len(), 1 + 16 + 3);
    }

    #[test]
    fn dialogue_wraps_and_truncates() {
        let text = "a".repeat(95);
        let lines = dialogue_lines(&text);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.len() == 20));
        assert_eq!(dialogue_lines("hi"), vec!["hi".to_string()]);
    }

    #[test]
    fn dialogue_box_geometry() {
        let mut list = DrawList::new();
        draw_dialogue("hello", 64.0, &mut list);
        assert_eq!(
            list.commands[0],
            DrawCommand::Rect {
                x: 0.0,
                y: 16.0,
                width: 64.0,
                height: 32.0,
                color: Color::WHITE,
            }
        );
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn text_overlay_position() {
        let grid = Grid {
            map_size: 2,
            sprite_size: 2,
            pixel_pixels: 3,
        };
        let sheet = sheet();
        let texts = vec![TextEntry {
            id: "score".to_string(),
            text: "0".to_string(),
            x: 2.0,
            y: 1.0,
            color: "red".to_string(),
            size: 10.0,
        }];
        let frame = Frame {
            grid: &grid,
            sheet: &sheet,
            background: &[],
            objects: &[],
            texts: &texts,
            dialogue: None,
        };
        let mut list = DrawList::new();
        render_frame(&frame, &mut list);
        assert_eq!(
            list.commands.last(),
            Some(&DrawCommand::Text {
                text: "0".to_string(),
                x: 6.0,
                y: 13.0,
                size: 10.0,
                color: Color::RED,
            })
        );
    }

    #[test]
    fn error_surface_is_red_text_on_white() {
        let mut list = DrawList::new();
        render_error(&grid(), "TypeError: boom\n  in update", &mut list);
        assert_eq!(list.commands.len(), 3);
        assert!(matches!(
            list.commands[1],
            DrawCommand::Text { color: Color::RED, .. }
        ));
    }
}
