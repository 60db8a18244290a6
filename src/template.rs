use std::fmt;

use crate::customization::Layout;
use crate::error::{BoothError, BoothResult};

pub const MIN_PHOTOS: usize = 1;
pub const MAX_PHOTOS: usize = 6;

/// Print pixels per preview (CSS) pixel. Cell sizes are 300 DPI print sizes.
pub const PRINT_SCALE: f32 = 2.5;

/// Extra band at the bottom of the canvas when date and/or time is shown.
pub const TIMESTAMP_RESERVE: u32 = 180;

const STRIP_CELL: (u32, u32) = (1000, 400);
const STRIP_SPACING: u32 = 40;
const STRIP_PADDING: u32 = 60;
const GRID_SPACING: u32 = 40;
const GRID_PADDING: u32 = 80;

/// A numbered layout preset: cell grid, cell size and margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Template {
    pub id: u8,
    pub layout: Layout,
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub spacing: u32,
    pub padding: u32,
}

impl Template {
    /// Picks the template for a photo count and layout.
    ///
    /// Vertical strips exist for every count. Grids come in 2, 4 and 6
    /// cells; odd counts use the next larger grid and leave the last cell
    /// empty.
    pub fn select(photo_count: usize, layout: Layout) -> BoothResult<Self> {
        if !(MIN_PHOTOS..=MAX_PHOTOS).contains(&photo_count) {
            return Err(BoothError::InvalidInput(format!(
                "Photo count must be between {} and {}, got {}",
                MIN_PHOTOS, MAX_PHOTOS, photo_count
            )));
        }

        let template = match layout {
            Layout::Vertical => Template {
                id: photo_count as u8,
                layout,
                columns: 1,
                rows: photo_count as u32,
                cell_width: STRIP_CELL.0,
                cell_height: STRIP_CELL.1,
                spacing: STRIP_SPACING,
                padding: STRIP_PADDING,
            },
            Layout::Grid => {
                let (id, columns, rows, cell_width, cell_height) = match photo_count {
                    1 | 2 => (2, 1, 2, 1000, 600),
                    3 | 4 => (4, 2, 2, 800, 600),
                    _ => (6, 3, 2, 600, 600),
                };
                Template {
                    id,
                    layout,
                    columns,
                    rows,
                    cell_width,
                    cell_height,
                    spacing: GRID_SPACING,
                    padding: GRID_PADDING,
                }
            }
        };

        Ok(template)
    }

    /// All presets, vertical strips first.
    pub fn catalog() -> Vec<Template> {
        let strips = (MIN_PHOTOS..=MAX_PHOTOS).filter_map(|n| Self::select(n, Layout::Vertical).ok());
        let grids = [2, 4, 6]
            .into_iter()
            .filter_map(|n| Self::select(n, Layout::Grid).ok());
        strips.chain(grids).collect()
    }

    pub fn cell_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn cell_aspect(&self) -> f64 {
        self.cell_width as f64 / self.cell_height as f64
    }

    pub fn bottom_reserve(&self, with_timestamp: bool) -> u32 {
        if with_timestamp {
            TIMESTAMP_RESERVE
        } else {
            0
        }
    }

    pub fn block_size(&self) -> (u32, u32) {
        (
            self.columns * self.cell_width + (self.columns - 1) * self.spacing,
            self.rows * self.cell_height + (self.rows - 1) * self.spacing,
        )
    }

    /// Output canvas size in print pixels.
    pub fn canvas_size(&self, with_timestamp: bool) -> (u32, u32) {
        let (block_width, block_height) = self.block_size();
        (
            block_width + 2 * self.padding,
            block_height + 2 * self.padding + self.bottom_reserve(with_timestamp),
        )
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.layout, self.id)
    }
}
