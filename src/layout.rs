use log::debug;

use crate::error::{BoothError, BoothResult};
use crate::template::Template;

/// Placement of one photo on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &CellRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Computes one cell per photo, row-major.
///
/// The cell block is centered in the canvas above the timestamp band.
/// Template cells past `photo_count` are not returned.
pub fn compute_layout(
    template: &Template,
    photo_count: usize,
    with_timestamp: bool,
) -> BoothResult<Vec<CellRect>> {
    if photo_count == 0 || photo_count > template.cell_count() {
        return Err(BoothError::InvalidInput(format!(
            "Template {} has {} cells, cannot place {} photos",
            template,
            template.cell_count(),
            photo_count
        )));
    }

    let (canvas_width, canvas_height) = template.canvas_size(with_timestamp);
    let usable_height = canvas_height - template.bottom_reserve(with_timestamp);
    let (block_width, block_height) = template.block_size();

    let origin_x = (canvas_width - block_width) / 2;
    let origin_y = (usable_height - block_height) / 2;

    let columns = template.columns as usize;
    let cells: Vec<CellRect> = (0..photo_count)
        .map(|idx| {
            let row = (idx / columns) as u32;
            let col = (idx % columns) as u32;
            CellRect {
                x: origin_x + col * (template.cell_width + template.spacing),
                y: origin_y + row * (template.cell_height + template.spacing),
                width: template.cell_width,
                height: template.cell_height,
            }
        })
        .collect();

    debug!(
        "Layout {} for {} photos on {}x{} canvas",
        template, photo_count, canvas_width, canvas_height
    );

    Ok(cells)
}
