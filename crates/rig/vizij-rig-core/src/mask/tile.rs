use serde::{Deserialize, Serialize};

/// One slot of the mask atlas: a color channel plus a cell of the subdivision grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskTile {
    pub channel: u32,
    pub column: u32,
    pub row: u32,
    /// Edge length in normalized atlas units.
    pub size: f32,
}

impl MaskTile {
    /// Normalized `[x, y, width, height]` of the tile inside its channel.
    pub fn rect(&self) -> [f32; 4] {
        [
            self.column as f32 * self.size,
            self.row as f32 * self.size,
            self.size,
            self.size,
        ]
    }
}

/// Uniform model-space to tile-space mapping shared by a mask group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskTransform {
    pub offset: [f32; 2],
    pub scale: f32,
}

impl Default for MaskTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: 1.0,
        }
    }
}

impl MaskTransform {
    /// Square covering `points`: centered on their bounds, edge twice the larger extent.
    /// `None` for empty input.
    pub fn covering<'a>(points: impl IntoIterator<Item = &'a [f32; 2]>) -> Option<Self> {
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        let mut any = false;
        for p in points {
            any = true;
            min[0] = min[0].min(p[0]);
            min[1] = min[1].min(p[1]);
            max[0] = max[0].max(p[0]);
            max[1] = max[1].max(p[1]);
        }
        if !any {
            return None;
        }
        let extent = [max[0] - min[0], max[1] - min[1]];
        Some(Self {
            offset: [(min[0] + max[0]) * 0.5, (min[1] + max[1]) * 0.5],
            scale: extent[0].max(extent[1]) * 2.0,
        })
    }

    /// Map a model-space point into the tile's normalized atlas rectangle.
    pub fn to_tile_space(&self, point: [f32; 2], tile: &MaskTile) -> [f32; 2] {
        let local = if self.scale <= f32::EPSILON {
            [0.5, 0.5]
        } else {
            [
                (point[0] - self.offset[0]) / self.scale + 0.5,
                (point[1] - self.offset[1]) / self.scale + 0.5,
            ]
        };
        [
            (tile.column as f32 + local[0]) * tile.size,
            (tile.row as f32 + local[1]) * tile.size,
        ]
    }
}
