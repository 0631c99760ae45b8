use crate::foundation::core::Viewport;
use crate::foundation::error::{CompositeError, CompositeResult, ErrorKind, Warning};

/// One display tile: a rectangle of the global image shown by one rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    pub viewport: Viewport,
    pub display_rank: usize,
}

/// The tiled display every rank of a session agrees on.
#[derive(Clone, Debug)]
pub struct TileLayout {
    rank: usize,
    num_processes: usize,
    tiles: Vec<Tile>,
    global_viewport: Viewport,
    max_width: i32,
    max_height: i32,
    physical_width: i32,
    physical_height: i32,
    displayed: Option<usize>,
}

impl TileLayout {
    pub fn new(rank: usize, num_processes: usize) -> Self {
        Self {
            rank,
            num_processes,
            tiles: Vec::new(),
            global_viewport: Viewport::default(),
            max_width: 0,
            max_height: 0,
            physical_width: 0,
            physical_height: 0,
            displayed: None,
        }
    }

    /// Drop every tile.
    pub fn reset(&mut self) {
        *self = Self::new(self.rank, self.num_processes);
    }

    /// Add a tile shown by `display_rank` and return its index.
    ///
    /// The physical render size grows to the largest tile.
    pub fn add_tile(&mut self, x: i32, y: i32, width: i32, height: i32, display_rank: usize) -> CompositeResult<usize> {
        if width < 1 || height < 1 {
            return Err(CompositeError::invalid_value("attempted to create a tile with no pixels"));
        }
        let index = self.tiles.len();
        if display_rank >= self.num_processes {
            return Err(CompositeError::invalid_value(format!(
                "invalid display rank {display_rank} for tile {index}"
            )));
        }
        if let Some(other) = self.tiles.iter().position(|t| t.display_rank == display_rank) {
            return Err(CompositeError::invalid_value(format!(
                "rank {display_rank} used for tiles {other} and {index}"
            )));
        }

        let viewport = Viewport::new(x, y, width, height);
        self.global_viewport = if self.tiles.is_empty() {
            viewport
        } else {
            let g = self.global_viewport;
            let (x0, y0) = (g.x.min(x), g.y.min(y));
            Viewport::new(x0, y0, g.right().max(viewport.right()) - x0, g.top().max(viewport.top()) - y0)
        };
        self.tiles.push(Tile {
            viewport,
            display_rank,
        });
        if display_rank == self.rank {
            self.displayed = Some(index);
        }
        self.max_width = self.max_width.max(width);
        self.max_height = self.max_height.max(height);
        self.physical_width = self.max_width;
        self.physical_height = self.max_height;
        Ok(index)
    }

    /// Override the size of the buffer the draw callback renders into.
    ///
    /// Sizes smaller than the largest tile are kept but reported.
    pub fn set_physical_render_size(&mut self, width: i32, height: i32) -> Option<Warning> {
        self.physical_width = width;
        self.physical_height = height;
        (width < self.max_width || height < self.max_height).then(|| {
            Warning::raise(
                ErrorKind::InvalidValue,
                "physical render dimensions not large enough to render all tiles",
            )
        })
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, index: usize) -> CompositeResult<&Tile> {
        self.tiles.get(index).ok_or_else(|| {
            CompositeError::invalid_value(format!("bad tile index {index} of {}", self.tiles.len()))
        })
    }

    /// Bounding box of all tiles.
    pub fn global_viewport(&self) -> Viewport {
        self.global_viewport
    }

    pub fn max_tile_size(&self) -> (i32, i32) {
        (self.max_width, self.max_height)
    }

    pub fn physical_render_size(&self) -> (i32, i32) {
        (self.physical_width, self.physical_height)
    }

    /// Tile this rank displays, if any.
    pub fn displayed_tile(&self) -> Option<usize> {
        self.displayed
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_processes(&self) -> usize {
        self.num_processes
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/tiles.rs"]
mod tests;
