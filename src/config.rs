//! Build-time benchmark configuration.
//!
//! Matrix width and tile width are compiled in. Set `MATW` and `LOCALSIZE`
//! in the environment of `cargo build` to override the defaults.

use crate::error::{BenchError, Result};

const DEFAULT_MATRIX_WIDTH: usize = 1024;
const DEFAULT_TILE_WIDTH: usize = 8;

/// Width of the square matrices.
pub const MATRIX_WIDTH: usize = parse_or(option_env!("MATW"), DEFAULT_MATRIX_WIDTH);

/// Width of the square work-group.
pub const TILE_WIDTH: usize = parse_or(option_env!("LOCALSIZE"), DEFAULT_TILE_WIDTH);

const _: () = assert!(
    TILE_WIDTH > 0 && MATRIX_WIDTH % TILE_WIDTH == 0,
    "LOCALSIZE must evenly divide MATW"
);

/// Relative path of the kernel source, resolved against the working directory.
pub const KERNEL_FILE_NAME: &str = "kernels/matmul.cl";

/// Name of the kernel function inside [`KERNEL_FILE_NAME`].
pub const KERNEL_ENTRY_POINT: &str = "MatrixMult";

const fn parse_or(value: Option<&str>, default: usize) -> usize {
    let bytes = match value {
        Some(s) => s.as_bytes(),
        None => return default,
    };
    if bytes.is_empty() {
        return default;
    }
    let mut out = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        assert!(b.is_ascii_digit(), "MATW / LOCALSIZE must be decimal integers");
        out = out * 10 + (b - b'0') as usize;
        i += 1;
    }
    out
}

/// How the result line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `problem size , work-group elements , throughput`
    Csv,
    /// Labelled single line.
    Human,
}

impl ReportFormat {
    /// Format selected by the `csv` cargo feature.
    pub const fn compiled() -> Self {
        if cfg!(feature = "csv") {
            ReportFormat::Csv
        } else {
            ReportFormat::Human
        }
    }
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self::compiled()
    }
}

/// Matrix width and tile width, validated so the grid divides evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    width: usize,
    tile: usize,
}

impl ExecutionConfig {
    pub fn new(width: usize, tile: usize) -> Result<Self> {
        if width == 0 {
            return Err(BenchError::config("matrix width must be positive"));
        }
        if tile == 0 {
            return Err(BenchError::config("tile width must be positive"));
        }
        if tile > width {
            return Err(BenchError::config(format!(
                "tile width {tile} exceeds matrix width {width}"
            )));
        }
        if width % tile != 0 {
            return Err(BenchError::config(format!(
                "tile width {tile} does not evenly divide matrix width {width}"
            )));
        }
        if i32::try_from(width).is_err() {
            return Err(BenchError::config(format!(
                "matrix width {width} does not fit the kernel's int parameter"
            )));
        }
        Ok(Self { width, tile })
    }

    /// The compiled-in configuration.
    pub fn compiled() -> Self {
        Self {
            width: MATRIX_WIDTH,
            tile: TILE_WIDTH,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tile(&self) -> usize {
        self.tile
    }

    /// Work-groups along each axis of the grid.
    pub fn groups_per_axis(&self) -> usize {
        self.width / self.tile
    }

    /// Global index space; the third axis is degenerate.
    pub fn global_size(&self) -> [usize; 3] {
        [self.width, self.width, 1]
    }

    pub fn local_size(&self) -> [usize; 3] {
        [self.tile, self.tile, 1]
    }

    /// Elements per matrix.
    pub fn matrix_len(&self) -> usize {
        self.width * self.width
    }

    pub fn matrix_bytes(&self) -> usize {
        self.matrix_len() * std::mem::size_of::<f32>()
    }

    /// Work-items per work-group.
    pub fn work_group_elements(&self) -> usize {
        self.tile * self.tile
    }

    /// Reported problem size (width squared).
    pub fn problem_size(&self) -> usize {
        self.matrix_len()
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::compiled()
    }
}
