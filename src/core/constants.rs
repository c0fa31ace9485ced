//! World-geometry constants and engine defaults

/// Side length of one grid cell (a chunk) in blocks
pub const CELL_SIZE_BLOCKS: i32 = 16;

/// Offset of the target point inside its cell, in blocks
pub const CELL_TARGET_OFFSET: i32 = 4;

/// Number of targets generated in each ring, innermost first
pub const RING_STRONGHOLD_COUNTS: [u32; 8] = [3, 6, 10, 15, 21, 28, 36, 9];

/// Ring spacing unit in cells
pub const RING_SPACING_CELLS: f64 = 32.0;

/// Half-width of every ring in cells
pub const RING_HALF_WIDTH_CELLS: f64 = 40.0;

/// Largest number of live observations a caller keeps
pub const MAX_OBSERVATIONS: usize = 10;

/// Default standard deviation of the angle measurement (degrees)
pub const DEFAULT_SIGMA_DEGREES: f64 = 0.1;

/// Lower bound for a calibrated standard deviation (degrees)
pub const SIGMA_FLOOR_DEGREES: f64 = 0.005;

/// Degrees of freedom of the heavy-tailed likelihood used for robust observations
pub const DEFAULT_ROBUST_DOF: f64 = 2.0;

/// Minimum number of usable samples for a noise estimate
pub const MIN_CALIBRATION_SAMPLES: usize = 2;

/// Default number of calibration samples that completes a run
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 10;

/// Default spread of the positional prior used for the uncertainty radius (blocks)
pub const DEFAULT_PRIOR_SPREAD_BLOCKS: f64 = RING_HALF_WIDTH_CELLS * CELL_SIZE_BLOCKS as f64;

/// Ratio between overworld and nether coordinates
pub const NETHER_SCALE: f64 = 8.0;
