// Centralized numeric constants for sampling and deduplication

// ====================
// Correlation / Copula
// ====================
/// Added to the diagonal of every correlation matrix before decomposition.
/// Conditioning only; it is not a semantic correlation.
pub const CORRELATION_JITTER: f64 = 1e-8;
/// Uniform draws are clamped into [PROBIT_CLAMP, 1 - PROBIT_CLAMP] before the
/// probit transform so the normal scale never sees an infinity.
pub const PROBIT_CLAMP: f64 = 1e-12;

// ====================
// Parameter naming
// ====================
/// Separator between entity and property in flattened names (`Mat_E`).
pub const NAME_SEPARATOR: char = '_';
/// Field carrying the entity name inside a scenario record.
pub const ENTITY_NAME_FIELD: &str = "Name";
/// Record key skipped when flattening loaded scenario files.
pub const ENTITY_KEY_FIELD: &str = "Key";

// ====================
// Normalization
// ====================
/// Columns whose standard deviation falls below this are treated as constant.
pub const CONSTANT_COLUMN_EPS: f64 = 1e-12;

// ====================
// Deduplication defaults
// ====================
/// Radius in normalized space under which two scenarios are "too close".
pub const DEFAULT_DEDUP_EPS: f64 = 0.15;

// ====================
// Neighbor search
// ====================
/// Maximum number of points stored in a k-d tree leaf.
pub const KD_LEAF_CAPACITY: usize = 16;
/// Below this many rows the all-pairs scan is cheaper than building an index.
pub const BRUTE_FORCE_MAX_ROWS: usize = 64;
/// The hashed cell grid visits 3^d cells per query; only used up to this dimension.
pub const CELL_GRID_MAX_DIM: usize = 3;
/// Query windows of the cell grid are widened by this factor so rounding in
/// the cell coordinate never drops a neighbor sitting on the radius.
pub const CELL_PADDING: f64 = 1.0 + 1e-6;
/// The cell grid is only used when the radius is resolvable against the
/// coordinate magnitudes: `radius > max|x| * CELL_MIN_RELATIVE_RADIUS`.
pub const CELL_MIN_RELATIVE_RADIUS: f64 = 1e-9;
