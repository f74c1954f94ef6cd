// ============================================================================
// NUMERICAL TOLERANCES
// ============================================================================

/// Tolerance used when a real quantity is expected to be an integer.
pub const ROUND_TOLERANCE: f64 = f32::EPSILON as f64;

/// Cell volume below which a basis is treated as singular.
pub const DEGENERACY_TOLERANCE: f64 = 1e-6;

/// Lovász parameter used when the caller does not pick one.
pub const DEFAULT_LLL_DELTA: f64 = 0.75;

/// Exact form of `DEFAULT_LLL_DELTA` for the integral reduction.
pub const DEFAULT_LLL_DELTA_RATIO: (i64, i64) = (3, 4);

/// Denominator bound when snapping a real direction to lattice coordinates.
pub const DIRECTION_MAX_DENOMINATOR: i64 = 1000;

/// Denominator bound for the rational form of the A-to-B transition matrix.
pub const RATIONAL_MATRIX_MAX_DENOMINATOR: i64 = 1_000_000;

/// Largest deviation from an integer accepted for the change-of-basis
/// matrices between the four lattices of a bicrystal.
pub const MAP_TOLERANCE: f64 = 1e-5;

/// Relative error allowed between two real lattices claimed to coincide.
pub const COINCIDENCE_EPSILON: f64 = 1e-8;

/// Angles are keyed by `round(theta * ANGLE_KEY_SCALE)` to merge duplicates.
pub const ANGLE_KEY_SCALE: f64 = 1e6;

/// Iteration ceiling for the floating-point reduction.
pub const RLLL_MAX_ITERATIONS: usize = 100_000;

/// Column orders tried per input scaling before the floating-point
/// reduction gives up.
pub const RLLL_MAX_ORDERINGS: usize = 720;

/// Largest accepted Miller-index range for the boundary-normal enumeration.
pub const MAX_GB_NORMAL_BOUND: i64 = 20;

// ============================================================================
// SEARCH CONFIGURATION
// ============================================================================

/// Parameters of the coincident-lattice searches and the bicrystal report.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Largest denominator allowed when approximating strain ratios.
    pub max_denominator: i64,
    /// Largest principal stretch deviation `|s - 1|` accepted for deformations.
    pub max_strain: f64,
    /// Range `[-N, N]` of the integer enumeration.
    pub enumeration_bound: i64,
    /// At most this many configurations are returned.
    pub max_configurations: usize,
    /// Reduce CSL and DSCL bases after construction.
    pub use_rlll: bool,
    /// Range of the Miller-index enumeration for boundary normals.
    pub gb_normal_bound: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_denominator: 100,
            max_strain: 0.0,
            enumeration_bound: 10,
            max_configurations: 80,
            use_rlll: true,
            gb_normal_bound: 2,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> crate::Result<()> {
        use crate::LatticeError::InvalidInput;
        if self.max_denominator < 1 {
            return Err(InvalidInput(format!("max_denominator must be positive, got {}", self.max_denominator)));
        }
        if !self.max_strain.is_finite() || self.max_strain < 0.0 {
            return Err(InvalidInput(format!("max_strain must be finite and non-negative, got {}", self.max_strain)));
        }
        if self.enumeration_bound < 1 {
            return Err(InvalidInput(format!("enumeration_bound must be positive, got {}", self.enumeration_bound)));
        }
        if self.max_configurations == 0 {
            return Err(InvalidInput("max_configurations must be positive".into()));
        }
        if !(1..=MAX_GB_NORMAL_BOUND).contains(&self.gb_normal_bound) {
            return Err(InvalidInput(format!(
                "gb_normal_bound must be in 1..={MAX_GB_NORMAL_BOUND}, got {}",
                self.gb_normal_bound
            )));
        }
        Ok(())
    }

    /// Denominator bound used when a search candidate is checked by building
    /// its bicrystal. Entries of a coincidence transition have denominators
    /// up to the product of the two ratio denominators.
    pub fn verification_denominator(&self) -> i64 {
        self.max_denominator
            .saturating_mul(self.max_denominator)
            .min(RATIONAL_MATRIX_MAX_DENOMINATOR)
    }
}
