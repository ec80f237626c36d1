//! Normaliser configuration.
//!
//! [`NormaliserOptions`] is a builder carrying the target resolution and the
//! augmentation parameters consulted when building normalisers. It is passed
//! explicitly to every recipe, so two builds with different targets never
//! interfere with each other.
//!
//! # Example
//!
//! ```
//! use framesample::NormaliserOptions;
//!
//! let options = NormaliserOptions::new()
//!     .with_target_resolution(640, 360)
//!     .with_max_rotation(45.0)
//!     .with_noise(0.0, 0.05);
//! assert_eq!(options.target_width, 640);
//! ```

/// Default horizontal resolution of normalised frames.
pub const DEFAULT_TARGET_WIDTH: usize = 352;

/// Default vertical resolution of normalised frames.
pub const DEFAULT_TARGET_HEIGHT: usize = 288;

/// Settings shared by all normaliser recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormaliserOptions {
    /// Output width in pixels.
    pub target_width: usize,
    /// Output height in pixels.
    pub target_height: usize,
    /// Rotation is drawn uniformly from `[-max, max]` degrees.
    pub max_rotation_degrees: f32,
    /// Mean of the additive Gaussian noise.
    pub noise_mean: f32,
    /// Standard deviation of the additive Gaussian noise.
    pub noise_sigma: f32,
}

impl Default for NormaliserOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl NormaliserOptions {
    /// Defaults: 352×288 output, rotation up to 90°, noise with mean 0 and
    /// sigma 0.1.
    pub fn new() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            max_rotation_degrees: 90.0,
            noise_mean: 0.0,
            noise_sigma: 0.1,
        }
    }

    /// Set the output resolution as `(width, height)`.
    #[must_use]
    pub fn with_target_resolution(mut self, width: usize, height: usize) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    /// Set the maximum absolute rotation in degrees.
    #[must_use]
    pub fn with_max_rotation(mut self, degrees: f32) -> Self {
        self.max_rotation_degrees = degrees.abs();
        self
    }

    /// Set the Gaussian noise parameters. Negative sigma is clamped to zero.
    #[must_use]
    pub fn with_noise(mut self, mean: f32, sigma: f32) -> Self {
        self.noise_mean = mean;
        self.noise_sigma = sigma.max(0.0);
        self
    }
}
