use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;

use crate::render::filters::FilterKind;
use crate::render::transform::PreRotation;

/// Tuning parameters shared by the filter programs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterSettings {
    /// Kuwahara window radius in texels.
    pub kuwahara_radius: u32,
    /// Edge magnitude above which toon outlines are drawn black.
    pub toon_threshold: f32,
    /// Colour levels per channel after toon quantization.
    pub toon_quantization_levels: f32,
    /// Gaussian blur radius, in texels, applied before the smooth-toon pass.
    pub smooth_toon_blur_radius: f32,
    /// Multiplier on the Sobel magnitude for the sketch filter.
    pub sketch_edge_strength: f32,
}

impl FilterSettings {
    pub const MAX_KUWAHARA_RADIUS: u32 = 8;
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            kuwahara_radius: 5,
            toon_threshold: 0.2,
            toon_quantization_levels: 10.0,
            smooth_toon_blur_radius: 2.0,
            sketch_edge_strength: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directories scanned recursively for still images.
    pub photo_library_paths: Vec<PathBuf>,
    /// Pick a new photo after this long; `None` reloads only on surface change or tap.
    #[serde(with = "humantime_serde")]
    pub reload_interval: Option<Duration>,
    /// Filters a new photo may be drawn with, in selection order.
    pub filters: Vec<FilterKind>,
    pub filter_settings: FilterSettings,
    /// Rotation applied to match the physical display, in quarter turns.
    pub pre_rotation: PreRotation,
    /// Extra rotation of the photo about its centre, in degrees.
    pub rotation: f32,
    /// Render every filter into the offscreen surface and blit it to the screen.
    pub offscreen: bool,
    pub fullscreen: bool,
    /// Optional deterministic seed for photo and filter selection.
    pub random_seed: Option<u64>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_paths.is_empty(),
            "photo-library-paths must list at least one directory"
        );
        ensure!(!self.filters.is_empty(), "filters must not be empty");
        if let Some(interval) = self.reload_interval {
            ensure!(!interval.is_zero(), "reload-interval must be greater than zero");
        }
        ensure!(self.rotation.is_finite(), "rotation must be a finite number");

        let fs = &self.filter_settings;
        ensure!(
            (1..=FilterSettings::MAX_KUWAHARA_RADIUS).contains(&fs.kuwahara_radius),
            "kuwahara-radius must be between 1 and {}",
            FilterSettings::MAX_KUWAHARA_RADIUS
        );
        ensure!(
            fs.toon_threshold > 0.0 && fs.toon_threshold.is_finite(),
            "toon-threshold must be positive"
        );
        ensure!(
            fs.toon_quantization_levels >= 2.0,
            "toon-quantization-levels must be at least 2"
        );
        ensure!(
            fs.smooth_toon_blur_radius >= 0.0 && fs.smooth_toon_blur_radius.is_finite(),
            "smooth-toon-blur-radius must not be negative"
        );
        ensure!(
            fs.sketch_edge_strength > 0.0 && fs.sketch_edge_strength.is_finite(),
            "sketch-edge-strength must be positive"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_paths: Vec::new(),
            reload_interval: None,
            filters: FilterKind::ALL.to_vec(),
            filter_settings: FilterSettings::default(),
            pre_rotation: PreRotation::None,
            rotation: 0.0,
            offscreen: false,
            fullscreen: true,
            random_seed: None,
        }
    }
}
