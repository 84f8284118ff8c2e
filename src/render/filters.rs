//! Stylization filters and the draw passes each one needs.

use std::fmt;

use cgmath::Matrix4;
use rand::Rng;
use serde::Deserialize;

use super::transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    Kuwahara,
    Sketch,
    Toon,
    SmoothToon,
}

impl FilterKind {
    pub const ALL: [Self; 4] = [Self::Kuwahara, Self::Sketch, Self::Toon, Self::SmoothToon];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kuwahara => "kuwahara",
            Self::Sketch => "sketch",
            Self::Toon => "toon",
            Self::SmoothToon => "smooth-toon",
        }
    }

    /// Build the passes that draw the photo with this filter.
    ///
    /// `transform` maps the unit quad onto the crop window of the target.
    /// With `offscreen` set the filtered result lands in the offscreen surface
    /// first and a pass-through blit copies it to the screen.
    #[must_use]
    pub fn apply(self, transform: Matrix4<f32>, offscreen: bool) -> DrawCommand {
        let program = match self {
            Self::Kuwahara => ProgramId::Kuwahara,
            Self::Sketch => ProgramId::Sketch,
            Self::Toon => ProgramId::Toon,
            Self::SmoothToon => {
                // already ends with a read from the offscreen surface
                return DrawCommand {
                    passes: vec![
                        Pass {
                            program: ProgramId::GaussianBlur,
                            input: TextureSlot::Photo,
                            output: PassTarget::Offscreen,
                            transform,
                        },
                        Pass {
                            program: ProgramId::Toon,
                            input: TextureSlot::Offscreen,
                            output: PassTarget::Screen,
                            transform: transform::identity_blit(),
                        },
                    ],
                };
            }
        };

        let passes = if offscreen {
            vec![
                Pass {
                    program,
                    input: TextureSlot::Photo,
                    output: PassTarget::Offscreen,
                    transform,
                },
                Pass::blit(),
            ]
        } else {
            vec![Pass {
                program,
                input: TextureSlot::Photo,
                output: PassTarget::Screen,
                transform,
            }]
        };
        DrawCommand { passes }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index into `filters` for a freshly loaded photo.
pub fn pick<R: Rng + ?Sized>(filters: &[FilterKind], rng: &mut R) -> Option<usize> {
    if filters.is_empty() {
        None
    } else {
        Some(rng.random_range(0..filters.len()))
    }
}

/// Fragment programs compiled by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    Passthrough,
    Kuwahara,
    Sketch,
    Toon,
    GaussianBlur,
}

impl ProgramId {
    pub const ALL: [Self; 5] = [
        Self::Passthrough,
        Self::Kuwahara,
        Self::Sketch,
        Self::Toon,
        Self::GaussianBlur,
    ];

    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Passthrough => "fs_passthrough",
            Self::Kuwahara => "fs_kuwahara",
            Self::Sketch => "fs_sketch",
            Self::Toon => "fs_toon",
            Self::GaussianBlur => "fs_blur",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Photo,
    Offscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Screen,
    Offscreen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
    pub program: ProgramId,
    pub input: TextureSlot,
    pub output: PassTarget,
    pub transform: Matrix4<f32>,
}

impl Pass {
    fn blit() -> Self {
        Self {
            program: ProgramId::Passthrough,
            input: TextureSlot::Offscreen,
            output: PassTarget::Screen,
            transform: transform::identity_blit(),
        }
    }
}

/// Ordered passes for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    passes: Vec<Pass>,
}

impl DrawCommand {
    pub const MAX_PASSES: usize = 2;

    /// Plain copy of the photo to the screen.
    #[must_use]
    pub fn passthrough(transform: Matrix4<f32>) -> Self {
        Self {
            passes: vec![Pass {
                program: ProgramId::Passthrough,
                input: TextureSlot::Photo,
                output: PassTarget::Screen,
                transform,
            }],
        }
    }

    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    #[must_use]
    pub fn needs_offscreen(&self) -> bool {
        self.passes.iter().any(|p| {
            p.output == PassTarget::Offscreen || p.input == TextureSlot::Offscreen
        })
    }
}
