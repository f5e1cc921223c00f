//! Light sources placed in the assembled scene.

/// A light in world space. Colours are linear RGB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Shines from `position` toward the world origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: [f32; 3],
        cast_shadow: bool,
    },
    /// Omni light with inverse-square falloff.
    Point {
        color: [f32; 3],
        intensity: f32,
        position: [f32; 3],
        cast_shadow: bool,
    },
}

impl Light {
    pub fn casts_shadow(&self) -> bool {
        match self {
            Light::Ambient { .. } => false,
            Light::Directional { cast_shadow, .. } | Light::Point { cast_shadow, .. } => *cast_shadow,
        }
    }

    /// Colour pre-multiplied with intensity, as the shaders consume it.
    pub fn radiance(&self) -> [f32; 3] {
        let (color, intensity) = match self {
            Light::Ambient { color, intensity }
            | Light::Directional {
                color, intensity, ..
            }
            | Light::Point {
                color, intensity, ..
            } => (color, intensity),
        };
        color.map(|c| c * intensity)
    }
}
