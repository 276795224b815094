use crate::foundation::error::{RounderError, RounderResult};
use crate::transform::color::Color;
use crate::vault::resolve::parent_dir;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest border width, shadow blur radius or shadow offset accepted, in pixels.
pub const MAX_EFFECT_PX: f64 = 4096.0;

/// Unit a corner radius is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiusUnit {
    /// Percentage of the smaller image dimension.
    #[default]
    Percent,
    /// Absolute pixels.
    #[serde(alias = "pixel")]
    Px,
}

impl RadiusUnit {
    /// Token passed to the external transform routine (`percent` or `px`).
    pub fn token(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Px => "px",
        }
    }

    /// Suffix used in output file names (`p` or `px`).
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Percent => "p",
            Self::Px => "px",
        }
    }
}

impl std::str::FromStr for RadiusUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "%" | "p" => Ok(Self::Percent),
            "px" | "pixel" | "pixels" => Ok(Self::Px),
            other => Err(format!("unknown radius unit \"{other}\" (expected percent or px)")),
        }
    }
}

/// Stroke pattern of a border.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    /// Continuous ring.
    #[default]
    Solid,
    /// Dashes of three widths separated by gaps of two widths.
    Dashed,
    /// Dots of one width separated by gaps of one width.
    Dotted,
}

impl BorderStyle {
    /// Lowercase name, as passed to the external transform routine.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

impl std::str::FromStr for BorderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solid" => Ok(Self::Solid),
            "dashed" => Ok(Self::Dashed),
            "dotted" => Ok(Self::Dotted),
            other => Err(format!("unknown border style \"{other}\"")),
        }
    }
}

/// Drop shadow composited behind the rounded image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowSpec {
    /// Shadow tint.
    pub color: Color,
    /// Gaussian blur radius in pixels.
    pub blur_radius: f64,
    /// Offset in pixels, applied on both axes.
    pub offset: f64,
}

impl Default for ShadowSpec {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            blur_radius: 10.0,
            offset: 5.0,
        }
    }
}

/// Border ring drawn outside the rounded silhouette.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderSpec {
    /// Border color.
    pub color: Color,
    /// Ring width in pixels.
    pub width: f64,
    /// Stroke pattern.
    pub style: BorderStyle,
}

impl Default for BorderSpec {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 2.0,
            style: BorderStyle::Solid,
        }
    }
}

/// Fully resolved parameters for one batch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    /// Requested corner radius, interpreted per `unit`.
    pub radius: f64,
    /// Radius unit.
    pub unit: RadiusUnit,
    /// Optional drop shadow.
    #[serde(default)]
    pub shadow: Option<ShadowSpec>,
    /// Optional border.
    #[serde(default)]
    pub border: Option<BorderSpec>,
}

impl TransformParams {
    /// Radius-only parameters.
    pub fn new(radius: f64, unit: RadiusUnit) -> Self {
        Self {
            radius,
            unit,
            shadow: None,
            border: None,
        }
    }

    /// Builder-style shadow setter.
    pub fn with_shadow(mut self, shadow: ShadowSpec) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Builder-style border setter.
    pub fn with_border(mut self, border: BorderSpec) -> Self {
        self.border = Some(border);
        self
    }

    /// `true` when a shadow or a border is requested.
    pub fn has_effects(&self) -> bool {
        self.shadow.is_some() || self.border.is_some()
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> RounderResult<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(RounderError::validation("radius must be finite and >= 0"));
        }
        if let Some(shadow) = &self.shadow {
            if !(0.0..=MAX_EFFECT_PX).contains(&shadow.blur_radius) {
                return Err(RounderError::validation(format!(
                    "shadow blur radius must be within 0..={MAX_EFFECT_PX}"
                )));
            }
            if !(0.0..=MAX_EFFECT_PX).contains(&shadow.offset) {
                return Err(RounderError::validation(format!(
                    "shadow offset must be within 0..={MAX_EFFECT_PX}"
                )));
            }
        }
        if let Some(border) = &self.border
            && !(1.0..=MAX_EFFECT_PX).contains(&border.width)
        {
            return Err(RounderError::validation(format!(
                "border width must be within 1..={MAX_EFFECT_PX}"
            )));
        }
        Ok(())
    }

    /// Corner radius in pixels for an image of `width` x `height`.
    ///
    /// Always within `[0, min(width, height) / 2]`.
    pub fn effective_radius_px(&self, width: u32, height: u32) -> f64 {
        let base = f64::from(width.min(height));
        let requested = match self.unit {
            RadiusUnit::Percent => self.radius / 100.0 * base,
            RadiusUnit::Px => self.radius,
        };
        if requested.is_nan() {
            return 0.0;
        }
        requested.clamp(0.0, base / 2.0)
    }

    /// Deterministic output path for `asset_path`:
    /// `{dir}/{basename}-rounded-{radius}{p|px}.png`.
    pub fn output_path(&self, asset_path: &str) -> String {
        let dir = parent_dir(asset_path);
        let file = asset_path.rsplit('/').next().unwrap_or(asset_path);
        let base = match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file,
        };
        let name = format!(
            "{base}-rounded-{}{}.png",
            format_number(self.radius),
            self.unit.suffix()
        );
        if dir.is_empty() {
            name
        } else {
            format!("{dir}/{name}")
        }
    }
}

impl fmt::Display for TransformParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.radius), self.unit.suffix())?;
        if self.shadow.is_some() {
            f.write_str(" +shadow")?;
        }
        if let Some(border) = &self.border {
            write!(f, " +border({})", border.style.as_str())?;
        }
        Ok(())
    }
}

/// Render a number without a trailing `.0` when it is whole.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/params.rs"]
mod tests;
