// THEORY:
// The `vision_model` module is the algorithmic heart of the engine. A
// `VisionModel` is a fixed coefficient tuple that approximates two-cone
// (dichromatic) color vision; its `transform` is a pure, total function from one
// `ColorSample` to another.
//
// The five steps always run in this order, and reordering them changes results:
// 1.  **Luminance**: Rec. 601 luma of the input, the neutral reference.
// 2.  **Reprojection**: red and green are recombined into new red/green values,
//     green and blue are mixed into a new blue. This is where a missing cone type
//     is modeled: reds collapse toward yellow/brown, blues survive.
// 3.  **Saturation blend**: each channel moves from luminance toward the
//     reprojected value by the saturation factor (0 = gray, 1 = full color).
// 4.  **Brightness**: a uniform multiplier (1.0 = unchanged), e.g. for better
//     low-light sensitivity.
// 5.  **Clamp**: every channel back into 0..=255.
//
// Species are a closed set. Adding one means adding a `Species` variant and its
// coefficient tuple; the transform code never branches on species.

use crate::core_modules::pixel::pixel::{ColorSample, MAX_CHANNEL};
use crate::error::{Result, VisionError};

/// Linear recombination used by step 2.
///
/// `R' = red_from_red·R + red_from_green·G`,
/// `G' = green_from_red·R + green_from_green·G`,
/// `B' = blue_from_green·G + blue_from_blue·B`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reprojection {
    pub red_from_red: f32,
    pub red_from_green: f32,
    pub green_from_red: f32,
    pub green_from_green: f32,
    pub blue_from_green: f32,
    pub blue_from_blue: f32,
}

impl Reprojection {
    /// Leaves every channel where it was.
    pub const IDENTITY: Self = Self {
        red_from_red: 1.0,
        red_from_green: 0.0,
        green_from_red: 0.0,
        green_from_green: 1.0,
        blue_from_green: 0.0,
        blue_from_blue: 1.0,
    };

    #[inline]
    pub fn apply(&self, sample: ColorSample) -> ColorSample {
        ColorSample::new(
            self.red_from_red * sample.red + self.red_from_green * sample.green,
            self.green_from_red * sample.red + self.green_from_green * sample.green,
            self.blue_from_green * sample.green + self.blue_from_blue * sample.blue,
        )
    }

    fn coefficients(&self) -> [f32; 6] {
        [
            self.red_from_red,
            self.red_from_green,
            self.green_from_red,
            self.green_from_green,
            self.blue_from_green,
            self.blue_from_blue,
        ]
    }
}

/// The full coefficient tuple of one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionModel {
    pub reprojection: Reprojection,
    /// Blend weight toward the reprojected color, in `[0, 1]`.
    pub saturation: f32,
    /// Uniform multiplier applied after the blend.
    pub brightness: f32,
}

impl VisionModel {
    /// Runs luminance → reprojection → saturation blend → brightness → clamp.
    #[inline]
    pub fn transform(&self, sample: ColorSample) -> ColorSample {
        let [_, _, brightened] = self.steps(sample);
        brightened.clamped()
    }

    /// Reprojected, blended and brightened values of one sample, before the clamp.
    #[inline]
    fn steps(&self, sample: ColorSample) -> [ColorSample; 3] {
        let luminance = sample.luminance();
        let saturation = self.saturation;
        let brightness = self.brightness;
        let reprojected = self.reprojection.apply(sample);
        let blended = reprojected.map(|channel| luminance + (channel - luminance) * saturation);
        let brightened = blended.map(|channel| channel * brightness);
        [reprojected, blended, brightened]
    }

    /// Checks that the tuple maps every in-range sample to a defined output.
    ///
    /// Every step is linear, so finite values at the eight corners of the RGB
    /// cube bound every sample inside it.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(bad) = self.reprojection.coefficients().iter().find(|c| !c.is_finite()) {
            return Err(format!("reprojection coefficient {bad} is not finite"));
        }
        if !(0.0..=1.0).contains(&self.saturation) {
            return Err(format!("saturation factor {} is outside [0, 1]", self.saturation));
        }
        if !self.brightness.is_finite() || self.brightness < 0.0 {
            return Err(format!("brightness multiplier {} must be finite and non-negative", self.brightness));
        }
        for corner in range_corners() {
            let steps = self.steps(corner);
            for (step, value) in ["reprojection", "saturation blend", "brightness"].into_iter().zip(steps) {
                if !value.is_finite() {
                    return Err(format!("{step} overflows for input {corner:?}"));
                }
            }
        }
        Ok(())
    }
}

/// The eight samples whose channels are each 0 or 255.
fn range_corners() -> impl Iterator<Item = ColorSample> {
    (0..8u8).map(|bits| {
        let pick = |bit: u8| if bits & bit != 0 { MAX_CHANNEL } else { 0.0 };
        ColorSample::new(pick(4), pick(2), pick(1))
    })
}

/// The built-in catalog of modeled species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Dog,
    Cat,
}

impl Species {
    /// Presentation order.
    pub const ALL: [Species; 2] = [Species::Dog, Species::Cat];

    pub fn id(self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Dog => "Dog",
            Species::Cat => "Cat",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Species::Dog => "🐕",
            Species::Cat => "🐱",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Species::Dog => "Red-blind dichromat: reds turn yellow-brown, blues stay, colors are muted.",
            Species::Cat => "Dichromat close to the dog, slightly richer color and brighter in low light.",
        }
    }

    pub fn model(self) -> VisionModel {
        match self {
            Species::Dog => VisionModel {
                reprojection: Reprojection {
                    red_from_red: 0.56667,
                    red_from_green: 0.43333,
                    green_from_red: 0.55833,
                    green_from_green: 0.44167,
                    blue_from_green: 0.24167,
                    blue_from_blue: 0.75833,
                },
                saturation: 0.6,
                brightness: 1.0,
            },
            Species::Cat => VisionModel {
                reprojection: Reprojection {
                    red_from_red: 0.625,
                    red_from_green: 0.375,
                    green_from_red: 0.7,
                    green_from_green: 0.3,
                    blue_from_green: 0.3,
                    blue_from_blue: 0.7,
                },
                saturation: 0.65,
                brightness: 1.1,
            },
        }
    }

    pub fn profile(self) -> VisionProfile {
        VisionProfile::new(self.id(), self.name(), self.icon(), self.model())
            .with_description(self.description())
    }
}

/// An immutable, named vision model as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub model: VisionModel,
}

impl VisionProfile {
    pub fn new(id: &'static str, name: &'static str, icon: &'static str, model: VisionModel) -> Self {
        Self {
            id,
            name,
            icon,
            description: "",
            model,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    #[inline]
    pub fn transform(&self, sample: ColorSample) -> ColorSample {
        self.model.transform(sample)
    }

    /// Rewrites the RGB bytes of one RGBA pixel in place. Alpha is not read.
    #[inline]
    pub fn apply_to_pixel(&self, rgba: &mut [u8]) {
        let out = self.transform(ColorSample::from_channels(rgba[0], rgba[1], rgba[2]));
        let [red, green, blue] = out.to_channels();
        rgba[0] = red;
        rgba[1] = green;
        rgba[2] = blue;
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(VisionError::InvalidProfile {
                id: String::new(),
                reason: "identifier is empty".to_string(),
            });
        }
        self.model.validate().map_err(|reason| VisionError::InvalidProfile {
            id: self.id.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn extremes() -> Vec<ColorSample> {
        range_corners().collect()
    }

    #[test]
    fn dog_turns_pure_red_into_muted_yellow() {
        let out = Species::Dog.model().transform(ColorSample::from_channels(255, 0, 0));
        assert_abs_diff_eq!(out.red, 117.195, epsilon = 0.01);
        assert_abs_diff_eq!(out.green, 115.92, epsilon = 0.01);
        assert_abs_diff_eq!(out.blue, 30.498, epsilon = 0.01);
        assert_eq!(out.to_channels(), [117, 116, 30]);
    }

    #[test]
    fn cat_brightens_after_the_blend() {
        let cat = Species::Cat.model();

        let red = cat.transform(ColorSample::from_channels(255, 0, 0));
        assert_abs_diff_eq!(red.red, 143.31, epsilon = 0.01);
        assert_abs_diff_eq!(red.green, 156.98, epsilon = 0.01);
        assert_abs_diff_eq!(red.blue, 29.35, epsilon = 0.01);
        assert_eq!(red.to_channels(), [143, 157, 29]);

        let blue = cat.transform(ColorSample::from_channels(0, 0, 255));
        assert_abs_diff_eq!(blue.red, 11.19, epsilon = 0.01);
        assert_abs_diff_eq!(blue.green, 11.19, epsilon = 0.01);
        assert_abs_diff_eq!(blue.blue, 138.82, epsilon = 0.01);
        assert_eq!(blue.to_channels(), [11, 11, 139]);
    }

    #[test]
    fn cat_brightness_saturates_white() {
        let out = Species::Cat.model().transform(ColorSample::splat(255.0));
        assert_eq!(out, ColorSample::splat(255.0));
    }

    #[test]
    fn every_species_stays_in_range_at_extremes() {
        for species in Species::ALL {
            for sample in extremes() {
                let out = species.model().transform(sample);
                assert!(out.is_in_range(), "{species:?} {sample:?} -> {out:?}");
            }
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let model = Species::Cat.model();
        let sample = ColorSample::from_channels(12, 200, 99);
        let first = model.transform(sample);
        let second = model.transform(sample);
        assert_eq!(first.red.to_bits(), second.red.to_bits());
        assert_eq!(first.green.to_bits(), second.green.to_bits());
        assert_eq!(first.blue.to_bits(), second.blue.to_bits());
    }

    #[test]
    fn zero_saturation_is_pure_luminance() {
        let model = VisionModel {
            saturation: 0.0,
            ..Species::Dog.model()
        };
        for sample in extremes().into_iter().chain([ColorSample::from_channels(10, 128, 240)]) {
            let out = model.transform(sample);
            let luma = sample.luminance();
            assert_abs_diff_eq!(out.red, luma, epsilon = 1e-3);
            assert_abs_diff_eq!(out.green, luma, epsilon = 1e-3);
            assert_abs_diff_eq!(out.blue, luma, epsilon = 1e-3);
        }
    }

    #[test]
    fn full_saturation_is_pure_reprojection() {
        let model = VisionModel {
            saturation: 1.0,
            brightness: 1.0,
            ..Species::Dog.model()
        };
        let sample = ColorSample::from_channels(200, 40, 90);
        let out = model.transform(sample);
        let expected = model.reprojection.apply(sample);
        assert_abs_diff_eq!(out.red, expected.red, epsilon = 1e-3);
        assert_abs_diff_eq!(out.green, expected.green, epsilon = 1e-3);
        assert_abs_diff_eq!(out.blue, expected.blue, epsilon = 1e-3);
    }

    #[test]
    fn apply_to_pixel_leaves_alpha_alone() {
        let mut rgba = [255u8, 0, 0, 77];
        Species::Dog.profile().apply_to_pixel(&mut rgba);
        assert_eq!(rgba, [117, 116, 30, 77]);
    }

    #[test]
    fn validation_rejects_bad_tuples() {
        let mut model = Species::Dog.model();
        model.saturation = 1.5;
        assert!(model.validate().is_err());

        let mut model = Species::Dog.model();
        model.brightness = f32::INFINITY;
        assert!(model.validate().is_err());

        let mut model = Species::Dog.model();
        model.reprojection.blue_from_blue = f32::NAN;
        assert!(model.validate().is_err());

        assert!(Species::Cat.model().validate().is_ok());
    }

    #[test]
    fn validation_rejects_tuples_that_overflow() {
        let model = VisionModel {
            reprojection: Reprojection {
                red_from_red: 3.0e38,
                ..Reprojection::IDENTITY
            },
            saturation: 0.0,
            brightness: 1.0,
        };
        let reason = model.validate().unwrap_err();
        assert!(reason.contains("overflows"), "{reason}");

        let model = VisionModel {
            brightness: 3.0e38,
            ..Species::Dog.model()
        };
        assert!(model.validate().is_err());
    }
}
