// THEORY (single-pixel color math):
// The `pixel` module is the smallest unit of the engine. A `ColorSample` is a
// "dumb" RGB triple widened to `f32` in the device-native 0..255 range, plus the
// handful of single-pixel operations every vision model needs: Rec. 601 luminance
// and clamping back into range. Nothing here knows about neighbors, frames or
// species.
//
// Why f32 in 0..255 and not 0..1?
// - Frames arrive as RGBA8, so keeping the byte range avoids a divide and a
//   multiply per channel in the hot loop.
// - Coefficient tuples are quoted against byte values, which keeps worked
//   examples (255,0,0 -> ...) readable.
//
// Alpha never enters a `ColorSample`. The frame layer reads RGB out of a pixel,
// hands the sample to a model, and writes RGB back; alpha stays in the buffer.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type ComputedChannel = f32;
    pub type Luminance = f32;

    /// Bytes per RGBA pixel.
    pub const CHANNELS: usize = 4;
    /// Upper bound of a computed channel.
    pub const MAX_CHANNEL: ComputedChannel = 255.0;

    const LUMA_RED: f32 = 0.299;
    const LUMA_GREEN: f32 = 0.587;
    const LUMA_BLUE: f32 = 0.114;

    /// An RGB triple in the 0.0..=255.0 range.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct ColorSample {
        pub red: ComputedChannel,
        pub green: ComputedChannel,
        pub blue: ComputedChannel,
    }

    impl ColorSample {
        pub const fn new(red: ComputedChannel, green: ComputedChannel, blue: ComputedChannel) -> Self {
            Self { red, green, blue }
        }

        /// Widens three byte channels into a sample.
        #[inline]
        pub fn from_channels(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red as ComputedChannel, green as ComputedChannel, blue as ComputedChannel)
        }

        /// Luminance estimate (Rec. 601 luma).
        ///
        /// Used as the neutral gray every model desaturates toward.
        #[inline]
        pub fn luminance(&self) -> Luminance {
            LUMA_RED * self.red + LUMA_GREEN * self.green + LUMA_BLUE * self.blue
        }

        /// Gray sample with every channel set to `value`.
        #[inline]
        pub const fn splat(value: ComputedChannel) -> Self {
            Self::new(value, value, value)
        }

        /// Applies `f` to each channel independently.
        #[inline]
        pub fn map(self, f: impl Fn(ComputedChannel) -> ComputedChannel) -> Self {
            Self::new(f(self.red), f(self.green), f(self.blue))
        }

        /// Clamps every channel into 0..=255. NaN collapses to 0.
        #[inline]
        pub fn clamped(self) -> Self {
            self.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, MAX_CHANNEL) })
        }

        /// Narrows back to bytes, rounding to the nearest integer after clamping.
        #[inline]
        pub fn to_channels(self) -> [Channel; 3] {
            let c = self.clamped();
            [
                c.red.round() as Channel,
                c.green.round() as Channel,
                c.blue.round() as Channel,
            ]
        }

        pub fn is_finite(&self) -> bool {
            self.red.is_finite() && self.green.is_finite() && self.blue.is_finite()
        }

        pub fn is_in_range(&self) -> bool {
            [self.red, self.green, self.blue]
                .iter()
                .all(|c| (0.0..=MAX_CHANNEL).contains(c))
        }
    }

    impl From<[Channel; 3]> for ColorSample {
        fn from(rgb: [Channel; 3]) -> Self {
            Self::from_channels(rgb[0], rgb[1], rgb[2])
        }
    }
}
