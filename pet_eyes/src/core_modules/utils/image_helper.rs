pub mod image_helper {
    use crate::core_modules::frame::FrameBuffer;
    use crate::error::Result;
    use image::ImageEncoder;
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::Path;

    /// Decodes any format the `image` crate understands into an RGBA8 frame.
    pub fn load_frame(path: impl AsRef<Path>) -> Result<FrameBuffer> {
        let image = image::open(path)?.into_rgba8();
        Ok(FrameBuffer::from(image))
    }

    /// Encodes a frame as an RGBA8 PNG.
    pub fn save_png(path: impl AsRef<Path>, frame: &FrameBuffer) -> Result<()> {
        let mut output = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(&mut output);

        encoder.write_image(
            frame.as_bytes(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        output.flush()?;

        Ok(())
    }
}
