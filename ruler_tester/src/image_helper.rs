pub mod image_helper {
    use image::ImageEncoder;
    use std::path::Path;

    pub fn load_rgba(path: &Path) -> Result<image::RgbaImage, image::error::ImageError> {
        Ok(image::open(path)?.to_rgba8())
    }

    pub fn save(path: &Path, image: &image::RgbaImage) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }
}
