use std::path::Path;

use thiserror::Error;

use crate::device::{DeviceContext, DeviceError};

/// Errors from the image → GPU-texture pipeline.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The image payload could not be decoded.
    #[error("image payload could not be decoded")]
    ImageDecodeError(#[from] image::ImageError),

    /// The decoded image cannot be uploaded to this device.
    #[error("texture upload rejected: {0}")]
    TextureUploadError(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// A sampled 2D texture with its default view and sampler.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Image → GPU-texture pipeline.
///
/// Decodes with the `image` crate, validates the extent against device
/// limits, and uploads through the queue.
#[derive(Debug, Clone, Default)]
pub struct TextureLoader {
    _private: (),
}

impl TextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes` and uploads the result as an RGBA8 texture.
    pub fn load_texture(
        &self,
        ctx: &DeviceContext,
        bytes: &[u8],
    ) -> Result<GpuTexture, TextureError> {
        let decoded = image::load_from_memory(bytes)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        self.upload(ctx, &rgba, width, height)
    }

    /// Reads `path` and forwards to [`Self::load_texture`].
    pub fn load_texture_from_path(
        &self,
        ctx: &DeviceContext,
        path: &Path,
    ) -> Result<GpuTexture, TextureError> {
        let bytes = std::fs::read(path)
            .map_err(|err| TextureError::ImageDecodeError(image::ImageError::IoError(err)))?;
        self.load_texture(ctx, &bytes)
    }

    fn upload(
        &self,
        ctx: &DeviceContext,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<GpuTexture, TextureError> {
        let device = ctx.device()?;
        let queue = ctx.queue()?;

        if width == 0 || height == 0 {
            return Err(TextureError::TextureUploadError(
                "image has zero extent".into(),
            ));
        }

        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(TextureError::TextureUploadError(format!(
                "{width}x{height} exceeds the device limit of {max}"
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let label = ctx.format_label("texture");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&ctx.format_label("sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(GpuTexture {
            texture,
            view,
            sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::device::{test_context, DeviceInit};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 255, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        // Decoding happens before any device access, so an uninitialized
        // context is fine here.
        let ctx = DeviceContext::new(
            "test",
            DeviceInit {
                backends: wgpu::Backends::empty(),
                ..Default::default()
            },
        );

        let result = TextureLoader::new().load_texture(&ctx, b"not an image");
        assert!(matches!(result, Err(TextureError::ImageDecodeError(_))));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let ctx = DeviceContext::new(
            "test",
            DeviceInit {
                backends: wgpu::Backends::empty(),
                ..Default::default()
            },
        );

        let result = TextureLoader::new()
            .load_texture_from_path(&ctx, Path::new("/nonexistent/texture.png"));
        assert!(matches!(result, Err(TextureError::ImageDecodeError(_))));
    }

    #[test]
    fn valid_png_uploads_on_a_ready_device() {
        let Some(ctx) = test_context() else {
            return;
        };

        let loaded = TextureLoader::new()
            .load_texture(&ctx, &png_bytes(2, 2))
            .unwrap();
        assert_eq!(loaded.texture.width(), 2);
        assert_eq!(loaded.texture.height(), 2);
    }
}
