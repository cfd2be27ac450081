//! HDRI environment map loading and pre-filtering.
//!
//! Decodes a Radiance .hdr equirectangular panorama to float pixels, builds a
//! box-filtered mip chain on the CPU (coarser mips stand in for rougher
//! reflections), packs to half floats, and uploads the full chain as an
//! Rgba16Float texture. The raw decode buffers are dropped once uploaded.

use image::GenericImageView;

/// Error type for environment loading.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("failed to decode HDR image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("HDR image has zero dimension")]
    EmptyImage,
}

/// Decoded equirectangular panorama, RGBA f32 (alpha fixed at 1).
pub struct HdriImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` floats, row-major RGBA.
    pub pixels: Vec<f32>,
}

/// Decode .hdr bytes into float pixels.
pub fn decode_hdr(bytes: &[u8]) -> Result<HdriImage, EnvironmentError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(EnvironmentError::EmptyImage);
    }

    let rgb = img.to_rgb32f();
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for px in rgb.pixels() {
        pixels.extend_from_slice(&[px[0], px[1], px[2], 1.0]);
    }

    Ok(HdriImage {
        width,
        height,
        pixels,
    })
}

/// Halve an image with a 2x2 box filter (edge rows/columns clamp).
pub fn downsample(src: &HdriImage) -> HdriImage {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);

    let sample = |x: u32, y: u32| {
        let x = x.min(src.width - 1);
        let y = y.min(src.height - 1);
        let i = ((y * src.width + x) * 4) as usize;
        [
            src.pixels[i],
            src.pixels[i + 1],
            src.pixels[i + 2],
            src.pixels[i + 3],
        ]
    };

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 4];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let px = sample(x * 2 + dx, y * 2 + dy);
                for c in 0..4 {
                    acc[c] += px[c];
                }
            }
            pixels.extend_from_slice(&[
                acc[0] * 0.25,
                acc[1] * 0.25,
                acc[2] * 0.25,
                acc[3] * 0.25,
            ]);
        }
    }

    HdriImage {
        width,
        height,
        pixels,
    }
}

/// Number of mip levels for a base size, down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Build the full mip chain, base level included.
pub fn build_mip_chain(base: HdriImage) -> Vec<HdriImage> {
    let levels = mip_level_count(base.width, base.height) as usize;
    let mut chain = Vec::with_capacity(levels);
    chain.push(base);
    while chain.len() < levels {
        let next = downsample(chain.last().expect("chain is non-empty"));
        chain.push(next);
    }
    chain
}

/// IEEE 754 binary32 to binary16 bit conversion (round toward zero).
pub fn f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    // Inf and NaN both clamp to inf; HDR data never carries NaN payloads.
    if exp == 0xff {
        return sign | 0x7c00;
    }

    let e = exp - 127 + 15;
    if e >= 0x1f {
        // Overflow to inf.
        return sign | 0x7c00;
    }
    if e <= 0 {
        // Subnormal half, or underflow to zero.
        if e < -10 {
            return sign;
        }
        let m = (mantissa | 0x0080_0000) >> (14 - e);
        return sign | m as u16;
    }

    sign | ((e as u16) << 10) | (mantissa >> 13) as u16
}

/// Pack float RGBA pixels to half floats.
pub fn pack_f16(pixels: &[f32]) -> Vec<u16> {
    pixels.iter().copied().map(f16_bits).collect()
}

/// The pre-filtered environment map on the GPU.
pub struct EnvironmentMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub mip_count: u32,
}

impl EnvironmentMap {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Upload a decoded panorama with its full mip chain.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, hdri: HdriImage) -> Self {
        let (width, height) = (hdri.width, hdri.height);
        let mip_count = mip_level_count(width, height);
        let chain = build_mip_chain(hdri);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("environment_map"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in chain.iter().enumerate() {
            let packed = pack_f16(&mip.pixels);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(&packed),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(mip.width * 8),
                    rows_per_image: Some(mip.height),
                },
                wgpu::Extent3d {
                    width: mip.width,
                    height: mip.height,
                    depth_or_array_layers: 1,
                },
            );
        }
        // `chain` drops here; the raw float data is a one-shot resource.

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            mip_count,
        }
    }

    /// 1x1 black placeholder bound while no environment has loaded.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::new(
            device,
            queue,
            HdriImage {
                width: 1,
                height: 1,
                pixels: vec![0.0, 0.0, 0.0, 1.0],
            },
        )
    }

    /// Highest mip level, for roughness-driven LOD selection.
    pub fn max_lod(&self) -> f32 {
        (self.mip_count - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f16_known_values() {
        assert_eq!(f16_bits(0.0), 0x0000);
        assert_eq!(f16_bits(1.0), 0x3c00);
        assert_eq!(f16_bits(0.5), 0x3800);
        assert_eq!(f16_bits(-2.0), 0xc000);
        assert_eq!(f16_bits(65504.0), 0x7bff);
        // Overflow clamps to inf.
        assert_eq!(f16_bits(1.0e9), 0x7c00);
        // Subnormal: half of the smallest normal half float.
        assert_eq!(f16_bits(2.0f32.powi(-15)), 0x0200);
    }

    #[test]
    fn mip_count_covers_down_to_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 500), 10);
    }

    #[test]
    fn downsample_averages_quads() {
        let src = HdriImage {
            width: 2,
            height: 2,
            pixels: vec![
                1.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, //
                1.0, 1.0, 1.0, 1.0, //
            ],
        };
        let down = downsample(&src);
        assert_eq!((down.width, down.height), (1, 1));
        assert_eq!(down.pixels, vec![0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn mip_chain_ends_at_one_by_one() {
        let chain = build_mip_chain(HdriImage {
            width: 8,
            height: 4,
            pixels: vec![0.25; 8 * 4 * 4],
        });
        assert_eq!(chain.len(), 4);
        assert_eq!((chain[0].width, chain[0].height), (8, 4));
        assert_eq!((chain[3].width, chain[3].height), (1, 1));
        // A constant image stays constant through the box filter.
        assert!((chain[3].pixels[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_hdr(b"not an hdr file at all").is_err());
    }
}
