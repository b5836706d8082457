use std::collections::HashMap;

use anyhow::Context as _;
use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::data_structures::texture::{Texture, TextureId, TextureRef, TextureSource};

/// How many colour channels to decode an image with.
///
/// Diffuse maps are decoded with four channels so alpha survives for blending,
/// specular maps with three. Three-channel maps are treated as linear data, the
/// others as sRGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelHint {
    /// Keep whatever the file stores.
    Native,
    Rgb,
    Rgba,
}

impl ChannelHint {
    pub fn channels(self) -> Option<u8> {
        match self {
            ChannelHint::Native => None,
            ChannelHint::Rgb => Some(3),
            ChannelHint::Rgba => Some(4),
        }
    }

    pub fn is_srgb(self) -> bool {
        !matches!(self, ChannelHint::Rgb)
    }
}

/// A decoded image ready for upload, mip chain included.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count after applying the [`ChannelHint`].
    pub channels: u8,
    pub srgb: bool,
    /// Level 0 is the full image, every following level halves both sides.
    pub levels: Vec<RgbaImage>,
}

/// Decode the image a material points at.
pub fn decode_texture(texture: &TextureRef, hint: ChannelHint) -> anyhow::Result<DecodedImage> {
    let img = match &texture.source {
        TextureSource::File(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("could not read texture {}", path.display()))?;
            image::load_from_memory(&bytes)
        }
        TextureSource::Embedded(bytes) => image::load_from_memory(bytes),
    }
    .with_context(|| format!("could not decode texture {}", texture.key))?;
    Ok(decode_image(img, hint))
}

/// Apply the channel hint to an already decoded image and build its mip chain.
pub fn decode_image(img: DynamicImage, hint: ChannelHint) -> DecodedImage {
    let native_channels = img.color().channel_count();
    let (channels, rgba) = match hint {
        // Dropping the alpha channel: expand back to RGBA with full opacity.
        ChannelHint::Rgb => (3, DynamicImage::ImageRgb8(img.to_rgb8()).to_rgba8()),
        ChannelHint::Rgba => (4, img.to_rgba8()),
        ChannelHint::Native => (native_channels, img.to_rgba8()),
    };
    DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        channels,
        srgb: hint.is_srgb(),
        levels: mip_chain(rgba),
    }
}

/// Number of mip levels down to 1x1 for an image of the given size.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Build the full mip chain of `base`, filtering every level down from the one above.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);
    while levels.len() < count {
        let Some(previous) = levels.last() else { break };
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Path-keyed, never-evicting store of textures.
///
/// A key is attempted at most once: successful loads are kept and handed out again,
/// failed loads are remembered as `None` so a broken file is not decoded on every
/// reference.
///
/// The cache is generic over what it stores so the lookup policy does not depend on
/// a GPU; the viewer uses `TextureCache<Texture>`. Every cache owns a fallback that
/// [`resolve`](Self::resolve) hands out for empty or failed slots.
#[derive(Debug)]
pub struct TextureCache<T = Texture> {
    by_key: HashMap<String, Option<TextureId>>,
    textures: Vec<T>,
    fallback: T,
}

impl<T> TextureCache<T> {
    pub fn new(fallback: T) -> Self {
        Self {
            by_key: HashMap::new(),
            textures: Vec::new(),
            fallback,
        }
    }

    /// Return the handle cached under `key`, or run `load` once and cache its outcome.
    pub fn get_or_insert_with<F>(&mut self, key: &str, load: F) -> Option<TextureId>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        if let Some(entry) = self.by_key.get(key) {
            return *entry;
        }
        let entry = match load() {
            Ok(texture) => {
                self.textures.push(texture);
                Some(TextureId(self.textures.len() - 1))
            }
            Err(e) => {
                log::warn!("Texture {key} is unavailable and will be rendered without: {e:#}");
                None
            }
        };
        self.by_key.insert(key.to_string(), entry);
        entry
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.textures.get(id.0)
    }

    /// The texture behind `id`, or the fallback when the slot is empty.
    pub fn resolve(&self, id: Option<TextureId>) -> &T {
        id.and_then(|id| self.get(id)).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of textures actually loaded (failed keys excluded).
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureCache<Texture> {
    /// A GPU cache whose fallback is a 1x1 white texture, so an untextured material
    /// samples its base colour unchanged.
    pub fn for_device(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::new(Texture::create_solid(
            [255, 255, 255, 255],
            "fallback white texture",
            device,
            queue,
        ))
    }

    /// Return the cached texture for `texture.key`, decoding and uploading it on first use.
    pub fn get_or_load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &TextureRef,
        hint: ChannelHint,
    ) -> Option<TextureId> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        self.get_or_insert_with(&texture.key, || {
            let decoded = decode_texture(texture, hint)?;
            check_texture_size(decoded.width, decoded.height, max_dimension)?;
            log::info!(
                "Loaded texture {} ({}x{}, {} channels, {} mips)",
                texture.key,
                decoded.width,
                decoded.height,
                decoded.channels,
                decoded.levels.len()
            );
            Ok(Texture::from_decoded(
                device,
                queue,
                &decoded,
                Some(&texture.key),
            ))
        })
    }
}

/// Refuse images the device cannot hold as a single 2D texture.
pub fn check_texture_size(width: u32, height: u32, max_dimension: u32) -> anyhow::Result<()> {
    anyhow::ensure!(
        width <= max_dimension && height <= max_dimension,
        "{width}x{height} exceeds the device limit of {max_dimension} pixels per side"
    );
    Ok(())
}

/// Turns texture references into cache handles during an import.
pub trait TextureResolver {
    fn resolve(&mut self, texture: &TextureRef, hint: ChannelHint) -> Option<TextureId>;
}

/// Resolves textures by loading them into a GPU [`TextureCache`].
pub struct GpuTextureLoader<'a> {
    pub cache: &'a mut TextureCache<Texture>,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl TextureResolver for GpuTextureLoader<'_> {
    fn resolve(&mut self, texture: &TextureRef, hint: ChannelHint) -> Option<TextureId> {
        self.cache
            .get_or_load(self.device, self.queue, texture, hint)
    }
}

/// Bind group layout of a material: diffuse texture and sampler at bindings 0/1,
/// specular texture and sampler at 2/3, the material uniform at 4.
pub fn diffuse_specular_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Material bind group layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_levels_reach_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 20), 9);
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let levels = mip_chain(RgbaImage::new(8, 2));
        let sizes: Vec<_> = levels.iter().map(|l| l.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn oversized_textures_are_refused() {
        assert!(check_texture_size(8192, 8192, 8192).is_ok());
        assert!(check_texture_size(1, 1, 8192).is_ok());
        assert!(check_texture_size(16384, 16384, 8192).is_err());
        assert!(check_texture_size(8193, 4, 8192).is_err());
        assert!(check_texture_size(4, 8193, 8192).is_err());
    }

    #[test]
    fn a_refused_texture_is_cached_as_missing() {
        let mut cache = TextureCache::new("white");
        let mut attempts = 0;
        for _ in 0..2 {
            let id = cache.get_or_insert_with("huge.png", || {
                attempts += 1;
                check_texture_size(16384, 16384, 8192)?;
                Ok("huge")
            });
            assert_eq!(id, None);
        }
        assert_eq!(attempts, 1);
        assert_eq!(*cache.resolve(None), "white");
        assert!(cache.is_empty());
    }

    #[test]
    fn rgb_hint_makes_texture_opaque() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 0]));
        let decoded = decode_image(DynamicImage::ImageRgba8(img), ChannelHint::Rgb);
        assert_eq!(decoded.channels, 3);
        assert!(!decoded.srgb);
        assert_eq!(decoded.levels[0].get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
