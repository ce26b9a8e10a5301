//! Texture assets: decoding, the shared decode cache, and GPU upload.
//!
//! [`TextureBank`] turns root-relative asset paths (`/noise.png`) into
//! [`TextureHandle`]s. Decoded images are cached process-wide by resolved path,
//! so loading the same file twice decodes it once. [`GpuTexture`] is the
//! renderer-side upload of a handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use crate::error::AssetError;
use crate::gpu::GpuContext;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

static DECODE_CACHE: LazyLock<Mutex<HashMap<PathBuf, Arc<DecodedImage>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// RGBA8 pixels decoded from an image file.
#[derive(Debug)]
pub struct DecodedImage {
    id: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels,
        }
    }

    /// Process-unique identifier, stable for the lifetime of the image.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
        }
    }
}

/// Opaque, cheaply clonable reference to a decoded texture.
#[derive(Clone, Debug)]
pub struct TextureHandle {
    image: Arc<DecodedImage>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl TextureHandle {
    pub fn new(image: Arc<DecodedImage>) -> Self {
        Self {
            image,
            wrap_s: WrapMode::default(),
            wrap_t: WrapMode::default(),
        }
    }

    /// Same image, with both axes set to `mode`.
    pub fn with_wrap(mut self, mode: WrapMode) -> Self {
        self.wrap_s = mode;
        self.wrap_t = mode;
        self
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    /// Key for caching GPU uploads: the image plus its sampling mode.
    pub fn cache_key(&self) -> (u64, WrapMode, WrapMode) {
        (self.image.id, self.wrap_s, self.wrap_t)
    }

    /// True if both handles point at the same decoded image.
    pub fn same_image(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

/// Loads image assets relative to an asset root directory.
#[derive(Clone, Debug)]
pub struct TextureBank {
    root: PathBuf,
}

impl TextureBank {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative asset path (`/noise.png`) against the asset root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Load every path, preserving order.
    ///
    /// Fails as a whole if any path fails to read or decode; no partial
    /// result is returned.
    pub async fn load(&self, paths: &[&str]) -> Result<Vec<TextureHandle>, AssetError> {
        paths
            .iter()
            .map(|path| self.load_one(path))
            .collect::<Result<Vec<_>, _>>()
    }

    fn load_one(&self, path: &str) -> Result<TextureHandle, AssetError> {
        let resolved = self.resolve(path);

        if let Some(image) = lock_cache().get(&resolved) {
            tracing::trace!(path = %resolved.display(), "texture cache hit");
            return Ok(TextureHandle::new(Arc::clone(image)));
        }

        let bytes = std::fs::read(&resolved).map_err(|source| AssetError::Io {
            path: resolved.clone(),
            source,
        })?;
        let rgba = image::load_from_memory(&bytes)
            .map_err(|source| AssetError::Decode {
                path: resolved.clone(),
                source,
            })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let image = Arc::new(DecodedImage::from_rgba(rgba.into_raw(), width, height));

        tracing::debug!(path = %resolved.display(), width, height, "decoded texture");

        // A concurrent load may have won the race; keep whichever landed first.
        let image = Arc::clone(lock_cache().entry(resolved).or_insert(image));
        Ok(TextureHandle::new(image))
    }
}

fn lock_cache() -> std::sync::MutexGuard<'static, HashMap<PathBuf, Arc<DecodedImage>>> {
    DECODE_CACHE.lock().unwrap_or_else(|e| e.into_inner())
}

/// A texture uploaded to the GPU with its sampler.
#[derive(Debug)]
pub struct GpuTexture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Upload raw RGBA data with the given wrap modes and linear filtering.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        wrap: (WrapMode, WrapMode),
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wrap.0.into(),
            address_mode_v: wrap.1.into(),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload the image behind a handle.
    pub fn from_handle(gpu: &GpuContext, handle: &TextureHandle, label: &str) -> Self {
        let image = handle.image();
        Self::from_rgba(
            gpu,
            &image.pixels,
            image.width,
            image.height,
            (handle.wrap_s, handle.wrap_t),
            label,
        )
    }

    /// A 1×1 texture of a single colour, bound when a material slot is empty.
    pub fn solid(gpu: &GpuContext, rgba: [u8; 4], label: &str) -> Self {
        Self::from_rgba(
            gpu,
            &rgba,
            1,
            1,
            (WrapMode::Repeat, WrapMode::Repeat),
            label,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 2, 3);
        write_png(dir.path(), "b.png", 5, 7);

        let bank = TextureBank::new(dir.path());
        let handles = pollster::block_on(bank.load(&["/a.png", "/b.png"])).unwrap();

        assert_eq!(handles.len(), 2);
        assert_eq!((handles[0].image().width, handles[0].image().height), (2, 3));
        assert_eq!((handles[1].image().width, handles[1].image().height), (5, 7));
    }

    #[test]
    fn failing_path_rejects_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 2, 2);
        std::fs::write(dir.path().join("b.png"), b"definitely not a png").unwrap();

        let bank = TextureBank::new(dir.path());
        let err = pollster::block_on(bank.load(&["/a.png", "/b.png"])).unwrap_err();

        match err {
            AssetError::Decode { path, .. } => assert!(path.ends_with("b.png")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let bank = TextureBank::new(dir.path());
        let err = pollster::block_on(bank.load(&["/nope.png"])).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn repeated_loads_share_decoded_image() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "shared.png", 4, 4);

        let bank = TextureBank::new(dir.path());
        let first = pollster::block_on(bank.load(&["/shared.png"])).unwrap();

        // Served from the cache even after the file is gone.
        std::fs::remove_file(dir.path().join("shared.png")).unwrap();
        let second = pollster::block_on(bank.load(&["/shared.png"])).unwrap();

        assert!(first[0].same_image(&second[0]));
    }

    #[test]
    fn wrap_mode_is_per_handle() {
        let image = Arc::new(DecodedImage::from_rgba(vec![0; 4], 1, 1));
        let plain = TextureHandle::new(Arc::clone(&image));
        let repeat = plain.clone().with_wrap(WrapMode::Repeat);

        assert_eq!(plain.wrap_s, WrapMode::ClampToEdge);
        assert_eq!(repeat.wrap_t, WrapMode::Repeat);
        assert!(plain.same_image(&repeat));
        assert_ne!(plain.cache_key(), repeat.cache_key());
    }

    #[test]
    fn resolve_strips_leading_slash() {
        let bank = TextureBank::new("assets");
        assert_eq!(bank.resolve("/matcap.png"), PathBuf::from("assets/matcap.png"));
    }
}
