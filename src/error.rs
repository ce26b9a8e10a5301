//! Error types for startup, asset loading, GPU setup and material access.

use std::path::PathBuf;

/// Failures that abort [`Application`](crate::Application) startup.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The host container could not be resolved into a drawable area.
    #[error("container not found: no drawable area to mount into")]
    ContainerNotFound,
    #[error("asset load failed: {0}")]
    AssetLoad(#[from] AssetError),
    #[error("GPU setup failed: {0}")]
    Gpu(#[from] GpuError),
    #[error("application already initialized")]
    AlreadyInitialized,
    #[error("application has been destroyed")]
    Destroyed,
    #[error("material setup failed: {0}")]
    Material(#[from] MaterialError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// The texture bank returned a different number of handles than paths.
    #[error("expected {expected} textures, loaded {found}")]
    TextureCount { expected: usize, found: usize },
}

/// Errors from loading texture assets.
///
/// A batch load fails as a whole: the first failing path is reported and no
/// handles from the batch are returned.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors from creating the wgpu device and surface.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Errors from writing a named uniform slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error("material {material:?} has no uniform named {slot:?}")]
    UnknownSlot {
        material: &'static str,
        slot: String,
    },
    #[error("uniform {slot:?} expects a {expected} value")]
    TypeMismatch {
        slot: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converts_into_app_error<E: Into<AppError>>() {}

    #[test]
    fn host_errors_convert_into_app_error() {
        converts_into_app_error::<winit::error::OsError>();
        converts_into_app_error::<winit::error::EventLoopError>();
        converts_into_app_error::<AssetError>();
        converts_into_app_error::<GpuError>();
    }

    #[test]
    fn texture_count_reports_both_sides() {
        let err = AppError::TextureCount {
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "expected 2 textures, loaded 1");
    }
}
