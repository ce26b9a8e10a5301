//! # Glowsphere
//!
//! An interactive wgpu scene: a matcap-shaded sphere dissolving around an
//! animated effect origin, orbit and gizmo controls, an unreal-style bloom
//! pass, and an optional box-stacking physics simulation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use glowsphere::{AppConfig, AppOptions, run};
//!
//! fn main() -> Result<(), glowsphere::AppError> {
//!     run(
//!         AppConfig::new().title("glowsphere").assets("assets"),
//!         AppOptions::from_fragment("#physics"),
//!     )
//! }
//! ```
//!
//! The orchestration lives in [`Application`], which is generic over a
//! [`Renderer`] so its lifecycle can be driven without a GPU.

mod app;
mod application;
mod camera;
mod clock;
pub mod controls;
mod debug;
mod error;
mod frame_loop;
mod gpu;
mod input;
mod material;
mod mesh;
pub mod physics;
mod picking;
mod postprocess;
pub mod render;
mod scene;
mod texture;
mod viewport;

pub use app::{AppConfig, run};
pub use application::{AppOptions, Application, MATCAP_PATH, NOISE_PATH};
pub use camera::PerspectiveCamera;
pub use clock::{Clock, MonotonicClock};
pub use controls::{Controls, GizmoMode, OrbitControls, TransformControls};
pub use debug::{DebugOverlay, FrameStats, StatsSnapshot};
pub use error::{AppError, AssetError, GpuError, MaterialError};
pub use frame_loop::{FrameLoop, LoopState};
pub use gpu::GpuContext;
pub use input::Input;
pub use material::{
    Material, SharedMaterial, SphereUniforms, T_MATCAP, T_NOISE, U_EFFECT_ORIGIN, U_TIME,
    UniformValue,
};
pub use mesh::{Geometry, MeshData, Transform, Vertex3d};
pub use physics::Simulation;
pub use picking::Ray;
pub use postprocess::{BloomSettings, PassKind, Postprocess};
pub use render::{FrameView, Renderer, WgpuRenderer};
pub use scene::{ObjectId, Scene, SceneObject};
pub use texture::{DecodedImage, TextureBank, TextureHandle, WrapMode};
pub use viewport::{Container, Viewport};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
