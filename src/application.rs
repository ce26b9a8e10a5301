//! The top-level orchestrator: builds the scene, runs the frame loop, and
//! reacts to resize and input notifications.
//!
//! Lifecycle: [`Application::new`] → [`Application::init`] (async, loads
//! textures) → [`Application::on_refresh`] once per display refresh →
//! [`Application::destroy`].

use std::fmt;

use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

use crate::camera::PerspectiveCamera;
use crate::clock::{Clock, MonotonicClock};
use crate::controls::{Controls, OrbitControls, TransformControls};
use crate::debug::DebugOverlay;
use crate::error::AppError;
use crate::frame_loop::{FrameLoop, LoopState};
use crate::input::Input;
use crate::material::{T_MATCAP, T_NOISE, UniformValue};
use crate::physics::{BodyView, Simulation};
use crate::postprocess::{BloomSettings, Postprocess};
use crate::render::{FrameView, GizmoView, Renderer};
use crate::scene::{ObjectId, Scene, SceneObject};
use crate::texture::{TextureBank, TextureHandle, WrapMode};
use crate::viewport::{Container, Viewport};

/// Root-relative path of the noise texture.
pub const NOISE_PATH: &str = "/noise.png";
/// Root-relative path of the matcap texture.
pub const MATCAP_PATH: &str = "/matcap.png";

/// Optional subsystems, resolved once at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppOptions {
    pub physics: bool,
    pub debug: bool,
}

impl AppOptions {
    /// Parse a location-style fragment such as `#physics,debug`.
    ///
    /// Flags are matched as substrings; anything else is ignored.
    pub fn from_fragment(fragment: &str) -> Self {
        Self {
            physics: fragment.contains("physics"),
            debug: fragment.contains("debug"),
        }
    }

    /// Combine with another set of options; a flag set in either wins.
    pub fn merge(self, other: AppOptions) -> Self {
        Self {
            physics: self.physics || other.physics,
            debug: self.debug || other.debug,
        }
    }
}

/// The loaded textures, kept alongside the material that samples them.
#[derive(Clone, Debug)]
struct Textures {
    noise: TextureHandle,
    matcap: TextureHandle,
}

/// Everything built by `init`.
struct Runtime<R> {
    scene: Scene,
    camera: PerspectiveCamera,
    renderer: R,
    textures: Textures,
    simulation: Option<Simulation>,
    bodies: Vec<BodyView>,
    clock: Box<dyn Clock>,
    effect_origin: ObjectId,
    sphere: ObjectId,
    controls: Controls,
    postprocess: Postprocess,
    debug: Option<DebugOverlay>,
}

enum AppState<R> {
    Pending,
    Ready(Box<Runtime<R>>),
}

/// The demo application.
///
/// Generic over the [`Renderer`] so it can run headless under test.
pub struct Application<R: Renderer> {
    options: AppOptions,
    title: String,
    viewport: Viewport,
    state: AppState<R>,
    clock: Option<Box<dyn Clock>>,
    frame_loop: FrameLoop,
    resize_attached: bool,
    destroyed: bool,
    input: Input,
}

impl<R: Renderer> Application<R> {
    /// Capture the container's current size.
    ///
    /// Fails with [`AppError::ContainerNotFound`] if the container reports no
    /// drawable area.
    pub fn new(container: &impl Container, options: AppOptions) -> Result<Self, AppError> {
        let (width, height) = container.pixel_size();
        let viewport = Viewport::new(width, height).ok_or(AppError::ContainerNotFound)?;
        tracing::debug!(width, height, ?options, "application constructed");

        Ok(Self {
            options,
            title: String::from("glowsphere"),
            viewport,
            state: AppState::Pending,
            clock: None,
            frame_loop: FrameLoop::new(),
            resize_attached: false,
            destroyed: false,
            input: Input::new(),
        })
    }

    /// Use `clock` instead of a wall clock started during `init`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Base window title that debug stats are appended to.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Build the scene and start the frame loop.
    ///
    /// Textures are the only asynchronous step. If they fail to load the
    /// error is returned and nothing is started.
    pub async fn init(&mut self, mut renderer: R, bank: &TextureBank) -> Result<(), AppError> {
        if self.destroyed {
            return Err(AppError::Destroyed);
        }
        if matches!(self.state, AppState::Ready(_)) {
            return Err(AppError::AlreadyInitialized);
        }

        let mut scene = Scene::new();
        let camera = PerspectiveCamera::for_viewport(self.viewport);
        renderer.set_size(self.viewport);

        let textures = load_textures(bank).await?;

        let simulation = self.options.physics.then(|| {
            tracing::info!("physics enabled");
            Simulation::with_demo_bodies()
        });

        let clock = self
            .clock
            .take()
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));

        let effect_origin = scene.add(SceneObject::effect_origin());

        let sphere_object = SceneObject::sphere();
        {
            let mut sphere_material = sphere_object.material.borrow_mut();
            let noise = UniformValue::Texture(Some(textures.noise.clone()));
            let matcap = UniformValue::Texture(Some(textures.matcap.clone()));
            sphere_material.set_uniform(T_NOISE, noise)?;
            sphere_material.set_uniform(T_MATCAP, matcap)?;
        }
        let sphere = scene.add(sphere_object);

        self.resize_attached = true;

        let orbit = OrbitControls::new(&camera);
        let mut gizmo = TransformControls::new();
        gizmo.attach(sphere);
        let controls = Controls::new(orbit).with_transform(gizmo);

        let postprocess = Postprocess::new(self.viewport, BloomSettings::default());

        let debug = self.options.debug.then(|| {
            tracing::info!("debug overlay enabled");
            DebugOverlay::new()
        });

        let bodies = simulation.as_ref().map(Simulation::bodies).unwrap_or_default();
        self.state = AppState::Ready(Box::new(Runtime {
            scene,
            camera,
            renderer,
            textures,
            simulation,
            bodies,
            clock,
            effect_origin,
            sphere,
            controls,
            postprocess,
            debug,
        }));

        if self.frame_loop.start() {
            tracing::debug!("frame loop started");
        }
        tracing::info!("application initialized");
        tracing::debug!(app = ?self, "application state");
        Ok(())
    }

    /// Display-refresh callback. Runs one tick if the loop is running.
    pub fn on_refresh(&mut self) -> bool {
        let AppState::Ready(runtime) = &self.state else {
            return false;
        };
        if !self.frame_loop.is_running() {
            return false;
        }
        let elapsed = runtime.clock.elapsed();
        self.tick_at(elapsed)
    }

    /// Run the tick algorithm with an explicit elapsed time.
    ///
    /// Does nothing unless the loop is running.
    pub fn tick_at(&mut self, elapsed: f32) -> bool {
        let AppState::Ready(runtime) = &mut self.state else {
            return false;
        };
        if !self.frame_loop.advance() {
            return false;
        }
        runtime.tick(elapsed, &self.title);
        true
    }

    /// Resize listener.
    ///
    /// Ignored while detached (before `init`, after `destroy`) and for
    /// zero-sized areas such as a minimised window.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if !self.resize_attached {
            return;
        }
        let AppState::Ready(runtime) = &mut self.state else {
            return;
        };
        let Some(viewport) = Viewport::new(width, height) else {
            tracing::debug!(width, height, "ignoring zero-sized resize");
            return;
        };

        self.viewport = viewport;
        runtime.camera.aspect = viewport.aspect();
        runtime.camera.update_projection();
        runtime.renderer.set_size(viewport);
        runtime.postprocess.set_resolution(viewport);
        tracing::debug!(width, height, "resized");
    }

    /// Feed a window event to the controls.
    pub fn handle_input(&mut self, event: &WindowEvent) {
        if !self.frame_loop.is_running() {
            return;
        }
        let mut input = std::mem::take(&mut self.input);
        input.handle_event(event);
        self.apply_input(&input);
        input.end_update();
        self.input = input;
    }

    /// Apply one update's worth of input state to the controls, the
    /// physics spawner and the bloom tuning keys.
    ///
    /// Ignored unless the loop is running.
    pub fn apply_input(&mut self, input: &Input) {
        if !self.frame_loop.is_running() {
            return;
        }
        if let AppState::Ready(runtime) = &mut self.state {
            runtime.apply_input(input, self.viewport);
        }
    }

    /// Release GPU resources, detach the resize listener and stop the loop.
    ///
    /// Synchronous: no tick runs after this returns.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let AppState::Ready(runtime) = &mut self.state {
            runtime.renderer.dispose();
        }
        self.resize_attached = false;
        self.frame_loop.stop();
        self.destroyed = true;
        tracing::info!("application destroyed");
    }

    pub fn options(&self) -> AppOptions {
        self.options
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn loop_state(&self) -> LoopState {
        self.frame_loop.state()
    }

    /// Ticks run since the loop started.
    pub fn frames(&self) -> u64 {
        self.frame_loop.frames()
    }

    pub fn is_resize_attached(&self) -> bool {
        self.resize_attached
    }

    fn runtime(&self) -> Option<&Runtime<R>> {
        match &self.state {
            AppState::Ready(runtime) => Some(runtime),
            AppState::Pending => None,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.runtime().map(|r| &r.scene)
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.runtime().map(|r| &r.camera)
    }

    pub fn renderer(&self) -> Option<&R> {
        self.runtime().map(|r| &r.renderer)
    }

    pub fn effect_origin(&self) -> Option<&SceneObject> {
        self.runtime().map(|r| r.scene.get(r.effect_origin))
    }

    pub fn sphere(&self) -> Option<&SceneObject> {
        self.runtime().map(|r| r.scene.get(r.sphere))
    }

    pub fn controls(&self) -> Option<&Controls> {
        self.runtime().map(|r| &r.controls)
    }

    pub fn postprocess(&self) -> Option<&Postprocess> {
        self.runtime().map(|r| &r.postprocess)
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.runtime().and_then(|r| r.simulation.as_ref())
    }

    pub fn debug(&self) -> Option<&DebugOverlay> {
        self.runtime().and_then(|r| r.debug.as_ref())
    }

    /// A new window title from the debug overlay, if one is pending.
    pub fn take_title(&mut self) -> Option<String> {
        match &mut self.state {
            AppState::Ready(runtime) => runtime.debug.as_mut()?.take_title(),
            AppState::Pending => None,
        }
    }
}

impl<R: Renderer> Runtime<R> {
    fn tick(&mut self, elapsed: f32, title: &str) {
        if let Some(debug) = &mut self.debug {
            debug.begin(self.clock.elapsed());
        }

        let origin = {
            let object = self.scene.get_mut(self.effect_origin);
            object.transform.position.y = elapsed.sin();
            object.transform.position
        };

        if let Some(uniforms) = self
            .scene
            .get(self.sphere)
            .material
            .borrow_mut()
            .as_sphere_mut()
        {
            uniforms.effect_origin = origin;
            uniforms.time = elapsed;
        }

        if let Some(simulation) = &mut self.simulation {
            simulation.step();
            self.bodies = simulation.bodies();
        }

        let gizmo = self.controls.transform.as_ref().and_then(|gizmo| {
            gizmo.attached().map(|id| GizmoView {
                origin: self.scene.get(id).transform.position,
                mode: gizmo.mode,
                dragging: gizmo.is_dragging(),
            })
        });
        let frame = FrameView {
            scene: &self.scene,
            camera: &self.camera,
            postprocess: &self.postprocess,
            bodies: &self.bodies,
            gizmo,
            time: elapsed,
        };
        self.renderer.render(&frame);

        if let Some(debug) = &mut self.debug {
            debug.end(self.clock.elapsed(), title);
        }
    }

    fn apply_input(&mut self, input: &Input, viewport: Viewport) {
        self.controls
            .update(input, &mut self.camera, viewport, &mut self.scene);

        if let Some(simulation) = &mut self.simulation {
            if input.key_pressed(KeyCode::Space) {
                let above = self.scene.get(self.sphere).transform.position;
                simulation.spawn_above(above);
            }
        }

        if let Some(debug) = &self.debug {
            debug.tune_bloom(input, &mut self.postprocess.bloom);
        }
    }
}

async fn load_textures(bank: &TextureBank) -> Result<Textures, AppError> {
    let handles = bank.load(&[NOISE_PATH, MATCAP_PATH]).await?;
    let [noise, matcap]: [TextureHandle; 2] = handles.try_into().map_err(|handles: Vec<_>| {
        AppError::TextureCount {
            expected: 2,
            found: handles.len(),
        }
    })?;
    Ok(Textures {
        noise: noise.with_wrap(WrapMode::Repeat),
        matcap,
    })
}

impl<R: Renderer> fmt::Debug for Application<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Application");
        s.field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("loop", &self.frame_loop.state())
            .field("resize_attached", &self.resize_attached);
        if let Some(runtime) = self.runtime() {
            let names: Vec<_> = runtime.scene.objects().iter().map(|o| o.name).collect();
            s.field("objects", &names)
                .field("camera", &runtime.camera.position)
                .field("bloom", &runtime.postprocess.bloom)
                .field("noise", &runtime.textures.noise.cache_key())
                .field("matcap", &runtime.textures.matcap.cache_key())
                .field("simulation", &runtime.simulation)
                .field("debug", &runtime.debug.is_some());
        }
        s.finish()
    }
}
