//! The winit host: opens the window, wires its events to an [`Application`]
//! and drives one tick per redraw.

use std::path::PathBuf;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::application::{AppOptions, Application};
use crate::error::AppError;
use crate::render::WgpuRenderer;
use crate::texture::TextureBank;

/// Window and asset configuration for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub assets: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: String::from("glowsphere"),
            width: 1280,
            height: 720,
            assets: PathBuf::from("assets"),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial inner size in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Directory that root-relative texture paths resolve against.
    pub fn assets(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets = root.into();
        self
    }
}

/// Open a window and run the demo until it is closed.
///
/// Startup failures (no GPU, missing textures) end the event loop and are
/// returned here.
pub fn run(config: AppConfig, options: AppOptions) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut host = Host {
        state: HostState::Pending { config, options },
        error: None,
    };
    event_loop.run_app(&mut host)?;

    match host.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct Host {
    state: HostState,
    error: Option<AppError>,
}

enum HostState {
    Pending {
        config: AppConfig,
        options: AppOptions,
    },
    Running {
        window: Arc<Window>,
        app: Application<WgpuRenderer>,
    },
    Closed,
}

impl Host {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        options: AppOptions,
    ) -> Result<(Arc<Window>, Application<WgpuRenderer>), AppError> {
        let attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let renderer = WgpuRenderer::new(Arc::clone(&window))?;
        let bank = TextureBank::new(&config.assets);
        let mut app = Application::new(&window, options)?.with_title(config.title.clone());
        pollster::block_on(app.init(renderer, &bank))?;

        window.request_redraw();
        Ok((window, app))
    }
}

impl ApplicationHandler for Host {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let HostState::Pending { config, options } = &self.state else {
            return;
        };

        match Self::start(event_loop, config, *options) {
            Ok((window, app)) => self.state = HostState::Running { window, app },
            Err(e) => {
                tracing::error!(error = %e, "startup failed");
                self.error = Some(e);
                self.state = HostState::Closed;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let HostState::Running { window, app } = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                app.destroy();
                self.state = HostState::Closed;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.on_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                app.on_refresh();
                if let Some(title) = app.take_title() {
                    window.set_title(&title);
                }
                if app.is_running() {
                    window.request_redraw();
                }
            }
            other => app.handle_input(&other),
        }
    }
}
