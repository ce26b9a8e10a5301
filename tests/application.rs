use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use glowsphere::{
    AppError, AppOptions, Application, AssetError, Container, FrameView, Input, KeyCode,
    LoopState, Renderer, T_MATCAP, T_NOISE, TextureBank, UniformValue, Vec2, Vec3, Viewport,
};

/// What the renderer saw, shared with the test after the renderer moves
/// into the application.
#[derive(Default)]
struct Log {
    set_size: Vec<Viewport>,
    renders: usize,
    disposed: usize,
    last_time: Option<f32>,
    last_origin_uniform: Option<Vec3>,
    last_origin_position: Option<Vec3>,
    last_bodies: usize,
}

struct RecordingRenderer(Rc<RefCell<Log>>);

impl Renderer for RecordingRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        self.0.borrow_mut().set_size.push(viewport);
    }

    fn render(&mut self, frame: &FrameView<'_>) {
        let mut log = self.0.borrow_mut();
        log.renders += 1;
        log.last_time = Some(frame.time);
        log.last_bodies = frame.bodies.len();

        let origin = frame
            .scene
            .objects()
            .iter()
            .find(|o| o.name == "effect_origin")
            .map(|o| o.transform.position);
        log.last_origin_position = origin;

        let sphere = frame
            .scene
            .objects()
            .iter()
            .find(|o| o.name == "sphere")
            .expect("sphere in scene");
        log.last_origin_uniform = sphere
            .material
            .borrow()
            .as_sphere()
            .map(|u| u.effect_origin);
    }

    fn dispose(&mut self) {
        self.0.borrow_mut().disposed += 1;
    }
}

struct FixedContainer(u32, u32);

impl Container for FixedContainer {
    fn pixel_size(&self) -> (u32, u32) {
        (self.0, self.1)
    }
}

fn write_png(dir: &Path, name: &str) {
    let img = image::RgbaImage::from_fn(4, 4, |x, y| {
        image::Rgba([(x * 60) as u8, (y * 60) as u8, 128, 255])
    });
    img.save(dir.join(name)).expect("write fixture png");
}

fn asset_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_png(dir.path(), "noise.png");
    write_png(dir.path(), "matcap.png");
    dir
}

fn manual_clock() -> (Rc<Cell<f32>>, impl Fn() -> f32) {
    let now = Rc::new(Cell::new(0.0));
    let reader = Rc::clone(&now);
    (now, move || reader.get())
}

fn started(
    size: (u32, u32),
    options: AppOptions,
) -> (Application<RecordingRenderer>, Rc<RefCell<Log>>, Rc<Cell<f32>>, tempfile::TempDir) {
    let assets = asset_dir();
    let (now, clock) = manual_clock();
    let log = Rc::new(RefCell::new(Log::default()));
    let mut app = Application::new(&FixedContainer(size.0, size.1), options)
        .expect("container has area")
        .with_clock(clock);
    let bank = TextureBank::new(assets.path());
    pollster::block_on(app.init(RecordingRenderer(Rc::clone(&log)), &bank)).expect("init succeeds");
    (app, log, now, assets)
}

#[test]
fn viewport_matches_container_after_construction() {
    for (w, h) in [(1, 1), (800, 600), (1920, 1080), (333, 7)] {
        let app: Application<RecordingRenderer> =
            Application::new(&FixedContainer(w, h), AppOptions::default()).unwrap();
        assert_eq!((app.viewport().width(), app.viewport().height()), (w, h));
    }
}

#[test]
fn zero_sized_container_is_not_found() {
    let result: Result<Application<RecordingRenderer>, _> =
        Application::new(&FixedContainer(0, 480), AppOptions::default());
    assert!(matches!(result, Err(AppError::ContainerNotFound)));
}

#[test]
fn init_sizes_renderer_and_starts_loop() {
    let (app, log, _, _assets) = started((800, 600), AppOptions::default());

    assert_eq!(app.loop_state(), LoopState::Running);
    assert!(app.is_resize_attached());
    assert_eq!(log.borrow().set_size, vec![Viewport::new(800, 600).unwrap()]);

    let scene = app.scene().unwrap();
    assert_eq!(scene.len(), 2);
    let sphere = app.sphere().unwrap().material.borrow().as_sphere().cloned().unwrap();
    assert!(sphere.noise.is_some());
    assert!(sphere.matcap.is_some());
}

#[test]
fn resize_updates_viewport_and_aspect() {
    let (mut app, log, _, _assets) = started((800, 600), AppOptions::default());

    app.on_resize(1024, 512);
    assert_eq!(app.viewport(), Viewport::new(1024, 512).unwrap());
    assert_eq!(app.camera().unwrap().aspect, 1024.0 / 512.0);

    let projection = app.camera().unwrap().projection_matrix();
    let resolution = app.postprocess().unwrap().resolution();
    app.on_resize(1024, 512);
    assert_eq!(app.viewport(), Viewport::new(1024, 512).unwrap());
    assert_eq!(app.camera().unwrap().projection_matrix(), projection);
    assert_eq!(app.postprocess().unwrap().resolution(), resolution);
    assert_eq!(log.borrow().set_size.last(), Some(&Viewport::new(1024, 512).unwrap()));
}

#[test]
fn zero_sized_resize_is_ignored() {
    let (mut app, _log, _, _assets) = started((800, 600), AppOptions::default());
    app.on_resize(0, 0);
    assert_eq!(app.viewport(), Viewport::new(800, 600).unwrap());
}

#[test]
fn tick_moves_origin_before_writing_uniforms() {
    let (mut app, log, _, _assets) = started((640, 480), AppOptions::default());

    for t in [0.0_f32, 0.5, 1.0, 2.25, 10.0] {
        assert!(app.tick_at(t));

        let origin = app.effect_origin().unwrap().transform.position;
        assert_eq!(origin.y, t.sin());

        let uniforms = app.sphere().unwrap().material.borrow().as_sphere().cloned().unwrap();
        assert_eq!(uniforms.time, t);
        assert_eq!(uniforms.effect_origin, origin);

        let log = log.borrow();
        assert_eq!(log.last_time, Some(t));
        assert_eq!(log.last_origin_uniform, log.last_origin_position);
    }
}

#[test]
fn refresh_reads_the_clock() {
    let (mut app, log, now, _assets) = started((640, 480), AppOptions::default());

    now.set(1.25);
    assert!(app.on_refresh());
    assert_eq!(log.borrow().last_time, Some(1.25));
    assert_eq!(app.effect_origin().unwrap().transform.position.y, 1.25_f32.sin());
}

#[test]
fn destroy_stops_all_future_ticks() {
    let (mut app, log, now, _assets) = started((640, 480), AppOptions::default());
    app.tick_at(0.5);
    let renders = log.borrow().renders;

    app.destroy();
    assert_eq!(log.borrow().disposed, 1);
    assert_eq!(app.loop_state(), LoopState::Stopped);
    assert!(!app.is_resize_attached());

    let origin = app.effect_origin().unwrap().transform.position;
    now.set(3.0);
    assert!(!app.on_refresh());
    assert!(!app.tick_at(3.0));
    assert_eq!(log.borrow().renders, renders);
    assert_eq!(app.effect_origin().unwrap().transform.position, origin);

    app.destroy();
    assert_eq!(log.borrow().disposed, 1);
}

#[test]
fn resize_after_destroy_is_ignored() {
    let (mut app, log, _, _assets) = started((640, 480), AppOptions::default());
    let sized = log.borrow().set_size.len();

    app.destroy();
    app.on_resize(100, 100);
    assert_eq!(app.viewport(), Viewport::new(640, 480).unwrap());
    assert_eq!(log.borrow().set_size.len(), sized);
}

#[test]
fn init_after_destroy_is_rejected() {
    let assets = asset_dir();
    let mut app = Application::new(&FixedContainer(64, 64), AppOptions::default()).unwrap();
    app.destroy();

    let log = Rc::new(RefCell::new(Log::default()));
    let bank = TextureBank::new(assets.path());
    let result = pollster::block_on(app.init(RecordingRenderer(log), &bank));
    assert!(matches!(result, Err(AppError::Destroyed)));
    assert_eq!(app.loop_state(), LoopState::Stopped);
}

#[test]
fn second_init_is_rejected() {
    let (mut app, _log, _, assets) = started((64, 64), AppOptions::default());
    let other = Rc::new(RefCell::new(Log::default()));
    let bank = TextureBank::new(assets.path());
    let result = pollster::block_on(app.init(RecordingRenderer(other), &bank));
    assert!(matches!(result, Err(AppError::AlreadyInitialized)));
    assert!(app.is_running());
}

#[test]
fn without_physics_no_simulation_and_tick_still_renders() {
    let (mut app, log, _, _assets) = started((640, 480), AppOptions::default());

    assert!(app.simulation().is_none());
    assert!(app.debug().is_none());
    assert!(app.tick_at(0.1));
    assert_eq!(log.borrow().renders, 1);
    assert_eq!(log.borrow().last_bodies, 0);
}

#[test]
fn physics_steps_once_per_tick() {
    let options = AppOptions {
        physics: true,
        debug: false,
    };
    let (mut app, log, _, _assets) = started((640, 480), options);

    let simulation = app.simulation().expect("physics enabled");
    assert_eq!(simulation.steps(), 0);
    let bodies = simulation.body_count();

    app.tick_at(0.0);
    app.tick_at(0.016);
    assert_eq!(app.simulation().unwrap().steps(), 2);
    assert_eq!(log.borrow().last_bodies, bodies + 1);
}

#[test]
fn debug_overlay_reports_title_after_a_second() {
    let options = AppOptions {
        physics: false,
        debug: true,
    };
    let (mut app, _log, now, _assets) = started((640, 480), options);
    assert!(app.debug().is_some());

    for i in 0..=70 {
        now.set(i as f32 / 60.0);
        app.on_refresh();
    }
    let title = app.take_title().expect("stats window elapsed");
    assert!(title.starts_with("glowsphere | "), "{title}");
    assert!(title.contains("fps"));
}

#[test]
fn empty_texture_slots_still_render() {
    let (mut app, log, _, _assets) = started((640, 480), AppOptions::default());
    {
        let mut material = app.sphere().unwrap().material.borrow_mut();
        material.set_uniform(T_NOISE, UniformValue::Texture(None)).unwrap();
        material.set_uniform(T_MATCAP, UniformValue::Texture(None)).unwrap();
    }

    assert!(app.tick_at(0.5));
    assert_eq!(log.borrow().renders, 1);
    let uniforms = app.sphere().unwrap().material.borrow().as_sphere().cloned().unwrap();
    assert!(uniforms.noise.is_none());
    assert!(uniforms.matcap.is_none());
    assert_eq!(uniforms.time, 0.5);
}

#[test]
fn frames_count_ticks_until_destroy() {
    let (mut app, _log, _, _assets) = started((640, 480), AppOptions::default());
    assert_eq!(app.frames(), 0);

    for t in [0.0, 0.1, 0.2] {
        app.tick_at(t);
    }
    assert_eq!(app.frames(), 3);

    app.destroy();
    assert!(!app.tick_at(0.3));
    assert_eq!(app.frames(), 3);
}

#[test]
fn space_spawns_a_box_in_physics_mode() {
    let options = AppOptions {
        physics: true,
        debug: false,
    };
    let (mut app, _log, _, _assets) = started((640, 480), options);
    let before = app.simulation().unwrap().body_count();

    let mut input = Input::new();
    input.press_key(KeyCode::Space);
    app.apply_input(&input);
    assert_eq!(app.simulation().unwrap().body_count(), before + 1);

    input.end_update();
    app.apply_input(&input);
    assert_eq!(app.simulation().unwrap().body_count(), before + 1);
}

#[test]
fn space_without_physics_changes_nothing() {
    let (mut app, _log, _, _assets) = started((640, 480), AppOptions::default());

    let mut input = Input::new();
    input.press_key(KeyCode::Space);
    app.apply_input(&input);
    assert!(app.simulation().is_none());
    assert_eq!(app.scene().unwrap().len(), 2);
}

#[test]
fn input_after_destroy_is_ignored() {
    let options = AppOptions {
        physics: true,
        debug: false,
    };
    let (mut app, _log, _, _assets) = started((640, 480), options);
    let before = app.simulation().unwrap().body_count();
    app.destroy();

    let mut input = Input::new();
    input.press_key(KeyCode::Space);
    app.apply_input(&input);
    assert_eq!(app.simulation().unwrap().body_count(), before);
}

#[test]
fn debug_keys_tune_bloom() {
    let options = AppOptions {
        physics: false,
        debug: true,
    };
    let (mut app, _log, _, _assets) = started((640, 480), options);
    let strength = app.postprocess().unwrap().bloom.strength;

    let mut input = Input::new();
    input.press_key(KeyCode::Digit2);
    app.apply_input(&input);
    assert!(app.postprocess().unwrap().bloom.strength > strength);
}

#[test]
fn scrolling_moves_the_camera() {
    let (mut app, _log, _, _assets) = started((640, 480), AppOptions::default());
    let orbit_distance = |app: &Application<RecordingRenderer>| {
        let camera = app.camera().unwrap();
        (camera.position - camera.target).length()
    };
    let before = orbit_distance(&app);

    let mut input = Input::new();
    input.scroll(Vec2::new(0.0, 1.0));
    app.apply_input(&input);
    assert!(orbit_distance(&app) < before);
}

#[test]
fn failed_texture_leaves_app_unstarted() {
    let assets = tempfile::tempdir().unwrap();
    write_png(assets.path(), "noise.png");
    std::fs::write(assets.path().join("matcap.png"), b"not a png").unwrap();

    let log = Rc::new(RefCell::new(Log::default()));
    let mut app = Application::new(&FixedContainer(320, 240), AppOptions::default()).unwrap();
    let bank = TextureBank::new(assets.path());
    let result = pollster::block_on(app.init(RecordingRenderer(Rc::clone(&log)), &bank));

    assert!(matches!(
        result,
        Err(AppError::AssetLoad(AssetError::Decode { .. }))
    ));
    assert_eq!(app.loop_state(), LoopState::Stopped);
    assert!(app.scene().is_none());
    assert!(!app.is_resize_attached());
    assert!(!app.tick_at(1.0));
    assert_eq!(log.borrow().renders, 0);
}

#[test]
fn batch_load_is_ordered_and_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let a = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
    let b = image::RgbaImage::from_pixel(1, 3, image::Rgba([0, 255, 0, 255]));
    a.save(dir.path().join("a.png")).unwrap();
    b.save(dir.path().join("b.png")).unwrap();
    std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();

    let bank = TextureBank::new(dir.path());
    let handles = pollster::block_on(bank.load(&["/a.png", "/b.png"])).unwrap();
    assert_eq!(handles.len(), 2);
    assert_eq!((handles[0].image().width, handles[0].image().height), (2, 1));
    assert_eq!((handles[1].image().width, handles[1].image().height), (1, 3));

    let failed = pollster::block_on(bank.load(&["/a.png", "/broken.png"]));
    assert!(matches!(failed, Err(AssetError::Decode { .. })));

    let missing = pollster::block_on(bank.load(&["/a.png", "/nope.png"]));
    assert!(matches!(missing, Err(AssetError::Io { .. })));
}
