//! Application event loop.
//!
//! This module drives the viewer on top of winit. Everything that touches the
//! scene, the camera or the navigation state runs here on the event-loop thread;
//! extension loads and asset imports run as futures (tokio on native,
//! `spawn_local` on the web) and report back as [`ViewerEvent`]s through the
//! event loop proxy.
//!
//! # Bootstrap
//!
//! 1. `resumed` creates the window and the GPU [`Context`]
//! 2. the [`DependencyResolver`] makes sure the importer extensions are active
//! 3. its continuation ([`ViewerEvent::DependenciesResolved`]) builds the scene:
//!    the fallback cube, the navigation controller and one import per asset
//! 4. [`ImportPipeline::import_all`] runs on a spawned task; every finished
//!    import ([`ViewerEvent::Imported`]) is placed right away, and
//!    [`ViewerEvent::ImportsSettled`] closes the run with the skipped assets
//!
//! # Frame
//!
//! Each `RedrawRequested` spins the fallback cube, steps the navigation
//! controller, uploads the camera and draws the scene.

use std::{fmt::Debug, sync::Arc};

use cgmath::{InnerSpace, Rad, Rotation3, Vector3};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::{
        instance::Instance,
        model::ModelData,
        scene_graph::{NodeId, NodeRole, Scene},
    },
    error::ViewerError,
    import::{AssetDescriptor, CompletedImport, ImportPipeline, Manifest, Placement},
    navigation::NavigationController,
    platform,
    render::Renderer,
    resolver::{DependencyResolver, ResolveResult},
    resources::ImporterRegistry,
    tools::{Gizmo, TransformTool},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Results that futures hand back to the event loop.
pub enum ViewerEvent {
    /// The GPU context finished initialising (web only, native blocks on it).
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<Context>),
    DependenciesResolved(ResolveResult),
    Imported(CompletedImport),
    /// Every import has been handed over; carries the assets that were never started.
    ImportsSettled(Vec<(AssetDescriptor, ViewerError)>),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::DependenciesResolved(result) => {
                f.debug_tuple("DependenciesResolved").field(result).finish()
            }
            Self::Imported(completed) => f
                .debug_tuple("Imported")
                .field(&completed.context.descriptor.url)
                .finish(),
            Self::ImportsSettled(skipped) => f
                .debug_tuple("ImportsSettled")
                .field(&skipped.len())
                .finish(),
        }
    }
}

/// Scene-side state; the navigation controller only exists once the scene is built.
struct Viewer {
    ctx: Context,
    renderer: Renderer,
    scene: Scene,
    placement: Placement,
    gizmo: Gizmo,
    navigation: Option<NavigationController>,
    fallback: Option<NodeId>,
    has_focus: bool,
    is_surface_configured: bool,
}

impl Viewer {
    fn new(ctx: Context, config: &ViewerConfig) -> Self {
        let renderer = Renderer::new(&ctx);
        let has_focus = ctx.window().has_focus();
        Self {
            ctx,
            renderer,
            scene: Scene::new(),
            placement: Placement::new(config.placement, &config.navigation),
            gizmo: Gizmo::default(),
            navigation: None,
            fallback: None,
            has_focus,
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn engage(&mut self) {
        let Some(navigation) = self.navigation.as_mut() else {
            log::debug!("Ignoring capture request, the scene is not built yet");
            return;
        };
        if let Err(e) = navigation.request_capture(self.has_focus) {
            log::warn!("{e}");
            return;
        }
        let window = self.ctx.window();
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => window.set_cursor_visible(false),
            Err(e) => {
                log::warn!("Cursor grab failed: {e}");
                navigation.capture_released();
            }
        }
    }

    fn release(&mut self) {
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.capture_released();
            navigation.set_dragging(false);
        }
        self.gizmo.end_drag();
        let window = self.ctx.window();
        if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            log::debug!("Cursor release failed: {e}");
        }
        window.set_cursor_visible(true);
    }

    fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        let engaged = self
            .navigation
            .as_ref()
            .is_some_and(NavigationController::is_engaged);
        match (state, engaged) {
            (ElementState::Pressed, false) => self.engage(),
            (ElementState::Pressed, true) => {
                let dragging = self.gizmo.begin_drag();
                if let Some(navigation) = self.navigation.as_mut() {
                    navigation.set_dragging(dragging);
                }
            }
            (ElementState::Released, _) => {
                self.gizmo.end_drag();
                if let Some(navigation) = self.navigation.as_mut() {
                    navigation.set_dragging(false);
                }
            }
        }
    }

    fn on_key(&mut self, code: KeyCode, state: ElementState) {
        if code == KeyCode::Escape && state == ElementState::Pressed {
            self.release();
            return;
        }
        let Some(navigation) = self.navigation.as_mut() else {
            return;
        };
        match state {
            ElementState::Pressed => navigation.key_down(code),
            ElementState::Released => navigation.key_up(code),
        };
    }

    fn on_pointer_motion(&mut self, dx: f64, dy: f64) {
        let Some(navigation) = self.navigation.as_ref() else {
            return;
        };
        if !navigation.is_engaged() {
            return;
        }
        if self.gizmo.is_dragging() {
            self.gizmo
                .drag(&mut self.scene, &self.ctx.camera.camera, dx, dy);
        } else {
            navigation.look(&mut self.ctx.camera.camera, dx, dy);
        }
    }

    fn on_imported(&mut self, completed: CompletedImport) {
        // failures are logged by the placement
        let _ = self.placement.apply(
            completed,
            &mut self.scene,
            &mut self.ctx.camera.camera,
            &mut self.gizmo,
        );
    }

    fn on_imports_settled(&mut self, skipped: Vec<(AssetDescriptor, ViewerError)>) {
        self.placement.record_skipped(skipped);
        let report = self.placement.report();
        log::info!(
            "[Diagnostic] Imports finished: {} placed, {} failed, {} skipped",
            report.placed.len(),
            report.failed.len(),
            report.skipped.len()
        );
    }

    fn update(&mut self, dt: f32, spin: f32) {
        if let Some(cube) = self.fallback.and_then(|id| self.scene.node_mut(id)) {
            let axis = Vector3::new(1.0, 1.0, 0.0).normalize();
            cube.instance.rotation =
                cube.instance.rotation * cgmath::Quaternion::from_axis_angle(axis, Rad(spin * dt));
        }
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.update(&mut self.ctx.camera.camera, dt);
        }
        self.ctx.camera.write(&self.ctx.queue, &self.ctx.projection);
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    registry: ImporterRegistry,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            registry: ImporterRegistry::with_builtin_importers(),
            window: None,
            viewer: None,
            last_time: Instant::now(),
        })
    }

    fn spawn(&self, future: platform::BoxedFuture<'static, ()>) {
        #[cfg(not(target_arch = "wasm32"))]
        platform::spawn(&self.async_runtime, future);
        #[cfg(target_arch = "wasm32")]
        platform::spawn(future);
    }

    /// Context is ready: show it and start resolving the importer extensions.
    fn initialized(&mut self, ctx: Context) {
        let mut viewer = Viewer::new(ctx, &self.config);
        let size = viewer.ctx.window().inner_size();
        viewer.resize(size.width, size.height);
        viewer.ctx.window().request_redraw();
        self.viewer = Some(viewer);

        let mut resolver = DependencyResolver::new(Arc::new(self.registry.clone()));
        if let Some(timeout) = self.config.resolve_timeout {
            resolver = resolver.with_timeout(timeout);
        }
        let proxy = self.proxy.clone();
        let resolution = resolver.ensure(&self.config.extensions, move |result| {
            if proxy
                .send_event(ViewerEvent::DependenciesResolved(result))
                .is_err()
            {
                log::error!("Event loop closed before the extensions were resolved");
            }
        });
        if let Some(completion) = resolution.into_future() {
            self.spawn(completion);
        }
    }

    /// Resolver continuation: build the scene and start the imports.
    fn build_scene(&mut self, result: ResolveResult) {
        if let Err(e) = result {
            log::error!("[Diagnostic] {e}; continuing with the importers that are available");
        }
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        log::info!("[Diagnostic] Initializing scene");

        let fallback = viewer.scene.add(
            "fallback cube",
            NodeRole::Fallback,
            Arc::new(ModelData::unit_cube("fallback cube")),
            Instance::from(Vector3::new(0.0, 0.0, -2.0)),
        );
        viewer.fallback = Some(fallback);
        log::info!("[Diagnostic] Fallback cube added");

        viewer.navigation = Some(NavigationController::new(self.config.navigation));

        let manifest = Manifest::from_config(&self.config);
        let pipeline = ImportPipeline::new(self.registry.clone());
        let proxy = self.proxy.clone();
        let sink = self.proxy.clone();
        self.spawn(platform::boxed(async move {
            let skipped = pipeline
                .import_all(manifest.descriptors(), move |completed| {
                    if sink.send_event(ViewerEvent::Imported(completed)).is_err() {
                        log::error!("Event loop closed before an import finished");
                    }
                })
                .await;
            if proxy.send_event(ViewerEvent::ImportsSettled(skipped)).is_err() {
                log::error!("Event loop closed before the imports settled");
            }
        }));
        log::info!("[Diagnostic] Animation loop started");
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("flow-viewer");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()))
                }
                None => {
                    window_attributes = window_attributes.with_append(true);
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(Context::new(window, &self.config))
            {
                Ok(ctx) => self.initialized(ctx),
                Err(e) => {
                    log::error!("Cannot create the renderer: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match Context::new(window, &config).await {
                    Ok(ctx) => {
                        if proxy
                            .send_event(ViewerEvent::Initialized(Box::new(ctx)))
                            .is_err()
                        {
                            log::error!("Event loop closed before the renderer was ready");
                        }
                    }
                    Err(e) => log::error!("Cannot create the renderer: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(ctx) => self.initialized(*ctx),
            ViewerEvent::DependenciesResolved(result) => self.build_scene(result),
            ViewerEvent::Imported(completed) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.on_imported(completed);
                }
            }
            ViewerEvent::ImportsSettled(skipped) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.on_imports_settled(skipped);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            viewer.on_pointer_motion(dx, dy);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::Focused(focused) => {
                viewer.has_focus = focused;
                if !focused {
                    viewer.release();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => viewer.on_key(code, state),
            WindowEvent::MouseInput { state, button, .. } => viewer.on_mouse_button(button, state),
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_time).as_secs_f32();
                self.last_time = now;

                viewer.update(dt, self.config.fallback_spin);
                if viewer.is_surface_configured {
                    match viewer.renderer.render(&viewer.ctx, &viewer.scene) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let size = viewer.ctx.window().inner_size();
                            viewer.resize(size.width, size.height);
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Out of GPU memory");
                            event_loop.exit();
                        }
                        Err(e) => log::warn!("Skipping frame: {e}"),
                    }
                }
                viewer.ctx.window().request_redraw();
            }
            _ => {}
        }
    }
}

/// Open the viewer and run until the window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| anyhow::anyhow!("cannot initialise console logging: {e}"))?;
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    #[cfg(not(target_arch = "wasm32"))]
    event_loop.run_app(&mut app)?;

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
