//! Platform layer: windowing, event loop and the mesh viewer around it.
//!
//! The window is created on `resumed`, after which the GPU state, the shader
//! program and every configured mesh are set up once. Each redraw renders all
//! meshes with the current camera. Keys `a`/`d` turn the camera, `w`/`s`
//! move it.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use corelib::{Vec3, camera::Camera, vec3};
use renderer::{
    GpuState,
    mesh::{Mesh, MeshConfig},
    shader::ShaderProgram,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::Key,
    window::{Window, WindowId},
};

const TURN_STEP_DEG: f32 = 1.0;
const MOVE_STEP: f32 = 0.1;

/// Everything the viewer needs to start.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub models: Vec<PathBuf>,
    /// WGSL file; `None` uses the built-in mesh shader.
    pub shader: Option<PathBuf>,
    pub mesh: MeshConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            show_fps: false,
            models: vec![PathBuf::from("models/cube.obj")],
            shader: None,
            mesh: MeshConfig::default(),
        }
    }
}

/// Run the viewer. Returns when the window is closed or setup fails.
pub fn run_with_renderer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = Viewer::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            log::info!("FPS: {:.1}", self.frames as f32 / elapsed.as_secs_f32());
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

struct Scene {
    window: Arc<Window>,
    gpu: GpuState,
    meshes: Vec<Mesh>,
}

struct Viewer {
    config: ViewerConfig,
    camera: Camera,
    scene: Option<Scene>,
    fps: Option<FpsCounter>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let camera = Camera::new_perspective(
            vec3(0.0, 0.0, 3.0),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            0.1,
            100.0,
            config.width as f32 / config.height.max(1) as f32,
        );
        let fps = config.show_fps.then(FpsCounter::new);
        Self {
            config,
            camera,
            scene: None,
            fps,
            error: None,
        }
    }

    fn init_scene(&self, event_loop: &ActiveEventLoop) -> Result<Scene> {
        let attrs = Window::default_attributes()
            .with_title("meshview")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends))
            .context("Failed to initialize GPU")?;

        let program = match &self.config.shader {
            Some(path) => ShaderProgram::load(gpu.device(), path),
            None => ShaderProgram::builtin(gpu.device()),
        }
        .context("Failed to create shader program")?;
        let program = Arc::new(program);

        let targets = gpu.mesh_targets();
        let mut meshes = Vec::with_capacity(self.config.models.len());
        for path in &self.config.models {
            let mut mesh = Mesh::new(self.config.mesh);
            mesh.load(gpu.device(), &targets, path, program.clone())
                .with_context(|| format!("Failed to load model {}", path.display()))?;
            meshes.push(mesh);
        }

        Ok(Scene {
            window,
            gpu,
            meshes,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_key(&mut self, key: &Key) {
        let Key::Character(c) = key else {
            return;
        };
        match c.as_str() {
            "a" => self.camera.rotate(TURN_STEP_DEG, Vec3::Y),
            "d" => self.camera.rotate(-TURN_STEP_DEG, Vec3::Y),
            "w" => self.camera.move_forward(MOVE_STEP),
            "s" => self.camera.move_forward(-MOVE_STEP),
            _ => {}
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        match self.init_scene(event_loop) {
            Ok(scene) => {
                self.camera = self.camera.with_aspect(scene.gpu.aspect());
                self.scene = Some(scene);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(scene) = self.scene.as_mut() {
                    scene.gpu.resize(new_size.width, new_size.height);
                    self.camera = self.camera.with_aspect(scene.gpu.aspect());
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(&logical_key),
            WindowEvent::RedrawRequested => {
                let Some(scene) = self.scene.as_mut() else {
                    return;
                };
                match scene.gpu.render(&self.camera, &scene.meshes) {
                    Ok(()) => {
                        if let Some(fps) = self.fps.as_mut() {
                            fps.tick();
                        }
                    }
                    Err(err) if GpuState::is_surface_lost(&err) => {
                        log::warn!("Surface lost/outdated, reconfiguring");
                        scene.gpu.recreate_surface();
                    }
                    Err(err) => self.fail(event_loop, err.into()),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = self.scene.as_ref() {
            scene.window.request_redraw();
        }
    }
}
