//! Interactive mean curvature flow viewer.
//!
//! Usage: geoflow-view [MESH_FILE] [--speed <s>] [--gain <g>] [--max-time-step <dt>]
//!
//! Controls:
//! - Left mouse drag: Rotate camera
//! - Scroll wheel: Zoom in/out
//! - Space: Start/stop the flow
//! - 1 / 2: Select flow variant
//! - + / -: Raise or lower the curvature colour gain
//! - C: Toggle curvature colouring
//! - W: Toggle wireframe mode
//! - R: Reset camera
//! - Backspace: Restore the loaded mesh
//! - Escape: Quit

mod camera;
mod mesh_gpu;
mod renderer;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use camera::OrbitCamera;
use mesh_gpu::{bounding_sphere, GpuMesh};
use renderer::{DrawMode, Renderer};

use geoflow::io;
use geoflow::mesh::generators::icosphere;
use geoflow::prelude::*;

#[derive(Parser)]
#[command(name = "geoflow-view")]
#[command(author, version, about = "Interactive mean curvature flow viewer", long_about = None)]
struct Args {
    /// Mesh file to load (OBJ, STL or PLY); a unit icosphere when omitted
    input: Option<PathBuf>,

    /// Flow speed (step scale = elapsed seconds * speed)
    #[arg(short, long, default_value = "0.05")]
    speed: f64,

    /// Gain from curvature to heat-map colour
    #[arg(short, long, default_value = "0.25")]
    gain: f64,

    /// Clamp each frame's time delta to this many seconds
    #[arg(long)]
    max_time_step: Option<f64>,

    /// Use single-threaded execution
    #[arg(long)]
    sequential: bool,

    /// Start flowing immediately
    #[arg(long)]
    flow: bool,
}

/// Factor applied to the colour gain per key press.
const GAIN_STEP: f64 = 1.25;

/// Application state.
struct App {
    /// The flow engine; owns the mesh being deformed.
    driver: StepDriver,
    /// The mesh as loaded, for Backspace.
    original: FlowMesh,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    gpu_mesh: Option<GpuMesh>,
    camera: OrbitCamera,
    mode: DrawMode,
    mouse_pressed: bool,
    last_mouse_pos: Option<PhysicalPosition<f64>>,
}

impl App {
    fn new(mesh: FlowMesh, options: FlowOptions, start_flowing: bool) -> Self {
        let original = mesh.clone();
        let mut driver = StepDriver::new(mesh, options);
        driver.set_enabled(start_flowing);

        Self {
            driver,
            original,
            window: None,
            renderer: None,
            gpu_mesh: None,
            camera: OrbitCamera::default(),
            mode: DrawMode {
                wireframe: false,
                curvature_colors: true,
            },
            mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    fn frame_mesh(&mut self) {
        let (center, radius) = bounding_sphere(self.driver.mesh());
        self.camera.reset(center, radius);
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn update_title(&self) {
        if let Some(ref window) = self.window {
            let state = if self.driver.is_flowing() { "flowing" } else { "idle" };
            window.set_title(&format!("Geoflow - {} ({})", self.driver.variant(), state));
        }
    }

    fn select_variant(&mut self, slot: usize) {
        let Some(&variant) = FlowVariant::ALL.get(slot) else {
            return;
        };
        if let Err(e) = self.driver.set_variant(variant) {
            log::error!("{}", e);
        }
        self.update_title();
    }

    fn scale_gain(&mut self, factor: f64) {
        let gain = self.driver.options().visualization_gain * factor;
        let options = self.driver.options().clone().with_visualization_gain(gain);
        self.driver.set_options(options);
        log::info!("Curvature gain: {:.3}", self.driver.options().visualization_gain);
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: Key) {
        match key {
            Key::Named(NamedKey::Escape) => {
                event_loop.exit();
            }
            Key::Named(NamedKey::Space) => {
                let state = self.driver.toggle();
                log::info!("Flow: {:?}", state);
                self.update_title();
            }
            Key::Named(NamedKey::Backspace) => {
                self.driver.reset(self.original.clone());
                log::info!("Mesh restored");
            }
            Key::Character(ref c) if c == "1" => self.select_variant(0),
            Key::Character(ref c) if c == "2" => self.select_variant(1),
            Key::Character(ref c) if c == "+" || c == "=" => self.scale_gain(GAIN_STEP),
            Key::Character(ref c) if c == "-" => self.scale_gain(1.0 / GAIN_STEP),
            Key::Character(ref c) if c == "w" || c == "W" => {
                self.mode.wireframe = !self.mode.wireframe;
                log::info!(
                    "Wireframe mode: {}",
                    if self.mode.wireframe { "ON" } else { "OFF" }
                );
            }
            Key::Character(ref c) if c == "c" || c == "C" => {
                self.mode.curvature_colors = !self.mode.curvature_colors;
                log::info!(
                    "Curvature colours: {}",
                    if self.mode.curvature_colors { "ON" } else { "OFF" }
                );
            }
            Key::Character(ref c) if c == "r" || c == "R" => {
                self.frame_mesh();
                log::info!("Camera reset");
            }
            _ => return,
        }
        self.request_redraw();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.driver.tick();

        let (Some(renderer), Some(gpu_mesh)) = (&mut self.renderer, &self.gpu_mesh) else {
            return;
        };

        if self.driver.take_upload() {
            gpu_mesh.update(renderer.queue(), self.driver.mesh());
        }

        match renderer.render(gpu_mesh, &self.camera, self.mode) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost) => {
                if let Some(ref window) = self.window {
                    renderer.resize(window.inner_size());
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(e) => {
                log::error!("Render error: {:?}", e);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Geoflow")
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let renderer = match pollster::block_on(Renderer::new(window.clone())) {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let gpu_mesh = GpuMesh::new(renderer.device(), self.driver.mesh());
        self.driver.take_upload();

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.gpu_mesh = Some(gpu_mesh);
        self.frame_mesh();
        self.update_title();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(new_size);
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    self.handle_key(event_loop, event.logical_key);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some(last_pos) = self.last_mouse_pos {
                        let dx = position.x - last_pos.x;
                        let dy = position.y - last_pos.y;

                        let sensitivity = 0.005;
                        self.camera
                            .rotate(-dx as f32 * sensitivity, dy as f32 * sensitivity);
                        self.request_redraw();
                    }
                    self.last_mouse_pos = Some(position);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.camera.zoom(1.0 - scroll * 0.1);
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Keep frames coming so the flow clock advances.
        self.request_redraw();
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let options = FlowOptions {
        flow_speed: args.speed,
        visualization_gain: args.gain,
        max_time_step: args.max_time_step,
        parallel: !args.sequential,
    };
    options.validate()?;

    let mesh: FlowMesh = match args.input {
        Some(ref path) => io::load(path)?,
        None => icosphere(3, 1.0),
    };
    log::info!(
        "Viewing mesh: {} vertices, {} faces",
        mesh.num_vertices(),
        mesh.num_faces()
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(mesh, options, args.flow);
    event_loop.run_app(&mut app)?;
    Ok(())
}
