//! Marquee -- animated loading-screen overlay, host loop and entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. Every
//! `RedrawRequested` is one lifecycle frame:
//!
//!   1. The orchestrator drains the deferred GPU work queue, then advances
//!      and records the overlay (backdrop, transitions, logo) into a CPU
//!      mesh via `DrawContext`
//!   2. The mesh is streamed into GPU buffers (power-of-two growth) and
//!      issued as batched indexed draws
//!
//! The other two lifecycle signals are mapped to keys so the attract loop
//! can be exercised end to end: L starts "loading" for the next content-set
//! in the manifest, M simulates a device remount, Esc quits.

mod catalog;
mod orchestrator;
mod placed;
mod transition;
mod work_queue;

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use catalog::GpuHandles;
use marquee_core::manifest::load_manifest;
use marquee_core::settings::load_settings;
use marquee_platform::window::PlatformConfig;
use marquee_render::{
    Binding, DrawContext, GpuContext, OverlayCamera, SpritePipeline, SpriteVertex, Texture,
};
use orchestrator::Orchestrator;

const ASSET_ROOT: &str = "assets";
const SETTINGS_PATH: &str = "assets/settings.json";
const MANIFEST_PATH: &str = "assets/loading_screens.json";

/// All mutable state. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface exist.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    pipeline: Rc<SpritePipeline>,
    camera: OverlayCamera,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    /// 1x1 white bound for `Binding::Solid` geometry (backdrop, seam lines).
    solid_bind_group: wgpu::BindGroup,

    orchestrator: Orchestrator,
    set_ids: Vec<u32>,
    next_set: usize,

    // The overlay mesh is rebuilt on the CPU each frame, then streamed into
    // these buffers. Buffers grow (power-of-two) but never shrink.
    draw_ctx: DrawContext,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let pipeline = Rc::new(SpritePipeline::new(&gpu.device, gpu.surface_format));

        let solid = Texture::solid_white(&gpu.device, &gpu.queue);
        let solid_bind_group = pipeline.create_texture_bind_group(&gpu.device, &solid);

        let camera = OverlayCamera::new(gpu.size.0, gpu.size.1);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        let settings = load_settings(Path::new(SETTINGS_PATH)).unwrap_or_else(|err| {
            log::warn!("{err}; continuing with defaults");
            Default::default()
        });
        let sets = load_manifest(Path::new(MANIFEST_PATH)).unwrap_or_else(|err| {
            log::error!("{err}; no content-sets available");
            Vec::new()
        });

        let mut orchestrator = Orchestrator::new(
            settings,
            &sets,
            Path::new(ASSET_ROOT),
            StdRng::from_entropy(),
        );
        let set_ids = orchestrator.content_set_ids();
        orchestrator.on_device_mount(GpuHandles {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            pipeline: Rc::clone(&pipeline),
        });

        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        Self {
            window,
            gpu,
            pipeline,
            camera,
            camera_buffer,
            camera_bind_group,
            solid_bind_group,
            orchestrator,
            set_ids,
            next_set: 0,
            draw_ctx: DrawContext::new(),
            vertex_buffer,
            index_buffer,
            mesh_vertex_capacity: 1,
            mesh_index_capacity: 1,
        }
    }

    fn start_next_load(&mut self) {
        if self.set_ids.is_empty() {
            log::warn!("No content-sets in the manifest; nothing to load");
            return;
        }
        let id = self.set_ids[self.next_set % self.set_ids.len()];
        self.next_set += 1;
        self.orchestrator.on_load_start(id);
    }

    fn simulate_device_remount(&mut self) {
        self.orchestrator.on_device_remount();
        self.orchestrator.on_device_mount(GpuHandles {
            device: self.gpu.device.clone(),
            queue: self.gpu.queue.clone(),
            pipeline: Rc::clone(&self.pipeline),
        });
    }

    fn render_frame(&mut self) {
        let viewport = Vec2::new(self.gpu.size.0 as f32, self.gpu.size.1 as f32);
        self.draw_ctx.clear();
        self.orchestrator.on_draw_frame(&mut self.draw_ctx, viewport);
        if self.orchestrator.is_loading() {
            log::trace!("{} live transitions", self.orchestrator.live_count());
        }

        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );
        self.ensure_mesh_capacity(self.draw_ctx.vertices().len(), self.draw_ctx.indices().len());
        if !self.draw_ctx.is_empty() {
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(self.draw_ctx.vertices()),
            );
            self.gpu.queue.write_buffer(
                &self.index_buffer,
                0,
                bytemuck::cast_slice(self.draw_ctx.indices()),
            );
        }

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for call in self.draw_ctx.calls() {
                let bind_group = match &call.binding {
                    Binding::Solid => &self.solid_bind_group,
                    Binding::Texture(group) => group.as_ref(),
                };
                render_pass.set_bind_group(1, bind_group, &[]);
                render_pass.draw_indexed(
                    call.index_start..(call.index_start + call.index_count),
                    0,
                    0..1,
                );
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Overlay Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Overlay Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = marquee_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                        PhysicalKey::Code(KeyCode::KeyL) => state.start_next_load(),
                        PhysicalKey::Code(KeyCode::KeyM) => state.simulate_device_remount(),
                        _ => {}
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }
                state.render_frame();
            }

            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Marquee overlay starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
