//! WebGPU renderer for the showpiece.
//!
//! Owns the surface, device, camera, post chain, and the optional GPU mirrors
//! of the scene's async-loaded pieces (model, environment map). Renders every
//! frame through the fixed [scene pass, RGB-shift pass] chain.

pub mod environment;
pub mod gltf_loader;
pub mod mesh;
pub mod model_pipeline;
pub mod post;

use std::sync::Arc;

use wgpu::{
    Backends, Device, DeviceDescriptor, Instance, InstanceDescriptor, PowerPreference, Queue,
    RequestAdapterOptions, Surface, SurfaceConfiguration, TextureUsages,
};
use winit::{dpi::PhysicalSize, window::Window};

use vitrine_core::{Camera, Scene};

use environment::{EnvironmentMap, HdriImage};
use gltf_loader::ModelData;
use model_pipeline::{GlobalUniforms, GpuModel, ModelPipeline};
use post::PostChain;

/// Device pixel ratios above 2 are clamped; retina is enough for a demo.
pub fn surface_scale(device_pixel_ratio: f64) -> f64 {
    device_pixel_ratio.min(2.0)
}

/// The main renderer.
pub struct Renderer {
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,

    camera: Camera,
    depth_view: wgpu::TextureView,

    model_pipeline: ModelPipeline,
    post: PostChain,
    global_bind_group: wgpu::BindGroup,

    model: Option<GpuModel>,
    environment: Option<EnvironmentMap>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No suitable GPU adapter found"))?;

        tracing::info!("Using adapter: {:?}", adapter.get_info());

        let limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults()
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("vitrine_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = Camera::new(config.width as f32 / config.height as f32);
        let depth_view = create_depth_texture(&device, config.width, config.height);

        let model_pipeline = ModelPipeline::new(&device);
        let post = PostChain::new(&device, surface_format, config.width, config.height);

        // Black 1x1 stand-in keeps the bind group valid until the HDRI lands;
        // the bind group holds the texture alive.
        let placeholder_env = EnvironmentMap::placeholder(&device, &queue);
        let global_bind_group = model_pipeline.create_global_bind_group(&device, &placeholder_env);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            depth_view,
            model_pipeline,
            post,
            global_bind_group,
            model: None,
            environment: None,
        })
    }

    /// Resize: surface first, then camera projection, then post buffers, so
    /// no frame renders with mismatched dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.camera.set_viewport(new_size.width, new_size.height);

        self.depth_view = create_depth_texture(&self.device, new_size.width, new_size.height);
        self.post
            .resize(&self.device, new_size.width, new_size.height);

        tracing::debug!("Resized to {}x{}", new_size.width, new_size.height);
    }

    /// Upload the loaded model.
    pub fn install_model(&mut self, data: &ModelData) {
        self.model = Some(GpuModel::new(
            &self.device,
            &self.queue,
            &self.model_pipeline,
            data,
        ));
        tracing::info!("Model uploaded ({} primitives)", data.primitives.len());
    }

    /// Upload the decoded HDRI and swap it into the global bind group.
    pub fn install_environment(&mut self, hdri: HdriImage) {
        let env = EnvironmentMap::new(&self.device, &self.queue, hdri);
        self.global_bind_group = self.model_pipeline.create_global_bind_group(&self.device, &env);
        self.environment = Some(env);
        tracing::info!("Environment map installed");
    }

    /// Render one frame of the chain: scene pass, then RGB-shift pass.
    pub fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        let globals = GlobalUniforms::new(&self.camera, &scene.lights, self.environment.as_ref());
        self.queue.write_buffer(
            &self.model_pipeline.global_uniform_buffer,
            0,
            bytemuck::bytes_of(&globals),
        );

        if let (Some(model), Some(node)) = (&self.model, scene.model()) {
            model.update_transform(&self.queue, node);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        // Pass 1: scene into the offscreen target, transparent clear.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(post::SCENE_PASS),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(model) = &self.model {
                pass.set_pipeline(&self.model_pipeline.pipeline);
                pass.set_bind_group(0, &self.global_bind_group, &[]);
                for prim in &model.primitives {
                    pass.set_bind_group(1, &prim.bind_group, &[]);
                    pass.set_vertex_buffer(0, prim.mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        prim.mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..prim.mesh.index_count, 0, 0..1);
                }
            }
        }

        // Pass 2: RGB shift into the surface.
        self.post.run(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_texture(device: &Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ModelPipeline::DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        assert_eq!(surface_scale(1.0), 1.0);
        assert_eq!(surface_scale(1.5), 1.5);
        assert_eq!(surface_scale(2.0), 2.0);
        assert_eq!(surface_scale(3.0), 2.0);
    }
}
