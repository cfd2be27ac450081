//! Post-processing chain: a fixed two-pass sequence.
//!
//! The scene renders into an offscreen float target, then a single
//! full-screen RGB-shift pass writes the shifted result to the surface.
//! The order is structural: there is no API to reorder or extend the chain.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Offscreen scene target format.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Horizontal channel shift in UV units.
pub const SHIFT_AMOUNT: f32 = 0.001;
/// Shift direction in radians (0 = horizontal).
pub const SHIFT_ANGLE: f32 = 0.0;

/// Label of the scene render pass (always first).
pub const SCENE_PASS: &str = "scene_pass";
/// Label of the RGB-shift pass (always second and last).
pub const RGB_SHIFT_PASS: &str = "rgb_shift_pass";

/// The chain's execution order. Every frame runs exactly these passes.
pub fn pass_order() -> [&'static str; 2] {
    [SCENE_PASS, RGB_SHIFT_PASS]
}

const SHIFT_SHADER: &str = include_str!("shaders/rgb_shift.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ShiftUniforms {
    amount: f32,
    angle: f32,
    _pad: [f32; 2],
}

/// Offscreen target plus the RGB-shift pass that consumes it.
pub struct PostChain {
    target_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
}

impl PostChain {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rgb_shift_shader"),
            source: wgpu::ShaderSource::Wgsl(SHIFT_SHADER.into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("rgb_shift_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rgb_shift_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rgb_shift_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rgb_shift_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rgb_shift_uniform_buffer"),
            contents: bytemuck::bytes_of(&ShiftUniforms {
                amount: SHIFT_AMOUNT,
                angle: SHIFT_ANGLE,
                _pad: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let target_view = create_target(device, width, height);
        let bind_group =
            create_bind_group(device, &bind_group_layout, &target_view, &sampler, &uniform_buffer);

        Self {
            target_view,
            pipeline,
            bind_group_layout,
            bind_group,
            sampler,
            uniform_buffer,
        }
    }

    /// The offscreen view the scene pass renders into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.target_view
    }

    /// Recreate the offscreen target to match a resized surface.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.target_view = create_target(device, width, height);
        self.bind_group = create_bind_group(
            device,
            &self.bind_group_layout,
            &self.target_view,
            &self.sampler,
            &self.uniform_buffer,
        );
    }

    /// Run the RGB-shift pass into `dest`.
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, dest: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(RGB_SHIFT_PASS),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dest,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        // Full-screen triangle generated in the vertex shader.
        pass.draw(0..3, 0..1);
    }
}

/// Offscreen target dimensions for a surface size. Matches the surface
/// exactly, except that a zero dimension is clamped to 1.
pub fn target_extent(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let (width, height) = target_extent(width, height);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("post_scene_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    target: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("rgb_shift_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(target),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform_buffer.as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_order_is_scene_then_shift() {
        assert_eq!(pass_order(), [SCENE_PASS, RGB_SHIFT_PASS]);
    }

    #[test]
    fn shift_amount_matches_the_effect_setting() {
        assert_eq!(SHIFT_AMOUNT, 0.001);
        assert_eq!(SHIFT_ANGLE, 0.0);
    }

    #[test]
    fn shift_uniforms_are_aligned() {
        assert_eq!(std::mem::size_of::<ShiftUniforms>(), 16);
    }

    #[test]
    fn target_matches_surface_size() {
        assert_eq!(target_extent(1280, 720), (1280, 720));
        assert_eq!(target_extent(1, 1), (1, 1));
    }

    #[test]
    fn target_never_has_a_zero_dimension() {
        assert_eq!(target_extent(0, 720), (1, 720));
        assert_eq!(target_extent(1280, 0), (1280, 1));
        assert_eq!(target_extent(0, 0), (1, 1));
    }
}
