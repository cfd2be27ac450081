//! Lit model render pipeline with uniform buffers.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};
use wgpu::util::DeviceExt;

use vitrine_core::scene::{Lights, ModelNode};
use vitrine_core::Camera;

use super::environment::EnvironmentMap;
use super::gltf_loader::ModelData;
use super::mesh::{GpuMesh, MeshVertex};
use super::post;

/// Shader source embedded at compile time.
const MODEL_SHADER: &str = include_str!("shaders/model.wgsl");

/// Tone-mapping exposure multiplier.
const EXPOSURE: f32 = 1.0;

/// Global uniforms (camera, lights, environment).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// rgb = sky color, a = intensity.
    pub hemi_sky: [f32; 4],
    pub hemi_ground: [f32; 4],
    /// xyz = normalized direction the light travels.
    pub sun_dir: [f32; 4],
    /// rgb = color, a = intensity.
    pub sun_color: [f32; 4],
    /// x = environment intensity (0 while absent), y = max mip level,
    /// z = exposure.
    pub env: [f32; 4],
}

impl GlobalUniforms {
    pub fn new(camera: &Camera, lights: &Lights, environment: Option<&EnvironmentMap>) -> Self {
        let hemi = lights.hemisphere;
        let sun = lights.directional;
        let dir = sun.direction();

        let (env_intensity, max_lod) = match environment {
            Some(env) => (1.0, env.max_lod()),
            None => (0.0, 0.0),
        };

        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position().extend(1.0).into(),
            hemi_sky: [hemi.sky_color.x, hemi.sky_color.y, hemi.sky_color.z, hemi.intensity],
            hemi_ground: [hemi.ground_color.x, hemi.ground_color.y, hemi.ground_color.z, 0.0],
            sun_dir: [dir.x, dir.y, dir.z, 0.0],
            sun_color: [sun.color.x, sun.color.y, sun.color.z, sun.intensity],
            env: [env_intensity, max_lod, EXPOSURE, 0.0],
        }
    }
}

/// Per-primitive uniforms (model matrix, material).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceUniforms {
    pub model: [[f32; 4]; 4],
    /// mat3x3 needs vec4 column padding in WGSL uniform layout.
    pub normal_matrix: [[f32; 4]; 3],
    pub base_color: [f32; 4],
    /// x = metallic, y = roughness.
    pub pbr: [f32; 4],
}

impl InstanceUniforms {
    pub fn new(model: Mat4, base_color: [f32; 4], metallic: f32, roughness: f32) -> Self {
        let normal_mat = Mat3::from_mat4(model).inverse().transpose();

        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: [
                normal_mat.x_axis.extend(0.0).into(),
                normal_mat.y_axis.extend(0.0).into(),
                normal_mat.z_axis.extend(0.0).into(),
            ],
            base_color,
            pbr: [metallic, roughness, 0.0, 0.0],
        }
    }
}

/// Model matrix for the tweened node: scale, pitch/yaw rotation, translation.
pub fn model_matrix(node: &ModelNode) -> Mat4 {
    let rotation = node.rotation();
    Mat4::from_scale_rotation_translation(
        Vec3::splat(node.scale),
        Quat::from_euler(glam::EulerRot::XYZ, rotation.pitch, rotation.yaw, 0.0),
        node.position,
    )
}

/// Lit model pipeline resources.
pub struct ModelPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub global_bind_group_layout: wgpu::BindGroupLayout,
    pub instance_bind_group_layout: wgpu::BindGroupLayout,
    pub global_uniform_buffer: wgpu::Buffer,
}

impl ModelPipeline {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("model_shader"),
            source: wgpu::ShaderSource::Wgsl(MODEL_SHADER.into()),
        });

        // Globals + environment map (group 0)
        let global_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("global_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        // Per-primitive uniforms + base color texture (group 1)
        let instance_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("instance_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("model_pipeline_layout"),
            bind_group_layouts: &[&global_bind_group_layout, &instance_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("model_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: post::OFFSCREEN_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // glTF materials may be double-sided.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Self::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let global_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global_uniform_buffer"),
            size: std::mem::size_of::<GlobalUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            global_bind_group_layout,
            instance_bind_group_layout,
            global_uniform_buffer,
        }
    }

    /// Bind the globals buffer together with an environment map.
    ///
    /// Rebuilt when the environment finishes loading.
    pub fn create_global_bind_group(
        &self,
        device: &wgpu::Device,
        environment: &EnvironmentMap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global_bind_group"),
            layout: &self.global_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.global_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&environment.sampler),
                },
            ],
        })
    }
}

/// One uploaded primitive: mesh buffers plus its material bind group.
pub struct GpuPrimitive {
    pub mesh: GpuMesh,
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    base_color: [f32; 4],
    metallic: f32,
    roughness: f32,
}

/// The loaded model on the GPU.
pub struct GpuModel {
    pub primitives: Vec<GpuPrimitive>,
}

impl GpuModel {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipeline: &ModelPipeline,
        data: &ModelData,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("model_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let primitives = data
            .primitives
            .iter()
            .map(|prim| {
                let mesh = GpuMesh::new(device, &prim.vertices, &prim.indices);

                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("instance_uniform_buffer"),
                    contents: bytemuck::bytes_of(&InstanceUniforms::new(
                        Mat4::IDENTITY,
                        prim.material.base_color_factor,
                        prim.material.metallic,
                        prim.material.roughness,
                    )),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });

                let texture_view = match &prim.material.base_color_image {
                    Some(img) => upload_rgba8(device, queue, img.width, img.height, &img.pixels),
                    // 1x1 white fallback for untextured primitives.
                    None => upload_rgba8(device, queue, 1, 1, &[255, 255, 255, 255]),
                };

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("instance_bind_group"),
                    layout: &pipeline.instance_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: instance_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&texture_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                });

                GpuPrimitive {
                    mesh,
                    instance_buffer,
                    bind_group,
                    base_color: prim.material.base_color_factor,
                    metallic: prim.material.metallic,
                    roughness: prim.material.roughness,
                }
            })
            .collect();

        Self { primitives }
    }

    /// Push the node's current transform into every primitive's uniforms.
    pub fn update_transform(&self, queue: &wgpu::Queue, node: &ModelNode) {
        let model = model_matrix(node);
        for prim in &self.primitives {
            let uniforms =
                InstanceUniforms::new(model, prim.base_color, prim.metallic, prim.roughness);
            queue.write_buffer(&prim.instance_buffer, 0, bytemuck::bytes_of(&uniforms));
        }
    }
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("model_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use vitrine_core::Scene;

    #[test]
    fn uniform_struct_sizes_are_aligned() {
        // WGSL uniform blocks require 16-byte multiples.
        assert_eq!(std::mem::size_of::<GlobalUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<InstanceUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<InstanceUniforms>(), 144);
    }

    #[test]
    fn model_matrix_applies_scale_and_translation() {
        let mut scene = Scene::new();
        scene.attach_model();
        let matrix = model_matrix(scene.model().unwrap());

        // Uniform scale 2 at the origin with no rotation yet.
        let p = matrix.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!(matrix.transform_point3(Vec3::ZERO).length() < 1e-5);
    }

    #[test]
    fn yaw_turns_around_vertical_axis() {
        let mut scene = Scene::new();
        scene.attach_model();
        // Cursor at the right edge: yaw target PI/4, no pitch.
        scene.pointer_moved(1920.0, 540.0, 1920.0, 1080.0);
        scene.advance(10.0);

        let rotation = scene.model().unwrap().rotation();
        assert!(rotation.pitch.abs() < 1e-5);
        assert!((rotation.yaw - FRAC_PI_2 / 2.0).abs() < 1e-5);

        // A point on +Z swings toward +X under positive yaw.
        let matrix = model_matrix(scene.model().unwrap());
        let p = matrix.transform_point3(Vec3::Z);
        assert!(p.x > 0.0);
        assert!((p.y).abs() < 1e-5);
    }

    #[test]
    fn environment_toggles_the_env_flag() {
        let camera = Camera::new(1.0);
        let lights = Lights::default();
        let globals = GlobalUniforms::new(&camera, &lights, None);
        assert_eq!(globals.env[0], 0.0);
        assert_eq!(globals.sun_color[3], 0.8);
        assert_eq!(globals.hemi_sky[3], 1.1);
        // Direction is normalized.
        let d = Vec3::new(globals.sun_dir[0], globals.sun_dir[1], globals.sun_dir[2]);
        assert!((d.length() - 1.0).abs() < 1e-5);
    }
}
