// src/gpu.rs
// Optional accelerator for the projection bridge: rays live in a device buffer
// mirror of the mesh and a compute kernel writes pixel coordinates, which are
// read back once the device signals completion.

use bytemuck::{Pod, Zeroable};
use once_cell::sync::OnceCell;
use wgpu::util::DeviceExt;

use crate::camera::CameraPose;
use crate::error::{MeshError, MeshResult};
use crate::lens::{Lens, Projection};
use crate::mesh::Mesh;

const WORKGROUP_SIZE: u32 = 64;

static GPU_CTX: OnceCell<GpuContext> = OnceCell::new();

/// Process-wide device and queue.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Acquire the shared context, initialising the adapter on first use.
    pub fn get() -> MeshResult<&'static Self> {
        GPU_CTX.get_or_try_init(|| {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let adapter = pollster::block_on(instance.request_adapter(
                &wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                },
            ))
            .ok_or_else(|| MeshError::device("no suitable adapter"))?;

            let (device, queue) = pollster::block_on(adapter.request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    label: Some("visualmesh-device"),
                },
                None,
            ))
            .map_err(|e| MeshError::device(format!("request_device failed: {e}")))?;

            Ok(Self { device, queue })
        })
    }
}

/// Device mirror of a mesh's ray table.
pub struct GpuMesh {
    rays: wgpu::Buffer,
}

impl GpuMesh {
    /// Upload the ray table once; the buffer is reused across projections.
    pub fn upload(ctx: &GpuContext, mesh: &Mesh) -> Self {
        let rays: Vec<[f32; 4]> = mesh
            .nodes
            .iter()
            .map(|n| [n.ray.x as f32, n.ray.y as f32, n.ray.z as f32, 0.0])
            .collect();
        let rays = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("visualmesh-rays"),
                contents: bytemuck::cast_slice(&rays),
                usage: wgpu::BufferUsages::STORAGE,
            });
        Self { rays }
    }
}

/// Kernel-side lens and pose block. Field order matches the WGSL struct.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct KernelParams {
    rco: [[f32; 4]; 3],
    centre: [f32; 2],
    dimensions: [f32; 2],
    focal_length: f32,
    projection: u32,
    _pad: [f32; 2],
}

/// Compute-shader projection engine.
pub struct GpuProjector {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl GpuProjector {
    pub fn new(ctx: &GpuContext) -> Self {
        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("visualmesh-project"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/project.wgsl").into()),
            });

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("visualmesh-project-layout"),
                entries: &[
                    storage_entry(0, true),
                    storage_entry(1, true),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    storage_entry(3, false),
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("visualmesh-project-pipeline-layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("visualmesh-project-pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "project",
            });

        Self { pipeline, layout }
    }

    /// Project the rays selected by `indices` and read the pixels back.
    /// Blocks on the device; the copy waits on kernel completion through the
    /// submission order of the encoder.
    pub fn project(
        &self,
        ctx: &GpuContext,
        mesh: &GpuMesh,
        indices: &[u32],
        pose: &CameraPose,
        lens: &Lens,
    ) -> MeshResult<Vec<[f32; 2]>> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let count = indices.len() as u32;

        let index_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("visualmesh-indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let rco = pose.rco();
        let params = KernelParams {
            rco: [
                [
                    rco.row(0).x as f32,
                    rco.row(0).y as f32,
                    rco.row(0).z as f32,
                    0.0,
                ],
                [
                    rco.row(1).x as f32,
                    rco.row(1).y as f32,
                    rco.row(1).z as f32,
                    0.0,
                ],
                [
                    rco.row(2).x as f32,
                    rco.row(2).y as f32,
                    rco.row(2).z as f32,
                    0.0,
                ],
            ],
            centre: [lens.centre[0] as f32, lens.centre[1] as f32],
            dimensions: [lens.dimensions[0] as f32, lens.dimensions[1] as f32],
            focal_length: lens.focal() as f32,
            projection: match lens.projection() {
                Projection::Equidistant => 0,
                Projection::Equisolid => 1,
                Projection::Rectilinear => 2,
            },
            _pad: [0.0; 2],
        };
        let param_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("visualmesh-params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let output_size = (indices.len() * std::mem::size_of::<[f32; 2]>()) as u64;
        let output = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("visualmesh-pixels"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("visualmesh-pixels-staging"),
            size: output_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("visualmesh-project-bind"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.rays.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: index_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: param_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("visualmesh-project-encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("visualmesh-project-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output, 0, &staging, 0, output_size);
        ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        match pollster::block_on(receiver.receive()) {
            Some(Ok(())) => {}
            other => {
                return Err(MeshError::device(format!(
                    "pixel readback failed: {other:?}"
                )))
            }
        }

        let data = slice.get_mapped_range();
        let pixels: Vec<[f32; 2]> = bytemuck::cast_slice(&data)
            .chunks_exact(2)
            .map(|c| [c[0], c[1]])
            .collect();
        drop(data);
        staging.unmap();
        Ok(pixels)
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
