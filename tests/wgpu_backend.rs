//! These need a GPU adapter, so they're ignored by default.
//! Run them with `cargo test -- --ignored` on a machine that has one.

use cgmath::{Matrix4, Vector3};
use instancing::{
    InstanceBuffer, InstanceBufferDesc, SemanticTable, WgpuBackend, constants::INSTANCE_BUFFER_SLOT,
    gpu::GpuContext,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Draws a small triangle per instance, placed by the instance's model matrix.
const SHADER: &str = r#"
struct Instance {
    @location(5) position: vec3<f32>,
    @location(6) basis_x: vec3<f32>,
    @location(7) basis_y: vec3<f32>,
    @location(8) basis_z: vec3<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex: u32, instance: Instance) -> @builtin(position) vec4<f32> {
    let model = mat4x4<f32>(
        vec4<f32>(instance.basis_x, 0.0),
        vec4<f32>(instance.basis_y, 0.0),
        vec4<f32>(instance.basis_z, 0.0),
        vec4<f32>(instance.position, 1.0),
    );
    let x = f32(i32(vertex) - 1) * 0.25;
    let y = f32(i32(vertex & 1u) * 2 - 1) * 0.25;
    return model * vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

fn gpu() -> GpuContext {
    let _ = env_logger::builder().is_test(true).try_init();
    pollster::block_on(GpuContext::headless()).expect("no GPU adapter available")
}

/// Write `count` instances with an identity basis, spread out along x.
fn write_instances(buffer: &mut InstanceBuffer<WgpuBackend>, count: u32) {
    let mut lock = buffer.lock().unwrap();
    for i in 0..count {
        let model = Matrix4::from_translation(Vector3::new(i as f32 * 0.3 - 0.5, 0.0, 0.0));
        let columns: [[f32; 3]; 4] = [
            model.x.truncate().into(),
            model.y.truncate().into(),
            model.z.truncate().into(),
            model.w.truncate().into(),
        ];
        lock.record_mut(i)
            .unwrap()
            .copy_from_slice(bytemuck::cast_slice(&columns));
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn bind_tracks_stream_offsets() {
    let gpu = gpu();
    let desc = InstanceBufferDesc {
        max_instances: 4,
        ..Default::default()
    };
    let backend = WgpuBackend::new(gpu, "instance_buffer", &desc);
    let mut buffer = InstanceBuffer::with_backend(desc, backend).unwrap();
    assert_eq!(buffer.backend().handle().handle().size(), 192);

    write_instances(&mut buffer, 4);

    buffer.bind(INSTANCE_BUFFER_SLOT, 2);
    let binding = buffer.backend().streams().get(INSTANCE_BUFFER_SLOT).unwrap();
    assert_eq!(binding.byte_offset, 96);

    // one past the last record, so the previous binding is kept
    buffer.bind(INSTANCE_BUFFER_SLOT, 4);
    let binding = buffer.backend().streams().get(INSTANCE_BUFFER_SLOT).unwrap();
    assert_eq!(binding.byte_offset, 96);

    buffer.unbind(INSTANCE_BUFFER_SLOT);
    assert!(buffer.backend().streams().is_empty());
}

#[test]
#[ignore = "needs a GPU adapter"]
fn odd_sized_blocks_upload_but_only_bind_aligned_offsets() {
    let gpu = gpu();
    let desc = InstanceBufferDesc {
        max_instances: 3,
        stride: 13,
        semantics: SemanticTable::new(),
    };
    let backend = WgpuBackend::new(gpu, "odd_instance_buffer", &desc);
    let mut buffer = InstanceBuffer::with_backend(desc, backend).unwrap();
    assert_eq!(buffer.backend().handle().handle().size(), 40);

    buffer.lock().unwrap().fill(0x7f);

    // offset 13 isn't 4-byte aligned
    buffer.bind(0, 1);
    assert!(buffer.backend().streams().get(0).is_none());

    // offset 39 fits in the padded GPU buffer but not in the records
    buffer.bind(0, 3);
    assert!(buffer.backend().streams().get(0).is_none());

    buffer.bind(0, 0);
    assert_eq!(buffer.backend().streams().get(0).map(|b| b.byte_offset), Some(0));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn applied_streams_feed_an_instanced_draw() {
    let gpu = gpu();
    let device = gpu.device().clone();
    let desc = InstanceBufferDesc {
        max_instances: 4,
        ..Default::default()
    };
    let backend = WgpuBackend::new(gpu.clone(), "drawn_instance_buffer", &desc);
    let mut buffer = InstanceBuffer::with_backend(desc, backend).unwrap();
    write_instances(&mut buffer, 4);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("instance_target"),
        size: wgpu::Extent3d {
            width: 16,
            height: 16,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("instance_shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    });
    let attributes = desc.semantics.vertex_attributes();
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("instance_pipeline"),
        layout: None,
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[desc.vertex_buffer_layout(&attributes)],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    // the pipeline only has the instance layout, so it lives in slot 0 here;
    // draw every record, then only the last two
    for (first_instance, instances) in [(0, 0..4), (2, 0..2)] {
        buffer.bind(0, first_instance);
        assert!(buffer.backend().streams().get(0).is_some());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("instance_encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("instance_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&pipeline);
            buffer.backend().apply(&mut render_pass);
            render_pass.draw(0..3, instances);
        }
        // validation errors from the pass panic through wgpu's default error handler
        gpu.queue().submit([encoder.finish()]);

        buffer.unbind(0);
    }
}
