use super::batch::Vertex;
use super::state::RenderState;
use crate::coords::ColorRgba;

/// The fixed set of GPU programs the engine draws with.
///
/// Which one a draw call uses is decided by [`select_variant`]; the result
/// is part of the batch key, so selection must be pure and stable for equal
/// inputs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum ShaderVariant {
    /// Textured quad, no color effects. The fast common path.
    Plain,
    /// Textured quad multiplied by the modulation color.
    Modulated,
    /// Textured quad with overlay tint (and modulation).
    Tinted,
    /// Textured quad with shader-side coordinate wrapping (and both color
    /// effects). Wrapping happens in the shader rather than via hardware
    /// address modes so that non-power-of-two images tile on every backend.
    Repeat,
    /// Underwater distortion; always used for water draws regardless of
    /// other state.
    Water,
    /// Untextured single-pixel points.
    SolidPoint,
}

/// Operation kind, the second input to variant selection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum DrawOp {
    TexturedQuad,
    WaterQuad,
    Point,
}

/// Maps the current state + operation to a shader variant.
///
/// Escalation policy for textured quads: repeat dominates (its shader also
/// applies both color effects), then overlay, then modulation, and the
/// plain program serves the default state.
pub(crate) fn select_variant(state: &RenderState, op: DrawOp) -> ShaderVariant {
    match op {
        DrawOp::WaterQuad => ShaderVariant::Water,
        DrawOp::Point => ShaderVariant::SolidPoint,
        DrawOp::TexturedQuad => {
            if state.texture_repeat {
                ShaderVariant::Repeat
            } else if state.overlay_color != ColorRgba::TRANSPARENT {
                ShaderVariant::Tinted
            } else if state.color_modulation != ColorRgba::WHITE {
                ShaderVariant::Modulated
            } else {
                ShaderVariant::Plain
            }
        }
    }
}

/// All render pipelines plus the bind group layouts they share.
///
/// Group 0 is the per-target viewport uniform (vertex stage); group 1 is
/// the sampled texture + sampler (fragment stage, textured variants only).
/// Off-screen render targets use the surface format, so a single pipeline
/// set serves every draw destination.
pub(crate) struct Pipelines {
    pub viewport_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,

    plain: wgpu::RenderPipeline,
    modulated: wgpu::RenderPipeline,
    tinted: wgpu::RenderPipeline,
    repeat: wgpu::RenderPipeline,
    water: wgpu::RenderPipeline,
    solid_points: wgpu::RenderPipeline,
    solid_lines: wgpu::RenderPipeline,
    solid_triangles: wgpu::RenderPipeline,
}

impl Pipelines {
    pub(crate) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kishar viewport bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(viewport_uniform_size()),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kishar texture bgl"),
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
            ],
        });

        let textured_pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kishar textured pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            immediate_size: 0,
        });

        let solid_pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kishar solid pipeline layout"),
            bind_group_layouts: &[&viewport_layout],
            immediate_size: 0,
        });

        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kishar quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });
        let water_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kishar water shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/water.wgsl").into()),
        });
        let solid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kishar solid shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/solid.wgsl").into()),
        });

        let triangles = wgpu::PrimitiveTopology::TriangleList;
        let points = wgpu::PrimitiveTopology::PointList;
        let lines = wgpu::PrimitiveTopology::LineList;

        Self {
            plain: build_pipeline(
                device, format, "kishar plain", &quad_shader, "fs_plain", triangles, &textured_pl,
            ),
            modulated: build_pipeline(
                device, format, "kishar modulated", &quad_shader, "fs_modulated", triangles,
                &textured_pl,
            ),
            tinted: build_pipeline(
                device, format, "kishar tinted", &quad_shader, "fs_tinted", triangles,
                &textured_pl,
            ),
            repeat: build_pipeline(
                device, format, "kishar repeat", &quad_shader, "fs_repeat", triangles,
                &textured_pl,
            ),
            water: build_pipeline(
                device, format, "kishar water", &water_shader, "fs_main", triangles, &textured_pl,
            ),
            solid_points: build_pipeline(
                device, format, "kishar points", &solid_shader, "fs_main", points, &solid_pl,
            ),
            solid_lines: build_pipeline(
                device, format, "kishar lines", &solid_shader, "fs_main", lines, &solid_pl,
            ),
            solid_triangles: build_pipeline(
                device, format, "kishar solid fill", &solid_shader, "fs_main", triangles,
                &solid_pl,
            ),
            viewport_layout,
            texture_layout,
        }
    }

    /// Pipeline for a batched variant.
    pub(crate) fn for_variant(&self, variant: ShaderVariant) -> &wgpu::RenderPipeline {
        match variant {
            ShaderVariant::Plain => &self.plain,
            ShaderVariant::Modulated => &self.modulated,
            ShaderVariant::Tinted => &self.tinted,
            ShaderVariant::Repeat => &self.repeat,
            ShaderVariant::Water => &self.water,
            ShaderVariant::SolidPoint => &self.solid_points,
        }
    }

    /// Pipeline for unbatched 1px line drawing.
    pub(crate) fn solid_lines(&self) -> &wgpu::RenderPipeline {
        &self.solid_lines
    }

    /// Pipeline for unbatched filled rectangles.
    pub(crate) fn solid_triangles(&self) -> &wgpu::RenderPipeline {
        &self.solid_triangles
    }
}

/// Size of the viewport uniform: target dimensions + padding to 16 bytes.
pub(crate) fn viewport_uniform_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(16).expect("16 is non-zero")
}

fn build_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    label: &str,
    module: &wgpu::ShaderModule,
    fs_entry: &str,
    topology: wgpu::PrimitiveTopology,
    layout: &wgpu::PipelineLayout,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(straight_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

/// Straight-alpha blending; sprite art is authored with unpremultiplied
/// alpha.
fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{ColorRgba, Vec2};

    // ── selection policy ──────────────────────────────────────────────────

    #[test]
    fn default_state_selects_plain() {
        let state = RenderState::default();
        assert_eq!(
            select_variant(&state, DrawOp::TexturedQuad),
            ShaderVariant::Plain
        );
    }

    #[test]
    fn modulation_escalates() {
        let state = RenderState {
            color_modulation: ColorRgba::new(1.0, 0.5, 0.5, 1.0),
            ..Default::default()
        };
        assert_eq!(
            select_variant(&state, DrawOp::TexturedQuad),
            ShaderVariant::Modulated
        );
    }

    #[test]
    fn overlay_escalates_past_modulation() {
        let state = RenderState {
            overlay_color: ColorRgba::new(1.0, 1.0, 1.0, 0.5),
            color_modulation: ColorRgba::new(1.0, 0.5, 0.5, 1.0),
            ..Default::default()
        };
        assert_eq!(
            select_variant(&state, DrawOp::TexturedQuad),
            ShaderVariant::Tinted
        );
    }

    #[test]
    fn repeat_dominates_all_other_state() {
        let state = RenderState {
            texture_repeat: true,
            overlay_color: ColorRgba::WHITE,
            color_modulation: ColorRgba::new(0.0, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        assert_eq!(
            select_variant(&state, DrawOp::TexturedQuad),
            ShaderVariant::Repeat
        );
    }

    #[test]
    fn water_ignores_other_state() {
        let state = RenderState {
            texture_repeat: true,
            overlay_color: ColorRgba::WHITE,
            ..Default::default()
        };
        assert_eq!(select_variant(&state, DrawOp::WaterQuad), ShaderVariant::Water);
    }

    #[test]
    fn points_select_the_solid_variant() {
        let state = RenderState {
            color_modulation: ColorRgba::new(1.0, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        assert_eq!(select_variant(&state, DrawOp::Point), ShaderVariant::SolidPoint);
    }

    // ── determinism ───────────────────────────────────────────────────────

    #[test]
    fn equal_inputs_select_equal_variants() {
        let a = RenderState {
            overlay_color: ColorRgba::new(0.2, 0.3, 0.4, 0.5),
            translation: Vec2::new(3.0, 4.0),
            ..Default::default()
        };
        let b = a;

        assert_eq!(
            select_variant(&a, DrawOp::TexturedQuad),
            select_variant(&b, DrawOp::TexturedQuad)
        );
    }
}
