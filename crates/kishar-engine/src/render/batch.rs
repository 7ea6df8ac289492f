use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Rect, Vec2};

use super::resources::TextureHandle;
use super::shader::ShaderVariant;
use super::texcoords::TexCoords;

/// One vertex as it goes to the GPU.
///
/// `position` is in target pixels with the global transform already applied.
/// The two color slots carry per-draw parameters so that draws whose shader
/// variant matches can share a vertex buffer: for textured quads `color0` is
/// the modulation and `color1` the overlay; for solid primitives `color0` is
/// the primitive color; for the water variant `color1.x` encodes the wave
/// pattern (0 = uniform, n = pattern n-1) and `color1.y` the area's top edge
/// in target pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color0: [f32; 4],
    pub color1: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // tex_coords
        2 => Float32x4, // color0
        3 => Float32x4  // color1
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    pub(crate) fn solid(position: Vec2, color: ColorRgba) -> Self {
        Self {
            position: [position.x, position.y],
            tex_coords: [0.0, 0.0],
            color0: color.to_array(),
            color1: [0.0; 4],
        }
    }
}

/// Identity of a batch. Two draw calls can share a GPU submission only
/// while this whole key stays equal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BatchKey {
    /// Texture sampled by the draw; `None` for untextured point batches.
    pub texture: Option<TextureHandle>,
    pub variant: ShaderVariant,
    /// Draw destination; `None` = the back buffer.
    pub target: Option<TextureHandle>,
}

/// A closed run of vertices destined for a single GPU draw call.
#[derive(Debug)]
pub(crate) struct Batch {
    pub key: BatchKey,
    /// Scissor rect captured when the batch was opened. Setter-level
    /// flushing guarantees every vertex in the batch was appended under it.
    pub clip_rect: Option<Rect>,
    pub vertices: Vec<Vertex>,
}

/// Buffers vertices for consecutive draw calls that share a batch key.
///
/// Batching is purely sequential and local: no look-ahead and no reordering.
/// Reordering would change paint order, which visibly alters output for
/// overlapping alpha-blended sprites — draw order is program order, always.
#[derive(Debug, Default)]
pub(crate) struct BatchAccumulator {
    open: Option<Batch>,
}

impl BatchAccumulator {
    /// Appends vertices under `key`.
    ///
    /// If a batch with a different key is open, it is closed and returned;
    /// the caller must submit it before anything else reaches the GPU.
    #[must_use]
    pub(crate) fn append(
        &mut self,
        key: BatchKey,
        clip_rect: Option<Rect>,
        vertices: &[Vertex],
    ) -> Option<Batch> {
        let finished = match &self.open {
            Some(batch) if batch.key == key => None,
            _ => self.open.take(),
        };

        self.open
            .get_or_insert_with(|| Batch {
                key,
                clip_rect,
                vertices: Vec::new(),
            })
            .vertices
            .extend_from_slice(vertices);

        finished
    }

    /// Closes and returns the open batch, if any. Taking from an empty
    /// accumulator is a no-op.
    pub(crate) fn take(&mut self) -> Option<Batch> {
        self.open.take()
    }

    /// True if the open batch samples from or draws into `handle`.
    pub(crate) fn references(&self, handle: TextureHandle) -> bool {
        self.open.as_ref().is_some_and(|b| {
            b.key.texture == Some(handle) || b.key.target == Some(handle)
        })
    }
}

/// Appends the six vertices of a quad (two CCW triangles).
///
/// `dest` must already be transform-applied. A degenerate (zero-area) dest
/// produces a zero-area quad, which the GPU rasterizes to nothing.
pub(crate) fn push_quad(
    vertices: &mut Vec<Vertex>,
    dest: Rect,
    uv: TexCoords,
    color0: [f32; 4],
    color1: [f32; 4],
) {
    let min = dest.min();
    let max = dest.max();

    let v = |x: f32, y: f32, u: f32, t: f32| Vertex {
        position: [x, y],
        tex_coords: [u, t],
        color0,
        color1,
    };

    let tl = v(min.x, min.y, uv.left, uv.top);
    let tr = v(max.x, min.y, uv.right, uv.top);
    let br = v(max.x, max.y, uv.right, uv.bottom);
    let bl = v(min.x, max.y, uv.left, uv.bottom);

    vertices.extend_from_slice(&[tl, tr, br, tl, br, bl]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u32) -> TextureHandle {
        TextureHandle::from_raw(raw)
    }

    fn key(texture_raw: u32) -> BatchKey {
        BatchKey {
            texture: Some(handle(texture_raw)),
            variant: ShaderVariant::Plain,
            target: None,
        }
    }

    fn quad_vertices() -> Vec<Vertex> {
        let mut v = Vec::new();
        push_quad(
            &mut v,
            Rect::new(0.0, 0.0, 8.0, 8.0),
            TexCoords::FULL,
            ColorRgba::WHITE.to_array(),
            [0.0; 4],
        );
        v
    }

    // ── coalescing ────────────────────────────────────────────────────────

    #[test]
    fn same_key_extends_open_batch() {
        let mut acc = BatchAccumulator::default();
        let verts = quad_vertices();

        for _ in 0..4 {
            assert!(acc.append(key(1), None, &verts).is_none());
        }

        let batch = acc.take().unwrap();
        assert_eq!(batch.vertices.len(), 24);
        assert!(acc.take().is_none());
    }

    #[test]
    fn different_texture_closes_batch() {
        let mut acc = BatchAccumulator::default();
        let verts = quad_vertices();

        assert!(acc.append(key(1), None, &verts).is_none());
        let first = acc.append(key(2), None, &verts);

        // Exactly two submissions: the closed one plus the one still open.
        assert!(first.is_some());
        assert_eq!(first.unwrap().key, key(1));
        assert!(acc.take().is_some());
    }

    #[test]
    fn different_variant_closes_batch() {
        let mut acc = BatchAccumulator::default();
        let verts = quad_vertices();

        assert!(acc.append(key(1), None, &verts).is_none());

        let repeat_key = BatchKey {
            variant: ShaderVariant::Repeat,
            ..key(1)
        };
        assert!(acc.append(repeat_key, None, &verts).is_some());
    }

    #[test]
    fn different_target_closes_batch() {
        let mut acc = BatchAccumulator::default();
        let verts = quad_vertices();

        assert!(acc.append(key(1), None, &verts).is_none());

        let offscreen = BatchKey {
            target: Some(handle(9)),
            ..key(1)
        };
        assert!(acc.append(offscreen, None, &verts).is_some());
    }

    // ── take ──────────────────────────────────────────────────────────────

    #[test]
    fn take_on_empty_is_noop() {
        let mut acc = BatchAccumulator::default();
        assert!(acc.take().is_none());
    }

    #[test]
    fn references_tracks_texture_and_target() {
        let mut acc = BatchAccumulator::default();
        assert!(!acc.references(handle(1)));

        let offscreen = BatchKey {
            target: Some(handle(9)),
            ..key(1)
        };
        assert!(acc.append(offscreen, None, &quad_vertices()).is_none());

        assert!(acc.references(handle(1)));
        assert!(acc.references(handle(9)));
        assert!(!acc.references(handle(2)));
    }

    #[test]
    fn clip_is_captured_at_open() {
        let mut acc = BatchAccumulator::default();
        let clip = Some(Rect::new(0.0, 0.0, 4.0, 4.0));

        assert!(acc.append(key(1), clip, &quad_vertices()).is_none());
        assert_eq!(acc.take().unwrap().clip_rect, clip);
    }

    // ── quad emission ─────────────────────────────────────────────────────

    #[test]
    fn push_quad_emits_two_triangles() {
        let verts = quad_vertices();
        assert_eq!(verts.len(), 6);

        // Both triangles share the top-left corner.
        assert_eq!(verts[0], verts[3]);
        // And the bottom-right corner.
        assert_eq!(verts[2], verts[4]);
    }

    #[test]
    fn degenerate_quad_is_zero_area_not_a_crash() {
        let mut v = Vec::new();
        push_quad(
            &mut v,
            Rect::new(5.0, 5.0, 0.0, 0.0),
            TexCoords::FULL,
            [1.0; 4],
            [0.0; 4],
        );
        assert_eq!(v.len(), 6);
        assert!(v.iter().all(|vert| vert.position == [5.0, 5.0]));
    }
}
