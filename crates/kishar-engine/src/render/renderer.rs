use std::ops::{Deref, DerefMut, Range};

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::{ColorRgba, Rect, Size, Vec2};
use crate::device::{DeviceContext, DeviceInit};
use crate::image::Image;

use super::batch::{Batch, BatchAccumulator, BatchKey, Vertex, push_quad};
use super::resources::{ResourceTable, TextureHandle};
use super::shader::{DrawOp, Pipelines, ShaderVariant, select_variant, viewport_uniform_size};
use super::state::{RenderState, StateStack};
use super::texcoords::TexCoords;

/// Hardware-accelerated 2D renderer.
///
/// A façade over wgpu providing implicit batching of draw calls, a
/// stack-based render-state model (color effects, transform, clipping,
/// render targets), and handle-based management of GPU-resident images.
///
/// Consecutive draw calls that share the same texture, shader variant, and
/// draw destination are combined into a single vertex buffer range and one
/// GPU draw call. Changing state that affects shading, clipping, or the
/// destination interrupts the current batch. Draw order is always program
/// order — batching never reorders.
///
/// The renderer owns exactly one GPU context for its lifetime and makes no
/// thread-safety claims: create it and call it from a single thread. The
/// only blocking operation is presentation under a vsynced present mode.
pub struct Renderer<'w> {
    device: DeviceContext<'w>,
    pipelines: Pipelines,
    resources: ResourceTable,

    state: RenderState,
    stack: StateStack,
    batch: BatchAccumulator,
    scratch: Vec<Vertex>,

    encoder: wgpu::CommandEncoder,
    frame: Option<ScreenFrame>,
    /// Latched when surface acquisition failed this frame, so a frame's
    /// worth of draw calls produces one skip instead of an acquire storm.
    frame_failed: bool,

    screen_viewport: ScreenViewport,
    vertices: VertexPool,

    warned_water_step: bool,
}

struct ScreenFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

struct ScreenViewport {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Pipeline choice for one recorded render pass.
#[derive(Debug, Copy, Clone)]
enum PassPipeline {
    Variant(ShaderVariant),
    Lines,
    FilledTriangles,
}

impl<'w> Renderer<'w> {
    /// Creates a renderer bound to a window.
    ///
    /// Device acquisition is asynchronous under wgpu; callers typically
    /// wrap this in `pollster::block_on`. Failure is fatal — there is no
    /// renderer without a GPU context.
    pub async fn new(window: &'w Window, init: DeviceInit) -> Result<Self> {
        let device = DeviceContext::new(window, init).await?;

        let pipelines = Pipelines::new(device.device(), device.surface_format());
        let resources = ResourceTable::new(
            pipelines.texture_layout.clone(),
            pipelines.viewport_layout.clone(),
            device.limits().max_texture_dimension_2d,
            device.surface_format(),
        );

        let screen_viewport = ScreenViewport::new(device.device(), &pipelines);
        screen_viewport.write(device.queue(), device.surface_size());

        let encoder = create_encoder(device.device());
        let vertices = VertexPool::new(device.device());

        log::debug!(
            "renderer initialized: surface {}x{}, format {:?}",
            device.surface_size().width,
            device.surface_size().height,
            device.surface_format()
        );

        Ok(Self {
            device,
            pipelines,
            resources,
            state: RenderState::default(),
            stack: StateStack::default(),
            batch: BatchAccumulator::default(),
            scratch: Vec::new(),
            encoder,
            frame: None,
            frame_failed: false,
            screen_viewport,
            vertices,
            warned_water_step: false,
        })
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws (part of) a texture into the given rectangle.
    ///
    /// `source` selects the image region (normalized; build it with
    /// [`TexCoords::from_pixel_rect`]); if `dest` has different dimensions,
    /// the image is scaled. `dest` is modified by the global transform;
    /// texels are modified by the current overlay color and modulation.
    /// When texture repeat is enabled, source coordinates past 1.0 tile the
    /// image. A degenerate `dest` yields a zero-area quad, not an error.
    ///
    /// Batched: consecutive calls with the same texture and unchanged
    /// shading state become a single GPU draw call.
    pub fn draw_texture(&mut self, texture: TextureHandle, source: TexCoords, dest: Rect) {
        let variant = select_variant(&self.state, DrawOp::TexturedQuad);
        let dest = self.state.transform_rect(dest);

        self.scratch.clear();
        push_quad(
            &mut self.scratch,
            dest,
            source,
            self.state.color_modulation.to_array(),
            self.state.overlay_color.to_array(),
        );

        self.append_scratch(BatchKey {
            texture: Some(texture),
            variant,
            target: self.state.target,
        });
    }

    /// Draws a single pixel.
    ///
    /// Batched. The position is modified by the global transform; color
    /// modulation and overlay are ignored.
    pub fn draw_point(&mut self, position: Vec2, color: ColorRgba) {
        // Half-pixel offset lands the vertex on the addressed pixel's
        // center instead of the boundary between pixels.
        let p = self.state.transform_point(position) + Vec2::splat(0.5);

        self.scratch.clear();
        self.scratch.push(Vertex::solid(p, color));

        self.append_scratch(BatchKey {
            texture: None,
            variant: select_variant(&self.state, DrawOp::Point),
            target: self.state.target,
        });
    }

    /// Draws an "under water" distortion of `source` over `area`.
    ///
    /// The area serves as both source and destination: the texture —
    /// typically an unprocessed capture of the scene — is re-rendered in
    /// place with all colors remapped to shades of blue. With an animation
    /// step in `0..=3`, the top rows of the area take one of four wave
    /// patterns; with `None` the whole area is treated uniformly. Steps
    /// above 3 are clamped (and logged once).
    ///
    /// Batched, as long as the same source texture is used.
    pub fn draw_water_effect(
        &mut self,
        area: Rect,
        source: TextureHandle,
        animation_step: Option<u8>,
    ) {
        let Some(texture_size) = self.resources.size_of(source) else {
            // Trigger the stale-handle warning path, then drop the call.
            let _ = self.resources.record(source);
            return;
        };

        let step_code = match animation_step {
            None => 0.0,
            Some(step) => {
                if step > 3 && !self.warned_water_step {
                    log::debug!("water animation step {step} is out of range, clamping to 3");
                    self.warned_water_step = true;
                }
                (step.min(3) + 1) as f32
            }
        };

        // The area doubles as the source rect: the texture is a capture of
        // the scene in the same coordinate space, so each output pixel
        // samples its own (untransformed) position within it.
        let uv = TexCoords::from_pixel_rect(area, texture_size);
        let dest = self.state.transform_rect(area);

        self.scratch.clear();
        push_quad(
            &mut self.scratch,
            dest,
            uv,
            ColorRgba::WHITE.to_array(),
            [step_code, dest.min().y, 0.0, 0.0],
        );

        self.append_scratch(BatchKey {
            texture: Some(source),
            variant: select_variant(&self.state, DrawOp::WaterQuad),
            target: self.state.target,
        });
    }

    /// Draws a 1px line.
    ///
    /// Unbatched — flushes pending work and issues its own draw call; use
    /// sparingly. The endpoints are modified by the global transform; color
    /// modulation and overlay are ignored.
    pub fn draw_line(&mut self, from: Vec2, to: Vec2, color: ColorRgba) {
        self.flush();

        let a = self.state.transform_point(from) + Vec2::splat(0.5);
        let b = self.state.transform_point(to) + Vec2::splat(0.5);

        self.scratch.clear();
        self.scratch.push(Vertex::solid(a, color));
        self.scratch.push(Vertex::solid(b, color));

        self.draw_scratch_immediate(PassPipeline::Lines);
    }

    /// Draws a rectangle outline, 1px wide.
    ///
    /// Unbatched; use sparingly (debug overlays and the like).
    pub fn draw_rectangle(&mut self, rect: Rect, color: ColorRgba) {
        self.flush();

        let r = self.state.transform_rect(rect);
        let tl = r.min() + Vec2::splat(0.5);
        let br = r.max() - Vec2::splat(0.5);
        let tr = Vec2::new(br.x, tl.y);
        let bl = Vec2::new(tl.x, br.y);

        self.scratch.clear();
        for (a, b) in [(tl, tr), (tr, br), (br, bl), (bl, tl)] {
            self.scratch.push(Vertex::solid(a, color));
            self.scratch.push(Vertex::solid(b, color));
        }

        self.draw_scratch_immediate(PassPipeline::Lines);
    }

    /// Draws a filled rectangle.
    ///
    /// Unbatched; use sparingly.
    pub fn draw_filled_rectangle(&mut self, rect: Rect, color: ColorRgba) {
        self.flush();

        let r = self.state.transform_rect(rect);

        self.scratch.clear();
        push_quad(
            &mut self.scratch,
            r,
            TexCoords::FULL,
            color.to_array(),
            [0.0; 4],
        );

        self.draw_scratch_immediate(PassPipeline::FilledTriangles);
    }

    /// Fills the active render target with a solid color.
    ///
    /// Flushes pending batched work first, so the clear lands in submission
    /// order. The fill is uniform — clipping does not apply.
    pub fn clear(&mut self, color: ColorRgba) {
        self.flush();

        let view: &wgpu::TextureView = match self.state.target {
            None => {
                if !self.ensure_frame() {
                    return;
                }
                match self.frame.as_ref() {
                    Some(f) => &f.view,
                    None => return,
                }
            }
            Some(handle) => match self.resources.record(handle) {
                Some(record) => &record.view,
                None => return,
            },
        };

        // A clear is a render pass with no geometry.
        let _pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kishar clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Presents the current frame.
    ///
    /// Flushes pending draw calls, submits all recorded GPU work, and
    /// presents the back buffer. With [`DeviceInit::vsync`] enabled this
    /// synchronizes the calling thread with the display's refresh rate —
    /// the renderer's only blocking operation.
    pub fn swap_buffers(&mut self) {
        self.flush();

        let encoder = std::mem::replace(&mut self.encoder, create_encoder(self.device.device()));
        self.device.queue().submit(std::iter::once(encoder.finish()));

        if let Some(frame) = self.frame.take() {
            drop(frame.view);
            frame.surface_texture.present();
        }

        self.frame_failed = false;
        self.vertices.reset();
    }

    /// Explicitly submits any pending batched draw calls.
    ///
    /// Not needed most of the time — the renderer flushes whenever
    /// necessary. Use it before handing the GPU to independent rendering
    /// code (e.g. an external UI library) that expects a consistent state.
    pub fn submit_batch(&mut self) {
        self.flush();
    }

    // ── resource management ───────────────────────────────────────────────

    /// Uploads an image to the GPU and returns a handle for drawing it.
    ///
    /// The handle stays valid until [`destroy_texture`] is called with it.
    ///
    /// [`destroy_texture`]: Renderer::destroy_texture
    pub fn create_texture(&mut self, image: &Image) -> Result<TextureHandle> {
        self.resources
            .create_texture(self.device.device(), self.device.queue(), image)
    }

    /// Like [`create_texture`], but the resulting texture can also be bound
    /// as a render target via [`set_render_target`].
    ///
    /// [`create_texture`]: Renderer::create_texture
    /// [`set_render_target`]: Renderer::set_render_target
    pub fn create_render_target_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle> {
        self.resources
            .create_render_target(self.device.device(), self.device.queue(), width, height)
    }

    /// Destroys a texture or render target, invalidating the handle.
    ///
    /// If an open batch still references the handle, it is flushed first so
    /// already-issued draw calls complete. The currently-bound render
    /// target must not be destroyed — rebind the screen (or another target)
    /// first.
    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        debug_assert!(
            self.state.target != Some(handle),
            "destroying the active render target"
        );
        if self.state.target == Some(handle) {
            log::error!("destroy_texture called on the active render target {handle:?}");
        }

        if self.batch.references(handle) {
            self.flush();
        }

        self.resources.destroy(handle);
    }

    /// Toggles bilinear filtering for one texture.
    ///
    /// Textures sample nearest-neighbor by default. The change applies to
    /// subsequent draw calls only; an open batch using the texture is
    /// flushed under the old sampling mode.
    pub fn set_filtering_enabled(&mut self, handle: TextureHandle, enabled: bool) {
        if self.batch.references(handle) {
            self.flush();
        }
        self.resources
            .set_filtering(self.device.device(), handle, enabled);
    }

    /// Number of currently-live textures and render targets. Intended for
    /// leak diagnostics.
    pub fn live_texture_count(&self) -> usize {
        self.resources.live_count()
    }

    /// Pixel dimensions of a live texture, or `None` for a stale handle.
    pub fn texture_size(&self, handle: TextureHandle) -> Option<Size> {
        self.resources.size_of(handle)
    }

    // ── state management ──────────────────────────────────────────────────

    /// Snapshots the current render state for later restoration.
    ///
    /// Does not change any state and does not interrupt the current batch.
    /// Every `push_state` must be matched by exactly one [`pop_state`];
    /// prefer [`save_state`], which guarantees the pairing.
    ///
    /// [`pop_state`]: Renderer::pop_state
    /// [`save_state`]: Renderer::save_state
    pub fn push_state(&mut self) {
        self.stack.push(self.state);
    }

    /// Restores the last saved state snapshot.
    ///
    /// Interrupts the current batch only if the restored snapshot actually
    /// differs from the current state in a way the open batch depends on;
    /// restoring an identical state is free.
    ///
    /// # Panics
    /// Panics when called without a matching [`push_state`] — an
    /// unbalanced stack is a bug in calling code, and failing loudly beats
    /// silently handing back stale state.
    ///
    /// [`push_state`]: Renderer::push_state
    pub fn pop_state(&mut self) {
        let restored = self.stack.pop();
        if restored.breaks_batch_with(&self.state) {
            self.flush();
        }
        self.state = restored;
    }

    /// Resets all render state to defaults and clears saved snapshots.
    pub fn reset_state(&mut self) {
        let defaults = RenderState::default();
        if defaults.breaks_batch_with(&self.state) {
            self.flush();
        }
        self.state = defaults;
        self.stack.clear();
    }

    /// Saves the current state and restores it when the guard drops.
    ///
    /// The guard dereferences to the renderer, so drawing continues through
    /// it. This is the recommended way to scope temporary state changes —
    /// the restore happens on every exit path, early returns included.
    ///
    /// ```ignore
    /// let mut r = renderer.save_state();
    /// r.set_color_modulation(red);
    /// r.draw_texture(tex, TexCoords::FULL, dest);
    /// // modulation restored when `r` goes out of scope
    /// ```
    pub fn save_state(&mut self) -> StateSaver<'_, 'w> {
        self.push_state();
        StateSaver { renderer: self }
    }

    /// Sets the color added on top of texture colors.
    ///
    /// The texel's alpha is preserved, so only visible pixels of masked
    /// sprites are affected — useful for damage flashes. Default is
    /// transparent black (no effect). A non-default overlay selects a more
    /// expensive shader.
    pub fn set_overlay_color(&mut self, color: ColorRgba) {
        if color != self.state.overlay_color {
            self.flush();
            self.state.overlay_color = color;
        }
    }

    /// Sets the color texture colors are multiplied by.
    ///
    /// Default is opaque white (multiplication by 1). Useful for coloring
    /// in white UI art or bitmap fonts. A non-default modulation selects a
    /// more expensive shader.
    pub fn set_color_modulation(&mut self, color: ColorRgba) {
        if color != self.state.color_modulation {
            self.flush();
            self.state.color_modulation = color;
        }
    }

    /// Enables tiling for texture coordinates outside [0, 1].
    ///
    /// Wrapping is done in the shader rather than via hardware address
    /// modes, so non-power-of-two images tile on every backend. Enabling
    /// repeat selects a more expensive shader.
    pub fn set_texture_repeat_enabled(&mut self, enabled: bool) {
        if enabled != self.state.texture_repeat {
            self.flush();
            self.state.texture_repeat = enabled;
        }
    }

    /// Sets the offset added to all coordinates, after scaling.
    ///
    /// Lets client code render in a local coordinate system — e.g. a UI
    /// drawn at (0,0) placed anywhere on screen. Applied CPU-side per
    /// vertex, so changing it does not interrupt the current batch.
    pub fn set_global_translation(&mut self, translation: Vec2) {
        self.state.translation = translation;
    }

    /// Sets the scale factor applied to all coordinates, before
    /// translation.
    ///
    /// Together with the translation this upscales fixed-resolution content
    /// to native size without the client code being aware. Applied CPU-side
    /// per vertex, so changing it does not interrupt the current batch.
    pub fn set_global_scale(&mut self, scale: Vec2) {
        self.state.scale = scale;
    }

    /// Restricts drawing to a rectangle; `None` disables clipping.
    ///
    /// Only pixels inside the rectangle are touched by draw calls. The
    /// rectangle is in target pixels and is not transformed.
    pub fn set_clip_rect(&mut self, clip: Option<Rect>) {
        if clip != self.state.clip_rect {
            self.flush();
            self.state.clip_rect = clip;
        }
    }

    /// Binds a render target, or the screen when `None`.
    ///
    /// The handle must come from [`create_render_target_texture`].
    /// Subsequent draw calls render into the bound texture instead of the
    /// back buffer. Pending batched work is flushed to the previous
    /// destination first.
    ///
    /// [`create_render_target_texture`]: Renderer::create_render_target_texture
    pub fn set_render_target(&mut self, target: Option<TextureHandle>) {
        if target == self.state.target {
            return;
        }

        if let Some(handle) = target {
            let is_target = self
                .resources
                .peek(handle)
                .is_some_and(|r| r.target.is_some());
            if !is_target {
                log::error!(
                    "set_render_target: {handle:?} is not a live render target; keeping the \
                     current destination"
                );
                return;
            }
        }

        self.flush();
        self.state.target = target;
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// Pixel dimensions of the current draw destination.
    pub fn current_render_target_size(&self) -> Size {
        match self.state.target {
            None => self.device.surface_size(),
            Some(handle) => self
                .resources
                .size_of(handle)
                .unwrap_or_else(|| self.device.surface_size()),
        }
    }

    /// Pixel dimensions of the window's drawable area.
    pub fn window_size(&self) -> Size {
        self.device.surface_size()
    }

    pub fn global_translation(&self) -> Vec2 {
        self.state.translation
    }

    pub fn global_scale(&self) -> Vec2 {
        self.state.scale
    }

    pub fn clip_rect(&self) -> Option<Rect> {
        self.state.clip_rect
    }

    /// The bound render target; `None` means the screen.
    pub fn render_target(&self) -> Option<TextureHandle> {
        self.state.target
    }

    /// Reconfigures the surface after a window resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.device.resize(new_size);
        self.screen_viewport
            .write(self.device.queue(), self.device.surface_size());
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Appends the scratch vertices under `key`, submitting whatever batch
    /// the append closed.
    fn append_scratch(&mut self, key: BatchKey) {
        let finished = self
            .batch
            .append(key, self.state.clip_rect, &self.scratch);

        if let Some(batch) = finished {
            self.record_batch(batch);
        }
    }

    /// Submits the open batch, if any.
    fn flush(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.record_batch(batch);
        }
    }

    fn record_batch(&mut self, batch: Batch) {
        self.record_pass(
            PassPipeline::Variant(batch.key.variant),
            batch.key.texture,
            batch.key.target,
            batch.clip_rect,
            &batch.vertices,
        );
    }

    /// Issues the scratch vertices as one immediate (unbatched) draw.
    fn draw_scratch_immediate(&mut self, pipeline: PassPipeline) {
        let vertices = std::mem::take(&mut self.scratch);
        self.record_pass(
            pipeline,
            None,
            self.state.target,
            self.state.clip_rect,
            &vertices,
        );
        self.scratch = vertices;
    }

    /// Records one render pass drawing `vertices` with `pipeline`.
    ///
    /// This is the single point where CPU-side draw data becomes GPU work.
    /// Mutating steps (frame acquisition, stale-handle bookkeeping, vertex
    /// upload) happen before the immutable borrows the pass encoder needs.
    fn record_pass(
        &mut self,
        pipeline: PassPipeline,
        texture: Option<TextureHandle>,
        target: Option<TextureHandle>,
        clip: Option<Rect>,
        vertices: &[Vertex],
    ) {
        if vertices.is_empty() {
            return;
        }

        // Sampling the texture currently being drawn into is a feedback
        // loop the GPU cannot express.
        if texture.is_some() && texture == target {
            log::warn!("draw call samples its own render target; dropped");
            return;
        }

        let target_size = match target {
            None => {
                if !self.ensure_frame() {
                    return;
                }
                self.device.surface_size()
            }
            Some(handle) => {
                let valid = self
                    .resources
                    .record(handle)
                    .is_some_and(|r| r.target.is_some());
                if !valid {
                    log::warn!("dropping draw to invalid render target {handle:?}");
                    return;
                }
                match self.resources.size_of(handle) {
                    Some(size) => size,
                    None => return,
                }
            }
        };

        let Some((sx, sy, sw, sh)) = clip_to_scissor(clip, target_size) else {
            // Zero-area clip: nothing can be drawn.
            return;
        };

        if let Some(handle) = texture {
            if self.resources.record(handle).is_none() {
                return;
            }
        }

        let range = self.vertices.upload(
            self.device.device(),
            self.device.queue(),
            bytemuck::cast_slice(vertices),
        );

        // Immutable borrows only from here on.
        let texture_bind_group = match texture {
            Some(handle) => match self.resources.peek(handle) {
                Some(record) => Some(&record.bind_group),
                None => return,
            },
            None => None,
        };

        let (view, viewport_bind_group) = match target {
            None => {
                let Some(frame) = self.frame.as_ref() else {
                    return;
                };
                (&frame.view, &self.screen_viewport.bind_group)
            }
            Some(handle) => {
                let Some(record) = self.resources.peek(handle) else {
                    return;
                };
                let Some(target_data) = record.target.as_ref() else {
                    return;
                };
                (&record.view, &target_data.viewport_bind_group)
            }
        };

        let render_pipeline = match pipeline {
            PassPipeline::Variant(variant) => self.pipelines.for_variant(variant),
            PassPipeline::Lines => self.pipelines.solid_lines(),
            PassPipeline::FilledTriangles => self.pipelines.solid_triangles(),
        };

        let mut rpass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kishar draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(render_pipeline);
        rpass.set_bind_group(0, viewport_bind_group, &[]);
        if let Some(bind_group) = texture_bind_group {
            rpass.set_bind_group(1, bind_group, &[]);
        }
        rpass.set_scissor_rect(sx, sy, sw, sh);
        rpass.set_vertex_buffer(0, self.vertices.buffer().slice(range));
        rpass.draw(0..vertices.len() as u32, 0..1);
    }

    /// Acquires the surface texture for this frame, once.
    fn ensure_frame(&mut self) -> bool {
        if self.frame.is_some() {
            return true;
        }
        if self.frame_failed {
            return false;
        }

        match self.device.acquire_frame() {
            Some(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(ScreenFrame {
                    surface_texture,
                    view,
                });
                true
            }
            None => {
                self.frame_failed = true;
                false
            }
        }
    }
}

/// Scope guard returned by [`Renderer::save_state`].
///
/// Dereferences to the renderer; restores the saved state snapshot when
/// dropped, on every exit path.
pub struct StateSaver<'a, 'w> {
    renderer: &'a mut Renderer<'w>,
}

impl<'w> Deref for StateSaver<'_, 'w> {
    type Target = Renderer<'w>;

    fn deref(&self) -> &Self::Target {
        self.renderer
    }
}

impl<'w> DerefMut for StateSaver<'_, 'w> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.renderer
    }
}

impl Drop for StateSaver<'_, '_> {
    fn drop(&mut self) {
        self.renderer.pop_state();
    }
}

impl ScreenViewport {
    fn new(device: &wgpu::Device, pipelines: &Pipelines) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kishar screen viewport ubo"),
            size: viewport_uniform_size().get(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kishar screen viewport bind group"),
            layout: &pipelines.viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, size: Size) {
        let uniform: [f32; 4] = [size.width.max(1) as f32, size.height.max(1) as f32, 0.0, 0.0];
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&uniform));
    }
}

/// Growable vertex storage shared by all draw calls of a frame.
///
/// Each pass reads its own byte range, so many flushes can share one
/// buffer and one submission. Growing mid-frame allocates a replacement;
/// passes already recorded keep the old buffer alive until submit.
struct VertexPool {
    buffer: wgpu::Buffer,
    capacity: u64,
    cursor: u64,
}

const VERTEX_POOL_MIN_BYTES: u64 = 64 * 1024;

impl VertexPool {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: create_vertex_buffer(device, VERTEX_POOL_MIN_BYTES),
            capacity: VERTEX_POOL_MIN_BYTES,
            cursor: 0,
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) -> Range<u64> {
        let len = bytes.len() as u64;

        if self.cursor + len > self.capacity {
            let capacity = len.next_power_of_two().max(VERTEX_POOL_MIN_BYTES);
            self.buffer = create_vertex_buffer(device, capacity);
            self.capacity = capacity;
            self.cursor = 0;
        }

        queue.write_buffer(&self.buffer, self.cursor, bytes);

        let range = self.cursor..self.cursor + len;
        self.cursor = range.end;
        range
    }

    fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Rewinds after the frame's writes have been submitted.
    fn reset(&mut self) {
        self.cursor = 0;
    }
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("kishar vertex pool"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("kishar frame encoder"),
    })
}

/// Converts a clip rect into scissor arguments, clamped to the target.
///
/// `None` clip means no restriction and yields the full target rect.
/// Returns `None` when the clip has zero area within the target, in which
/// case the draw should be skipped entirely.
fn clip_to_scissor(clip: Option<Rect>, target: Size) -> Option<(u32, u32, u32, u32)> {
    let tw = target.width.max(1);
    let th = target.height.max(1);

    let (x, y, w, h) = match clip {
        None => (0, 0, tw, th),
        Some(r) => {
            let r = r.normalized();
            let x = (r.x.max(0.0) as u32).min(tw);
            let y = (r.y.max(0.0) as u32).min(th);
            let x2 = ((r.x + r.w).max(0.0) as u32).min(tw);
            let y2 = ((r.y + r.h).max(0.0) as u32).min(th);
            (x, y, x2.saturating_sub(x), y2.saturating_sub(y))
        }
    };

    if w == 0 || h == 0 { None } else { Some((x, y, w, h)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── scissor conversion ────────────────────────────────────────────────

    #[test]
    fn no_clip_covers_full_target() {
        assert_eq!(
            clip_to_scissor(None, Size::new(320, 200)),
            Some((0, 0, 320, 200))
        );
    }

    #[test]
    fn clip_is_clamped_to_target() {
        let clip = Some(Rect::new(-10.0, 150.0, 400.0, 100.0));
        assert_eq!(
            clip_to_scissor(clip, Size::new(320, 200)),
            Some((0, 150, 320, 50))
        );
    }

    #[test]
    fn clip_outside_target_yields_none() {
        let clip = Some(Rect::new(400.0, 0.0, 50.0, 50.0));
        assert_eq!(clip_to_scissor(clip, Size::new(320, 200)), None);
    }

    #[test]
    fn zero_area_clip_yields_none() {
        let clip = Some(Rect::new(10.0, 10.0, 0.0, 5.0));
        assert_eq!(clip_to_scissor(clip, Size::new(320, 200)), None);
    }
}
