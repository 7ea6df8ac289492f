use anyhow::Result;

use crate::coords::Size;
use crate::image::Image;

use super::arena::Arena;
use super::shader::viewport_uniform_size;

/// Opaque identifier for a GPU-resident image.
///
/// Handles are unique among currently-live textures; an index is reused
/// only after the texture holding it has been destroyed, and never while
/// both could be alive. Using a handle after `destroy_texture` is a caller
/// error — the engine detects stale handles on a best-effort basis, logs,
/// and skips the draw, but correctness of the output is not guaranteed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(u32);

impl TextureHandle {
    #[inline]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// One GPU texture plus everything needed to sample or draw into it.
///
/// The bind group holds the underlying wgpu texture and sampler alive;
/// dropping the record releases the GPU memory once no recorded frame work
/// references it anymore.
pub(crate) struct TextureRecord {
    pub view: wgpu::TextureView,
    /// Texture + sampler, bound at group 1 by the textured pipelines.
    pub bind_group: wgpu::BindGroup,
    pub size: Size,
    pub filtering: bool,
    /// Present only for render targets: the viewport uniform the vertex
    /// shader uses when this texture is the draw destination.
    pub target: Option<TargetData>,
}

pub(crate) struct TargetData {
    pub viewport_bind_group: wgpu::BindGroup,
}

/// Owns the handle → GPU image mapping.
///
/// Callers only ever hold opaque handles; all wgpu objects live here. GPU
/// memory is released when a record is removed — wgpu keeps the underlying
/// resources alive until any already-recorded frame work that references
/// them has been submitted.
pub(crate) struct ResourceTable {
    records: Arena<TextureRecord>,
    texture_layout: wgpu::BindGroupLayout,
    viewport_layout: wgpu::BindGroupLayout,
    max_dimension: u32,
    format: wgpu::TextureFormat,
    warned_stale: bool,
}

impl ResourceTable {
    pub(crate) fn new(
        texture_layout: wgpu::BindGroupLayout,
        viewport_layout: wgpu::BindGroupLayout,
        max_dimension: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            records: Arena::new(),
            texture_layout,
            viewport_layout,
            max_dimension,
            format,
            warned_stale: false,
        }
    }

    /// Uploads an image and returns a handle for drawing it.
    pub(crate) fn create_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &Image,
    ) -> Result<TextureHandle> {
        let size = image.size();
        self.validate_dimensions(size)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("kishar texture"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
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
            image.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(self.finish_record(device, texture, size, None))
    }

    /// Allocates an empty image that can be both drawn into and sampled.
    pub(crate) fn create_render_target(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
    ) -> Result<TextureHandle> {
        let size = Size::new(width, height);
        self.validate_dimensions(size)?;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("kishar render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // Same format as the surface, so the one pipeline set covers
            // both on- and off-screen rendering.
            format: self.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let viewport_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kishar target viewport ubo"),
            size: viewport_uniform_size().get(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Target dimensions never change, so this is written exactly once.
        let uniform: [f32; 4] = [width as f32, height as f32, 0.0, 0.0];
        queue.write_buffer(&viewport_buffer, 0, bytemuck::cast_slice(&uniform));

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kishar target viewport bind group"),
            layout: &self.viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
        });

        let target = TargetData {
            viewport_bind_group,
        };

        Ok(self.finish_record(device, texture, size, Some(target)))
    }

    /// Releases a texture or render target.
    ///
    /// The handle is invalid afterwards. Destroying the currently-bound
    /// render target is a precondition violation handled by the façade.
    pub(crate) fn destroy(&mut self, handle: TextureHandle) {
        if self.records.remove(handle.raw()).is_none() {
            log::warn!("destroy_texture: handle {:?} is not live", handle);
        }
    }

    /// Toggles nearest/bilinear sampling for one texture.
    pub(crate) fn set_filtering(
        &mut self,
        device: &wgpu::Device,
        handle: TextureHandle,
        enabled: bool,
    ) {
        let layout = self.texture_layout.clone();
        let Some(record) = self.records.get_mut(handle.raw()) else {
            log::warn!("set_filtering_enabled: handle {:?} is not live", handle);
            return;
        };

        if record.filtering == enabled {
            return;
        }

        let sampler = create_sampler(device, enabled);
        record.bind_group = create_texture_bind_group(device, &layout, &record.view, &sampler);
        record.filtering = enabled;
    }

    /// Resolves a handle, logging (once) when it is stale.
    pub(crate) fn record(&mut self, handle: TextureHandle) -> Option<&TextureRecord> {
        if self.records.get(handle.raw()).is_none() {
            if !self.warned_stale {
                log::warn!(
                    "draw with stale texture handle {:?}; the draw is skipped. \
                     This indicates a use-after-destroy in calling code.",
                    handle
                );
                self.warned_stale = true;
            }
            return None;
        }
        self.records.get(handle.raw())
    }

    /// Resolves a handle without the staleness warning.
    ///
    /// For re-resolving a handle [`record`] already vetted, in contexts
    /// that only have `&self`.
    ///
    /// [`record`]: ResourceTable::record
    pub(crate) fn peek(&self, handle: TextureHandle) -> Option<&TextureRecord> {
        self.records.get(handle.raw())
    }

    pub(crate) fn size_of(&self, handle: TextureHandle) -> Option<Size> {
        self.records.get(handle.raw()).map(|r| r.size)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.records.len()
    }

    fn validate_dimensions(&self, size: Size) -> Result<()> {
        anyhow::ensure!(
            !size.is_empty(),
            "texture dimensions must be non-zero, got {}x{}",
            size.width,
            size.height
        );
        anyhow::ensure!(
            size.width <= self.max_dimension && size.height <= self.max_dimension,
            "texture {}x{} exceeds the device limit of {}",
            size.width,
            size.height,
            self.max_dimension
        );
        Ok(())
    }

    fn finish_record(
        &mut self,
        device: &wgpu::Device,
        texture: wgpu::Texture,
        size: Size,
        target: Option<TargetData>,
    ) -> TextureHandle {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // New textures sample nearest; pixel art looks wrong under bilinear
        // unless a caller opts in via set_filtering_enabled.
        let sampler = create_sampler(device, false);
        let bind_group = create_texture_bind_group(device, &self.texture_layout, &view, &sampler);

        let raw = self.records.insert(TextureRecord {
            view,
            bind_group,
            size,
            filtering: false,
            target,
        });

        TextureHandle::from_raw(raw)
    }
}

fn create_sampler(device: &wgpu::Device, filtering: bool) -> wgpu::Sampler {
    let filter = if filtering {
        wgpu::FilterMode::Linear
    } else {
        wgpu::FilterMode::Nearest
    };

    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("kishar sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kishar texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
