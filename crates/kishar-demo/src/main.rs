//! Demo scene for the kishar engine.
//!
//! Renders a small side-scroller-style composition at a fixed 320x200
//! internal resolution, upscaled to the window: a tiled scrolling backdrop,
//! a tile floor, modulated and overlay-flashed sprites, a water strip with
//! animated surface waves, and a few immediate-mode debug primitives.

use anyhow::Result;
use winit::event::WindowEvent;
use winit::keyboard::{Key, NamedKey};

use kishar_engine::coords::{ColorRgba, Rect, Size, Vec2};
use kishar_engine::device::DeviceInit;
use kishar_engine::image::Image;
use kishar_engine::logging::{LoggingConfig, init_logging};
use kishar_engine::render::{RenderTargetTexture, Renderer, TexCoords, Texture};
use kishar_engine::window::{App, AppControl, Runtime, RuntimeConfig};

// Internal resolution, upscaled to the window each frame.
const VIEW_W: u32 = 320;
const VIEW_H: u32 = 200;

const TILE: u32 = 16;
const WATER_TOP: f32 = 168.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "kishar demo".to_string(),
            ..Default::default()
        },
        DeviceInit::default(),
        DemoApp::default(),
    )
}

#[derive(Default)]
struct DemoApp {
    scene: Option<Scene>,
    time: f32,
}

struct Scene {
    atlas: Texture,
    backdrop: Texture,
    view: RenderTargetTexture,
}

impl Scene {
    fn create(renderer: &mut Renderer<'_>) -> Result<Self> {
        let atlas = Texture::new(renderer, &build_atlas())?;
        let backdrop = Texture::new(renderer, &build_backdrop())?;
        let view = RenderTargetTexture::new(renderer, VIEW_W, VIEW_H)?;

        log::info!(
            "demo assets created ({} textures live)",
            renderer.live_texture_count()
        );

        Ok(Self {
            atlas,
            backdrop,
            view,
        })
    }
}

impl App for DemoApp {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.logical_key == Key::Named(NamedKey::Escape) {
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, renderer: &mut Renderer<'_>, dt: f32) -> AppControl {
        self.time += dt;

        if self.scene.is_none() {
            match Scene::create(renderer) {
                Ok(s) => self.scene = Some(s),
                Err(e) => {
                    log::error!("failed to create demo assets: {e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(scene) = self.scene.as_ref() else {
            return AppControl::Exit;
        };

        draw_view(renderer, scene, self.time);
        composite_to_screen(renderer, scene, self.time);

        renderer.swap_buffers();
        AppControl::Continue
    }

    fn on_exit(&mut self, renderer: &mut Renderer<'_>) {
        if let Some(scene) = self.scene.take() {
            scene.atlas.destroy(renderer);
            scene.backdrop.destroy(renderer);
            renderer.set_render_target(None);
            scene.view.destroy(renderer);
        }
        log::info!(
            "demo shut down ({} textures live)",
            renderer.live_texture_count()
        );
    }
}

/// Renders the 320x200 scene into the off-screen view target.
fn draw_view(renderer: &mut Renderer<'_>, scene: &Scene, time: f32) {
    let mut r = renderer.save_state();
    r.set_render_target(Some(scene.view.handle()));
    r.set_global_scale(Vec2::splat(1.0));
    r.set_global_translation(Vec2::zero());

    r.clear(ColorRgba::from_rgba8(12, 10, 40, 255));

    draw_backdrop(&mut r, scene, time);
    draw_floor(&mut r, scene);
    draw_sprites(&mut r, scene, time);
    draw_sparkles(&mut r, time);
}

/// Scrolling, horizontally-tiled backdrop via texture repeat.
fn draw_backdrop(r: &mut Renderer<'_>, scene: &Scene, time: f32) {
    let scroll = (time * 12.0) / scene.backdrop.width() as f32;

    let mut r = r.save_state();
    r.set_texture_repeat_enabled(true);

    // Source coords wider than the image request tiling; the offset pans.
    let coords = TexCoords::new(
        scroll,
        0.0,
        scroll + VIEW_W as f32 / scene.backdrop.width() as f32,
        VIEW_H as f32 / scene.backdrop.height() as f32,
    );
    r.draw_texture(
        scene.backdrop.handle(),
        coords,
        Rect::new(0.0, 0.0, VIEW_W as f32, VIEW_H as f32),
    );
}

fn draw_floor(r: &mut Renderer<'_>, scene: &Scene) {
    let row = (WATER_TOP / TILE as f32) as u32 + 1;
    for y in row..(VIEW_H / TILE) {
        for x in 0..(VIEW_W / TILE) {
            let tile = if y == row { TILE_GRASS } else { TILE_BRICK };
            scene.atlas.draw_sub(
                r,
                atlas_tile(tile),
                Rect::new((x * TILE) as f32, (y * TILE) as f32, TILE as f32, TILE as f32),
            );
        }
    }
}

fn draw_sprites(r: &mut Renderer<'_>, scene: &Scene, time: f32) {
    // A row of "enemies", colored in via modulation.
    let tints = [
        ColorRgba::new(1.0, 0.4, 0.4, 1.0),
        ColorRgba::new(0.4, 1.0, 0.4, 1.0),
        ColorRgba::new(0.5, 0.6, 1.0, 1.0),
    ];

    for (i, tint) in tints.iter().enumerate() {
        let bob = (time * 2.0 + i as f32).sin() * 6.0;
        let dest = Rect::new(60.0 + i as f32 * 70.0, 120.0 + bob, 24.0, 24.0);

        let mut r = r.save_state();
        r.set_color_modulation(*tint);
        scene.atlas.draw_sub(&mut r, atlas_tile(TILE_ORB), dest);
    }

    // The "player", flashing white on a cycle — the damage-flash idiom.
    let flash = ((time * 3.0).fract() < 0.15) as u8 as f32;
    let mut r = r.save_state();
    r.set_overlay_color(ColorRgba::new(1.0, 1.0, 1.0, flash));
    scene
        .atlas
        .draw_sub(&mut r, atlas_tile(TILE_SHIP), Rect::new(36.0, 90.0, 32.0, 32.0));
}

fn draw_sparkles(r: &mut Renderer<'_>, time: f32) {
    for i in 0..24 {
        let phase = i as f32 * 0.7853;
        let x = (i as f32 * 41.0 + time * 9.0) % VIEW_W as f32;
        let y = 12.0 + ((time * 1.3 + phase).sin() * 0.5 + 0.5) * 70.0;
        let brightness = 0.5 + 0.5 * (time * 5.0 + phase).cos();

        r.draw_point(
            Vec2::new(x.floor(), y.floor()),
            ColorRgba::new(brightness, brightness, 1.0, 1.0),
        );
    }
}

/// Upscales the view to the window and layers screen-space effects on top.
fn composite_to_screen(renderer: &mut Renderer<'_>, scene: &Scene, time: f32) {
    let window = renderer.window_size();
    let (scale, offset) = fit_view(window);

    renderer.clear(ColorRgba::BLACK);

    renderer.set_global_scale(Vec2::splat(scale));
    renderer.set_global_translation(offset);

    // The whole scene, one upscaled quad.
    scene
        .view
        .draw_scaled(renderer, Rect::new(0.0, 0.0, VIEW_W as f32, VIEW_H as f32));

    // Water over the bottom strip, fed by the unprocessed scene capture.
    // Mostly cycles the four wave patterns; every few seconds it switches
    // to the uniform (no-step) treatment for comparison.
    let step = if time % 8.0 < 6.0 {
        Some(((time * 6.0) as u32 % 4) as u8)
    } else {
        None
    };
    renderer.draw_water_effect(
        Rect::new(0.0, WATER_TOP, VIEW_W as f32, VIEW_H as f32 - WATER_TOP),
        scene.view.handle(),
        step,
    );

    // Minimap: the same capture, clipped and shrunk into a corner box.
    let minimap = Rect::new(248.0, 8.0, 64.0, 40.0);
    renderer.set_clip_rect(Some(Rect::new(
        minimap.x * scale + offset.x,
        minimap.y * scale + offset.y,
        minimap.w * scale,
        minimap.h * scale,
    )));
    scene.view.draw_scaled(renderer, minimap);
    renderer.set_clip_rect(None);
    renderer.draw_rectangle(minimap, ColorRgba::WHITE);

    // Debug primitives: a health bar and the water line.
    renderer.draw_filled_rectangle(
        Rect::new(8.0, 8.0, 60.0, 6.0),
        ColorRgba::new(0.8, 0.1, 0.1, 1.0),
    );
    renderer.draw_rectangle(Rect::new(7.0, 7.0, 62.0, 8.0), ColorRgba::WHITE);
    renderer.draw_line(
        Vec2::new(0.0, WATER_TOP),
        Vec2::new(VIEW_W as f32, WATER_TOP),
        ColorRgba::new(0.3, 0.8, 1.0, 1.0),
    );

    renderer.reset_state();
}

/// Integer-ish upscale preserving the 320x200 aspect, centered.
fn fit_view(window: Size) -> (f32, Vec2) {
    let sx = window.width as f32 / VIEW_W as f32;
    let sy = window.height as f32 / VIEW_H as f32;
    let scale = sx.min(sy).max(1.0);

    let offset = Vec2::new(
        (window.width as f32 - VIEW_W as f32 * scale) / 2.0,
        (window.height as f32 - VIEW_H as f32 * scale) / 2.0,
    );
    (scale, offset)
}

// ── procedural art ────────────────────────────────────────────────────────

const TILE_BRICK: u32 = 0;
const TILE_GRASS: u32 = 1;
const TILE_ORB: u32 = 2;
const TILE_SHIP: u32 = 3;

fn atlas_tile(index: u32) -> Rect {
    Rect::new((index * TILE) as f32, 0.0, TILE as f32, TILE as f32)
}

/// 64x16 atlas with four 16x16 tiles: brick, grass, orb, ship.
fn build_atlas() -> Image {
    let mut img = Image::filled(4 * TILE, TILE, ColorRgba::TRANSPARENT);

    for y in 0..TILE {
        for x in 0..TILE {
            // Brick: staggered courses with mortar lines.
            let course = y / 4;
            let shift = (course % 2) * 4;
            let mortar = y % 4 == 0 || (x + shift) % 8 == 0;
            let c = if mortar {
                ColorRgba::from_rgba8(60, 40, 36, 255)
            } else {
                ColorRgba::from_rgba8(150, 74, 54, 255)
            };
            img.set_pixel(x, y, c);

            // Grass: green top fading into dirt.
            let c = if y < 3 {
                ColorRgba::from_rgba8(70, 160, 60, 255)
            } else if y < 5 && (x * 7 + y) % 3 == 0 {
                ColorRgba::from_rgba8(70, 140, 58, 255)
            } else {
                ColorRgba::from_rgba8(110, 80, 50, 255)
            };
            img.set_pixel(TILE + x, y, c);

            // Orb: white disc on transparency, modulation colors it in.
            let dx = x as f32 - 7.5;
            let dy = y as f32 - 7.5;
            let d = (dx * dx + dy * dy).sqrt();
            if d < 7.0 {
                let shade = if d < 4.0 { 255 } else { 200 };
                img.set_pixel(2 * TILE + x, y, ColorRgba::from_rgba8(shade, shade, shade, 255));
            }

            // Ship: a chunky arrow.
            let half = (x as i32 - 8).unsigned_abs();
            if y >= 4 && y < 14 && half < (y - 2) / 2 {
                img.set_pixel(3 * TILE + x, y, ColorRgba::from_rgba8(200, 205, 220, 255));
            }
        }
    }

    img
}

/// 128x128 star-field gradient, tiled horizontally behind the scene.
fn build_backdrop() -> Image {
    let size = 128;
    let mut img = Image::filled(size, size, ColorRgba::TRANSPARENT);

    for y in 0..size {
        let t = y as f32 / size as f32;
        let c = ColorRgba::new(0.05 + t * 0.1, 0.04, 0.25 - t * 0.12, 1.0);
        for x in 0..size {
            img.set_pixel(x, y, c);
        }
    }

    // Deterministic star scatter.
    let mut seed: u32 = 0x9e37;
    for _ in 0..60 {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        let x = (seed >> 8) % size;
        let y = (seed >> 20) % size;
        let bright = 160 + ((seed >> 4) % 96) as u8;
        img.set_pixel(x, y, ColorRgba::from_rgba8(bright, bright, bright, 255));
    }

    img
}
