use super::GfxContext;
use super::backend::{TextureBackend, TextureId};
use super::registry::ImageHandle;
use crate::palette::Color;

// ── DrawMode ─────────────────────────────────────────────────────────────────

/// How a sprite is put on screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DrawMode {
    /// Map sprite. Screen coordinates are converted to the unzoomed
    /// framebuffer: `x * den / num + base_x`.
    Normal,
    /// UI image, drawn unzoomed at `x + base_x`.
    Base,
    /// Like [`Normal`](Self::Normal), multiplied by a color.
    Tinted(Color),
    /// Light overlay, drawn unzoomed with additive-style blending.
    Light,
}

impl DrawMode {
    pub fn tint(&self) -> Color {
        match self {
            Self::Tinted(c) => *c,
            _ => Color::WHITE,
        }
    }

    fn is_zoomed(&self) -> bool {
        matches!(self, Self::Normal | Self::Tinted(_))
    }

    /// Blend state the renderer binds for this mode.
    pub fn blend_state(&self) -> wgpu::BlendState {
        match self {
            Self::Light => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::DstAlpha,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState { color: add, alpha: add }
            }
            _ => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}

// ── SpriteVertex ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    /// Framebuffer position in pixels.
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,  // position
        1 => Float32x2,  // uv
        2 => Float32x4,  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Index order of the two triangles of a quad (Y down): TL-TR-BL, TR-BR-BL.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

/// One textured quad ready for batching.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpriteQuad {
    pub texture: TextureId,
    /// Top-left, top-right, bottom-left, bottom-right.
    pub vertices: [SpriteVertex; 4],
    pub mode: DrawMode,
}

/// Quad for `handle` drawn at `(x, y)`. `None` for the empty image and
/// unknown handles.
pub fn sprite_quad<B: TextureBackend>(
    ctx: &GfxContext<B>,
    handle: ImageHandle,
    x: i32,
    y: i32,
    mode: DrawMode,
) -> Option<SpriteQuad> {
    let desc = ctx.registry().get(handle)?;
    let base = desc.base;
    let p = desc.placement;

    let (x, y) = if mode.is_zoomed() {
        (ctx.zoom().unscale(x), ctx.zoom().unscale(y))
    } else {
        (x, y)
    };
    let x0 = (x + base.x) as f32;
    let y0 = (y + base.y) as f32;
    let x1 = x0 + base.w as f32;
    let y1 = y0 + base.h as f32;

    let (tex_w, tex_h) = if p.is_dedicated() {
        (base.w as f32, base.h as f32)
    } else {
        let size = ctx.packer().max_size() as f32;
        (size, size)
    };
    let u0 = p.x as f32 / tex_w;
    let v0 = p.y as f32 / tex_h;
    let u1 = (p.x + base.w) as f32 / tex_w;
    let v1 = (p.y + base.h) as f32 / tex_h;

    let color = mode.tint().0;
    let vertices = [
        SpriteVertex { position: [x0, y0], uv: [u0, v0], color },
        SpriteVertex { position: [x1, y0], uv: [u1, v0], color },
        SpriteVertex { position: [x0, y1], uv: [u0, v1], color },
        SpriteVertex { position: [x1, y1], uv: [u1, v1], color },
    ];
    Some(SpriteQuad { texture: p.texture, vertices, mode })
}
