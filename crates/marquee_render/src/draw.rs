//! Immediate-mode mesh builder for the overlay.
//!
//! Callers emit textured quads (four arbitrary corner points + UVs + tint),
//! thick line segments and filled rects; the context accumulates one CPU-side
//! mesh per frame and a list of draw calls batched by texture binding.
//! Consecutive geometry sharing a binding collapses into one indexed draw.
//!
//! Corner order everywhere is top-left, bottom-left, top-right, bottom-right.

use crate::sprite_pipeline::SpriteVertex;
use glam::Vec2;
use std::sync::Arc;

/// Which texture a draw call samples. `Solid` resolves to the renderer's
/// 1x1 white texture, so untextured geometry needs no bind group of its own
/// (and mesh building stays testable without a GPU device).
#[derive(Clone)]
pub enum Binding {
    Solid,
    Texture(Arc<wgpu::BindGroup>),
}

impl Binding {
    pub fn same(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Solid, Binding::Solid) => true,
            (Binding::Texture(a), Binding::Texture(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A contiguous run of indices sharing one texture binding.
pub struct DrawCall {
    pub binding: Binding,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Default)]
pub struct DrawContext {
    vertices: Vec<SpriteVertex>,
    indices: Vec<u32>,
    calls: Vec<DrawCall>,
}

impl DrawContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.calls.clear();
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Emit a textured quad from four corner points and matching UVs,
    /// tinted by `color` (straight alpha).
    pub fn add_image_quad(
        &mut self,
        binding: Binding,
        points: [Vec2; 4],
        uvs: [Vec2; 4],
        color: [f32; 4],
    ) {
        let base = self.vertices.len() as u32;
        for (point, uv) in points.iter().zip(uvs.iter()) {
            self.vertices.push(SpriteVertex {
                position: [point.x, point.y],
                tex_coords: [uv.x, uv.y],
                color,
            });
        }

        let start = self.indices.len() as u32;
        // TL-BL-TR and BL-BR-TR cover the quad.
        self.indices.extend_from_slice(&[
            base,
            base + 1,
            base + 2,
            base + 1,
            base + 3,
            base + 2,
        ]);
        self.push_call(binding, start, 6);
    }

    /// Emit a line segment as a thin solid quad expanded perpendicular to
    /// the segment direction. Zero-length segments are dropped.
    pub fn add_line(&mut self, from: Vec2, to: Vec2, color: [f32; 4], thickness: f32) {
        let dir = to - from;
        if dir.length_squared() <= f32::EPSILON {
            return;
        }
        let normal = dir.normalize().perp() * (thickness * 0.5);
        self.add_image_quad(
            Binding::Solid,
            [from - normal, from + normal, to - normal, to + normal],
            [Vec2::ZERO; 4],
            color,
        );
    }

    /// Emit an axis-aligned filled rectangle.
    pub fn add_rect_filled(&mut self, min: Vec2, max: Vec2, color: [f32; 4]) {
        self.add_image_quad(
            Binding::Solid,
            [
                min,
                Vec2::new(min.x, max.y),
                Vec2::new(max.x, min.y),
                max,
            ],
            [Vec2::ZERO; 4],
            color,
        );
    }

    fn push_call(&mut self, binding: Binding, index_start: u32, index_count: u32) {
        if let Some(last) = self.calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if contiguous && last.binding.same(&binding) {
                last.index_count += index_count;
                return;
            }
        }
        self.calls.push(DrawCall {
            binding,
            index_start,
            index_count,
        });
    }
}
