//! A texture placed on screen.
//!
//! Placement is anchor + position + per-axis scale + four corner offsets.
//! The quad is built anchor-relative, offset per corner, scaled, then
//! translated, so offsets skew the quad in pre-scale pixel units.

use crate::catalog::TextureHandle;
use glam::Vec2;
use marquee_core::sidecar::CornerOffsets;
use marquee_render::DrawContext;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

const EDGE_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const EDGE_THICKNESS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Center,
    BottomCenter,
}

/// Quad corners in TL, BL, TR, BR order for the given placement.
pub fn quad_corners(
    anchor: Anchor,
    size: Vec2,
    scale: Vec2,
    position: Vec2,
    offsets: &CornerOffsets,
) -> [Vec2; 4] {
    let (tl, bl, tr, br) = match anchor {
        Anchor::TopLeft => (
            Vec2::ZERO,
            Vec2::new(0.0, size.y),
            Vec2::new(size.x, 0.0),
            size,
        ),
        Anchor::Center => {
            let half = size * 0.5;
            (
                -half,
                Vec2::new(-half.x, half.y),
                Vec2::new(half.x, -half.y),
                half,
            )
        }
        Anchor::BottomCenter => {
            let half_w = size.x * 0.5;
            (
                Vec2::new(-half_w, -size.y),
                Vec2::new(-half_w, 0.0),
                Vec2::new(half_w, -size.y),
                Vec2::new(half_w, 0.0),
            )
        }
    };
    [
        (tl + offsets.top_left) * scale + position,
        (bl + offsets.bottom_left) * scale + position,
        (tr + offsets.top_right) * scale + position,
        (br + offsets.bottom_right) * scale + position,
    ]
}

/// A catalog texture plus where and how to draw it. Holds only a weak
/// reference to the handle -- the catalog stays the sole owner, and a
/// placement left behind after a release simply stops drawing.
pub struct PlacedTexture {
    handle: Weak<RefCell<TextureHandle>>,
    pub anchor: Anchor,
    pub position: Vec2,
    pub scale: Vec2,
    pub offsets: CornerOffsets,
}

impl PlacedTexture {
    pub fn new(handle: &Rc<RefCell<TextureHandle>>, anchor: Anchor) -> Self {
        Self {
            handle: Rc::downgrade(handle),
            anchor,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            offsets: CornerOffsets::default(),
        }
    }

    /// Pixel size of the underlying texture, `None` once the catalog has
    /// dropped it.
    pub fn texture_size(&self) -> Option<Vec2> {
        self.handle.upgrade().map(|h| h.borrow().size())
    }

    /// Emit the quad into the frame mesh. A dead or released handle makes
    /// this a silent no-op. `stroke_edges` additionally outlines the quad
    /// in opaque black to mask sub-pixel seams against the backdrop.
    pub fn draw(&self, ctx: &mut DrawContext, tint: [f32; 4], stroke_edges: bool) {
        let Some(handle) = self.handle.upgrade() else {
            return;
        };
        let handle = handle.borrow();
        if !handle.is_live() {
            return;
        }
        let Some(binding) = handle.binding() else {
            return;
        };
        let size = handle.size();
        let points = quad_corners(self.anchor, size, self.scale, self.position, &self.offsets);
        ctx.add_image_quad(
            binding,
            points,
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
            ],
            tint,
        );

        if stroke_edges {
            let [tl, bl, tr, br] = points;
            // The top line starts slightly above the corner so the stroke
            // fully covers the quad's top seam.
            ctx.add_line(tl - Vec2::new(0.0, 2.0), tr, EDGE_COLOR, EDGE_THICKNESS);
            ctx.add_line(tr, br, EDGE_COLOR, EDGE_THICKNESS);
            ctx.add_line(br, bl, EDGE_COLOR, EDGE_THICKNESS);
            ctx.add_line(bl, tl, EDGE_COLOR, EDGE_THICKNESS);
        }
    }
}
