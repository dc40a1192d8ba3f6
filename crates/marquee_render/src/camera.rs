use glam::Mat4;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Screen-space projection for the overlay: origin at the top-left corner,
/// +y pointing down, units in pixels. This matches how placed textures and
/// transition targets are authored.
pub struct OverlayCamera {
    pub viewport: (u32, u32),
}

impl OverlayCamera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let w = self.viewport.0.max(1) as f32;
        let h = self.viewport.1.max(1) as f32;

        // bottom = h, top = 0 flips the y axis into screen orientation.
        let proj = Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0);

        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }
}
