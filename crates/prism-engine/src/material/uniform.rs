//! Per-draw uniform staging layout.
//!
//! The uniform block is a fixed 208-byte layout shared with the shaders in
//! `program/shaders`:
//!
//! | float index | bytes      | field                      |
//! |-------------|------------|----------------------------|
//! | `0..16`     | `0..64`    | model (`mat4x4<f32>`)      |
//! | `16..32`    | `64..128`  | view (`mat4x4<f32>`)       |
//! | `32..48`    | `128..192` | projection (`mat4x4<f32>`) |
//! | `48..52`    | `192..208` | color (`vec4<f32>`)        |
//!
//! The staging array and the GPU buffer are not kept in sync automatically:
//! an explicit [`UniformQueue::write_uniform`] call (through
//! `Material::upload_to`) is the only synchronization point.

use glam::Mat4;

pub const MODEL_OFFSET: usize = 0;
pub const VIEW_OFFSET: usize = 16;
pub const PROJECTION_OFFSET: usize = 32;
pub const COLOR_OFFSET: usize = 48;

/// Total staging size in floats.
pub const UNIFORM_FLOATS: usize = 52;

/// Total staging size in bytes.
pub const UNIFORM_BYTES: u64 = (UNIFORM_FLOATS * size_of::<f32>()) as u64;

const MAT4_FLOATS: usize = 16;

/// Upload sink for the staging array.
///
/// `wgpu::Queue` is the production implementation; tests substitute a
/// recording double to observe what reaches the GPU side.
pub trait UniformQueue {
    fn write_uniform(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]);
}

impl UniformQueue for wgpu::Queue {
    fn write_uniform(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.write_buffer(buffer, offset, data);
    }
}

/// CPU staging array with named sub-views for in-place mutation.
#[derive(Debug, Clone)]
pub struct UniformStaging {
    values: [f32; UNIFORM_FLOATS],
}

impl UniformStaging {
    /// Identity matrices, white color.
    pub fn new() -> Self {
        let mut staging = Self {
            values: [0.0; UNIFORM_FLOATS],
        };
        staging.set_model(&Mat4::IDENTITY);
        staging.set_view(&Mat4::IDENTITY);
        staging.set_projection(&Mat4::IDENTITY);
        staging.set_color([1.0, 1.0, 1.0, 1.0]);
        staging
    }

    pub fn model(&self) -> &[f32] {
        &self.values[MODEL_OFFSET..MODEL_OFFSET + MAT4_FLOATS]
    }

    pub fn model_mut(&mut self) -> &mut [f32] {
        &mut self.values[MODEL_OFFSET..MODEL_OFFSET + MAT4_FLOATS]
    }

    pub fn view(&self) -> &[f32] {
        &self.values[VIEW_OFFSET..VIEW_OFFSET + MAT4_FLOATS]
    }

    pub fn view_mut(&mut self) -> &mut [f32] {
        &mut self.values[VIEW_OFFSET..VIEW_OFFSET + MAT4_FLOATS]
    }

    pub fn projection(&self) -> &[f32] {
        &self.values[PROJECTION_OFFSET..PROJECTION_OFFSET + MAT4_FLOATS]
    }

    pub fn projection_mut(&mut self) -> &mut [f32] {
        &mut self.values[PROJECTION_OFFSET..PROJECTION_OFFSET + MAT4_FLOATS]
    }

    pub fn color(&self) -> &[f32] {
        &self.values[COLOR_OFFSET..]
    }

    pub fn color_mut(&mut self) -> &mut [f32] {
        &mut self.values[COLOR_OFFSET..]
    }

    pub fn set_model(&mut self, m: &Mat4) {
        self.model_mut().copy_from_slice(&m.to_cols_array());
    }

    pub fn set_view(&mut self, m: &Mat4) {
        self.view_mut().copy_from_slice(&m.to_cols_array());
    }

    pub fn set_projection(&mut self, m: &Mat4) {
        self.projection_mut().copy_from_slice(&m.to_cols_array());
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color_mut().copy_from_slice(&color);
    }

    /// The full staging block, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }
}

impl Default for UniformStaging {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_208_bytes_without_overlap() {
        assert_eq!(UNIFORM_BYTES, 208);
        assert_eq!(MODEL_OFFSET + 16, VIEW_OFFSET);
        assert_eq!(VIEW_OFFSET + 16, PROJECTION_OFFSET);
        assert_eq!(PROJECTION_OFFSET + 16, COLOR_OFFSET);
        assert_eq!(COLOR_OFFSET + 4, UNIFORM_FLOATS);
        assert_eq!(UniformStaging::new().as_bytes().len() as u64, UNIFORM_BYTES);
    }

    #[test]
    fn sub_view_writes_are_immediately_readable() {
        let mut staging = UniformStaging::new();
        let translation = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));

        staging.set_model(&translation);
        assert_eq!(staging.model(), translation.to_cols_array().as_slice());
        // Neighboring slices are untouched.
        assert_eq!(staging.view(), Mat4::IDENTITY.to_cols_array().as_slice());
        assert_eq!(staging.color(), [1.0, 1.0, 1.0, 1.0].as_slice());
    }

    #[test]
    fn sub_views_land_at_documented_byte_offsets() {
        let mut staging = UniformStaging::new();
        staging.projection_mut()[0] = 9.5;

        let bytes = staging.as_bytes();
        let offset = PROJECTION_OFFSET * 4;
        let cell: [u8; 4] = bytes[offset..offset + 4].try_into().unwrap();
        assert_eq!(f32::from_le_bytes(cell), 9.5);
    }

    #[test]
    fn color_slice_is_four_floats() {
        let mut staging = UniformStaging::new();
        staging.set_color([0.1, 0.2, 0.3, 0.4]);
        assert_eq!(staging.color(), [0.1, 0.2, 0.3, 0.4].as_slice());
        assert_eq!(staging.color().len(), 4);
    }
}
