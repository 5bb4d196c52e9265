//! Cubemap loading and reflection-probe IBL generation (§4.7).
//!
//! Layout auto-detection and the cross/strip face-extraction math are pure
//! CPU functions so they can be unit-tested without a GPU; the actual
//! upload and the equirectangular/prefilter conversion passes that need a
//! device are kept in thin wrappers around them.

use crate::gpu::{Program, Texture};

/// The image layouts a source cubemap image is auto-detected as, by its
/// width/height ratio (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubemapLayout {
    /// 2:1 equirectangular panorama, converted via a render pass.
    Equirectangular,
    /// 3-wide, 4-tall cross (`NegativeX/PositiveZ/PositiveX` row, one face
    /// above, two below).
    CrossThreeByFour,
    /// 4-wide, 3-tall cross (adds `NegativeZ` to the middle row).
    CrossFourByThree,
    /// Six faces side by side horizontally, `PositiveX..NegativeZ` order.
    StripHorizontal,
    /// Six faces stacked vertically, same order.
    StripVertical,
}

impl CubemapLayout {
    /// Detects a layout from image dimensions by aspect ratio. Returns
    /// `None` for a ratio matching none of the five recognized layouts.
    pub fn detect(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if width == 2 * height {
            return Some(Self::Equirectangular);
        }
        if width * 4 == height * 3 {
            return Some(Self::CrossThreeByFour);
        }
        if width * 3 == height * 4 {
            return Some(Self::CrossFourByThree);
        }
        if width == 6 * height {
            return Some(Self::StripHorizontal);
        }
        if height == 6 * width {
            return Some(Self::StripVertical);
        }
        None
    }

    /// Side length of one cube face for this layout given the source
    /// image dimensions.
    pub fn face_size(self, width: u32, height: u32) -> u32 {
        match self {
            Self::Equirectangular => height,
            Self::CrossThreeByFour => width / 3,
            Self::CrossFourByThree => width / 4,
            Self::StripHorizontal => width / 6,
            Self::StripVertical => height / 6,
        }
    }

    /// `true` if this layout is a plain pixel-copy extraction (cross or
    /// strip); `false` for equirectangular, which needs a render pass.
    pub fn is_direct_copy(self) -> bool {
        !matches!(self, Self::Equirectangular)
    }

    /// For a direct-copy layout, the six faces' `(face_index, src_x,
    /// src_y)` origins in face-size units (§4.7's six canonical faces,
    /// ordered `+X, -X, +Y, -Y, +Z, -Z`). `face_index` matches wgpu's
    /// cube-map array-layer convention for that same ordering.
    pub fn face_origins(self) -> [(u32, u32, u32); 6] {
        match self {
            // Top / Left-Front-Right / Bottom / Back, per the original's
            // 3x4 cross table (PositiveY,NegativeX,PositiveZ,PositiveX,NegativeY,NegativeZ).
            Self::CrossThreeByFour => [
                (0, 2, 1), // +X
                (1, 0, 1), // -X
                (2, 1, 0), // +Y
                (3, 1, 2), // -Y
                (4, 1, 1), // +Z
                (5, 1, 3), // -Z
            ],
            Self::CrossFourByThree => [
                (0, 2, 1), // +X
                (1, 0, 1), // -X
                (2, 1, 0), // +Y
                (3, 1, 2), // -Y
                (4, 1, 1), // +Z
                (5, 3, 1), // -Z
            ],
            Self::StripHorizontal => [(0, 0, 0), (1, 1, 0), (2, 2, 0), (3, 3, 0), (4, 4, 0), (5, 5, 0)],
            Self::StripVertical => [(0, 0, 0), (1, 0, 1), (2, 0, 2), (3, 0, 3), (4, 0, 4), (5, 0, 5)],
            Self::Equirectangular => [(0, 0, 0); 6],
        }
    }
}

/// Copies one `face_size`-square region out of a tightly packed source
/// image buffer, returning a tightly packed face buffer ready for
/// [`Texture::upload`]. `src_x`/`src_y` are in face-size units (as
/// returned by [`CubemapLayout::face_origins`]).
pub fn extract_face(
    src_pixels: &[u8],
    src_width: u32,
    bytes_per_pixel: u32,
    face_size: u32,
    src_x: u32,
    src_y: u32,
) -> Vec<u8> {
    let row_bytes = (face_size * bytes_per_pixel) as usize;
    let mut out = vec![0u8; row_bytes * face_size as usize];
    let origin_x_bytes = (src_x * face_size * bytes_per_pixel) as usize;
    let src_stride = (src_width * bytes_per_pixel) as usize;
    for row in 0..face_size {
        let src_row_start = ((src_y * face_size + row) as usize) * src_stride + origin_x_bytes;
        let dst_row_start = row as usize * row_bytes;
        out[dst_row_start..dst_row_start + row_bytes].copy_from_slice(&src_pixels[src_row_start..src_row_start + row_bytes]);
    }
    out
}

/// A GPU cube texture: six square faces addressed as array layers.
pub struct Cubemap {
    texture: Texture,
    face_size: u32,
}

impl Cubemap {
    pub fn allocate(device: &wgpu::Device, face_size: u32, format: wgpu::TextureFormat, mip_level_count: u32, label: &str) -> Self {
        let texture = Texture::new(
            device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: face_size,
                    height: face_size,
                    depth_or_array_layers: 6,
                },
                mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            },
            label,
        );
        Self { texture, face_size }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn face_size(&self) -> u32 {
        self.face_size
    }

    /// Loads a cross or strip layout by extracting and uploading each
    /// face directly (no render pass needed).
    pub fn load_direct(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: CubemapLayout,
        src_pixels: &[u8],
        src_width: u32,
        src_height: u32,
        bytes_per_pixel: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Option<Self> {
        if !layout.is_direct_copy() {
            return None;
        }
        let face_size = layout.face_size(src_width, src_height);
        let cubemap = Self::allocate(device, face_size, format, 1, label);
        for (face, src_x, src_y) in layout.face_origins() {
            let face_buffer = extract_face(src_pixels, src_width, bytes_per_pixel, face_size, src_x, src_y);
            cubemap.texture.upload(queue, &face_buffer, face_size * bytes_per_pixel, face);
        }
        Some(cubemap)
    }

    /// Converts an equirectangular panorama by rendering each face through
    /// `program` (a fullscreen-triangle shader sampling the panorama with
    /// the face's view direction) — the wgpu analogue of the original's
    /// per-face `setUniformMat4` + `draw` loop in `generateSkybox`/
    /// `loadEquirectangular`.
    pub fn convert_equirectangular(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        face_size: u32,
        format: wgpu::TextureFormat,
        program: &Program,
        bind_per_face: impl Fn(&mut wgpu::RenderPass, u32),
    ) -> Self {
        let cubemap = Self::allocate(device, face_size, format, 1, "cubemap.equirect");
        for face in 0..6u32 {
            let view = cubemap.texture.raw().create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: face,
                array_layer_count: Some(1),
                ..Default::default()
            });
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cubemap.equirect.face"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(program.pipeline());
            bind_per_face(&mut pass, face);
            pass.draw(0..3, 0..1);
        }
        cubemap
    }
}

/// Prefiltered-specular + diffuse-irradiance cubemaps sampled by the IBL
/// shading path, generated from a source environment cubemap (§4.7).
pub struct ReflectionProbe {
    pub irradiance: Cubemap,
    pub prefiltered: Cubemap,
}

/// Irradiance convolution always targets a small, fixed-resolution face —
/// the result is a low-frequency diffuse term, so more resolution buys
/// nothing.
pub const IRRADIANCE_FACE_SIZE: u32 = 32;

/// Mip levels for the prefiltered-specular chain: one level per roughness
/// step down to a 4x4 face, matching the common split-sum IBL convention.
pub fn prefiltered_mip_count(source_face_size: u32) -> u32 {
    if source_face_size <= 4 {
        return 1;
    }
    (source_face_size as f32).log2().floor() as u32 - 1
}

impl ReflectionProbe {
    /// Allocates (but does not yet fill) the probe's two cubemaps, sized
    /// from the source environment map's face resolution.
    pub fn allocate(device: &wgpu::Device, source_face_size: u32, format: wgpu::TextureFormat) -> Self {
        let irradiance = Cubemap::allocate(device, IRRADIANCE_FACE_SIZE, format, 1, "probe.irradiance");
        let prefiltered = Cubemap::allocate(device, source_face_size, format, prefiltered_mip_count(source_face_size), "probe.prefiltered");
        Self { irradiance, prefiltered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_equirectangular_by_two_to_one_ratio() {
        assert_eq!(CubemapLayout::detect(2048, 1024), Some(CubemapLayout::Equirectangular));
    }

    #[test]
    fn detects_cross_layouts_by_aspect() {
        assert_eq!(CubemapLayout::detect(768, 1024), Some(CubemapLayout::CrossThreeByFour));
        assert_eq!(CubemapLayout::detect(1024, 768), Some(CubemapLayout::CrossFourByThree));
    }

    #[test]
    fn detects_strip_layouts_by_aspect() {
        assert_eq!(CubemapLayout::detect(3072, 512), Some(CubemapLayout::StripHorizontal));
        assert_eq!(CubemapLayout::detect(512, 3072), Some(CubemapLayout::StripVertical));
    }

    #[test]
    fn unrecognized_aspect_ratio_detects_nothing() {
        assert_eq!(CubemapLayout::detect(500, 499), None);
    }

    #[test]
    fn face_size_matches_layout_math() {
        assert_eq!(CubemapLayout::CrossThreeByFour.face_size(768, 1024), 256);
        assert_eq!(CubemapLayout::StripHorizontal.face_size(1536, 256), 256);
    }

    #[test]
    fn extract_face_pulls_correct_region() {
        // 2x2-face strip: face size 1, 2 faces wide, RGBA8. Face 0 is red,
        // face 1 is green.
        let src_width = 2u32;
        let bytes_per_pixel = 4u32;
        let pixels = [255, 0, 0, 255, 0, 255, 0, 255];
        let face0 = extract_face(&pixels, src_width, bytes_per_pixel, 1, 0, 0);
        let face1 = extract_face(&pixels, src_width, bytes_per_pixel, 1, 1, 0);
        assert_eq!(face0, vec![255, 0, 0, 255]);
        assert_eq!(face1, vec![0, 255, 0, 255]);
    }

    #[test]
    fn prefiltered_mip_count_shrinks_with_small_faces() {
        assert_eq!(prefiltered_mip_count(4), 1);
        assert_eq!(prefiltered_mip_count(256), 7);
    }
}
