//! Height map to normal map conversion.

use crate::maps::{EncodedNormalImage, GradientField, HeightmapGrid, NormalVector};

/// Estimate per-cell derivatives with the 3x3 Sobel operator.
///
/// Borders use reflect-101 extension: the outermost row and column see a
/// mirrored neighbourhood, so the derivative across an edge is always zero.
#[allow(clippy::needless_range_loop)]
pub fn sobel_gradients(grid: &HeightmapGrid) -> GradientField {
    let width = grid.width();
    let height = grid.height();
    let mut data = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height {
        for x in 0..width {
            let mut samples = [[0.0; 3]; 3];
            for dy in 0..3 {
                for dx in 0..3 {
                    let sx = i64::from(x) + dx as i64 - 1;
                    let sy = i64::from(y) + dy as i64 - 1;
                    samples[dy][dx] = grid.get_reflected(sx, sy);
                }
            }

            // Gx = | -1  0  1 |    Gy = | -1 -2 -1 |
            //      | -2  0  2 |         |  0  0  0 |
            //      | -1  0  1 |         |  1  2  1 |
            let gx = (samples[0][2] + 2.0 * samples[1][2] + samples[2][2])
                - (samples[0][0] + 2.0 * samples[1][0] + samples[2][0]);

            let gy = (samples[2][0] + 2.0 * samples[2][1] + samples[2][2])
                - (samples[0][0] + 2.0 * samples[0][1] + samples[0][2]);

            data.push((gx, gy));
        }
    }

    GradientField {
        width,
        height,
        data,
    }
}

/// Turn a gradient field into unit normals.
///
/// The candidate is `(-dx * strength, dy * strength, 1)`. The x component is
/// negated to match the target renderer's tangent-space handedness.
pub fn compute_normals(gradients: &GradientField, strength: f64) -> Vec<NormalVector> {
    gradients
        .data
        .iter()
        .map(|&(gx, gy)| {
            let nx = -(gx * strength);
            let ny = gy * strength;
            let nz = 1.0;

            let len = (nx * nx + ny * ny + nz * nz).sqrt();
            // Overflowing gradients give an infinite length; keep the pixel upright.
            if !len.is_finite() || len == 0.0 {
                return NormalVector::UP;
            }

            NormalVector {
                x: nx / len,
                y: ny / len,
                z: nz / len,
            }
        })
        .collect()
}

/// Remap a component from `[-1, 1]` to `[0, 255]`.
#[inline]
pub fn encode_component(v: f64) -> u8 {
    ((v + 1.0) / 2.0 * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Encode unit normals into bytes, stored as (Z, Y, X).
pub fn encode_normals(width: u32, height: u32, normals: &[NormalVector]) -> EncodedNormalImage {
    let mut image = EncodedNormalImage::with_capacity(width, height);
    for n in normals {
        image.data.extend_from_slice(&[
            encode_component(n.z),
            encode_component(n.y),
            encode_component(n.x),
        ]);
    }
    image
}
