//! Heightmap images for terrain colliders

use std::path::Path;

use rapier3d::na::DMatrix;

/// Load a grayscale heightmap as heights in `0..=1`, smoothed `smooth` times.
/// Rows follow image y, columns image x.
pub fn load_heightmap(path: &Path, smooth: u32) -> Result<DMatrix<f32>, image::ImageError> {
    let image = image::open(path)?.to_luma8();
    let (width, height) = image.dimensions();
    let heights = DMatrix::from_fn(height as usize, width as usize, |row, col| {
        f32::from(image.get_pixel(col as u32, row as u32).0[0]) / 255.0
    });
    Ok((0..smooth).fold(heights, |h, _| smooth_pass(&h)))
}

/// One 3x3 box filter pass, clamped at the borders
pub fn smooth_pass(heights: &DMatrix<f32>) -> DMatrix<f32> {
    let (rows, cols) = heights.shape();
    DMatrix::from_fn(rows, cols, |r, c| {
        let mut sum = 0.0;
        let mut n = 0.0;
        for rr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
            for cc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                sum += heights[(rr, cc)];
                n += 1.0;
            }
        }
        sum / n
    })
}
