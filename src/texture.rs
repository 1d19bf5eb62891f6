use crate::error::{RenderError, Result};
use std::path::Path;

/// Decoded RGBA8 pixels waiting to be uploaded by a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    /// Debug label, usually the asset name.
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Tightly packed rows of RGBA8 texels, sRGB encoded.
    pub pixels: Vec<u8>,
}

impl ImageAsset {
    /// Wraps raw RGBA data.
    ///
    /// Fails if `pixels` does not hold exactly `width * height` texels.
    pub fn from_rgba(
        label: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let label = label.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || width == 0 || height == 0 {
            return Err(RenderError::AssetParse {
                name: label,
                reason: format!(
                    "expected {} bytes for {}x{} RGBA, got {}",
                    expected,
                    width,
                    height,
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            label,
            width,
            height,
            pixels,
        })
    }

    /// Decodes an image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            label: path.display().to_string(),
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// Decodes embedded image bytes.
    pub fn from_bytes(label: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            label: label.into(),
            width,
            height,
            pixels: img.into_raw(),
        })
    }

    /// A 1×1 image of a single colour.
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// A two-colour checkerboard with square cells of `cell` pixels.
    ///
    /// Zero sizes are raised to one.
    pub fn checkerboard(
        label: impl Into<String>,
        size: u32,
        cell: u32,
        a: [u8; 4],
        b: [u8; 4],
    ) -> Self {
        let size = size.max(1);
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let texel = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                pixels.extend_from_slice(&texel);
            }
        }
        Self {
            label: label.into(),
            width: size,
            height: size,
            pixels,
        }
    }

    /// Blocky value noise picked from `palette`.
    ///
    /// Each texel takes a palette entry chosen by a hash of its coordinates
    /// and `seed`, then jitters its brightness a little.
    pub fn noise(label: impl Into<String>, size: u32, seed: u32, palette: &[[u8; 3]]) -> Self {
        let fallback = [[128u8, 128, 128]];
        let palette = if palette.is_empty() { &fallback[..] } else { palette };
        let size = size.max(1);
        let mut pixels = vec![0u8; (size * size * 4) as usize];

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let base = palette[(Self::hash(x, y, seed) % palette.len() as u32) as usize];
                let variation = ((Self::hash(x + 1000, y + 1000, seed) % 30) as i32) - 15;

                for channel in 0..3 {
                    pixels[idx + channel] = (base[channel] as i32 + variation).clamp(0, 255) as u8;
                }
                pixels[idx + 3] = 255;
            }
        }

        Self {
            label: label.into(),
            width: size,
            height: size,
            pixels,
        }
    }

    /// A vertical two-colour gradient, top to bottom.
    pub fn gradient(label: impl Into<String>, size: u32, top: [u8; 3], bottom: [u8; 3]) -> Self {
        let size = size.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            let t = if size > 1 {
                y as f32 / (size - 1) as f32
            } else {
                0.0
            };
            let row: [u8; 4] = [
                lerp_u8(top[0], bottom[0], t),
                lerp_u8(top[1], bottom[1], t),
                lerp_u8(top[2], bottom[2], t),
                255,
            ];
            for _ in 0..size {
                pixels.extend_from_slice(&row);
            }
        }
        Self {
            label: label.into(),
            width: size,
            height: size,
            pixels,
        }
    }

    fn hash(x: u32, y: u32, seed: u32) -> u32 {
        let mut h = seed;
        h = h.wrapping_add(x.wrapping_mul(374761393));
        h = h.wrapping_add(y.wrapping_mul(668265263));
        h ^= h >> 13;
        h = h.wrapping_mul(1274126177);
        h ^= h >> 16;
        h
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(ImageAsset::from_rgba("bad", 2, 2, vec![0; 15]).is_err());
        assert!(ImageAsset::from_rgba("ok", 2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let white = [255, 255, 255, 255];
        let black = [0, 0, 0, 255];
        let img = ImageAsset::checkerboard("check", 4, 2, white, black);
        assert_eq!(img.pixels.len(), 64);
        assert_eq!(&img.pixels[0..4], &white);
        // x = 2 is the first texel of the second cell
        assert_eq!(&img.pixels[8..12], &black);
    }

    #[test]
    fn noise_is_deterministic_and_opaque() {
        let palette = [[10, 20, 30], [200, 100, 50]];
        let a = ImageAsset::noise("n", 8, 42, &palette);
        let b = ImageAsset::noise("n", 8, 42, &palette);
        assert_eq!(a, b);
        assert!(a.pixels.chunks(4).all(|t| t[3] == 255));
    }

    #[test]
    fn gradient_runs_top_to_bottom() {
        let img = ImageAsset::gradient("sky", 3, [0, 0, 0], [200, 100, 50]);
        assert_eq!(&img.pixels[0..4], &[0, 0, 0, 255]);
        let last_row = (2 * 3 * 4) as usize;
        assert_eq!(&img.pixels[last_row..last_row + 4], &[200, 100, 50, 255]);
    }

    #[test]
    fn zero_sized_generators_yield_one_texel() {
        let images = [
            ImageAsset::checkerboard("c", 0, 0, [0; 4], [255; 4]),
            ImageAsset::noise("n", 0, 7, &[]),
            ImageAsset::gradient("g", 0, [0; 3], [255; 3]),
        ];
        for img in images {
            assert_eq!((img.width, img.height), (1, 1));
            assert_eq!(img.pixels.len(), 4);
        }
    }

    #[test]
    fn decodes_png_bytes() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 4]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let img = ImageAsset::from_bytes("png", &png).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(&img.pixels[0..4], &[1, 2, 3, 4]);
    }
}
