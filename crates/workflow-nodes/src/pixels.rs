//! Sample-level helpers shared by the processing nodes
//!
//! Neighbourhood operations mirror pixels at the border without repeating
//! the edge sample (`dcb|abcd|cba`).

use node_engine::{Artifact, Channels, Result};

/// Rec. 601 luma of an RGB triple, rounded
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000) as u8
}

/// Round and clamp to the 8-bit range
pub fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Mirror an out-of-range coordinate back into `0..len`
pub fn reflect(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Convert to single-channel luma, leaving gray input untouched
pub fn to_gray(img: &Artifact) -> Result<Artifact> {
    match img.channels() {
        Channels::Gray => Ok(img.clone()),
        Channels::Rgb => {
            let data = img
                .data()
                .chunks_exact(3)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect();
            Artifact::new(img.width(), img.height(), Channels::Gray, data)
        }
    }
}

/// Replicate a gray image into three channels
pub fn to_rgb(img: &Artifact) -> Result<Artifact> {
    match img.channels() {
        Channels::Rgb => Ok(img.clone()),
        Channels::Gray => {
            let data = img.data().iter().flat_map(|&v| [v, v, v]).collect();
            Artifact::new(img.width(), img.height(), Channels::Rgb, data)
        }
    }
}

/// Convert `img` to the given channel layout
pub fn with_channels(img: &Artifact, channels: Channels) -> Result<Artifact> {
    match channels {
        Channels::Gray => to_gray(img),
        Channels::Rgb => to_rgb(img),
    }
}

/// `a * alpha + b * beta`, per sample, saturated
pub fn add_weighted(a: &Artifact, alpha: f32, b: &Artifact, beta: f32) -> Result<Artifact> {
    let data = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| saturate(x as f32 * alpha + y as f32 * beta))
        .collect();
    Artifact::new(a.width(), a.height(), a.channels(), data)
}

/// Convolve each channel with `kernel` horizontally, then vertically
pub fn convolve_separable(img: &Artifact, kernel: &[f32]) -> Result<Artifact> {
    let (w, h, c) = (img.width() as usize, img.height() as usize, img.channels().count());
    let radius = (kernel.len() / 2) as isize;
    let src = img.data();

    let mut horizontal = vec![0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect(x as isize + k as isize - radius, w);
                    acc += weight * src[(y * w + sx) * c + ch] as f32;
                }
                horizontal[(y * w + x) * c + ch] = acc;
            }
        }
    }

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = reflect(y as isize + k as isize - radius, h);
                    acc += weight * horizontal[(sy * w + x) * c + ch];
                }
                out[(y * w + x) * c + ch] = saturate(acc);
            }
        }
    }
    Artifact::new(img.width(), img.height(), img.channels(), out)
}

/// Convolve each channel with a square kernel given row-major
pub fn convolve_square(img: &Artifact, kernel: &[f32], size: usize) -> Result<Artifact> {
    let (w, h, c) = (img.width() as usize, img.height() as usize, img.channels().count());
    let radius = (size / 2) as isize;
    let src = img.data();

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                for ky in 0..size {
                    let sy = reflect(y as isize + ky as isize - radius, h);
                    for kx in 0..size {
                        let sx = reflect(x as isize + kx as isize - radius, w);
                        acc += kernel[ky * size + kx] * src[(sy * w + sx) * c + ch] as f32;
                    }
                }
                out[(y * w + x) * c + ch] = saturate(acc);
            }
        }
    }
    Artifact::new(img.width(), img.height(), img.channels(), out)
}

/// Force an odd kernel size of at least 1
pub fn odd_kernel(size: i64) -> usize {
    let size = size.max(1) as usize;
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 1);
        assert_eq!(reflect(-2, 4), 2);
        assert_eq!(reflect(4, 4), 2);
        assert_eq!(reflect(5, 4), 1);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
    }

    #[test]
    fn test_identity_kernel() {
        let data: Vec<u8> = (0..27).collect();
        let img = Artifact::new(3, 3, Channels::Rgb, data).unwrap();
        assert_eq!(convolve_separable(&img, &[1.0]).unwrap(), img);

        let mut k = vec![0.0; 9];
        k[4] = 1.0;
        assert_eq!(convolve_square(&img, &k, 3).unwrap(), img);
    }

    #[test]
    fn test_channel_conversion() {
        let gray = Artifact::filled(2, 1, Channels::Gray, 9);
        let rgb = to_rgb(&gray).unwrap();
        assert_eq!(rgb.data(), &[9; 6]);
        assert_eq!(to_gray(&rgb).unwrap(), gray);
    }

    #[test]
    fn test_odd_kernel() {
        assert_eq!(odd_kernel(4), 5);
        assert_eq!(odd_kernel(5), 5);
        assert_eq!(odd_kernel(0), 1);
    }
}
