// Full-frame pixel effects over a flat RGBA buffer (4 bytes per pixel).
// Visual outcomes:
// - Noise: scattered red specks, denser as the intensity goes up.
// - Invert: photographic negative of the frame.
// - Emboss: grey relief where edges light up and flat areas sink to mid-grey.
//
// Alpha bytes (index % 4 == 3) are never written by any of these.

use crate::types::ImageData;

#[inline]
fn is_alpha(i: usize) -> bool {
    i % 4 == 3
}

/// One noise hit at element `i`: zero `i..i+3`, then force `i` to 255.
/// The hit is aligned to the element, not the pixel, so a hit on a green
/// byte bleeds into blue and the next pixel's red. Alpha and out-of-range
/// positions are skipped.
#[inline]
pub fn noise_at(data: &mut [u8], i: usize) {
    let end = (i + 3).min(data.len());
    for j in i..end {
        if !is_alpha(j) {
            data[j] = 0;
        }
    }
    if i < data.len() && !is_alpha(i) {
        data[i] = 255;
    }
}

/// Replace R,G,B of the pixel starting at `i` with `255 - v`.
#[inline]
pub fn invert_pixel_at(data: &mut [u8], i: usize) {
    if let Some(px) = data.get_mut(i..i + 3) {
        for v in px {
            *v = 255 - *v;
        }
    }
}

/// Walk every element; each one is hit with probability `intensity`.
pub fn apply_noise(data: &mut [u8], intensity: f32, rng: &mut fastrand::Rng) {
    for i in 0..data.len() {
        if rng.f32() < intensity {
            noise_at(data, i);
        }
    }
}

/// Negative of every pixel; alpha untouched. Applying it twice is a no-op.
pub fn invert(data: &mut [u8]) {
    for i in (0..data.len()).step_by(4) {
        invert_pixel_at(data, i);
    }
}

/// Noise and invert share one walk over the frame, in that order per element.
/// `noise` is the hit probability, `None` when noise is off.
pub fn pixel_pass(image: &mut ImageData, noise: Option<f32>, do_invert: bool, rng: &mut fastrand::Rng) {
    if noise.is_none() && !do_invert {
        return;
    }
    let data = &mut image.data[..];
    for i in 0..data.len() {
        if let Some(p) = noise {
            if rng.f32() < p {
                noise_at(data, i);
            }
        }
        if do_invert && i % 4 == 0 {
            invert_pixel_at(data, i);
        }
    }
}

/// `v = 127 + 2v - right - below` for every colour byte, where `right` is
/// the same channel one pixel ahead and `below` the same channel one row
/// down. Runs forward in place: both neighbours are still unmodified when
/// read. A neighbour past the end of the buffer makes the byte 0.
pub fn emboss(data: &mut [u8], width: usize) {
    let row = width * 4;
    let len = data.len();
    for i in 0..len {
        if is_alpha(i) {
            continue;
        }
        if i + 4 >= len || i + row >= len {
            data[i] = 0;
            continue;
        }
        let v = 127 + 2 * data[i] as i32 - data[i + 4] as i32 - data[i + row] as i32;
        data[i] = v.clamp(0, 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(w: usize, h: usize, seed: u64) -> ImageData {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut img = ImageData::new(w, h);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v = if is_alpha(i) { 255 } else { rng.u8(..) };
        }
        img
    }

    #[test]
    fn invert_example_pixel() {
        let mut d = vec![10, 20, 30, 255];
        invert(&mut d);
        assert_eq!(d, vec![245, 235, 225, 255]);
    }

    #[test]
    fn invert_is_involutive() {
        let img = frame(7, 5, 1);
        let mut d = img.data.clone();
        invert(&mut d);
        assert_ne!(d, img.data);
        invert(&mut d);
        assert_eq!(d, img.data);
    }

    #[test]
    fn single_noise_hit_is_red() {
        let mut d = vec![10, 20, 30, 200, 40, 50, 60, 200];
        noise_at(&mut d, 0);
        assert_eq!(&d[..4], &[255, 0, 0, 200]);
        // A hit on blue spills into the next pixel but never the alpha byte.
        noise_at(&mut d, 2);
        assert_eq!(d, vec![255, 0, 255, 200, 0, 50, 60, 200]);
        // Hits near the end stay in bounds.
        noise_at(&mut d, 6);
        assert_eq!(&d[4..], &[0, 50, 255, 200]);
    }

    #[test]
    fn zero_intensity_leaves_frame_alone() {
        let mut img = frame(16, 9, 2);
        let before = img.clone();
        let mut rng = fastrand::Rng::with_seed(3);
        apply_noise(&mut img.data, 0.0, &mut rng);
        assert_eq!(img, before);
        pixel_pass(&mut img, Some(0.0), false, &mut rng);
        assert_eq!(img, before);
    }

    #[test]
    fn full_intensity_forces_every_colour_byte() {
        // Each byte's last write is its own forced 255.
        let mut img = frame(6, 4, 4);
        let mut rng = fastrand::Rng::with_seed(5);
        apply_noise(&mut img.data, 1.0, &mut rng);
        for (i, v) in img.data.iter().enumerate() {
            assert_eq!(*v, 255, "byte {i}");
        }
    }

    #[test]
    fn noise_never_touches_alpha() {
        let mut img = frame(10, 10, 6);
        for px in img.data.chunks_exact_mut(4) {
            px[3] = 77;
        }
        let mut rng = fastrand::Rng::with_seed(7);
        pixel_pass(&mut img, Some(0.5), true, &mut rng);
        assert!(img.data.chunks_exact(4).all(|px| px[3] == 77));
    }

    #[test]
    fn emboss_is_deterministic() {
        let img = frame(12, 8, 8);
        let mut a = img.data.clone();
        let mut b = img.data.clone();
        emboss(&mut a, 12);
        emboss(&mut b, 12);
        assert_eq!(a, b);
    }

    #[test]
    fn emboss_flattens_uniform_frame_and_zeroes_the_last_row() {
        let (w, h) = (4, 3);
        let mut d: Vec<u8> = [90, 90, 90, 255].repeat(w * h);
        emboss(&mut d, w);
        for (i, v) in d.iter().enumerate() {
            let expected = if is_alpha(i) {
                255
            } else if i + w * 4 >= d.len() {
                0
            } else {
                127
            };
            assert_eq!(*v, expected, "byte {i}");
        }
    }

    #[test]
    fn emboss_clamps() {
        // Bright pixel with dark neighbours saturates high.
        let mut d = vec![
            250, 0, 0, 255, 0, 0, 0, 255, //
            0, 0, 0, 255, 0, 0, 0, 255,
        ];
        emboss(&mut d, 2);
        assert_eq!(d[0], 255);
        assert_eq!(d[1], 127);
    }
}
