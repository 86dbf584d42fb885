//! Grayscale morphology with rectangular structuring elements.
//!
//! Barcode bars are long and thin, so the kernels here are rarely square.

use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_close, Mask};

/// Rectangular `kernel_w` x `kernel_h` mask anchored at its centre
pub fn rect_mask(kernel_w: u32, kernel_h: u32) -> Mask {
    let (w, h) = (kernel_w.clamp(1, 511), kernel_h.clamp(1, 511));
    let kernel = GrayImage::from_pixel(w, h, Luma([255u8]));
    Mask::from_image(&kernel, (w / 2) as u8, (h / 2) as u8)
}

/// Dilation followed by erosion: fills dark gaps narrower than the kernel
pub fn close_rect(img: &GrayImage, kernel_w: u32, kernel_h: u32) -> GrayImage {
    grayscale_close(img, &rect_mask(kernel_w, kernel_h))
}

/// Closing minus the input. Bright where dark features narrower than the
/// kernel (bars, printed digits) sit on a lighter background.
pub fn black_hat(img: &GrayImage, kernel_w: u32, kernel_h: u32) -> GrayImage {
    let closed = close_rect(img, kernel_w, kernel_h);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([closed.get_pixel(x, y)[0].saturating_sub(img.get_pixel(x, y)[0])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_fills_narrow_gap() {
        // White image with a 1px black column
        let img = GrayImage::from_fn(20, 5, |x, _| if x == 10 { Luma([0u8]) } else { Luma([255u8]) });
        let closed = close_rect(&img, 3, 1);
        assert!(closed.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_close_keeps_wide_dark_block() {
        let img = GrayImage::from_fn(40, 20, |x, _| if (10..30).contains(&x) { Luma([0u8]) } else { Luma([255u8]) });
        let closed = close_rect(&img, 5, 3);
        assert_eq!(closed.get_pixel(20, 10)[0], 0);
        assert_eq!(closed.get_pixel(2, 10)[0], 255);
    }

    #[test]
    fn test_black_hat_highlights_thin_dark_bar() {
        let img = GrayImage::from_fn(40, 20, |x, _| if (18..21).contains(&x) { Luma([20u8]) } else { Luma([230u8]) });
        let hat = black_hat(&img, 21, 7);
        assert_eq!(hat.get_pixel(19, 10)[0], 210);
        assert_eq!(hat.get_pixel(5, 10)[0], 0);
    }
}
