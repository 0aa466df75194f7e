//! Perceptual hashing of skin textures.
//!
//! A 16x16 difference hash over a grayscale downscale of the decoded pixels:
//! 256 bits, rendered as 64 lowercase hex characters. Because the hash is
//! computed from decoded pixel data it is invariant under re-encoding or
//! chunk-level re-muxing of the same image.
//!
//! The function is part of the catalog schema: stored hashes are only
//! comparable while every writer uses this exact computation.

use image::imageops::FilterType;
use image::DynamicImage;

/// Width and height of the hash grid, in bits.
const HASH_SIZE: u32 = 16;

/// Length of the hex-encoded hash.
pub const PHASH_HEX_LEN: usize = (HASH_SIZE * HASH_SIZE / 4) as usize;

/// Compute the perceptual hash of a decoded image.
///
/// Each bit compares the brightness of a pixel to its left neighbour in a
/// `(HASH_SIZE + 1) x HASH_SIZE` grayscale rendering.
pub fn phash(img: &DynamicImage) -> String {
    let small = img
        .resize_exact(HASH_SIZE + 1, HASH_SIZE, FilterType::Triangle)
        .to_luma8();

    let mut bytes = [0u8; (HASH_SIZE * HASH_SIZE / 8) as usize];
    let mut bit = 0usize;
    for y in 0..HASH_SIZE {
        for x in 0..HASH_SIZE {
            if small.get_pixel(x + 1, y)[0] > small.get_pixel(x, y)[0] {
                bytes[bit / 8] |= 1 << (7 - bit % 8);
            }
            bit += 1;
        }
    }

    let mut hex = String::with_capacity(PHASH_HEX_LEN);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(hex, "{b:02x}");
    }
    hex
}
