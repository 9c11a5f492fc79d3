//! 图像解码
//!
//! 将任意上传内容解码为内存中的 RGB 像素矩阵。灰度、调色板、CMYK 等色彩模式
//! 在任何缩放之前统一转换为三通道 RGB。

use image::{GenericImageView, RgbImage};
use tracing::{debug, warn};
use triage_core::{Result, TriageError};

/// 图像解码器
pub struct ImageDecoder;

impl ImageDecoder {
    /// 解码上传的字节流
    pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(TriageError::Decode("上传内容为空".to_string()));
        }

        let img = image::load_from_memory(bytes).map_err(|e| {
            warn!("图像解码失败: {}", e);
            TriageError::Decode(format!("无法解析图像: {}", e))
        })?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TriageError::Decode("图像尺寸为零".to_string()));
        }

        debug!(width, height, color = ?img.color(), "image decoded");
        Ok(img.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::encode_png;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, Rgba, RgbaImage};

    #[test]
    fn test_decode_rgb_png() {
        let img = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
        let bytes = encode_png(&DynamicImage::ImageRgb8(img));

        let decoded = ImageDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(3, 2), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_grayscale_normalized_to_rgb() {
        let img = GrayImage::from_pixel(5, 5, Luma([77]));
        let bytes = encode_png(&DynamicImage::ImageLuma8(img));

        let decoded = ImageDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([77, 77, 77]));
    }

    /// 2x1 调色板 PNG：索引 0 为红，索引 1 为蓝
    fn palette_png() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, 2, 1);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![255, 0, 0, 0, 0, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 1]).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_palette_expanded_to_rgb() {
        let decoded = ImageDecoder::decode(&palette_png()).unwrap();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(1, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_alpha_channel_dropped() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([40, 80, 120, 255]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 0]));
        let bytes = encode_png(&DynamicImage::ImageRgba8(img));

        let decoded = ImageDecoder::decode(&bytes).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([40, 80, 120]));
        // 全透明像素保留原色值
        assert_eq!(decoded.get_pixel(1, 1), &Rgb([200, 100, 50]));
    }

    #[test]
    fn test_sixteen_bit_scaled_to_eight() {
        // 257 * k 精确映射为 k
        let rgb16: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 2, Rgb([257 * 10, 257 * 128, u16::MAX]));
        let decoded = ImageDecoder::decode(&encode_png(&DynamicImage::ImageRgb16(rgb16))).unwrap();
        assert_eq!(decoded.get_pixel(3, 1), &Rgb([10, 128, 255]));

        let luma16: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(2, 2, Luma([257 * 200]));
        let decoded = ImageDecoder::decode(&encode_png(&DynamicImage::ImageLuma16(luma16))).unwrap();
        assert_eq!(decoded.get_pixel(0, 1), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let img = RgbImage::from_pixel(16, 16, Rgb([1, 2, 3]));
        let bytes = encode_png(&DynamicImage::ImageRgb8(img));

        let err = ImageDecoder::decode(&bytes[..bytes.len() / 3]).unwrap_err();
        assert!(matches!(err, TriageError::Decode(_)));
    }

    #[test]
    fn test_non_image_and_empty_fail() {
        assert!(matches!(
            ImageDecoder::decode(b"definitely not an image"),
            Err(TriageError::Decode(_))
        ));
        assert!(matches!(ImageDecoder::decode(&[]), Err(TriageError::Decode(_))));
    }
}
