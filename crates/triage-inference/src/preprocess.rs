//! 图像预处理
//!
//! 从同一张 RGB 图像派生两份输入：
//! - `cnn_tensor`：按 [`CNN_INPUT`] 缩放、归一化到 [0,1]，带批维度 1
//! - `feature_vector`：按 [`FEATURE_INPUT`] 缩放、归一化后送入特征提取器，
//!   展平并整形为单行矩阵，供经典模型使用

use crate::contract::{InputContract, TensorLayout, CNN_INPUT, FEATURE_INPUT};
use crate::feature::FeatureExtractor;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array2, Array4};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;
use triage_core::{Result, TriageError};

/// 预处理输出
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub cnn_tensor: Array4<f32>,
    pub feature_vector: Array2<f32>,
}

/// 预处理器
#[derive(Clone)]
pub struct Preprocessor {
    feature_extractor: Arc<dyn FeatureExtractor>,
}

impl Preprocessor {
    pub fn new(feature_extractor: Arc<dyn FeatureExtractor>) -> Self {
        Self { feature_extractor }
    }

    /// 从已解码图像生成两份模型输入
    pub fn prepare(&self, image: &RgbImage) -> Result<PreparedInputs> {
        let cnn_tensor = to_tensor(image, CNN_INPUT);
        let feature_input = to_tensor(image, FEATURE_INPUT);

        let features = self.feature_extractor.extract(&feature_input)?;
        if features.is_empty() {
            return Err(TriageError::Inference("特征提取器输出为空".to_string()));
        }

        let width = features.len();
        let feature_vector = Array2::from_shape_vec((1, width), features)
            .map_err(|e| TriageError::Inference(format!("特征向量整形失败: {}", e)))?;

        debug!(
            cnn_shape = ?cnn_tensor.shape(),
            feature_width = width,
            "inputs prepared"
        );

        Ok(PreparedInputs {
            cnn_tensor,
            feature_vector,
        })
    }
}

/// 缩放到约定尺寸并归一化为 [0,1] 浮点张量
pub fn to_tensor(image: &RgbImage, contract: InputContract) -> Array4<f32> {
    let size = contract.size;
    let resized: Cow<'_, RgbImage> = if image.dimensions() == (size, size) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, size, size, FilterType::Triangle))
    };

    let s = size as usize;
    let value = |x: usize, y: usize, c: usize| -> f32 {
        f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0
    };

    match contract.layout {
        TensorLayout::Nhwc => Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| value(x, y, c)),
        TensorLayout::Nchw => Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| value(x, y, c)),
    }
}
