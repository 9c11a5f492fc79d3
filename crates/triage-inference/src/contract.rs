//! 模型输入约定
//!
//! 预处理和模型加载共用同一组常量，两边不一致时模型会静默输出无意义结果。

/// 张量维度顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// [batch, height, width, channel]
    Nhwc,
    /// [batch, channel, height, width]
    Nchw,
}

/// 单个模型的输入约定：方形边长 + 维度顺序，通道固定为 RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContract {
    pub size: u32,
    pub layout: TensorLayout,
}

impl InputContract {
    /// 批大小为 1 的完整张量形状
    pub fn shape(&self) -> [usize; 4] {
        let s = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, s, s, 3],
            TensorLayout::Nchw => [1, 3, s, s],
        }
    }
}

/// 分类 CNN 的训练期输入约定
pub const CNN_INPUT: InputContract = InputContract {
    size: 224,
    layout: TensorLayout::Nhwc,
};

/// 特征提取骨干网络的输入约定
pub const FEATURE_INPUT: InputContract = InputContract {
    size: 224,
    layout: TensorLayout::Nhwc,
};
