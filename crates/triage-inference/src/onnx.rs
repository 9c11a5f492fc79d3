//! tract-onnx 加载与执行的公共部分

use crate::contract::InputContract;
use ndarray::Array4;
use std::io::Cursor;
use tract_onnx::prelude::*;
use tracing::debug;
use triage_core::{Result, TriageError};

/// 优化后的可执行计划，`run(&self)` 不修改任何内部状态，可跨线程共享
pub(crate) type OnnxPlan = TypedRunnableModel<TypedModel>;

/// 从字节流加载 ONNX 模型，并按输入约定固定输入形状
pub(crate) fn load_plan(bytes: &[u8], contract: InputContract, name: &str) -> Result<OnnxPlan> {
    let mut reader = Cursor::new(bytes);
    let plan = tract_onnx::onnx()
        .model_for_read(&mut reader)
        .and_then(|model| model.with_input_fact(0, f32::fact(contract.shape()).into()))
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| TriageError::ModelUnavailable(format!("{} 加载失败: {}", name, e)))?;

    debug!(model = name, shape = ?contract.shape(), "onnx plan ready");
    Ok(plan)
}

/// 执行单输入单输出推理，返回展平后的第一个输出
pub(crate) fn run_plan(plan: &OnnxPlan, input: &Array4<f32>, name: &str) -> Result<Vec<f32>> {
    let shape = input.shape().to_vec();
    let data: Vec<f32> = input.iter().copied().collect();

    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| TriageError::Inference(format!("{} 输入张量构建失败: {}", name, e)))?;

    let outputs = plan
        .run(tvec!(tensor.into()))
        .map_err(|e| TriageError::Inference(format!("{} 推理失败: {}", name, e)))?;

    let first = outputs
        .first()
        .ok_or_else(|| TriageError::Inference(format!("{} 没有输出张量", name)))?;

    let view = first
        .to_array_view::<f32>()
        .map_err(|e| TriageError::Inference(format!("{} 输出类型不是 f32: {}", name, e)))?;

    Ok(view.iter().copied().collect())
}
