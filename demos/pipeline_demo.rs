//! 推理流水线演示程序
//!
//! 不依赖真实模型文件：用简单的亮度分类器和线性预后模型跑通
//! 解码 → 预处理 → 分类/预后 → 标签映射 → 结果存储 的完整链路。

use chrono::NaiveDate;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array4;
use std::sync::Arc;
use triage_core::{Patient, Result, Scan, TriageError};
use triage_database::ResultStore;
use triage_inference::testing::{encode_png, ChannelMeanExtractor};
use triage_inference::{ClassificationModel, ImageDecoder, LinearPrognosisModel, ResultAssembler};

/// 按平均亮度给出三类概率
struct BrightnessClassifier;

impl ClassificationModel for BrightnessClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let mean = input
            .mean()
            .ok_or_else(|| TriageError::Inference("empty tensor".to_string()))?;
        let logits = [1.0 - mean * 2.0, 0.5, mean * 2.0 - 0.5];
        let max = logits.iter().cloned().fold(f32::MIN, f32::max);
        let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        Ok(exp.into_iter().map(|e| e / sum).collect())
    }
}

fn synthetic_scan(brightness: u8) -> Vec<u8> {
    let image = RgbImage::from_fn(96, 96, |x, y| {
        let ring = ((x as i32 - 48).pow(2) + (y as i32 - 48).pow(2)) < 600;
        let v = if ring { brightness } else { brightness / 3 };
        Rgb([v, v, v])
    });
    encode_png(&DynamicImage::ImageRgb8(image))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏥 影像分诊流水线演示");
    println!("================================");

    let prognosis = LinearPrognosisModel::from_json(
        br#"{"coefficients": [1.2, 0.9, 0.7], "intercept": -0.3}"#,
    )?;
    let assembler = ResultAssembler::new(
        // RGB 三通道均值作为特征
        Arc::new(ChannelMeanExtractor),
        Arc::new(BrightnessClassifier),
        Arc::new(prognosis),
        "demo+000000000000",
    );

    let store = ResultStore::in_memory();
    let patient = Patient::new(
        "Demo Patient".to_string(),
        NaiveDate::from_ymd_opt(1970, 1, 1),
        "DEMO-001".to_string(),
        "000000000000000000".to_string(),
        "demo".to_string(),
    );
    store.register_patient(&patient).await?;
    println!("\n👤 登记患者: {} ({})", patient.name, patient.id);

    println!("\n🔬 处理合成影像...");
    for brightness in [30u8, 140, 250] {
        let bytes = synthetic_scan(brightness);
        let prediction = assembler.assemble_bytes(&bytes)?;
        let scan = Scan::with_prediction(
            patient.id,
            format!("synthetic-{}.png", brightness),
            format!("demo/synthetic-{}.png", brightness),
            prediction,
        );
        store.record_scan(&scan).await?;

        if let Some(p) = scan.prediction() {
            println!(
                "  亮度 {:>3}: 分类 {:<9} ({:.3})  预后 {:<7} ({:.3})",
                brightness,
                p.classification_label.as_str(),
                p.classification_confidence,
                p.prognosis_label.as_str(),
                p.prognosis_confidence
            );
        }
    }

    println!("\n🚫 损坏的上传:");
    match assembler.assemble_bytes(b"\x89PNG\r\n\x1a\nbroken") {
        Ok(_) => println!("  意外成功"),
        Err(e) => println!("  {}", e),
    }
    if let Err(e) = ImageDecoder::decode(&[]) {
        println!("  {}", e);
    }

    println!("\n📋 最近一次检查:");
    if let Some(latest) = store.latest_for_patient(&patient.id).await? {
        println!("{}", serde_json::to_string_pretty(&latest)?);
    }

    println!("\n✅ 演示完成！");
    Ok(())
}
