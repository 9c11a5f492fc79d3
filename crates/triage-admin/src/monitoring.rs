//! 推理指标
//!
//! 上传数量、失败原因、推理耗时和分类分布，以 Prometheus 文本格式导出。

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Duration;
use tracing::debug;

/// 推理指标收集器
#[derive(Clone)]
pub struct InferenceMetrics {
    /// Prometheus指标注册表
    registry: Registry,
    uploads_total: IntCounter,
    /// 按错误类别统计的失败次数
    upload_failures_total: IntCounterVec,
    inference_duration: Histogram,
    /// 按分类标签统计
    classifications_total: IntCounterVec,
}

impl InferenceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let uploads_total = IntCounter::with_opts(Opts::new(
            "triage_uploads_total",
            "Total number of scan uploads received",
        ))?;

        let upload_failures_total = IntCounterVec::new(
            Opts::new(
                "triage_upload_failures_total",
                "Total number of failed scan uploads",
            ),
            &["kind"],
        )?;

        let inference_duration = Histogram::with_opts(
            HistogramOpts::new(
                "triage_inference_duration_seconds",
                "Decode and inference duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        let classifications_total = IntCounterVec::new(
            Opts::new(
                "triage_classifications_total",
                "Total number of predictions per classification label",
            ),
            &["label"],
        )?;

        // 注册所有指标
        registry.register(Box::new(uploads_total.clone()))?;
        registry.register(Box::new(upload_failures_total.clone()))?;
        registry.register(Box::new(inference_duration.clone()))?;
        registry.register(Box::new(classifications_total.clone()))?;

        Ok(Self {
            registry,
            uploads_total,
            upload_failures_total,
            inference_duration,
            classifications_total,
        })
    }

    pub fn record_upload(&self) {
        self.uploads_total.inc();
    }

    /// `kind` 取错误类别，如 `decode`、`inference`
    pub fn record_failure(&self, kind: &str) {
        self.upload_failures_total.with_label_values(&[kind]).inc();
        debug!("记录上传失败: {}", kind);
    }

    pub fn record_inference(&self, label: &str, duration: Duration) {
        self.inference_duration.observe(duration.as_secs_f64());
        self.classifications_total.with_label_values(&[label]).inc();
    }

    /// 获取Prometheus格式的指标
    pub fn render(&self) -> Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}
