//! 分析入口
//!
//! `analyze(series, config)` 串联 滞回环提取 → 骨架曲线 → {指标, 延性}，
//! 单次调用是一个完整、同步、纯函数式的分析过程。
//!
//! [`AnalysisSession`] 提供单槽缓存：输入序列与配置都不变时直接复用上次结果，
//! 任一改变则整体重算。

use super::ductility::{DuctilityMethod, DuctilityResult, EeepConfig};
use super::loops::{HysteresisLoop, LoopConfig, extract_loops};
use super::metrics::{DampingLoop, MetricSet, MetricsConfig, StiffnessWindow, compute_metrics};
use super::sample::{CleanedSeries, DirectionFilter, Sample};
use super::skeleton::{SkeletonCurve, SkeletonMethod, build_skeleton};
use crate::error::{AnalysisError, HysResult};
use crate::tools::constants::loops as loop_consts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 分析配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub direction: DirectionFilter,
    pub skeleton_method: SkeletonMethod,
    pub first_loop_only: bool,
    pub ductility_method: DuctilityMethod,
    pub stiffness_window: StiffnessWindow,
    pub damping_loop: DampingLoop,
    pub eeep: EeepConfig,
    /// 仅首圈模式的同级判定相对容差
    pub level_tolerance: f64,
    /// 反向识别容差（相对 max|D|）
    pub reversal_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            direction: DirectionFilter::Both,
            skeleton_method: SkeletonMethod::OuterEnvelope,
            first_loop_only: false,
            ductility_method: DuctilityMethod::ElasticYield,
            stiffness_window: StiffnessWindow::default(),
            damping_loop: DampingLoop::Largest,
            eeep: EeepConfig::default(),
            level_tolerance: loop_consts::LEVEL_TOLERANCE,
            reversal_tolerance: loop_consts::REVERSAL_TOLERANCE,
        }
    }
}

impl AnalysisConfig {
    fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            reversal_tolerance: self.reversal_tolerance,
            first_loop_only: self.first_loop_only,
            level_tolerance: self.level_tolerance,
        }
    }

    fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            direction: self.direction,
            stiffness_window: self.stiffness_window,
            damping_loop: self.damping_loop,
            reversal_tolerance: self.reversal_tolerance,
        }
    }
}

/// 一次完整分析的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub config: AnalysisConfig,
    /// 参与分析的有效样本数
    pub sample_count: usize,
    pub loops: Vec<HysteresisLoop>,
    pub skeleton: SkeletonCurve,
    pub metrics: MetricSet,
    /// 所选方法的延性结果
    pub ductility: DuctilityResult,
}

impl AnalysisResult {
    /// 用同一骨架曲线与指标集计算全部七种延性方法
    pub fn all_ductility(&self) -> Vec<DuctilityResult> {
        DuctilityResult::evaluate_all(
            &self.skeleton,
            &self.metrics,
            self.config.direction,
            &self.config.eeep,
        )
    }
}

/// 执行一次完整分析
///
/// 非有限值样本被剔除（记录警告）；没有任何有效样本时返回 [`AnalysisError::NoValidSamples`]，
/// 这是唯一的硬失败。其余问题都以指标级错误记录在结果中。
pub fn analyze(series: &CleanedSeries, config: &AnalysisConfig) -> HysResult<AnalysisResult> {
    let finite: Vec<Sample> = series
        .samples()
        .iter()
        .copied()
        .filter(Sample::is_finite)
        .collect();

    let dropped = series.len() - finite.len();
    if dropped > 0 {
        log::warn!("剔除 {dropped} 个非有限值样本 / dropped {dropped} non-finite samples");
    }
    if finite.is_empty() {
        return Err(AnalysisError::NoValidSamples);
    }

    let series = CleanedSeries::from_samples(finite);

    let loops = extract_loops(&series, &config.loop_config());
    let skeleton = build_skeleton(
        config.skeleton_method,
        &series,
        &loops,
        config.direction,
        config.reversal_tolerance,
    );
    let metrics = compute_metrics(&series, &loops, &config.metrics_config());
    let ductility = DuctilityResult::evaluate(
        config.ductility_method,
        &skeleton,
        &metrics,
        config.direction,
        &config.eeep,
    );

    log::debug!(
        "分析完成: 样本={}, 环={}, 骨架方法={}, 延性方法={}",
        series.len(),
        loops.len(),
        config.skeleton_method,
        config.ductility_method
    );

    Ok(AnalysisResult {
        config: config.clone(),
        sample_count: series.len(),
        loops,
        skeleton,
        metrics,
        ductility,
    })
}

/// 单槽缓存的分析会话
///
/// 记住最近一次 (序列, 配置) 及其结果；再次以相同输入调用时返回同一个 `Arc`。
#[derive(Debug, Default)]
pub struct AnalysisSession {
    slot: Option<CachedAnalysis>,
}

#[derive(Debug)]
struct CachedAnalysis {
    series: CleanedSeries,
    config: AnalysisConfig,
    result: Arc<AnalysisResult>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分析（命中缓存时不重算）
    ///
    /// 失败的分析不写入缓存，也不保留旧结果。
    pub fn analyze(
        &mut self,
        series: &CleanedSeries,
        config: &AnalysisConfig,
    ) -> HysResult<Arc<AnalysisResult>> {
        if let Some(cached) = &self.slot
            && cached.series == *series
            && cached.config == *config
        {
            log::debug!("分析缓存命中");
            return Ok(Arc::clone(&cached.result));
        }

        self.slot = None;
        let result = Arc::new(analyze(series, config)?);
        self.slot = Some(CachedAnalysis {
            series: series.clone(),
            config: config.clone(),
            result: Arc::clone(&result),
        });
        Ok(result)
    }

    /// 清空缓存
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// 当前缓存的结果
    pub fn cached(&self) -> Option<Arc<AnalysisResult>> {
        self.slot.as_ref().map(|c| Arc::clone(&c.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;

    fn small_cycle() -> CleanedSeries {
        let d: Vec<f64> = (0..=10)
            .map(f64::from)
            .chain((0..20).map(|k| 9.0 - f64::from(k)))
            .chain((0..10).map(|k| -9.0 + f64::from(k)))
            .collect();
        let pairs: Vec<(f64, f64)> = d.iter().map(|&x| (x, 1.5 * x)).collect();
        CleanedSeries::from_pairs(&pairs)
    }

    #[test]
    fn test_analyze_rejects_series_without_finite_samples() {
        let empty = CleanedSeries::default();
        assert!(matches!(
            analyze(&empty, &AnalysisConfig::default()),
            Err(AnalysisError::NoValidSamples)
        ));

        let nan = CleanedSeries::from_pairs(&[(f64::NAN, 1.0), (2.0, f64::INFINITY)]);
        assert!(matches!(
            analyze(&nan, &AnalysisConfig::default()),
            Err(AnalysisError::NoValidSamples)
        ));
    }

    #[test]
    fn test_analyze_drops_non_finite_samples() {
        let mut samples = small_cycle().into_samples();
        samples.insert(5, Sample::new(f64::NAN, 0.0));
        let series = CleanedSeries::from_samples(samples);
        let result = analyze(&series, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.sample_count, small_cycle().len());
        assert_eq!(result, analyze(&small_cycle(), &AnalysisConfig::default()).unwrap());
    }

    #[test]
    fn test_single_sample_is_not_fatal() {
        let series = CleanedSeries::from_pairs(&[(1.0, 2.0)]);
        let result = analyze(&series, &AnalysisConfig::default()).unwrap();
        assert!(result.loops.is_empty());
        assert!(matches!(
            result.metrics.initial_stiffness,
            Err(MetricError::InsufficientData(_))
        ));
        assert!(result.ductility.positive.is_err());
    }

    #[test]
    fn test_session_caches_until_input_changes() {
        let series = small_cycle();
        let mut session = AnalysisSession::new();
        let config = AnalysisConfig::default();

        let first = session.analyze(&series, &config).unwrap();
        let second = session.analyze(&series, &config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let changed = AnalysisConfig {
            ductility_method: DuctilityMethod::Asce,
            ..config.clone()
        };
        let third = session.analyze(&series, &changed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.ductility.method, DuctilityMethod::Asce);

        session.invalidate();
        assert!(session.cached().is_none());
        let fourth = session.analyze(&series, &changed).unwrap();
        assert_eq!(*fourth, *third);
    }

    #[test]
    fn test_config_json_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"direction":"negative","ductility_method":"eeep"}"#).unwrap();
        assert_eq!(config.direction, DirectionFilter::Negative);
        assert_eq!(config.ductility_method, DuctilityMethod::Eeep);
        assert_eq!(config.skeleton_method, SkeletonMethod::OuterEnvelope);
        assert_eq!(config.eeep, EeepConfig::default());
    }
}
