//! 试验数据预处理器
//!
//! 把原始力-位移样本整理为 [`CleanedSeries`]：
//!
//! 1. **剔除非有限值**：NaN/∞ 样本直接丢弃并计数
//! 2. **近零归零**：|D| < 位移阈值、|F| < 荷载阈值的分量置0
//!    （阈值 = max(下限, 0.1% × 量程)，见 [`NoiseThresholds`]）
//! 3. **容差去重**：连续样本位移差在 ½位移阈值 内视为同一点，保留 |F| 最大者。
//!    去重只在相邻样本间进行，不同单调段上位移相同的样本互不影响
//! 4. **零点偏移修正**：首个 |D| > 2×位移阈值 或 |F| > 2×荷载阈值 的样本为加载起点，
//!    起点之前的静止位移视为偏移量，整体扣除
//!
//! 所有步骤单遍完成，结果附带 [`PreprocessReport`] 供报告输出。

use crate::core::sample::{CleanedSeries, NoiseThresholds, Sample};
use crate::tools::constants::preprocess as consts;
use serde::Serialize;

/// 预处理配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreprocessConfig {
    /// 是否启用预处理（禁用时只剔除非有限值）
    pub enabled: bool,
    pub snap_near_zero: bool,
    pub deduplicate: bool,
    pub correct_zero_offset: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snap_near_zero: true,
            deduplicate: true,
            correct_zero_offset: true,
        }
    }
}

impl PreprocessConfig {
    /// 创建禁用配置
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// 预处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PreprocessStats {
    pub input_samples: usize,
    pub output_samples: usize,
    pub non_finite_dropped: usize,
    pub snapped_displacements: usize,
    pub snapped_forces: usize,
    pub duplicates_removed: usize,
    /// 扣除的零点偏移量（未修正为 None）
    pub offset_applied: Option<f64>,
}

/// 预处理报告（包含配置、阈值与统计）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreprocessReport {
    pub config: PreprocessConfig,
    pub thresholds: NoiseThresholds,
    pub stats: PreprocessStats,
}

impl PreprocessReport {
    /// 是否有任何样本被修改或删除
    pub fn changed_anything(&self) -> bool {
        let s = &self.stats;
        s.non_finite_dropped > 0
            || s.snapped_displacements > 0
            || s.snapped_forces > 0
            || s.duplicates_removed > 0
            || s.offset_applied.is_some()
    }
}

/// 预处理器
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// 执行预处理
    pub fn process(&self, raw: &[Sample]) -> (CleanedSeries, PreprocessReport) {
        let mut stats = PreprocessStats {
            input_samples: raw.len(),
            ..PreprocessStats::default()
        };

        let mut samples: Vec<Sample> = raw.iter().copied().filter(Sample::is_finite).collect();
        stats.non_finite_dropped = raw.len() - samples.len();

        let thresholds = NoiseThresholds::from_samples(&samples);

        if self.config.enabled {
            if self.config.snap_near_zero {
                self.snap_near_zero(&mut samples, &thresholds, &mut stats);
            }
            if self.config.deduplicate {
                samples = self.deduplicate(samples, &thresholds, &mut stats);
            }
            if self.config.correct_zero_offset {
                self.correct_zero_offset(&mut samples, &thresholds, &mut stats);
            }
        }

        stats.output_samples = samples.len();
        log::debug!(
            "预处理: 输入={}, 输出={}, 非有限={}, 归零(D/F)={}/{}, 去重={}, 偏移={:?}",
            stats.input_samples,
            stats.output_samples,
            stats.non_finite_dropped,
            stats.snapped_displacements,
            stats.snapped_forces,
            stats.duplicates_removed,
            stats.offset_applied
        );

        let report = PreprocessReport {
            config: self.config,
            thresholds,
            stats,
        };
        (CleanedSeries::from_samples(samples), report)
    }

    fn snap_near_zero(
        &self,
        samples: &mut [Sample],
        thresholds: &NoiseThresholds,
        stats: &mut PreprocessStats,
    ) {
        for s in samples.iter_mut() {
            if s.displacement != 0.0 && s.displacement.abs() < thresholds.displacement {
                s.displacement = 0.0;
                stats.snapped_displacements += 1;
            }
            if s.force != 0.0 && s.force.abs() < thresholds.force {
                s.force = 0.0;
                stats.snapped_forces += 1;
            }
        }
    }

    /// 相邻近重复样本合并：以组内首个样本的位移为基准，保留 |F| 最大者
    fn deduplicate(
        &self,
        samples: Vec<Sample>,
        thresholds: &NoiseThresholds,
        stats: &mut PreprocessStats,
    ) -> Vec<Sample> {
        let tolerance = thresholds.displacement * consts::DEDUP_TOLERANCE_FACTOR;
        let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
        let mut anchor = f64::NAN;

        for s in samples {
            match out.last_mut() {
                Some(kept) if (s.displacement - anchor).abs() <= tolerance => {
                    if s.force.abs() > kept.force.abs() {
                        *kept = s;
                    }
                    stats.duplicates_removed += 1;
                }
                _ => {
                    anchor = s.displacement;
                    out.push(s);
                }
            }
        }
        out
    }

    fn correct_zero_offset(
        &self,
        samples: &mut [Sample],
        thresholds: &NoiseThresholds,
        stats: &mut PreprocessStats,
    ) {
        let d_limit = consts::LOADING_START_FACTOR * thresholds.displacement;
        let f_limit = consts::LOADING_START_FACTOR * thresholds.force;

        let Some(start) = samples
            .iter()
            .position(|s| s.displacement.abs() > d_limit || s.force.abs() > f_limit)
        else {
            return;
        };
        if start == 0 {
            return;
        }

        let offset = samples[start - 1].displacement;
        if offset == 0.0 {
            return;
        }
        for s in samples.iter_mut() {
            s.displacement -= offset;
        }
        stats.offset_applied = Some(offset);
    }
}
