//! 指标计算模块
//!
//! 由清洗后序列与滞回环列表计算完整指标集：位移、刚度、耗能、阻尼、退化。
//! 每个指标独立求值，失败以 [`MetricError`] 记录在对应字段中，不影响其他指标。
//!
//! 双向模式下正负两向分别报告，从不取平均。

use super::loops::{HysteresisLoop, find_turning_points, reversal_threshold};
use super::numeric::least_squares_slope;
use super::sample::{CleanedSeries, Direction, DirectionFilter, NoiseThresholds, Sample, Sided};
use crate::error::{Metric, MetricError};
use crate::tools::constants::metrics as consts;
use serde::{Deserialize, Serialize};

/// 初始刚度拟合窗口策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StiffnessWindow {
    /// 序列长度的1/10，限制在 [min, max] 之间
    Adaptive { min: usize, max: usize },
    /// 序列长度的固定比例
    Fraction(f64),
    /// 固定样本数
    Fixed(usize),
}

impl Default for StiffnessWindow {
    fn default() -> Self {
        Self::Adaptive {
            min: consts::STIFFNESS_WINDOW_MIN,
            max: consts::STIFFNESS_WINDOW_MAX,
        }
    }
}

impl StiffnessWindow {
    /// 给定序列长度时的窗口样本数
    pub fn window_len(self, series_len: usize) -> usize {
        match self {
            Self::Adaptive { min, max } => (series_len / 10).clamp(min, max.max(min)),
            Self::Fraction(ratio) => ((series_len as f64 * ratio).round() as usize).max(2),
            Self::Fixed(n) => n,
        }
    }
}

/// 等效阻尼计算所用的滞回环
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DampingLoop {
    /// 该方向耗能最大的环
    #[default]
    Largest,
    /// 该方向第 n 个环（按时间顺序，从0开始）
    Index(usize),
}

/// 指标计算配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub direction: DirectionFilter,
    pub stiffness_window: StiffnessWindow,
    pub damping_loop: DampingLoop,
    pub reversal_tolerance: f64,
}

/// 耗能统计（纳入分析方向的环）
///
/// 环数统计全部环；耗能只统计闭合环，开口尾环的面积是卸载段的可恢复应变能。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyStats {
    pub total: Metric,
    pub average: Metric,
    pub max: Metric,
    pub min: Metric,
    pub positive_loops: usize,
    pub negative_loops: usize,
}

/// 完整指标集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub peak_displacement: Sided<Metric>,
    pub peak_force: Sided<Metric>,
    pub residual_displacement: Metric,
    pub initial_stiffness: Metric,
    pub secant_stiffness: Sided<Metric>,
    /// |K_sec| > |K₀| 的标记（异常数据提示，不截断）
    pub secant_exceeds_initial: Sided<bool>,
    pub energy: EnergyStats,
    pub damping_ratio: Sided<Metric>,
    /// 强度退化（%）
    pub strength_degradation: Sided<Metric>,
    /// 刚度退化（%）
    pub stiffness_degradation: Sided<Metric>,
}

/// 计算完整指标集
pub fn compute_metrics(
    series: &CleanedSeries,
    loops: &[HysteresisLoop],
    config: &MetricsConfig,
) -> MetricSet {
    let samples = series.samples();
    let filter = config.direction;

    // 仅对纳入分析的方向求值，排除方向统一返回 NotApplicable
    let sided = |f: &dyn Fn(Direction) -> Metric| {
        Sided::from_fn(|direction| {
            if filter.includes(direction) {
                f(direction)
            } else {
                Err(MetricError::excluded(direction.label()))
            }
        })
    };

    let peak_displacement = sided(&|d| peak_displacement_of(samples, d));
    let peak_force = sided(&|d| peak_force_of(samples, d));
    let residual_displacement = samples
        .last()
        .map(|s| s.displacement)
        .ok_or_else(|| MetricError::InsufficientData("序列为空".to_string()));
    let initial_stiffness = initial_stiffness(
        samples,
        config.stiffness_window,
        config.reversal_tolerance,
    );

    let secant_stiffness = sided(&|d| {
        let disp = peak_displacement.get(d).clone()?;
        let force = peak_force.get(d).clone()?;
        if disp == 0.0 {
            return Err(MetricError::DegenerateGeometry("峰值位移为零".to_string()));
        }
        Ok(force / disp)
    });

    let secant_exceeds_initial =
        Sided::from_fn(|d| match (secant_stiffness.get(d), &initial_stiffness) {
            (Ok(k_sec), Ok(k0)) => k_sec.abs() > k0.abs(),
            _ => false,
        });

    let in_scope: Vec<&HysteresisLoop> = loops
        .iter()
        .filter(|hl| filter.includes(hl.direction))
        .collect();
    let energy = energy_stats(&in_scope);

    let damping_ratio = sided(&|d| damping_ratio_of(&in_scope, d, config.damping_loop));
    let strength_degradation = sided(&|d| strength_degradation_of(&in_scope, d));
    let stiffness_degradation = sided(&|d| {
        let k0 = initial_stiffness.clone()?.abs();
        let k_sec = secant_stiffness.get(d).clone()?.abs();
        if k0 == 0.0 {
            return Err(MetricError::DegenerateGeometry("初始刚度为零".to_string()));
        }
        Ok((k0 - k_sec) / k0 * 100.0)
    });

    MetricSet {
        peak_displacement,
        peak_force,
        residual_displacement,
        initial_stiffness,
        secant_stiffness,
        secant_exceeds_initial,
        energy,
        damping_ratio,
        strength_degradation,
        stiffness_degradation,
    }
}

fn peak_displacement_of(samples: &[Sample], direction: Direction) -> Metric {
    let displacements = samples.iter().map(|s| s.displacement);
    let extreme = match direction {
        Direction::Positive => displacements.fold(f64::NEG_INFINITY, f64::max),
        Direction::Negative => displacements.fold(f64::INFINITY, f64::min),
    };
    if direction.contains(extreme) {
        Ok(extreme)
    } else {
        Err(MetricError::InsufficientData(format!(
            "{}无位移数据",
            direction.label()
        )))
    }
}

fn peak_force_of(samples: &[Sample], direction: Direction) -> Metric {
    if samples.is_empty() {
        return Err(MetricError::InsufficientData("序列为空".to_string()));
    }
    let forces = samples.iter().map(|s| s.force);
    Ok(match direction {
        Direction::Positive => forces.fold(f64::NEG_INFINITY, f64::max),
        Direction::Negative => forces.fold(f64::INFINITY, f64::min),
    })
}

/// 初始刚度 K₀
///
/// 从第一个同时超过位移/荷载噪声阈值的样本开始，截至首个反向点，
/// 剔除 |D| 低于噪声阈值的样本后取窗口内样本做最小二乘拟合。
pub fn initial_stiffness(
    samples: &[Sample],
    window: StiffnessWindow,
    reversal_tolerance: f64,
) -> Metric {
    let noise = NoiseThresholds::from_samples(samples);

    let start = samples
        .iter()
        .position(|s| s.force.abs() > noise.force && s.displacement.abs() > noise.displacement)
        .ok_or_else(|| {
            MetricError::InsufficientData("没有超过噪声阈值的加载样本".to_string())
        })?;

    let tolerance = reversal_threshold(samples, reversal_tolerance);
    let end = find_turning_points(samples, tolerance)
        .iter()
        .map(|tp| tp.index)
        .find(|&i| i >= start)
        .unwrap_or(samples.len() - 1);

    let n = window.window_len(samples.len());
    let fit: Vec<Sample> = samples[start..=end]
        .iter()
        .filter(|s| s.displacement.abs() >= noise.displacement)
        .take(n)
        .copied()
        .collect();

    log::debug!("初始刚度: 起点={start}, 截止={end}, 窗口={n}, 拟合点={}", fit.len());
    least_squares_slope(&fit)
}

fn energy_stats(loops: &[&HysteresisLoop]) -> EnergyStats {
    let positive_loops = loops
        .iter()
        .filter(|hl| hl.direction == Direction::Positive)
        .count();
    let negative_loops = loops.len() - positive_loops;

    let energies: Vec<f64> = loops
        .iter()
        .filter(|hl| hl.closed)
        .map(|hl| hl.energy)
        .collect();

    if energies.is_empty() {
        let reason = if loops.is_empty() {
            "没有滞回环"
        } else {
            "没有闭合滞回环"
        };
        let none = || Err(MetricError::InsufficientData(reason.to_string()));
        return EnergyStats {
            total: none(),
            average: none(),
            max: none(),
            min: none(),
            positive_loops,
            negative_loops,
        };
    }

    let total: f64 = energies.iter().sum();
    let max = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = energies.iter().copied().fold(f64::INFINITY, f64::min);

    EnergyStats {
        total: Ok(total),
        average: Ok(total / energies.len() as f64),
        max: Ok(max),
        min: Ok(min),
        positive_loops,
        negative_loops,
    }
}

/// 等效粘滞阻尼系数 ξ = E_D / (2π · ½|D_peak · F_peak|)
///
/// 候选环为该方向的闭合环，`DampingLoop::Index` 按闭合环计序。
fn damping_ratio_of(
    loops: &[&HysteresisLoop],
    direction: Direction,
    selection: DampingLoop,
) -> Metric {
    let own: Vec<&HysteresisLoop> = loops
        .iter()
        .copied()
        .filter(|hl| hl.direction == direction && hl.closed)
        .collect();

    let chosen = match selection {
        DampingLoop::Largest => own
            .iter()
            .copied()
            .max_by(|a, b| a.energy.total_cmp(&b.energy))
            .ok_or_else(|| {
                MetricError::InsufficientData(format!("{}没有闭合滞回环", direction.label()))
            })?,
        DampingLoop::Index(i) => own.get(i).copied().ok_or_else(|| {
            MetricError::InvalidConfiguration(format!(
                "{}只有{}个闭合环，序号{i}越界",
                direction.label(),
                own.len()
            ))
        })?,
    };

    let elastic = 0.5 * (chosen.peak_displacement * chosen.peak_force).abs();
    if elastic == 0.0 {
        return Err(MetricError::DegenerateGeometry(format!(
            "第{}个环弹性应变能为零",
            chosen.index + 1
        )));
    }
    Ok(chosen.energy / (consts::DAMPING_DENOMINATOR * elastic))
}

/// 强度退化：同方向首末两个环峰值荷载的相对下降（%）
fn strength_degradation_of(loops: &[&HysteresisLoop], direction: Direction) -> Metric {
    let mut own = loops.iter().filter(|hl| hl.direction == direction);
    let first = own.next();
    let last = own.last();

    let (Some(first), Some(last)) = (first, last) else {
        return Err(MetricError::InsufficientData(format!(
            "{}滞回环少于2个",
            direction.label()
        )));
    };

    let f_first = first.peak_force.abs();
    if f_first == 0.0 {
        return Err(MetricError::DegenerateGeometry("首环峰值荷载为零".to_string()));
    }
    Ok((f_first - last.peak_force.abs()) / f_first * 100.0)
}
