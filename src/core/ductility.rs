//! 延性系数计算模块
//!
//! 七种屈服位移判定方法，每种方法对应一个纯函数，由 [`DuctilityMethod`] 分派。
//! 输入为骨架曲线分支（取幅值）以及指标集中的峰值荷载、峰值位移和初始刚度；
//! 延性系数 μ = |D_peak| / |D_yield|。
//!
//! 任何方法失败都只影响该方向的结果，原因以 [`MetricError`] 返回：
//! - 方向被排除 → `NotApplicable`
//! - 骨架分支少于2个点、阈值从未达到 → `InsufficientData`
//! - F_peak ≤ 0、D_yield ≤ 0、μ < 1 → `DegenerateGeometry`
//! - EEEP迭代超限 → `NoConvergence`

use super::metrics::MetricSet;
use super::numeric::{bisect, first_force_crossing, trapezoid_area};
use super::sample::{CurvePoint, Direction, DirectionFilter};
use super::skeleton::SkeletonCurve;
use crate::error::MetricError;
use crate::tools::constants::ductility as consts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 屈服位移判定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuctilityMethod {
    /// 几何作图法：骨架曲线首次达到 0.75·F_peak
    Geometric,
    /// 能量法：2·面积 / F_peak
    Energy,
    /// Park法：割线刚度降至 K₀/3
    Park,
    /// 最远点法：距原点-峰值点连线最远的骨架点
    Farthest,
    /// ASCE法：骨架曲线首次达到 0.60·F_peak
    Asce,
    /// 等效能量弹塑性（EEEP）双折线
    Eeep,
    /// 弹性屈服法：F_peak / K₀
    #[default]
    ElasticYield,
}

impl DuctilityMethod {
    pub const ALL: [Self; 7] = [
        Self::Geometric,
        Self::Energy,
        Self::Park,
        Self::Farthest,
        Self::Asce,
        Self::Eeep,
        Self::ElasticYield,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Geometric => "几何作图法 / Geometric",
            Self::Energy => "能量法 / Energy",
            Self::Park => "Park法 / Park",
            Self::Farthest => "最远点法 / Farthest Point",
            Self::Asce => "ASCE法 / ASCE",
            Self::Eeep => "EEEP法 / EEEP",
            Self::ElasticYield => "弹性屈服法 / Elastic Yield",
        }
    }

    /// 该方法是否依赖初始刚度 K₀
    pub fn needs_initial_stiffness(self) -> bool {
        matches!(self, Self::Park | Self::ElasticYield)
    }
}

impl FromStr for DuctilityMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geometric" => Ok(Self::Geometric),
            "energy" => Ok(Self::Energy),
            "park" => Ok(Self::Park),
            "farthest" => Ok(Self::Farthest),
            "asce" => Ok(Self::Asce),
            "eeep" => Ok(Self::Eeep),
            "elastic-yield" | "elastic" => Ok(Self::ElasticYield),
            other => Err(format!(
                "未知延性方法 / unknown ductility method: {other} \
                 (geometric|energy|park|farthest|asce|eeep|elastic-yield)"
            )),
        }
    }
}

impl fmt::Display for DuctilityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Geometric => "geometric",
            Self::Energy => "energy",
            Self::Park => "park",
            Self::Farthest => "farthest",
            Self::Asce => "asce",
            Self::Eeep => "eeep",
            Self::ElasticYield => "elastic-yield",
        })
    }
}

/// EEEP二分求解参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EeepConfig {
    /// 等面积残差的相对容差
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for EeepConfig {
    fn default() -> Self {
        Self {
            tolerance: consts::EEEP_TOLERANCE,
            max_iterations: consts::EEEP_MAX_ITERATIONS,
        }
    }
}

/// 单方向的延性计算结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuctilityValue {
    /// 屈服位移（带分支符号）
    pub yield_displacement: f64,
    pub ductility_ratio: f64,
}

pub type DuctilityOutcome = Result<DuctilityValue, MetricError>;

/// 某一方法的双向延性结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuctilityResult {
    pub method: DuctilityMethod,
    pub positive: DuctilityOutcome,
    pub negative: DuctilityOutcome,
}

impl DuctilityResult {
    /// 按指定方法计算双向延性
    pub fn evaluate(
        method: DuctilityMethod,
        skeleton: &SkeletonCurve,
        metrics: &MetricSet,
        filter: DirectionFilter,
        eeep: &EeepConfig,
    ) -> Self {
        let side = |direction: Direction| {
            if !filter.includes(direction) {
                return Err(MetricError::excluded(direction.label()));
            }
            evaluate_side(method, direction, skeleton, metrics, eeep)
        };

        Self {
            method,
            positive: side(Direction::Positive),
            negative: side(Direction::Negative),
        }
    }

    /// 全部七种方法（报告"全部方法"表使用）
    pub fn evaluate_all(
        skeleton: &SkeletonCurve,
        metrics: &MetricSet,
        filter: DirectionFilter,
        eeep: &EeepConfig,
    ) -> Vec<Self> {
        DuctilityMethod::ALL
            .iter()
            .map(|&method| Self::evaluate(method, skeleton, metrics, filter, eeep))
            .collect()
    }

    #[inline]
    pub fn side(&self, direction: Direction) -> &DuctilityOutcome {
        match direction {
            Direction::Positive => &self.positive,
            Direction::Negative => &self.negative,
        }
    }
}

/// 单方向求值所需的幅值化输入
struct SideInput<'a> {
    branch: &'a [CurvePoint],
    d_peak: f64,
    f_peak: f64,
}

fn evaluate_side(
    method: DuctilityMethod,
    direction: Direction,
    skeleton: &SkeletonCurve,
    metrics: &MetricSet,
    eeep: &EeepConfig,
) -> DuctilityOutcome {
    let branch = skeleton.magnitude_branch(direction);
    if branch.len() < 2 {
        return Err(MetricError::InsufficientData(format!(
            "{}骨架曲线点数不足（{}）",
            direction.label(),
            branch.len()
        )));
    }

    // 按方向符号取幅值；符号与方向相反的峰值荷载视为非正
    let sign = direction.sign();
    let d_peak = sign * metrics.peak_displacement.get(direction).clone()?;
    let f_peak = sign * metrics.peak_force.get(direction).clone()?;
    if f_peak <= 0.0 {
        return Err(MetricError::DegenerateGeometry(format!(
            "{}峰值荷载非正（{:.4}）",
            direction.label(),
            f_peak
        )));
    }

    let input = SideInput {
        branch: &branch,
        d_peak,
        f_peak,
    };

    let d_yield = match method {
        DuctilityMethod::Geometric => force_ratio_yield(&input, consts::GEOMETRIC_YIELD_RATIO),
        DuctilityMethod::Energy => energy_yield(&input),
        DuctilityMethod::Park => park_yield(&input, metrics.initial_stiffness.clone()?.abs()),
        DuctilityMethod::Farthest => farthest_point_yield(&input),
        DuctilityMethod::Asce => force_ratio_yield(&input, consts::ASCE_YIELD_RATIO),
        DuctilityMethod::Eeep => eeep_yield(&input, eeep),
        DuctilityMethod::ElasticYield => {
            elastic_yield(&input, metrics.initial_stiffness.clone()?.abs())
        }
    }?;

    log::debug!(
        "延性({method}, {direction}): D_y={d_yield:.4}, D_peak={d_peak:.4}, F_peak={f_peak:.4}"
    );

    if !d_yield.is_finite() || d_yield <= 0.0 {
        return Err(MetricError::DegenerateGeometry(format!(
            "屈服位移非正（{d_yield:.4}）"
        )));
    }
    if d_yield > d_peak * (1.0 + consts::YIELD_OVERSHOOT_EPSILON) {
        return Err(MetricError::DegenerateGeometry(format!(
            "屈服位移 {d_yield:.4} 超过峰值位移 {d_peak:.4}（μ < 1）"
        )));
    }

    Ok(DuctilityValue {
        yield_displacement: sign * d_yield,
        ductility_ratio: d_peak / d_yield,
    })
}

/// 几何作图法 / ASCE法：首次达到 ratio·F_peak 的位移
fn force_ratio_yield(input: &SideInput, ratio: f64) -> Result<f64, MetricError> {
    let target = ratio * input.f_peak;
    first_force_crossing(input.branch, target).ok_or_else(|| {
        MetricError::InsufficientData(format!(
            "骨架曲线未达到 {:.0}% 峰值荷载",
            ratio * 100.0
        ))
    })
}

fn energy_yield(input: &SideInput) -> Result<f64, MetricError> {
    Ok(2.0 * trapezoid_area(input.branch) / input.f_peak)
}

/// Park法：割线刚度 F/D 首次降至 K₀/3，在线段上闭式插值
fn park_yield(input: &SideInput, k0: f64) -> Result<f64, MetricError> {
    if k0 == 0.0 {
        return Err(MetricError::DegenerateGeometry("初始刚度为零".to_string()));
    }
    let k_target = k0 / consts::PARK_STIFFNESS_DIVISOR;
    let branch = input.branch;

    let secant = |p: &CurvePoint| (p.displacement > 0.0).then(|| p.force / p.displacement);

    let idx = branch
        .iter()
        .position(|p| secant(p).is_some_and(|k| k <= k_target))
        .ok_or_else(|| {
            MetricError::InsufficientData("割线刚度未降至 K₀/3".to_string())
        })?;

    let (prev, cur) = match idx.checked_sub(1).map(|i| branch[i]) {
        Some(prev) if prev.displacement > 0.0 => (prev, branch[idx]),
        _ => return Ok(branch[idx].displacement),
    };

    // F(t)/D(t) = k  →  t = (k·D₀ − F₀) / (ΔF − k·ΔD)
    let dd = cur.displacement - prev.displacement;
    let df = cur.force - prev.force;
    let denom = df - k_target * dd;
    if denom.abs() < f64::EPSILON {
        return Ok(cur.displacement);
    }
    let t = ((k_target * prev.displacement - prev.force) / denom).clamp(0.0, 1.0);
    Ok(prev.displacement + t * dd)
}

/// 最远点法：距 (0,0)→(D_peak, F_peak) 连线垂直距离最大的骨架点
fn farthest_point_yield(input: &SideInput) -> Result<f64, MetricError> {
    let (dp, fp) = (input.d_peak, input.f_peak);
    let norm = (dp * dp + fp * fp).sqrt();

    let (best, distance) = input
        .branch
        .iter()
        .map(|p| (p, (fp * p.displacement - dp * p.force).abs() / norm))
        .fold((None, 0.0), |(best, max), (p, dist)| {
            if dist > max { (Some(p), dist) } else { (best, max) }
        });

    match best {
        Some(p) if distance > f64::EPSILON * norm => Ok(p.displacement),
        _ => Err(MetricError::DegenerateGeometry(
            "骨架点全部位于原点-峰值连线上".to_string(),
        )),
    }
}

/// EEEP：二分求解 F_peak·(D_peak − D_y/2) = 骨架曲线面积
fn eeep_yield(input: &SideInput, config: &EeepConfig) -> Result<f64, MetricError> {
    let area = trapezoid_area(input.branch);
    if area <= 0.0 {
        return Err(MetricError::DegenerateGeometry(
            "骨架曲线面积非正".to_string(),
        ));
    }

    let (dp, fp) = (input.d_peak, input.f_peak);
    let equal_area = |d_y: f64| fp * (dp - 0.5 * d_y) - area;
    bisect(
        equal_area,
        0.0,
        dp,
        config.tolerance * area,
        config.max_iterations,
    )
}

fn elastic_yield(input: &SideInput, k0: f64) -> Result<f64, MetricError> {
    if k0 == 0.0 {
        return Err(MetricError::DegenerateGeometry("初始刚度为零".to_string()));
    }
    Ok(input.f_peak / k0)
}
