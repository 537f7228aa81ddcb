//! 基础数据结构
//!
//! 力-位移样本、清洗后序列、方向与方向过滤器、双向结果容器。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 单个力-位移样本，序列顺序即试验时间顺序
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub displacement: f64,
    pub force: f64,
}

impl Sample {
    #[inline]
    pub const fn new(displacement: f64, force: f64) -> Self {
        Self {
            displacement,
            force,
        }
    }

    /// 两个分量都是有限值
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.displacement.is_finite() && self.force.is_finite()
    }

    /// 取绝对值（用于负向骨架分支的镜像计算）
    #[inline]
    pub fn magnitude(&self) -> Self {
        Self::new(self.displacement.abs(), self.force.abs())
    }
}

impl From<(f64, f64)> for Sample {
    fn from((displacement, force): (f64, f64)) -> Self {
        Self::new(displacement, force)
    }
}

/// 骨架曲线上的点
pub type CurvePoint = Sample;

/// 有序样本序列（预处理输出，分析引擎输入）
///
/// 经过预处理器时满足：同一单调段内位移不重复（容差内），近零噪声已归零。
/// 未经预处理直接构造时（`--no-preprocess`）只保证顺序。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CleanedSeries {
    samples: Vec<Sample>,
}

impl CleanedSeries {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// 从 (位移, 荷载) 元组构造
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::from_samples(pairs.iter().copied().map(Sample::from).collect())
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    /// 最大位移幅值 max|D|（空序列为0）
    pub fn max_abs_displacement(&self) -> f64 {
        max_abs_displacement(&self.samples)
    }
}

/// 最大位移幅值
pub fn max_abs_displacement(samples: &[Sample]) -> f64 {
    samples
        .iter()
        .map(|s| s.displacement.abs())
        .fold(0.0, f64::max)
}

/// 位移/荷载噪声阈值
///
/// 阈值 = max(下限, 比例 × 量程)，量程 = max|x| − min|x|。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoiseThresholds {
    pub displacement: f64,
    pub force: f64,
}

impl NoiseThresholds {
    pub fn from_samples(samples: &[Sample]) -> Self {
        use crate::tools::constants::preprocess as consts;

        let range = |values: &mut dyn Iterator<Item = f64>| {
            let (lo, hi) = values.fold((f64::INFINITY, 0.0_f64), |(lo, hi), v| {
                (lo.min(v.abs()), hi.max(v.abs()))
            });
            if lo.is_finite() { hi - lo } else { 0.0 }
        };

        let d_range = range(&mut samples.iter().map(|s| s.displacement));
        let f_range = range(&mut samples.iter().map(|s| s.force));

        Self {
            displacement: (consts::DISP_NOISE_RATIO * d_range).max(consts::DISP_NOISE_FLOOR),
            force: (consts::FORCE_NOISE_RATIO * f_range).max(consts::FORCE_NOISE_FLOOR),
        }
    }
}

/// 加载方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// 位移值所属方向（0归正向）
    #[inline]
    pub fn of(displacement: f64) -> Self {
        if displacement < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }

    /// 值是否严格位于本方向一侧
    #[inline]
    pub fn contains(self, displacement: f64) -> bool {
        match self {
            Self::Positive => displacement > 0.0,
            Self::Negative => displacement < 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "正向",
            Self::Negative => "负向",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// 方向过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionFilter {
    #[default]
    Both,
    Positive,
    Negative,
}

impl DirectionFilter {
    #[inline]
    pub fn includes(self, direction: Direction) -> bool {
        match self {
            Self::Both => true,
            Self::Positive => direction == Direction::Positive,
            Self::Negative => direction == Direction::Negative,
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "positive" | "pos" => Ok(Self::Positive),
            "negative" | "neg" => Ok(Self::Negative),
            other => Err(format!(
                "未知方向 / unknown direction: {other} (both|positive|negative)"
            )),
        }
    }
}

impl fmt::Display for DirectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Both => "both",
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// 正负两向各一份的值
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sided<T> {
    pub positive: T,
    pub negative: T,
}

impl<T> Sided<T> {
    pub const fn new(positive: T, negative: T) -> Self {
        Self { positive, negative }
    }

    /// 对两个方向分别求值
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self {
            positive: f(Direction::Positive),
            negative: f(Direction::Negative),
        }
    }

    #[inline]
    pub fn get(&self, direction: Direction) -> &T {
        match direction {
            Direction::Positive => &self.positive,
            Direction::Negative => &self.negative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_filter_parse() {
        assert_eq!("both".parse::<DirectionFilter>(), Ok(DirectionFilter::Both));
        assert_eq!(
            "Negative".parse::<DirectionFilter>(),
            Ok(DirectionFilter::Negative)
        );
        assert!("sideways".parse::<DirectionFilter>().is_err());
        assert!(DirectionFilter::Positive.includes(Direction::Positive));
        assert!(!DirectionFilter::Positive.includes(Direction::Negative));
    }

    #[test]
    fn test_series_max_abs_displacement() {
        let series = CleanedSeries::from_pairs(&[(0.0, 0.0), (4.0, 1.0), (-7.5, -2.0)]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.max_abs_displacement(), 7.5);
        assert_eq!(CleanedSeries::default().max_abs_displacement(), 0.0);
    }

    #[test]
    fn test_sided_from_fn() {
        let sided = Sided::from_fn(|d| d.sign() * 2.0);
        assert_eq!(sided.positive, 2.0);
        assert_eq!(*sided.get(Direction::Negative), -2.0);
        assert_eq!(Direction::of(-0.1), Direction::Negative);
        assert_eq!(Direction::of(0.0), Direction::Positive);
    }
}
