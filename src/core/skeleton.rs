//! 骨架曲线构建模块
//!
//! 两种策略：
//! - **外包络法**（OuterEnvelope）：按时间顺序折叠滞回环峰值，只追加超过当前最大幅值的峰值，
//!   分支按 |D| 单调递增，并以该方向的试件峰值（全序列位移极值）收尾
//! - **峰值点法**（PeakPoints）：全序列所有超过阈值的转折点按时间顺序排列，保留锯齿形态；
//!   序列末尾未回载的极值也计入
//!
//! 被方向过滤排除的分支为空。

use super::loops::{
    Extremum, HysteresisLoop, find_turning_points, reversal_threshold, terminal_extreme,
};
use super::numeric::interpolate_force;
use super::sample::{CleanedSeries, CurvePoint, Direction, DirectionFilter, Sample, Sided};
use crate::tools::constants::skeleton as consts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 骨架曲线构建策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkeletonMethod {
    #[default]
    OuterEnvelope,
    PeakPoints,
}

impl SkeletonMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OuterEnvelope => "外包络法 / Outer Envelope",
            Self::PeakPoints => "峰值点法 / Peak Points",
        }
    }
}

impl FromStr for SkeletonMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "outer-envelope" | "envelope" => Ok(Self::OuterEnvelope),
            "peak-points" | "peaks" => Ok(Self::PeakPoints),
            other => Err(format!(
                "未知骨架方法 / unknown skeleton method: {other} (outer-envelope|peak-points)"
            )),
        }
    }
}

impl fmt::Display for SkeletonMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OuterEnvelope => "outer-envelope",
            Self::PeakPoints => "peak-points",
        })
    }
}

/// 骨架曲线：正负两个分支，各自以起点开头，保留原始符号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonCurve {
    pub method: SkeletonMethod,
    pub positive: Vec<CurvePoint>,
    pub negative: Vec<CurvePoint>,
}

impl SkeletonCurve {
    #[inline]
    pub fn branch(&self, direction: Direction) -> &[CurvePoint] {
        match direction {
            Direction::Positive => &self.positive,
            Direction::Negative => &self.negative,
        }
    }

    /// 分支起点（空分支返回 None）
    pub fn start_point(&self, direction: Direction) -> Option<CurvePoint> {
        self.branch(direction).first().copied()
    }

    /// 分支的幅值形式（负向分支镜像到第一象限）
    pub fn magnitude_branch(&self, direction: Direction) -> Vec<CurvePoint> {
        self.branch(direction).iter().map(Sample::magnitude).collect()
    }
}

/// 按所选策略构建骨架曲线
pub fn build_skeleton(
    method: SkeletonMethod,
    series: &CleanedSeries,
    loops: &[HysteresisLoop],
    filter: DirectionFilter,
    reversal_tolerance: f64,
) -> SkeletonCurve {
    let branches = match method {
        SkeletonMethod::OuterEnvelope => outer_envelope(series, loops),
        SkeletonMethod::PeakPoints => peak_points(series, reversal_tolerance),
    };

    let keep = |direction: Direction, branch: Vec<CurvePoint>| {
        if filter.includes(direction) {
            branch
        } else {
            Vec::new()
        }
    };

    let curve = SkeletonCurve {
        method,
        positive: keep(Direction::Positive, branches.positive),
        negative: keep(Direction::Negative, branches.negative),
    };

    log::debug!(
        "骨架曲线({method}): 正向{}点, 负向{}点",
        curve.positive.len(),
        curve.negative.len()
    );
    curve
}

/// 外包络折叠状态
struct EnvelopeFold {
    max_positive: f64,
    max_negative: f64,
    branches: Sided<Vec<CurvePoint>>,
}

/// 外包络法
///
/// 没有滞回环（单调加载）时对原始样本做同样的折叠，得到单调段的轨迹。
/// 不在任何环峰值上的试件峰值（例如以最后一推收尾的记录）在折叠后补到分支末端。
fn outer_envelope(series: &CleanedSeries, loops: &[HysteresisLoop]) -> Sided<Vec<CurvePoint>> {
    let threshold = (consts::ENVELOPE_THRESHOLD_RATIO * series.max_abs_displacement())
        .max(consts::ENVELOPE_THRESHOLD_FLOOR);
    let step = consts::ENVELOPE_STEP_FACTOR * threshold;

    let origin = Sample::new(0.0, 0.0);
    let init = EnvelopeFold {
        max_positive: 0.0,
        max_negative: 0.0,
        branches: Sided::new(vec![origin], vec![origin]),
    };

    let fold = |mut acc: EnvelopeFold, peak: Sample| {
        let d = peak.displacement;
        if d > 0.0 && d > acc.max_positive + step {
            acc.max_positive = d;
            acc.branches.positive.push(peak);
        } else if d < 0.0 && -d > acc.max_negative + step {
            acc.max_negative = -d;
            acc.branches.negative.push(peak);
        }
        acc
    };

    let result = if loops.is_empty() {
        series.samples().iter().copied().fold(init, fold)
    } else {
        loops
            .iter()
            .map(|hl| Sample::new(hl.peak_displacement, hl.peak_force))
            .fold(init, fold)
    };

    let mut branches = result.branches;
    for direction in [Direction::Positive, Direction::Negative] {
        let branch = match direction {
            Direction::Positive => &mut branches.positive,
            Direction::Negative => &mut branches.negative,
        };
        close_at_specimen_peak(branch, series.samples(), direction, step);
    }
    branches
}

/// 分支末端对齐到该方向位移绝对值最大的样本
///
/// 超出末端不足一个步长时替换末端点，否则追加；分支保持 |D| 严格递增。
fn close_at_specimen_peak(
    branch: &mut Vec<CurvePoint>,
    samples: &[Sample],
    direction: Direction,
    step: f64,
) {
    let Some(peak) = samples
        .iter()
        .copied()
        .filter(|s| direction.contains(s.displacement))
        .reduce(|best, s| {
            if s.displacement.abs() > best.displacement.abs() {
                s
            } else {
                best
            }
        })
    else {
        return;
    };

    let reach = branch.last().map_or(0.0, |p| p.displacement.abs());
    let excess = peak.displacement.abs() - reach;
    if excess <= 0.0 {
        return;
    }
    if branch.len() > 1 && excess <= step {
        if let Some(last) = branch.last_mut() {
            *last = peak;
        }
    } else {
        branch.push(peak);
    }
}

/// 峰值点法
fn peak_points(series: &CleanedSeries, reversal_tolerance: f64) -> Sided<Vec<CurvePoint>> {
    let samples = series.samples();
    let threshold = (consts::PEAK_THRESHOLD_RATIO * series.max_abs_displacement())
        .max(consts::PEAK_THRESHOLD_FLOOR);
    let tolerance = reversal_threshold(samples, reversal_tolerance);

    let mut positive_peaks = Vec::new();
    let mut negative_peaks = Vec::new();
    for tp in find_turning_points(samples, tolerance) {
        let d = samples[tp.index].displacement;
        match tp.kind {
            Extremum::Maximum if d > threshold => positive_peaks.push(tp.index),
            Extremum::Minimum if d < -threshold => negative_peaks.push(tp.index),
            _ => {}
        }
    }

    if let Some(tp) = terminal_extreme(samples, tolerance) {
        let d = samples[tp.index].displacement;
        if d > threshold {
            positive_peaks.push(tp.index);
        } else if d < -threshold {
            negative_peaks.push(tp.index);
        }
    }

    let branch = |direction: Direction, own: &[usize], opposite: &[usize]| {
        let start = match (opposite.first(), own.get(1)) {
            (Some(&from), Some(&to)) => zero_crossing(samples, from, to, direction),
            _ => Sample::new(0.0, 0.0),
        };
        std::iter::once(start)
            .chain(own.iter().map(|&i| samples[i]))
            .collect::<Vec<_>>()
    };

    Sided::new(
        branch(Direction::Positive, &positive_peaks, &negative_peaks),
        branch(Direction::Negative, &negative_peaks, &positive_peaks),
    )
}

/// 峰值点法起点：两个峰值之间样本路径穿越 D = 0 处的荷载
///
/// 正向分支找负→正穿越，负向分支找正→负穿越；
/// 找不到穿越的样本对时退化为两个峰值的连线在 D = 0 处取值。
fn zero_crossing(samples: &[Sample], from: usize, to: usize, direction: Direction) -> Sample {
    let (lo, hi) = (from.min(to), from.max(to));
    let crosses = |a: &Sample, b: &Sample| match direction {
        Direction::Positive => a.displacement < 0.0 && b.displacement >= 0.0,
        Direction::Negative => a.displacement > 0.0 && b.displacement <= 0.0,
    };

    let force = samples[lo..=hi]
        .windows(2)
        .find(|w| crosses(&w[0], &w[1]))
        .map(|w| interpolate_force(w[0], w[1], 0.0))
        .unwrap_or_else(|| interpolate_force(samples[from], samples[to], 0.0));

    Sample::new(0.0, force)
}
