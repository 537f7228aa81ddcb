//! 滞回环提取模块
//!
//! 将清洗后的力-位移序列切分为滞回环（半周）。
//!
//! ## 切分规则
//! - 位移序列做锯齿扫描：只有当位移从当前极值回退超过反向容差时才确认转折点，
//!   平台段（相等样本）跳过
//! - 环边界 = 位于自身一侧的转折点：D > 0 的局部极大（正向峰值）、D < 0 的局部极小（负向峰值）
//! - 每个环从一个边界峰值延伸到下一个边界峰值（两端包含）；
//!   最后一个峰值之后到序列末尾构成尾环；首个峰值之前的初始加载段不成环
//! - 尾环没有回到下一个峰值，标记为开口环，其面积不计入耗能统计与阻尼
//! - 环方向 = 起始峰值的符号；少于3个样本的候选环丢弃
//!
//! ## 仅首圈模式
//! 按 (方向, |峰值位移|) 分组，相对容差内视为同一加载级，每级只保留第一个环。

use super::numeric::trapezoid_area;
use super::sample::{CleanedSeries, Direction, Sample, max_abs_displacement};
use crate::tools::constants::loops as consts;
use serde::{Deserialize, Serialize};

/// 转折点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extremum {
    Maximum,
    Minimum,
}

/// 已确认的位移转折点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurningPoint {
    /// 在序列中的索引
    pub index: usize,
    pub kind: Extremum,
}

/// 单个滞回环（构造后不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisLoop {
    /// 在保留环列表中的序号（从0开始）
    pub index: usize,
    pub direction: Direction,
    /// 起始样本在序列中的索引
    pub start: usize,
    /// 结束样本在序列中的索引（包含）
    pub end: usize,
    pub samples: Vec<Sample>,
    pub peak_displacement: f64,
    pub peak_force: f64,
    /// 梯形法则带符号面积
    pub area: f64,
    /// 耗能 = |area|
    pub energy: f64,
    /// 是否闭合于下一个边界峰值（尾环为 false）
    pub closed: bool,
}

impl HysteresisLoop {
    fn build(
        samples: &[Sample],
        start: usize,
        end: usize,
        direction: Direction,
        closed: bool,
    ) -> Self {
        let members = samples[start..=end].to_vec();

        // 闭合环的峰值就是起始边界峰值（之后的同侧样本属于下一个环的加载段）；
        // 开口尾环取自身一侧位移幅值最大的样本
        let peak = if closed {
            members[0]
        } else {
            members
                .iter()
                .filter(|s| direction.contains(s.displacement))
                .copied()
                .fold(members[0], |best, s| {
                    if s.displacement.abs() > best.displacement.abs() {
                        s
                    } else {
                        best
                    }
                })
        };

        let area = trapezoid_area(&members);

        Self {
            index: 0,
            direction,
            start,
            end,
            samples: members,
            peak_displacement: peak.displacement,
            peak_force: peak.force,
            area,
            energy: area.abs(),
            closed,
        }
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// 滞回环提取配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    /// 反向容差（相对 max|D|）
    pub reversal_tolerance: f64,
    /// 是否只保留每个加载级的第一个环
    pub first_loop_only: bool,
    /// 同级判定相对容差
    pub level_tolerance: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            reversal_tolerance: consts::REVERSAL_TOLERANCE,
            first_loop_only: false,
            level_tolerance: consts::LEVEL_TOLERANCE,
        }
    }
}

/// 反向容差的绝对值
#[inline]
pub fn reversal_threshold(samples: &[Sample], ratio: f64) -> f64 {
    (ratio * max_abs_displacement(samples)).max(consts::REVERSAL_TOLERANCE_FLOOR)
}

/// 锯齿扫描识别转折点
///
/// 返回按时间顺序排列的已确认极值；序列末尾的未确认极值不计入。
pub fn find_turning_points(samples: &[Sample], tolerance: f64) -> Vec<TurningPoint> {
    scan_turning_points(samples, tolerance).0
}

/// 序列末尾尚未确认的极值（位于自身一侧时）
///
/// 以最大幅值收尾的记录（最后一推不回载）中，该点就是试件峰值。
pub fn terminal_extreme(samples: &[Sample], tolerance: f64) -> Option<TurningPoint> {
    let (_, pending) = scan_turning_points(samples, tolerance);
    pending.filter(|tp| {
        let d = samples[tp.index].displacement;
        match tp.kind {
            Extremum::Maximum => d > 0.0,
            Extremum::Minimum => d < 0.0,
        }
    })
}

fn scan_turning_points(
    samples: &[Sample],
    tolerance: f64,
) -> (Vec<TurningPoint>, Option<TurningPoint>) {
    let mut points = Vec::new();
    if samples.len() < 2 {
        return (points, None);
    }

    let d = |i: usize| samples[i].displacement;

    // 趋势未定阶段同时跟踪最大/最小值
    let (mut hi, mut lo) = (0usize, 0usize);
    let mut trend: Option<Extremum> = None;
    let mut extreme = 0usize;

    for i in 1..samples.len() {
        match trend {
            None => {
                if d(i) > d(hi) {
                    hi = i;
                }
                if d(i) < d(lo) {
                    lo = i;
                }
                if d(hi) - d(lo) > tolerance {
                    // 后出现的极值决定当前趋势
                    if hi > lo {
                        trend = Some(Extremum::Maximum);
                        extreme = hi;
                    } else {
                        trend = Some(Extremum::Minimum);
                        extreme = lo;
                    }
                }
            }
            Some(Extremum::Maximum) => {
                if d(i) > d(extreme) {
                    extreme = i;
                } else if d(extreme) - d(i) > tolerance {
                    points.push(TurningPoint {
                        index: extreme,
                        kind: Extremum::Maximum,
                    });
                    trend = Some(Extremum::Minimum);
                    extreme = i;
                }
            }
            Some(Extremum::Minimum) => {
                if d(i) < d(extreme) {
                    extreme = i;
                } else if d(i) - d(extreme) > tolerance {
                    points.push(TurningPoint {
                        index: extreme,
                        kind: Extremum::Minimum,
                    });
                    trend = Some(Extremum::Maximum);
                    extreme = i;
                }
            }
        }
    }

    let pending = trend.map(|kind| TurningPoint {
        index: extreme,
        kind,
    });
    (points, pending)
}

/// 环边界：位于自身一侧的转折点
pub fn loop_boundaries(
    samples: &[Sample],
    turning_points: &[TurningPoint],
) -> Vec<(usize, Direction)> {
    turning_points
        .iter()
        .filter_map(|tp| {
            let d = samples[tp.index].displacement;
            match tp.kind {
                Extremum::Maximum if d > 0.0 => Some((tp.index, Direction::Positive)),
                Extremum::Minimum if d < 0.0 => Some((tp.index, Direction::Negative)),
                _ => None,
            }
        })
        .collect()
}

/// 提取滞回环
pub fn extract_loops(series: &CleanedSeries, config: &LoopConfig) -> Vec<HysteresisLoop> {
    let samples = series.samples();
    if samples.len() < consts::MIN_LOOP_SAMPLES {
        return Vec::new();
    }

    let tolerance = reversal_threshold(samples, config.reversal_tolerance);
    let turning_points = find_turning_points(samples, tolerance);
    let boundaries = loop_boundaries(samples, &turning_points);

    log::debug!(
        "环提取: 样本={}, 反向容差={tolerance:.4e}, 转折点={}, 环边界={}",
        samples.len(),
        turning_points.len(),
        boundaries.len()
    );

    let last = samples.len() - 1;
    let mut discarded = 0usize;
    let mut loops: Vec<HysteresisLoop> = boundaries
        .iter()
        .enumerate()
        .filter_map(|(k, &(start, direction))| {
            let (end, closed) = boundaries
                .get(k + 1)
                .map_or((last, false), |&(next, _)| (next, true));
            if end + 1 - start < consts::MIN_LOOP_SAMPLES {
                discarded += 1;
                return None;
            }
            Some(HysteresisLoop::build(samples, start, end, direction, closed))
        })
        .collect();

    if discarded > 0 {
        log::debug!("丢弃 {discarded} 个样本数不足的候选环");
    }

    if config.first_loop_only {
        let before = loops.len();
        loops = retain_first_of_level(loops, config.level_tolerance);
        log::debug!("仅首圈模式: {before} → {} 个环", loops.len());
    }

    for (i, hl) in loops.iter_mut().enumerate() {
        hl.index = i;
    }
    loops
}

/// 每个 (方向, 加载级) 只保留第一个环
pub fn retain_first_of_level(loops: Vec<HysteresisLoop>, tolerance: f64) -> Vec<HysteresisLoop> {
    let mut levels: Vec<(Direction, f64)> = Vec::new();

    loops
        .into_iter()
        .filter(|hl| {
            let level = hl.peak_displacement.abs();
            let seen = levels.iter().any(|&(dir, known)| {
                dir == hl.direction && (level - known).abs() <= tolerance * known.max(level)
            });
            if !seen {
                levels.push((hl.direction, level));
            }
            !seen
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 以 step 为步长在给定峰值之间线性往返，F = D
    fn triangle(peaks: &[f64], step: f64) -> CleanedSeries {
        let mut pairs = vec![(0.0, 0.0)];
        let mut current = 0.0_f64;
        for &target in peaks {
            let n = ((target - current).abs() / step).round() as usize;
            for k in 1..=n {
                let d = current + (target - current) * k as f64 / n as f64;
                pairs.push((d, d));
            }
            current = target;
        }
        CleanedSeries::from_pairs(&pairs)
    }

    #[test]
    fn test_turning_points_ignore_small_wiggles() {
        let samples: Vec<Sample> = [0.0, 5.0, 10.0, 9.99, 10.0, 5.0, 0.0, -10.0, -5.0]
            .iter()
            .map(|&d| Sample::new(d, d))
            .collect();
        let points = find_turning_points(&samples, 0.05);
        assert_eq!(
            points,
            vec![
                TurningPoint {
                    index: 2,
                    kind: Extremum::Maximum
                },
                TurningPoint {
                    index: 7,
                    kind: Extremum::Minimum
                },
            ]
        );
    }

    #[test]
    fn test_extract_amplitude_growing_triangle() {
        let series = triangle(&[10.0, -10.0, 20.0, -20.0, 30.0, -30.0, 0.0], 1.0);
        let loops = extract_loops(&series, &LoopConfig::default());

        assert_eq!(loops.len(), 6);
        let positive: Vec<f64> = loops
            .iter()
            .filter(|l| l.direction == Direction::Positive)
            .map(|l| l.peak_displacement)
            .collect();
        let negative: Vec<f64> = loops
            .iter()
            .filter(|l| l.direction == Direction::Negative)
            .map(|l| l.peak_displacement)
            .collect();
        assert_eq!(positive, vec![10.0, 20.0, 30.0]);
        assert_eq!(negative, vec![-10.0, -20.0, -30.0]);

        // 相邻环共享边界样本
        for pair in loops.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(loops.last().map(|l| l.end), Some(series.len() - 1));
        assert!(loops.iter().enumerate().all(|(i, l)| l.index == i));
    }

    #[test]
    fn test_monotonic_series_has_no_loops() {
        let series = triangle(&[25.0], 0.5);
        assert!(extract_loops(&series, &LoopConfig::default()).is_empty());
    }

    #[test]
    fn test_same_side_reload_opens_new_loop() {
        // +10 → +2 → +15：+2 处的极小值不在负侧，不成边界；+10 与 +15 各自开一个正向环
        let series = triangle(&[10.0, 2.0, 15.0, -15.0, 0.0], 1.0);
        let loops = extract_loops(&series, &LoopConfig::default());
        assert_eq!(loops.len(), 3);

        let peaks: Vec<(Direction, f64)> = loops
            .iter()
            .map(|l| (l.direction, l.peak_displacement))
            .collect();
        assert_eq!(
            peaks,
            vec![
                (Direction::Positive, 10.0),
                (Direction::Positive, 15.0),
                (Direction::Negative, -15.0),
            ]
        );
    }

    #[test]
    fn test_trailing_loop_is_open() {
        let series = triangle(&[10.0, -10.0, 10.0, -10.0, 0.0], 1.0);
        let loops = extract_loops(&series, &LoopConfig::default());
        assert_eq!(loops.len(), 4);
        assert!(loops[..3].iter().all(|l| l.closed));
        assert!(!loops[3].closed);
        // 等幅线弹性：峰到峰半周面积为零，卸载尾段面积是可恢复的应变能
        assert!(loops[..3].iter().all(|l| l.energy < 1e-9));
        assert!((loops[3].energy - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_extreme_of_final_push() {
        let series = triangle(&[10.0, -10.0, 20.0, -20.0, 40.0], 1.0);
        let samples = series.samples();
        let tolerance = reversal_threshold(samples, 0.005);

        let last = find_turning_points(samples, tolerance);
        assert_eq!(last.last().map(|tp| samples[tp.index].displacement), Some(-20.0));

        let terminal = terminal_extreme(samples, tolerance);
        assert_eq!(
            terminal,
            Some(TurningPoint {
                index: samples.len() - 1,
                kind: Extremum::Maximum
            })
        );

        // 回到零点收尾时没有自身一侧的末端极值
        let back_to_zero = triangle(&[10.0, -10.0, 0.0], 1.0);
        assert_eq!(terminal_extreme(back_to_zero.samples(), tolerance), None);
    }

    #[test]
    fn test_first_loop_only_keeps_one_per_level() {
        let series = triangle(
            &[10.0, -10.0, 10.0, -10.0, 10.2, -10.0, 20.0, -20.0, 20.0, -20.0, 0.0],
            1.0,
        );
        let config = LoopConfig {
            first_loop_only: true,
            ..LoopConfig::default()
        };
        let loops = extract_loops(&series, &config);
        let levels: Vec<(Direction, f64)> = loops
            .iter()
            .map(|l| (l.direction, l.peak_displacement.abs()))
            .collect();
        assert_eq!(
            levels,
            vec![
                (Direction::Positive, 10.0),
                (Direction::Negative, 10.0),
                (Direction::Positive, 20.0),
                (Direction::Negative, 20.0),
            ]
        );
    }
}
