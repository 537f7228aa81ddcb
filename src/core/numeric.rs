//! 数值计算工具
//!
//! 梯形积分、最小二乘斜率、线性插值与二分求根。
//! 所有函数都是纯函数，失败以 [`MetricError`] 返回。

use super::sample::Sample;
use crate::error::MetricError;

/// 梯形法则带符号面积：Σ ½(F_j + F_{j+1})(D_{j+1} − D_j)
pub fn trapezoid_area(points: &[Sample]) -> f64 {
    points
        .windows(2)
        .map(|w| 0.5 * (w[0].force + w[1].force) * (w[1].displacement - w[0].displacement))
        .sum()
}

/// 最小二乘直线拟合的斜率（含截距项）
///
/// 少于2个点返回 `InsufficientData`；位移方差为零返回 `DegenerateGeometry`。
pub fn least_squares_slope(points: &[Sample]) -> Result<f64, MetricError> {
    if points.len() < 2 {
        return Err(MetricError::InsufficientData(format!(
            "线性拟合至少需要2个点，实际 {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let mean_d = points.iter().map(|p| p.displacement).sum::<f64>() / n;
    let mean_f = points.iter().map(|p| p.force).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), p| {
        let dx = p.displacement - mean_d;
        (sxy + dx * (p.force - mean_f), sxx + dx * dx)
    });

    if sxx <= f64::EPSILON * n * mean_d.abs().max(1.0) {
        return Err(MetricError::DegenerateGeometry(
            "拟合窗口内位移无变化".to_string(),
        ));
    }

    Ok(sxy / sxx)
}

/// 在线段 (d0,f0)-(d1,f1) 上按荷载插值位移
#[inline]
pub fn interpolate_displacement(p0: Sample, p1: Sample, force: f64) -> f64 {
    let df = p1.force - p0.force;
    if df.abs() < f64::EPSILON {
        return p0.displacement;
    }
    p0.displacement + (force - p0.force) * (p1.displacement - p0.displacement) / df
}

/// 在线段上按位移插值荷载
#[inline]
pub fn interpolate_force(p0: Sample, p1: Sample, displacement: f64) -> f64 {
    let dd = p1.displacement - p0.displacement;
    if dd.abs() < f64::EPSILON {
        return p0.force;
    }
    p0.force + (displacement - p0.displacement) * (p1.force - p0.force) / dd
}

/// 沿曲线首次达到目标荷载处的位移（线性插值）
///
/// 曲线按顺序遍历，返回第一个 `F ≥ target` 的位置；从未达到返回 `None`。
pub fn first_force_crossing(curve: &[Sample], target: f64) -> Option<f64> {
    let idx = curve.iter().position(|p| p.force >= target)?;
    if idx == 0 {
        return Some(curve[0].displacement);
    }
    Some(interpolate_displacement(curve[idx - 1], curve[idx], target))
}

/// 二分法求根
///
/// 在 `[lo, hi]` 上求 `f(x) = 0`，`|f(x)| ≤ tolerance` 视为收敛。
/// - 端点异号是前提，否则返回 `DegenerateGeometry`
/// - 超过 `max_iterations` 仍未收敛返回 `NoConvergence`
pub fn bisect<F>(
    f: F,
    mut lo: f64,
    mut hi: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<f64, MetricError>
where
    F: Fn(f64) -> f64,
{
    let mut f_lo = f(lo);
    let f_hi = f(hi);

    if !f_lo.is_finite() || !f_hi.is_finite() {
        return Err(MetricError::DegenerateGeometry(
            "求根区间端点函数值非有限".to_string(),
        ));
    }
    if f_lo.abs() <= tolerance {
        return Ok(lo);
    }
    if f_hi.abs() <= tolerance {
        return Ok(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(MetricError::DegenerateGeometry(format!(
            "区间 [{lo:.4}, {hi:.4}] 内不存在根（端点同号）"
        )));
    }

    let mut residual = f_lo.abs().min(f_hi.abs());
    for iteration in 1..=max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        residual = f_mid.abs();

        if residual <= tolerance {
            log::debug!("二分法在第{iteration}次迭代收敛: x={mid:.6}, 残差={residual:.3e}");
            return Ok(mid);
        }

        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(MetricError::NoConvergence {
        iterations: max_iterations,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(pairs: &[(f64, f64)]) -> Vec<Sample> {
        pairs.iter().copied().map(Sample::from).collect()
    }

    #[test]
    fn test_trapezoid_area_closed_square() {
        // 逆时针闭合正方形，面积为 -1（D增加时F=0，D减少时F=1）
        let square = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        assert_relative_eq!(trapezoid_area(&square), -1.0);
        assert_eq!(trapezoid_area(&square[..1]), 0.0);
    }

    #[test]
    fn test_least_squares_slope() {
        let line = pts(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)]);
        assert_relative_eq!(least_squares_slope(&line).unwrap(), 2.0, epsilon = 1e-12);

        assert!(matches!(
            least_squares_slope(&line[..1]),
            Err(MetricError::InsufficientData(_))
        ));
        let vertical = pts(&[(1.0, 0.0), (1.0, 5.0)]);
        assert!(matches!(
            least_squares_slope(&vertical),
            Err(MetricError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_first_force_crossing() {
        let curve = pts(&[(0.0, 0.0), (2.0, 10.0), (4.0, 12.0)]);
        assert_relative_eq!(first_force_crossing(&curve, 5.0).unwrap(), 1.0);
        assert_relative_eq!(first_force_crossing(&curve, 11.0).unwrap(), 3.0);
        assert!(first_force_crossing(&curve, 20.0).is_none());
    }

    #[test]
    fn test_bisect_converges_and_reports() {
        let root = bisect(|x| x * x - 2.0, 0.0, 2.0, 1e-10, 200).unwrap();
        assert_relative_eq!(root, 2f64.sqrt(), epsilon = 1e-8);

        assert!(matches!(
            bisect(|x| x * x + 1.0, -1.0, 1.0, 1e-6, 50),
            Err(MetricError::DegenerateGeometry(_))
        ));

        match bisect(|x| x - 0.3, 0.0, 1.0, 1e-12, 1) {
            Err(MetricError::NoConvergence {
                iterations,
                residual,
            }) => {
                assert_eq!(iterations, 1);
                assert_relative_eq!(residual, 0.2, epsilon = 1e-12);
            }
            other => panic!("expected NoConvergence, got {other:?}"),
        }
    }
}
