//! 端到端场景测试
//!
//! 覆盖典型试验记录：倍增幅值三角波、重复加载级的仅首圈模式、
//! 单调推覆、荷载恒为零、以最后一推收尾，以及软化试件的完整指标链。


use approx::assert_relative_eq;
use hysteresis_analyzer::core::{Direction, DuctilityMethod, SkeletonMethod};
use hysteresis_analyzer::{AnalysisConfig, CleanedSeries, MetricError, Sample, analyze};
use hysteresis_test_fixtures::*;

fn points(pairs: &[(f64, f64)]) -> Vec<Sample> {
    pairs.iter().copied().map(Sample::from).collect()
}

// ============================================================================
// 场景A：倍增幅值三角波
// ============================================================================

/// ±10/±20/±30 三角波，F = D：3个正向环 + 3个负向环，外包络为各级峰值
#[test]
fn test_scenario_a_doubling_triangle_wave() {
    let series = elastic_series(&displacement_path(&[10.0, 20.0, 30.0], 1, 1.0), 1.0);
    let result = analyze(&series, &AnalysisConfig::default()).unwrap();

    let positive = result
        .loops
        .iter()
        .filter(|lp| lp.direction == Direction::Positive)
        .count();
    assert_eq!(positive, 3, "正向环数应为3");
    assert_eq!(result.loops.len() - positive, 3, "负向环数应为3");

    assert_eq!(
        result.skeleton.positive,
        points(&[(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)])
    );
    assert_eq!(
        result.skeleton.negative,
        points(&[(0.0, 0.0), (-10.0, -10.0), (-20.0, -20.0), (-30.0, -30.0)])
    );

    let k0 = result.metrics.initial_stiffness.clone().unwrap();
    assert_relative_eq!(k0, 1.0, epsilon = 1e-9);

    // 弹性屈服法：D_y = F_peak / K₀ = 30，μ = 30 / 30
    assert_eq!(result.ductility.method, DuctilityMethod::ElasticYield);
    let pos = result.ductility.positive.clone().unwrap();
    assert_relative_eq!(pos.yield_displacement, 30.0, epsilon = 1e-9);
    assert_relative_eq!(pos.ductility_ratio, 1.0, epsilon = 1e-9);
    let neg = result.ductility.negative.clone().unwrap();
    assert_relative_eq!(neg.yield_displacement, -30.0, epsilon = 1e-9);

    println!("  ✓ 场景A: 6个环，骨架 {:?}", result.skeleton.positive);
}

// ============================================================================
// 场景B：仅首圈
// ============================================================================

/// 加载级 [10,10,10,20,20,20]：仅首圈模式保留 10 与 20 两级
#[test]
fn test_scenario_b_first_loop_only() {
    let series = elastic_series(&displacement_path(&[10.0, 20.0], 3, 1.0), 2.0);

    let all = analyze(&series, &AnalysisConfig::default()).unwrap();
    assert_eq!(all.metrics.energy.positive_loops, 6);

    let config = AnalysisConfig {
        first_loop_only: true,
        ..AnalysisConfig::default()
    };
    let first = analyze(&series, &config).unwrap();

    let levels: Vec<f64> = first
        .loops
        .iter()
        .filter(|lp| lp.direction == Direction::Positive)
        .map(|lp| lp.peak_displacement)
        .collect();
    assert_eq!(levels, vec![10.0, 20.0]);
    assert_eq!(first.metrics.energy.negative_loops, 2);

    // 被丢弃的环仍在序列中，残余位移不受影响
    assert_eq!(
        first.metrics.residual_displacement,
        all.metrics.residual_displacement
    );
    // 环序号连续重排
    let indices: Vec<usize> = first.loops.iter().map(|lp| lp.index).collect();
    assert_eq!(indices, (0..first.loops.len()).collect::<Vec<_>>());
}

// ============================================================================
// 场景C：单调推覆
// ============================================================================

/// 无反向：没有滞回环，耗能/阻尼未定义，外包络仍给出单调轨迹
#[test]
fn test_scenario_c_monotonic_pushover() {
    let series = pushover_series(30.0, 1.0);
    let result = analyze(&series, &AnalysisConfig::default()).unwrap();

    assert!(result.loops.is_empty());
    assert!(matches!(
        result.metrics.energy.total,
        Err(MetricError::InsufficientData(_))
    ));
    assert!(result.metrics.damping_ratio.positive.is_err());
    assert!(result.metrics.damping_ratio.negative.is_err());
    assert!(result.metrics.strength_degradation.positive.is_err());

    let branch = &result.skeleton.positive;
    assert_eq!(branch.len(), 31, "原点 + 30个单调样本");
    assert_eq!(branch[0], Sample::new(0.0, 0.0));
    assert!(
        branch
            .windows(2)
            .all(|w| w[1].displacement > w[0].displacement)
    );
    assert_eq!(result.skeleton.negative, points(&[(0.0, 0.0)]));

    // 正向延性仍可计算：K₀ = 10, F_peak = 62.5 → D_y = 6.25
    let pos = result.ductility.positive.clone().unwrap();
    assert_relative_eq!(pos.yield_displacement, 6.25, epsilon = 1e-9);
    assert_relative_eq!(pos.ductility_ratio, 4.8, epsilon = 1e-9);
    assert!(matches!(
        result.ductility.negative,
        Err(MetricError::InsufficientData(_))
    ));
}

// ============================================================================
// 场景D：荷载恒为零
// ============================================================================

/// F_peak = 0：所有延性方法返回几何退化，而不是崩溃
#[test]
fn test_scenario_d_flat_force() {
    let path = displacement_path(&[10.0, 20.0], 1, 1.0);
    let pairs: Vec<(f64, f64)> = path.iter().map(|&d| (d, 0.0)).collect();
    let series = CleanedSeries::from_pairs(&pairs);
    let result = analyze(&series, &AnalysisConfig::default()).unwrap();

    for ductility in result.all_ductility() {
        for direction in [Direction::Positive, Direction::Negative] {
            assert!(
                matches!(
                    ductility.side(direction),
                    Err(MetricError::DegenerateGeometry(_))
                ),
                "{} {direction}: {:?}",
                ductility.method,
                ductility.side(direction)
            );
        }
    }

    assert!(matches!(
        result.metrics.damping_ratio.positive,
        Err(MetricError::DegenerateGeometry(_))
    ));
    assert!(result.metrics.initial_stiffness.is_err());
}

// ============================================================================
// 场景E：以最后一推收尾
// ============================================================================

/// ±10、±20 之后推到 +40 结束：两种骨架都以试件峰值收尾，线弹性试件 μ = 1
#[test]
fn test_scenario_e_final_push_reaches_peak() {
    let series = elastic_series(&final_push_path(&[10.0, 20.0], 40.0, 1.0), 1.0);

    for method in [SkeletonMethod::OuterEnvelope, SkeletonMethod::PeakPoints] {
        let config = AnalysisConfig {
            skeleton_method: method,
            ..AnalysisConfig::default()
        };
        let result = analyze(&series, &config).unwrap();

        assert_eq!(result.metrics.peak_displacement.positive, Ok(40.0));
        let positive: Vec<f64> = result
            .skeleton
            .positive
            .iter()
            .map(|p| p.displacement)
            .collect();
        assert_eq!(positive, vec![0.0, 10.0, 20.0, 40.0], "{method}");
        assert_eq!(
            result.skeleton.negative.last(),
            Some(&Sample::new(-20.0, -20.0))
        );

        // 弹性屈服法：D_y = F_peak / K₀ = 40
        let pos = result.ductility.positive.clone().unwrap();
        assert_relative_eq!(pos.yield_displacement, 40.0, epsilon = 1e-9);
        assert_relative_eq!(pos.ductility_ratio, 1.0, epsilon = 1e-9);

        let by_method = |m: DuctilityMethod| {
            result
                .all_ductility()
                .into_iter()
                .find(|d| d.method == m)
                .unwrap()
                .positive
        };
        // 能量法：2·800/40 = 40
        let energy = by_method(DuctilityMethod::Energy).unwrap();
        assert_relative_eq!(energy.ductility_ratio, 1.0, epsilon = 1e-9);
        // 几何作图法：0.75·40 = 30 位于 (20,20)-(40,40) 段
        let geometric = by_method(DuctilityMethod::Geometric).unwrap();
        assert_relative_eq!(geometric.yield_displacement, 30.0, epsilon = 1e-9);
    }
    println!("  ✓ 场景E: 最后一推的峰值进入骨架曲线");
}

// ============================================================================
// 软化试件完整指标链
// ============================================================================

/// 双线性随动强化试件：耗能为正、阻尼在合理区间、刚度退化为正
#[test]
fn test_softening_specimen_metric_chain() {
    let series = softening_specimen();
    let result = analyze(&series, &AnalysisConfig::default()).unwrap();
    let m = &result.metrics;

    assert_relative_eq!(m.peak_displacement.positive.clone().unwrap(), 40.0);
    assert_relative_eq!(m.peak_displacement.negative.clone().unwrap(), -40.0);
    assert_relative_eq!(m.peak_force.positive.clone().unwrap(), 67.5, epsilon = 1e-9);
    assert_relative_eq!(m.initial_stiffness.clone().unwrap(), 10.0, epsilon = 1e-9);

    assert!(m.energy.total.clone().unwrap() > 0.0);
    assert_eq!(m.energy.positive_loops, 10);
    assert_eq!(m.energy.negative_loops, 10);

    for direction in [Direction::Positive, Direction::Negative] {
        let xi = m.damping_ratio.get(direction).clone().unwrap();
        assert!(xi > 0.0 && xi < 1.0, "{direction} ξ = {xi}");
        let k_sec = m.secant_stiffness.get(direction).clone().unwrap();
        assert!(k_sec < 10.0);
        assert!(!*m.secant_exceeds_initial.get(direction));
        let degradation = m.stiffness_degradation.get(direction).clone().unwrap();
        assert!(degradation > 0.0 && degradation < 100.0);
        // 随动强化：峰值荷载随幅值增大，强度"退化"为负
        assert!(m.strength_degradation.get(direction).clone().unwrap() < 0.0);
    }

    println!("  ✓ 软化试件: E_total = {:?}", m.energy.total);
}

/// 七种延性方法在软化试件上的结果
///
/// 屈服后仍强化的骨架面积大，能量法 2A/F_peak 超过峰值位移，按 μ < 1 报几何退化；
/// 其余方法给出带分支符号的屈服位移。
#[test]
fn test_softening_specimen_all_ductility_methods() {
    let result = analyze(&softening_specimen(), &AnalysisConfig::default()).unwrap();

    for ductility in result.all_ductility() {
        for direction in [Direction::Positive, Direction::Negative] {
            let outcome = ductility.side(direction);
            if ductility.method == DuctilityMethod::Energy {
                assert!(
                    matches!(outcome, Err(MetricError::DegenerateGeometry(_))),
                    "能量法 {direction}: {outcome:?}"
                );
                continue;
            }

            let value = outcome.clone().unwrap_or_else(|e| {
                panic!("{} {direction} 应可计算: {e}", ductility.method)
            });
            assert!(value.ductility_ratio >= 1.0);
            assert_eq!(
                value.yield_displacement.signum(),
                direction.sign(),
                "屈服位移带分支符号"
            );
        }
    }

    // 几何作图法：0.75 × 67.5 = 50.625 位于 (5, 50)-(10, 52.5) 段
    let geometric = result
        .all_ductility()
        .into_iter()
        .find(|d| d.method == DuctilityMethod::Geometric)
        .unwrap();
    let value = geometric.positive.clone().unwrap();
    assert_relative_eq!(value.yield_displacement, 6.25, epsilon = 1e-9);
    assert_relative_eq!(value.ductility_ratio, 6.4, epsilon = 1e-9);
}

/// 峰值点法保留每圈峰值，起点取再加载过零处的荷载
#[test]
fn test_peak_points_skeleton_start_point() {
    let path = displacement_path(&[10.0, 20.0], 2, 0.5);
    let series = bilinear_series(&path, 10.0, 50.0, 0.05);
    let config = AnalysisConfig {
        skeleton_method: SkeletonMethod::PeakPoints,
        ..AnalysisConfig::default()
    };
    let result = analyze(&series, &config).unwrap();

    let positive: Vec<f64> = result
        .skeleton
        .positive
        .iter()
        .map(|p| p.displacement)
        .collect();
    assert_eq!(positive, vec![0.0, 10.0, 10.0, 20.0, 20.0]);

    // 从 −10 再加载：弹性段走完后沿强化线到达 D = 0，此时荷载为 +47.5
    let start = result.skeleton.start_point(Direction::Positive).unwrap();
    assert_eq!(start.displacement, 0.0);
    assert_relative_eq!(start.force, 47.5, epsilon = 1e-9);

    let start = result.skeleton.start_point(Direction::Negative).unwrap();
    assert_relative_eq!(start.force, -47.5, epsilon = 1e-9);
}
