//! 核心算法模块
//!
//! 滞回分析引擎：滞回环提取、骨架曲线、指标计算、延性系数与分析入口。

pub mod analyzer;
pub mod ductility;
pub mod loops;
pub mod metrics;
pub mod numeric;
pub mod sample;
pub mod skeleton;

// 重新导出公共接口
pub use analyzer::{AnalysisConfig, AnalysisResult, AnalysisSession, analyze};
pub use ductility::{DuctilityMethod, DuctilityResult, DuctilityValue, EeepConfig};
pub use loops::HysteresisLoop;
pub use metrics::{DampingLoop, EnergyStats, MetricSet, StiffnessWindow};
pub use sample::{CleanedSeries, CurvePoint, Direction, DirectionFilter, Sample, Sided};
pub use skeleton::{SkeletonCurve, SkeletonMethod};
