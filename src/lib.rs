//! HysAnalysis 力-位移滞回曲线分析工具
//!
//! 从拟静力往复加载试验的力-位移记录中提取工程性能指标。
//!
//! ## 核心特性
//! - 滞回环提取：锯齿扫描识别位移反向，按峰值切分半周环，支持"仅首圈"筛选
//! - 骨架曲线：外包络法（单调）与峰值点法（保留锯齿）
//! - 指标计算：峰值位移/荷载、残余位移、初始/割线刚度、耗能、等效粘滞阻尼、强度/刚度退化
//! - 延性系数：几何作图、能量、Park、最远点、ASCE、EEEP、弹性屈服七种方法
//! - 逐指标容错：单个指标失败只标记该字段，不中断整次分析

pub mod core;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use core::{
    AnalysisConfig, AnalysisResult, AnalysisSession, CleanedSeries, Direction, DirectionFilter,
    DuctilityMethod, DuctilityResult, MetricSet, Sample, SkeletonCurve, SkeletonMethod, analyze,
};
pub use error::{AnalysisError, HysResult, MetricError};
pub use processing::{AnalysisCoordinator, PreprocessConfig, Preprocessor};
