//! 统一错误处理框架
//!
//! 两层错误模型：
//! - [`MetricError`]：单个指标/延性方法的可恢复失败，随字段一起返回，不中断整次分析
//! - [`AnalysisError`]：整次分析或工具流程的硬失败（无有效样本、文件I/O、格式错误等）

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// 单个指标的失败原因（可恢复）
///
/// 分析结果中每个可能失败的数值都是 `Result<f64, MetricError>`，
/// 展示层据此输出 "N/A (原因)"，而不是把未定义值替换为0。
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum MetricError {
    /// 样本/滞回环数量不足以完成该计算
    #[error("数据不足: {0}")]
    InsufficientData(String),

    /// 峰值荷载/位移为零等退化几何导致除零或无意义结果
    #[error("几何退化: {0}")]
    DegenerateGeometry(String),

    /// EEEP迭代在上限内未满足等面积容差
    #[error("迭代未收敛: {iterations}次迭代后残差 {residual:.3e}")]
    NoConvergence { iterations: usize, residual: f64 },

    /// 配置组合不受支持（如指定的滞回环序号不存在）
    #[error("配置无效: {0}")]
    InvalidConfiguration(String),

    /// 该方向已被方向过滤排除
    #[error("不适用: {0}")]
    NotApplicable(String),
}

impl MetricError {
    /// 方向被排除时的统一错误
    pub fn excluded(direction: &str) -> Self {
        MetricError::NotApplicable(format!("{direction}方向未纳入分析"))
    }
}

/// 分析与工具流程的统一错误类型
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// 序列中没有任何有效（有限值）样本 - 唯一导致整次分析失败的情况
    #[error("没有有效的样本数据")]
    NoValidSamples,

    /// 输入验证错误
    #[error("输入验证失败: {0}")]
    InvalidInput(String),

    /// 文件I/O错误
    #[error("文件I/O错误: {0}")]
    IoError(#[from] io::Error),

    /// 数据文件格式错误
    #[error("数据格式错误: {0}")]
    FormatError(String),

    /// 被升级为硬失败的指标错误
    #[error("计算异常: {0}")]
    Metric(#[from] MetricError),

    /// 资源访问错误（线程池、后台线程等）
    #[error("资源访问错误: {0}")]
    ResourceError(String),
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::FormatError(format!("CSV解析错误: {err}"))
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::FormatError(format!("JSON错误: {err}"))
    }
}

/// 分析操作的标准Result类型
pub type HysResult<T> = Result<T, AnalysisError>;

/// 单个指标的Result类型
pub type Metric = Result<f64, MetricError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: std::fmt::Display>(context: &str, err: E) -> AnalysisError {
    AnalysisError::FormatError(format!("{context}: {err}"))
}

/// 创建输入错误的helper函数
#[inline]
pub fn input_error<E: std::fmt::Display>(context: &str, err: E) -> AnalysisError {
    AnalysisError::InvalidInput(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计和分析

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 格式相关错误（列数不足、数值无法解析等）
    Format,
    /// 数据相关错误（无有效样本、输入非法）
    Data,
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 计算相关错误
    Calculation,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从AnalysisError提取错误类别
    pub fn from_analysis_error(e: &AnalysisError) -> Self {
        match e {
            AnalysisError::FormatError(_) => Self::Format,
            AnalysisError::NoValidSamples | AnalysisError::InvalidInput(_) => Self::Data,
            AnalysisError::IoError(_) => Self::Io,
            AnalysisError::Metric(_) => Self::Calculation,
            AnalysisError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Format => "格式错误",
            Self::Data => "数据错误",
            Self::Io => "I/O错误",
            Self::Calculation => "计算错误",
            Self::Other => "其他错误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_error_display() {
        let err = MetricError::NoConvergence {
            iterations: 3,
            residual: 0.5,
        };
        assert!(err.to_string().contains("3次迭代"));

        let err = MetricError::excluded("负向");
        assert_eq!(err, MetricError::NotApplicable("负向方向未纳入分析".to_string()));
    }

    #[test]
    fn test_error_category_mapping() {
        assert_eq!(
            ErrorCategory::from_analysis_error(&AnalysisError::NoValidSamples),
            ErrorCategory::Data
        );
        assert_eq!(
            ErrorCategory::from_analysis_error(&format_error("第3行", "not a number")),
            ErrorCategory::Format
        );
        let io = AnalysisError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(ErrorCategory::from_analysis_error(&io), ErrorCategory::Io);
        let metric = AnalysisError::from(MetricError::DegenerateGeometry("F=0".into()));
        assert_eq!(
            ErrorCategory::from_analysis_error(&metric),
            ErrorCategory::Calculation
        );
    }
}
