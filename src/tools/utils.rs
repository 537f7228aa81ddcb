//! 工具函数模块
//!
//! 提供文件路径处理、并发度计算与数值格式化等通用工具函数。

use super::constants::parallel_limits;

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（统一处理路径提取逻辑）
    #[inline]
    pub fn extract_filename(path: &Path) -> &str {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
    }

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 获取父目录，如果不存在则返回当前目录
    #[inline]
    pub fn get_parent_dir(path: &Path) -> &Path {
        path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 安全提取文件stem（返回String）
    #[inline]
    pub fn extract_file_stem_string(path: &Path) -> String {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("data")
            .to_string()
    }

    /// 小写扩展名（用于格式识别）
    #[inline]
    pub fn extension_lowercase(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase())
    }
}

/// 数值格式化工具函数
pub mod number {
    use crate::error::MetricError;

    /// 指标值格式化：成功显示数值，失败显示 "N/A (原因)"
    pub fn format_metric(value: &Result<f64, MetricError>, precision: usize) -> String {
        match value {
            Ok(v) => format!("{v:.precision$}"),
            Err(e) => format!("N/A ({e})"),
        }
    }

    /// 百分比格式化
    pub fn format_percent(value: &Result<f64, MetricError>) -> String {
        match value {
            Ok(v) => format!("{v:.2}%"),
            Err(e) => format!("N/A ({e})"),
        }
    }
}

/// 计算有效并发度
///
/// 把用户请求的并发度限制在 [MIN, MAX] 内，并且不超过任务数。
pub fn effective_parallel_degree(requested: usize, task_count: Option<usize>) -> usize {
    let clamped = requested.clamp(
        parallel_limits::MIN_PARALLEL_DEGREE,
        parallel_limits::MAX_PARALLEL_DEGREE,
    );
    match task_count {
        Some(0) | None => clamped,
        Some(n) => clamped.min(n),
    }
}

// 重新导出为平级函数
pub use number::{format_metric, format_percent};
pub use path::{
    extension_lowercase, extract_file_stem_string, extract_filename, extract_filename_lossy,
    get_parent_dir,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use std::path::Path;

    #[test]
    fn test_effective_parallel_degree() {
        assert_eq!(effective_parallel_degree(4, Some(10)), 4);
        assert_eq!(effective_parallel_degree(4, Some(2)), 2);
        assert_eq!(effective_parallel_degree(0, Some(10)), 1);
        assert_eq!(effective_parallel_degree(64, None), 16);
        assert_eq!(effective_parallel_degree(8, Some(0)), 8);
    }

    #[test]
    fn test_path_helpers() {
        let path = Path::new("/data/specimen_A.CSV");
        assert_eq!(extract_filename(path), "specimen_A.CSV");
        assert_eq!(extract_file_stem_string(path), "specimen_A");
        assert_eq!(extension_lowercase(path).as_deref(), Some("csv"));
        assert_eq!(get_parent_dir(Path::new("a.txt")), Path::new(""));
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(&Ok(1.23456), 3), "1.235");
        let err = Err(MetricError::InsufficientData("少于2个环".to_string()));
        assert_eq!(format_metric(&err, 3), "N/A (数据不足: 少于2个环)");
        assert_eq!(format_percent(&Ok(12.5)), "12.50%");
    }
}
