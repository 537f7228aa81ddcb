//! 批处理状态管理模块
//!
//! 提供统一的批处理统计管理，支持串行和并行两种模式。
//! 失败文件按 [`ErrorCategory`] 归类，供批量汇总报告的失败分类使用。

use crate::error::{AnalysisError, ErrorCategory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 批处理统计快照
#[derive(Debug, Clone, Default)]
pub struct BatchStatsSnapshot {
    /// 成功处理的文件数
    pub processed: usize,
    /// 失败的文件数
    pub failed: usize,
    /// 错误分类统计（错误类型 -> 失败文件列表）
    pub error_stats: HashMap<ErrorCategory, Vec<String>>,
}

impl BatchStatsSnapshot {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    /// 成功率（百分比）；没有文件时为 None
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.processed as f64 / total as f64 * 100.0)
    }

    /// 按类别名称排序的失败分类（保证报告稳定）
    pub fn sorted_failures(&self) -> Vec<(ErrorCategory, &[String])> {
        let mut entries: Vec<_> = self
            .error_stats
            .iter()
            .map(|(category, files)| (*category, files.as_slice()))
            .collect();
        entries.sort_by_key(|(category, _)| category.display_name());
        entries
    }
}

/// 串行批处理统计（单线程）
#[derive(Debug, Default)]
pub struct SerialBatchStats {
    processed: usize,
    failed: usize,
    error_stats: HashMap<ErrorCategory, Vec<String>>,
}

impl SerialBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 增加成功处理计数
    #[inline]
    pub fn inc_processed(&mut self) -> usize {
        self.processed += 1;
        self.processed
    }

    /// 记录失败文件，返回其错误类别
    pub fn record_failure(&mut self, error: &AnalysisError, filename: String) -> ErrorCategory {
        let category = ErrorCategory::from_analysis_error(error);
        self.failed += 1;
        self.error_stats.entry(category).or_default().push(filename);
        category
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            processed: self.processed,
            failed: self.failed,
            error_stats: self.error_stats.clone(),
        }
    }
}

/// 并行批处理统计（多线程安全，克隆共享同一状态）
#[derive(Debug, Clone, Default)]
pub struct ParallelBatchStats {
    processed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    error_stats: Arc<Mutex<HashMap<ErrorCategory, Vec<String>>>>,
}

impl ParallelBatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 增加成功处理计数（线程安全）
    #[inline]
    pub fn inc_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 记录失败文件（线程安全），返回其错误类别
    pub fn record_failure(&self, error: &AnalysisError, filename: String) -> ErrorCategory {
        let category = ErrorCategory::from_analysis_error(error);
        self.failed.fetch_add(1, Ordering::Relaxed);

        // 更新错误分类统计（需要锁）
        if let Ok(mut stats) = self.error_stats.lock() {
            stats.entry(category).or_default().push(filename);
        }

        category
    }

    pub fn snapshot(&self) -> BatchStatsSnapshot {
        BatchStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            error_stats: self
                .error_stats
                .lock()
                .map(|stats| stats.clone())
                .unwrap_or_default(),
        }
    }
}
