//! 多文件并行处理模块
//!
//! 使用rayon实现文件级并行处理，保证输出顺序一致性

use super::batch_state::ParallelBatchStats;
use super::cli::AppConfig;
use super::processor::{ProcessedFile, process_single_file};
use super::{
    add_failed_to_batch_output, add_to_batch_output, create_batch_output_header,
    finalize_and_write_batch_output, save_individual_result, utils,
};
use crate::error::{AnalysisError, HysResult};
use rayon::prelude::*;
use std::path::PathBuf;

/// 有序结果容器（保证输出顺序）
struct OrderedResult {
    /// 原始文件索引（用于排序）
    index: usize,

    /// 文件路径
    file_path: PathBuf,

    /// 处理结果
    result: HysResult<ProcessedFile>,
}

/// 多文件并行处理
///
/// - 使用rayon线程池精确控制并发度
/// - 线程安全的统计信息收集
/// - 索引排序保证输出顺序
pub fn process_batch_parallel(
    data_files: &[PathBuf],
    config: &AppConfig,
    parallel_degree: usize,
) -> HysResult<()> {
    println!("⚡ 启用多文件并行处理：{parallel_degree} 并发度");

    let stats = ParallelBatchStats::new();

    // 创建自定义rayon线程池（精确控制并发度）
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("hys-worker-{i}"))
        .build()
        .map_err(|e| AnalysisError::ResourceError(format!("线程池创建失败: {e}")))?;

    // 并行处理并收集结果（保留索引用于排序）
    let mut results: Vec<OrderedResult> = pool.install(|| {
        data_files
            .par_iter()
            .enumerate()
            .map(|(index, data_file)| {
                // 静默处理单个文件（避免输出混乱）
                let silent_config = config.for_file(data_file);
                let result = process_single_file(data_file, &silent_config);

                match &result {
                    Ok(_) => {
                        let count = stats.inc_processed();
                        if config.verbose {
                            println!(
                                "✅ [{}/{}] {}",
                                count,
                                data_files.len(),
                                utils::extract_filename_lossy(data_file)
                            );
                        }
                    }
                    Err(e) => {
                        let filename = utils::extract_filename_lossy(data_file);
                        let category = stats.record_failure(e, filename.clone());
                        if config.verbose {
                            println!("❌ {filename} - [{}] {e}", category.display_name());
                        }
                    }
                }

                OrderedResult {
                    index,
                    file_path: data_file.clone(),
                    result,
                }
            })
            .collect()
    });

    // 按原始顺序排序结果（保证输出顺序）
    results.sort_by_key(|r| r.index);

    // 按序输出到批量文件（与串行模式输出格式完全一致）
    let is_single_file = data_files.len() == 1;
    let mut batch_output = if is_single_file {
        String::new()
    } else {
        create_batch_output_header(config, data_files)
    };

    for ordered in &results {
        match &ordered.result {
            Ok(processed) => {
                save_individual_result(processed, config);
                if !is_single_file {
                    add_to_batch_output(&mut batch_output, processed);
                }
            }
            Err(_) => {
                if !is_single_file {
                    add_failed_to_batch_output(&mut batch_output, &ordered.file_path);
                }
            }
        }
    }

    let snapshot = stats.snapshot();
    if is_single_file {
        if snapshot.processed > 0 {
            println!("✅ 单文件处理完成");
        } else {
            println!("❌ 单文件处理失败");
        }
        return Ok(());
    }

    finalize_and_write_batch_output(config, data_files, batch_output, &snapshot)
}
