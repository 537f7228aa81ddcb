//! 文件扫描模块
//!
//! 负责扫描目录中的试验数据文件，以及批量汇总报告的头尾与输出路径。

use super::batch_state::BatchStatsSnapshot;
use super::cli::AppConfig;
use super::constants::app_info;
use super::loader::SUPPORTED_EXTENSIONS;
use super::utils;
use crate::error::{AnalysisError, HysResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 扫描目录中的数据文件（不递归子目录，按路径排序）
pub fn scan_data_files(dir_path: &Path) -> HysResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(AnalysisError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(AnalysisError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let mut data_files = Vec::new();
    for entry in WalkDir::new(dir_path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            AnalysisError::IoError(std::io::Error::other(format!("目录遍历失败: {e}")))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if let Some(ext) = utils::extension_lowercase(&path)
            && SUPPORTED_EXTENSIONS.contains(&ext.as_str())
            && !is_generated_report(&path)
        {
            data_files.push(path);
        }
    }

    // 按文件名排序
    data_files.sort();

    Ok(data_files)
}

/// 本工具生成的报告文件不参与扫描
fn is_generated_report(path: &Path) -> bool {
    let stem = utils::extract_file_stem_string(path);
    stem.ends_with("_Hys_Analysis") || stem.contains("_BatchHys_Results_")
}

/// 显示文件扫描结果
pub fn show_scan_results(config: &AppConfig, data_files: &[PathBuf]) {
    if data_files.is_empty() {
        println!(
            "⚠️  在目录 {} 中没有找到支持的数据文件",
            config.input_path.display()
        );
        println!("   支持的格式: TXT, CSV");
        return;
    }

    println!("📁 扫描目录: {}", config.input_path.display());
    println!("📈 找到 {} 个数据文件", data_files.len());

    if config.verbose {
        for (i, file) in data_files.iter().enumerate() {
            println!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
    println!();
}

/// 生成批量输出的头部信息
pub fn create_batch_output_header(config: &AppConfig, data_files: &[PathBuf]) -> String {
    let mut batch_output = String::new();
    let a = &config.analysis;

    batch_output.push_str("=====================================\n");
    batch_output.push_str("   HysAnalysis Hysteresis Report\n");
    batch_output.push_str("   批量分析结果\n");
    batch_output.push_str("=====================================\n\n");

    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    batch_output.push_str(&format!("🕒 分析时间: {now}\n"));
    batch_output.push_str(&format!("📁 扫描目录: {}\n", config.input_path.display()));
    batch_output.push_str(&format!("📈 处理文件数: {}\n", data_files.len()));
    batch_output.push_str(&format!(
        "⚙️  方向: {} | 骨架: {} | 延性: {}{}\n\n",
        a.direction,
        a.skeleton_method,
        a.ductility_method,
        if a.first_loop_only { " | 仅首圈" } else { "" }
    ));

    // 添加结果表头
    batch_output.push_str(&format!(
        "{:<12}{:<12}{:<12}{:<12}{:<8}{}\n",
        "μ+", "μ-", "K0", "E_total", "Loops", "文件名"
    ));
    batch_output.push_str(
        "--------------------------------------------------------------------------------\n",
    );

    batch_output
}

/// 生成批量输出的统计信息
pub fn create_batch_output_footer(
    data_files: &[PathBuf],
    snapshot: &BatchStatsSnapshot,
) -> String {
    let mut output = String::new();

    // 添加统计信息
    output.push('\n');
    output.push_str("=====================================\n");
    output.push_str("批量处理统计:\n");
    output.push_str(&format!("   总文件数: {}\n", data_files.len()));
    output.push_str(&format!("   成功处理: {}\n", snapshot.processed));
    output.push_str(&format!("   处理失败: {}\n", snapshot.failed));
    if let Some(rate) = snapshot.success_rate() {
        output.push_str(&format!("   处理成功率: {rate:.1}%\n"));
    }

    let failures = snapshot.sorted_failures();
    if !failures.is_empty() {
        output.push_str("\n失败分类:\n");
        for (category, files) in failures {
            output.push_str(&format!(
                "   {} ({}): {}\n",
                category.display_name(),
                files.len(),
                files.join(", ")
            ));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "生成工具: {}\n",
        app_info::format_output_header(VERSION)
    ));

    output
}

/// 生成批量输出文件路径
pub fn generate_batch_output_path(config: &AppConfig) -> PathBuf {
    config.output_path.clone().unwrap_or_else(|| {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir_name = utils::extract_filename(config.input_path.as_path()).replace('.', "_");
        config
            .input_path
            .join(format!("{dir_name}_BatchHys_Results_{timestamp}.txt"))
    })
}

/// 批量收尾：追加统计、写文件、显示完成信息
pub fn finalize_and_write_batch_output(
    config: &AppConfig,
    data_files: &[PathBuf],
    mut batch_output: String,
    snapshot: &BatchStatsSnapshot,
) -> HysResult<()> {
    batch_output.push_str(&create_batch_output_footer(data_files, snapshot));

    let output_path = generate_batch_output_path(config);
    std::fs::write(&output_path, &batch_output)?;

    show_batch_completion_info(
        &output_path,
        snapshot.processed,
        data_files.len(),
        snapshot.failed,
        config,
    );
    Ok(())
}

/// 显示批量处理完成信息
pub fn show_batch_completion_info(
    output_path: &Path,
    processed_count: usize,
    total_count: usize,
    failed_count: usize,
    config: &AppConfig,
) {
    println!();
    println!("📊 批量处理完成!");
    println!("   成功处理: {processed_count} / {total_count} 个文件");
    if failed_count > 0 {
        println!("   失败文件: {failed_count} 个");
    }

    println!();
    println!("📄 生成的文件:");
    println!("   🗂️  批量汇总: {}", output_path.display());
    if processed_count > 0 {
        println!(
            "   📝 单独结果: {processed_count} 个 *_Hys_Analysis.{} 文件",
            config.output_extension()
        );
        if config.verbose {
            println!("   💡 每个数据文件都有对应的单独分析报告");
        }
    }
}
