//! 单文件处理模块
//!
//! 串联 读取 → 预处理 → 分析，并负责单文件报告与批量汇总行的输出。

use super::cli::AppConfig;
use super::formatter;
use super::loader::{self, DataFormat};
use super::utils;
use crate::core::{AnalysisResult, Direction, analyze};
use crate::error::HysResult;
use crate::processing::{PreprocessReport, Preprocessor};
use std::path::{Path, PathBuf};

/// 单文件处理结果
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub format: DataFormat,
    /// 文件中读到的原始样本数
    pub raw_samples: usize,
    pub header_rows: usize,
    pub preprocess: PreprocessReport,
    pub result: AnalysisResult,
}

/// 处理单个数据文件
pub fn process_single_file(path: &Path, config: &AppConfig) -> HysResult<ProcessedFile> {
    if config.verbose {
        println!(
            "📂 读取数据 / Loading: {}",
            utils::extract_filename_lossy(path)
        );
    }

    let loaded = loader::load_samples(path)?;
    let raw_samples = loaded.samples.len();

    let (series, preprocess) = Preprocessor::new(config.preprocess).process(&loaded.samples);
    if config.verbose && preprocess.changed_anything() {
        let s = &preprocess.stats;
        println!(
            "🧹 预处理 / Preprocessed: {} → {} 个样本 (去重 {}, 归零 {}/{})",
            s.input_samples,
            s.output_samples,
            s.duplicates_removed,
            s.snapped_displacements,
            s.snapped_forces
        );
    }

    let result = analyze(&series, &config.analysis)?;
    log::debug!(
        "{}: {} 个滞回环, 骨架点 +{} / -{}",
        utils::extract_filename_lossy(path),
        result.loops.len(),
        result.skeleton.positive.len(),
        result.skeleton.negative.len()
    );

    if config.verbose {
        println!(
            "🔁 滞回环 / Loops: {} (正向 {}, 负向 {})",
            result.loops.len(),
            result.metrics.energy.positive_loops,
            result.metrics.energy.negative_loops
        );
    }

    Ok(ProcessedFile {
        path: path.to_path_buf(),
        format: loaded.format,
        raw_samples,
        header_rows: loaded.header_rows,
        preprocess,
        result,
    })
}

/// 输出单文件分析结果（文本或JSON）
pub fn output_results(
    processed: &ProcessedFile,
    config: &AppConfig,
    auto_save: bool,
) -> HysResult<()> {
    let output = if config.json {
        formatter::format_json_report(processed, config)?
    } else {
        formatter::format_text_report(processed, config)
    };
    formatter::write_output(&output, config, auto_save)
}

/// 批量处理的单个文件结果添加到批量输出
pub fn add_to_batch_output(batch_output: &mut String, processed: &ProcessedFile) {
    let file_name = utils::extract_filename_lossy(&processed.path);
    let result = &processed.result;

    let ratio = |direction: Direction| match result.ductility.side(direction) {
        Ok(value) => format!("{:.2}", value.ductility_ratio),
        Err(_) => "N/A".to_string(),
    };
    let stiffness = match &result.metrics.initial_stiffness {
        Ok(k0) => format!("{k0:.3}"),
        Err(_) => "N/A".to_string(),
    };
    let energy = match &result.metrics.energy.total {
        Ok(total) => format!("{total:.2}"),
        Err(_) => "N/A".to_string(),
    };

    batch_output.push_str(&format!(
        "{:<12}{:<12}{:<12}{:<12}{:<8}{}\n",
        ratio(Direction::Positive),
        ratio(Direction::Negative),
        stiffness,
        energy,
        result.loops.len(),
        file_name
    ));
}

/// 批量处理失败文件的结果添加到批量输出
pub fn add_failed_to_batch_output(batch_output: &mut String, file_path: &Path) {
    let file_name = utils::extract_filename_lossy(file_path);
    // 使用固定宽度对齐（与成功结果格式一致）
    batch_output.push_str(&format!(
        "{:<12}{:<12}{:<36}{}\n",
        "-", "-", "处理失败", file_name
    ));
}

/// 为单个文件生成独立的分析报告
pub fn save_individual_result(processed: &ProcessedFile, config: &AppConfig) {
    let file_config = config.for_file(&processed.path);

    if let Err(e) = output_results(processed, &file_config, true) {
        eprintln!("   [WARNING] 保存单独结果文件失败 / Failed to save individual result file: {e}");
    } else if config.verbose {
        let individual_path = formatter::individual_output_path(&processed.path, config);
        println!(
            "   Individual result saved / 单独结果已保存: {}",
            individual_path.display()
        );
    }
}
