//! HysAnalysis 滞回曲线分析工具 - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成滞回分析任务。

use hysteresis_analyzer::{
    error::{AnalysisError, ErrorCategory},
    tools::{self, AppConfig},
};
use std::path::PathBuf;
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式/输入错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 数据错误（无有效样本）
    pub const DATA_ERROR: i32 = 3;
    /// 计算错误
    pub const CALCULATION_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AnalysisError) -> &'static str {
    // 优先通过具体错误类型匹配，提供更精确的建议
    match error {
        AnalysisError::InvalidInput(_) => {
            "检查命令行参数与配置文件是否正确，使用 --help 查看完整用法 / Check command-line arguments and config file, use --help to see full usage"
        }
        AnalysisError::ResourceError(_) => {
            "资源不可用，请重试；若持续失败请使用 --serial 串行模式 / Resource unavailable, retry; if it continues to fail, use --serial"
        }
        AnalysisError::NoValidSamples => {
            "文件中没有可用的数值样本，请确认第1列为位移、第2列为荷载 / No usable numeric samples, ensure column 1 is displacement and column 2 is force"
        }
        // 对于其他错误，使用分类建议
        _ => match ErrorCategory::from_analysis_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Format => {
                "确保输入文件为至少两列数值的 TXT 或 CSV 文件 / Ensure input is a TXT or CSV file with at least two numeric columns"
            }
            ErrorCategory::Calculation => {
                "计算过程出现异常，请检查试验数据是否包含往复加载 / Calculation error occurred, check that the record contains cyclic loading"
            }
            ErrorCategory::Data | ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: AnalysisError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_analysis_error(&error);
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    // 对于格式错误，额外显示支持的格式列表（大写，与scanner一致）
    if matches!(category, ErrorCategory::Format) {
        let formats: Vec<String> = tools::loader::SUPPORTED_EXTENSIONS
            .iter()
            .map(|s| s.to_uppercase())
            .collect();
        eprintln!(
            "   Supported formats / 支持的格式: {}",
            formats.join(", ")
        );
    }

    let exit_code = match &error {
        AnalysisError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        AnalysisError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match category {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Data => exit_codes::DATA_ERROR,
            ErrorCategory::Calculation => exit_codes::CALCULATION_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 批量处理数据文件
fn process_batch_mode(config: &AppConfig) -> Result<(), AnalysisError> {
    let data_files = tools::scan_data_files(&config.input_path)?;

    tools::show_scan_results(config, &data_files);

    if data_files.is_empty() {
        return Ok(());
    }

    // 根据parallel_files配置选择处理模式
    match config.parallel_files {
        None => process_batch_serial(config, &data_files),
        Some(degree) => {
            let actual_degree =
                tools::utils::effective_parallel_degree(degree, Some(data_files.len()));

            if actual_degree == 1 {
                if config.verbose {
                    println!("[INFO] 并发度为1，使用串行模式 / Parallelism=1, using serial mode");
                }
                process_batch_serial(config, &data_files)
            } else {
                // 尝试并行处理，失败则降级串行
                tools::process_batch_parallel(&data_files, config, actual_degree).or_else(|e| {
                    eprintln!("[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial");
                    process_batch_serial(config, &data_files)
                })
            }
        }
    }
}

/// 串行批量处理数据文件
fn process_batch_serial(config: &AppConfig, data_files: &[PathBuf]) -> Result<(), AnalysisError> {
    let is_single_file = data_files.len() == 1;
    let mut batch_output = if is_single_file {
        String::new()
    } else {
        tools::create_batch_output_header(config, data_files)
    };

    let mut stats = tools::SerialBatchStats::new();

    for (index, data_file) in data_files.iter().enumerate() {
        if config.verbose {
            println!(
                "[PROCESSING] [{}/{}] 处理 / Processing: {}",
                index + 1,
                data_files.len(),
                tools::utils::extract_filename_lossy(data_file)
            );
        }

        match tools::process_single_file(data_file, &config.for_file(data_file)) {
            Ok(processed) => {
                stats.inc_processed();
                tools::save_individual_result(&processed, config);
                if !is_single_file {
                    tools::add_to_batch_output(&mut batch_output, &processed);
                }

                if config.verbose {
                    println!("   [OK] 处理成功 / Processing succeeded");
                }
            }
            Err(e) => {
                let filename = tools::utils::extract_filename_lossy(data_file);
                let category = stats.record_failure(&e, filename.clone());

                if config.verbose {
                    println!("   [FAIL] 处理失败 / Processing failed");
                    println!("      文件 / File: {}", data_file.display());
                    println!("      类别 / Category: {}", category.display_name());
                    println!("      错误 / Error: {e}");
                    if let Some(source) = std::error::Error::source(&e) {
                        println!("      原因 / Cause: {source}");
                    }
                } else {
                    println!(
                        "[FAIL] [{}/{}] {} - [{}] {e} / 处理失败",
                        index + 1,
                        data_files.len(),
                        filename,
                        category.display_name()
                    );
                }

                if !is_single_file {
                    tools::add_failed_to_batch_output(&mut batch_output, data_file);
                }
            }
        }
    }

    if is_single_file {
        return Ok(());
    }
    tools::finalize_and_write_batch_output(config, data_files, batch_output, &stats.snapshot())
}

/// 单文件处理模式
fn process_single_mode(config: &AppConfig) -> Result<(), AnalysisError> {
    let processed = tools::process_single_file(&config.input_path, config)?;

    // 输出结果（如果用户未指定输出文件，则自动保存）
    tools::output_results(&processed, config, config.output_path.is_none())
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), AnalysisError> {
    // 1. 解析命令行参数
    let config = tools::parse_args()?;

    // 2. 初始化日志（--verbose 提升默认级别，RUST_LOG 优先）
    let default_filter = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    // 3. 显示启动信息
    tools::show_startup_info(&config);

    // 4. 根据模式选择处理方式
    if config.is_batch_mode() {
        process_batch_mode(&config)?;
    } else {
        process_single_mode(&config)?;
    }

    tools::show_completion_info(&config);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
