//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。
//!
//! 分析参数的优先级：命令行标志 > `--config` JSON文件 > 默认值。

use super::constants::defaults;
use crate::core::{AnalysisConfig, DirectionFilter, DuctilityMethod, SkeletonMethod};
use crate::error::{HysResult, input_error};
use crate::processing::PreprocessConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 输入文件路径（单文件模式）或扫描目录（批量模式）
    pub input_path: PathBuf,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 输出文件路径（可选，批量模式时自动生成）
    pub output_path: Option<PathBuf>,

    /// 以JSON输出完整分析结果
    pub json: bool,

    /// 报告中列出全部七种延性方法
    pub all_methods: bool,

    /// 预处理配置
    pub preprocess: PreprocessConfig,

    /// 分析配置
    pub analysis: AnalysisConfig,

    /// 多文件并行度（None = 串行）
    pub parallel_files: Option<usize>,
}

impl AppConfig {
    /// 智能判断是否为批量模式（基于路径类型）
    #[inline]
    pub fn is_batch_mode(&self) -> bool {
        self.input_path.is_dir()
    }

    /// 单文件结果的扩展名
    #[inline]
    pub fn output_extension(&self) -> &'static str {
        if self.json { "json" } else { "txt" }
    }

    /// 为批量中的单个文件派生静默配置
    pub fn for_file(&self, file: &Path) -> Self {
        Self {
            input_path: file.to_path_buf(),
            verbose: false,
            output_path: None,
            parallel_files: None,
            ..self.clone()
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("."),
            verbose: false,
            output_path: None,
            json: false,
            all_methods: false,
            preprocess: PreprocessConfig::default(),
            analysis: AnalysisConfig::default(),
            parallel_files: Some(defaults::PARALLEL_FILES_DEGREE),
        }
    }
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("hys-analyzer")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("HysAnalysis Team")
        .arg(
            Arg::new("INPUT")
                .help("试验数据文件或目录路径 (支持 TXT, CSV 两列: 位移 荷载)。如果不指定，将扫描可执行文件所在目录")
                .required(false)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出结果到文件")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("以JSON格式输出完整分析结果")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("从JSON文件读取分析配置（命令行标志优先）")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("direction")
                .long("direction")
                .help("分析方向")
                .value_name("DIR")
                .value_parser(["both", "positive", "negative"]),
        )
        .arg(
            Arg::new("skeleton")
                .long("skeleton")
                .help("骨架曲线构建方法")
                .value_name("METHOD")
                .value_parser(["outer-envelope", "peak-points"]),
        )
        .arg(
            Arg::new("ductility")
                .long("ductility")
                .help("延性系数计算方法")
                .value_name("METHOD")
                .value_parser([
                    "geometric",
                    "energy",
                    "park",
                    "farthest",
                    "asce",
                    "eeep",
                    "elastic-yield",
                ]),
        )
        .arg(
            Arg::new("all-methods")
                .long("all-methods")
                .help("报告中列出全部七种延性方法")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("first-loop-only")
                .long("first-loop-only")
                .help("同一加载级只保留第一圈滞回环")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-preprocess")
                .long("no-preprocess")
                .help("跳过预处理（去重、近零归零、零点修正）")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .help("批量模式的文件并行度")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .conflicts_with("serial"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("批量模式串行处理")
                .action(ArgAction::SetTrue),
        )
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> HysResult<AppConfig> {
    let matches = build_command().get_matches();
    config_from_matches(&matches)
}

/// 从解析结果创建配置
pub fn config_from_matches(matches: &ArgMatches) -> HysResult<AppConfig> {
    // 确定输入路径（智能路径处理）
    let input_path = match matches.get_one::<String>("INPUT") {
        Some(input) => PathBuf::from(input),
        None => {
            // 双击启动模式：使用可执行文件所在目录
            let exe_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
            super::utils::get_parent_dir(&exe_path).to_path_buf()
        }
    };

    let mut analysis = match matches.get_one::<String>("config") {
        Some(path) => load_analysis_config(Path::new(path))?,
        None => AnalysisConfig::default(),
    };

    if let Some(direction) = matches.get_one::<String>("direction") {
        analysis.direction = direction
            .parse::<DirectionFilter>()
            .map_err(|e| input_error("--direction", e))?;
    }
    if let Some(skeleton) = matches.get_one::<String>("skeleton") {
        analysis.skeleton_method = skeleton
            .parse::<SkeletonMethod>()
            .map_err(|e| input_error("--skeleton", e))?;
    }
    if let Some(method) = matches.get_one::<String>("ductility") {
        analysis.ductility_method = method
            .parse::<DuctilityMethod>()
            .map_err(|e| input_error("--ductility", e))?;
    }
    if matches.get_flag("first-loop-only") {
        analysis.first_loop_only = true;
    }

    let preprocess = if matches.get_flag("no-preprocess") {
        PreprocessConfig::disabled()
    } else {
        PreprocessConfig::default()
    };

    let parallel_files = if matches.get_flag("serial") {
        None
    } else {
        Some(
            matches
                .get_one::<usize>("parallel-files")
                .copied()
                .unwrap_or(defaults::PARALLEL_FILES_DEGREE),
        )
    };

    Ok(AppConfig {
        input_path,
        verbose: matches.get_flag("verbose"),
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        json: matches.get_flag("json"),
        all_methods: matches.get_flag("all-methods"),
        preprocess,
        analysis,
        parallel_files,
    })
}

/// 读取JSON分析配置（缺省字段使用默认值）
pub fn load_analysis_config(path: &Path) -> HysResult<AnalysisConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&text)?;
    validate_analysis_config(&config)?;
    log::debug!("已加载分析配置: {}", path.display());
    Ok(config)
}

/// 校验数值型配置项
fn validate_analysis_config(config: &AnalysisConfig) -> HysResult<()> {
    if !(config.reversal_tolerance.is_finite() && config.reversal_tolerance >= 0.0) {
        return Err(input_error("reversal_tolerance", config.reversal_tolerance));
    }
    if !(config.level_tolerance.is_finite() && config.level_tolerance >= 0.0) {
        return Err(input_error("level_tolerance", config.level_tolerance));
    }
    if !(config.eeep.tolerance.is_finite() && config.eeep.tolerance > 0.0)
        || config.eeep.max_iterations == 0
    {
        return Err(input_error(
            "eeep",
            format!(
                "tolerance={}, max_iterations={}",
                config.eeep.tolerance, config.eeep.max_iterations
            ),
        ));
    }
    Ok(())
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("🚀 HysAnalysis 滞回曲线分析工具 v{VERSION} 启动");
    println!("📝 {DESCRIPTION}");
    if config.verbose {
        let a = &config.analysis;
        println!(
            "⚙️  方向 / Direction: {}, 骨架 / Skeleton: {}, 延性 / Ductility: {}",
            a.direction,
            a.skeleton_method.display_name(),
            a.ductility_method.display_name()
        );
        if a.first_loop_only {
            println!("⚙️  仅首圈模式 / First loop only");
        }
        if !config.preprocess.enabled {
            println!("⚙️  预处理已禁用 / Preprocessing disabled");
        }
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("✅ 所有任务处理完成！");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> HysResult<AppConfig> {
        let matches = build_command()
            .try_get_matches_from(std::iter::once("hys-analyzer").chain(args.iter().copied()))
            .unwrap();
        config_from_matches(&matches)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["specimen.txt"]).unwrap();
        assert_eq!(config.input_path, PathBuf::from("specimen.txt"));
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert!(config.preprocess.enabled);
        assert_eq!(config.parallel_files, Some(defaults::PARALLEL_FILES_DEGREE));
        assert_eq!(config.output_extension(), "txt");
    }

    #[test]
    fn test_flags_override_analysis() {
        let config = parse(&[
            "data",
            "--direction",
            "negative",
            "--skeleton",
            "peak-points",
            "--ductility",
            "eeep",
            "--first-loop-only",
            "--no-preprocess",
            "--json",
            "--serial",
        ])
        .unwrap();
        assert_eq!(config.analysis.direction, DirectionFilter::Negative);
        assert_eq!(config.analysis.skeleton_method, SkeletonMethod::PeakPoints);
        assert_eq!(config.analysis.ductility_method, DuctilityMethod::Eeep);
        assert!(config.analysis.first_loop_only);
        assert!(!config.preprocess.enabled);
        assert_eq!(config.parallel_files, None);
        assert_eq!(config.output_extension(), "json");
    }

    #[test]
    fn test_unknown_method_rejected_by_clap() {
        let result = build_command().try_get_matches_from(["hys-analyzer", "--ductility", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serial_conflicts_with_parallel_files() {
        let result = build_command().try_get_matches_from([
            "hys-analyzer",
            "--serial",
            "--parallel-files",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_for_file_is_silent() {
        let config = AppConfig {
            verbose: true,
            output_path: Some(PathBuf::from("out.txt")),
            ..AppConfig::default()
        };
        let derived = config.for_file(Path::new("a.csv"));
        assert!(!derived.verbose);
        assert!(derived.output_path.is_none());
        assert_eq!(derived.input_path, PathBuf::from("a.csv"));
    }
}
