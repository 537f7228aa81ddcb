//! 输出格式化模块
//!
//! 负责分析报告的格式化和输出：
//! - 文本报告：文件信息、预处理、骨架起点、分类指标、延性、滞回环明细
//! - JSON报告：完整 [`AnalysisResult`] 加上文件与预处理信息
//!
//! 未定义的指标一律输出 `N/A (原因)`，不以0代替。

use super::cli::AppConfig;
use super::constants::app_info;
use super::processor::ProcessedFile;
use super::utils::{self, format_metric, format_percent};
use crate::core::{
    AnalysisResult, Direction, DirectionFilter, DuctilityResult, HysteresisLoop, Sided,
    SkeletonMethod,
};
use crate::error::{HysResult, MetricError};
use crate::processing::PreprocessReport;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::path::{Path, PathBuf};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const SEPARATOR: &str =
    "--------------------------------------------------------------------------------\n";
const DOUBLE_SEPARATOR: &str =
    "================================================================================\n";

/// 创建报告头部信息
pub fn create_output_header(processed: &ProcessedFile) -> String {
    let mut output = String::new();

    output.push_str(&app_info::format_output_header(VERSION));
    output.push('\n');
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    output.push_str(&format!("log date: {now}\n\n"));

    output.push_str(SEPARATOR);

    let file_name = utils::extract_filename(&processed.path);
    output.push_str(&format!("Statistics for: {file_name}\n"));
    output.push_str(&format!("Format:              {}\n", processed.format.display_name()));
    output.push_str(&format!("Samples (raw):       {}\n", processed.raw_samples));
    output.push_str(&format!(
        "Samples (analyzed):  {}\n",
        processed.result.sample_count
    ));
    output.push_str(&format!(
        "Hysteresis loops:    {}\n",
        processed.result.loops.len()
    ));

    output.push_str(SEPARATOR);
    output.push('\n');

    output
}

/// 格式化预处理信息
pub fn format_preprocess_report(report: &PreprocessReport) -> String {
    let mut output = String::from("预处理 / Preprocessing\n");

    if !report.config.enabled {
        output.push_str("  已禁用 / disabled\n");
        if report.stats.non_finite_dropped > 0 {
            output.push_str(&format!(
                "  剔除非有限值: {}\n",
                report.stats.non_finite_dropped
            ));
        }
        output.push('\n');
        return output;
    }

    let s = &report.stats;
    output.push_str(&format!(
        "  噪声阈值 D / F:     {:.4} / {:.4}\n",
        report.thresholds.displacement, report.thresholds.force
    ));
    output.push_str(&format!(
        "  样本数:             {} → {}\n",
        s.input_samples, s.output_samples
    ));
    output.push_str(&format!("  剔除非有限值:       {}\n", s.non_finite_dropped));
    output.push_str(&format!(
        "  近零归零 D / F:     {} / {}\n",
        s.snapped_displacements, s.snapped_forces
    ));
    output.push_str(&format!("  去除重复点:         {}\n", s.duplicates_removed));
    match s.offset_applied {
        Some(offset) => output.push_str(&format!("  零点偏移修正:       {offset:.4}\n")),
        None => output.push_str("  零点偏移修正:       无 / none\n"),
    }
    output.push('\n');
    output
}

/// 格式化分析配置
pub fn format_config(result: &AnalysisResult) -> String {
    let c = &result.config;
    let mut output = String::from("分析配置 / Configuration\n");
    output.push_str(&format!("  方向 / Direction:   {}\n", c.direction));
    output.push_str(&format!(
        "  骨架 / Skeleton:    {}\n",
        c.skeleton_method.display_name()
    ));
    output.push_str(&format!(
        "  仅首圈 / First loop only: {}\n",
        if c.first_loop_only { "是 / yes" } else { "否 / no" }
    ));
    output.push('\n');
    output
}

/// 格式化骨架曲线起点
pub fn format_skeleton_start_points(result: &AnalysisResult) -> String {
    let mut output = String::from("骨架曲线起点 / Skeleton start points\n");
    for direction in [Direction::Positive, Direction::Negative] {
        let text = match result.skeleton.start_point(direction) {
            Some(p) => format!("({:.4}, {:.4})", p.displacement, p.force),
            None => "N/A".to_string(),
        };
        output.push_str(&format!(
            "  {}: {text}  [{} 个点]\n",
            direction.label(),
            result.skeleton.branch(direction).len()
        ));
    }
    output.push('\n');
    output
}

type SidedMetric = Sided<Result<f64, MetricError>>;

fn push_sided(output: &mut String, label: &str, values: &SidedMetric, precision: usize) {
    let positive = format_metric(&values.positive, precision);
    let negative = format_metric(&values.negative, precision);
    output.push_str(&format!("  {label} +: {positive}\n"));
    output.push_str(&format!("  {label} -: {negative}\n"));
}

fn push_sided_percent(output: &mut String, label: &str, values: &SidedMetric) {
    output.push_str(&format!("  {label} +: {}\n", format_percent(&values.positive)));
    output.push_str(&format!("  {label} -: {}\n", format_percent(&values.negative)));
}

/// 格式化评价指标（按类别分组）
pub fn format_metrics(result: &AnalysisResult) -> String {
    let m = &result.metrics;
    let mut output = String::from("评价指标 / Evaluation metrics\n");

    output.push_str(" [位移 / Displacement]\n");
    push_sided(&mut output, "峰值位移 / Peak displacement", &m.peak_displacement, 4);
    output.push_str(&format!(
        "  残余位移 / Residual displacement: {}\n",
        format_metric(&m.residual_displacement, 4)
    ));

    output.push_str(" [力学性能 / Mechanical properties]\n");
    push_sided(&mut output, "峰值荷载 / Peak force", &m.peak_force, 4);
    output.push_str(&format!(
        "  初始刚度 / Initial stiffness K0: {}\n",
        format_metric(&m.initial_stiffness, 4)
    ));
    push_sided(&mut output, "割线刚度 / Secant stiffness", &m.secant_stiffness, 4);
    for direction in [Direction::Positive, Direction::Negative] {
        if *m.secant_exceeds_initial.get(direction) {
            output.push_str(&format!(
                "  ⚠️  {}割线刚度大于初始刚度 / secant stiffness exceeds K0\n",
                direction.label()
            ));
        }
    }

    output.push_str(" [耗能 / Energy]\n");
    let e = &m.energy;
    output.push_str(&format!(
        "  总耗能 / Total:     {}\n",
        format_metric(&e.total, 4)
    ));
    output.push_str(&format!(
        "  平均耗能 / Average: {}\n",
        format_metric(&e.average, 4)
    ));
    output.push_str(&format!(
        "  最大耗能 / Max:     {}\n",
        format_metric(&e.max, 4)
    ));
    output.push_str(&format!(
        "  最小耗能 / Min:     {}\n",
        format_metric(&e.min, 4)
    ));

    output.push_str(" [系数 / Coefficients]\n");
    push_sided(&mut output, "等效粘滞阻尼 / Damping ratio", &m.damping_ratio, 4);

    output.push_str(" [退化 / Degradation]\n");
    push_sided_percent(&mut output, "强度退化 / Strength", &m.strength_degradation);
    push_sided_percent(&mut output, "刚度退化 / Stiffness", &m.stiffness_degradation);

    output.push('\n');
    output
}

fn ductility_cells(result: &DuctilityResult, direction: Direction) -> (String, String) {
    match result.side(direction) {
        Ok(v) => (
            format!("{:.4}", v.yield_displacement),
            format!("{:.3}", v.ductility_ratio),
        ),
        Err(e) => (format!("N/A ({e})"), "N/A".to_string()),
    }
}

/// 格式化所选方法的延性结果
pub fn format_ductility(result: &AnalysisResult) -> String {
    let d = &result.ductility;
    let mut output = format!("延性 / Ductility: {}\n", d.method.display_name());
    if d.method.needs_initial_stiffness() {
        output.push_str(&format!(
            "  依赖初始刚度 K0 = {}\n",
            format_metric(&result.metrics.initial_stiffness, 4)
        ));
    }
    for direction in [Direction::Positive, Direction::Negative] {
        let (yield_d, ratio) = ductility_cells(d, direction);
        output.push_str(&format!(
            "  {} 屈服位移 / Yield displacement: {yield_d}\n",
            direction.label()
        ));
        output.push_str(&format!(
            "  {} 延性系数 / Ductility ratio:    {ratio}\n",
            direction.label()
        ));
    }
    output.push('\n');
    output
}

/// 格式化全部延性方法对比表
pub fn format_all_ductility(results: &[DuctilityResult]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Method", "Dy+", "μ+", "Dy-", "μ-"]);

    for result in results {
        let (yield_pos, ratio_pos) = ductility_cells(result, Direction::Positive);
        let (yield_neg, ratio_neg) = ductility_cells(result, Direction::Negative);
        table.add_row(vec![
            Cell::new(result.method.display_name()),
            Cell::new(yield_pos).set_alignment(CellAlignment::Right),
            Cell::new(ratio_pos).set_alignment(CellAlignment::Right),
            Cell::new(yield_neg).set_alignment(CellAlignment::Right),
            Cell::new(ratio_neg).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("全部延性方法 / All ductility methods\n{table}\n\n")
}

/// 格式化滞回环明细表与统计
pub fn format_loop_table(loops: &[HysteresisLoop], filter: DirectionFilter) -> String {
    let mut output = String::from("滞回环明细 / Detailed hysteresis loop information\n");
    if loops.is_empty() {
        output.push_str("  未识别到滞回环（单调加载） / no loops detected (monotonic loading)\n\n");
        return output;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Dir", "Samples", "Peak D", "Peak F", "Energy"]);

    for lp in loops {
        let marker = if filter.includes(lp.direction) { "" } else { " *" };
        table.add_row(vec![
            Cell::new(lp.index + 1),
            Cell::new(format!("{}{marker}", lp.direction.label())),
            Cell::new(lp.sample_count()).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", lp.peak_displacement)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", lp.peak_force)).set_alignment(CellAlignment::Right),
            Cell::new(if lp.closed {
                format!("{:.4}", lp.energy)
            } else {
                format!("({:.4})", lp.energy)
            })
            .set_alignment(CellAlignment::Right),
        ]);
    }
    output.push_str(&format!("{table}\n"));

    let positive = loops
        .iter()
        .filter(|lp| lp.direction == Direction::Positive)
        .count();
    let total_samples: usize = loops.iter().map(HysteresisLoop::sample_count).sum();
    output.push_str(&format!(
        "  环数 / Loops: {} (正向 {positive}, 负向 {}), 平均样本数 {:.1}\n",
        loops.len(),
        loops.len() - positive,
        total_samples as f64 / loops.len() as f64
    ));

    if loops.iter().any(|lp| !lp.closed) {
        output.push_str("  (括号) 开口尾环，面积不计入耗能统计与阻尼 / open trailing loop\n");
    }
    if filter != DirectionFilter::Both {
        output.push_str("  * 不在分析方向内，不计入耗能统计\n");
    }
    output.push('\n');
    output
}

/// 组装完整文本报告
pub fn format_text_report(processed: &ProcessedFile, config: &AppConfig) -> String {
    let result = &processed.result;
    let mut output = create_output_header(processed);

    output.push_str(&format_preprocess_report(&processed.preprocess));
    output.push_str(&format_config(result));
    output.push_str(&format_skeleton_start_points(result));
    output.push_str(&format_metrics(result));
    output.push_str(&format_ductility(result));
    if config.all_methods {
        output.push_str(&format_all_ductility(&result.all_ductility()));
    }
    output.push_str(&format_loop_table(&result.loops, result.config.direction));

    if result.config.skeleton_method == SkeletonMethod::PeakPoints {
        output.push_str(
            "注: 峰值点法骨架曲线保留锯齿形状，不保证单调\n\
             Note: Peak-Points skeleton keeps the zig-zag and is not monotonic\n",
        );
    }
    output.push_str(DOUBLE_SEPARATOR);

    output
}

/// JSON报告
#[derive(Serialize)]
struct JsonReport<'a> {
    tool: String,
    generated_at: String,
    file: String,
    raw_samples: usize,
    header_rows: usize,
    preprocess: &'a PreprocessReport,
    result: &'a AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    all_ductility: Option<Vec<DuctilityResult>>,
}

/// 组装JSON报告
pub fn format_json_report(processed: &ProcessedFile, config: &AppConfig) -> HysResult<String> {
    let report = JsonReport {
        tool: app_info::format_output_header(VERSION),
        generated_at: chrono::Local::now().to_rfc3339(),
        file: utils::extract_filename_lossy(&processed.path),
        raw_samples: processed.raw_samples,
        header_rows: processed.header_rows,
        preprocess: &processed.preprocess,
        result: &processed.result,
        all_ductility: config
            .all_methods
            .then(|| processed.result.all_ductility()),
    };
    let mut text = serde_json::to_string_pretty(&report)?;
    text.push('\n');
    Ok(text)
}

/// 单文件报告的自动保存路径
pub fn individual_output_path(data_file: &Path, config: &AppConfig) -> PathBuf {
    let parent_dir = utils::get_parent_dir(data_file);
    let file_stem = utils::extract_file_stem_string(data_file);
    parent_dir.join(format!(
        "{file_stem}_Hys_Analysis.{}",
        config.output_extension()
    ))
}

/// 处理输出写入（文件或控制台）
pub fn write_output(output: &str, config: &AppConfig, auto_save: bool) -> HysResult<()> {
    match &config.output_path {
        Some(output_path) => {
            // 用户指定了输出文件路径
            std::fs::write(output_path, output)?;
            println!("📄 结果已保存到: {}", output_path.display());
        }
        None => {
            if auto_save {
                // 自动保存模式：生成基于数据文件名的输出文件路径
                let auto_output_path = individual_output_path(&config.input_path, config);
                std::fs::write(&auto_output_path, output)?;
                println!("📄 结果已保存到: {}", auto_output_path.display());
            } else {
                // 控制台输出模式
                print!("{output}");
            }
        }
    }
    Ok(())
}
