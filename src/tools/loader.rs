//! 试验数据文件读取模块
//!
//! 支持两种纯文本格式，第1列为位移、第2列为荷载，多余的列忽略：
//! - `.txt`：空白分隔
//! - `.csv`：逗号分隔（csv crate 解析）
//!
//! 数据开始前的非数值行视为表头跳过；数据开始后出现非数值行则报格式错误。

use super::utils;
use crate::core::Sample;
use crate::error::{AnalysisError, HysResult, format_error};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// 支持的数据文件扩展名
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "csv"];

/// 数据文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// 空白分隔文本
    Text,
    /// 逗号分隔
    Csv,
}

impl DataFormat {
    /// 根据扩展名识别格式
    pub fn from_path(path: &Path) -> HysResult<Self> {
        match utils::extension_lowercase(path).as_deref() {
            Some("txt") => Ok(Self::Text),
            Some("csv") => Ok(Self::Csv),
            other => Err(AnalysisError::FormatError(format!(
                "不支持的文件格式 / unsupported file format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Text => "TXT",
            Self::Csv => "CSV",
        }
    }
}

/// 读取结果
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub format: DataFormat,
    pub samples: Vec<Sample>,
    /// 跳过的表头行数
    pub header_rows: usize,
}

/// 读取数据文件
pub fn load_samples(path: &Path) -> HysResult<LoadedData> {
    let format = DataFormat::from_path(path)?;
    let file = std::fs::File::open(path)?;

    let loaded = match format {
        DataFormat::Text => parse_text(BufReader::new(file))?,
        DataFormat::Csv => parse_csv(file)?,
    };
    log::debug!(
        "读取 {}: {} 个样本, 跳过表头 {} 行",
        utils::extract_filename(path),
        loaded.samples.len(),
        loaded.header_rows
    );
    Ok(LoadedData { format, ..loaded })
}

/// 解析空白分隔文本
pub fn parse_text<R: BufRead>(reader: R) -> HysResult<LoadedData> {
    let mut rows = RowCollector::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        rows.push(line_no + 1, &fields)?;
    }
    rows.finish(DataFormat::Text)
}

/// 解析CSV
pub fn parse_csv<R: Read>(reader: R) -> HysResult<LoadedData> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = RowCollector::default();
    for record in csv_reader.records() {
        let record = record?;
        let line_no = record.position().map_or(0, |p| p.line() as usize);
        let fields: Vec<&str> = record.iter().collect();
        rows.push(line_no, &fields)?;
    }
    rows.finish(DataFormat::Csv)
}

/// 逐行收集样本
#[derive(Default)]
struct RowCollector {
    samples: Vec<Sample>,
    header_rows: usize,
}

impl RowCollector {
    fn push(&mut self, line_no: usize, fields: &[&str]) -> HysResult<()> {
        if fields.iter().all(|f| f.is_empty()) {
            return Ok(());
        }

        // 只取前两列，其余列忽略
        let leading: Vec<Option<f64>> = fields
            .iter()
            .take(2)
            .map(|f| f.parse::<f64>().ok())
            .collect();
        match leading.as_slice() {
            [Some(displacement), Some(force)] => {
                self.samples.push(Sample::new(*displacement, *force));
                Ok(())
            }
            [Some(_)] => Err(format_error(
                &format!("第{line_no}行"),
                "文件必须至少包含2列（第1列位移，第2列荷载） / at least 2 columns required",
            )),
            _ if self.samples.is_empty() => {
                self.header_rows += 1;
                Ok(())
            }
            _ => Err(format_error(
                &format!("第{line_no}行"),
                format!("无法解析为数值 / not numeric: {}", fields.join(" ")),
            )),
        }
    }

    fn finish(self, format: DataFormat) -> HysResult<LoadedData> {
        if self.samples.is_empty() {
            return Err(AnalysisError::NoValidSamples);
        }
        Ok(LoadedData {
            format,
            samples: self.samples,
            header_rows: self.header_rows,
        })
    }
}
