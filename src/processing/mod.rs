//! 数据处理模块
//!
//! 分析引擎外围的处理服务：
//! - **预处理器**：原始样本 → 清洗后序列（去重、近零归零、零点偏移修正）
//! - **协调器**：在后台线程执行完整分析，只发布最新的完整结果

pub mod coordinator;
pub mod preprocessor;

// 重新导出公共接口
pub use coordinator::{AnalysisCoordinator, PublishedResult};
pub use preprocessor::{PreprocessConfig, PreprocessReport, PreprocessStats, Preprocessor};
