//! 常量和默认配置集中管理
//!
//! 将所有阈值与默认值集中定义，避免"默认值漂移"和重复定义

/// 预处理常量
pub mod preprocess {
    /// 位移噪声阈值相对量程的比例（0.1%）
    pub const DISP_NOISE_RATIO: f64 = 0.001;

    /// 位移噪声阈值下限
    pub const DISP_NOISE_FLOOR: f64 = 0.001;

    /// 荷载噪声阈值相对量程的比例（0.1%）
    pub const FORCE_NOISE_RATIO: f64 = 0.001;

    /// 荷载噪声阈值下限
    pub const FORCE_NOISE_FLOOR: f64 = 0.01;

    /// 去重容差 = 位移阈值 × 该系数
    pub const DEDUP_TOLERANCE_FACTOR: f64 = 0.5;

    /// 零点偏移识别：首个 |D| 或 |F| 超过 该系数 × 阈值 的样本视为加载起点
    pub const LOADING_START_FACTOR: f64 = 2.0;
}

/// 滞回环提取常量
pub mod loops {
    /// 反向识别容差（相对最大位移幅值）
    ///
    /// 位移从当前极值回退超过 max|D| × 该比例 才确认为转折点，
    /// 用于抑制噪声引起的伪反向
    pub const REVERSAL_TOLERANCE: f64 = 0.005;

    /// 反向识别容差的绝对下限
    pub const REVERSAL_TOLERANCE_FLOOR: f64 = 1e-9;

    /// 构成有效滞回环的最少样本数
    pub const MIN_LOOP_SAMPLES: usize = 3;

    /// "仅首圈"模式下的同级判定容差（相对峰值位移）
    pub const LEVEL_TOLERANCE: f64 = 0.08;
}

/// 骨架曲线常量
pub mod skeleton {
    /// 外包络阈值相对最大位移的比例
    pub const ENVELOPE_THRESHOLD_RATIO: f64 = 0.005;

    /// 外包络阈值下限
    pub const ENVELOPE_THRESHOLD_FLOOR: f64 = 0.01;

    /// 外包络步进系数：新峰值需超过当前最大值 该系数 × 阈值
    pub const ENVELOPE_STEP_FACTOR: f64 = 0.1;

    /// 峰值点法阈值相对最大位移的比例（1%）
    pub const PEAK_THRESHOLD_RATIO: f64 = 0.01;

    /// 峰值点法阈值下限
    pub const PEAK_THRESHOLD_FLOOR: f64 = 0.01;
}

/// 指标计算常量
pub mod metrics {
    /// 自适应初始刚度窗口：最少样本数
    pub const STIFFNESS_WINDOW_MIN: usize = 5;

    /// 自适应初始刚度窗口：最多样本数
    pub const STIFFNESS_WINDOW_MAX: usize = 20;

    /// 初始刚度窗口占序列长度的比例
    pub const STIFFNESS_WINDOW_FRACTION: f64 = 0.10;

    /// 等效粘滞阻尼分母常数（ξ = E_D / (2π·E_S)）
    pub const DAMPING_DENOMINATOR: f64 = 2.0 * std::f64::consts::PI;
}

/// 延性计算常量
pub mod ductility {
    /// 几何作图法屈服荷载比例
    pub const GEOMETRIC_YIELD_RATIO: f64 = 0.75;

    /// ASCE法屈服荷载比例
    pub const ASCE_YIELD_RATIO: f64 = 0.60;

    /// Park法割线刚度折减系数（K₀/3）
    pub const PARK_STIFFNESS_DIVISOR: f64 = 3.0;

    /// EEEP二分法相对容差
    pub const EEEP_TOLERANCE: f64 = 1e-4;

    /// EEEP二分法最大迭代次数
    pub const EEEP_MAX_ITERATIONS: usize = 100;

    /// μ < 1 判定时允许的相对浮点误差
    pub const YIELD_OVERSHOOT_EPSILON: f64 = 1e-9;
}

/// 默认配置值
pub mod defaults {
    /// 默认多文件并行并发度
    ///
    /// 单次分析开销很小，4并发度足以覆盖常见批量规模
    pub const PARALLEL_FILES_DEGREE: usize = 4;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}

/// 应用信息
pub mod app_info {
    /// 报告中显示的工具名称
    pub const TOOL_NAME: &str = "HysAnalysis Hysteresis Analyzer";

    /// 生成报告头部的版本标识
    pub fn format_output_header(version: &str) -> String {
        format!("{TOOL_NAME} v{version}")
    }
}
