//! 后台分析协调器
//!
//! 在独立工作线程上执行完整分析过程，宿主线程保持响应。
//!
//! - 每次提交分配单调递增的代号（generation）
//! - 工作线程只发布完整的 [`AnalysisResult`]，从不发布中间状态
//! - 队列中积压的旧请求在开始计算前被跳过
//! - 宿主只接收最新代号的结果，过期结果直接丢弃
//! - 最新代号的结果被 `poll` 取走后，`wait_latest` 直接返回已交付的结果
//!
//! 没有取消和超时：新请求只是让在途的旧结果在完成后作废。

use crate::core::analyzer::{AnalysisConfig, AnalysisResult, AnalysisSession};
use crate::core::sample::CleanedSeries;
use crate::error::{AnalysisError, HysResult};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::thread::JoinHandle;

/// 分析请求
struct AnalysisRequest {
    generation: u64,
    series: CleanedSeries,
    config: AnalysisConfig,
}

/// 工作线程发布的完整结果
#[derive(Debug)]
pub struct PublishedResult {
    pub generation: u64,
    pub result: HysResult<Arc<AnalysisResult>>,
}

/// 已交付给宿主的最新结果
enum Delivered {
    Ready(Arc<AnalysisResult>),
    Failed(AnalysisError),
}

/// 后台分析协调器
pub struct AnalysisCoordinator {
    request_tx: Option<Sender<AnalysisRequest>>,
    result_rx: Receiver<PublishedResult>,
    worker: Option<JoinHandle<()>>,
    /// 最近一次提交的代号（0 = 尚未提交）
    newest_generation: u64,
    /// 最近一次成功发布的结果
    current: Option<Arc<AnalysisResult>>,
    /// 已交付的最新代号及其结果
    delivered: Option<(u64, Delivered)>,
}

impl AnalysisCoordinator {
    /// 启动工作线程
    pub fn new() -> HysResult<Self> {
        let (request_tx, request_rx) = unbounded::<AnalysisRequest>();
        let (result_tx, result_rx) = unbounded::<PublishedResult>();

        let worker = std::thread::Builder::new()
            .name("hys-analysis-worker".to_string())
            .spawn(move || run_worker(request_rx, result_tx))
            .map_err(|e| AnalysisError::ResourceError(format!("分析线程启动失败: {e}")))?;

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            worker: Some(worker),
            newest_generation: 0,
            current: None,
            delivered: None,
        })
    }

    /// 提交分析请求，返回其代号
    pub fn submit(&mut self, series: CleanedSeries, config: AnalysisConfig) -> HysResult<u64> {
        let generation = self.newest_generation + 1;
        let request = AnalysisRequest {
            generation,
            series,
            config,
        };

        self.request_tx
            .as_ref()
            .ok_or_else(|| AnalysisError::ResourceError("分析线程已关闭".to_string()))?
            .send(request)
            .map_err(|_| AnalysisError::ResourceError("分析线程已退出".to_string()))?;

        self.newest_generation = generation;
        log::debug!("提交分析请求 #{generation}");
        Ok(generation)
    }

    /// 非阻塞轮询：返回最新代号的结果（若已完成），过期结果丢弃
    pub fn poll(&mut self) -> Option<PublishedResult> {
        let mut newest = None;
        while let Ok(published) = self.result_rx.try_recv() {
            if let Some(p) = self.accept(published) {
                newest = Some(p);
            }
        }
        newest
    }

    /// 阻塞等待最新代号的结果
    pub fn wait_latest(&mut self) -> HysResult<Arc<AnalysisResult>> {
        if self.newest_generation == 0 {
            return Err(AnalysisError::InvalidInput("尚未提交分析请求".to_string()));
        }
        if let Some((generation, outcome)) = &self.delivered
            && *generation == self.newest_generation
        {
            return match outcome {
                Delivered::Ready(result) => Ok(Arc::clone(result)),
                Delivered::Failed(error) => Err(replay_error(error)),
            };
        }
        loop {
            let published = self
                .result_rx
                .recv()
                .map_err(|_| AnalysisError::ResourceError("分析线程已退出".to_string()))?;
            if let Some(p) = self.accept(published) {
                return p.result;
            }
        }
    }

    /// 最近一次成功发布的完整结果
    pub fn current(&self) -> Option<Arc<AnalysisResult>> {
        self.current.clone()
    }

    /// 最近一次提交的代号
    pub fn newest_generation(&self) -> u64 {
        self.newest_generation
    }

    fn accept(&mut self, published: PublishedResult) -> Option<PublishedResult> {
        if published.generation < self.newest_generation {
            log::debug!(
                "丢弃过期分析结果 #{}（最新 #{}）",
                published.generation,
                self.newest_generation
            );
            return None;
        }
        let outcome = match &published.result {
            Ok(result) => {
                self.current = Some(Arc::clone(result));
                Delivered::Ready(Arc::clone(result))
            }
            Err(error) => Delivered::Failed(replay_error(error)),
        };
        self.delivered = Some((published.generation, outcome));
        Some(published)
    }
}

/// 复制一份错误用于重复交付（`io::Error` 不可克隆，按类型与消息重建）
fn replay_error(error: &AnalysisError) -> AnalysisError {
    match error {
        AnalysisError::NoValidSamples => AnalysisError::NoValidSamples,
        AnalysisError::InvalidInput(msg) => AnalysisError::InvalidInput(msg.clone()),
        AnalysisError::IoError(e) => {
            AnalysisError::IoError(std::io::Error::new(e.kind(), e.to_string()))
        }
        AnalysisError::FormatError(msg) => AnalysisError::FormatError(msg.clone()),
        AnalysisError::Metric(e) => AnalysisError::Metric(e.clone()),
        AnalysisError::ResourceError(msg) => AnalysisError::ResourceError(msg.clone()),
    }
}

impl Drop for AnalysisCoordinator {
    fn drop(&mut self) {
        // 关闭请求通道让工作线程退出
        self.request_tx.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::warn!("分析线程异常退出");
        }
    }
}

fn run_worker(requests: Receiver<AnalysisRequest>, results: Sender<PublishedResult>) {
    let mut session = AnalysisSession::new();

    while let Ok(mut request) = requests.recv() {
        // 跳过积压的旧请求，只算最新的
        while let Ok(newer) = requests.try_recv() {
            log::debug!("跳过被取代的请求 #{}", request.generation);
            request = newer;
        }

        let result = session.analyze(&request.series, &request.config);
        let published = PublishedResult {
            generation: request.generation,
            result,
        };
        if results.send(published).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ductility::DuctilityMethod;

    fn series() -> CleanedSeries {
        let pairs: Vec<(f64, f64)> = (0..=20)
            .chain((0..40).map(|k| 19 - k))
            .chain((0..20).map(|k| -19 + k))
            .map(|d| (f64::from(d), 2.0 * f64::from(d)))
            .collect();
        CleanedSeries::from_pairs(&pairs)
    }

    #[test]
    fn test_wait_latest_returns_newest_generation() {
        let mut coordinator = AnalysisCoordinator::new().unwrap();
        let config = AnalysisConfig::default();

        coordinator.submit(series(), config.clone()).unwrap();
        let newest = AnalysisConfig {
            ductility_method: DuctilityMethod::Geometric,
            ..config
        };
        let generation = coordinator.submit(series(), newest).unwrap();
        assert_eq!(generation, 2);

        let result = coordinator.wait_latest().unwrap();
        assert_eq!(result.ductility.method, DuctilityMethod::Geometric);
        assert!(coordinator.current().is_some());
        // 所有在途结果都已被消费或丢弃
        assert!(coordinator.poll().is_none());
    }

    #[test]
    fn test_failed_analysis_keeps_previous_result() {
        let mut coordinator = AnalysisCoordinator::new().unwrap();
        coordinator
            .submit(series(), AnalysisConfig::default())
            .unwrap();
        let first = coordinator.wait_latest().unwrap();

        coordinator
            .submit(CleanedSeries::default(), AnalysisConfig::default())
            .unwrap();
        assert!(matches!(
            coordinator.wait_latest(),
            Err(AnalysisError::NoValidSamples)
        ));
        let current = coordinator.current().unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn test_wait_after_poll_returns_delivered_result() {
        let mut coordinator = AnalysisCoordinator::new().unwrap();
        let generation = coordinator
            .submit(series(), AnalysisConfig::default())
            .unwrap();

        // 轮询直到最新结果交付
        let polled = loop {
            if let Some(published) = coordinator.poll() {
                break published;
            }
            std::thread::yield_now();
        };
        assert_eq!(polled.generation, generation);
        let polled = polled.result.unwrap();

        // 工作线程已空闲，再次等待不会阻塞
        let waited = coordinator.wait_latest().unwrap();
        assert!(Arc::ptr_eq(&polled, &waited));
        let again = coordinator.wait_latest().unwrap();
        assert!(Arc::ptr_eq(&waited, &again));
    }

    #[test]
    fn test_wait_after_delivered_failure_repeats_error() {
        let mut coordinator = AnalysisCoordinator::new().unwrap();
        coordinator
            .submit(CleanedSeries::default(), AnalysisConfig::default())
            .unwrap();
        assert!(matches!(
            coordinator.wait_latest(),
            Err(AnalysisError::NoValidSamples)
        ));
        assert!(matches!(
            coordinator.wait_latest(),
            Err(AnalysisError::NoValidSamples)
        ));
        assert!(coordinator.current().is_none());
    }

    #[test]
    fn test_wait_without_submission() {
        let mut coordinator = AnalysisCoordinator::new().unwrap();
        assert!(matches!(
            coordinator.wait_latest(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }
}
