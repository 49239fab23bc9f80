//! 信号执行队列
//!
//! 每个分区键 (user, exchange, symbol) 一条有序队列：键内按到达顺序
//! 严格串行，键间并行，全局并发由信号量封顶。这是风控快照到下单之间
//! 不被并发打穿的第一道机制，协调器内部的键级互斥是第二道。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::time_util::now_timestamp_mills;
use crate::trading::model::repository::EngineRepository;
use crate::trading::model::signal::{SignalEntity, SignalStatus};
use crate::trading::services::execution_service::ExecutionCoordinator;
use crate::trading::services::signal_service::{IngestAck, IngestRequest, SignalService};

pub struct SignalRunner {
    coordinator: Arc<ExecutionCoordinator>,
    repository: Arc<dyn EngineRepository>,
    semaphore: Arc<Semaphore>,
    senders: DashMap<String, mpsc::UnboundedSender<SignalEntity>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SignalRunner {
    pub fn new(
        coordinator: Arc<ExecutionCoordinator>,
        repository: Arc<dyn EngineRepository>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            coordinator,
            repository,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            senders: DashMap::new(),
            workers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// 入队。首次出现的键会启动该键的专属 worker。
    pub fn enqueue(&self, signal: SignalEntity) -> Result<(), AppError> {
        let key = signal.execution_key();
        let sender = self
            .senders
            .entry(key.clone())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                self.spawn_worker(key.clone(), rx);
                tx
            })
            .clone();
        sender
            .send(signal)
            .map_err(|_| AppError::BizError(format!("执行队列已关闭: key={}", key)))
    }

    fn spawn_worker(&self, key: String, mut rx: mpsc::UnboundedReceiver<SignalEntity>) {
        let coordinator = self.coordinator.clone();
        let repository = self.repository.clone();
        let semaphore = self.semaphore.clone();

        let handle = tokio::spawn(async move {
            debug!("执行 worker 启动: key={}", key);
            while let Some(signal) = rx.recv().await {
                let _permit = match semaphore.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                if let Err(e) = coordinator.execute(&signal).await {
                    // 内部错误必须可见，且信号不能停留在 queued
                    error!(
                        "信号执行内部错误: signal_id={}, err={}",
                        signal.id, e
                    );
                    mark_failed_best_effort(&repository, &signal.id, &e.to_string()).await;
                }
            }
            debug!("执行 worker 退出: key={}", key);
        });
        self.workers
            .lock()
            .expect("worker list lock poisoned")
            .push(handle);
    }

    /// 关闭：停止接收新信号，等待各键队列排空
    pub async fn shutdown(&self) {
        self.senders.clear();
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().expect("worker list lock poisoned");
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        info!("信号执行队列已排空退出");
    }
}

/// 内部错误兜底：把非终态信号标记为 failed
async fn mark_failed_best_effort(
    repository: &Arc<dyn EngineRepository>,
    signal_id: &str,
    message: &str,
) {
    let now = now_timestamp_mills();
    match repository.get_signal(signal_id).await {
        Ok(Some(mut signal)) if !signal.status.is_terminal() => {
            if signal
                .transition_to(
                    SignalStatus::Failed,
                    Some(format!("internal_error: {}", message)),
                    now,
                )
                .is_ok()
            {
                if let Err(e) = repository.update_signal(&signal).await {
                    error!("兜底标记信号失败也未成功: signal_id={}, err={}", signal_id, e);
                }
            }
        }
        Ok(_) => {}
        Err(e) => error!("兜底读取信号失败: signal_id={}, err={}", signal_id, e),
    }
}

/// 引擎门面：摄入 + 入队一步完成，外部传输层只需要持有它
pub struct SignalEngine {
    service: SignalService,
    runner: Arc<SignalRunner>,
    repository: Arc<dyn EngineRepository>,
}

impl SignalEngine {
    pub fn new(
        service: SignalService,
        runner: Arc<SignalRunner>,
        repository: Arc<dyn EngineRepository>,
    ) -> Self {
        Self {
            service,
            runner,
            repository,
        }
    }

    /// 摄入一条信号；校验通过的信号转 queued 并进入执行队列。
    /// 返回时执行尚未发生（异步），回执只反映摄入结果。
    pub async fn submit(&self, request: IngestRequest) -> Result<IngestAck, AppError> {
        let ack = self.service.ingest(request).await?;
        if ack.status != SignalStatus::Validated {
            return Ok(ack);
        }

        let mut signal = self
            .repository
            .get_signal(&ack.signal_id)
            .await?
            .ok_or_else(|| AppError::BizError(format!("信号丢失: {}", ack.signal_id)))?;
        signal.transition_to(SignalStatus::Queued, None, now_timestamp_mills())?;
        self.repository.update_signal(&signal).await?;
        self.runner.enqueue(signal)?;

        Ok(IngestAck {
            signal_id: ack.signal_id,
            status: SignalStatus::Queued,
            reason: None,
        })
    }
}
