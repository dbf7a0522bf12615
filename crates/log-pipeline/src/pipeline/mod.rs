//! 소스 파이프라인 -- 로그 파일 하나의 tail/분류/enrichment/기록 흐름을 관리합니다.
//!
//! [`SourcePipeline`]은 core의 [`Pipeline`] trait을 구현하여
//! supervisor가 두 소스 종류를 같은 생명주기로 관리할 수 있게 합니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileTailer -> mpsc -> LineProcessor (classify -> extract -> enrich -> record)
//! ```
//!
//! 한 파이프라인 안에서는 도착 순서가 끝까지 보존됩니다.

pub mod processor;
pub mod source;

pub use processor::{LineOutcome, LineProcessor, PipelineStats, StatsSnapshot};
pub use source::{AuthSource, EventSource, RequestSource};

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use logmeter_core::error::{LogmeterError, PipelineError};
use logmeter_core::event::{Event, LineRecord};
use logmeter_core::pipeline::{HealthStatus, Pipeline, PipelineInfo, PipelineState};

use crate::collector::{FileTailer, TailConfig, TailControl};
use crate::enrich::Enricher;
use crate::error::LogPipelineError;

/// 인증 로그 파이프라인
pub type AuthLogPipeline = SourcePipeline<AuthSource>;

/// 요청 로그 파이프라인
pub type RequestLogPipeline = SourcePipeline<RequestSource>;

/// 소스 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use logmeter_log_pipeline::pipeline::{AuthSource, SourcePipeline};
///
/// let mut pipeline = SourcePipeline::builder(AuthSource::new(rules), "/var/log/auth.log")
///     .enricher(enricher)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct SourcePipeline<S: EventSource> {
    info: PipelineInfo,
    state: PipelineState,
    path: PathBuf,
    tail_config: TailConfig,
    from_start: bool,
    /// 실행 중에는 처리 태스크가 소유하고, 정지 시 돌려받음
    processor: Option<LineProcessor<S>>,
    stats: Arc<PipelineStats>,
    /// 외부에서 주입한 줄 채널 (설정 시 파일 대신 사용)
    injected_rx: Option<mpsc::Receiver<LineRecord>>,
    tail: Option<TailControl>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<LineProcessor<S>>>,
}

impl<S: EventSource> SourcePipeline<S> {
    /// 빌더를 생성합니다.
    pub fn builder(source: S, path: impl Into<PathBuf>) -> SourcePipelineBuilder<S> {
        SourcePipelineBuilder::new(source, path)
    }

    /// 처리 통계를 반환합니다.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// 마지막으로 기록된 이벤트를 반환합니다 (진단용).
    pub fn last_event(&self) -> Option<Event> {
        self.stats.last_event()
    }

    async fn open_lines(&mut self) -> Result<mpsc::Receiver<LineRecord>, LogPipelineError> {
        if let Some(rx) = self.injected_rx.take() {
            debug!(pipeline = %self.info.name, "using injected line channel");
            return Ok(rx);
        }
        let handle = FileTailer::new(&self.path, self.tail_config.clone())
            .open(!self.from_start)
            .await?;
        let (rx, control) = handle.into_parts();
        self.tail = Some(control);
        Ok(rx)
    }
}

impl<S: EventSource> Pipeline for SourcePipeline<S> {
    fn info(&self) -> &PipelineInfo {
        &self.info
    }

    fn state(&self) -> PipelineState {
        self.state
    }

    async fn start(&mut self) -> Result<(), LogmeterError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(pipeline = %self.info.name, path = %self.info.path, "starting source pipeline");

        let rx = match self.open_lines().await {
            Ok(rx) => rx,
            Err(e) => {
                self.state = PipelineState::Failed;
                error!(pipeline = %self.info.name, error = %e, "failed to start source pipeline");
                return Err(e.into());
            }
        };

        let Some(processor) = self.processor.take() else {
            self.state = PipelineState::Failed;
            return Err(PipelineError::StartFailed("line processor unavailable".to_owned()).into());
        };

        let cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(run(
            self.info.name.clone(),
            processor,
            rx,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);

        self.state = PipelineState::Running;
        info!(pipeline = %self.info.name, "source pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogmeterError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!(pipeline = %self.info.name, "stopping source pipeline");

        // 1. tail 중지 (송신측이 닫히면 처리 루프가 남은 줄을 모두 처리)
        if let Some(tail) = self.tail.take() {
            tail.release().await;
        }

        // 2. 처리 루프 취소 후 대기
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(processor) => self.processor = Some(processor),
                Err(e) => {
                    self.state = PipelineState::Stopped;
                    error!(pipeline = %self.info.name, error = %e, "processing task failed");
                    return Err(PipelineError::StopFailed(e.to_string()).into());
                }
            }
        }

        self.state = PipelineState::Stopped;
        let stats = self.stats.snapshot();
        info!(
            pipeline = %self.info.name,
            lines_read = stats.lines_read,
            events_recorded = stats.events_recorded,
            "source pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if self.task.as_ref().is_none_or(JoinHandle::is_finished) {
                    HealthStatus::Unhealthy("processing task exited".to_owned())
                } else if self.tail.as_ref().is_some_and(TailControl::is_finished) {
                    HealthStatus::Degraded("tail task exited".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Created => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
            PipelineState::Failed => HealthStatus::Unhealthy("start failed".to_owned()),
        }
    }
}

/// 처리 루프 -- 취소되면 이미 받은 줄을 모두 처리한 뒤 처리기를 돌려줍니다.
async fn run<S: EventSource>(
    name: String,
    processor: LineProcessor<S>,
    mut rx: mpsc::Receiver<LineRecord>,
    cancel: CancellationToken,
) -> LineProcessor<S> {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let mut drained = 0usize;
                while let Ok(record) = rx.try_recv() {
                    processor.process(&record);
                    drained += 1;
                }
                debug!(pipeline = %name, drained, "processing loop cancelled");
                break;
            }
            received = rx.recv() => match received {
                Some(record) => {
                    processor.process(&record);
                }
                None => {
                    debug!(pipeline = %name, "line channel closed");
                    break;
                }
            }
        }
    }
    processor
}

/// 소스 파이프라인 빌더
pub struct SourcePipelineBuilder<S: EventSource> {
    source: S,
    path: PathBuf,
    name: Option<String>,
    enricher: Option<Arc<Enricher>>,
    tail_config: TailConfig,
    from_start: bool,
    line_rx: Option<mpsc::Receiver<LineRecord>>,
}

impl<S: EventSource> SourcePipelineBuilder<S> {
    /// 새 빌더를 생성합니다.
    pub fn new(source: S, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
            name: None,
            enricher: None,
            tail_config: TailConfig::default(),
            from_start: false,
            line_rx: None,
        }
    }

    /// 파이프라인 이름을 지정합니다. 기본값은 소스 종류 이름입니다.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 공유 enrichment 정책을 지정합니다.
    pub fn enricher(mut self, enricher: Arc<Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// tail 설정을 지정합니다.
    pub fn tail_config(mut self, config: TailConfig) -> Self {
        self.tail_config = config;
        self
    }

    /// 파일 처음부터 읽을지 지정합니다.
    pub fn from_start(mut self, from_start: bool) -> Self {
        self.from_start = from_start;
        self
    }

    /// 파일 대신 사용할 줄 채널을 지정합니다.
    pub fn line_receiver(mut self, rx: mpsc::Receiver<LineRecord>) -> Self {
        self.line_rx = Some(rx);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// enrichment 정책을 지정하지 않으면 GeoIP 없이 내부 주소 태그만 계산합니다.
    pub fn build(self) -> Result<SourcePipeline<S>, LogPipelineError> {
        let enricher = match self.enricher {
            Some(enricher) => enricher,
            None => Arc::new(Enricher::new(&[], None)?),
        };
        let processor = LineProcessor::new(self.source, enricher);
        let stats = processor.stats();

        Ok(SourcePipeline {
            info: PipelineInfo {
                name: self.name.unwrap_or_else(|| S::KIND.as_str().to_owned()),
                kind: S::KIND,
                path: self.path.display().to_string(),
            },
            state: PipelineState::Created,
            path: self.path,
            tail_config: self.tail_config,
            from_start: self.from_start,
            processor: Some(processor),
            stats,
            injected_rx: self.line_rx,
            tail: None,
            cancel: None,
            task: None,
        })
    }
}
