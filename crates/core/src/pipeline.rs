//! 파이프라인 trait -- 소스 파이프라인 생명주기 정의
//!
//! [`Pipeline`]은 감시 대상 로그 파일 하나를 담당하는 소스 파이프라인의
//! 공통 능력(start, stop, health_check)을 정의합니다.
//! 인증 로그와 요청 로그 파이프라인이 각각 이 trait을 구현합니다.
//!
//! # 생명주기
//! ```text
//! Created → start() → Running → stop() → Stopped
//!              └── 실패 → Failed
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::LogmeterError;
use crate::event::SourceKind;

/// `dyn` 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─── PipelineInfo ────────────────────────────────────────────────────

/// 파이프라인 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// 파이프라인 고유 이름 (예: `"auth"`)
    pub name: String,
    /// 소스 종류
    pub kind: SourceKind,
    /// 감시 대상 파일 경로
    pub path: String,
}

// ─── PipelineState ───────────────────────────────────────────────────

/// 파이프라인 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// 생성됨 (start 전)
    Created,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
    /// 시작 실패
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ─── HealthStatus ────────────────────────────────────────────────────

/// 파이프라인 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 문제가 있음
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }

    /// 두 상태 중 더 나쁜 쪽을 반환합니다.
    pub fn worst(self, other: Self) -> Self {
        match (&self, &other) {
            (Self::Unhealthy(_), _) => self,
            (_, Self::Unhealthy(_)) => other,
            (Self::Degraded(_), _) => self,
            (_, Self::Degraded(_)) => other,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

// ─── Pipeline Trait ──────────────────────────────────────────────────

/// 소스 파이프라인 trait
///
/// # 구현 예시
/// ```ignore
/// impl Pipeline for MyPipeline {
///     fn info(&self) -> &PipelineInfo { &self.info }
///     fn state(&self) -> PipelineState { self.state }
///
///     async fn start(&mut self) -> Result<(), LogmeterError> {
///         self.state = PipelineState::Running;
///         Ok(())
///     }
///     async fn stop(&mut self) -> Result<(), LogmeterError> {
///         self.state = PipelineState::Stopped;
///         Ok(())
///     }
///     async fn health_check(&self) -> HealthStatus {
///         HealthStatus::Healthy
///     }
/// }
/// ```
pub trait Pipeline: Send + Sync {
    /// 파이프라인 메타데이터를 반환합니다.
    fn info(&self) -> &PipelineInfo;

    /// 현재 상태를 반환합니다.
    fn state(&self) -> PipelineState;

    /// 파이프라인을 시작합니다.
    ///
    /// `Created` 또는 `Stopped` 상태에서만 호출 가능합니다.
    /// 소스 파일을 열 수 없으면 `Failed` 상태로 전환하고 에러를 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LogmeterError>> + Send;

    /// 파이프라인을 정지합니다.
    ///
    /// tail 핸들을 취소하고 읽기 태스크가 끝날 때까지 기다립니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LogmeterError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

// ─── DynPipeline Trait ───────────────────────────────────────────────

/// dyn-compatible 파이프라인 trait
///
/// `Pipeline` trait은 RPITIT를 사용하므로 `dyn Pipeline`이 불가합니다.
/// `DynPipeline`은 `BoxFuture`를 반환하여 `Vec<Box<dyn DynPipeline>>`으로
/// 서로 다른 소스 파이프라인을 함께 관리할 수 있게 합니다.
pub trait DynPipeline: Send + Sync {
    /// 파이프라인 메타데이터를 반환합니다.
    fn info(&self) -> &PipelineInfo;

    /// 현재 상태를 반환합니다.
    fn state(&self) -> PipelineState;

    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), LogmeterError>>;

    /// 파이프라인을 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogmeterError>>;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

/// Pipeline을 구현한 타입은 자동으로 DynPipeline도 구현됩니다.
impl<T: Pipeline> DynPipeline for T {
    fn info(&self) -> &PipelineInfo {
        Pipeline::info(self)
    }

    fn state(&self) -> PipelineState {
        Pipeline::state(self)
    }

    fn start(&mut self) -> BoxFuture<'_, Result<(), LogmeterError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogmeterError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    struct MockPipeline {
        info: PipelineInfo,
        state: PipelineState,
        fail_on_start: bool,
    }

    impl MockPipeline {
        fn new(name: &str) -> Self {
            Self {
                info: PipelineInfo {
                    name: name.to_owned(),
                    kind: SourceKind::Auth,
                    path: "/var/log/auth.log".to_owned(),
                },
                state: PipelineState::Created,
                fail_on_start: false,
            }
        }
    }

    impl Pipeline for MockPipeline {
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
            if self.fail_on_start {
                self.state = PipelineState::Failed;
                return Err(PipelineError::StartFailed("mock".to_owned()).into());
            }
            self.state = PipelineState::Running;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), LogmeterError> {
            if self.state != PipelineState::Running {
                return Err(PipelineError::NotRunning.into());
            }
            self.state = PipelineState::Stopped;
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            match self.state {
                PipelineState::Running => HealthStatus::Healthy,
                PipelineState::Failed => HealthStatus::Unhealthy("failed".to_owned()),
                _ => HealthStatus::Degraded("not running".to_owned()),
            }
        }
    }

    #[tokio::test]
    async fn dyn_pipeline_lifecycle() {
        let mut pipelines: Vec<Box<dyn DynPipeline>> = vec![
            Box::new(MockPipeline::new("auth")),
            Box::new(MockPipeline::new("request")),
        ];

        for p in &mut pipelines {
            p.start().await.unwrap();
            assert_eq!(p.state(), PipelineState::Running);
            assert!(p.health_check().await.is_healthy());
        }
        for p in &mut pipelines {
            p.stop().await.unwrap();
            assert_eq!(p.state(), PipelineState::Stopped);
        }
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut p = MockPipeline::new("auth");
        Pipeline::start(&mut p).await.unwrap();
        let err = Pipeline::start(&mut p).await.unwrap_err();
        assert!(matches!(
            err,
            LogmeterError::Pipeline(PipelineError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn failed_start_reports_unhealthy() {
        let mut p = MockPipeline::new("auth");
        p.fail_on_start = true;
        assert!(Pipeline::start(&mut p).await.is_err());
        assert_eq!(Pipeline::state(&p), PipelineState::Failed);
        assert!(Pipeline::health_check(&p).await.is_unhealthy());
    }

    #[test]
    fn worst_health_wins() {
        let degraded = HealthStatus::Degraded("slow".to_owned());
        let unhealthy = HealthStatus::Unhealthy("down".to_owned());

        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Healthy),
            HealthStatus::Healthy
        );
        assert_eq!(HealthStatus::Healthy.worst(degraded.clone()), degraded);
        assert_eq!(degraded.clone().worst(unhealthy.clone()), unhealthy);
        assert_eq!(unhealthy.clone().worst(HealthStatus::Healthy), unhealthy);
    }

    #[test]
    fn state_display() {
        assert_eq!(PipelineState::Created.to_string(), "created");
        assert_eq!(PipelineState::Failed.to_string(), "failed");
    }
}
