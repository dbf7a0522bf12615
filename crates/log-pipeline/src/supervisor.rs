//! Supervisor -- 소스 파이프라인 집합과 공유 GeoIP DB의 생명주기를 관리합니다.
//!
//! # 순서
//! 1. `from_config`: GeoIP DB를 한 번 열고 (실패 시 어떤 파이프라인도 만들지 않음),
//!    설정된 소스마다 파이프라인을 구성
//! 2. `start_all`: 등록 순서대로 시작. 한 파이프라인의 실패가 다른 파이프라인을 막지 않음
//! 3. `stop_all`: 실행 중인 모든 파이프라인을 정지한 뒤 GeoIP DB를 닫음

use std::sync::Arc;

use tracing::{error, info, warn};

use logmeter_core::error::{LogmeterError, PipelineError};
use logmeter_core::pipeline::{DynPipeline, HealthStatus, PipelineState};

use crate::config::PipelineConfig;
use crate::enrich::Enricher;
use crate::error::LogPipelineError;
use crate::geo::SharedGeoDatabase;
use crate::pipeline::{AuthSource, RequestSource, SourcePipeline};
use crate::rule::{auth_ruleset, request_ruleset};

/// `start_all` 결과
#[derive(Debug, Default)]
pub struct StartReport {
    /// 시작된 파이프라인 이름
    pub started: Vec<String>,
    /// 시작 실패한 파이프라인 이름과 에러
    pub failed: Vec<(String, LogmeterError)>,
}

impl StartReport {
    /// 하나라도 시작되었는지 확인합니다.
    pub fn any_started(&self) -> bool {
        !self.started.is_empty()
    }
}

/// 파이프라인 supervisor
pub struct Supervisor {
    pipelines: Vec<Box<dyn DynPipeline>>,
    geo: Option<Arc<SharedGeoDatabase>>,
}

impl Supervisor {
    /// 빈 supervisor를 생성합니다.
    pub fn new(geo: Option<Arc<SharedGeoDatabase>>) -> Self {
        Self {
            pipelines: Vec::new(),
            geo,
        }
    }

    /// 설정으로 supervisor와 파이프라인을 구성합니다.
    ///
    /// GeoIP DB 경로가 주어졌는데 열 수 없으면 에러를 반환합니다.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, LogPipelineError> {
        config.validate()?;

        let geo = match config.geoip_db_path() {
            Some(path) => Some(Arc::new(SharedGeoDatabase::open(path)?)),
            None => {
                info!("no geoip database configured, location metrics disabled");
                None
            }
        };
        let enricher = Arc::new(Enricher::new(&config.excluded_ips, geo.clone())?);
        let mut supervisor = Self::new(geo);

        if let Some(path) = config.auth_log_path() {
            let rules = Arc::new(auth_ruleset()?);
            info!(rules = rules.rule_count(), ignore = rules.ignore_count(), "loaded auth rules");
            let pipeline = SourcePipeline::builder(AuthSource::new(rules), path)
                .enricher(Arc::clone(&enricher))
                .tail_config(config.tail_config())
                .from_start(config.from_start)
                .build()?;
            supervisor.register(Box::new(pipeline))?;
        }

        if let Some(path) = config.request_log_path() {
            let rules = Arc::new(request_ruleset(&config.request_pattern)?);
            let pipeline = SourcePipeline::builder(RequestSource::new(rules), path)
                .enricher(Arc::clone(&enricher))
                .tail_config(config.tail_config())
                .from_start(config.from_start)
                .build()?;
            supervisor.register(Box::new(pipeline))?;
        }

        Ok(supervisor)
    }

    /// 파이프라인을 등록합니다. 이름이 중복되면 에러입니다.
    pub fn register(&mut self, pipeline: Box<dyn DynPipeline>) -> Result<(), LogPipelineError> {
        let name = pipeline.info().name.clone();
        if self.pipelines.iter().any(|p| p.info().name == name) {
            return Err(LogPipelineError::Config {
                field: "pipelines".to_owned(),
                reason: format!("pipeline '{name}' already registered"),
            });
        }
        self.pipelines.push(pipeline);
        Ok(())
    }

    /// 등록된 파이프라인 수를 반환합니다.
    pub fn count(&self) -> usize {
        self.pipelines.len()
    }

    /// 공유 GeoIP DB 핸들을 반환합니다.
    pub fn geo(&self) -> Option<&Arc<SharedGeoDatabase>> {
        self.geo.as_ref()
    }

    /// 모든 파이프라인을 등록 순서대로 시작합니다.
    ///
    /// 실패한 파이프라인은 보고서에 기록하고 나머지를 계속 시작합니다.
    pub async fn start_all(&mut self) -> StartReport {
        let mut report = StartReport::default();
        for pipeline in &mut self.pipelines {
            let name = pipeline.info().name.clone();
            match pipeline.start().await {
                Ok(()) => report.started.push(name),
                Err(e) => {
                    error!(pipeline = %name, error = %e, "pipeline failed to start");
                    report.failed.push((name, e));
                }
            }
        }
        report
    }

    /// 실행 중인 모든 파이프라인을 정지하고 GeoIP DB를 닫습니다.
    pub async fn stop_all(&mut self) -> Result<(), LogmeterError> {
        let mut errors = Vec::new();
        for pipeline in &mut self.pipelines {
            if pipeline.state() != PipelineState::Running {
                continue;
            }
            if let Err(e) = pipeline.stop().await {
                warn!(pipeline = %pipeline.info().name, error = %e, "pipeline failed to stop");
                errors.push(format!("{}: {}", pipeline.info().name, e));
            }
        }

        if let Some(geo) = &self.geo {
            geo.close();
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::StopFailed(errors.join("; ")).into())
        }
    }

    /// 모든 파이프라인의 건강 상태를 반환합니다.
    pub async fn health_check_all(&self) -> Vec<(String, PipelineState, HealthStatus)> {
        let mut results = Vec::with_capacity(self.pipelines.len());
        for pipeline in &self.pipelines {
            let health = pipeline.health_check().await;
            results.push((pipeline.info().name.clone(), pipeline.state(), health));
        }
        results
    }
}
