#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: 로그 파일 tail (로테이션/truncation 감지)
//! - [`rule`]: 순서 있는 정규식 규칙으로 줄 분류 (인증 로그 내장 테이블, 요청 로그 패턴)
//! - [`extract`]: 매칭 결과를 이벤트 레코드로 변환
//! - [`geo`]: MaxMind GeoIP DB 조회와 공유 핸들
//! - [`enrich`]: 제외 목록/내부 대역 정책과 지리 조회
//! - [`sink`]: 이벤트를 레이블이 붙은 카운터로 기록
//! - [`pipeline`]: 소스 파이프라인 (Pipeline trait 구현)
//! - [`supervisor`]: 파이프라인 집합과 GeoIP DB 생명주기 관리
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod collector;
pub mod config;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod geo;
pub mod pipeline;
pub mod rule;
pub mod sink;
pub mod supervisor;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{
    AuthLogPipeline, AuthSource, EventSource, LineOutcome, LineProcessor, RequestLogPipeline,
    RequestSource, SourcePipeline, SourcePipelineBuilder, StatsSnapshot,
};
pub use supervisor::{StartReport, Supervisor};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 규칙 엔진
pub use rule::{Classification, RuleMatch, RuleSet, auth_ruleset, request_ruleset};

// 수집기
pub use collector::{FileTailer, TailConfig};

// enrichment / 기록
pub use enrich::Enricher;
pub use geo::{GeoLookup, MaxMindGeoDatabase, SharedGeoDatabase};
pub use sink::{MetricKey, MetricSink};
