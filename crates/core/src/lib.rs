#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, LogmeterError, PipelineError};

// 설정
pub use config::LogmeterConfig;

// 이벤트
pub use event::{AuthEvent, Event, GeoLocation, LineRecord, RequestEvent, SourceKind};

// 파이프라인 trait
pub use pipeline::{DynPipeline, HealthStatus, Pipeline, PipelineInfo, PipelineState};
