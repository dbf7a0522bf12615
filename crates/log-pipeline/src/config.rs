//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LogmeterConfig`](logmeter_core::config::LogmeterConfig)에서
//! 소스/enrichment 설정을 가져오고, tail 튜닝 값을 더합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logmeter_core::config::LogmeterConfig;
//! use logmeter_log_pipeline::config::PipelineConfig;
//!
//! let core_config = LogmeterConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use logmeter_core::config::{DEFAULT_REQUEST_PATTERN, LogmeterConfig};
use serde::{Deserialize, Serialize};

use crate::collector::TailConfig;
use crate::error::LogPipelineError;

/// 로그 파이프라인 설정
///
/// 빈 경로 문자열은 해당 소스/DB를 사용하지 않음을 뜻합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 인증 로그 경로
    pub auth_log: String,
    /// 요청 로그 경로
    pub request_log: String,
    /// 요청 로그 정규식
    pub request_pattern: String,
    /// 파일 처음부터 읽기 (디버그 모드)
    pub from_start: bool,
    /// GeoIP DB 경로
    pub geoip_db: String,
    /// enrichment 제외 IP 목록
    pub excluded_ips: Vec<String>,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 파일 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 줄 길이 (바이트)
    pub max_line_length: usize,
    /// 소스별 줄 채널 용량
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auth_log: String::new(),
            request_log: String::new(),
            request_pattern: DEFAULT_REQUEST_PATTERN.to_owned(),
            from_start: false,
            geoip_db: String::new(),
            excluded_ips: Vec::new(),
            poll_interval_ms: 250,
            max_line_length: 64 * 1024,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &LogmeterConfig) -> Self {
        Self {
            auth_log: core.sources.auth_log.clone(),
            request_log: core.sources.request_log.clone(),
            request_pattern: core.sources.request_pattern.clone(),
            from_start: core.sources.from_start,
            geoip_db: core.enrichment.geoip_db.clone(),
            excluded_ips: core.enrichment.excluded_ips.clone(),
            ..Self::default()
        }
    }

    /// 인증 로그 경로 (설정된 경우)
    pub fn auth_log_path(&self) -> Option<&str> {
        non_empty(&self.auth_log)
    }

    /// 요청 로그 경로 (설정된 경우)
    pub fn request_log_path(&self) -> Option<&str> {
        non_empty(&self.request_log)
    }

    /// GeoIP DB 경로 (설정된 경우)
    pub fn geoip_db_path(&self) -> Option<&str> {
        non_empty(&self.geoip_db)
    }

    /// tail 설정을 만듭니다.
    pub fn tail_config(&self) -> TailConfig {
        TailConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_line_length: self.max_line_length,
            channel_capacity: self.channel_capacity,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 경로는 형식만 보고 존재 여부는 검사하지 않습니다. 상대 경로는 현재
    /// 작업 디렉토리 기준이며, 열기 실패는 해당 파이프라인 시작 시점에만 보고됩니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_POLL_INTERVAL_MS: u64 = 60_000;
        const MIN_LINE_LENGTH: usize = 256;
        const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(LogPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            });
        }

        if !(MIN_LINE_LENGTH..=MAX_LINE_LENGTH).contains(&self.max_line_length) {
            return Err(LogPipelineError::Config {
                field: "max_line_length".to_owned(),
                reason: format!("must be {MIN_LINE_LENGTH}-{MAX_LINE_LENGTH}"),
            });
        }

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.auth_log_path().is_none() && self.request_log_path().is_none() {
            return Err(LogPipelineError::Config {
                field: "sources".to_owned(),
                reason: "at least one of auth_log or request_log must be configured".to_owned(),
            });
        }

        if self.request_log_path().is_some() && self.request_pattern.trim().is_empty() {
            return Err(LogPipelineError::RequestPattern(
                "pattern must not be empty".to_owned(),
            ));
        }

        Ok(())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 인증 로그 경로를 설정합니다.
    pub fn auth_log(mut self, path: impl Into<String>) -> Self {
        self.config.auth_log = path.into();
        self
    }

    /// 요청 로그 경로를 설정합니다.
    pub fn request_log(mut self, path: impl Into<String>) -> Self {
        self.config.request_log = path.into();
        self
    }

    /// 요청 로그 정규식을 설정합니다.
    pub fn request_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.request_pattern = pattern.into();
        self
    }

    /// 파일 처음부터 읽을지 설정합니다.
    pub fn from_start(mut self, from_start: bool) -> Self {
        self.config.from_start = from_start;
        self
    }

    /// GeoIP DB 경로를 설정합니다.
    pub fn geoip_db(mut self, path: impl Into<String>) -> Self {
        self.config.geoip_db = path.into();
        self
    }

    /// 제외 IP 목록을 설정합니다.
    pub fn excluded_ips(mut self, ips: Vec<String>) -> Self {
        self.config.excluded_ips = ips;
        self
    }

    /// 폴링 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 최대 줄 길이를 설정합니다.
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config.max_line_length = len;
        self
    }

    /// 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_sources() {
        let config = PipelineConfig::default();
        assert!(config.auth_log_path().is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = LogmeterConfig::default();
        core.sources.auth_log = "/var/log/auth.log".to_owned();
        core.sources.from_start = true;
        core.enrichment.geoip_db = "/usr/share/GeoIP/GeoLite2-City.mmdb".to_owned();
        core.enrichment.excluded_ips = vec!["203.0.113.1".to_owned()];

        let config = PipelineConfig::from_core(&core);
        assert_eq!(config.auth_log_path(), Some("/var/log/auth.log"));
        assert!(config.request_log_path().is_none());
        assert!(config.from_start);
        assert_eq!(config.excluded_ips, ["203.0.113.1"]);
        // 확장 필드는 기본값
        assert_eq!(config.poll_interval_ms, 250);
        config.validate().unwrap();
    }

    #[test]
    fn tail_config_converts_units() {
        let config = PipelineConfigBuilder::new()
            .auth_log("/var/log/auth.log")
            .poll_interval_ms(100)
            .build()
            .unwrap();
        assert_eq!(config.tail_config().poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let result = PipelineConfigBuilder::new()
            .auth_log("/var/log/auth.log")
            .poll_interval_ms(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_tiny_line_length() {
        let result = PipelineConfigBuilder::new()
            .auth_log("/var/log/auth.log")
            .max_line_length(10)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn relative_paths_are_accepted() {
        let config = PipelineConfigBuilder::new()
            .auth_log("auth.log")
            .request_log("../logs/access.log")
            .geoip_db("GeoLite2-City.mmdb")
            .build()
            .unwrap();
        assert_eq!(config.auth_log_path(), Some("auth.log"));
        assert_eq!(config.request_log_path(), Some("../logs/access.log"));
        assert_eq!(config.geoip_db_path(), Some("GeoLite2-City.mmdb"));
    }

    #[test]
    fn validate_rejects_empty_request_pattern() {
        let err = PipelineConfigBuilder::new()
            .request_log("/var/log/nginx/access.log")
            .request_pattern("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, LogPipelineError::RequestPattern(_)));
    }

    #[test]
    fn empty_pattern_is_fine_without_request_log() {
        PipelineConfigBuilder::new()
            .auth_log("/var/log/auth.log")
            .request_pattern("")
            .build()
            .unwrap();
    }
}
