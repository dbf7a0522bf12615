//! 설정 관리 -- logmeter.toml 파싱 및 런타임 설정
//!
//! [`LogmeterConfig`]는 데몬과 모든 파이프라인의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGMETER_SOURCES_AUTH_LOG=/var/log/auth.log` 형식)
//! 3. 설정 파일 (`logmeter.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logmeter_core::error::LogmeterError> {
//! use logmeter_core::config::LogmeterConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogmeterConfig::load("logmeter.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogmeterConfig::parse("[sources]\nauth_log = \"/var/log/auth.log\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogmeterError};

/// 요청 로그 기본 정규식
///
/// `domain`, `ip_address`, `status`, `method` 네 개의 이름 있는 그룹을 가집니다.
pub const DEFAULT_REQUEST_PATTERN: &str = r"^\[.* .0000\] \[(?P<domain>.*)\] \[(?P<ip_address>[0-9\.]+)\] \[(?P<status>\d{3})\] \[(?P<method>\w+)\] .*$";

/// Logmeter 통합 설정
///
/// `logmeter.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogmeterConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 로그 소스 설정
    #[serde(default)]
    pub sources: SourcesConfig,
    /// GeoIP enrichment 설정
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl LogmeterConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogmeterError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    ///
    /// 소스 경로는 CLI 인자로 나중에 채워질 수 있으므로 검증은 호출자가 수행합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogmeterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogmeterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogmeterError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogmeterError> {
        toml::from_str(toml_str).map_err(|e| {
            LogmeterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGMETER_{SECTION}_{FIELD}`
    /// 예: `LOGMETER_METRICS_PORT=9100`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGMETER_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGMETER_GENERAL_LOG_FORMAT");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGMETER_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGMETER_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGMETER_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "LOGMETER_METRICS_ENDPOINT");

        // Sources
        override_string(&mut self.sources.auth_log, "LOGMETER_SOURCES_AUTH_LOG");
        override_string(&mut self.sources.request_log, "LOGMETER_SOURCES_REQUEST_LOG");
        override_string(
            &mut self.sources.request_pattern,
            "LOGMETER_SOURCES_REQUEST_PATTERN",
        );
        override_bool(&mut self.sources.from_start, "LOGMETER_SOURCES_FROM_START");

        // Enrichment
        override_string(&mut self.enrichment.geoip_db, "LOGMETER_ENRICHMENT_GEOIP_DB");
        override_csv(
            &mut self.enrichment.excluded_ips,
            "LOGMETER_ENRICHMENT_EXCLUDED_IPS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogmeterError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.port".to_owned(),
                    reason: "port must be non-zero when metrics are enabled".to_owned(),
                }
                .into());
            }
            if !self.metrics.endpoint.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "metrics.endpoint".to_owned(),
                    reason: "endpoint must start with '/'".to_owned(),
                }
                .into());
            }
        }

        if !self.sources.has_any() {
            return Err(ConfigError::InvalidValue {
                field: "sources".to_owned(),
                reason: "at least one of auth_log or request_log must be set".to_owned(),
            }
            .into());
        }

        if !self.sources.request_log.is_empty() && self.sources.request_pattern.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sources.request_pattern".to_owned(),
                reason: "pattern must not be empty when request_log is set".to_owned(),
            }
            .into());
        }

        if let Some(ip) = self
            .enrichment
            .excluded_ips
            .iter()
            .find(|ip| ip.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "enrichment.excluded_ips".to_owned(),
                reason: format!("entry '{ip}' must not be empty"),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Prometheus 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "0.0.0.0".to_owned(),
            port: 9090,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 로그 소스 설정
///
/// 경로가 빈 문자열이면 해당 소스는 비활성화됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// 인증 로그 경로 (예: `/var/log/auth.log`)
    pub auth_log: String,
    /// 요청 로그 경로
    pub request_log: String,
    /// 요청 로그 정규식
    pub request_pattern: String,
    /// 파일 처음부터 읽기 (디버그 모드)
    pub from_start: bool,
}

impl SourcesConfig {
    /// 설정된 소스가 하나라도 있는지 확인합니다.
    pub fn has_any(&self) -> bool {
        !self.auth_log.is_empty() || !self.request_log.is_empty()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            auth_log: String::new(),
            request_log: String::new(),
            request_pattern: DEFAULT_REQUEST_PATTERN.to_owned(),
            from_start: false,
        }
    }
}

/// GeoIP enrichment 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// MaxMind `.mmdb` 경로 (비어 있으면 지리 조회 비활성화)
    pub geoip_db: String,
    /// 지리 조회에서 제외할 IP 주소 (정확히 일치)
    pub excluded_ips: Vec<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

/// 쉼표로 구분된 목록. 빈 항목은 버립니다.
pub fn split_csv(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = split_csv(&val);
    }
}
