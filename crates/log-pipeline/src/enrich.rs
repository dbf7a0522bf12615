//! Enrichment 정책 -- 이벤트마다 지리 조회 여부를 결정하고 결과를 붙임
//!
//! 판단 순서:
//!
//! 1. IP 필드가 없거나 비어 있음 → 건너뜀
//! 2. 제외 목록에 있음 (정확히 일치) → 건너뜀
//! 3. IP로 파싱되지 않음 → 외부 주소로 태그, 건너뜀
//! 4. 내부/사설 대역 → `internal = true` 태그, 건너뜀
//! 5. 그 외 → 정확히 한 번 조회
//!
//! `internal` 태그는 파싱 가능한 주소라면 제외 여부와 무관하게 항상 계산됩니다.
//! DB가 설정되지 않았으면 조회만 생략합니다.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use logmeter_core::event::{Event, GeoLocation};
use logmeter_core::metrics as m;
use metrics::counter;
use tracing::{debug, warn};

use crate::error::LogPipelineError;
use crate::geo::SharedGeoDatabase;

/// 내부 주소로 취급하는 대역
pub const INTERNAL_RANGES: &[&str] = &[
    "0.0.0.0/32",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::/128",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// 내부 주소 대역 집합
#[derive(Debug, Clone)]
pub struct InternalRanges {
    nets: Vec<IpNet>,
}

impl InternalRanges {
    /// 기본 대역으로 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        let nets = INTERNAL_RANGES
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNet>().map_err(|e| LogPipelineError::Config {
                    field: "internal_ranges".to_owned(),
                    reason: format!("{cidr}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { nets })
    }

    /// 주소가 내부 대역에 속하는지 확인합니다.
    ///
    /// IPv4-mapped IPv6 주소(`::ffff:10.0.0.1`)는 IPv4로 변환해 판단합니다.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
            v4 => v4,
        };
        self.nets.iter().any(|net| net.contains(&ip))
    }
}

/// 주소별 판단 결과
enum Decision {
    /// 제외 목록에 있음
    Excluded { internal: bool },
    /// IP가 아님
    Unparsable,
    /// 내부 주소
    Internal,
    /// 조회 대상
    Lookup(IpAddr),
}

/// Enrichment 정책
///
/// 파이프라인마다 하나씩 가지며, GeoIP DB 핸들은 supervisor와 공유합니다.
#[derive(Debug)]
pub struct Enricher {
    excluded: HashSet<String>,
    internal: InternalRanges,
    geo: Option<Arc<SharedGeoDatabase>>,
}

impl Enricher {
    /// 제외 목록과 공유 DB 핸들로 생성합니다.
    pub fn new(
        excluded_ips: &[String],
        geo: Option<Arc<SharedGeoDatabase>>,
    ) -> Result<Self, LogPipelineError> {
        Ok(Self {
            excluded: excluded_ips.iter().map(|ip| ip.trim().to_owned()).collect(),
            internal: InternalRanges::new()?,
            geo,
        })
    }

    /// 지리 조회가 활성화되어 있는지 확인합니다.
    pub fn geo_enabled(&self) -> bool {
        self.geo.is_some()
    }

    /// 이벤트의 `internal` 태그를 설정하고, 가능하면 위치를 조회합니다.
    pub fn enrich(&self, event: &mut Event) -> Option<GeoLocation> {
        let decision = match event.ip_address() {
            None => return None,
            Some(text) => self.decide(text),
        };

        match decision {
            Decision::Excluded { internal } => {
                event.set_internal(internal);
                None
            }
            Decision::Unparsable => {
                event.set_internal(false);
                None
            }
            Decision::Internal => {
                event.set_internal(true);
                None
            }
            Decision::Lookup(ip) => {
                event.set_internal(false);
                self.lookup(ip)
            }
        }
    }

    fn decide(&self, text: &str) -> Decision {
        let parsed = text.parse::<IpAddr>().ok();
        let internal = parsed.is_some_and(|ip| self.internal.contains(ip));

        if self.excluded.contains(text) {
            debug!(ip = text, "address excluded from enrichment");
            return Decision::Excluded { internal };
        }
        match parsed {
            None => {
                debug!(ip = text, "address is not an IP, skipping geoip lookup");
                Decision::Unparsable
            }
            Some(_) if internal => Decision::Internal,
            Some(ip) => Decision::Lookup(ip),
        }
    }

    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        let geo = self.geo.as_ref()?;
        match geo.lookup(ip) {
            Ok(Some(location)) => {
                counter!(m::GEOIP_LOOKUPS_TOTAL, m::LABEL_RESULT => m::RESULT_FOUND).increment(1);
                Some(location)
            }
            Ok(None) => {
                counter!(m::GEOIP_LOOKUPS_TOTAL, m::LABEL_RESULT => m::RESULT_NOT_FOUND)
                    .increment(1);
                debug!(%ip, "no geoip record for address");
                None
            }
            Err(e) => {
                counter!(m::GEOIP_LOOKUPS_TOTAL, m::LABEL_RESULT => m::RESULT_ERROR).increment(1);
                warn!(%ip, error = %e, "geoip lookup failed");
                None
            }
        }
    }
}
