//! GeoIP 데이터베이스 -- IP 주소를 대륙/국가/도시 이름으로 변환
//!
//! - [`GeoLookup`]: 조회 능력을 나타내는 trait (테스트에서는 고정 테이블로 대체)
//! - [`MaxMindGeoDatabase`]: MaxMind `.mmdb` 파일 기반 구현
//! - [`SharedGeoDatabase`]: 모든 파이프라인이 공유하는 핸들.
//!   Supervisor가 한 번 열고, 모든 파이프라인이 멈춘 뒤 한 번 닫습니다.

use std::net::IpAddr;
use std::path::Path;
use std::sync::RwLock;

use logmeter_core::event::GeoLocation;
use maxminddb::PathElement;

use crate::error::LogPipelineError;

/// IP 주소 지리 조회
pub trait GeoLookup: Send + Sync {
    /// 주소의 위치를 조회합니다. DB에 없으면 `Ok(None)`입니다.
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LogPipelineError>;
}

// ─── MaxMind ─────────────────────────────────────────────────────────

/// MaxMind City 형식 DB 리더
pub struct MaxMindGeoDatabase {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindGeoDatabase {
    /// `.mmdb` 파일을 메모리로 읽어 엽니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogPipelineError> {
        let path = path.as_ref();
        let reader =
            maxminddb::Reader::open_readfile(path).map_err(|e| LogPipelineError::GeoDatabase {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!(
            path = %path.display(),
            database_type = %reader.metadata.database_type,
            "opened geoip database"
        );
        Ok(Self { reader })
    }
}

impl GeoLookup for MaxMindGeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LogPipelineError> {
        let result = self
            .reader
            .lookup(ip)
            .map_err(|e| LogPipelineError::GeoLookup(e.to_string()))?;

        let text = |path: &[PathElement<'_>]| -> String {
            result
                .decode_path::<String>(path)
                .ok()
                .flatten()
                .unwrap_or_default()
        };

        // 국가 코드가 없으면 miss로 취급
        let country_code = text(&[PathElement::Key("country"), PathElement::Key("iso_code")]);
        if country_code.is_empty() {
            return Ok(None);
        }

        Ok(Some(GeoLocation {
            continent_code: text(&[PathElement::Key("continent"), PathElement::Key("code")]),
            continent_name: text(&[
                PathElement::Key("continent"),
                PathElement::Key("names"),
                PathElement::Key("en"),
            ]),
            country_code,
            country_name: text(&[
                PathElement::Key("country"),
                PathElement::Key("names"),
                PathElement::Key("en"),
            ]),
            city: text(&[
                PathElement::Key("city"),
                PathElement::Key("names"),
                PathElement::Key("en"),
            ]),
        }))
    }
}

// ─── SharedGeoDatabase ───────────────────────────────────────────────

/// 파이프라인 간 공유되는 GeoIP 핸들
///
/// `Arc<SharedGeoDatabase>`로 각 파이프라인의 enricher에 전달됩니다.
/// `close()` 이후의 조회는 에러를 반환합니다.
pub struct SharedGeoDatabase {
    inner: RwLock<Option<Box<dyn GeoLookup>>>,
}

impl SharedGeoDatabase {
    /// 조회 구현을 감쌉니다.
    pub fn new(lookup: Box<dyn GeoLookup>) -> Self {
        Self {
            inner: RwLock::new(Some(lookup)),
        }
    }

    /// MaxMind DB 파일을 열어 공유 핸들을 만듭니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogPipelineError> {
        Ok(Self::new(Box::new(MaxMindGeoDatabase::open(path)?)))
    }

    /// 위치를 조회합니다.
    pub fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LogPipelineError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| LogPipelineError::GeoLookup("database lock poisoned".to_owned()))?;
        match guard.as_ref() {
            Some(db) => db.lookup(ip),
            None => Err(LogPipelineError::GeoLookup("database closed".to_owned())),
        }
    }

    /// DB를 닫습니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    pub fn close(&self) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            tracing::info!("closed geoip database");
        }
    }

    /// DB가 열려 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.inner.read().map(|g| g.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for SharedGeoDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGeoDatabase")
            .field("open", &self.is_open())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::StaticGeoLookup;
    use super::*;

    #[test]
    fn shared_lookup_hits_and_misses() {
        let db = SharedGeoDatabase::new(Box::new(
            StaticGeoLookup::default().with("203.0.113.5", "US", "United States"),
        ));
        let hit = db.lookup("203.0.113.5".parse().unwrap()).unwrap().unwrap();
        assert_eq!(hit.country_code, "US");
        assert!(db.lookup("198.51.100.1".parse().unwrap()).unwrap().is_none());
    }

    #[test]
    fn lookup_after_close_is_an_error() {
        let db = SharedGeoDatabase::new(Box::new(StaticGeoLookup::default()));
        assert!(db.is_open());
        db.close();
        db.close();
        assert!(!db.is_open());
        let err = db.lookup("203.0.113.5".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn shared_handle_is_usable_across_threads() {
        let lookup = Arc::new(StaticGeoLookup::default().with("192.0.2.200", "DE", "Germany"));
        let db = Arc::new(SharedGeoDatabase::new(Box::new(Arc::clone(&lookup))));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || db.lookup("192.0.2.200".parse().unwrap()).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap().country_code, "DE");
        }
        assert_eq!(lookup.calls.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[test]
    fn opening_missing_file_fails() {
        let err = SharedGeoDatabase::open("/nonexistent/GeoLite2-City.mmdb").unwrap_err();
        assert!(matches!(err, LogPipelineError::GeoDatabase { .. }));
    }
}
