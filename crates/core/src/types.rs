//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 컨테이너 런타임에서 관찰한 컨테이너 정보와, 페어링이 완료된
//! 로그 소스 레코드를 정의합니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 완성된 로그 소스
///
/// 워크로드 컨테이너(id, 로그 경로)와 인프라 컨테이너(토픽)의 기여가
/// 모두 모였을 때 정확히 한 번 생성되는 불변 레코드입니다.
/// 설정 아티팩트 렌더링의 입력으로만 사용되며 이후 메모리에 유지되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    /// 워크로드 컨테이너 ID
    pub container_id: String,
    /// 런타임이 할당한 로그 파일 경로
    pub log_path: String,
    /// 인프라 컨테이너 라벨에서 추출한 로그 토픽
    pub log_topic: String,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} topic={} path={}",
            &self.container_id[..12.min(self.container_id.len())],
            self.log_topic,
            self.log_path,
        )
    }
}

/// 컨테이너 목록 조회 결과 (요약 뷰)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// 컨테이너 ID
    pub id: String,
    /// 논리 이름 (앞의 `/` 제거됨)
    pub name: String,
    /// 생명주기 상태 문자열 (`running`, `removing`, `exited` 등)
    pub state: String,
}

impl ContainerSummary {
    /// 삭제 진행 중 여부 — 부트스트랩 열거에서만 스킵됩니다.
    pub fn is_removing(&self) -> bool {
        self.state == "removing"
    }
}

/// 컨테이너 상세 조회 결과
///
/// 페어링에 필요한 모든 필드를 담습니다. 엔트리포인트 경로가
/// 인프라/워크로드 역할 판별의 기준이 됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDetail {
    /// 컨테이너 ID
    pub id: String,
    /// 논리 이름 — 같은 워크로드의 인프라/워크로드 컨테이너가 공유하는 상관 키
    pub name: String,
    /// 생명주기 상태 문자열 (`running` 등)
    pub status: String,
    /// 엔트리포인트 경로 (Docker inspect의 `Path`)
    pub entrypoint: String,
    /// 선언된 라벨 맵
    pub labels: HashMap<String, String>,
    /// 런타임이 할당한 로그 파일 경로
    pub log_path: String,
}

impl ContainerDetail {
    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

impl fmt::Display for ContainerDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) status={}",
            self.name,
            &self.id[..12.min(self.id.len())],
            self.status,
        )
    }
}
