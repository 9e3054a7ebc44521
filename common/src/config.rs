//! 設定管理
//!
//! ダッシュボード設定（YAML）の構造体とローダー。
//! `services` セクションは記述順を保持したまま読み込み、その順序がポーリング順になる。

use crate::error::{CommonError, CommonResult};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// ダッシュボード設定ファイル全体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
    /// ダッシュボードサーバー設定
    #[serde(default)]
    pub dashboard: DashboardSettings,

    /// 監視対象サービス（記述順）
    #[serde(default, deserialize_with = "deserialize_services")]
    pub services: Vec<ServiceDescriptor>,

    /// ポーリング設定
    #[serde(default)]
    pub polling: PollingConfig,

    /// WebSocket設定
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl DashboardConfig {
    /// YAMLファイルから設定を読み込む
    pub fn load(path: impl AsRef<Path>) -> CommonResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CommonError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// YAML文字列から設定を読み込む
    pub fn from_yaml_str(raw: &str) -> CommonResult<Self> {
        let config: DashboardConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 設定値の整合性を検証
    pub fn validate(&self) -> CommonResult<()> {
        if self.polling.status_interval_seconds == 0 {
            return Err(CommonError::Validation(
                "polling.status_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.websocket.heartbeat_interval_seconds == 0 {
            return Err(CommonError::Validation(
                "websocket.heartbeat_interval_seconds must be greater than 0".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for service in &self.services {
            if service.id.trim().is_empty() {
                return Err(CommonError::Validation(
                    "service id must not be empty".to_string(),
                ));
            }
            if !ids.insert(service.id.as_str()) {
                return Err(CommonError::Validation(format!(
                    "duplicate service id '{}'",
                    service.id
                )));
            }

            let mut aliases = HashSet::new();
            for worker in &service.workers {
                if worker.alias.trim().is_empty() {
                    return Err(CommonError::Validation(format!(
                        "service '{}' has a worker with an empty alias",
                        service.id
                    )));
                }
                if !aliases.insert(worker.alias.as_str()) {
                    return Err(CommonError::Validation(format!(
                        "service '{}' declares worker alias '{}' more than once",
                        service.id, worker.alias
                    )));
                }
            }
        }
        Ok(())
    }
}

/// ダッシュボードサーバー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// ホストアドレス (デフォルト: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// ポーリング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// ゲートウェイヘルスチェック間隔（秒）(デフォルト: 10)
    #[serde(default = "default_health_interval")]
    pub health_interval_seconds: u64,

    /// ステータス収集間隔（秒）(デフォルト: 5)
    #[serde(default = "default_status_interval")]
    pub status_interval_seconds: u64,
}

fn default_health_interval() -> u64 {
    10
}

fn default_status_interval() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_interval_seconds: default_health_interval(),
            status_interval_seconds: default_status_interval(),
        }
    }
}

/// WebSocket設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// サーバー発のPing送信間隔（秒）(デフォルト: 30)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

fn default_heartbeat_interval() -> u64 {
    30
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
        }
    }
}

/// ゲートウェイの接続先
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// ホスト名 (デフォルト: "localhost")
    #[serde(default = "default_upstream_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 8000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_upstream_host() -> String {
    "localhost".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_upstream_host(),
            port: default_gateway_port(),
        }
    }
}

impl GatewayConfig {
    /// ベースURL
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// ワーカーマネージャーの接続先
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerManagerConfig {
    /// ホスト名 (デフォルト: "localhost")
    #[serde(default = "default_upstream_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 8100)
    #[serde(default = "default_worker_manager_port")]
    pub port: u16,

    /// 稼働ワーカー一覧のパス (デフォルト: "/status")
    #[serde(default = "default_worker_status_path")]
    pub status_path: String,
}

fn default_worker_manager_port() -> u16 {
    8100
}

fn default_worker_status_path() -> String {
    "/status".to_string()
}

impl Default for WorkerManagerConfig {
    fn default() -> Self {
        Self {
            host: default_upstream_host(),
            port: default_worker_manager_port(),
            status_path: default_worker_status_path(),
        }
    }
}

impl WorkerManagerConfig {
    /// ベースURL
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// ゲートウェイ側エンドポイントのパス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// ヘルスチェック (デフォルト: "/healthz")
    #[serde(default = "default_health_path")]
    pub health: String,

    /// システムステータス (デフォルト: "/v1/system/status")
    #[serde(default = "default_status_path")]
    pub status: String,

    /// モデル一覧 (デフォルト: "/v1/models")
    #[serde(default = "default_models_path")]
    pub models: String,

    /// 強制退避テンプレート、`{alias}` を置換 (デフォルト: "/v1/system/evict/{alias}")
    #[serde(default = "default_evict_path")]
    pub evict: String,
}

fn default_health_path() -> String {
    "/healthz".to_string()
}

fn default_status_path() -> String {
    "/v1/system/status".to_string()
}

fn default_models_path() -> String {
    "/v1/models".to_string()
}

fn default_evict_path() -> String {
    "/v1/system/evict/{alias}".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            health: default_health_path(),
            status: default_status_path(),
            models: default_models_path(),
            evict: default_evict_path(),
        }
    }
}

/// 設定上のワーカー定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerDescriptor {
    /// サービス内で一意なエイリアス
    #[serde(default)]
    pub alias: String,
    /// 表示名
    #[serde(default)]
    pub name: String,
    /// 種別タグ（"llm", "tts" など）
    #[serde(rename = "type", default)]
    pub worker_type: String,
}

/// 監視対象サービスの静的定義
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    /// サービスID（`services` マップのキー）
    pub id: String,
    /// 表示名
    pub name: String,
    /// 説明
    pub description: String,
    /// UIアイコン名
    pub icon: String,
    /// ゲートウェイ
    pub gateway: GatewayConfig,
    /// ワーカーマネージャー
    pub worker_manager: WorkerManagerConfig,
    /// ゲートウェイのエンドポイント
    pub endpoints: EndpointsConfig,
    /// 宣言済みワーカー（記述順）
    pub workers: Vec<WorkerDescriptor>,
}

impl ServiceDescriptor {
    /// ゲートウェイのヘルスチェックURL
    pub fn health_url(&self) -> String {
        format!("{}{}", self.gateway.url(), self.endpoints.health)
    }

    /// ゲートウェイのシステムステータスURL
    pub fn gateway_status_url(&self) -> String {
        format!("{}{}", self.gateway.url(), self.endpoints.status)
    }

    /// ワーカーマネージャーの稼働ワーカー一覧URL
    pub fn worker_status_url(&self) -> String {
        format!("{}{}", self.worker_manager.url(), self.worker_manager.status_path)
    }

    /// ゲートウェイ経由の強制退避URL
    pub fn evict_url(&self, alias: &str) -> String {
        format!(
            "{}{}",
            self.gateway.url(),
            self.endpoints.evict.replace("{alias}", alias)
        )
    }

    /// ワーカー起動URL
    pub fn spawn_url(&self, alias: &str) -> String {
        format!("{}/spawn/{}", self.worker_manager.url(), alias)
    }

    /// ワーカー停止URL
    pub fn stop_url(&self, alias: &str) -> String {
        format!("{}/stop/{}", self.worker_manager.url(), alias)
    }

    /// 全ワーカー停止URL
    pub fn stop_all_url(&self) -> String {
        format!("{}/stop-all", self.worker_manager.url())
    }

    /// エイリアスが宣言済みか
    pub fn has_worker(&self, alias: &str) -> bool {
        self.workers.iter().any(|w| w.alias == alias)
    }
}

/// YAML上のサービス定義（IDはキー側）
#[derive(Debug, Deserialize)]
struct ServiceEntry {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default)]
    gateway: GatewayConfig,
    #[serde(default)]
    worker_manager: WorkerManagerConfig,
    #[serde(default)]
    endpoints: EndpointsConfig,
    #[serde(default)]
    workers: Vec<WorkerDescriptor>,
}

fn default_icon() -> String {
    "server".to_string()
}

impl ServiceEntry {
    fn into_descriptor(self, id: String) -> ServiceDescriptor {
        ServiceDescriptor {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description,
            icon: self.icon,
            gateway: self.gateway,
            worker_manager: self.worker_manager,
            endpoints: self.endpoints,
            workers: self.workers,
        }
    }
}

/// `services` マップを記述順のまま `Vec` に読み込む
fn deserialize_services<'de, D>(deserializer: D) -> Result<Vec<ServiceDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ServicesVisitor;

    impl<'de> Visitor<'de> for ServicesVisitor {
        type Value = Vec<ServiceDescriptor>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of service id to service definition")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut services = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, entry)) = map.next_entry::<String, ServiceEntry>()? {
                services.push(entry.into_descriptor(id));
            }
            Ok(services)
        }
    }

    deserializer.deserialize_map(ServicesVisitor)
}
