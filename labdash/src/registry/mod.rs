//! サービスディレクトリ
//!
//! 設定から読み込んだ監視対象サービスをメモリ内で保持する。
//! 起動時に一度だけ構築され、以降は読み取り専用。

use labdash_common::config::{DashboardConfig, ServiceDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// サービスディレクトリ
///
/// クローンは同じディレクトリを共有する。
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    services: Vec<ServiceDescriptor>,
    index: HashMap<String, usize>,
}

impl ServiceDirectory {
    /// サービス定義の一覧からディレクトリを作成（順序を保持）
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        let index = services
            .iter()
            .enumerate()
            .map(|(i, service)| (service.id.clone(), i))
            .collect();
        Self {
            inner: Arc::new(Inner { services, index }),
        }
    }

    /// 設定からディレクトリを作成
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.services.clone())
    }

    /// IDでサービスを取得
    pub fn get(&self, service_id: &str) -> Option<&ServiceDescriptor> {
        self.inner
            .index
            .get(service_id)
            .map(|&i| &self.inner.services[i])
    }

    /// 全サービス（設定順）
    pub fn list(&self) -> &[ServiceDescriptor] {
        &self.inner.services
    }

    /// サービス数
    pub fn len(&self) -> usize {
        self.inner.services.len()
    }

    /// サービスが1件もないか
    pub fn is_empty(&self) -> bool {
        self.inner.services.is_empty()
    }
}
