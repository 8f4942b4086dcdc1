//! 握手失败提示
//!
//! 每个租户最多保存一条，首次读取后删除。

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct NoticeStore {
    notices: Mutex<HashMap<String, String>>,
}

impl NoticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存提示，覆盖同一租户的旧提示
    pub fn put(&self, tenant_id: &str, message: impl Into<String>) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.insert(tenant_id.to_string(), message.into());
        }
    }

    /// 取出并删除提示
    pub fn take(&self, tenant_id: &str) -> Option<String> {
        self.notices.lock().ok()?.remove(tenant_id)
    }
}
