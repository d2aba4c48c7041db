//! # 对象 URL 登记表
//!
//! ## 设计思路
//!
//! 获取到的原图与裁剪结果都以 `blob:ocrlens/<n>` 形式的不透明句柄对外暴露，
//! 宿主只持有句柄，字节由登记表统一保管。被替换或重置的图片必须显式 `revoke`，
//! 否则字节会一直驻留在内存中。
//!
//! ## 实现思路
//!
//! - 字节使用 `bytes::Bytes` 保存，解析时克隆只增加引用计数。
//! - 序号单调递增，回收后的句柄不会被复用。

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use serde::Serialize;

const OBJECT_URL_PREFIX: &str = "blob:ocrlens/";

/// 图片字节的不透明句柄。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 登记表中保存的一份图片字节。
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Bytes,
    pub mime_type: String,
    pub created_at: Instant,
}

#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    entries: HashMap<String, StoredBlob>,
    next_id: u64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一份字节并返回新句柄。
    pub fn create(&mut self, bytes: Bytes, mime_type: impl Into<String>) -> ObjectUrl {
        self.next_id += 1;
        let url = format!("{}{}", OBJECT_URL_PREFIX, self.next_id);
        self.entries.insert(
            url.clone(),
            StoredBlob {
                bytes,
                mime_type: mime_type.into(),
                created_at: Instant::now(),
            },
        );
        ObjectUrl(url)
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<StoredBlob> {
        self.entries.get(url.as_str()).cloned()
    }

    /// 回收句柄；返回该句柄此前是否有效。
    pub fn revoke(&mut self, url: &ObjectUrl) -> bool {
        self.entries.remove(url.as_str()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
