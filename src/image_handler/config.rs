//! # 配置模块
//!
//! ## 设计思路
//!
//! 将图片链路的所有“可调策略”集中到 `ImageConfig`：下载阶段的超时与体积、
//! 解码阶段的像素与内存上限、URL 安全策略。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `from_network_settings` 将持久化设置（`settings::NetworkSettings`）映射为运行时参数，
//!   解码上限不对用户开放，始终使用默认值。

use crate::settings::NetworkSettings;

/// 图片处理配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 下载/读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 网络下载总超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载首包超时时间（毫秒）。
    pub stream_first_byte_timeout_ms: u64,
    /// 下载分块读取超时时间（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数，避免无限跳转或恶意链路。
    pub max_redirects: usize,
    /// 是否允许访问内网或本地地址（默认关闭，防 SSRF）。
    pub allow_private_network: bool,
    /// 是否对域名执行 DNS 解析后再做内网 IP 拦截。
    pub resolve_dns_for_url_safety: bool,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            stream_first_byte_timeout_ms: 10_000,
            stream_chunk_timeout_ms: 15_000,
            max_redirects: 5,
            allow_private_network: false,
            resolve_dns_for_url_safety: true,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
        }
    }
}

impl ImageConfig {
    /// 由用户设置构建运行时配置。
    pub fn from_network_settings(network: &NetworkSettings) -> Self {
        Self {
            max_file_size: network.max_file_size_mb.max(1) * 1024 * 1024,
            download_timeout: network.download_timeout_secs.max(1),
            connect_timeout: network.connect_timeout_secs.max(1),
            allow_private_network: network.allow_private_network,
            ..Self::default()
        }
    }
}
