//! 会话级过期缓存：TTL + 近似 LRU
//!
//! 值被移除（过期、容量驱逐、显式删除、清空）时统一走双路清理：
//! 先执行外部注入的 EvictionHook，再执行值自身声明的 Cleanable；任一路失败只记日志。

mod ttl_lru;

pub use ttl_lru::TtlLruCache;

use async_trait::async_trait;

/// 持有外部资源的值声明的清理能力（向量索引、网络连接等）
#[async_trait]
pub trait Cleanable: Send + Sync {
    async fn cleanup(&self) -> anyhow::Result<()>;
}

/// 可放入 TtlLruCache 的值；默认不暴露清理能力
pub trait Evictable: Clone + Send + Sync + 'static {
    fn cleanable(&self) -> Option<&dyn Cleanable> {
        None
    }
}

/// 外部注入的驱逐回调，先于值自身的 cleanup 执行
#[async_trait]
pub trait EvictionHook<V: Send + Sync>: Send + Sync {
    async fn on_evict(&self, value: &V) -> anyhow::Result<()>;
}

/// 后台清扫与关闭流程看到的缓存（与值类型无关）
#[async_trait]
pub trait MaintainedCache: Send + Sync {
    /// 缓存名称（用于日志）
    fn cache_name(&self) -> &str;

    /// 清理全部过期条目，返回移除数量
    async fn sweep_expired(&self) -> usize;

    /// 清空全部条目，返回移除数量
    async fn clear_all(&self) -> usize;
}
