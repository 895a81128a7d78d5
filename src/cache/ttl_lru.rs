//! TTL + 近似 LRU 缓存
//!
//! - 过期在 get / set 时检查，sweep 可主动清扫（后台任务周期调用）
//! - get 与 set 都会刷新 last_touched，活跃会话不会在对话中途过期
//! - 容量满且 key 为新时，O(n) 扫描驱逐 last_touched 最旧的一条
//! - 所有修改在同一把 Mutex 内完成；被移除的值在释放锁之后才投递到清理队列

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Evictable, EvictionHook, MaintainedCache};
use crate::core::CleanupQueue;

struct CacheEntry<V> {
    value: V,
    last_touched: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            last_touched: Instant::now(),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_touched) > ttl
    }
}

/// 会话 key -> 值 的过期缓存
pub struct TtlLruCache<V: Evictable> {
    name: String,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    max_size: usize,
    ttl: Duration,
    hook: Option<Arc<dyn EvictionHook<V>>>,
    cleanup: CleanupQueue,
}

impl<V: Evictable> TtlLruCache<V> {
    pub fn new(name: impl Into<String>, max_size: usize, ttl: Duration, cleanup: CleanupQueue) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
            max_size: max_size.max(1),
            ttl,
            hook: None,
            cleanup,
        }
    }

    /// 注入外部驱逐回调
    pub fn with_hook(mut self, hook: Arc<dyn EvictionHook<V>>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// 读取并刷新 last_touched；已过期则清理、移除并返回 None
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.get_mut(key)?;
        if !entry.is_expired(now, self.ttl) {
            entry.last_touched = now;
            return Some(entry.value.clone());
        }

        let evicted: Vec<V> = entries.remove(key).map(|e| e.value).into_iter().collect();
        drop(entries);
        self.dispatch(evicted).await;
        None
    }

    /// 写入：先清扫过期条目，容量满且 key 为新时驱逐最旧条目，再插入 / 覆盖
    ///
    /// 覆盖同一 key 不会清理旧值（调用方通常写回的是同一资源）。
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut entries = self.entries.lock().await;
        let evicted = self.make_room(&mut entries, &key);
        entries.insert(key, CacheEntry::new(value));
        drop(entries);
        self.dispatch(evicted).await;
    }

    /// 在同一把锁内完成「取出或初始化 + 修改 + 回写」，同一 key 的并发修改因此串行化
    pub async fn upsert_with<I, F, R>(&self, key: &str, init: I, mutate: F) -> R
    where
        I: FnOnce() -> V,
        F: FnOnce(&mut V) -> R,
    {
        let mut entries = self.entries.lock().await;
        let evicted = self.make_room(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| CacheEntry::new(init()));
        entry.last_touched = Instant::now();
        let result = mutate(&mut entry.value);

        drop(entries);
        self.dispatch(evicted).await;
        result
    }

    /// 仅当 key 存在且未过期时修改（视为一次写入，刷新 last_touched）
    pub async fn update_existing<F, R>(&self, key: &str, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.get_mut(key)?;
        if !entry.is_expired(now, self.ttl) {
            entry.last_touched = now;
            return Some(mutate(&mut entry.value));
        }

        let evicted: Vec<V> = entries.remove(key).map(|e| e.value).into_iter().collect();
        drop(entries);
        self.dispatch(evicted).await;
        None
    }

    /// 命中则刷新并返回已有值；否则调用 factory 构造、存入并返回。
    /// factory 在锁内执行，同一 key 不会并发构造出两个值。返回 (值, 是否新建)。
    pub async fn get_or_try_insert_with<F, E>(&self, key: &str, factory: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now, self.ttl) {
                entry.last_touched = now;
                return Ok((entry.value.clone(), false));
            }
        }

        // factory 失败时不腾位，其它条目保持原样
        let value = factory()?;
        let evicted = self.make_room(&mut entries, key);
        entries.insert(key.to_string(), CacheEntry::new(value.clone()));

        drop(entries);
        self.dispatch(evicted).await;
        Ok((value, true))
    }

    /// 显式删除；不存在时无操作
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.entries.lock().await.remove(key);
        match removed {
            Some(entry) => {
                self.dispatch(vec![entry.value]).await;
                true
            }
            None => false,
        }
    }

    /// 仅当当前值满足条件时删除；同一 key 已被换成新值时不动它
    pub async fn delete_if<P>(&self, key: &str, predicate: P) -> bool
    where
        P: FnOnce(&V) -> bool,
    {
        let removed = {
            let mut entries = self.entries.lock().await;
            if entries.get(key).is_some_and(|entry| predicate(&entry.value)) {
                entries.remove(key)
            } else {
                None
            }
        };
        match removed {
            Some(entry) => {
                self.dispatch(vec![entry.value]).await;
                true
            }
            None => false,
        }
    }

    /// 清空：每个值都走清理
    pub async fn clear(&self) -> usize {
        let evicted: Vec<V> = self
            .entries
            .lock()
            .await
            .drain()
            .map(|(_, entry)| entry.value)
            .collect();
        let count = evicted.len();
        self.dispatch(evicted).await;
        count
    }

    /// 主动清扫全部过期条目，返回移除数量
    pub async fn sweep(&self) -> usize {
        let evicted = {
            let mut entries = self.entries.lock().await;
            Self::take_expired(&mut entries, self.ttl)
        };
        let count = evicted.len();
        self.dispatch(evicted).await;
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// 写入前的统一腾位：清扫过期条目；容量已满且 key 为新时再驱逐最旧一条
    fn make_room(&self, entries: &mut HashMap<String, CacheEntry<V>>, key: &str) -> Vec<V> {
        let mut evicted = Self::take_expired(entries, self.ttl);
        if !entries.contains_key(key) && entries.len() >= self.max_size {
            evicted.extend(Self::evict_oldest(entries));
        }
        evicted
    }

    fn take_expired(entries: &mut HashMap<String, CacheEntry<V>>, ttl: Duration) -> Vec<V> {
        let now = Instant::now();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, ttl))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key))
            .map(|entry| entry.value)
            .collect()
    }

    fn evict_oldest(entries: &mut HashMap<String, CacheEntry<V>>) -> Option<V> {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_touched)
            .map(|(key, _)| key.clone())?;
        entries.remove(&oldest).map(|entry| entry.value)
    }

    /// 将被移除的值投递到清理队列（每个值恰好一个任务）
    async fn dispatch(&self, evicted: Vec<V>) {
        if evicted.is_empty() {
            return;
        }
        tracing::debug!(cache = %self.name, evicted = evicted.len(), "Evicting cache entries");

        for value in evicted {
            let hook = self.hook.clone();
            let cache = self.name.clone();
            self.cleanup
                .submit(Box::pin(async move {
                    run_cleanup(&cache, hook.as_deref(), &value).await;
                }))
                .await;
        }
    }
}

/// 双路清理：外部回调在前，值自身的 cleanup 在后；两者都会执行，错误只记日志
async fn run_cleanup<V: Evictable>(cache: &str, hook: Option<&dyn EvictionHook<V>>, value: &V) {
    if let Some(hook) = hook {
        if let Err(e) = hook.on_evict(value).await {
            tracing::warn!(cache, error = %e, "Eviction hook failed");
        }
    }

    if let Some(resource) = value.cleanable() {
        if let Err(e) = resource.cleanup().await {
            tracing::warn!(cache, error = %e, "Value cleanup failed");
        }
    }
}

#[async_trait]
impl<V: Evictable> MaintainedCache for TtlLruCache<V> {
    fn cache_name(&self) -> &str {
        &self.name
    }

    async fn sweep_expired(&self) -> usize {
        self.sweep().await
    }

    async fn clear_all(&self) -> usize {
        self.clear().await
    }
}
