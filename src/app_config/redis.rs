use std::env;

use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::Client;

/// Get a Redis multiplexed async connection using REDIS_HOST from env
pub async fn get_redis_connection() -> Result<MultiplexedConnection> {
    let url = env::var("REDIS_HOST").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let client = Client::open(url)?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(conn)
}

/// 信号去重键
pub fn signal_dedup_key(fingerprint: &str) -> String {
    format!("signal_dedup:{}", fingerprint)
}

/// 去重窗口 TTL，秒
pub fn signal_dedup_ttl_secs() -> u64 {
    env::var("SIGNAL_DEDUP_WINDOW_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60u64)
}
