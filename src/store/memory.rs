use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Pipeline, StateStore, StoreError, StoreOp};

#[derive(Debug, Clone)]
enum Value {
    Scalar(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-process [`StateStore`] fake used by the integration test harness so
/// tests don't depend on a running Redis instance. TTLs are honored on read
/// (lazy expiry) rather than via a background sweep.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        match entry.expires_at {
            Some(at) => Instant::now() < at,
            None => true,
        }
    }

    fn prune(data: &mut HashMap<String, Entry>, key: &str) {
        let expired = data.get(key).map(|e| !Self::is_live(e)).unwrap_or(false);
        if expired {
            data.remove(key);
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        Ok(match data.get(key) {
            Some(Entry {
                value: Value::Scalar(v),
                ..
            }) => Some(v.clone()),
            _ => None,
        })
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        data.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        data.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        let entry = data.entry(key.to_string()).or_insert(Entry {
            value: Value::Scalar(b"0".to_vec()),
            expires_at: None,
        });
        let current = match &entry.value {
            Value::Scalar(v) => std::str::from_utf8(v)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(0),
            _ => {
                return Err(StoreError::Protocol(format!(
                    "{key} is not a scalar"
                )))
            }
        };
        let next = current + delta;
        entry.value = Value::Scalar(next.to_string().into_bytes());
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        if let Some(entry) = data.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        data.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        Ok(data.contains_key(key))
    }

    async fn set_add(&self, key: &str, member: Vec<u8>) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        let entry = data.entry(key.to_string()).or_insert(Entry {
            value: Value::Set(Vec::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(members) => {
                if !members.contains(&member) {
                    members.push(member);
                }
                Ok(())
            }
            _ => Err(StoreError::Protocol(format!("{key} is not a set"))),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        Ok(match data.get(key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => members.clone(),
            _ => Vec::new(),
        })
    }

    async fn set_cardinality(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.set_members(key).await?.len() as u64)
    }

    async fn list_push_right(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        let entry = data.entry(key.to_string()).or_insert(Entry {
            value: Value::List(Vec::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::List(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(StoreError::Protocol(format!("{key} is not a list"))),
        }
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut data = self.data.lock().unwrap();
        Self::prune(&mut data, key);
        let items = match data.get(key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => items.clone(),
            _ => return Ok(Vec::new()),
        };

        let len = items.len() as isize;
        let normalize = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i.min(len)
            }
        };
        let (start, stop) = (normalize(start), normalize(stop));
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(items[start as usize..=(stop as usize).min(items.len().saturating_sub(1))].to_vec())
    }

    async fn commit(&self, pipeline: Pipeline) -> Result<(), StoreError> {
        for op in pipeline.ops {
            match op {
                StoreOp::SetWithTtl { key, value, ttl } => {
                    self.set_with_ttl(&key, value, ttl).await?;
                }
                StoreOp::Delete { key } => {
                    self.delete(&key).await?;
                }
                StoreOp::ListPushRight { key, value } => {
                    self.list_push_right(&key, value).await?;
                }
            }
        }
        Ok(())
    }
}
