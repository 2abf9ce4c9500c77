use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::models::AudioClip;

pub const CACHE_CAPACITY: usize = 20;
pub const KEY_CHARS: usize = 100;

pub fn cache_key(text: &str) -> String {
    text.chars().take(KEY_CHARS).collect()
}

#[derive(Debug)]
pub struct AudioCache {
    capacity: usize,
    entries: HashMap<String, Arc<AudioClip>>,
    order: VecDeque<String>,
}

impl Default for AudioCache {
    fn default() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }
}

impl AudioCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<AudioClip>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: String, clip: Arc<AudioClip>) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = clip;
            return None;
        }

        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, clip);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
