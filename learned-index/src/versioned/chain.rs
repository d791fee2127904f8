//! 版本链：固定容量的环形缓冲
//!
//! 槽位按版本顺序循环写入，`front` 指向最旧的槽位，`rear` 指向最新的槽位。
//! 版本 `v` 所在的槽位为 `(rear - (current - v)) mod capacity`。

use crate::buffered::BufferedTree;
use crate::hash::Hasher;

/// 一个版本的快速部分
#[derive(Debug)]
pub struct ChainSlot<H: Hasher> {
    /// 版本号
    pub version: u64,
    /// 与之配对的慢速层代数
    pub generation: u64,
    /// 本轮插入的 key 构成的更新优化树
    pub tree: BufferedTree<H>,
}

impl<H: Hasher> Clone for ChainSlot<H> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            generation: self.generation,
            tree: self.tree.clone(),
        }
    }
}

/// 版本链
#[derive(Debug)]
pub struct VersionChain<H: Hasher> {
    slots: Vec<Option<ChainSlot<H>>>,
    front: usize,
    rear: usize,
    len: usize,
}

impl<H: Hasher> VersionChain<H> {
    /// 创建容量为 `capacity` 的空链，调用方保证 `capacity >= 1`
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            front: 0,
            rear: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// 写入新版本，链满时淘汰并返回最旧的槽位
    pub fn push(&mut self, slot: ChainSlot<H>) -> Option<ChainSlot<H>> {
        let capacity = self.slots.len();
        if self.len == 0 {
            self.front = 0;
            self.rear = 0;
            self.slots[0] = Some(slot);
            self.len = 1;
            return None;
        }

        let evicted = if self.len == capacity {
            let old = self.slots[self.front].take();
            self.front = (self.front + 1) % capacity;
            self.len -= 1;
            old
        } else {
            None
        };

        self.rear = (self.rear + 1) % capacity;
        self.slots[self.rear] = Some(slot);
        self.len += 1;
        evicted
    }

    /// 最新的槽位
    #[inline]
    pub fn latest(&self) -> Option<&ChainSlot<H>> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.rear].as_ref()
    }

    /// 最旧的保留版本
    pub fn oldest_version(&self) -> Option<u64> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.front].as_ref().map(|s| s.version)
    }

    /// 按版本号定位槽位，版本不在链中时返回 `None`
    pub fn get(&self, version: u64, current: u64) -> Option<&ChainSlot<H>> {
        let back = current.checked_sub(version)?;
        if back >= self.len as u64 {
            return None;
        }
        let capacity = self.slots.len();
        let idx = (self.rear + capacity - back as usize) % capacity;
        self.slots[idx].as_ref().filter(|s| s.version == version)
    }

    /// 从旧到新遍历槽位
    pub fn iter(&self) -> impl Iterator<Item = &ChainSlot<H>> + '_ {
        let capacity = self.slots.len();
        (0..self.len).filter_map(move |i| self.slots[(self.front + i) % capacity].as_ref())
    }
}
