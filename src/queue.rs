use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Shared FIFO of pending work.
///
/// `pop` removes under the lock, so an item is handed to exactly one worker.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> WorkQueue<T> {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self { items: Mutex::new(VecDeque::new()) }
    }

    /// Add an item to the back of the queue.
    pub async fn push(&self, item: T) {
        let mut items = self.items.lock().await;
        items.push_back(item);
    }

    /// Remove and return the front item, or `None` once the queue is drained.
    pub async fn pop(&self) -> Option<T> {
        let mut items = self.items.lock().await;
        items.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { items: Mutex::new(iter.into_iter().collect()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_in_insertion_order() {
        let queue: WorkQueue<u32> = (1..=3).collect();
        queue.push(4).await;
        assert_eq!(queue.len().await, 4);

        let mut popped = Vec::new();
        while let Some(item) = queue.pop().await {
            popped.push(item);
        }
        assert_eq!(popped, [1, 2, 3, 4]);
        assert!(queue.is_empty().await);
        assert_eq!(queue.pop().await, None);
    }
}
