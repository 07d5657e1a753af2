/// Снимок состояния пула.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetrics {
    pub num_threads: usize,
    pub busy_workers: usize,
    pub queued_tasks: usize,
    pub processed_tasks: usize,
}

impl PoolMetrics {
    pub fn idle_workers(&self) -> usize {
        self.num_threads.saturating_sub(self.busy_workers)
    }

    pub fn utilization(&self) -> f64 {
        if self.num_threads == 0 {
            return 0.0;
        }
        self.busy_workers as f64 / self.num_threads as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        if self.num_threads == 0 {
            return self.queued_tasks as f64;
        }
        self.queued_tasks as f64 / self.num_threads as f64
    }

    /// Очередь пуста и ни один воркер не занят.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks == 0 && self.busy_workers == 0
    }
}
