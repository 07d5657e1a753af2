//! Пул потоков фиксированного размера и параллельный for-each поверх него.
//!
//! # Features
//! - FIFO очередь задач, один mutex и две condvar
//! - `ResultHandle` на каждую задачу: значение или пойманная паника
//! - Синхронный режим без воркеров (`ThreadCount::DISABLE` или фича `single-threaded`)
//! - Scoped задачи с заимствованием данных со стека
//! - `par_for_each` с нарезкой под random-access, forward и однопроходные курсоры
//!
//! ```
//! use workpool::{ThreadCount, WorkerPool};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let pool = WorkerPool::from_request(ThreadCount::Exactly(4)).unwrap();
//! let sum = AtomicUsize::new(0);
//! pool.par_for_each_index(1000, |_worker, i| {
//!     sum.fetch_add(i, Ordering::Relaxed);
//! }).unwrap();
//! assert_eq!(sum.into_inner(), 1000 * 999 / 2);
//! ```

pub mod cursor;
pub mod errors;
pub mod foreach;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod threads;

pub use cursor::{Cursor, CursorCategory, ForwardCursor, IntoCursor, SliceCursor, StreamCursor};
pub use errors::{PoolError, TaskError};
pub use foreach::{par_for_each, par_for_each_index};
pub use handle::ResultHandle;
pub use model::PoolMetrics;
pub use pool::{Config, Scope, WorkerPool, DEFAULT_CHUNKS_PER_WORKER};
pub use result::SpawnResult;
pub use threads::{resolve_thread_count, ThreadCount, AUTO, DISABLE, ECONOMY};
