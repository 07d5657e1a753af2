use super::{
    errors::PoolError,
    handle::{self, ResultHandle, Task},
    model::PoolMetrics,
    threads::ThreadCount,
};
use std::{
    collections::VecDeque,
    marker::PhantomData,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};
use crossbeam::utils::CachePadded;
use tracing::{debug, trace, warn};


/// Сколько чанков в среднем приходится на одного воркера в `par_for_each`.
pub const DEFAULT_CHUNKS_PER_WORKER: usize = 3;

/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    /// Уже разрешённое число воркеров; `0` означает синхронный режим.
    pub num_threads: usize,
    pub chunks_per_worker: usize,
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(ThreadCount::Auto)
    }
}

impl Config {
    pub fn new(threads: ThreadCount) -> Self {
        Self {
            num_threads: threads.resolve(),
            chunks_per_worker: DEFAULT_CHUNKS_PER_WORKER,
            thread_name: "workpool".to_owned(),
            stack_size: None,
        }
    }

    pub fn economy() -> Self {
        Self::new(ThreadCount::Economy)
    }

    pub fn sequential() -> Self {
        Self::new(ThreadCount::DISABLE)
    }

    pub fn with_chunks_per_worker(mut self, chunks: usize) -> Self {
        self.chunks_per_worker = chunks.max(1);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Число воркеров, но не меньше одного: удобно для буферов по номеру воркера.
    pub fn actual_threads(&self) -> usize {
        self.num_threads.max(1)
    }
}


struct Queue {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
    all_finished: Condvar,
    // Меняются только под блокировкой очереди, читаются без неё.
    busy: CachePadded<AtomicUsize>,
    processed: CachePadded<AtomicUsize>,
}

impl Shared {
    // Задачи никогда не выполняются под блокировкой, так что отравление не
    // оставляет очередь в несогласованном состоянии.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


/// Пул с фиксированным числом потоков и общей FIFO очередью.
///
/// При нуле воркеров каждая задача выполняется прямо в `submit`.
/// `Drop` вызывает [`WorkerPool::shutdown`]: очередь дорабатывается до конца.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: Config,
}

impl WorkerPool {
    /// Пул ровно из `num_threads` воркеров (с учётом фичи `single-threaded`).
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_config(Config::new(ThreadCount::Exactly(num_threads)))
    }

    pub fn from_request(threads: ThreadCount) -> Result<Self, PoolError> {
        Self::with_config(Config::new(threads))
    }

    pub fn with_config(mut config: Config) -> Result<Self, PoolError> {
        config.num_threads = ThreadCount::Exactly(config.num_threads).resolve();
        config.chunks_per_worker = config.chunks_per_worker.max(1);

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                shutdown: false,
            }),
            work_available: Condvar::new(),
            all_finished: Condvar::new(),
            busy: CachePadded::new(AtomicUsize::new(0)),
            processed: CachePadded::new(AtomicUsize::new(0)),
        });

        let pool = WorkerPool {
            shared,
            workers: Mutex::new(Vec::with_capacity(config.num_threads)),
            config,
        };

        // При ошибке `pool` дропается и останавливает уже запущенных воркеров.
        for id in 0..pool.config.num_threads {
            let shared = Arc::clone(&pool.shared);
            let mut builder = thread::Builder::new()
                .name(format!("{}-{}", pool.config.thread_name, id));
            if let Some(size) = pool.config.stack_size {
                builder = builder.stack_size(size);
            }
            let handle = builder
                .spawn(move || worker_loop(&shared, id))
                .map_err(|source| PoolError::Spawn { index: id, source })?;
            pool.lock_workers().push(handle);
        }

        debug!(
            num_threads = pool.config.num_threads,
            thread_name = %pool.config.thread_name,
            "worker pool started"
        );
        Ok(pool)
    }

    #[inline]
    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ставит задачу в очередь. Паника задачи попадает в [`ResultHandle`].
    ///
    /// Без воркеров задача выполняется синхронно (с номером `0`) до возврата.
    /// После [`shutdown`](Self::shutdown) возвращает [`PoolError::ShutDown`].
    pub fn submit<T, F>(&self, f: F) -> Result<ResultHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce(usize) -> T + Send + 'static,
    {
        let (task, handle) = handle::package(f);
        self.dispatch(task)?;
        Ok(handle)
    }

    fn dispatch(&self, task: Task) -> Result<(), PoolError> {
        if self.config.num_threads == 0 {
            if self.shared.lock().shutdown {
                warn!("rejected submit on a pool that is shutting down");
                return Err(PoolError::ShutDown);
            }
            task(0);
            let _queue = self.shared.lock();
            self.shared.processed.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        {
            let mut queue = self.shared.lock();
            if queue.shutdown {
                warn!("rejected submit on a pool that is shutting down");
                return Err(PoolError::ShutDown);
            }
            queue.tasks.push_back(task);
        }
        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Ждёт, пока очередь опустеет и все воркеры освободятся.
    ///
    /// Не мешает новым submit: это барьер, а не постоянное состояние.
    /// Вызов из задачи этого же пула никогда не вернётся.
    pub fn join_all(&self) {
        let queue = self.shared.lock();
        let _queue = self
            .shared
            .all_finished
            .wait_while(queue, |q| {
                !q.tasks.is_empty() || self.shared.busy.load(Ordering::Acquire) > 0
            })
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Останавливает пул: воркеры дорабатывают очередь и завершаются.
    /// Повторный вызов ничего не делает.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.lock();
            if !queue.shutdown {
                queue.shutdown = true;
                debug!(queued = queue.tasks.len(), "worker pool shutting down");
            }
        }
        self.shared.work_available.notify_all();

        let workers = mem::take(&mut *self.lock_workers());
        let current = thread::current().id();
        for handle in workers {
            // Воркер, остановивший свой же пул, завершится сам после задачи.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread terminated by panic");
            }
        }
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        let queued_tasks = self.shared.lock().tasks.len();
        PoolMetrics {
            num_threads: self.config.num_threads,
            busy_workers: self.shared.busy.load(Ordering::Acquire),
            queued_tasks,
            processed_tasks: self.shared.processed.load(Ordering::Acquire),
        }
    }

    /// Запускает `f` со [`Scope`], через который можно отправлять задачи,
    /// заимствующие данные со стека вызывающего.
    ///
    /// Не возвращается, пока не завершатся все задачи scope, даже если `f`
    /// запаниковала (паника пробрасывается дальше после ожидания).
    pub fn scope<'env, F, R>(&'env self, f: F) -> R
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> R,
    {
        let scope = Scope {
            pool: self,
            pending: Arc::new(Pending::default()),
            scope: PhantomData,
            env: PhantomData,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&scope)));
        scope.pending.wait();
        match result {
            Ok(out) => out,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}

fn worker_loop(shared: &Shared, id: usize) {
    trace!(worker = id, "worker started");
    loop {
        let task = {
            let queue = shared.lock();
            let mut queue = shared
                .work_available
                .wait_while(queue, |q| !q.shutdown && q.tasks.is_empty())
                .unwrap_or_else(PoisonError::into_inner);
            match queue.tasks.pop_front() {
                Some(task) => {
                    shared.busy.fetch_add(1, Ordering::AcqRel);
                    task
                }
                // shutdown и очередь пуста
                None => break,
            }
        };

        // Паника задачи уже поймана в handle; сюда доходит только паника из
        // Drop невостребованного результата.
        if panic::catch_unwind(AssertUnwindSafe(move || task(id))).is_err() {
            warn!(worker = id, "task result dropped with a panic");
        }

        {
            let _queue = shared.lock();
            shared.busy.fetch_sub(1, Ordering::AcqRel);
            shared.processed.fetch_add(1, Ordering::Relaxed);
        }
        shared.all_finished.notify_all();
    }
    trace!(worker = id, "worker exiting");
}


#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    done: Condvar,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn increment(&self) {
        *self.lock() += 1;
    }

    fn complete(&self) {
        let mut count = self.lock();
        *count -= 1;
        if *count == 0 {
            self.done.notify_all();
        }
    }

    fn wait(&self) {
        let count = self.lock();
        let _count = self
            .done
            .wait_while(count, |c| *c > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Уменьшает счётчик scope, когда задача выполнена или выброшена без запуска.
struct Completion(Arc<Pending>);

impl Drop for Completion {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Scope для задач с нестатическими заимствованиями. См. [`WorkerPool::scope`].
pub struct Scope<'scope, 'env: 'scope> {
    pool: &'env WorkerPool,
    pending: Arc<Pending>,
    scope: PhantomData<&'scope mut &'scope ()>,
    env: PhantomData<&'env mut &'env ()>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    pub fn submit<T, F>(&'scope self, f: F) -> Result<ResultHandle<T>, PoolError>
    where
        T: Send + 'scope,
        F: FnOnce(usize) -> T + Send + 'scope,
    {
        let (task, handle) = handle::package(f);
        self.pending.increment();
        let completion = Completion(Arc::clone(&self.pending));
        let task: Box<dyn FnOnce(usize) + Send + 'scope> = Box::new(move |worker| {
            task(worker);
            drop(completion);
        });
        // SAFETY: `WorkerPool::scope` waits for `pending` to reach zero before
        // returning, and `completion` is released only after `task` and its
        // captures are gone, so no borrow outlives the scope.
        let task: Task = unsafe {
            mem::transmute::<Box<dyn FnOnce(usize) + Send + 'scope>, Task>(task)
        };
        self.pool.dispatch(task)?;
        Ok(handle)
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }
}
