#![cfg(feature = "single-threaded")]

#[cfg(test)]
mod tests {
    use workpool::{
        cursor::{ForwardCursor, StreamCursor},
        errors::PoolError,
        pool::{Config, WorkerPool},
        threads::{self, ThreadCount},
    };
    use std::{
        collections::LinkedList,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        thread,
    };

    #[test]
    fn test_every_request_resolves_to_zero() {
        println!("\n=== TEST: single-threaded сборка ===");
        assert_eq!(threads::resolve_thread_count(threads::AUTO), 0);
        assert_eq!(threads::resolve_thread_count(threads::ECONOMY), 0);
        assert_eq!(threads::resolve_thread_count(8), 0);
        assert_eq!(ThreadCount::Exactly(4).resolve(), 0);
        assert_eq!(Config::default().num_threads, 0);
        assert_eq!(Config::default().actual_threads(), 1);
    }

    #[test]
    fn test_tasks_run_inline() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.num_threads(), 0, "фича отключает воркеров");

        let caller = thread::current().id();
        let counter = AtomicUsize::new(0);
        let handle = pool.submit(move |worker| (worker, thread::current().id() == caller)).unwrap();
        assert_eq!(handle.join(), Ok((0, true)));

        pool.scope(|s| {
            let _ = s.submit(|_| counter.fetch_add(1, Ordering::Relaxed)).unwrap();
            // без воркеров задача уже выполнена к возврату submit
            assert_eq!(counter.load(Ordering::Relaxed), 1);
        });

        pool.shutdown();
        assert!(matches!(pool.submit(|_| ()), Err(PoolError::ShutDown)));
    }

    #[test]
    fn test_foreach_is_sequential() {
        let pool = WorkerPool::from_request(ThreadCount::Auto).unwrap();
        let caller = thread::current().id();
        let order = Mutex::new(Vec::new());

        let list: LinkedList<u32> = (0..50).collect();
        pool.par_for_each(ForwardCursor::new(list.iter()), |worker, x| {
            assert_eq!(worker, 0);
            assert_eq!(thread::current().id(), caller);
            order.lock().unwrap().push(*x);
        }, 0).unwrap();
        assert_eq!(*order.lock().unwrap(), (0..50).collect::<Vec<_>>());

        let err = pool.par_for_each(StreamCursor::new(0..5u32), |_, _| {}, 7).unwrap_err();
        assert!(matches!(err, PoolError::SizeHintMismatch { hint: 7, actual: 5 }));
        assert_eq!(pool.metrics().processed_tasks, 0, "в очередь ничего не ставится");
    }
}
