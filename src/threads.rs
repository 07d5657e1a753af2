//! Перевод запрошенного числа потоков в конкретное число воркеров.
//!
//! Целочисленные запросы: `0` отключает потоки, `-1` означает по воркеру
//! на каждый аппаратный поток, `-2` половину от этого.

/// Всё выполняется синхронно в вызывающем потоке.
pub const DISABLE: isize = 0;
/// По воркеру на аппаратный поток.
pub const AUTO: isize = -1;
/// Вдвое меньше воркеров, чем [`AUTO`].
pub const ECONOMY: isize = -2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadCount {
    Exactly(usize),
    #[default]
    Auto,
    Economy,
}

impl ThreadCount {
    pub const DISABLE: ThreadCount = ThreadCount::Exactly(0);

    /// Конкретное число воркеров. `0` означает синхронное выполнение.
    ///
    /// С фичей `single-threaded` всегда возвращает `0`.
    pub fn resolve(self) -> usize {
        if cfg!(feature = "single-threaded") {
            return 0;
        }
        match self {
            ThreadCount::Exactly(n) => n,
            ThreadCount::Economy => hardware_parallelism() / 2,
            ThreadCount::Auto => hardware_parallelism(),
        }
    }
}

impl From<isize> for ThreadCount {
    fn from(request: isize) -> Self {
        match request {
            n if n >= 0 => ThreadCount::Exactly(n as usize),
            ECONOMY => ThreadCount::Economy,
            _ => ThreadCount::Auto,
        }
    }
}

impl From<usize> for ThreadCount {
    fn from(n: usize) -> Self {
        ThreadCount::Exactly(n)
    }
}

#[inline]
pub fn hardware_parallelism() -> usize {
    num_cpus::get()
}

pub fn resolve_thread_count(request: isize) -> usize {
    ThreadCount::from(request).resolve()
}
