//! Параллельный for-each поверх [`WorkerPool`].
//!
//! Последовательность режется на чанки примерно по
//! `total / num_threads / chunks_per_worker` элементов, по задаче на чанк.
//! Способ нарезки зависит от [`CursorCategory`] курсора. При одном воркере
//! и меньше всё выполняется в вызывающем потоке.
//!
//! Ошибки: возвращается первая паника в порядке постановки задач, остальные
//! задачи всё равно доработают до конца.

use super::{
    cursor::{Cursor, CursorCategory, IntoCursor},
    errors::{PoolError, TaskError},
    handle::ResultHandle,
    pool::{Scope, WorkerPool},
    threads::ThreadCount,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;


/// `max(round(total / workers / chunks_per_worker), 1)`
pub(crate) fn chunk_size(total: usize, workers: usize, chunks_per_worker: usize) -> usize {
    let per_chunk = total as f64 / workers.max(1) as f64 / chunks_per_worker.max(1) as f64;
    (per_chunk.round() as usize).max(1)
}

fn check_size_hint(hint: usize, actual: usize) -> Result<(), PoolError> {
    if hint != 0 && hint != actual {
        return Err(PoolError::SizeHintMismatch { hint, actual });
    }
    Ok(())
}

fn count_remaining<C: Cursor>(cursor: &mut C) -> usize {
    let mut n = 0;
    while cursor.advance().is_some() {
        n += 1;
    }
    n
}

/// Ждёт handles в порядке постановки и возвращает первую ошибку.
fn join_in_order(handles: Vec<ResultHandle<()>>) -> Result<(), PoolError> {
    let mut first = None;
    let mut suppressed = 0usize;
    for handle in handles {
        if let Err(err) = handle.join() {
            if first.is_none() {
                first = Some(err);
            } else {
                suppressed += 1;
            }
        }
    }
    if suppressed > 0 {
        debug!(suppressed, "further task failures dropped after the first one");
    }
    match first {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// По задаче на элемент. Возвращает число поставленных задач.
fn submit_each<'scope, 'env, C, F>(
    scope: &'scope Scope<'scope, 'env>,
    cursor: &mut C,
    function: &'scope F,
    handles: &mut Vec<ResultHandle<()>>,
) -> Result<usize, PoolError>
where
    C: Cursor + 'scope,
    F: Fn(usize, C::Item) + Sync,
{
    let mut submitted = 0;
    while let Some(item) = cursor.advance() {
        handles.push(scope.submit(move |worker| function(worker, item))?);
        submitted += 1;
    }
    Ok(submitted)
}

/// Ставит до `total` элементов чанками по `chunk`, каждой задаче своя копия
/// курсора. Возвращает, на сколько элементов сдвинулся `cursor`.
fn submit_chunks<'scope, 'env, C, F>(
    scope: &'scope Scope<'scope, 'env>,
    cursor: &mut C,
    total: usize,
    chunk: usize,
    function: &'scope F,
    handles: &mut Vec<ResultHandle<()>>,
) -> Result<usize, PoolError>
where
    C: Cursor + 'scope,
    F: Fn(usize, C::Item) + Sync,
{
    let mut remaining = total;
    let mut traversed = 0;
    while remaining > 0 {
        let lc = chunk.min(remaining);
        let Some(mut start) = cursor.fork() else {
            // копировать нельзя: остаток по одному элементу
            traversed += submit_each(scope, cursor, function, handles)?;
            break;
        };
        handles.push(scope.submit(move |worker| {
            for _ in 0..lc {
                match start.advance() {
                    Some(item) => function(worker, item),
                    None => break,
                }
            }
        })?);
        let stepped = cursor.advance_n(lc);
        traversed += stepped;
        if stepped < lc {
            break;
        }
        remaining -= lc;
    }
    Ok(traversed)
}


impl WorkerPool {
    #[inline]
    fn chunk_size(&self, total: usize) -> usize {
        chunk_size(total, self.num_threads(), self.config().chunks_per_worker)
    }

    /// Вызывает `function(worker, item)` для каждого элемента `items`.
    ///
    /// `size_hint` либо `0`, либо точное число элементов: для forward-курсоров
    /// он избавляет от лишнего прохода. Несовпадение даёт
    /// [`PoolError::SizeHintMismatch`].
    ///
    /// `function` выполняется конкурентно; запись в общие данные по индексу
    /// элемента остаётся на совести вызывающего (см. [`par_scatter`](Self::par_scatter)).
    /// Вызов из задачи этого же пула может зависнуть, если заняты все воркеры.
    /// Из async-кода вызывать можно: текущий поток runtime блокируется до конца обхода.
    pub fn par_for_each<I, F>(&self, items: I, function: F, size_hint: usize) -> Result<(), PoolError>
    where
        I: IntoCursor,
        F: Fn(usize, <I::Cursor as Cursor>::Item) + Sync,
    {
        let cursor = items.into_cursor();
        if self.num_threads() <= 1 {
            return for_each_sequential(cursor, &function, size_hint);
        }
        match <I::Cursor as Cursor>::CATEGORY {
            CursorCategory::RandomAccess => self.for_each_random_access(cursor, &function, size_hint),
            CursorCategory::Forward => self.for_each_forward(cursor, &function, size_hint),
            CursorCategory::SinglePass => self.for_each_single_pass(cursor, &function, size_hint),
        }
    }

    /// `par_for_each` по целым `0..count`.
    pub fn par_for_each_index<F>(&self, count: usize, function: F) -> Result<(), PoolError>
    where
        F: Fn(usize, usize) + Sync,
    {
        self.par_for_each(0..count, function, count)
    }

    /// `output[i] = function(worker, &input[i])`. Вход и выход режутся на
    /// одинаковые непересекающиеся чанки, так что общей изменяемой памяти нет.
    pub fn par_scatter<T, U, F>(&self, input: &[T], output: &mut [U], function: F) -> Result<(), PoolError>
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync,
    {
        if input.len() != output.len() {
            return Err(PoolError::LengthMismatch {
                input: input.len(),
                output: output.len(),
            });
        }
        if input.is_empty() {
            return Ok(());
        }
        if self.num_threads() <= 1 {
            return panic::catch_unwind(AssertUnwindSafe(|| {
                for (slot, item) in output.iter_mut().zip(input) {
                    *slot = function(0, item);
                }
            }))
            .map_err(|payload| TaskError::from_panic(payload).into());
        }

        let chunk = self.chunk_size(input.len());
        let function = &function;
        self.scope(|s| {
            let mut handles = Vec::with_capacity(input.len().div_ceil(chunk));
            for (src, dst) in input.chunks(chunk).zip(output.chunks_mut(chunk)) {
                handles.push(s.submit(move |worker| {
                    for (slot, item) in dst.iter_mut().zip(src) {
                        *slot = function(worker, item);
                    }
                })?);
            }
            join_in_order(handles)
        })
    }

    fn for_each_random_access<C, F>(&self, cursor: C, function: &F, size_hint: usize) -> Result<(), PoolError>
    where
        C: Cursor,
        F: Fn(usize, C::Item) + Sync,
    {
        let Some(total) = cursor.exact_len() else {
            return self.for_each_forward(cursor, function, size_hint);
        };
        check_size_hint(size_hint, total)?;
        if total == 0 {
            return Ok(());
        }

        let chunk = self.chunk_size(total);
        self.scope(move |s| {
            let mut cursor = cursor;
            let mut handles = Vec::with_capacity(total.div_ceil(chunk));
            submit_chunks(s, &mut cursor, total, chunk, function, &mut handles)?;
            join_in_order(handles)
        })
    }

    fn for_each_forward<C, F>(&self, cursor: C, function: &F, size_hint: usize) -> Result<(), PoolError>
    where
        C: Cursor,
        F: Fn(usize, C::Item) + Sync,
    {
        let total = if size_hint != 0 {
            size_hint
        } else {
            match cursor.fork() {
                Some(mut probe) => count_remaining(&mut probe),
                None => return self.for_each_single_pass(cursor, function, size_hint),
            }
        };
        if total == 0 {
            return Ok(());
        }

        let chunk = self.chunk_size(total);
        self.scope(move |s| {
            let mut cursor = cursor;
            let mut handles = Vec::with_capacity(total.div_ceil(chunk));
            let traversed = submit_chunks(s, &mut cursor, total, chunk, function, &mut handles)?;
            let actual = traversed + count_remaining(&mut cursor);
            join_in_order(handles)?;
            check_size_hint(total, actual)
        })
    }

    fn for_each_single_pass<C, F>(&self, cursor: C, function: &F, size_hint: usize) -> Result<(), PoolError>
    where
        C: Cursor,
        F: Fn(usize, C::Item) + Sync,
    {
        self.scope(move |s| {
            let mut cursor = cursor;
            // hint ещё не проверен, резервировать по нему нельзя
            let mut handles = Vec::new();
            let submitted = submit_each(s, &mut cursor, function, &mut handles)?;
            join_in_order(handles)?;
            check_size_hint(size_hint, submitted)
        })
    }
}

fn for_each_sequential<C, F>(mut cursor: C, function: &F, size_hint: usize) -> Result<(), PoolError>
where
    C: Cursor,
    F: Fn(usize, C::Item),
{
    let mut traversed = 0;
    panic::catch_unwind(AssertUnwindSafe(|| {
        while let Some(item) = cursor.advance() {
            function(0, item);
            traversed += 1;
        }
    }))
    .map_err(TaskError::from_panic)?;
    check_size_hint(size_hint, traversed)
}


/// [`WorkerPool::par_for_each`] на временном пуле из `threads` воркеров.
pub fn par_for_each<I, F>(threads: ThreadCount, items: I, function: F, size_hint: usize) -> Result<(), PoolError>
where
    I: IntoCursor,
    F: Fn(usize, <I::Cursor as Cursor>::Item) + Sync,
{
    let pool = WorkerPool::from_request(threads)?;
    pool.par_for_each(items, function, size_hint)
}

/// [`WorkerPool::par_for_each_index`] на временном пуле.
pub fn par_for_each_index<F>(threads: ThreadCount, count: usize, function: F) -> Result<(), PoolError>
where
    F: Fn(usize, usize) + Sync,
{
    let pool = WorkerPool::from_request(threads)?;
    pool.par_for_each_index(count, function)
}
