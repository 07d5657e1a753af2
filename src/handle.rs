use super::{
    errors::TaskError,
    result::SpawnResult,
};
use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    task::{Context, Poll},
};
use futures::executor;
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    task,
};


/// Задача в очереди: получает номер воркера, который её выполняет.
pub type Task = Box<dyn FnOnce(usize) + Send + 'static>;

/// Упаковывает функцию в задачу и создаёт handle на её результат.
/// Паника внутри `f` попадает в handle, а не в воркер.
pub(crate) fn package<'a, T, F>(f: F) -> (Box<dyn FnOnce(usize) + Send + 'a>, ResultHandle<T>)
where
    T: Send + 'a,
    F: FnOnce(usize) -> T + Send + 'a,
{
    let (tx, rx) = oneshot::channel::<SpawnResult<T>>();
    let task = Box::new(move |worker: usize| {
        let result = panic::catch_unwind(AssertUnwindSafe(move || f(worker)))
            .map_err(TaskError::from_panic);
        let _ = tx.send(result);
    });
    (task, ResultHandle::new(rx))
}


/// Handle на результат задачи. Создаётся при submit, до запуска задачи.
#[must_use = "dropping a ResultHandle discards the task's result and failure"]
pub struct ResultHandle<T> {
    receiver: oneshot::Receiver<SpawnResult<T>>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(receiver: oneshot::Receiver<SpawnResult<T>>) -> Self {
        Self { receiver }
    }

    /// Блокирует вызывающий поток до завершения задачи.
    ///
    /// Можно звать и из потока tokio runtime: поток просто блокируется.
    /// Ожидание идёт вне coop-бюджета tokio.
    pub fn join(mut self) -> SpawnResult<T> {
        executor::block_on(task::unconstrained(&mut self.receiver))
            .unwrap_or(Err(TaskError::ChannelClosed))
    }

    /// Результат без ожидания: `None`, пока задача ещё выполняется.
    /// Результат отдаётся один раз, дальше возвращается `ChannelClosed`.
    pub fn try_join(&mut self) -> Option<SpawnResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::ChannelClosed)),
        }
    }
}

impl<T> Future for ResultHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(TaskError::ChannelClosed))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle").finish_non_exhaustive()
    }
}
