//! Курсоры: позиция в последовательности плюс её возможности обхода.
//!
//! От категории курсора зависит, как [`par_for_each`](crate::par_for_each)
//! режет работу на чанки:
//!
//! - [`CursorCategory::RandomAccess`]: длина и сдвиг за O(1);
//! - [`CursorCategory::Forward`]: курсор можно копировать и продвигать независимо;
//! - [`CursorCategory::SinglePass`]: каждый элемент можно прочитать только один раз.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorCategory {
    RandomAccess,
    Forward,
    SinglePass,
}

pub trait Cursor: Send + Sized {
    type Item: Send;

    const CATEGORY: CursorCategory;

    /// Оставшееся число элементов, если оно известно за O(1).
    fn exact_len(&self) -> Option<usize> {
        None
    }

    fn advance(&mut self) -> Option<Self::Item>;

    /// Пропускает до `n` элементов, возвращает сколько пропущено.
    fn advance_n(&mut self, n: usize) -> usize {
        let mut skipped = 0;
        while skipped < n && self.advance().is_some() {
            skipped += 1;
        }
        skipped
    }

    /// Независимая копия текущей позиции. `None` для однопроходных курсоров.
    fn fork(&self) -> Option<Self>;

    #[inline]
    fn is_single_pass(&self) -> bool {
        Self::CATEGORY == CursorCategory::SinglePass
    }
}

pub trait IntoCursor {
    type Cursor: Cursor;

    fn into_cursor(self) -> Self::Cursor;
}


/// Random-access курсор по срезу, элементы отдаются по ссылке.
#[derive(Debug)]
pub struct SliceCursor<'a, T> {
    slice: &'a [T],
}

impl<'a, T> SliceCursor<'a, T> {
    pub fn new(slice: &'a [T]) -> Self {
        Self { slice }
    }
}

impl<T> Clone for SliceCursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SliceCursor<'_, T> {}

impl<'a, T: Sync> Cursor for SliceCursor<'a, T> {
    type Item = &'a T;

    const CATEGORY: CursorCategory = CursorCategory::RandomAccess;

    #[inline]
    fn exact_len(&self) -> Option<usize> {
        Some(self.slice.len())
    }

    #[inline]
    fn advance(&mut self) -> Option<&'a T> {
        let (first, rest) = self.slice.split_first()?;
        self.slice = rest;
        Some(first)
    }

    #[inline]
    fn advance_n(&mut self, n: usize) -> usize {
        let n = n.min(self.slice.len());
        self.slice = &self.slice[n..];
        n
    }

    #[inline]
    fn fork(&self) -> Option<Self> {
        Some(*self)
    }
}

impl<'a, T: Sync> IntoCursor for SliceCursor<'a, T> {
    type Cursor = Self;

    fn into_cursor(self) -> Self {
        self
    }
}

impl<'a, T: Sync> IntoCursor for &'a [T] {
    type Cursor = SliceCursor<'a, T>;

    fn into_cursor(self) -> Self::Cursor {
        SliceCursor::new(self)
    }
}

impl<'a, T: Sync> IntoCursor for &'a Vec<T> {
    type Cursor = SliceCursor<'a, T>;

    fn into_cursor(self) -> Self::Cursor {
        SliceCursor::new(self.as_slice())
    }
}


impl Cursor for Range<usize> {
    type Item = usize;

    const CATEGORY: CursorCategory = CursorCategory::RandomAccess;

    #[inline]
    fn exact_len(&self) -> Option<usize> {
        Some(self.end.saturating_sub(self.start))
    }

    #[inline]
    fn advance(&mut self) -> Option<usize> {
        self.next()
    }

    #[inline]
    fn advance_n(&mut self, n: usize) -> usize {
        let n = n.min(self.end.saturating_sub(self.start));
        self.start += n;
        n
    }

    #[inline]
    fn fork(&self) -> Option<Self> {
        Some(self.clone())
    }
}

impl IntoCursor for Range<usize> {
    type Cursor = Self;

    fn into_cursor(self) -> Self {
        self
    }
}


/// Forward-only курсор поверх клонируемого итератора
/// (`LinkedList::iter`, `BTreeMap::values` и т.п.).
#[derive(Debug, Clone)]
pub struct ForwardCursor<I> {
    iter: I,
}

impl<I> ForwardCursor<I>
where
    I: Iterator + Clone + Send,
    I::Item: Send,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self { iter: iter.into_iter() }
    }
}

impl<I> Cursor for ForwardCursor<I>
where
    I: Iterator + Clone + Send,
    I::Item: Send,
{
    type Item = I::Item;

    const CATEGORY: CursorCategory = CursorCategory::Forward;

    #[inline]
    fn advance(&mut self) -> Option<I::Item> {
        self.iter.next()
    }

    #[inline]
    fn fork(&self) -> Option<Self> {
        Some(self.clone())
    }
}

impl<I> IntoCursor for ForwardCursor<I>
where
    I: Iterator + Clone + Send,
    I::Item: Send,
{
    type Cursor = Self;

    fn into_cursor(self) -> Self {
        self
    }
}


/// Однопроходный курсор: поток, канал, чтение из сокета.
#[derive(Debug)]
pub struct StreamCursor<I> {
    iter: I,
}

impl<I> StreamCursor<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self { iter: iter.into_iter() }
    }
}

impl<I> Cursor for StreamCursor<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;

    const CATEGORY: CursorCategory = CursorCategory::SinglePass;

    #[inline]
    fn advance(&mut self) -> Option<I::Item> {
        self.iter.next()
    }

    fn fork(&self) -> Option<Self> {
        None
    }
}

impl<I> IntoCursor for StreamCursor<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Cursor = Self;

    fn into_cursor(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::LinkedList;

    #[test]
    fn slice_cursor_skips_in_place() {
        let data = [10, 20, 30, 40];
        let mut cursor = data.as_slice().into_cursor();
        assert_eq!(cursor.exact_len(), Some(4));
        assert_eq!(cursor.advance_n(2), 2);
        let mut fork = cursor.fork().unwrap();
        assert_eq!(cursor.advance(), Some(&30));
        assert_eq!(fork.advance(), Some(&30));
        assert_eq!(cursor.advance_n(10), 1);
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn range_cursor_is_random_access() {
        let mut cursor = (3usize..9).into_cursor();
        assert_eq!(<Range<usize> as Cursor>::CATEGORY, CursorCategory::RandomAccess);
        assert_eq!(cursor.advance_n(4), 4);
        assert_eq!(cursor.exact_len(), Some(2));
        assert_eq!(cursor.advance(), Some(7));
    }

    #[test]
    fn forward_cursor_forks_independently() {
        let list: LinkedList<u32> = (0..5).collect();
        let mut cursor = ForwardCursor::new(list.iter());
        assert_eq!(cursor.exact_len(), None);
        assert_eq!(cursor.advance_n(2), 2);
        let mut fork = cursor.fork().unwrap();
        assert_eq!(cursor.advance_n(10), 3);
        assert_eq!(fork.advance(), Some(&2));
        assert!(!fork.is_single_pass());
    }

    #[test]
    fn stream_cursor_cannot_fork() {
        let cursor = StreamCursor::new(vec![1, 2, 3]);
        assert!(cursor.fork().is_none());
        assert!(cursor.is_single_pass());
    }
}
