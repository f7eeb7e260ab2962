use crate::clock::Clock;
use eyre::{eyre, Result, WrapErr};
use std::alloc::{self, Layout};
use std::hint::black_box;
use std::ptr::NonNull;
use std::sync::atomic::{compiler_fence, Ordering};
use std::time::Duration;

/// A single timed loop.
///
/// `run` reads `clock` once before and once after the loop and returns the
/// time in between. Any clock or allocation failure aborts the run.
pub trait Benchmark {
    fn name(&self) -> &'static str;

    /// Label printed after the iteration count, e.g. `reallocs`.
    fn operation(&self, clock: &dyn Clock) -> String;

    fn run<C: Clock>(&self, clock: &C, iterations: u32) -> Result<Duration>;
}

/// Cost of reading the clock itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockOverhead;

impl Benchmark for ClockOverhead {
    fn name(&self) -> &'static str {
        "clock-overhead"
    }

    fn operation(&self, clock: &dyn Clock) -> String {
        format!("{} calls", clock.call_name())
    }

    fn run<C: Clock>(&self, clock: &C, iterations: u32) -> Result<Duration> {
        let start = clock.now()?;
        for _ in 0..iterations {
            compiler_fence(Ordering::SeqCst);
            black_box(clock.now()?);
        }
        let end = clock.now()?;
        Ok(end.elapsed_since(start))
    }
}

/// Cost of appending to a `Vec` that starts empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushBack;

impl Benchmark for PushBack {
    fn name(&self) -> &'static str {
        "push"
    }

    fn operation(&self, _clock: &dyn Clock) -> String {
        ".push()".to_string()
    }

    fn run<C: Clock>(&self, clock: &C, iterations: u32) -> Result<Duration> {
        let start = clock.now()?;
        let mut v: Vec<u32> = Vec::new();
        for i in 0..iterations {
            v.push(i);
        }
        black_box(&v);
        let end = clock.now()?;
        drop(v);
        Ok(end.elapsed_since(start))
    }
}

/// Cost of growing an allocation one element at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct Realloc;

impl Benchmark for Realloc {
    fn name(&self) -> &'static str {
        "realloc"
    }

    fn operation(&self, _clock: &dyn Clock) -> String {
        "reallocs".to_string()
    }

    fn run<C: Clock>(&self, clock: &C, iterations: u32) -> Result<Duration> {
        let start = clock.now()?;
        let mut buf = GrowBuffer::new();
        for i in 0..iterations {
            buf.push(i)?;
        }
        black_box(buf.as_slice());
        let end = clock.now()?;
        drop(buf);
        Ok(end.elapsed_since(start))
    }
}

/// A `u32` buffer whose allocation is exactly `len` elements long.
///
/// Every `push` resizes the allocation through the global allocator's
/// `realloc`, unlike `Vec` which grows geometrically.
pub struct GrowBuffer {
    ptr: NonNull<u32>,
    len: usize,
}

impl GrowBuffer {
    pub fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows the allocation by one element and writes `value` into it.
    ///
    /// On failure the buffer keeps its previous allocation and contents.
    #[inline]
    pub fn push(&mut self, value: u32) -> Result<()> {
        let new_layout = Layout::array::<u32>(self.len + 1).wrap_err("realloc")?;

        let raw = if self.len == 0 {
            // SAFETY: `new_layout` has a non-zero size.
            unsafe { alloc::alloc(new_layout) }
        } else {
            let old_layout = Layout::array::<u32>(self.len).wrap_err("realloc")?;
            // SAFETY: `ptr` was allocated by the global allocator with `old_layout`,
            // and the new size is non-zero and was validated by `Layout::array`.
            unsafe { alloc::realloc(self.ptr.as_ptr().cast(), old_layout, new_layout.size()) }
        };

        let ptr = grown_ptr(raw, new_layout.size())?;

        // SAFETY: the allocation now holds `len + 1` elements.
        unsafe { ptr.as_ptr().add(self.len).write(value) };
        self.ptr = ptr;
        self.len += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u32] {
        // SAFETY: the first `len` elements are initialized; a dangling pointer
        // is valid for a zero-length slice.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

/// Null from the allocator means the resize failed.
fn grown_ptr(raw: *mut u8, size: usize) -> Result<NonNull<u32>> {
    NonNull::new(raw.cast::<u32>())
        .ok_or_else(|| eyre!("cannot grow buffer to {} bytes: out of memory", size))
        .wrap_err("realloc")
}

impl Default for GrowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GrowBuffer {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Ok(layout) = Layout::array::<u32>(self.len) {
            // SAFETY: `ptr` was allocated by the global allocator with `layout`.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast(), layout) };
        }
    }
}
