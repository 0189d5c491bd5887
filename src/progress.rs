//! Provides [`ProgressSink`], the narrow seam between the core operations and whatever is
//! watching them run (§9/§10.E): cache hits/misses and download byte counts are published
//! through this interface rather than a generic event bus, since there is exactly one practical
//! subscriber in this program, the terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Receives progress notifications for one unit of work (a download, a multi-mod operation).
/// `start`/`advance`/`finish` are called in that order, at most once each for `start`/`finish`.
pub trait ProgressSink: Send + Sync {
    /// Announces the total size of the work about to start, in whatever unit the caller is
    /// counting (bytes for a download, item count for a multi-mod operation).
    fn start(&self, total: u64);

    /// Reports `n` more units completed since the last call.
    fn advance(&self, n: u64);

    /// Marks the work as finished, regardless of how much of `total` was actually reported.
    fn finish(&self);
}

/// A [`ProgressSink`] that discards every event, for non-interactive contexts (piped output,
/// tests) where a terminal bar would only add noise.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self, _n: u64) {}
    fn finish(&self) {}
}

/// A [`ProgressSink`] backed by an `indicatif` terminal progress bar.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    /// Builds a new terminal progress sink labeled with `message`, not yet started.
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .progress_chars("=> "),
        );
        bar.set_message(message.into());
        TerminalProgress { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn advance(&self, n: u64) {
        self.bar.inc(n);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Receives cache hit/miss notifications for a single request (§4.D). Separate from
/// [`ProgressSink`] since a cache lookup is a point-in-time event, not a unit of work with a
/// start/advance/finish lifecycle.
pub trait CacheEvents: Send + Sync {
    /// A cached response was found and served without touching the network.
    fn hit(&self, url: &str) {
        let _ = url;
    }

    /// No cached response was found; a network request is about to be made.
    fn miss(&self, url: &str) {
        let _ = url;
    }
}

/// A [`CacheEvents`] subscriber that just logs at `trace` level, the default when nothing else
/// is watching.
#[derive(Debug, Default)]
pub struct LoggingCacheEvents;

impl CacheEvents for LoggingCacheEvents {
    fn hit(&self, url: &str) {
        log::trace!("cache hit for {}", url);
    }

    fn miss(&self, url: &str) {
        log::trace!("cache miss for {}, acquiring lock", url);
    }
}

/// Wraps an [`AsyncWrite`] destination, reporting every successful write to a [`ProgressSink`]
/// as it happens. Used to drive a download's progress bar off the same byte stream that's
/// already being copied to disk, rather than a separate counting pass.
pub struct CountingWriter<'a, W> {
    inner: &'a mut W,
    sink: &'a dyn ProgressSink,
}

impl<'a, W> CountingWriter<'a, W> {
    /// Wraps `inner`, reporting bytes written to `sink`.
    pub fn new(inner: &'a mut W, sink: &'a dyn ProgressSink) -> Self {
        CountingWriter { inner, sink }
    }
}

impl<'a, W> AsyncWrite for CountingWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        let result = Pin::new(&mut *this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &result {
            this.sink.advance(*n as u64);
        }
        result
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut *self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        advanced: AtomicU64,
        finished: std::sync::atomic::AtomicBool,
    }

    impl ProgressSink for CountingProgress {
        fn start(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn advance(&self, n: u64) {
            self.advanced.fetch_add(n, Ordering::SeqCst);
        }

        fn finish(&self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn null_progress_accepts_every_call_without_panicking() {
        let sink = NullProgress;
        sink.start(100);
        sink.advance(50);
        sink.finish();
    }

    #[test]
    fn sink_trait_object_dispatches_correctly() {
        let sink: Box<dyn ProgressSink> = Box::new(CountingProgress::default());
        sink.start(10);
        sink.advance(3);
        sink.advance(4);
        sink.finish();
    }

    struct DefaultEvents;
    impl CacheEvents for DefaultEvents {}

    #[test]
    fn cache_events_default_methods_are_no_ops() {
        let events = DefaultEvents;
        events.hit("https://example.test/a");
        events.miss("https://example.test/b");
    }

    #[tokio::test]
    async fn counting_writer_reports_every_write_to_the_sink() {
        use tokio::io::AsyncWriteExt;

        let sink = CountingProgress::default();
        let mut dest = Vec::new();
        {
            let mut writer = CountingWriter::new(&mut dest, &sink);
            writer.write_all(b"hello").await.unwrap();
            writer.write_all(b" world").await.unwrap();
        }

        assert_eq!(dest, b"hello world");
        assert_eq!(sink.advanced.load(Ordering::SeqCst), 11);
    }
}
