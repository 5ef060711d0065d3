use std::future::Future;

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{error::ExtractorError, options::Options};
use crate::media::Data;

/// Runs one extraction per playlist item with bounded concurrency.
///
/// The output has exactly one [`Data`] per input URL, in input order,
/// regardless of completion order. A failed item becomes an error
/// placeholder for its URL and never aborts the batch. Once the
/// cancellation token fires, in-flight and not yet started items resolve
/// to [`ExtractorError::Cancelled`] while completed results are kept.
#[derive(Debug, Clone)]
pub struct BatchExtractor {
    concurrency: usize,
    token: CancellationToken,
}

impl BatchExtractor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            token: CancellationToken::new(),
        }
    }

    /// Concurrency and cancellation taken from the call options.
    pub fn from_options(options: &Options) -> Self {
        Self::new(options.concurrency()).with_cancellation(options.cancellation.clone())
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub async fn run<F, Fut>(&self, urls: Vec<String>, extract: F) -> Vec<Data>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Data, ExtractorError>>,
    {
        let total = urls.len();
        debug!(total, concurrency = self.concurrency, "extracting playlist items");

        // One slot per item, filled by index as tasks finish.
        let mut slots: Vec<Option<Data>> = vec![None; total];

        let mut pending = stream::iter(urls.clone().into_iter().enumerate())
            .map(|(index, url)| {
                let token = self.token.clone();
                let work = extract(url.clone());
                async move {
                    let result = tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(ExtractorError::Cancelled),
                        result = work => result,
                    };
                    let data = result.unwrap_or_else(|e| {
                        warn!(index, url = %url, error = %e, "playlist item failed");
                        Data::from_error(url, e)
                    });
                    (index, data)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, data)) = pending.next().await {
            slots[index] = Some(data);
        }

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| Data::from_error(url, ExtractorError::Cancelled)))
            .collect()
    }
}
