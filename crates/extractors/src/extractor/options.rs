use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Per-call extraction options.
///
/// Handlers may ignore fields that do not apply to their site. Site-specific
/// knobs travel in `extras` untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    // Extract every item of a playlist page instead of a single item
    pub playlist: bool,
    // Explicit item list, e.g. "1,5,6,8-10"
    pub items: String,
    pub item_start: usize,
    pub item_end: usize,
    // Maximum number of concurrently extracted playlist items
    pub thread_number: usize,
    pub cookie: Option<String>,
    pub extras: Option<serde_json::Value>,
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Options {
    /// Effective playlist concurrency, never below 1.
    pub fn concurrency(&self) -> usize {
        self.thread_number.max(1)
    }

    /// 1-based indices of the playlist items to extract out of `total`.
    ///
    /// An explicit `items` list wins over the `item_start`/`item_end` range.
    /// The result is sorted, de-duplicated and limited to `1..=total`.
    pub fn need_download_items(&self, total: usize) -> Vec<usize> {
        let mut selected: Vec<usize> = if self.items.trim().is_empty() {
            let start = self.item_start.max(1);
            let end = match self.item_end {
                0 => total,
                end if end < start => start,
                end => end,
            };
            (start..=end).collect()
        } else {
            parse_items(&self.items)
        };

        selected.retain(|&i| i >= 1 && i <= total);
        selected.sort_unstable();
        selected.dedup();
        selected
    }

    /// Keeps the entries of `items` selected by [`Options::need_download_items`].
    pub fn select<T>(&self, items: Vec<T>) -> Vec<T> {
        let wanted = self.need_download_items(items.len());
        items
            .into_iter()
            .enumerate()
            .filter(|(i, _)| wanted.binary_search(&(i + 1)).is_ok())
            .map(|(_, item)| item)
            .collect()
    }
}

fn parse_items(items: &str) -> Vec<usize> {
    let mut out = Vec::new();
    for piece in items.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match piece.split_once('-') {
            Some((a, b)) => {
                if let (Ok(a), Ok(b)) = (a.trim().parse::<usize>(), b.trim().parse::<usize>()) {
                    out.extend(a..=b);
                }
            }
            None => {
                if let Ok(i) = piece.parse::<usize>() {
                    out.push(i);
                }
            }
        }
    }
    out
}
