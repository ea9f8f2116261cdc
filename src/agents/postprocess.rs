//! Post-orchestration image placeholder resolution
//!
//! The writer marks figures it wants generated with `[gen:description]`
//! filenames. After the hop loop ends, up to `max_images` placeholders are
//! attempted sequentially through the `ImagePort`; a failed generation
//! leaves its placeholder untouched but still counts against the cap.

use std::sync::Arc;

use super::domain::StreamEvent;
use super::stream::EventSender;
use crate::domain::ImagePort;

const PLACEHOLDER_PREFIX: &str = "[gen:";

/// Replace generated-image placeholders in `document`, emitting a progress
/// followup per attempt. Returns the (possibly unchanged) document.
pub async fn resolve_image_placeholders(
    document: &str,
    images: &Arc<dyn ImagePort>,
    max_images: usize,
    events: &EventSender,
) -> String {
    let mut result = document.to_string();
    let mut attempts = 0usize;
    let mut cursor = 0usize;

    // The cap bounds attempts, not successes: a flaky backend must not turn
    // a long document into an unbounded series of generation calls.
    while attempts < max_images {
        let Some(rel_start) = result[cursor..].find(PLACEHOLDER_PREFIX) else {
            break;
        };
        let start = cursor + rel_start;
        let desc_start = start + PLACEHOLDER_PREFIX.len();
        let Some(rel_end) = result[desc_start..].find(']') else {
            break;
        };
        let end = desc_start + rel_end;
        let description = result[desc_start..end].trim().to_string();

        attempts += 1;
        events
            .send(StreamEvent::Followup {
                followup_content: format!(
                    "Generating image {} of up to {}: {}",
                    attempts,
                    max_images,
                    preview(&description)
                ),
            })
            .await;

        match images.generate(&description).await {
            Ok(reference) => {
                result.replace_range(start..=end, &reference);
                cursor = start + reference.len();
            }
            Err(e) => {
                tracing::warn!("Image generation failed for '{}': {}", preview(&description), e);
                // Skip past this placeholder so the next one gets a turn.
                cursor = end + 1;
            }
        }
    }

    result
}

fn preview(description: &str) -> String {
    if description.chars().count() <= 60 {
        description.to_string()
    } else {
        let head: String = description.chars().take(60).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::stream::EventStream;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingImages {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImagePort for CountingImages {
        async fn generate(&self, description: &str) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("data:image/png;base64,IMG{}_{}", n, description.len()))
        }
    }

    struct FailingImages {
        calls: AtomicUsize,
    }

    impl FailingImages {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImagePort for FailingImages {
        async fn generate(&self, _description: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("image backend unavailable")
        }
    }

    fn doc(n: usize) -> String {
        (0..n)
            .map(|i| format!("\\includegraphics{{[gen:figure number {i}]}}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn replaces_placeholders_up_to_the_cap() {
        let images: Arc<dyn ImagePort> = Arc::new(CountingImages {
            calls: AtomicUsize::new(0),
        });
        let (tx, stream) = EventStream::channel(64);

        let result = resolve_image_placeholders(&doc(5), &images, 3, &tx).await;
        drop(tx);

        assert_eq!(result.matches("data:image/png;base64,").count(), 3);
        // The fourth and fifth placeholders are left in place.
        assert_eq!(result.matches(PLACEHOLDER_PREFIX).count(), 2);

        let followups = stream
            .collect()
            .await
            .into_iter()
            .filter(|e| matches!(e, StreamEvent::Followup { .. }))
            .count();
        assert_eq!(followups, 3);
    }

    #[tokio::test]
    async fn failed_generation_leaves_placeholder_and_continues() {
        let images: Arc<dyn ImagePort> = Arc::new(FailingImages::new());
        let (tx, _stream) = EventStream::channel(64);

        let input = doc(2);
        let result = resolve_image_placeholders(&input, &images, 3, &tx).await;

        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn failures_count_against_the_cap() {
        let failing = Arc::new(FailingImages::new());
        let images: Arc<dyn ImagePort> = failing.clone();
        let (tx, stream) = EventStream::channel(64);

        let input = doc(10);
        let result = resolve_image_placeholders(&input, &images, 3, &tx).await;
        drop(tx);

        // A broken backend gets exactly max_images chances, not one per
        // remaining placeholder.
        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result, input);

        let followups = stream
            .collect()
            .await
            .into_iter()
            .filter(|e| matches!(e, StreamEvent::Followup { .. }))
            .count();
        assert_eq!(followups, 3);
    }

    #[tokio::test]
    async fn document_without_placeholders_is_untouched() {
        let images: Arc<dyn ImagePort> = Arc::new(CountingImages {
            calls: AtomicUsize::new(0),
        });
        let (tx, _stream) = EventStream::channel(8);

        let input = "\\documentclass{article}\\begin{document}x\\end{document}";
        let result = resolve_image_placeholders(input, &images, 3, &tx).await;
        assert_eq!(result, input);
    }
}
