use futures::stream::BoxStream;
use std::time::Duration;

/// Emit `text` one character (Unicode scalar value) at a time, pausing `delay`
/// between characters.
///
/// This paces an already complete answer for display, the text is not produced
/// incrementally. Dropping the stream stops the emission.
pub fn paced_chars(text: String, delay: Duration) -> BoxStream<'static, String> {
    Box::pin(async_stream::stream! {
        for (index, ch) in text.chars().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            yield ch.to_string();
        }
    })
}
