//! Pass-through from run events to raw text chunks.

use futures::{Stream, StreamExt};

use viab_core::types::RunEvent;

/// Emit the `content` of every event that carries non-empty text.
///
/// Order is preserved and chunks are not merged or split. Errors pass
/// through unchanged.
pub fn stream_text_response<S, E>(events: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<RunEvent, E>>,
{
    events.filter_map(|item| async move {
        match item {
            Ok(event) => event.content.filter(|c| !c.is_empty()).map(Ok),
            Err(e) => Some(Err(e)),
        }
    })
}

/// Drain `events` and concatenate all text chunks.
pub async fn collect_text<S, E>(events: S) -> Result<String, E>
where
    S: Stream<Item = Result<RunEvent, E>>,
{
    let chunks = stream_text_response(events);
    futures::pin_mut!(chunks);
    let mut out = String::new();
    while let Some(chunk) = chunks.next().await {
        out.push_str(&chunk?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use viab_core::types::RunEventKind;

    fn frame(kind: RunEventKind) -> Result<RunEvent, String> {
        Ok(RunEvent::new(kind, "boq_agent", "r1", "s1"))
    }

    fn text(t: &str) -> Result<RunEvent, String> {
        Ok(RunEvent::content("boq_agent", "r1", "s1", t.to_string()))
    }

    #[tokio::test]
    async fn test_only_content_events_are_emitted_in_order() {
        let events = vec![
            frame(RunEventKind::RunStarted),
            text("Pre"),
            text(""),
            text("limin"),
            text("aries\n"),
            frame(RunEventKind::RunCompleted),
        ];
        let chunks: Vec<Result<String, String>> =
            stream_text_response(stream::iter(events)).collect().await;
        assert_eq!(
            chunks,
            vec![Ok("Pre".to_string()), Ok("limin".to_string()), Ok("aries\n".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_input_yields_nothing() {
        let chunks: Vec<Result<String, String>> =
            stream_text_response(stream::iter(Vec::new())).collect().await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let events = vec![text("a"), Err("boom".to_string()), text("b")];
        let chunks: Vec<Result<String, String>> =
            stream_text_response(stream::iter(events)).collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_collect_text_concatenates_and_stops_on_error() {
        let ok = vec![frame(RunEventKind::RunStarted), text("12 "), text("desks")];
        assert_eq!(collect_text(stream::iter(ok)).await.unwrap(), "12 desks");

        let failing = vec![text("12 "), Err("model offline".to_string())];
        assert_eq!(
            collect_text(stream::iter(failing)).await.unwrap_err(),
            "model offline"
        );
    }
}
