use super::{decode_line, LineBuffer, StreamMessage};
use crate::{BoxStream, Result};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Lazy, forward-only sequence of [`StreamMessage`]s over an async response body.
///
/// The only suspension point is waiting for more body bytes. Dropping the stream
/// drops the body and closes the connection; nothing is cached or resumable.
pub struct MessageStream {
    inner: BoxStream<'static, StreamMessage>,
}

impl MessageStream {
    /// Decode a body whose HTTP status was already checked.
    pub fn new(body: BoxStream<'static, Bytes>) -> Self {
        let stream = stream::unfold(Some((body, LineBuffer::new())), |state| async move {
            let (mut input, mut buf) = state?;
            loop {
                if let Some(line) = buf.next_line() {
                    match decode_line(&line) {
                        Ok(Some(message)) => return Some((Ok(message), Some((input, buf)))),
                        Ok(None) => continue,
                        // Terminal: the state is dropped with the error.
                        Err(e) => return Some((Err(e), None)),
                    }
                }

                match input.next().await {
                    Some(Ok(bytes)) => buf.extend(&bytes),
                    Some(Err(e)) => return Some((Err(e), None)),
                    None => {
                        // EOF: an unterminated last line is still a line.
                        let rest = buf.take_remaining()?;
                        return match decode_line(&rest) {
                            Ok(Some(message)) => Some((Ok(message), None)),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), None)),
                        };
                    }
                }
            }
        });

        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for MessageStream {
    type Item = Result<StreamMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use futures::TryStreamExt;

    fn body(chunks: Vec<&'static str>) -> BoxStream<'static, Bytes> {
        Box::pin(stream::iter(chunks).map(|s| Ok(Bytes::from(s))))
    }

    #[tokio::test]
    async fn yields_every_line_then_ends() {
        let stream = MessageStream::new(body(vec![
            "{\"response\":\"Hel\"}\n{\"resp",
            "onse\":\"lo\"}\n\n",
            "{\"response\":\"\",\"done\":true}",
        ]));
        let messages: Vec<StreamMessage> = stream.try_collect().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].get("response").unwrap(), "lo");
        assert!(messages[2].is_done());
    }

    #[tokio::test]
    async fn stops_after_embedded_error() {
        let mut stream = MessageStream::new(body(vec![
            "{\"status\":\"a\"}\n{\"status\":\"b\"}\n",
            "{\"error\":\"disk full\"}\n{\"status\":\"never\"}\n",
        ]));
        assert_eq!(stream.next().await.unwrap().unwrap().status(), Some("a"));
        assert_eq!(stream.next().await.unwrap().unwrap().status(), Some("b"));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Response { status_code: None, .. }));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_line_is_fatal() {
        let mut stream = MessageStream::new(body(vec!["{\"a\":1}\nnot-json\n{\"a\":2}\n"]));
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(Error::Serialization(_))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn multibyte_split_across_chunks() {
        let text = "{\"response\":\"héllo\"}\n".as_bytes();
        let (a, b) = text.split_at(15);
        let chunks: Vec<Result<Bytes>> =
            vec![Ok(Bytes::copy_from_slice(a)), Ok(Bytes::copy_from_slice(b))];
        let stream = MessageStream::new(Box::pin(stream::iter(chunks)));
        let messages: Vec<StreamMessage> = stream.try_collect().await.unwrap();
        assert_eq!(messages[0].get("response").unwrap(), "héllo");
    }

    #[test]
    fn transport_error_ends_stream() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"a\":1}\n")),
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
            Ok(Bytes::from_static(b"{\"a\":2}\n")),
        ];
        let mut stream = MessageStream::new(Box::pin(stream::iter(chunks)));
        tokio_test::block_on(async {
            assert!(stream.next().await.unwrap().is_ok());
            assert!(matches!(stream.next().await.unwrap(), Err(Error::Io(_))));
            assert!(stream.next().await.is_none());
        });
    }
}
