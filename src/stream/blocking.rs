use super::{decode_line, StreamMessage};
use crate::Result;
use std::io::{BufRead, BufReader, Read};

/// Blocking counterpart of [`MessageStream`](super::MessageStream): each call to
/// `next()` parks the thread until the next line arrives.
pub struct BlockingMessageStream {
    reader: Option<BufReader<Box<dyn Read + Send>>>,
}

impl BlockingMessageStream {
    /// Decode a body whose HTTP status was already checked.
    pub fn new(body: Box<dyn Read + Send>) -> Self {
        Self {
            reader: Some(BufReader::new(body)),
        }
    }
}

impl Iterator for BlockingMessageStream {
    type Item = Result<StreamMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = match reader.read_until(b'\n', &mut line) {
                Ok(n) => n,
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            };
            if read == 0 {
                self.reader = None;
                return None;
            }

            match decode_line(&line) {
                Ok(Some(message)) => return Some(Ok(message)),
                Ok(None) => continue,
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e));
                }
            }
        }
    }
}
