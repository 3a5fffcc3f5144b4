//! Split one byte stream into two independent readers.
//!
//! # Design Decisions
//! - A dedicated task pumps the source into two unbounded queues, so a slow
//!   branch never stalls the other
//! - A dropped branch is skipped; the pump stops once both are gone
//! - Source errors are delivered to both branches and end the stream

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::storage::object::ByteStream;

type Item = Result<Bytes, io::Error>;

/// One reader of a teed stream.
#[derive(Debug)]
pub struct TeeBranch {
    rx: mpsc::UnboundedReceiver<Item>,
}

impl Stream for TeeBranch {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        self.rx.poll_recv(cx)
    }
}

impl TeeBranch {
    pub fn boxed(self) -> ByteStream {
        StreamExt::boxed(self)
    }
}

/// Fan `source` out into two branches that each see every chunk.
///
/// Must be called inside a tokio runtime.
pub fn tee(mut source: ByteStream) -> (TeeBranch, TeeBranch) {
    let (left_tx, left_rx) = mpsc::unbounded_channel();
    let (right_tx, right_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut left = Some(left_tx);
        let mut right = Some(right_tx);

        while left.is_some() || right.is_some() {
            let Some(item) = source.next().await else {
                break;
            };
            let failed = item.is_err();

            let (for_left, for_right) = match item {
                Ok(chunk) => (Ok(chunk.clone()), Ok(chunk)),
                Err(e) => (Err(io::Error::new(e.kind(), e.to_string())), Err(e)),
            };
            if left.as_ref().is_some_and(|tx| tx.send(for_left).is_err()) {
                left = None;
            }
            if right.as_ref().is_some_and(|tx| tx.send(for_right).is_err()) {
                right = None;
            }

            if failed {
                break;
            }
        }
    });

    (TeeBranch { rx: left_rx }, TeeBranch { rx: right_rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn source(chunks: &[&'static str]) -> ByteStream {
        let items: Vec<Item> = chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        stream::iter(items).boxed()
    }

    async fn drain(branch: TeeBranch) -> Vec<u8> {
        let mut out = Vec::new();
        let mut branch = branch;
        while let Some(chunk) = branch.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_both_branches_see_identical_bytes() {
        let (a, b) = tee(source(&["hello ", "edge ", "world"]));
        let (a, b) = tokio::join!(drain(a), drain(b));
        assert_eq!(a, b"hello edge world");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dropped_branch_does_not_stall_the_other() {
        let (a, b) = tee(source(&["one", "two", "three"]));
        drop(b);
        assert_eq!(drain(a).await, b"onetwothree");
    }

    #[tokio::test]
    async fn test_slow_branch_is_independent() {
        let (a, b) = tee(source(&["x"; 64]));
        // Read one branch to completion before touching the other.
        assert_eq!(drain(a).await.len(), 64);
        assert_eq!(drain(b).await.len(), 64);
    }

    #[tokio::test]
    async fn test_error_reaches_both_branches() {
        let items: Vec<Item> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "backend reset")),
            Ok(Bytes::from_static(b"never")),
        ];
        let (mut a, mut b) = tee(stream::iter(items).boxed());
        for branch in [&mut a, &mut b] {
            assert!(branch.next().await.unwrap().is_ok());
            let err = branch.next().await.unwrap().unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
            assert!(branch.next().await.is_none());
        }
    }
}
