//! Request body type for [`HyperTransport`](super::HyperTransport).

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::config::ProgressFn;

pin_project! {
    /// A request body that is either empty or fully buffered.
    ///
    /// A full body reports upload progress as its bytes are handed to the
    /// connection.
    #[project = RequestBodyProj]
    pub enum RequestBody {
        Empty,
        Full {
            data: Option<Bytes>,
            total: u64,
            progress: Option<ProgressFn>,
        },
    }
}

impl RequestBody {
    pub fn empty() -> Self {
        RequestBody::Empty
    }

    pub fn full(data: Bytes) -> Self {
        RequestBody::Full {
            total: data.len() as u64,
            data: Some(data),
            progress: None,
        }
    }

    /// Report written bytes to `callback`. An empty body never reports.
    pub fn with_upload_progress(mut self, callback: Option<ProgressFn>) -> Self {
        if let RequestBody::Full { progress, .. } = &mut self {
            *progress = callback;
        }
        self
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Full {
                data,
                total,
                progress,
            } => f
                .debug_struct("Full")
                .field("data", data)
                .field("total", total)
                .field("progress", &progress.is_some())
                .finish(),
        }
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            RequestBodyProj::Empty => Poll::Ready(None),
            RequestBodyProj::Full {
                data,
                total,
                progress,
            } => {
                let chunk = data.take();
                if let (Some(chunk), Some(progress)) = (&chunk, progress.as_ref()) {
                    progress(chunk.len() as u64, Some(*total));
                }
                Poll::Ready(chunk.map(|d| Ok(Frame::data(d))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Full { data, .. } => data.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            RequestBody::Empty | RequestBody::Full { data: None, .. } => SizeHint::with_exact(0),
            RequestBody::Full { data: Some(d), .. } => SizeHint::with_exact(d.len() as u64),
        }
    }
}
