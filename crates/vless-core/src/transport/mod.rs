//! Transport adapters.
//!
//! A session only needs a duplex *message* channel: a `Stream` of inbound
//! frames plus a `Sink` for outbound frames. [`MessageChannel`] names that
//! shape and [`WsChannel`] provides it on top of a WebSocket.

mod ws;

pub use ws::WsChannel;

use std::io;

use bytes::Bytes;
use futures_util::{Sink, Stream};

/// A duplex message channel carrying opaque binary frames.
///
/// End of stream means the peer closed the channel. Closing the sink closes
/// the channel from our side; closing twice is not an error.
pub trait MessageChannel:
    Stream<Item = io::Result<Bytes>> + Sink<Bytes, Error = io::Error> + Unpin + Send
{
}

impl<T> MessageChannel for T where
    T: Stream<Item = io::Result<Bytes>> + Sink<Bytes, Error = io::Error> + Unpin + Send
{
}
