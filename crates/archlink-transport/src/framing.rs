//! Splitting outgoing messages into slices and reassembling incoming ones.
//!
//! A logical text message may travel as several physical frames. On the
//! way out, [`split_message`] cuts the encoded bytes into ordered slices of
//! at most `chunk_size` bytes and marks the last one final. On the way in,
//! [`FrameAssembler`] buffers fragments until the final one arrives and only
//! then hands the whole message to the caller.
//!
//! ```text
//! "[{\"cmd\":...}]"  ──split──►  [s0][s1][s2 final]  ──wire──►  assembler  ──►  "[{\"cmd\":...}]"
//! ```

use std::num::NonZeroUsize;

use crate::TransportError;

/// One physical piece of a logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice<'a> {
    /// The bytes carried by this slice.
    pub data: &'a [u8],
    /// `true` for the last slice of the message.
    pub is_final: bool,
}

/// Splits `message` into ordered slices of at most `chunk_size` bytes.
///
/// An empty message still produces one (empty) final slice, so the peer
/// always observes an end-of-message marker.
pub fn split_message(message: &[u8], chunk_size: NonZeroUsize) -> Slices<'_> {
    Slices {
        rest: message,
        chunk_size: chunk_size.get(),
        done: false,
    }
}

/// Iterator returned by [`split_message`].
#[derive(Debug, Clone)]
pub struct Slices<'a> {
    rest: &'a [u8],
    chunk_size: usize,
    done: bool,
}

impl<'a> Iterator for Slices<'a> {
    type Item = Slice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.rest.len() <= self.chunk_size {
            self.done = true;
            return Some(Slice {
                data: self.rest,
                is_final: true,
            });
        }
        let (head, tail) = self.rest.split_at(self.chunk_size);
        self.rest = tail;
        Some(Slice {
            data: head,
            is_final: false,
        })
    }
}

/// Reassembles fragments into complete text messages.
///
/// The buffer is created lazily on the first fragment of a message and
/// handed off (not copied) when the final fragment arrives.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_message_size: usize,
    /// Set while skipping the remaining fragments of an oversized message.
    discarding: bool,
}

impl FrameAssembler {
    /// Creates an assembler that rejects messages larger than
    /// `max_message_size` bytes.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_message_size,
            discarding: false,
        }
    }

    /// Appends a fragment.
    ///
    /// Returns `Ok(Some(message))` when `is_final` completes a message,
    /// `Ok(None)` while more fragments are expected.
    ///
    /// # Errors
    /// - [`TransportError::MessageTooLarge`] once the message outgrows the
    ///   limit. The rest of that message is skipped; the next message
    ///   starts clean.
    /// - [`TransportError::InvalidUtf8`] if the completed bytes are not
    ///   valid UTF-8.
    pub fn push(
        &mut self,
        fragment: &[u8],
        is_final: bool,
    ) -> Result<Option<String>, TransportError> {
        if self.discarding {
            if is_final {
                self.discarding = false;
            }
            return Ok(None);
        }

        let size = self.buffer.len() + fragment.len();
        if size > self.max_message_size {
            self.buffer = Vec::new();
            self.discarding = !is_final;
            return Err(TransportError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }

        self.buffer.extend_from_slice(fragment);
        if !is_final {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.buffer);
        String::from_utf8(bytes)
            .map(Some)
            .map_err(TransportError::InvalidUtf8)
    }

    /// Number of bytes buffered for the message in progress.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
