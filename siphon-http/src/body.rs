//! Body accumulation under a byte budget, and transport decompression.

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use futures::{Stream, StreamExt};
use siphon_common::{Result, ScrapeError, SizeLimit};
use std::io::Read;

/// Drain `stream` into memory, failing as soon as the running total passes `max`.
///
/// The offending chunk is counted but never appended, so at most
/// `max + one chunk` bytes are pulled from the transport.
pub async fn read_bounded<S, B>(stream: S, max: usize) -> Result<Vec<u8>>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buf = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        total = total.saturating_add(chunk.len());
        if total > max {
            tracing::warn!(max, read = total, "http.body.limit_exceeded");
            return Err(ScrapeError::ContentTooLarge(SizeLimit::Streamed { max }));
        }
        buf.extend_from_slice(chunk);
    }

    Ok(buf)
}

/// Undo the `Content-Encoding` the server applied.
///
/// Codings are removed in reverse order of application. Unknown codings leave
/// the bytes untouched. Inflated output is held to the same `max` as the wire
/// body.
pub fn decode_transport(
    body: Vec<u8>,
    content_encoding: Option<&str>,
    max: usize,
) -> Result<Vec<u8>> {
    let Some(header) = content_encoding else {
        return Ok(body);
    };

    let mut current = body;
    for coding in header.rsplit(',').map(|c| c.trim().to_ascii_lowercase()) {
        if current.is_empty() {
            break;
        }
        current = match coding.as_str() {
            "gzip" | "x-gzip" => inflate(MultiGzDecoder::new(current.as_slice()), "gzip", max)?,
            "deflate" => match inflate(ZlibDecoder::new(current.as_slice()), "deflate", max) {
                // Some servers send raw deflate without the zlib wrapper.
                Err(ScrapeError::DecompressionFailed { .. }) => {
                    inflate(DeflateDecoder::new(current.as_slice()), "deflate", max)?
                }
                other => other?,
            },
            "" | "identity" => current,
            other => {
                tracing::warn!(coding = %other, "http.body.unsupported_encoding");
                current
            }
        };
    }

    Ok(current)
}

fn inflate<R: Read>(decoder: R, encoding: &str, max: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decoder
        .take(max as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| ScrapeError::DecompressionFailed {
            encoding: encoding.to_string(),
            cause: e.to_string(),
        })?;
    if out.len() > max {
        return Err(ScrapeError::ContentTooLarge(SizeLimit::Streamed { max }));
    }
    Ok(out)
}
