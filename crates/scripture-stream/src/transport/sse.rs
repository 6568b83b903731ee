/// Incremental UTF-8 decoder.
///
/// Bytes of a character split across two chunks are held back until the rest
/// arrives. Invalid sequences decode to U+FFFD instead of failing.
#[derive(Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Decodes as much of `pending + chunk` as forms complete characters.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let keep = rest.len();
        let consumed = self.pending.len() - keep;
        self.pending.drain(..consumed);
        out
    }

    /// Flushes an incomplete trailing sequence as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// One server-sent event message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Payloads of the frame's `data:` lines, in order, one per line.
    pub data: Vec<String>,
}

/// Splits a decoded byte stream into SSE frames.
///
/// Keeps a single text buffer; complete frames are removed from its front and
/// a trailing partial frame stays buffered for the next chunk.
#[derive(Default)]
pub struct SseDecoder {
    utf8: Utf8StreamDecoder,
    buf: String,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let text = self.utf8.decode(chunk);
        self.buf.push_str(&text);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame = parse_sse_frame(&self.buf[..idx]);
            self.buf.drain(..idx + delim_len);
            if let Some(frame) = frame {
                frames.push(frame);
            }
        }
        frames
    }

    /// Ends the stream and returns the byte length of any unterminated
    /// trailing fragment, which is discarded.
    pub fn finish(&mut self) -> usize {
        self.buf.push_str(&self.utf8.finish());
        let leftover = self.buf.trim().len();
        self.buf.clear();
        leftover
    }
}

/// Earliest blank-line boundary in `buf` as `(offset, delimiter_len)`.
fn find_frame_delimiter(buf: &str) -> Option<(usize, usize)> {
    let lf = buf.find("\n\n").map(|idx| (idx, 2));
    let crlf = buf.find("\r\n\r\n").map(|idx| (idx, 4));
    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(lf.min(crlf)),
        (lf, crlf) => lf.or(crlf),
    }
}

fn parse_sse_frame(text: &str) -> Option<SseFrame> {
    let data: Vec<String> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data: "))
        .map(ToOwned::to_owned)
        .collect();
    if data.is_empty() {
        return None;
    }
    Some(SseFrame { data })
}
