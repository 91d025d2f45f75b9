use std::fmt;
use std::io;
use std::sync::Arc;

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

/// Redacts credentials from formatted log lines
#[derive(Clone)]
pub struct SecretScrubber {
    api_key_pattern: Regex,
    header_pattern: Regex,
    field_pattern: Regex,
    bearer_pattern: Regex,
}

impl SecretScrubber {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // Anthropic API keys: sk-ant-api03-...
            api_key_pattern: Regex::new(r"sk-ant-[a-zA-Z0-9\-_]{8,}")?,
            // x-api-key header values as printed by request debug output
            header_pattern: Regex::new(r#"(?i)(x-api-key["']?\s*[:=]\s*["']?)[^"'\s,}]+"#)?,
            // api_key / token / secret fields in key-value or JSON form
            field_pattern: Regex::new(
                r#"(?i)(["']?(?:api_key|apikey|token|secret|password)["']?\s*[:=]\s*["']?)[^"'\s,}]+"#,
            )?,
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+")?,
        })
    }

    /// Scrub a message of sensitive data
    pub fn scrub(&self, message: &str) -> String {
        let scrubbed = self.api_key_pattern.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self.header_pattern.replace_all(&scrubbed, "${1}[REDACTED]");
        self.field_pattern
            .replace_all(&scrubbed, "${1}[REDACTED]")
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

/// `MakeWriter` that scrubs every formatted event before it reaches `inner`
pub struct ScrubbingMakeWriter<M> {
    inner: M,
    scrubber: Arc<SecretScrubber>,
}

impl<M> ScrubbingMakeWriter<M> {
    pub fn new(inner: M, scrubber: Arc<SecretScrubber>) -> Self {
        Self { inner, scrubber }
    }
}

impl<'a, M> MakeWriter<'a> for ScrubbingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
            scrubber: Arc::clone(&self.scrubber),
        }
    }
}

pub struct ScrubbingWriter<W> {
    inner: W,
    scrubber: Arc<SecretScrubber>,
}

impl<W: io::Write> io::Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The fmt layer hands over one fully formatted event per write.
        let line = String::from_utf8_lossy(buf);
        self.inner.write_all(self.scrubber.scrub(&line).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
