//! PII redaction for log output.
//!
//! Values of denylisted `field=value` pairs are replaced before a line is
//! written. A value ends at the separator or end of line; a double-quoted
//! value (as `tracing` renders strings) ends at its closing quote.

use regex::{Captures, Regex};
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

pub const REDACTION: &str = "***";

pub const PII_FIELDS: [&str; 5] = ["name", "email", "phone", "ssn", "password"];

#[derive(Clone, Debug)]
pub struct Redactor {
    pattern: Option<Regex>,
    redaction: String,
}

impl Redactor {
    /// Compile a redactor for `fields`, where values end at `separator`.
    ///
    /// # Errors
    /// Returns an error if the generated pattern does not compile.
    pub fn new<S: AsRef<str>>(
        fields: &[S],
        redaction: &str,
        separator: &str,
    ) -> Result<Self, regex::Error> {
        let names: Vec<String> = fields
            .iter()
            .map(|field| field.as_ref().trim())
            .filter(|field| !field.is_empty())
            .map(regex::escape)
            .collect();

        let pattern = if names.is_empty() {
            None
        } else {
            let separator = regex::escape(separator);
            Some(Regex::new(&format!(
                r#"\b(?P<field>{})=(?:"(?:[^"\\]|\\.)*"|[^{separator}\n]*)"#,
                names.join("|")
            ))?)
        };

        Ok(Self {
            pattern,
            redaction: redaction.to_string(),
        })
    }

    /// Redactor for `tracing` output, where fields are space separated.
    ///
    /// # Errors
    /// Returns an error if the generated pattern does not compile.
    pub fn for_logs<S: AsRef<str>>(fields: &[S]) -> Result<Self, regex::Error> {
        Self::new(fields, REDACTION, " ")
    }

    #[must_use]
    pub fn redact(&self, message: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(message, |caps: &Captures| {
                    format!("{}={}", &caps["field"], self.redaction)
                })
                .into_owned(),
            None => message.to_string(),
        }
    }
}

/// Replace the values of `fields` in `message` with `redaction`.
///
/// # Errors
/// Returns an error if the generated pattern does not compile.
pub fn filter_datum<S: AsRef<str>>(
    fields: &[S],
    redaction: &str,
    message: &str,
    separator: &str,
) -> Result<String, regex::Error> {
    Ok(Redactor::new(fields, redaction, separator)?.redact(message))
}

/// `MakeWriter` that redacts every formatted event before the inner writer
/// sees it.
///
/// The fmt layer hands each event to the writer in one `write_all`, so
/// field/value pairs never straddle two writes.
#[derive(Clone, Debug)]
pub struct RedactingMakeWriter<M> {
    inner: M,
    redactor: Redactor,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, redactor: Redactor) -> Self {
        Self { inner, redactor }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            redactor: &self.redactor,
        }
    }
}

pub struct RedactingWriter<'a, W> {
    inner: W,
    redactor: &'a Redactor,
}

impl<W: Write> Write for RedactingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(self.redactor.redact(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::info;
    use tracing_subscriber::{fmt, layer::SubscriberExt, Registry};

    #[test]
    fn filter_datum_redacts_listed_fields() {
        let message =
            "name=egg;email=eggmin@eggsample.com;password=eggcellent;date_of_birth=12/12/1986;";
        let redacted =
            filter_datum(&["password", "date_of_birth"], "xxx", message, ";").unwrap();
        assert_eq!(
            redacted,
            "name=egg;email=eggmin@eggsample.com;password=xxx;date_of_birth=xxx;"
        );
    }

    #[test]
    fn filter_datum_keeps_unlisted_and_partial_names() {
        let message = "username=bob;name=Bob Smith;ssn=123-45-6789;ip=10.0.0.1;";
        let redacted = filter_datum(&PII_FIELDS, REDACTION, message, ";").unwrap();
        assert_eq!(redacted, "username=bob;name=***;ssn=***;ip=10.0.0.1;");
    }

    #[test]
    fn filter_datum_handles_quoted_values() {
        let message = r#"msg=hi email="a b@x.com" password="p\"w d" ok=1"#;
        let redacted = filter_datum(&["email", "password"], "***", message, " ").unwrap();
        assert_eq!(redacted, "msg=hi email=*** password=*** ok=1");
    }

    #[test]
    fn empty_denylist_passes_through() {
        let fields: [&str; 0] = [];
        let redactor = Redactor::new(&fields, REDACTION, ";").unwrap();
        assert_eq!(redactor.redact("email=a@x.com;"), "email=a@x.com;");
    }

    #[test]
    fn redaction_is_literal() {
        let redacted = filter_datum(&["ssn"], "$0", "ssn=1;", ";").unwrap();
        assert_eq!(redacted, "ssn=$0;");
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn redacting_writer_scrubs_events() {
        let buffer = Buffer::default();
        let redactor = Redactor::for_logs(&PII_FIELDS).unwrap();
        let writer = RedactingMakeWriter::new(buffer.clone(), redactor);
        let subscriber =
            Registry::default().with(fmt::layer().with_ansi(false).with_writer(writer));

        tracing::subscriber::with_default(subscriber, || {
            info!(email = "a@x.com", password = %"secret1", user_id = 7, "user registered");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("user registered"));
        assert!(output.contains("email=***"));
        assert!(output.contains("password=***"));
        assert!(output.contains("user_id=7"));
        assert!(!output.contains("a@x.com"));
        assert!(!output.contains("secret1"));
    }
}
