//! Attribute composer: turns parsed operations into attribute changes and
//! literal writes on a sink.

use super::parser::{parse_with, FormatOp, MarkerTable};
use crate::error::{Result, TermError};
use crate::style::Attributes;
use std::{fmt, io};

/// Anything that accepts attribute changes and literal text.
///
/// [`Window`](crate::Window) implements this by enqueueing attribute-set
/// and append-text commands.
pub trait AttributeSink {
    /// Apply `attributes` to subsequent text.
    fn set_attributes(&mut self, attributes: Attributes) -> Result<()>;

    /// Write a literal run, returning the number of bytes written.
    fn write_text(&mut self, text: &str) -> Result<usize>;
}

impl<S: AttributeSink + ?Sized> AttributeSink for &mut S {
    fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
        (**self).set_attributes(attributes)
    }

    fn write_text(&mut self, text: &str) -> Result<usize> {
        (**self).write_text(text)
    }
}

/// Replay `ops` onto `sink`.
///
/// The running mask starts at [`Attributes::NORMAL`]. An attribute change is
/// issued only before a literal write that needs it, and once more at the end
/// if the final mask differs from the last one issued. Stops at the first
/// sink error. Returns the total number of text bytes written.
pub fn compose<S: AttributeSink + ?Sized>(sink: &mut S, ops: &[FormatOp]) -> Result<usize> {
    let mut mask = Attributes::NORMAL;
    let mut issued = Attributes::NORMAL;
    let mut total = 0;

    for op in ops {
        match op {
            FormatOp::Toggle(toggle) => mask.set(toggle.attribute, toggle.add),
            FormatOp::Text(text) if text.is_empty() => {}
            FormatOp::Text(text) => {
                if mask != issued {
                    sink.set_attributes(mask)?;
                    issued = mask;
                }
                total += sink.write_text(text)?;
            }
        }
    }

    if mask != issued {
        sink.set_attributes(mask)?;
    }
    Ok(total)
}

/// A writer that interprets inline format markers.
///
/// ```rust,ignore
/// use std::io::Write;
///
/// let mut out = window.format_writer();
/// write!(out, "This is *{}* and __escaped__", "bold")?;
/// ```
///
/// Every `write` call is parsed on its own, so a marker pair must not be
/// split across calls. `write!` is safe: the whole message is formatted
/// before parsing.
#[derive(Debug)]
pub struct FormatWriter<S> {
    sink: S,
    markers: MarkerTable,
    written: usize,
}

impl<S: AttributeSink> FormatWriter<S> {
    /// Wrap `sink` using the default marker table.
    pub fn new(sink: S) -> Self {
        Self::with_markers(sink, MarkerTable::default())
    }

    /// Wrap `sink` using a custom marker table.
    pub const fn with_markers(sink: S, markers: MarkerTable) -> Self {
        Self {
            sink,
            markers,
            written: 0,
        }
    }

    /// Parse and render `text`, returning the number of text bytes written.
    pub fn print(&mut self, text: &str) -> Result<usize> {
        let ops = parse_with(text, &self.markers);
        let n = compose(&mut self.sink, &ops)?;
        self.written += n;
        Ok(n)
    }

    /// Total text bytes written so far.
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Borrow the sink.
    pub const fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: AttributeSink> io::Write for FormatWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.print(text)?;
        Ok(buf.len())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let text = args.to_string();
        self.print(&text)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: AttributeSink> fmt::Write for FormatWriter<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s).map(|_| ()).map_err(|_: TermError| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parser::parse;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Attr(Attributes),
        Text(String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        fail_after: Option<usize>,
    }

    impl Recorder {
        fn plain(&self) -> String {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Text(t) => Some(t.as_str()),
                    Event::Attr(_) => None,
                })
                .collect()
        }
    }

    impl AttributeSink for Recorder {
        fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
            self.events.push(Event::Attr(attributes));
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<usize> {
            let writes = self.events.iter().filter(|e| matches!(e, Event::Text(_))).count();
            if self.fail_after == Some(writes) {
                return Err(TermError::NotInitialized);
            }
            self.events.push(Event::Text(text.to_string()));
            Ok(text.len())
        }
    }

    #[test]
    fn test_plain_text_issues_no_attributes() {
        let mut sink = Recorder::default();
        let n = compose(&mut sink, &parse("hello")).unwrap();
        assert_eq!(n, 5);
        assert_eq!(sink.events, vec![Event::Text("hello".into())]);
    }

    #[test]
    fn test_bold_run() {
        let mut sink = Recorder::default();
        compose(&mut sink, &parse("a *b* c")).unwrap();
        assert_eq!(
            sink.events,
            vec![
                Event::Text("a ".into()),
                Event::Attr(Attributes::BOLD),
                Event::Text("b".into()),
                Event::Attr(Attributes::NORMAL),
                Event::Text(" c".into()),
            ]
        );
    }

    #[test]
    fn test_nested_markers_use_union() {
        let mut sink = Recorder::default();
        let n = compose(&mut sink, &parse("~*-both-*~")).unwrap();
        assert_eq!(n, 4);
        assert_eq!(
            sink.events,
            vec![
                Event::Attr(Attributes::REVERSE | Attributes::BOLD | Attributes::ITALIC),
                Event::Text("both".into()),
                Event::Attr(Attributes::NORMAL),
            ]
        );
    }

    #[test]
    fn test_unclosed_marker_leaves_final_state() {
        let mut sink = Recorder::default();
        compose(&mut sink, &parse("x_")).unwrap();
        assert_eq!(
            sink.events,
            vec![Event::Text("x".into()), Event::Attr(Attributes::UNDERLINE)]
        );
    }

    #[test]
    fn test_first_error_aborts() {
        let mut sink = Recorder {
            fail_after: Some(1),
            ..Recorder::default()
        };
        let err = compose(&mut sink, &parse("one *two* three")).unwrap_err();
        assert!(matches!(err, TermError::NotInitialized));
        assert_eq!(sink.plain(), "one ");
    }

    #[test]
    fn test_format_writer_end_to_end() {
        let mut out = FormatWriter::new(Recorder::default());
        write!(
            out,
            "This is *{}*, -{}-, _{}_, ~{}~, ~*-{}-*~ and __{}__",
            "bold", "italic", "underlined", "reversed", "bold, italic and reversed", "escaped"
        )
        .unwrap();
        assert_eq!(
            out.get_ref().plain(),
            "This is bold, italic, underlined, reversed, bold, italic and reversed and _escaped_"
        );
        assert_eq!(out.written(), out.get_ref().plain().len());
        assert_eq!(out.get_ref().events.last(), Some(&Event::Text(" and _escaped_".into())));
    }

    #[test]
    fn test_format_writer_rejects_invalid_utf8() {
        let mut out = FormatWriter::new(Recorder::default());
        let err = out.write(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
