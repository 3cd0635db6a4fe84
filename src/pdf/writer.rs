//! Minimal serializer: header, body, classic xref table and trailer

use std::io::{self, Write};

use log::debug;

use super::{Dictionary, Document, Object, Stream};
use crate::error::{PDFSecurityError, PDFSecurityResult};

/// Offset and generation of an in-use object; `None` is the free-list head
type XRefEntry = (u32, Option<(usize, u16)>);

/// Counts bytes written so xref offsets can be recorded
struct CountingWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Document {
    /// Serialize the document to a byte vector
    pub fn save(&self) -> PDFSecurityResult<Vec<u8>> {
        let mut out = Vec::new();
        self.save_to(&mut out)?;
        Ok(out)
    }

    /// Serialize the document.
    ///
    /// Strings are written as hex strings so encrypted bytes need no escaping, and each
    /// stream's /Length is taken from its payload.
    pub fn save_to<W: Write>(&self, target: W) -> PDFSecurityResult<()> {
        // object 0 heads the free list
        if let Some((&(0, _), _)) = self.objects().next() {
            return Err(PDFSecurityError::InvalidObjectNumber(0));
        }
        let size = self
            .max_id()
            .checked_add(1)
            .ok_or(PDFSecurityError::InvalidObjectNumber(self.max_id()))?;

        let mut out = CountingWriter {
            inner: target,
            written: 0,
        };

        writeln!(out, "%PDF-{}.{}", self.version.0, self.version.1)?;
        out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        let mut entries: Vec<XRefEntry> = Vec::with_capacity(self.len() + 1);
        entries.push((0, None));
        for (&(number, generation), object) in self.objects() {
            entries.push((number, Some((out.written, generation))));
            writeln!(out, "{} {} obj", number, generation)?;
            write_object(&mut out, object)?;
            out.write_all(b"\nendobj\n")?;
        }

        let xref_offset = out.written;
        out.write_all(b"xref\n")?;
        write_xref_sections(&mut out, &entries)?;

        let mut trailer = self.trailer.clone();
        trailer.set("Size", i64::from(size));
        out.write_all(b"trailer\n")?;
        write_dictionary(&mut out, &trailer)?;
        write!(out, "\nstartxref\n{}\n%%EOF\n", xref_offset)?;
        out.flush()?;

        debug!("Serialized {} objects, {} bytes", self.len(), out.written);
        Ok(())
    }
}

/// One subsection per run of consecutive object numbers, so gaps cost nothing
fn write_xref_sections<W: Write>(out: &mut W, entries: &[XRefEntry]) -> io::Result<()> {
    let mut start = 0;
    while start < entries.len() {
        let mut end = start + 1;
        while end < entries.len() && entries[end - 1].0.checked_add(1) == Some(entries[end].0) {
            end += 1;
        }

        writeln!(out, "{} {}", entries[start].0, end - start)?;
        for (_, entry) in &entries[start..end] {
            match entry {
                Some((offset, generation)) => {
                    write!(out, "{:010} {:05} n\r\n", offset, generation)?
                }
                None => out.write_all(b"0000000000 65535 f\r\n")?,
            }
        }
        start = end;
    }
    Ok(())
}

fn write_object<W: Write>(out: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(b) => write!(out, "{}", b),
        Object::Integer(n) => write!(out, "{}", n),
        Object::Real(n) => write!(out, "{}", n),
        Object::String(bytes) => {
            out.write_all(b"<")?;
            out.write_all(hex::encode_upper(bytes).as_bytes())?;
            out.write_all(b">")
        }
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(out, item)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => write_stream(out, stream),
        Object::Reference((number, generation)) => write!(out, "{} {} R", number, generation),
    }
}

fn write_name<W: Write>(out: &mut W, name: &str) -> io::Result<()> {
    out.write_all(b"/")?;
    for &byte in name.as_bytes() {
        let regular = byte.is_ascii_graphic()
            && !matches!(
                byte,
                b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
            );
        if regular {
            out.write_all(&[byte])?;
        } else {
            write!(out, "#{:02X}", byte)?;
        }
    }
    Ok(())
}

fn write_dictionary<W: Write>(out: &mut W, dict: &Dictionary) -> io::Result<()> {
    out.write_all(b"<<")?;
    for (key, value) in dict {
        write_name(out, key)?;
        out.write_all(b" ")?;
        write_object(out, value)?;
    }
    out.write_all(b">>")
}

fn write_stream<W: Write>(out: &mut W, stream: &Stream) -> io::Result<()> {
    let mut dict = stream.dict.clone();
    dict.set("Length", stream.content.len() as i64);
    write_dictionary(out, &dict)?;
    out.write_all(b"\nstream\n")?;
    out.write_all(&stream.content)?;
    out.write_all(b"\nendstream")
}
