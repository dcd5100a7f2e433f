use std::io::{self, Write};

use crate::models::TextAnnotation;

/// Writes `Text:` followed by each description on its own line, unmodified.
pub fn write_texts<W: Write>(out: &mut W, texts: &[TextAnnotation]) -> io::Result<()> {
    writeln!(out, "Text:")?;
    for text in texts {
        writeln!(out, "{}", text.description)?;
    }
    out.flush()
}
