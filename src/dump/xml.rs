//! Fully-expanded XML rendering of the region list

use std::io::Write;

use crate::rom::{escape_utf8, RangeValidator, RomClass, SlotType};

use super::regions::{gather, Region};
use super::Error;

/// Render the record as a well-formed XML document
///
/// Unlike the linear dump there is no threshold and no gap detection: every
/// region appears, sections as `<section name="...">` elements and slots as
/// one element each whose tag is the slot's type name.
pub fn xml<R, W>(class: &RomClass<'_>, validator: &R, out: &mut W) -> Result<(), Error>
where
    R: RangeValidator,
    W: Write,
{
    let regions = gather(class, validator)?;
    let mut nesting = 0u32;
    writeln!(out, "<romClass>")?;
    for region in &regions {
        match region.slot_type {
            SlotType::SectionStart => {
                indent(out, nesting + 1)?;
                writeln!(out, "<section name=\"{}\">", escape_xml(region.name))?;
                nesting += 1;
            }
            SlotType::SectionEnd => {
                nesting = nesting.saturating_sub(1);
                indent(out, nesting + 1)?;
                writeln!(out, "</section>")?;
            }
            _ => {
                indent(out, nesting + 1)?;
                writeln!(
                    out,
                    "<{tag} name=\"{name}\">{value}</{tag}>",
                    tag = region.slot_type.name(),
                    name = escape_xml(region.name),
                    value = escape_xml(&xml_value(class, region)),
                )?;
            }
        }
    }
    writeln!(out, "</romClass>")?;
    Ok(())
}

fn indent<W: Write>(out: &mut W, depth: u32) -> Result<(), Error> {
    for _ in 0..depth {
        out.write_all(b"\t")?;
    }
    Ok(())
}

fn xml_value(class: &RomClass<'_>, region: &Region) -> String {
    match region.slot_type {
        // string payloads render escaped but without the quote decoration
        // the linear dump adds
        SlotType::Utf8 => match class.utf8_at(region.offset) {
            Some((payload, _)) => escape_utf8(payload, usize::MAX),
            None => String::new(),
        },
        _ => super::linear::slot_value(class, region),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rom::builder::{MethodBuilder, RomClassBuilder};

    fn xml_to_string(bytes: &[u8]) -> String {
        let class = RomClass::new(bytes).unwrap();
        let mut out = Vec::new();
        xml(&class, &(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn document_is_rooted_and_balanced() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let text = xml_to_string(&bytes);
        assert!(text.starts_with("<romClass>\n"));
        assert!(text.ends_with("</romClass>\n"));
        let opens = text.matches("<section ").count();
        let closes = text.matches("</section>").count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn slot_tags_use_type_names() {
        let bytes = RomClassBuilder::new("com/example/Foo").build();
        let text = xml_to_string(&bytes);
        assert!(text.contains("<U_32 name=\"romSize\">"), "{}", text);
        assert!(text.contains("<SRP_TO_UTF8 name=\"className\">"), "{}", text);
        assert!(text.contains("<UTF8 name=\"className\">com/example/Foo</UTF8>"), "{}", text);
    }

    #[test]
    fn attribute_values_are_xml_escaped() {
        assert_eq!(escape_xml("a<b&c\"d"), "a&lt;b&amp;c&quot;d");
    }
}
