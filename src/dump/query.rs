//! `/name[index]` path queries over the sorted region list

use std::io::Write;

use crate::rom::{RangeValidator, RomClass, SlotType};

use super::linear::field_line;
use super::regions::{gather, Region};
use super::Error;

/// One parsed `/name[index]` path segment; a missing index means the first
/// occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
struct QuerySegment {
    name: String,
    index: u32,
}

/// Run a batch of path queries against the record
///
/// Each query independently prints either its matched field or section, or a
/// diagnostic; one malformed or unmatched query never affects its siblings.
pub fn query<R, W>(
    class: &RomClass<'_>,
    base_address: u64,
    queries: &[&str],
    validator: &R,
    out: &mut W,
) -> Result<(), Error>
where
    R: RangeValidator,
    W: Write,
{
    let regions = gather(class, validator)?;
    for text in queries {
        match parse(text) {
            Some(segments) => run_one(class, base_address, &regions, text, &segments, out)?,
            None => writeln!(out, "Syntax error in query \"{}\"", text)?,
        }
    }
    Ok(())
}

/// Comma-batch convenience form: one string, split on commas into
/// independent queries (an empty piece is a deliberate syntax error for that
/// piece alone).
pub fn query_batch<R, W>(
    class: &RomClass<'_>,
    base_address: u64,
    batch: &str,
    validator: &R,
    out: &mut W,
) -> Result<(), Error>
where
    R: RangeValidator,
    W: Write,
{
    let queries: Vec<&str> = batch.split(',').collect();
    query(class, base_address, &queries, validator, out)
}

/// Parse a query string, or `None` on any grammar violation
fn parse(text: &str) -> Option<Vec<QuerySegment>> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'/') {
        return None;
    }
    // "/" alone is the trivial empty query
    if bytes.len() == 1 {
        return Some(Vec::new());
    }
    let mut segments = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] != b'/' {
            return None;
        }
        position += 1;
        let name_start = position;
        while position < bytes.len() && bytes[position].is_ascii_alphanumeric() {
            position += 1;
        }
        if position == name_start {
            return None;
        }
        let name = text[name_start..position].to_string();
        let mut index = 0;
        if position < bytes.len() && bytes[position] == b'[' {
            position += 1;
            let digits_start = position;
            while position < bytes.len() && bytes[position].is_ascii_digit() {
                position += 1;
            }
            if position == digits_start || position >= bytes.len() || bytes[position] != b']' {
                return None;
            }
            index = text[digits_start..position].parse().ok()?;
            position += 1;
        }
        segments.push(QuerySegment { name, index });
    }
    Some(segments)
}

/// Walk the region list in lockstep with the segment chain
///
/// A segment only matches regions sitting at a nesting depth equal to its
/// position in the chain; running into the end of the section the previous
/// segment matched means no deeper match exists and aborts the query. After
/// the last segment matches, the scan switches to printing and finishes when
/// the matched field (or the whole matched section) has been printed.
fn run_one<W: Write>(
    class: &RomClass<'_>,
    base_address: u64,
    regions: &[Region],
    text: &str,
    segments: &[QuerySegment],
    out: &mut W,
) -> Result<(), Error> {
    let mut nesting = 0u32;
    let mut position = 0usize;
    let mut seen = 0u32;
    let mut printing = false;
    let mut matched = false;

    'scan: for region in regions {
        if printing {
            match region.slot_type {
                SlotType::SectionStart => {
                    writeln!(out, "=== Section Start: {} ===", region.name)?;
                    nesting += 1;
                }
                SlotType::SectionEnd => {
                    writeln!(out, "=== Section End: {} ===", region.name)?;
                    nesting = nesting.saturating_sub(1);
                    if nesting == 0 {
                        matched = true;
                        break 'scan;
                    }
                }
                _ => {
                    writeln!(out, "{}", field_line(class, base_address, region))?;
                    if nesting == 0 {
                        matched = true;
                        break 'scan;
                    }
                }
            }
            continue;
        }

        if !segments.is_empty() && nesting as usize == position {
            if region.slot_type != SlotType::SectionEnd && region.name == segments[position].name {
                if seen == segments[position].index {
                    position += 1;
                    seen = 0;
                    if position == segments.len() {
                        // print the matched region itself, then whatever it
                        // contains
                        printing = true;
                        nesting = 0;
                        match region.slot_type {
                            SlotType::SectionStart => {
                                writeln!(out, "=== Section Start: {} ===", region.name)?;
                                nesting = 1;
                            }
                            _ => {
                                writeln!(out, "{}", field_line(class, base_address, region))?;
                                matched = true;
                                break 'scan;
                            }
                        }
                    } else {
                        // a matched section-start still opens a level
                        if region.slot_type == SlotType::SectionStart {
                            nesting += 1;
                        }
                    }
                    continue;
                }
                seen += 1;
            } else if region.slot_type == SlotType::SectionEnd
                && position > 0
                && region.name == segments[position - 1].name
            {
                // left the section the previous segment matched
                break 'scan;
            }
        }
        match region.slot_type {
            SlotType::SectionStart => nesting += 1,
            SlotType::SectionEnd => nesting = nesting.saturating_sub(1),
            _ => {}
        }
    }

    if !matched {
        writeln!(out, "Query \"{}\" matched nothing", text)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rom::builder::{MethodBuilder, RomClassBuilder};

    fn segments(text: &str) -> Option<Vec<(String, u32)>> {
        parse(text).map(|parsed| {
            parsed
                .into_iter()
                .map(|segment| (segment.name, segment.index))
                .collect()
        })
    }

    #[test]
    fn grammar_accepts_paths_with_indexes() {
        assert_eq!(
            segments("/methods[0]/name"),
            Some(vec![("methods".to_string(), 0), ("name".to_string(), 0)])
        );
        assert_eq!(segments("/romSize"), Some(vec![("romSize".to_string(), 0)]));
        assert_eq!(segments("/"), Some(Vec::new()));
    }

    #[test]
    fn grammar_rejects_malformed_paths() {
        assert_eq!(parse("methods[0]/name"), None);
        assert_eq!(parse("/methods[-1]"), None);
        assert_eq!(parse("/methods["), None);
        assert_eq!(parse("/methods[]"), None);
        assert_eq!(parse("//name"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("/me-thods"), None);
    }

    fn run_queries(bytes: &[u8], batch: &str) -> String {
        let class = RomClass::new(bytes).unwrap();
        let mut out = Vec::new();
        query_batch(&class, 0, batch, &(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_field_query_prints_one_line() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let text = run_queries(&bytes, "/romMethodCount");
        assert!(text.contains("romMethodCount"), "{}", text);
        assert!(text.contains("0x00000001"), "{}", text);
        assert!(!text.contains("matched nothing"), "{}", text);
        assert_eq!(text.lines().count(), 1, "{}", text);
    }

    #[test]
    fn missing_field_reports_no_match() {
        let bytes = RomClassBuilder::new("com/example/Foo").build();
        let text = run_queries(&bytes, "/nonexistentField");
        assert!(text.contains("matched nothing"), "{}", text);
    }

    #[test]
    fn section_query_prints_the_whole_section() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let text = run_queries(&bytes, "/methods/method[0]");
        assert!(text.contains("=== Section Start: method ==="), "{}", text);
        assert!(text.contains("=== Section End: method ==="), "{}", text);
        assert!(text.contains("(\"foo\")"), "{}", text);
        assert!(!text.contains("matched nothing"), "{}", text);
    }

    #[test]
    fn batch_reports_each_query_independently() {
        let bytes = RomClassBuilder::new("com/example/Foo").build();
        let text = run_queries(&bytes, "/romSize,bogus,/nope");
        assert!(text.contains("romSize"), "{}", text);
        assert!(text.contains("Syntax error in query \"bogus\""), "{}", text);
        assert!(text.contains("Query \"/nope\" matched nothing"), "{}", text);
    }
}
