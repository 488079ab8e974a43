//! Human-readable linear dump with byte-exact gap accounting

use std::io::Write;

use crate::rom::{escape_utf8, RangeValidator, RomClass, SlotType};

use super::regions::{gather, Region};
use super::Error;

/// Most characters of a string payload shown on one line
const UTF8_PREVIEW: usize = 64;

/// Raw bytes shown for one suspected-padding gap
const PADDING_PREVIEW: u32 = 6;

/// Render the record as an annotated byte-range listing
///
/// Sections nested `threshold` levels deep or deeper collapse to one summary
/// line each. Every byte of the record is attributed to a region or reported
/// as a suspected-padding gap; the final line states whether the two together
/// covered the whole record, which is the tool's primary self-check.
pub fn linear<R, W>(
    class: &RomClass<'_>,
    base_address: u64,
    threshold: u32,
    validator: &R,
    out: &mut W,
) -> Result<(), Error>
where
    R: RangeValidator,
    W: Write,
{
    let regions = gather(class, validator)?;
    let mut last_offset = 0u32;
    let mut nesting = 0u32;
    let mut missing = 0u64;

    for region in &regions {
        match region.slot_type {
            SlotType::SectionStart => {
                report_gap(
                    class,
                    base_address,
                    validator,
                    last_offset,
                    region.offset,
                    nesting < threshold,
                    &mut missing,
                    out,
                )?;
                if nesting < threshold {
                    writeln!(out, "=== Section Start: {} ===", region.name)?;
                }
                nesting += 1;
                last_offset = last_offset.max(region.offset);
            }
            SlotType::SectionEnd => {
                nesting = nesting.saturating_sub(1);
                report_gap(
                    class,
                    base_address,
                    validator,
                    last_offset,
                    region.offset,
                    nesting < threshold,
                    &mut missing,
                    out,
                )?;
                if nesting < threshold {
                    writeln!(out, "=== Section End: {} ===", region.name)?;
                } else if nesting == threshold {
                    // the end marker's length recovers the collapsed
                    // section's start address
                    let start = base_address + u64::from(region.offset - region.length);
                    writeln!(out, "{:#010x}: {} section ({} bytes)", start, region.name, region.length)?;
                }
                last_offset = last_offset.max(region.offset);
            }
            _ => {
                report_gap(
                    class,
                    base_address,
                    validator,
                    last_offset,
                    region.offset,
                    nesting <= threshold,
                    &mut missing,
                    out,
                )?;
                if nesting <= threshold {
                    writeln!(out, "{}", field_line(class, base_address, region))?;
                }
                last_offset = last_offset.max(region.offset + region.length);
            }
        }
    }

    let rom_size = class.rom_size();
    if last_offset < rom_size {
        report_gap(class, base_address, validator, last_offset, rom_size, true, &mut missing, out)?;
    }

    if missing == 0 {
        writeln!(out, "All bytes were accounted for")?;
    } else {
        writeln!(out, "{} bytes were not accounted for", missing)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn report_gap<R, W>(
    class: &RomClass<'_>,
    base_address: u64,
    validator: &R,
    last_offset: u32,
    next_offset: u32,
    print: bool,
    missing: &mut u64,
    out: &mut W,
) -> Result<(), Error>
where
    R: RangeValidator,
    W: Write,
{
    if next_offset <= last_offset {
        return Ok(());
    }
    let gap = next_offset - last_offset;
    *missing += u64::from(gap);
    if !print {
        return Ok(());
    }
    let mut line = format!(
        "{:#010x}: suspected padding, {} bytes",
        base_address + u64::from(last_offset),
        gap
    );
    // show a few raw bytes when the range may be read at all
    let shown = gap.min(PADDING_PREVIEW);
    if validator.validate(class, last_offset, shown) {
        if let Some(bytes) = class.bytes(last_offset, shown) {
            line.push(':');
            for byte in bytes {
                line.push_str(&format!(" {:02x}", byte));
            }
            if gap > PADDING_PREVIEW {
                line.push_str(" ...");
            }
        }
    }
    writeln!(out, "{}", line)?;
    Ok(())
}

/// One-line summary of an ordinary (non-section) region, shared with the
/// query engine
pub(crate) fn field_line(class: &RomClass<'_>, base_address: u64, region: &Region) -> String {
    format!(
        "{:#010x}: {} = {}{}",
        base_address + u64::from(region.offset),
        region.name,
        slot_value(class, region),
        slot_detail(class, region)
    )
}

/// The value column for one region
pub(crate) fn slot_value(class: &RomClass<'_>, region: &Region) -> String {
    match region.slot_type {
        SlotType::U8 => match class.u8_at(region.offset) {
            Some(value) => format!("{:#04x}", value),
            None => "??".to_string(),
        },
        SlotType::U16 => match class.u16_at(region.offset) {
            Some(value) => format!("{:#06x}", value),
            None => "??".to_string(),
        },
        SlotType::U32 => match class.u32_at(region.offset) {
            Some(value) => format!("{:#010x}", value),
            None => "??".to_string(),
        },
        SlotType::U64 => match class.u64_at(region.offset) {
            Some(value) => format!("{:#018x}", value),
            None => "??".to_string(),
        },
        SlotType::Srp | SlotType::SrpToUtf8 | SlotType::SrpToNameAndSignature => {
            match class.u32_at(region.offset) {
                Some(0) => "-> null".to_string(),
                Some(target) => format!("-> {:#010x}", target),
                None => "??".to_string(),
            }
        }
        SlotType::Wsrp => match class.u64_at(region.offset) {
            Some(0) => "-> null".to_string(),
            Some(target) => format!("-> {:#018x}", target),
            None => "??".to_string(),
        },
        SlotType::Utf8 => match class.utf8_at(region.offset) {
            Some((payload, _)) => format!("\"{}\"", escape_utf8(payload, UTF8_PREVIEW)),
            None => "??".to_string(),
        },
        SlotType::ClassData => format!("{} bytes", region.length.saturating_sub(4)),
        SlotType::SectionStart | SlotType::SectionEnd => {
            format!("{} bytes", region.length)
        }
    }
}

/// Trailing annotation for one region: resolved string previews for
/// UTF8-valued references, an `(external)` marker for references leaving the
/// record
fn slot_detail(class: &RomClass<'_>, region: &Region) -> String {
    match region.slot_type {
        SlotType::SrpToUtf8 => match class.srp_at(region.offset) {
            Some(target) if class.is_external(target) => " (external)".to_string(),
            Some(target) => match class.utf8_at(target) {
                Some((payload, _)) => format!(" (\"{}\")", escape_utf8(payload, UTF8_PREVIEW)),
                None => String::new(),
            },
            None => String::new(),
        },
        SlotType::Srp | SlotType::SrpToNameAndSignature => match class.srp_at(region.offset) {
            Some(target) if class.is_external(target) => " (external)".to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rom::builder::{MethodBuilder, RomClassBuilder};

    fn dump_to_string(bytes: &[u8], threshold: u32) -> String {
        let class = RomClass::new(bytes).unwrap();
        let mut out = Vec::new();
        linear(&class, 0, threshold, &(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn minimal_class_accounts_for_every_byte() {
        let bytes = RomClassBuilder::new("com/example/Foo").build();
        let text = dump_to_string(&bytes, 1);
        assert!(text.contains("romSize"), "{}", text);
        assert!(text.ends_with("All bytes were accounted for\n"), "{}", text);
    }

    #[test]
    fn method_dump_shows_resolved_name() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let text = dump_to_string(&bytes, 4);
        assert!(text.contains("=== Section Start: methods ==="), "{}", text);
        assert!(text.contains("=== Section Start: method ==="), "{}", text);
        assert!(text.contains("(\"foo\")"), "{}", text);
        assert!(text.ends_with("All bytes were accounted for\n"), "{}", text);
    }

    #[test]
    fn threshold_collapses_nested_sections() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let text = dump_to_string(&bytes, 1);
        // "methods" opens at nesting 0 and is expanded; "method" opens at
        // nesting 1 and collapses to a summary line
        assert!(text.contains("=== Section Start: methods ==="), "{}", text);
        assert!(!text.contains("=== Section Start: method ==="), "{}", text);
        assert!(text.contains("method section ("), "{}", text);
        assert!(text.ends_with("All bytes were accounted for\n"), "{}", text);
    }

    #[test]
    fn plain_srp_leaving_the_record_is_marked_external() {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&12u32.to_le_bytes()); // romSize
        data[8..12].copy_from_slice(&0x40u32.to_le_bytes()); // target past the end
        let class = RomClass::new(&data).unwrap();
        let region = Region {
            offset: 8,
            length: 4,
            slot_type: SlotType::Srp,
            name: "sourceDebugExtension",
        };
        let line = field_line(&class, 0, &region);
        assert!(line.ends_with("(external)"), "{}", line);
    }

    #[test]
    fn truncated_record_reports_missing_bytes() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        // only the first 160 bytes may be read, so the method table is
        // never descended into and its bytes go unaccounted
        let limit = crate::rom::ValidateWith(|offset: u32, length: u32| offset + length <= 160);
        let class = RomClass::new(&bytes).unwrap();
        let mut out = Vec::new();
        linear(&class, 0, 8, &limit, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("bytes were not accounted for"), "{}", text);
    }
}
