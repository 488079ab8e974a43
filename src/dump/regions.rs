//! Materializing a walk into a flat, sorted list of byte ranges

use crate::rom::{all_slots_do, RangeValidator, RomClass, SlotType, SlotVisitor};

use super::Error;

/// One walked slot or section, as a byte range of the record
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: u32,
    pub length: u32,
    pub slot_type: SlotType,
    pub name: &'static str,
}

/// Collect and sort every region of `class`
///
/// SRP-to-UTF8 slots contribute an extra region for the string payload they
/// reference (when it lies inside the record); name-and-signature slots
/// contribute a region for the 8-byte pair structure, its two reference
/// slots, and their payloads. Because
/// interned strings sit in no declared field, their collective extent is only
/// known after the walk, at which point a synthetic `utf8Block` section is
/// added spanning the lowest to the highest string seen.
///
/// Fails with [`Error::EmptyLayout`] when the walk visits nothing, which
/// happens exactly when the validator rejects the record's own size field.
pub fn gather<R: RangeValidator>(class: &RomClass<'_>, validator: &R) -> Result<Vec<Region>, Error> {
    let mut collector = Collector {
        regions: Vec::new(),
        utf8_start: None,
        utf8_end: None,
    };
    all_slots_do(class, &mut collector, validator);
    if collector.regions.is_empty() {
        return Err(Error::EmptyLayout);
    }
    if let (Some(start), Some(end)) = (collector.utf8_start, collector.utf8_end) {
        collector.regions.push(Region {
            offset: start,
            length: end - start,
            slot_type: SlotType::SectionStart,
            name: "utf8Block",
        });
        collector.regions.push(Region {
            offset: end,
            length: end - start,
            slot_type: SlotType::SectionEnd,
            name: "utf8Block",
        });
    }
    let mut regions = collector.regions;
    regions.sort_by(compare_regions);
    // two cross-references landing on the same target produce identical
    // regions; keep one
    regions.dedup();
    Ok(regions)
}

struct Collector {
    regions: Vec<Region>,
    utf8_start: Option<u32>,
    utf8_end: Option<u32>,
}

impl Collector {
    fn push(&mut self, offset: u32, length: u32, slot_type: SlotType, name: &'static str) {
        self.regions.push(Region {
            offset,
            length,
            slot_type,
            name,
        });
    }

    /// Record the string payload a reference points at, if it is one of ours
    fn resolve_utf8(&mut self, class: &RomClass<'_>, slot_offset: u32, name: &'static str) {
        let target = match class.srp_at(slot_offset) {
            Some(target) if !class.is_external(target) => target,
            _ => return,
        };
        if let Some((_, total)) = class.utf8_at(target) {
            self.push(target, total, SlotType::Utf8, name);
            self.utf8_start = Some(match self.utf8_start {
                Some(start) => start.min(target),
                None => target,
            });
            self.utf8_end = Some(match self.utf8_end {
                Some(end) => end.max(target + total),
                None => target + total,
            });
        }
    }
}

impl SlotVisitor for Collector {
    fn visit_slot(&mut self, class: &RomClass<'_>, slot_type: SlotType, offset: u32, name: &'static str) {
        let length = match slot_type.fixed_size() {
            Some(size) => size,
            // the blob's first word is its own content length
            None => 4 + class.u32_at(offset).unwrap_or(0),
        };
        self.push(offset, length, slot_type, name);
        match slot_type {
            SlotType::SrpToUtf8 => self.resolve_utf8(class, offset, name),
            SlotType::SrpToNameAndSignature => {
                let target = match class.srp_at(offset) {
                    Some(target) if !class.is_external(target) => target,
                    _ => return,
                };
                // the 8-byte pair structure itself, then its two references
                self.push(target, 8, SlotType::SrpToNameAndSignature, name);
                self.push(target, 4, SlotType::SrpToUtf8, "name");
                self.resolve_utf8(class, target, "name");
                self.push(target + 4, 4, SlotType::SrpToUtf8, "signature");
                self.resolve_utf8(class, target + 4, "signature");
            }
            _ => {}
        }
    }

    fn visit_section(&mut self, _class: &RomClass<'_>, offset: u32, length: u32, name: &'static str) {
        self.push(offset, length, SlotType::SectionStart, name);
        self.push(offset + length, length, SlotType::SectionEnd, name);
    }
}

/// Deterministic region order: offset ascending, with tie-breaks that keep a
/// linear scan's nesting discipline intact. At one offset an ending section
/// closes before anything new opens; containers open before their first
/// element ("fields" before "field", hence longer-first on starts) and close
/// after their last one (shorter-first on ends).
pub(crate) fn compare_regions(a: &Region, b: &Region) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    use SlotType::{SectionEnd, SectionStart};

    fn rank(region: &Region) -> u8 {
        match region.slot_type {
            SectionEnd => 0,
            SectionStart => 1,
            _ => 2,
        }
    }

    let by_offset = a.offset.cmp(&b.offset);
    if by_offset != Ordering::Equal {
        return by_offset;
    }
    match (a.slot_type, b.slot_type) {
        (SectionStart, SectionStart) => b
            .length
            .cmp(&a.length)
            .then(b.name.len().cmp(&a.name.len()))
            .then(a.slot_type.ordinal().cmp(&b.slot_type.ordinal())),
        (SectionEnd, SectionEnd) => a
            .length
            .cmp(&b.length)
            .then(a.name.len().cmp(&b.name.len()))
            .then(a.slot_type.ordinal().cmp(&b.slot_type.ordinal())),
        _ => rank(a)
            .cmp(&rank(b))
            .then(a.slot_type.ordinal().cmp(&b.slot_type.ordinal())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rom::builder::{CpEntry, MethodBuilder, RomClassBuilder};

    fn sections_balance(regions: &[Region]) -> bool {
        let mut nesting: i32 = 0;
        for region in regions {
            match region.slot_type {
                SlotType::SectionStart => nesting += 1,
                SlotType::SectionEnd => {
                    nesting -= 1;
                    if nesting < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        nesting == 0
    }

    #[test]
    fn start_end_ordering_at_shared_offset() {
        let mut regions = vec![
            Region { offset: 16, length: 8, slot_type: SlotType::SectionStart, name: "field" },
            Region { offset: 16, length: 40, slot_type: SlotType::SectionStart, name: "fields" },
            Region { offset: 16, length: 12, slot_type: SlotType::SectionEnd, name: "methods" },
        ];
        regions.sort_by(compare_regions);
        assert_eq!(regions[0].name, "methods");
        assert_eq!(regions[1].name, "fields");
        assert_eq!(regions[2].name, "field");
    }

    #[test]
    fn ends_close_inner_first() {
        let mut regions = vec![
            Region { offset: 64, length: 60, slot_type: SlotType::SectionEnd, name: "methods" },
            Region { offset: 64, length: 28, slot_type: SlotType::SectionEnd, name: "method" },
        ];
        regions.sort_by(compare_regions);
        assert_eq!(regions[0].name, "method");
        assert_eq!(regions[1].name, "methods");
    }

    #[test]
    fn gather_is_deterministic_and_balanced() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let class = RomClass::new(&bytes).unwrap();
        let first = gather(&class, &()).unwrap();
        let second = gather(&class, &()).unwrap();
        assert_eq!(first, second);
        assert!(sections_balance(&first));
    }

    #[test]
    fn section_markers_pair_up() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
            .build();
        let class = RomClass::new(&bytes).unwrap();
        let regions = gather(&class, &()).unwrap();
        for region in &regions {
            if region.slot_type == SlotType::SectionStart {
                let matched = regions.iter().any(|other| {
                    other.slot_type == SlotType::SectionEnd
                        && other.name == region.name
                        && other.length == region.length
                        && other.offset == region.offset + region.length
                });
                assert!(matched, "unpaired section {}", region.name);
            }
        }
    }

    #[test]
    fn nas_reference_contributes_the_pair_structure() {
        let bytes = RomClassBuilder::new("com/example/Foo")
            .cp_entry(CpEntry::FieldRef {
                class_index: 0,
                name: "x".to_string(),
                signature: "I".to_string(),
            })
            .build();
        let class = RomClass::new(&bytes).unwrap();
        let regions = gather(&class, &()).unwrap();
        let pair = regions
            .iter()
            .find(|r| r.slot_type == SlotType::SrpToNameAndSignature && r.length == 8)
            .copied()
            .unwrap();
        assert_eq!(pair.name, "nameAndSignature");
        let name = Region { offset: pair.offset, length: 4, slot_type: SlotType::SrpToUtf8, name: "name" };
        let signature = Region { offset: pair.offset + 4, length: 4, slot_type: SlotType::SrpToUtf8, name: "signature" };
        assert!(regions.contains(&name));
        assert!(regions.contains(&signature));
    }

    #[test]
    fn rejecting_the_size_field_collects_nothing() {
        use crate::rom::ValidateWith;
        let bytes = RomClassBuilder::new("Foo").build();
        let class = RomClass::new(&bytes).unwrap();
        let reject_all = ValidateWith(|_offset: u32, _length: u32| false);
        assert!(matches!(gather(&class, &reject_all), Err(Error::EmptyLayout)));
    }
}
