/// Type tag of one walked unit of a ROM class
///
/// Every byte of a well-formed record is covered by slots of these types
/// (plus the synthetic section markers, which carry no bytes of their own;
/// they delimit a range already covered by the slots inside it).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SlotType {
    /// Start of a named nested grouping (synthetic, zero bytes)
    SectionStart,
    /// End of a named nested grouping (synthetic, zero bytes)
    SectionEnd,
    U8,
    U16,
    U32,
    U64,
    /// Self-relative pointer: stored `u32` offset from the record base
    Srp,
    /// Wide self-relative pointer: stored `u64` offset from the record base
    Wsrp,
    /// Length-prefixed modified-UTF8 string addressed directly
    Utf8,
    /// Self-relative pointer known to target a UTF8 string
    SrpToUtf8,
    /// Self-relative pointer to a name-and-signature pair
    SrpToNameAndSignature,
    /// Opaque inline class data; length known only to the walker
    ClassData,
}

impl SlotType {
    /// Fixed byte size of a slot of this type
    ///
    /// `Utf8` and `ClassData` have no fixed size (their extent comes from a
    /// length field adjacent to or within the data); section markers own no
    /// bytes at all.
    pub fn fixed_size(self) -> Option<u32> {
        match self {
            SlotType::SectionStart | SlotType::SectionEnd => Some(0),
            SlotType::U8 => Some(1),
            SlotType::U16 => Some(2),
            SlotType::U32 => Some(4),
            SlotType::U64 => Some(8),
            SlotType::Srp | SlotType::SrpToUtf8 | SlotType::SrpToNameAndSignature => Some(4),
            SlotType::Wsrp => Some(8),
            SlotType::Utf8 | SlotType::ClassData => None,
        }
    }

    /// Canonical name, used as the element tag in the XML dump
    pub fn name(self) -> &'static str {
        match self {
            SlotType::SectionStart => "SECTION_START",
            SlotType::SectionEnd => "SECTION_END",
            SlotType::U8 => "U_8",
            SlotType::U16 => "U_16",
            SlotType::U32 => "U_32",
            SlotType::U64 => "U_64",
            SlotType::Srp => "SRP",
            SlotType::Wsrp => "WSRP",
            SlotType::Utf8 => "UTF8",
            SlotType::SrpToUtf8 => "SRP_TO_UTF8",
            SlotType::SrpToNameAndSignature => "SRP_TO_NAS",
            SlotType::ClassData => "CLASS_DATA",
        }
    }

    /// Ordinal used as the final tie-break when sorting regions
    pub fn ordinal(self) -> u8 {
        match self {
            SlotType::SectionStart => 0,
            SlotType::SectionEnd => 1,
            SlotType::U8 => 2,
            SlotType::U16 => 3,
            SlotType::U32 => 4,
            SlotType::U64 => 5,
            SlotType::Srp => 6,
            SlotType::Wsrp => 7,
            SlotType::Utf8 => 8,
            SlotType::SrpToUtf8 => 9,
            SlotType::SrpToNameAndSignature => 10,
            SlotType::ClassData => 11,
        }
    }

    /// Does a slot of this type hold a self-relative pointer to a UTF8?
    pub fn points_to_utf8(self) -> bool {
        matches!(self, SlotType::SrpToUtf8)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar_sizes() {
        assert_eq!(SlotType::U8.fixed_size(), Some(1));
        assert_eq!(SlotType::U16.fixed_size(), Some(2));
        assert_eq!(SlotType::U32.fixed_size(), Some(4));
        assert_eq!(SlotType::U64.fixed_size(), Some(8));
        assert_eq!(SlotType::Srp.fixed_size(), Some(4));
        assert_eq!(SlotType::Wsrp.fixed_size(), Some(8));
    }

    #[test]
    fn variable_sized_slots_have_no_fixed_size() {
        assert_eq!(SlotType::Utf8.fixed_size(), None);
        assert_eq!(SlotType::ClassData.fixed_size(), None);
    }

    #[test]
    fn section_markers_own_no_bytes() {
        assert_eq!(SlotType::SectionStart.fixed_size(), Some(0));
        assert_eq!(SlotType::SectionEnd.fixed_size(), Some(0));
    }

    #[test]
    fn ordinals_are_distinct() {
        let all = [
            SlotType::SectionStart,
            SlotType::SectionEnd,
            SlotType::U8,
            SlotType::U16,
            SlotType::U32,
            SlotType::U64,
            SlotType::Srp,
            SlotType::Wsrp,
            SlotType::Utf8,
            SlotType::SrpToUtf8,
            SlotType::SrpToNameAndSignature,
            SlotType::ClassData,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.ordinal(), b.ordinal());
            }
        }
    }
}
