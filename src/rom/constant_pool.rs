/// Shape of one constant-pool entry, as recorded in the shape descriptor
///
/// Each entry in the pool is two 4-byte cells; the shape dictates how those
/// cells are interpreted. Shapes are packed four bits per entry into the
/// `u32` words the header's `cpShapeDescription` SRP points at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CpShape {
    Unused,
    Class,
    String,
    Int,
    Float,
    Long,
    Double,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    MethodType,
    MethodHandle,
    ConstantDynamic,
}

/// Shape bits per constant-pool entry in the descriptor bitmap
pub const CP_SHAPE_BITS: u32 = 4;

/// Entries described per `u32` descriptor word
pub const CP_SHAPES_PER_WORD: u32 = 32 / CP_SHAPE_BITS;

/// Bytes occupied by one constant-pool entry (two cells)
pub const CP_ENTRY_SIZE: u32 = 8;

impl CpShape {
    /// Decode a 4-bit shape nibble
    ///
    /// Panics on a nibble no variant claims: the constant pool must be
    /// exhaustively accounted for, so a new shape has to be added here
    /// explicitly rather than silently skipped.
    pub fn from_nibble(nibble: u32) -> CpShape {
        match nibble {
            0x0 => CpShape::Unused,
            0x1 => CpShape::Class,
            0x2 => CpShape::String,
            0x3 => CpShape::Int,
            0x4 => CpShape::Float,
            0x5 => CpShape::Long,
            0x6 => CpShape::Double,
            0x7 => CpShape::FieldRef,
            0x8 => CpShape::MethodRef,
            0x9 => CpShape::InterfaceMethodRef,
            0xa => CpShape::MethodType,
            0xb => CpShape::MethodHandle,
            0xc => CpShape::ConstantDynamic,
            other => panic!("unknown constant pool shape 0x{:x}", other),
        }
    }

    pub fn nibble(self) -> u32 {
        match self {
            CpShape::Unused => 0x0,
            CpShape::Class => 0x1,
            CpShape::String => 0x2,
            CpShape::Int => 0x3,
            CpShape::Float => 0x4,
            CpShape::Long => 0x5,
            CpShape::Double => 0x6,
            CpShape::FieldRef => 0x7,
            CpShape::MethodRef => 0x8,
            CpShape::InterfaceMethodRef => 0x9,
            CpShape::MethodType => 0xa,
            CpShape::MethodHandle => 0xb,
            CpShape::ConstantDynamic => 0xc,
        }
    }

    /// Extract the shape of entry `index` from the descriptor words
    pub fn of_entry(shape_words: &[u32], index: u32) -> CpShape {
        let word = shape_words[(index / CP_SHAPES_PER_WORD) as usize];
        let shift = (index % CP_SHAPES_PER_WORD) * CP_SHAPE_BITS;
        CpShape::from_nibble((word >> shift) & 0xf)
    }

    /// Descriptor words needed to describe `count` entries
    ///
    /// Widened internally so a count near `u32::MAX` (from a corrupt
    /// record) still rounds up instead of wrapping.
    pub fn words_for(count: u32) -> u32 {
        ((u64::from(count) + u64::from(CP_SHAPES_PER_WORD) - 1) / u64::from(CP_SHAPES_PER_WORD))
            as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nibble_round_trip() {
        for nibble in 0x0..=0xc {
            assert_eq!(CpShape::from_nibble(nibble).nibble(), nibble);
        }
    }

    #[test]
    #[should_panic(expected = "unknown constant pool shape")]
    fn unknown_nibble_panics() {
        CpShape::from_nibble(0xf);
    }

    #[test]
    fn packed_extraction() {
        // entries 0..8 in one word, low nibble first
        let word = 0x8765_4321u32;
        let shapes: Vec<CpShape> = (0..8).map(|i| CpShape::of_entry(&[word], i)).collect();
        assert_eq!(
            shapes,
            vec![
                CpShape::Class,
                CpShape::String,
                CpShape::Int,
                CpShape::Float,
                CpShape::Long,
                CpShape::Double,
                CpShape::FieldRef,
                CpShape::MethodRef,
            ]
        );
    }

    #[test]
    fn word_counts() {
        assert_eq!(CpShape::words_for(0), 0);
        assert_eq!(CpShape::words_for(1), 1);
        assert_eq!(CpShape::words_for(8), 1);
        assert_eq!(CpShape::words_for(9), 2);
        assert_eq!(CpShape::words_for(u32::MAX), 0x2000_0000);
    }
}
