use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte offsets of the fixed header fields, relative to the record base
///
/// Scalars are little-endian; an SRP is a stored `u32` offset from the
/// record base (0 meaning "absent"). The two stack-map counts deeper in the
/// format are the only big-endian fields, read via [`RomClass::u16_be_at`].
pub mod header {
    pub const ROM_SIZE: u32 = 0x00;
    pub const CLASS_NAME: u32 = 0x04;
    pub const SUPERCLASS_NAME: u32 = 0x08;
    pub const MODIFIERS: u32 = 0x0c;
    pub const EXTRA_MODIFIERS: u32 = 0x10;
    pub const MAJOR_VERSION: u32 = 0x14;
    pub const MINOR_VERSION: u32 = 0x16;
    pub const INTERFACE_COUNT: u32 = 0x18;
    pub const INTERFACES: u32 = 0x1c;
    pub const ROM_METHOD_COUNT: u32 = 0x20;
    pub const ROM_METHODS: u32 = 0x24;
    pub const ROM_FIELD_COUNT: u32 = 0x28;
    pub const ROM_FIELDS: u32 = 0x2c;
    pub const OBJECT_STATIC_COUNT: u32 = 0x30;
    pub const DOUBLE_SCALAR_STATIC_COUNT: u32 = 0x34;
    pub const SINGLE_SCALAR_STATIC_COUNT: u32 = 0x38;
    pub const RAM_CONSTANT_POOL_COUNT: u32 = 0x3c;
    pub const ROM_CONSTANT_POOL_COUNT: u32 = 0x40;
    pub const CP_SHAPE_DESCRIPTION: u32 = 0x44;
    pub const CONSTANT_POOL: u32 = 0x48;
    pub const OUTER_CLASS_NAME: u32 = 0x4c;
    pub const MEMBER_ACCESS_FLAGS: u32 = 0x50;
    pub const INNER_CLASS_COUNT: u32 = 0x54;
    pub const INNER_CLASSES: u32 = 0x58;
    pub const NEST_HOST: u32 = 0x5c;
    pub const NEST_MEMBER_COUNT: u32 = 0x60;
    pub const NEST_MEMBERS: u32 = 0x64;
    pub const OPTIONAL_FLAGS: u32 = 0x68;
    pub const OPTIONAL_INFO: u32 = 0x6c;
    pub const CALL_SITE_COUNT: u32 = 0x70;
    pub const BSM_COUNT: u32 = 0x74;
    pub const CALL_SITE_DATA: u32 = 0x78;
    pub const VAR_HANDLE_METHOD_TYPE_COUNT: u32 = 0x7c;
    pub const VAR_HANDLE_METHOD_TYPE_LOOKUP_TABLE: u32 = 0x80;
    pub const STATIC_SPLIT_METHOD_REF_COUNT: u32 = 0x84;
    pub const SPECIAL_SPLIT_METHOD_REF_COUNT: u32 = 0x88;
    pub const STATIC_SPLIT_METHOD_REF_INDEXES: u32 = 0x8c;
    pub const SPECIAL_SPLIT_METHOD_REF_INDEXES: u32 = 0x90;

    pub const SIZE: u32 = 0x94;
}

/// First class-file major version carrying nest members
pub const FIRST_NESTMATES_VERSION: u16 = 55;

#[derive(Debug)]
pub enum RomError {
    /// Fewer bytes than the `romSize` field itself
    TooSmall(usize),
}

impl std::fmt::Display for RomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RomError::TooSmall(len) => {
                write!(f, "blob too small for a ROM class ({} bytes)", len)
            }
        }
    }
}

impl std::error::Error for RomError {}

/// Read-only typed view over a ROM-class blob
///
/// All accessors are bounds-checked against the physical slice and return
/// `None` for out-of-range offsets; nothing here panics on a truncated or
/// corrupt record. Whether a range is *trusted* is a separate question,
/// answered by the caller's [`RangeValidator`].
#[derive(Copy, Clone)]
pub struct RomClass<'a> {
    data: &'a [u8],
}

impl<'a> RomClass<'a> {
    /// Wrap a blob believed to hold a ROM class
    ///
    /// Only the bare minimum is required up front: enough bytes for the
    /// `romSize` field. Everything else is discovered (and distrusted) during
    /// the walk.
    pub fn new(data: &'a [u8]) -> Result<RomClass<'a>, RomError> {
        if data.len() < 4 {
            return Err(RomError::TooSmall(data.len()));
        }
        Ok(RomClass { data })
    }

    /// The underlying bytes (possibly longer or shorter than `romSize`)
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Declared total size of the record
    pub fn rom_size(&self) -> u32 {
        LittleEndian::read_u32(&self.data[..4])
    }

    pub fn u8_at(&self, offset: u32) -> Option<u8> {
        self.data.get(offset as usize).copied()
    }

    pub fn u16_at(&self, offset: u32) -> Option<u16> {
        self.bytes(offset, 2).map(LittleEndian::read_u16)
    }

    /// The format stores stack-map counts big-endian regardless of host
    pub fn u16_be_at(&self, offset: u32) -> Option<u16> {
        self.bytes(offset, 2).map(BigEndian::read_u16)
    }

    pub fn u32_at(&self, offset: u32) -> Option<u32> {
        self.bytes(offset, 4).map(LittleEndian::read_u32)
    }

    pub fn i32_be_at(&self, offset: u32) -> Option<i32> {
        self.bytes(offset, 4).map(BigEndian::read_i32)
    }

    pub fn u64_at(&self, offset: u32) -> Option<u64> {
        self.bytes(offset, 8).map(LittleEndian::read_u64)
    }

    /// `length` bytes starting at `offset`, if physically present
    pub fn bytes(&self, offset: u32, length: u32) -> Option<&'a [u8]> {
        let start = offset as usize;
        let end = start.checked_add(length as usize)?;
        self.data.get(start..end)
    }

    /// Value of the SRP slot at `offset`: the target offset, or `None` for a
    /// null SRP or an unreadable slot
    pub fn srp_at(&self, offset: u32) -> Option<u32> {
        match self.u32_at(offset) {
            Some(0) | None => None,
            Some(target) => Some(target),
        }
    }

    /// UTF8 at `offset`: `(payload bytes, total encoded length)`
    ///
    /// Total length counts the 2-byte prefix. `None` if the prefix or the
    /// payload extends past the physical end of the blob.
    pub fn utf8_at(&self, offset: u32) -> Option<(&'a [u8], u32)> {
        let byte_count = self.u16_at(offset)? as u32;
        let payload = self.bytes(offset + 2, byte_count)?;
        Some((payload, 2 + byte_count))
    }

    /// Name-and-signature pair at `offset`: `(name SRP value, signature SRP value)`
    pub fn nas_at(&self, offset: u32) -> Option<(Option<u32>, Option<u32>)> {
        // make sure the whole 8-byte struct is readable first
        self.bytes(offset, 8)?;
        Some((self.srp_at(offset), self.srp_at(offset + 4)))
    }

    /// Does `offset` lie outside the record's own declared extent?
    pub fn is_external(&self, offset: u32) -> bool {
        offset >= self.rom_size()
    }

    // Typed header getters, used by the walker and handy for embedders.

    pub fn class_file_major_version(&self) -> u16 {
        self.u16_at(header::MAJOR_VERSION).unwrap_or(0)
    }

    pub fn interface_count(&self) -> u32 {
        self.u32_at(header::INTERFACE_COUNT).unwrap_or(0)
    }

    pub fn rom_method_count(&self) -> u32 {
        self.u32_at(header::ROM_METHOD_COUNT).unwrap_or(0)
    }

    pub fn rom_field_count(&self) -> u32 {
        self.u32_at(header::ROM_FIELD_COUNT).unwrap_or(0)
    }

    pub fn rom_constant_pool_count(&self) -> u32 {
        self.u32_at(header::ROM_CONSTANT_POOL_COUNT).unwrap_or(0)
    }

    pub fn class_name_bytes(&self) -> Option<&'a [u8]> {
        let target = self.srp_at(header::CLASS_NAME)?;
        self.utf8_at(target).map(|(payload, _)| payload)
    }
}

/// Gate on every read the walker is about to trust
///
/// Supplied by the embedder to constrain a walk to ranges known to be mapped
/// and plausible (e.g. when introspecting a possibly-corrupt or partially
/// paged-in record). Rejecting a range silently truncates the sub-walk under
/// it; it never aborts the enclosing call. The unit validator `()` accepts
/// everything.
pub trait RangeValidator {
    fn validate(&self, class: &RomClass<'_>, offset: u32, length: u32) -> bool;
}

impl RangeValidator for () {
    fn validate(&self, _class: &RomClass<'_>, _offset: u32, _length: u32) -> bool {
        true
    }
}

/// Adapter turning a plain closure over `(offset, length)` into a validator
pub struct ValidateWith<F>(pub F);

impl<F> RangeValidator for ValidateWith<F>
where
    F: Fn(u32, u32) -> bool,
{
    fn validate(&self, _class: &RomClass<'_>, offset: u32, length: u32) -> bool {
        (self.0)(offset, length)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn blob(size: u32) -> Vec<u8> {
        let mut data = vec![0u8; size as usize];
        LittleEndian::write_u32(&mut data[..4], size);
        data
    }

    #[test]
    fn rejects_impossibly_small_blob() {
        assert!(matches!(RomClass::new(&[0, 1, 2]), Err(RomError::TooSmall(3))));
    }

    #[test]
    fn reads_are_bounds_checked() {
        let data = blob(16);
        let class = RomClass::new(&data).unwrap();
        assert_eq!(class.rom_size(), 16);
        assert_eq!(class.u32_at(12), Some(0));
        assert_eq!(class.u32_at(13), None);
        assert_eq!(class.u8_at(15), Some(0));
        assert_eq!(class.u8_at(16), None);
    }

    #[test]
    fn null_srp_is_none() {
        let data = blob(16);
        let class = RomClass::new(&data).unwrap();
        assert_eq!(class.srp_at(4), None);
    }

    #[test]
    fn utf8_prefix_and_payload() {
        let mut data = blob(16);
        data[8] = 3; // length prefix (little-endian u16)
        data[10..13].copy_from_slice(b"foo");
        let class = RomClass::new(&data).unwrap();
        let (payload, total) = class.utf8_at(8).unwrap();
        assert_eq!(payload, b"foo");
        assert_eq!(total, 5);
    }

    #[test]
    fn truncated_utf8_payload_is_none() {
        let mut data = blob(8);
        LittleEndian::write_u16(&mut data[4..6], 100);
        let class = RomClass::new(&data).unwrap();
        assert_eq!(class.utf8_at(4), None);
    }

    #[test]
    fn nas_pair_reads_both_references() {
        let mut data = blob(24);
        LittleEndian::write_u32(&mut data[8..12], 0x40);
        // signature SRP left null
        let class = RomClass::new(&data).unwrap();
        assert_eq!(class.nas_at(8), Some((Some(0x40), None)));
        assert_eq!(class.nas_at(20), None);
    }

    #[test]
    fn big_endian_reads() {
        let mut data = blob(16);
        data[8] = 0x01;
        data[9] = 0x02;
        let class = RomClass::new(&data).unwrap();
        assert_eq!(class.u16_be_at(8), Some(0x0102));
        assert_eq!(class.u16_at(8), Some(0x0201));
    }

    #[test]
    fn external_offsets() {
        let data = blob(16);
        let class = RomClass::new(&data).unwrap();
        assert!(!class.is_external(15));
        assert!(class.is_external(16));
    }
}
