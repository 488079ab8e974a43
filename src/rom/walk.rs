//! Depth-first walker over the physical layout of a ROM class
//!
//! [`all_slots_do`] traverses a record top to bottom, left to right, invoking
//! the visitor for every scalar field, every cross-reference and every
//! variable-length sub-block, in the order the fields physically appear.
//! Sections (methods, a single method, the constant pool, ...) are reported
//! through the section callback once their extent is known, which may be
//! after the slots inside them; consumers that care about physical order
//! sort by offset (see `dump::regions`).
//!
//! The walker never trusts a byte the [`RangeValidator`] has not accepted: a
//! rejected range silently truncates the sub-walk under it, so a truncated
//! or corrupt record degrades to a partial visit instead of a crash. There
//! is no error channel out of the walk at all; the only failure mode is
//! "visited nothing further".

use super::bytecode::{self, Operands};
use super::{header, CpShape, FieldModifiers, MethodExtendedModifiers, OptionalFlags};
use super::{RangeValidator, RomClass, SlotType, FIRST_NESTMATES_VERSION};

/// Receiver for walk events
///
/// `visit_slot` fires once per walked field; `visit_section` once per named
/// grouping, with the grouping's start offset and byte length. Both fire
/// synchronously on the walking thread.
pub trait SlotVisitor {
    fn visit_slot(&mut self, class: &RomClass<'_>, slot_type: SlotType, offset: u32, name: &'static str);

    fn visit_section(&mut self, class: &RomClass<'_>, offset: u32, length: u32, name: &'static str);
}

/// Fixed bytes at the front of every method
pub const METHOD_HEADER_SIZE: u32 = 28;

/// Fixed bytes at the front of every field
pub const FIELD_HEADER_SIZE: u32 = 12;

/// Fixed bytes at the front of a debug-info block
pub const DEBUG_HEADER_SIZE: u32 = 16;

/// Bytes per variable-table entry in a debug-info block
pub const VARIABLE_INFO_SIZE: u32 = 24;

/// Walk every slot and section of `class`
///
/// The record's own `romSize` field is visited before any other byte is
/// trusted; if the validator rejects even that field, the walk aborts with
/// zero slots visited.
pub fn all_slots_do<V, R>(class: &RomClass<'_>, visitor: &mut V, validator: &R)
where
    V: SlotVisitor,
    R: RangeValidator,
{
    let mut walker = Walker {
        class: *class,
        visitor,
        validator,
    };
    walker.walk();
}

struct Walker<'c, 'v, V, R> {
    class: RomClass<'c>,
    visitor: &'v mut V,
    validator: &'v R,
}

impl<'c, 'v, V: SlotVisitor, R: RangeValidator> Walker<'c, 'v, V, R> {
    /// Is this range both accepted by the validator and physically present?
    fn trusted(&self, offset: u32, length: u32) -> bool {
        self.validator.validate(&self.class, offset, length)
            && self.class.bytes(offset, length).is_some()
    }

    fn require(&self, offset: u32, length: u32) -> Option<()> {
        if self.trusted(offset, length) {
            Some(())
        } else {
            None
        }
    }

    fn slot(&mut self, slot_type: SlotType, offset: u32, name: &'static str) {
        self.visitor.visit_slot(&self.class, slot_type, offset, name);
    }

    fn section(&mut self, offset: u32, length: u32, name: &'static str) {
        self.visitor.visit_section(&self.class, offset, length, name);
    }

    fn walk(&mut self) {
        use SlotType::*;

        // romSize gates everything else: all later range checks compare
        // against it, so it must be visited (and trusted) first
        if !self.trusted(header::ROM_SIZE, 4) {
            return;
        }
        self.slot(U32, header::ROM_SIZE, "romSize");

        if !self.trusted(0, header::SIZE) {
            return;
        }
        self.slot(SrpToUtf8, header::CLASS_NAME, "className");
        self.slot(SrpToUtf8, header::SUPERCLASS_NAME, "superclassName");
        self.slot(U32, header::MODIFIERS, "modifiers");
        self.slot(U32, header::EXTRA_MODIFIERS, "extraModifiers");
        self.slot(U16, header::MAJOR_VERSION, "majorVersion");
        self.slot(U16, header::MINOR_VERSION, "minorVersion");
        self.slot(U32, header::INTERFACE_COUNT, "interfaceCount");
        self.slot(Srp, header::INTERFACES, "interfaces");
        self.slot(U32, header::ROM_METHOD_COUNT, "romMethodCount");
        self.slot(Srp, header::ROM_METHODS, "romMethods");
        self.slot(U32, header::ROM_FIELD_COUNT, "romFieldCount");
        self.slot(Srp, header::ROM_FIELDS, "romFields");
        self.slot(U32, header::OBJECT_STATIC_COUNT, "objectStaticCount");
        self.slot(U32, header::DOUBLE_SCALAR_STATIC_COUNT, "doubleScalarStaticCount");
        self.slot(U32, header::SINGLE_SCALAR_STATIC_COUNT, "singleScalarStaticCount");
        self.slot(U32, header::RAM_CONSTANT_POOL_COUNT, "ramConstantPoolCount");
        self.slot(U32, header::ROM_CONSTANT_POOL_COUNT, "romConstantPoolCount");
        self.slot(Srp, header::CP_SHAPE_DESCRIPTION, "cpShapeDescription");
        self.slot(Srp, header::CONSTANT_POOL, "constantPool");
        self.slot(SrpToUtf8, header::OUTER_CLASS_NAME, "outerClassName");
        self.slot(U32, header::MEMBER_ACCESS_FLAGS, "memberAccessFlags");
        self.slot(U32, header::INNER_CLASS_COUNT, "innerClassCount");
        self.slot(Srp, header::INNER_CLASSES, "innerClasses");
        self.slot(SrpToUtf8, header::NEST_HOST, "nestHost");
        self.slot(U32, header::NEST_MEMBER_COUNT, "nestMemberCount");
        self.slot(Srp, header::NEST_MEMBERS, "nestMembers");
        self.slot(U32, header::OPTIONAL_FLAGS, "optionalFlags");
        self.slot(Srp, header::OPTIONAL_INFO, "optionalInfo");
        self.slot(U32, header::CALL_SITE_COUNT, "callSiteCount");
        self.slot(U32, header::BSM_COUNT, "bsmCount");
        self.slot(Srp, header::CALL_SITE_DATA, "callSiteData");
        self.slot(U32, header::VAR_HANDLE_METHOD_TYPE_COUNT, "varHandleMethodTypeCount");
        self.slot(Srp, header::VAR_HANDLE_METHOD_TYPE_LOOKUP_TABLE, "varHandleMethodTypeLookupTable");
        self.slot(U32, header::STATIC_SPLIT_METHOD_REF_COUNT, "staticSplitMethodRefCount");
        self.slot(U32, header::SPECIAL_SPLIT_METHOD_REF_COUNT, "specialSplitMethodRefCount");
        self.slot(Srp, header::STATIC_SPLIT_METHOD_REF_INDEXES, "staticSplitMethodRefIndexes");
        self.slot(Srp, header::SPECIAL_SPLIT_METHOD_REF_INDEXES, "specialSplitMethodRefIndexes");

        self.walk_utf8_srp_table(header::INTERFACES, self.class.interface_count(), "interfaces", "interfaceUTF8");
        self.walk_methods();
        self.walk_fields();
        self.walk_utf8_srp_table(
            header::INNER_CLASSES,
            self.class.u32_at(header::INNER_CLASS_COUNT).unwrap_or(0),
            "innerClasses",
            "innerClassName",
        );
        self.walk_nest_members();
        self.walk_cp_shape_description();
        self.walk_constant_pool();
        self.walk_call_site_data();
        self.walk_optional_info();
        self.walk_u16_table(
            header::VAR_HANDLE_METHOD_TYPE_LOOKUP_TABLE,
            self.class.u32_at(header::VAR_HANDLE_METHOD_TYPE_COUNT).unwrap_or(0),
            "varHandleMethodTypeLookupTable",
            "methodTypeIndex",
        );
        self.walk_u16_table(
            header::STATIC_SPLIT_METHOD_REF_INDEXES,
            self.class.u32_at(header::STATIC_SPLIT_METHOD_REF_COUNT).unwrap_or(0),
            "staticSplitMethodRefIndexes",
            "cpIndex",
        );
        self.walk_u16_table(
            header::SPECIAL_SPLIT_METHOD_REF_INDEXES,
            self.class.u32_at(header::SPECIAL_SPLIT_METHOD_REF_COUNT).unwrap_or(0),
            "specialSplitMethodRefIndexes",
            "cpIndex",
        );
    }

    /// A table of `count` SRP-to-UTF8 slots behind a header SRP
    fn walk_utf8_srp_table(
        &mut self,
        header_field: u32,
        count: u32,
        section_name: &'static str,
        slot_name: &'static str,
    ) {
        let start = match self.class.srp_at(header_field) {
            Some(start) if count > 0 => start,
            _ => return,
        };
        // counts come straight off the record and may be hostile
        let length = match count.checked_mul(4) {
            Some(length) => length,
            None => return,
        };
        if !self.trusted(start, length) {
            return;
        }
        for i in 0..count {
            self.slot(SlotType::SrpToUtf8, start + i * 4, slot_name);
        }
        self.section(start, length, section_name);
    }

    fn walk_u16_table(
        &mut self,
        header_field: u32,
        count: u32,
        section_name: &'static str,
        slot_name: &'static str,
    ) {
        let start = match self.class.srp_at(header_field) {
            Some(start) if count > 0 => start,
            _ => return,
        };
        let length = match count.checked_mul(2) {
            Some(length) => length,
            None => return,
        };
        let padded = match length.checked_add(3) {
            Some(bumped) => bumped & !3,
            None => return,
        };
        if !self.trusted(start, padded) {
            return;
        }
        for i in 0..count {
            self.slot(SlotType::U16, start + i * 2, slot_name);
        }
        for pad in (start + length)..(start + padded) {
            self.slot(SlotType::U8, pad, "pad");
        }
        self.section(start, padded, section_name);
    }

    fn walk_nest_members(&mut self) {
        // the nest-member fields exist at every version; the table behind
        // them is only meaningful from the first nestmates class-file version
        if self.class.class_file_major_version() < FIRST_NESTMATES_VERSION {
            return;
        }
        self.walk_utf8_srp_table(
            header::NEST_MEMBERS,
            self.class.u32_at(header::NEST_MEMBER_COUNT).unwrap_or(0),
            "nestMembers",
            "nestMemberName",
        );
    }

    fn walk_methods(&mut self) {
        let count = self.class.rom_method_count();
        let start = match self.class.srp_at(header::ROM_METHODS) {
            Some(start) if count > 0 => start,
            _ => return,
        };
        let mut cursor = start;
        for _ in 0..count {
            match self.walk_method(cursor) {
                Some(end) => {
                    self.section(cursor, end - cursor, "method");
                    cursor = end;
                }
                None => break,
            }
        }
        if cursor > start {
            self.section(start, cursor - start, "methods");
        }
    }

    fn walk_method(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, METHOD_HEADER_SIZE)?;
        self.slot(SrpToUtf8, start, "name");
        self.slot(SrpToUtf8, start + 4, "signature");
        self.slot(U32, start + 8, "modifiers");
        self.slot(U32, start + 12, "extendedModifiers");
        self.slot(U16, start + 16, "maxStack");
        self.slot(U16, start + 18, "argCount");
        self.slot(U16, start + 20, "tempCount");
        self.slot(U16, start + 22, "reserved");
        self.slot(U32, start + 24, "bytecodeSize");

        let extended = MethodExtendedModifiers::from_bits_truncate(self.class.u32_at(start + 12)?);
        let bytecode_size = self.class.u32_at(start + 24)?;

        let mut cursor = start + METHOD_HEADER_SIZE;
        if bytecode_size > 0 {
            cursor = self.walk_bytecodes(cursor, bytecode_size)?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_GENERIC_SIGNATURE) {
            self.require(cursor, 4)?;
            self.slot(SrpToUtf8, cursor, "methodGenericSignature");
            cursor += 4;
        }
        if extended.contains(MethodExtendedModifiers::HAS_EXCEPTION_TABLE) {
            cursor = self.walk_exception_table(cursor)?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "methodAnnotations")?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_PARAMETER_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "parameterAnnotations")?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_DEFAULT_ANNOTATION) {
            cursor = self.walk_annotation_block(cursor, "defaultAnnotation")?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_METHOD_TYPE_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "methodTypeAnnotations")?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_CODE_TYPE_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "codeTypeAnnotations")?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_DEBUG_INFO) {
            cursor = self.walk_debug_info(cursor)?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_STACK_MAP) {
            cursor = self.walk_stack_map(cursor)?;
        }
        if extended.contains(MethodExtendedModifiers::HAS_METHOD_PARAMETERS) {
            cursor = self.walk_method_parameters(cursor)?;
        }
        Some(cursor)
    }

    /// Walk the instruction stream plus its trailing alignment padding
    ///
    /// Operand bytes keep class-file (big-endian) byte order; switch padding
    /// is relative to the start of the bytecode array, as in a class file.
    fn walk_bytecodes(&mut self, start: u32, size: u32) -> Option<u32> {
        use SlotType::*;

        let rounded = size.checked_add(3)? & !3;
        self.require(start, rounded)?;
        let end = start + size;
        let mut pc = start;
        'stream: while pc < end {
            let opcode = self.class.u8_at(pc)?;
            let (mnemonic, shape) = match bytecode::instruction(opcode) {
                Some(decoded) => decoded,
                None => break 'stream,
            };
            self.slot(U8, pc, mnemonic);
            pc += 1;
            match shape {
                Operands::None => {}
                Operands::I8 => {
                    self.slot(U8, pc, "value");
                    pc += 1;
                }
                Operands::U8 => {
                    self.slot(U8, pc, "index");
                    pc += 1;
                }
                Operands::I16 => {
                    self.slot(U16, pc, "value");
                    pc += 2;
                }
                Operands::U16 => {
                    self.slot(U16, pc, "index");
                    pc += 2;
                }
                Operands::U8Pair => {
                    self.slot(U8, pc, "index");
                    self.slot(U8, pc + 1, "constant");
                    pc += 2;
                }
                Operands::U16U8 => {
                    self.slot(U16, pc, "index");
                    self.slot(U8, pc + 2, "dimensions");
                    pc += 3;
                }
                Operands::U16U8U8 => {
                    self.slot(U16, pc, "index");
                    self.slot(U8, pc + 2, "count");
                    self.slot(U8, pc + 3, "zero");
                    pc += 4;
                }
                Operands::U16Zero2 => {
                    self.slot(U16, pc, "index");
                    self.slot(U16, pc + 2, "zero");
                    pc += 4;
                }
                Operands::I32 => {
                    self.slot(U32, pc, "offset");
                    pc += 4;
                }
                Operands::Wide => {
                    let wide_opcode = self.class.u8_at(pc)?;
                    let wide_mnemonic = match bytecode::instruction(wide_opcode) {
                        Some((mnemonic, _)) => mnemonic,
                        None => break 'stream,
                    };
                    self.slot(U8, pc, wide_mnemonic);
                    self.slot(U16, pc + 1, "index");
                    pc += 3;
                    if wide_opcode == 0x84 {
                        // wide iinc carries a 16-bit increment
                        self.slot(U16, pc, "constant");
                        pc += 2;
                    }
                }
                Operands::TableSwitch => {
                    while (pc - start) % 4 != 0 {
                        self.slot(U8, pc, "pad");
                        pc += 1;
                    }
                    if pc + 12 > end {
                        break 'stream;
                    }
                    self.slot(U32, pc, "defaultOffset");
                    let low = self.class.i32_be_at(pc + 4)?;
                    let high = self.class.i32_be_at(pc + 8)?;
                    self.slot(U32, pc + 4, "lowValue");
                    self.slot(U32, pc + 8, "highValue");
                    pc += 12;
                    if high < low {
                        break 'stream;
                    }
                    // widen before subtracting: the bound pair spans i32
                    let entries = i64::from(high) - i64::from(low) + 1;
                    for _ in 0..entries {
                        if pc + 4 > end {
                            break 'stream;
                        }
                        self.slot(U32, pc, "offset");
                        pc += 4;
                    }
                }
                Operands::LookupSwitch => {
                    while (pc - start) % 4 != 0 {
                        self.slot(U8, pc, "pad");
                        pc += 1;
                    }
                    if pc + 8 > end {
                        break 'stream;
                    }
                    self.slot(U32, pc, "defaultOffset");
                    let pairs = self.class.i32_be_at(pc + 4)?;
                    self.slot(U32, pc + 4, "npairs");
                    pc += 8;
                    if pairs < 0 {
                        break 'stream;
                    }
                    for _ in 0..pairs {
                        if pc + 8 > end {
                            break 'stream;
                        }
                        self.slot(U32, pc, "matchValue");
                        self.slot(U32, pc + 4, "offset");
                        pc += 8;
                    }
                }
            }
            if pc > end {
                break;
            }
        }
        for pad in end..(start + rounded) {
            self.slot(U8, pad, "pad");
        }
        self.section(start, rounded, "methodBytecodes");
        Some(start + rounded)
    }

    fn walk_exception_table(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, 4)?;
        let catch_count = self.class.u16_at(start)? as u32;
        let throw_count = self.class.u16_at(start + 2)? as u32;
        self.slot(U16, start, "catchCount");
        self.slot(U16, start + 2, "throwCount");

        let mut cursor = start + 4;
        self.require(cursor, catch_count.checked_mul(16)?)?;
        for _ in 0..catch_count {
            self.slot(U32, cursor, "startPC");
            self.slot(U32, cursor + 4, "endPC");
            self.slot(U32, cursor + 8, "handlerPC");
            self.slot(SrpToUtf8, cursor + 12, "catchType");
            cursor += 16;
        }
        self.require(cursor, throw_count.checked_mul(4)?)?;
        for _ in 0..throw_count {
            self.slot(SrpToUtf8, cursor, "throwTypeName");
            cursor += 4;
        }
        self.section(start, cursor - start, "exceptionTable");
        Some(cursor)
    }

    /// One length-prefixed annotation block plus its alignment padding
    ///
    /// The class-data slot covers the 4-byte length prefix and the content;
    /// the 0-3 pad bytes to the next 4-byte boundary are walked separately.
    fn walk_annotation_block(&mut self, start: u32, name: &'static str) -> Option<u32> {
        self.require(start, 4)?;
        let content = self.class.u32_at(start)?;
        let total = content.checked_add(4)?;
        let padded = total.checked_add(3)? & !3;
        self.require(start, padded)?;
        self.slot(SlotType::ClassData, start, "annotationData");
        for pad in (start + total)..(start + padded) {
            self.slot(SlotType::U8, pad, "annotationPad");
        }
        self.section(start, padded, name);
        Some(start + padded)
    }

    /// The low tag bit of the debug-info slot selects inline vs out-of-line
    /// data; an out-of-line target the validator rejects is still reported
    /// as the single reference slot, without descending
    fn walk_debug_info(&mut self, start: u32) -> Option<u32> {
        self.require(start, 4)?;
        let raw = self.class.u32_at(start)?;
        self.slot(SlotType::U32, start, "debugInfo");
        let after = start + 4;
        if raw & 1 == 1 {
            self.walk_debug_block(after)
        } else {
            if raw != 0 && self.trusted(raw, DEBUG_HEADER_SIZE) {
                // out-of-line blocks do not advance the method cursor
                let _ = self.walk_debug_block(raw);
            }
            Some(after)
        }
    }

    fn walk_debug_block(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, DEBUG_HEADER_SIZE)?;
        let size = self.class.u32_at(start)?;
        if size < DEBUG_HEADER_SIZE {
            return None;
        }
        self.require(start, size)?;
        self.slot(U32, start, "debugSize");
        self.slot(U32, start + 4, "lineNumberCount");
        self.slot(U32, start + 8, "varInfoCount");
        self.slot(U32, start + 12, "lineNumberTableSize");

        let line_table_size = self.class.u32_at(start + 12)?;
        let var_count = self.class.u32_at(start + 8)?;
        let mut cursor = start + DEBUG_HEADER_SIZE;

        // compressed line-number stream: no structure imposed at this layer
        if cursor.checked_add(line_table_size)? > start + size {
            return None;
        }
        for byte in cursor..(cursor + line_table_size) {
            self.slot(U8, byte, "lineNumberData");
        }
        cursor += line_table_size;

        for (offset, _info) in VariableInfoIter::new(self.class, cursor, var_count) {
            if offset + VARIABLE_INFO_SIZE > start + size {
                return None;
            }
            self.slot(U32, offset, "slotNumber");
            self.slot(U32, offset + 4, "visibleStartPC");
            self.slot(U32, offset + 8, "visibleLength");
            self.slot(SrpToUtf8, offset + 12, "variableName");
            self.slot(SrpToUtf8, offset + 16, "variableSignature");
            self.slot(SrpToUtf8, offset + 20, "variableGenericSignature");
            cursor = offset + VARIABLE_INFO_SIZE;
        }
        for pad in cursor..(start + size) {
            self.slot(U8, pad, "debugPad");
        }
        self.section(start, size, "methodDebugInfo");
        Some(start + size)
    }

    fn walk_stack_map(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, 8)?;
        let size = self.class.u32_at(start)?;
        if size < 8 {
            return None;
        }
        self.require(start, size)?;
        self.slot(U32, start, "stackMapSize");
        // frame count is big-endian in the record regardless of host
        let frame_count = self.class.u16_be_at(start + 4)?;
        self.slot(U16, start + 4, "numberOfStackFrames");

        let end = start + size;
        let mut cursor = start + 6;
        'frames: for _ in 0..frame_count {
            if cursor >= end {
                break;
            }
            let tag = self.class.u8_at(cursor)?;
            self.slot(U8, cursor, "frameType");
            cursor += 1;
            match tag {
                0..=63 => {}
                64..=127 => {
                    cursor = self.walk_verification_type(cursor, end)?;
                }
                // reserved range: nothing valid can follow
                128..=246 => break 'frames,
                247 => {
                    if cursor + 2 > end {
                        break 'frames;
                    }
                    self.slot(U16, cursor, "offsetDelta");
                    cursor += 2;
                    cursor = self.walk_verification_type(cursor, end)?;
                }
                248..=251 => {
                    if cursor + 2 > end {
                        break 'frames;
                    }
                    self.slot(U16, cursor, "offsetDelta");
                    cursor += 2;
                }
                252..=254 => {
                    if cursor + 2 > end {
                        break 'frames;
                    }
                    self.slot(U16, cursor, "offsetDelta");
                    cursor += 2;
                    for _ in 0..(tag - 251) {
                        cursor = self.walk_verification_type(cursor, end)?;
                    }
                }
                255 => {
                    if cursor + 4 > end {
                        break 'frames;
                    }
                    self.slot(U16, cursor, "offsetDelta");
                    let locals = self.class.u16_be_at(cursor + 2)?;
                    self.slot(U16, cursor + 2, "localsCount");
                    cursor += 4;
                    for _ in 0..locals {
                        cursor = self.walk_verification_type(cursor, end)?;
                    }
                    if cursor + 2 > end {
                        break 'frames;
                    }
                    let stack_items = self.class.u16_be_at(cursor)?;
                    self.slot(U16, cursor, "stackItemsCount");
                    cursor += 2;
                    for _ in 0..stack_items {
                        cursor = self.walk_verification_type(cursor, end)?;
                    }
                }
            }
        }
        for pad in cursor..end {
            self.slot(U8, pad, "stackMapPad");
        }
        self.section(start, size, "stackMap");
        Some(end)
    }

    /// One verification type: a tag byte, plus a 16-bit argument for the
    /// Object (7) and Uninitialized (8) tags only
    fn walk_verification_type(&mut self, start: u32, end: u32) -> Option<u32> {
        if start >= end {
            return None;
        }
        let tag = self.class.u8_at(start)?;
        self.slot(SlotType::U8, start, "verificationType");
        match tag {
            7 => {
                if start + 3 > end {
                    return None;
                }
                self.slot(SlotType::U16, start + 1, "constantPoolIndex");
                Some(start + 3)
            }
            8 => {
                if start + 3 > end {
                    return None;
                }
                self.slot(SlotType::U16, start + 1, "offset");
                Some(start + 3)
            }
            _ => Some(start + 1),
        }
    }

    fn walk_method_parameters(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, 4)?;
        let count = self.class.u32_at(start)?;
        self.slot(U32, start, "parameterCount");
        let mut cursor = start + 4;
        self.require(cursor, count.checked_mul(8)?)?;
        for _ in 0..count {
            self.slot(SrpToUtf8, cursor, "parameterName");
            self.slot(U32, cursor + 4, "parameterFlags");
            cursor += 8;
        }
        self.section(start, cursor - start, "methodParameters");
        Some(cursor)
    }

    fn walk_fields(&mut self) {
        let count = self.class.rom_field_count();
        let start = match self.class.srp_at(header::ROM_FIELDS) {
            Some(start) if count > 0 => start,
            _ => return,
        };
        let mut cursor = start;
        for _ in 0..count {
            match self.walk_field(cursor) {
                Some(end) => {
                    self.section(cursor, end - cursor, "field");
                    cursor = end;
                }
                None => break,
            }
        }
        if cursor > start {
            self.section(start, cursor - start, "fields");
        }
    }

    fn walk_field(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, FIELD_HEADER_SIZE)?;
        self.slot(SrpToUtf8, start, "name");
        self.slot(SrpToUtf8, start + 4, "signature");
        self.slot(U32, start + 8, "modifiers");

        let modifiers = FieldModifiers::from_bits_truncate(self.class.u32_at(start + 8)?);
        let mut cursor = start + FIELD_HEADER_SIZE;
        if modifiers.contains(FieldModifiers::HAS_CONSTANT_VALUE) {
            if modifiers.contains(FieldModifiers::IS_DOUBLE_WIDE) {
                self.require(cursor, 8)?;
                self.slot(U64, cursor, "initialValue");
                cursor += 8;
            } else {
                self.require(cursor, 4)?;
                self.slot(U32, cursor, "initialValue");
                cursor += 4;
            }
        }
        if modifiers.contains(FieldModifiers::HAS_GENERIC_SIGNATURE) {
            self.require(cursor, 4)?;
            self.slot(SrpToUtf8, cursor, "fieldGenericSignature");
            cursor += 4;
        }
        if modifiers.contains(FieldModifiers::HAS_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "fieldAnnotations")?;
        }
        if modifiers.contains(FieldModifiers::HAS_TYPE_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "fieldTypeAnnotations")?;
        }
        Some(cursor)
    }

    fn walk_cp_shape_description(&mut self) {
        let count = self.class.rom_constant_pool_count();
        let start = match self.class.srp_at(header::CP_SHAPE_DESCRIPTION) {
            Some(start) if count > 0 => start,
            _ => return,
        };
        let words = CpShape::words_for(count);
        let length = words * 4;
        if !self.trusted(start, length) {
            return;
        }
        for i in 0..words {
            self.slot(SlotType::U32, start + i * 4, "shapeWord");
        }
        self.section(start, length, "cpShapeDescription");
    }

    fn walk_constant_pool(&mut self) {
        use super::constant_pool::CP_ENTRY_SIZE;
        use SlotType::*;

        let count = self.class.rom_constant_pool_count();
        let pool = match self.class.srp_at(header::CONSTANT_POOL) {
            Some(pool) if count > 0 => pool,
            _ => return,
        };
        let shapes_at = match self.class.srp_at(header::CP_SHAPE_DESCRIPTION) {
            Some(shapes_at) => shapes_at,
            None => return,
        };
        let words = CpShape::words_for(count);
        let pool_length = match count.checked_mul(CP_ENTRY_SIZE) {
            Some(pool_length) => pool_length,
            None => return,
        };
        if !self.trusted(shapes_at, words * 4) || !self.trusted(pool, pool_length) {
            return;
        }
        let mut shape_words = Vec::with_capacity(words as usize);
        for i in 0..words {
            match self.class.u32_at(shapes_at + i * 4) {
                Some(word) => shape_words.push(word),
                None => return,
            }
        }

        for index in 0..count {
            let entry = pool + index * CP_ENTRY_SIZE;
            // an unknown shape nibble panics: every new constant-pool shape
            // must be added explicitly, never silently skipped
            match CpShape::of_entry(&shape_words, index) {
                CpShape::Unused => {
                    self.slot(U32, entry, "unused");
                    self.slot(U32, entry + 4, "unused");
                }
                CpShape::Class => {
                    self.slot(SrpToUtf8, entry, "className");
                    self.slot(U32, entry + 4, "reserved");
                }
                CpShape::String => {
                    self.slot(SrpToUtf8, entry, "stringUTF8");
                    self.slot(U32, entry + 4, "reserved");
                }
                CpShape::Int => {
                    self.slot(U32, entry, "intValue");
                    self.slot(U32, entry + 4, "reserved");
                }
                CpShape::Float => {
                    self.slot(U32, entry, "floatValue");
                    self.slot(U32, entry + 4, "reserved");
                }
                CpShape::Long => {
                    self.slot(U64, entry, "longValue");
                }
                CpShape::Double => {
                    self.slot(U64, entry, "doubleValue");
                }
                CpShape::FieldRef => {
                    self.slot(U32, entry, "classRefCPIndex");
                    self.slot(SrpToNameAndSignature, entry + 4, "nameAndSignature");
                }
                CpShape::MethodRef | CpShape::InterfaceMethodRef => {
                    self.slot(U32, entry, "classRefCPIndex");
                    self.slot(SrpToNameAndSignature, entry + 4, "nameAndSignature");
                }
                CpShape::MethodType => {
                    self.slot(SrpToUtf8, entry, "methodTypeSignature");
                    self.slot(U32, entry + 4, "reserved");
                }
                CpShape::MethodHandle => {
                    self.slot(U32, entry, "handleKind");
                    self.slot(U32, entry + 4, "methodIndex");
                }
                CpShape::ConstantDynamic => {
                    self.slot(U32, entry, "bsmIndex");
                    self.slot(SrpToNameAndSignature, entry + 4, "nameAndSignature");
                }
            }
        }
        self.section(pool, pool_length, "constantPool");
    }

    fn walk_call_site_data(&mut self) {
        use SlotType::*;

        let call_site_count = self.class.u32_at(header::CALL_SITE_COUNT).unwrap_or(0);
        let bsm_count = self.class.u32_at(header::BSM_COUNT).unwrap_or(0);
        let start = match self.class.srp_at(header::CALL_SITE_DATA) {
            Some(start) if call_site_count > 0 || bsm_count > 0 => start,
            _ => return,
        };

        let nas_bytes = match call_site_count.checked_mul(4) {
            Some(nas_bytes) => nas_bytes,
            None => return,
        };
        let mut cursor = start;
        if !self.trusted(cursor, nas_bytes) {
            return;
        }
        for _ in 0..call_site_count {
            self.slot(SrpToNameAndSignature, cursor, "callSiteNAS");
            cursor += 4;
        }
        // half the NAS table width, so this cannot wrap
        let index_bytes = call_site_count * 2;
        let padded = (index_bytes + 3) & !3;
        if !self.trusted(cursor, padded) {
            return;
        }
        for _ in 0..call_site_count {
            self.slot(U16, cursor, "callSiteBSMIndex");
            cursor += 2;
        }
        for _ in 0..(padded - index_bytes) {
            self.slot(U8, cursor, "pad");
            cursor += 1;
        }
        for _ in 0..bsm_count {
            if !self.trusted(cursor, 8) {
                return;
            }
            self.slot(U32, cursor, "bootstrapMethodHandleRef");
            let arguments = match self.class.u32_at(cursor + 4) {
                Some(arguments) => arguments,
                None => return,
            };
            self.slot(U32, cursor + 4, "argumentCount");
            cursor += 8;
            let argument_bytes = match arguments.checked_mul(4) {
                Some(argument_bytes) => argument_bytes,
                None => return,
            };
            if !self.trusted(cursor, argument_bytes) {
                return;
            }
            for _ in 0..arguments {
                self.slot(U32, cursor, "bsmArgument");
                cursor += 4;
            }
        }
        self.section(start, cursor - start, "callSiteData");
    }

    /// The optional-info run: one slot per set flag, consumed lowest bit
    /// first; each present field shifts every following one, so the order
    /// here is load-bearing
    fn walk_optional_info(&mut self) {
        use SlotType::*;

        let flags = OptionalFlags::from_bits_truncate(self.class.u32_at(header::OPTIONAL_FLAGS).unwrap_or(0));
        let start = match self.class.srp_at(header::OPTIONAL_INFO) {
            Some(start) if !flags.is_empty() => start,
            _ => return,
        };
        // a popcount of a u32, so the product stays well under any bound
        let slot_count = flags.bits().count_ones();
        if !self.trusted(start, slot_count * 4) {
            return;
        }

        let mut cursor = start;
        if flags.contains(OptionalFlags::SOURCE_FILE_NAME) {
            self.slot(SrpToUtf8, cursor, "sourceFileName");
            cursor += 4;
        }
        if flags.contains(OptionalFlags::GENERIC_SIGNATURE) {
            self.slot(SrpToUtf8, cursor, "genericSignature");
            cursor += 4;
        }
        if flags.contains(OptionalFlags::SOURCE_DEBUG_EXTENSION) {
            self.slot(Srp, cursor, "sourceDebugExtension");
            if let Some(target) = self.class.srp_at(cursor) {
                self.walk_source_debug_extension(target);
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::ENCLOSING_METHOD) {
            self.slot(Srp, cursor, "enclosingMethod");
            if let Some(target) = self.class.srp_at(cursor) {
                if self.trusted(target, 8) {
                    self.slot(U32, target, "enclosingMethodClassRefCPIndex");
                    self.slot(SrpToNameAndSignature, target + 4, "enclosingMethodNAS");
                    self.section(target, 8, "enclosingMethod");
                }
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::SIMPLE_NAME) {
            self.slot(SrpToUtf8, cursor, "simpleName");
            cursor += 4;
        }
        if flags.contains(OptionalFlags::VERIFY_EXCLUDE) {
            self.slot(U32, cursor, "verifyExclude");
            cursor += 4;
        }
        if flags.contains(OptionalFlags::CLASS_ANNOTATIONS) {
            self.slot(Srp, cursor, "classAnnotations");
            if let Some(target) = self.class.srp_at(cursor) {
                let _ = self.walk_annotation_block(target, "classAnnotations");
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::CLASS_TYPE_ANNOTATIONS) {
            self.slot(Srp, cursor, "classTypeAnnotations");
            if let Some(target) = self.class.srp_at(cursor) {
                let _ = self.walk_annotation_block(target, "classTypeAnnotations");
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::RECORD_ATTRIBUTE) {
            self.slot(Srp, cursor, "recordAttribute");
            if let Some(target) = self.class.srp_at(cursor) {
                self.walk_record_attribute(target);
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::PERMITTED_SUBCLASSES) {
            self.slot(Srp, cursor, "permittedSubclasses");
            if let Some(target) = self.class.srp_at(cursor) {
                self.walk_counted_utf8_list(target, "permittedSubclasses", "permittedSubclassCount", "permittedSubclassName");
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::INJECTED_INTERFACES) {
            self.slot(U32, cursor, "injectedInterfaces");
            cursor += 4;
        }
        if flags.contains(OptionalFlags::LOADABLE_DESCRIPTORS) {
            self.slot(Srp, cursor, "loadableDescriptors");
            if let Some(target) = self.class.srp_at(cursor) {
                self.walk_counted_utf8_list(target, "loadableDescriptors", "loadableDescriptorCount", "loadableDescriptor");
            }
            cursor += 4;
        }
        if flags.contains(OptionalFlags::IMPLICIT_CREATION) {
            self.slot(Srp, cursor, "implicitCreation");
            if let Some(target) = self.class.srp_at(cursor) {
                if self.trusted(target, 4) {
                    self.slot(U32, target, "implicitCreationFlags");
                }
            }
            cursor += 4;
        }
        self.section(start, cursor - start, "optionalInfo");
    }

    fn walk_source_debug_extension(&mut self, start: u32) {
        if !self.trusted(start, 4) {
            return;
        }
        let content = match self.class.u32_at(start) {
            Some(content) => content,
            None => return,
        };
        if self.trusted(start, 4 + content) {
            self.slot(SlotType::ClassData, start, "sourceDebugExtension");
        }
    }

    fn walk_counted_utf8_list(
        &mut self,
        start: u32,
        section_name: &'static str,
        count_name: &'static str,
        entry_name: &'static str,
    ) {
        if !self.trusted(start, 4) {
            return;
        }
        let count = match self.class.u32_at(start) {
            Some(count) => count,
            None => return,
        };
        let length = match count.checked_mul(4).and_then(|entries| entries.checked_add(4)) {
            Some(length) => length,
            None => return,
        };
        if !self.trusted(start, length) {
            return;
        }
        self.slot(SlotType::U32, start, count_name);
        for i in 0..count {
            self.slot(SlotType::SrpToUtf8, start + 4 + i * 4, entry_name);
        }
        self.section(start, length, section_name);
    }

    fn walk_record_attribute(&mut self, start: u32) {
        use SlotType::*;

        if !self.trusted(start, 4) {
            return;
        }
        let count = match self.class.u32_at(start) {
            Some(count) => count,
            None => return,
        };
        self.slot(U32, start, "recordComponentCount");
        let mut cursor = start + 4;
        for _ in 0..count {
            match self.walk_record_component(cursor) {
                Some(end) => {
                    self.section(cursor, end - cursor, "recordComponent");
                    cursor = end;
                }
                None => break,
            }
        }
        self.section(start, cursor - start, "recordAttribute");
    }

    fn walk_record_component(&mut self, start: u32) -> Option<u32> {
        use SlotType::*;

        self.require(start, 12)?;
        self.slot(SrpToUtf8, start, "name");
        self.slot(SrpToUtf8, start + 4, "signature");
        self.slot(U32, start + 8, "attributeFlags");
        let flags = super::RecordComponentFlags::from_bits_truncate(self.class.u32_at(start + 8)?);
        let mut cursor = start + 12;
        if flags.contains(super::RecordComponentFlags::HAS_GENERIC_SIGNATURE) {
            self.require(cursor, 4)?;
            self.slot(SrpToUtf8, cursor, "componentGenericSignature");
            cursor += 4;
        }
        if flags.contains(super::RecordComponentFlags::HAS_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "componentAnnotations")?;
        }
        if flags.contains(super::RecordComponentFlags::HAS_TYPE_ANNOTATIONS) {
            cursor = self.walk_annotation_block(cursor, "componentTypeAnnotations")?;
        }
        Some(cursor)
    }
}

/// One entry of a debug-info variable table
#[derive(Debug, Clone, Copy)]
pub struct VariableInfo {
    pub slot_number: u32,
    pub visible_start_pc: u32,
    pub visible_length: u32,
    pub name_srp: Option<u32>,
    pub signature_srp: Option<u32>,
    pub generic_signature_srp: Option<u32>,
}

/// Iterator over the variable table of an inline or out-of-line debug block
///
/// Yields `(entry offset, entry)`; stops early if an entry would run past
/// the physical end of the record.
pub struct VariableInfoIter<'a> {
    class: RomClass<'a>,
    offset: u32,
    remaining: u32,
}

impl<'a> VariableInfoIter<'a> {
    pub fn new(class: RomClass<'a>, offset: u32, count: u32) -> VariableInfoIter<'a> {
        VariableInfoIter {
            class,
            offset,
            remaining: count,
        }
    }
}

impl<'a> Iterator for VariableInfoIter<'a> {
    type Item = (u32, VariableInfo);

    fn next(&mut self) -> Option<(u32, VariableInfo)> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.offset;
        self.class.bytes(offset, VARIABLE_INFO_SIZE)?;
        let info = VariableInfo {
            slot_number: self.class.u32_at(offset)?,
            visible_start_pc: self.class.u32_at(offset + 4)?,
            visible_length: self.class.u32_at(offset + 8)?,
            name_srp: self.class.srp_at(offset + 12),
            signature_srp: self.class.srp_at(offset + 16),
            generic_signature_srp: self.class.srp_at(offset + 20),
        };
        self.remaining -= 1;
        self.offset = offset + VARIABLE_INFO_SIZE;
        Some((offset, info))
    }
}
