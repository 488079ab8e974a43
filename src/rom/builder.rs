//! Assembling well-formed ROM-class records
//!
//! The inverse of the walker, used by the test suite and as a fixture
//! generator: declare a class shape at the logical level and get back a byte
//! blob whose layout the walker accounts for byte-exactly. Strings are
//! interned into a single trailing UTF8 block; name-and-signature pairs into
//! a shared NAS table; every cross-reference is written as a record-base
//! offset once the final layout is known.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashMap;

use super::constant_pool::{CpShape, CP_ENTRY_SIZE};
use super::walk::{DEBUG_HEADER_SIZE, METHOD_HEADER_SIZE, VARIABLE_INFO_SIZE};
use super::{header, FieldModifiers, MethodExtendedModifiers, OptionalFlags, RecordComponentFlags};

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

fn put_u16_be(buf: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    BigEndian::write_u16(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

fn align4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Where a patched `u32` cell should eventually point
#[derive(Copy, Clone, Debug)]
enum Patch {
    /// Offset of an interned UTF8 string
    Utf8(usize),
    /// Offset of an interned name-and-signature pair
    Nas(usize),
    /// Offset of a layout piece (0 if the piece ends up empty)
    Piece(usize),
}

/// One independently-positioned chunk of the final blob
#[derive(Default)]
struct Piece {
    bytes: Vec<u8>,
    patches: Vec<(usize, Patch)>,
}

impl Piece {
    fn patch_slot(&mut self, patch: Patch) {
        self.patches.push((self.bytes.len(), patch));
        put_u32(&mut self.bytes, 0);
    }
}

// Piece indexes; assembly order matches this numbering
const PIECE_METHODS: usize = 0;
const PIECE_FIELDS: usize = 1;
const PIECE_INTERFACES: usize = 2;
const PIECE_INNER_CLASSES: usize = 3;
const PIECE_NEST_MEMBERS: usize = 4;
const PIECE_CP_SHAPE: usize = 5;
const PIECE_CONSTANT_POOL: usize = 6;
const PIECE_CALL_SITE_DATA: usize = 7;
const PIECE_OPTIONAL_INFO: usize = 8;
const PIECE_OPT_SDE: usize = 9;
const PIECE_OPT_ENCLOSING: usize = 10;
const PIECE_OPT_CLASS_ANNOTATIONS: usize = 11;
const PIECE_OPT_CLASS_TYPE_ANNOTATIONS: usize = 12;
const PIECE_OPT_RECORD: usize = 13;
const PIECE_OPT_PERMITTED: usize = 14;
const PIECE_OPT_LOADABLE: usize = 15;
const PIECE_OPT_IMPLICIT: usize = 16;
const PIECE_VAR_HANDLE: usize = 17;
const PIECE_STATIC_SPLIT: usize = 18;
const PIECE_SPECIAL_SPLIT: usize = 19;
const PIECE_NAS: usize = 20;
const PIECE_COUNT: usize = 21;

/// Interning pool for UTF8 strings and name-and-signature pairs
#[derive(Default)]
struct Interner {
    strings: Vec<Vec<u8>>,
    string_ids: HashMap<Vec<u8>, usize>,
    nas_pairs: Vec<(usize, usize)>,
    nas_ids: HashMap<(usize, usize), usize>,
}

impl Interner {
    fn utf8(&mut self, value: &str) -> usize {
        let bytes = value.as_bytes().to_vec();
        if let Some(&id) = self.string_ids.get(&bytes) {
            return id;
        }
        let id = self.strings.len();
        self.string_ids.insert(bytes.clone(), id);
        self.strings.push(bytes);
        id
    }

    fn nas(&mut self, name: &str, signature: &str) -> usize {
        let pair = (self.utf8(name), self.utf8(signature));
        if let Some(&id) = self.nas_ids.get(&pair) {
            return id;
        }
        let id = self.nas_pairs.len();
        self.nas_ids.insert(pair, id);
        self.nas_pairs.push(pair);
        id
    }
}

/// Constant initial value of a static field
#[derive(Copy, Clone, Debug)]
pub enum FieldConstant {
    Single(u32),
    Double(u64),
}

/// One constant-pool entry, by shape
#[derive(Clone, Debug)]
pub enum CpEntry {
    Unused,
    Class(String),
    Str(String),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    FieldRef { class_index: u32, name: String, signature: String },
    MethodRef { class_index: u32, name: String, signature: String },
    InterfaceMethodRef { class_index: u32, name: String, signature: String },
    MethodType(String),
    MethodHandle { kind: u32, method_index: u32 },
    ConstantDynamic { bsm_index: u32, name: String, signature: String },
}

impl CpEntry {
    fn shape(&self) -> CpShape {
        match self {
            CpEntry::Unused => CpShape::Unused,
            CpEntry::Class(_) => CpShape::Class,
            CpEntry::Str(_) => CpShape::String,
            CpEntry::Int(_) => CpShape::Int,
            CpEntry::Float(_) => CpShape::Float,
            CpEntry::Long(_) => CpShape::Long,
            CpEntry::Double(_) => CpShape::Double,
            CpEntry::FieldRef { .. } => CpShape::FieldRef,
            CpEntry::MethodRef { .. } => CpShape::MethodRef,
            CpEntry::InterfaceMethodRef { .. } => CpShape::InterfaceMethodRef,
            CpEntry::MethodType(_) => CpShape::MethodType,
            CpEntry::MethodHandle { .. } => CpShape::MethodHandle,
            CpEntry::ConstantDynamic { .. } => CpShape::ConstantDynamic,
        }
    }
}

/// One catch-handler row of an exception table
#[derive(Clone, Debug)]
pub struct CatchEntry {
    pub start_pc: u32,
    pub end_pc: u32,
    pub handler_pc: u32,
    /// `None` catches everything
    pub catch_type: Option<String>,
}

/// One entry of a debug-info variable table
#[derive(Clone, Debug)]
pub struct VariableEntry {
    pub slot_number: u32,
    pub visible_start_pc: u32,
    pub visible_length: u32,
    pub name: String,
    pub signature: String,
    pub generic_signature: Option<String>,
}

/// Inline per-method debug information
#[derive(Clone, Debug, Default)]
pub struct DebugInfoBuilder {
    /// Compressed line-number stream, opaque at this layer
    pub line_number_data: Vec<u8>,
    pub line_number_count: u32,
    pub variables: Vec<VariableEntry>,
}

/// Declarative description of one method
#[derive(Clone, Debug)]
pub struct MethodBuilder {
    name: String,
    signature: String,
    modifiers: u32,
    max_stack: u16,
    arg_count: u16,
    temp_count: u16,
    bytecodes: Vec<u8>,
    generic_signature: Option<String>,
    catches: Vec<CatchEntry>,
    throws: Vec<String>,
    annotations: Option<Vec<u8>>,
    parameter_annotations: Option<Vec<u8>>,
    default_annotation: Option<Vec<u8>>,
    method_type_annotations: Option<Vec<u8>>,
    code_type_annotations: Option<Vec<u8>>,
    debug_info: Option<DebugInfoBuilder>,
    stack_map: Option<(u16, Vec<u8>)>,
    parameters: Vec<(Option<String>, u32)>,
}

impl MethodBuilder {
    pub fn new(name: &str, signature: &str) -> MethodBuilder {
        MethodBuilder {
            name: name.to_string(),
            signature: signature.to_string(),
            modifiers: 0x0001,
            max_stack: 1,
            arg_count: 0,
            temp_count: 0,
            bytecodes: Vec::new(),
            generic_signature: None,
            catches: Vec::new(),
            throws: Vec::new(),
            annotations: None,
            parameter_annotations: None,
            default_annotation: None,
            method_type_annotations: None,
            code_type_annotations: None,
            debug_info: None,
            stack_map: None,
            parameters: Vec::new(),
        }
    }

    pub fn modifiers(mut self, modifiers: u32) -> MethodBuilder {
        self.modifiers = modifiers;
        self
    }

    pub fn max_stack(mut self, max_stack: u16) -> MethodBuilder {
        self.max_stack = max_stack;
        self
    }

    pub fn arg_count(mut self, arg_count: u16) -> MethodBuilder {
        self.arg_count = arg_count;
        self
    }

    pub fn temp_count(mut self, temp_count: u16) -> MethodBuilder {
        self.temp_count = temp_count;
        self
    }

    pub fn bytecodes(mut self, bytecodes: Vec<u8>) -> MethodBuilder {
        self.bytecodes = bytecodes;
        self
    }

    pub fn generic_signature(mut self, signature: &str) -> MethodBuilder {
        self.generic_signature = Some(signature.to_string());
        self
    }

    pub fn catch(mut self, entry: CatchEntry) -> MethodBuilder {
        self.catches.push(entry);
        self
    }

    pub fn throws(mut self, class_name: &str) -> MethodBuilder {
        self.throws.push(class_name.to_string());
        self
    }

    pub fn annotations(mut self, data: Vec<u8>) -> MethodBuilder {
        self.annotations = Some(data);
        self
    }

    pub fn parameter_annotations(mut self, data: Vec<u8>) -> MethodBuilder {
        self.parameter_annotations = Some(data);
        self
    }

    pub fn default_annotation(mut self, data: Vec<u8>) -> MethodBuilder {
        self.default_annotation = Some(data);
        self
    }

    pub fn method_type_annotations(mut self, data: Vec<u8>) -> MethodBuilder {
        self.method_type_annotations = Some(data);
        self
    }

    pub fn code_type_annotations(mut self, data: Vec<u8>) -> MethodBuilder {
        self.code_type_annotations = Some(data);
        self
    }

    pub fn debug_info(mut self, debug_info: DebugInfoBuilder) -> MethodBuilder {
        self.debug_info = Some(debug_info);
        self
    }

    /// Raw stack-map frames, already in record encoding (big-endian counts)
    pub fn stack_map(mut self, frame_count: u16, frames: Vec<u8>) -> MethodBuilder {
        self.stack_map = Some((frame_count, frames));
        self
    }

    pub fn parameter(mut self, name: Option<&str>, flags: u32) -> MethodBuilder {
        self.parameters.push((name.map(str::to_string), flags));
        self
    }

    fn extended_modifiers(&self) -> MethodExtendedModifiers {
        let mut extended = MethodExtendedModifiers::empty();
        if self.generic_signature.is_some() {
            extended |= MethodExtendedModifiers::HAS_GENERIC_SIGNATURE;
        }
        if !self.catches.is_empty() || !self.throws.is_empty() {
            extended |= MethodExtendedModifiers::HAS_EXCEPTION_TABLE;
        }
        if self.annotations.is_some() {
            extended |= MethodExtendedModifiers::HAS_ANNOTATIONS;
        }
        if self.parameter_annotations.is_some() {
            extended |= MethodExtendedModifiers::HAS_PARAMETER_ANNOTATIONS;
        }
        if self.default_annotation.is_some() {
            extended |= MethodExtendedModifiers::HAS_DEFAULT_ANNOTATION;
        }
        if self.method_type_annotations.is_some() {
            extended |= MethodExtendedModifiers::HAS_METHOD_TYPE_ANNOTATIONS;
        }
        if self.code_type_annotations.is_some() {
            extended |= MethodExtendedModifiers::HAS_CODE_TYPE_ANNOTATIONS;
        }
        if self.debug_info.is_some() {
            extended |= MethodExtendedModifiers::HAS_DEBUG_INFO;
        }
        if self.stack_map.is_some() {
            extended |= MethodExtendedModifiers::HAS_STACK_MAP;
        }
        if !self.parameters.is_empty() {
            extended |= MethodExtendedModifiers::HAS_METHOD_PARAMETERS;
        }
        extended
    }

    fn serialize(&self, piece: &mut Piece, interner: &mut Interner) {
        let start = piece.bytes.len();
        piece.patch_slot(Patch::Utf8(interner.utf8(&self.name)));
        piece.patch_slot(Patch::Utf8(interner.utf8(&self.signature)));
        put_u32(&mut piece.bytes, self.modifiers);
        put_u32(&mut piece.bytes, self.extended_modifiers().bits());
        put_u16(&mut piece.bytes, self.max_stack);
        put_u16(&mut piece.bytes, self.arg_count);
        put_u16(&mut piece.bytes, self.temp_count);
        put_u16(&mut piece.bytes, 0);
        put_u32(&mut piece.bytes, self.bytecodes.len() as u32);
        debug_assert_eq!(piece.bytes.len() - start, METHOD_HEADER_SIZE as usize);

        piece.bytes.extend_from_slice(&self.bytecodes);
        align4(&mut piece.bytes);

        if let Some(generic) = &self.generic_signature {
            piece.patch_slot(Patch::Utf8(interner.utf8(generic)));
        }
        if !self.catches.is_empty() || !self.throws.is_empty() {
            put_u16(&mut piece.bytes, self.catches.len() as u16);
            put_u16(&mut piece.bytes, self.throws.len() as u16);
            for entry in &self.catches {
                put_u32(&mut piece.bytes, entry.start_pc);
                put_u32(&mut piece.bytes, entry.end_pc);
                put_u32(&mut piece.bytes, entry.handler_pc);
                match &entry.catch_type {
                    Some(name) => piece.patch_slot(Patch::Utf8(interner.utf8(name))),
                    None => put_u32(&mut piece.bytes, 0),
                }
            }
            for name in &self.throws {
                piece.patch_slot(Patch::Utf8(interner.utf8(name)));
            }
        }
        for block in [
            &self.annotations,
            &self.parameter_annotations,
            &self.default_annotation,
            &self.method_type_annotations,
            &self.code_type_annotations,
        ]
        .into_iter()
        .flatten()
        {
            write_annotation_block(&mut piece.bytes, block);
        }
        if let Some(debug_info) = &self.debug_info {
            // low tag bit: the block is inline, right after this slot
            put_u32(&mut piece.bytes, 1);
            write_debug_block(piece, interner, debug_info);
        }
        if let Some((frame_count, frames)) = &self.stack_map {
            let mut size = 4 + 2 + frames.len() as u32;
            size = (size + 3) & !3;
            put_u32(&mut piece.bytes, size);
            put_u16_be(&mut piece.bytes, *frame_count);
            piece.bytes.extend_from_slice(frames);
            align4(&mut piece.bytes);
        }
        if !self.parameters.is_empty() {
            put_u32(&mut piece.bytes, self.parameters.len() as u32);
            for (name, flags) in &self.parameters {
                match name {
                    Some(name) => piece.patch_slot(Patch::Utf8(interner.utf8(name))),
                    None => put_u32(&mut piece.bytes, 0),
                }
                put_u32(&mut piece.bytes, *flags);
            }
        }
    }
}

fn write_annotation_block(buf: &mut Vec<u8>, content: &[u8]) {
    put_u32(buf, content.len() as u32);
    buf.extend_from_slice(content);
    align4(buf);
}

fn write_debug_block(piece: &mut Piece, interner: &mut Interner, debug_info: &DebugInfoBuilder) {
    let line_table = debug_info.line_number_data.len() as u32;
    let var_bytes = debug_info.variables.len() as u32 * VARIABLE_INFO_SIZE;
    let size = (DEBUG_HEADER_SIZE + line_table + var_bytes + 3) & !3;
    put_u32(&mut piece.bytes, size);
    put_u32(&mut piece.bytes, debug_info.line_number_count);
    put_u32(&mut piece.bytes, debug_info.variables.len() as u32);
    put_u32(&mut piece.bytes, line_table);
    piece.bytes.extend_from_slice(&debug_info.line_number_data);
    for variable in &debug_info.variables {
        put_u32(&mut piece.bytes, variable.slot_number);
        put_u32(&mut piece.bytes, variable.visible_start_pc);
        put_u32(&mut piece.bytes, variable.visible_length);
        piece.patch_slot(Patch::Utf8(interner.utf8(&variable.name)));
        piece.patch_slot(Patch::Utf8(interner.utf8(&variable.signature)));
        match &variable.generic_signature {
            Some(generic) => piece.patch_slot(Patch::Utf8(interner.utf8(generic))),
            None => put_u32(&mut piece.bytes, 0),
        }
    }
    align4(&mut piece.bytes);
}

/// Declarative description of one field
#[derive(Clone, Debug)]
pub struct FieldBuilder {
    name: String,
    signature: String,
    modifiers: u32,
    constant: Option<FieldConstant>,
    generic_signature: Option<String>,
    annotations: Option<Vec<u8>>,
    type_annotations: Option<Vec<u8>>,
}

impl FieldBuilder {
    pub fn new(name: &str, signature: &str) -> FieldBuilder {
        FieldBuilder {
            name: name.to_string(),
            signature: signature.to_string(),
            modifiers: 0x0001,
            constant: None,
            generic_signature: None,
            annotations: None,
            type_annotations: None,
        }
    }

    pub fn modifiers(mut self, modifiers: u32) -> FieldBuilder {
        self.modifiers = modifiers;
        self
    }

    pub fn constant(mut self, constant: FieldConstant) -> FieldBuilder {
        self.constant = Some(constant);
        self
    }

    pub fn generic_signature(mut self, signature: &str) -> FieldBuilder {
        self.generic_signature = Some(signature.to_string());
        self
    }

    pub fn annotations(mut self, data: Vec<u8>) -> FieldBuilder {
        self.annotations = Some(data);
        self
    }

    pub fn type_annotations(mut self, data: Vec<u8>) -> FieldBuilder {
        self.type_annotations = Some(data);
        self
    }

    fn effective_modifiers(&self) -> u32 {
        let mut flags = FieldModifiers::from_bits_truncate(self.modifiers);
        match self.constant {
            Some(FieldConstant::Single(_)) => flags |= FieldModifiers::HAS_CONSTANT_VALUE,
            Some(FieldConstant::Double(_)) => {
                flags |= FieldModifiers::HAS_CONSTANT_VALUE | FieldModifiers::IS_DOUBLE_WIDE
            }
            None => {}
        }
        if self.generic_signature.is_some() {
            flags |= FieldModifiers::HAS_GENERIC_SIGNATURE;
        }
        if self.annotations.is_some() {
            flags |= FieldModifiers::HAS_ANNOTATIONS;
        }
        if self.type_annotations.is_some() {
            flags |= FieldModifiers::HAS_TYPE_ANNOTATIONS;
        }
        flags.bits() | (self.modifiers & !FieldModifiers::all().bits())
    }

    fn serialize(&self, piece: &mut Piece, interner: &mut Interner) {
        piece.patch_slot(Patch::Utf8(interner.utf8(&self.name)));
        piece.patch_slot(Patch::Utf8(interner.utf8(&self.signature)));
        put_u32(&mut piece.bytes, self.effective_modifiers());
        match self.constant {
            Some(FieldConstant::Single(value)) => put_u32(&mut piece.bytes, value),
            Some(FieldConstant::Double(value)) => put_u64(&mut piece.bytes, value),
            None => {}
        }
        if let Some(generic) = &self.generic_signature {
            piece.patch_slot(Patch::Utf8(interner.utf8(generic)));
        }
        if let Some(block) = &self.annotations {
            write_annotation_block(&mut piece.bytes, block);
        }
        if let Some(block) = &self.type_annotations {
            write_annotation_block(&mut piece.bytes, block);
        }
    }
}

/// One record component of a record class
#[derive(Clone, Debug)]
pub struct RecordComponentBuilder {
    pub name: String,
    pub signature: String,
    pub generic_signature: Option<String>,
    pub annotations: Option<Vec<u8>>,
    pub type_annotations: Option<Vec<u8>>,
}

/// Top-level record assembler
pub struct RomClassBuilder {
    class_name: String,
    superclass_name: Option<String>,
    modifiers: u32,
    extra_modifiers: u32,
    major_version: u16,
    minor_version: u16,
    interfaces: Vec<String>,
    methods: Vec<MethodBuilder>,
    fields: Vec<FieldBuilder>,
    object_static_count: u32,
    double_scalar_static_count: u32,
    single_scalar_static_count: u32,
    constant_pool: Vec<CpEntry>,
    outer_class_name: Option<String>,
    member_access_flags: u32,
    inner_classes: Vec<String>,
    nest_host: Option<String>,
    nest_members: Vec<String>,
    call_sites: Vec<(String, String, u16)>,
    bootstrap_methods: Vec<(u32, Vec<u32>)>,
    source_file_name: Option<String>,
    generic_signature: Option<String>,
    source_debug_extension: Option<Vec<u8>>,
    enclosing_method: Option<(u32, String, String)>,
    simple_name: Option<String>,
    verify_exclude: bool,
    class_annotations: Option<Vec<u8>>,
    class_type_annotations: Option<Vec<u8>>,
    record_components: Vec<RecordComponentBuilder>,
    is_record: bool,
    permitted_subclasses: Vec<String>,
    injected_interfaces: bool,
    loadable_descriptors: Vec<String>,
    implicit_creation: Option<u32>,
    var_handle_method_types: Vec<u16>,
    static_split_refs: Vec<u16>,
    special_split_refs: Vec<u16>,
}

impl RomClassBuilder {
    pub fn new(class_name: &str) -> RomClassBuilder {
        RomClassBuilder {
            class_name: class_name.to_string(),
            superclass_name: Some("java/lang/Object".to_string()),
            modifiers: 0x0021,
            extra_modifiers: 0,
            major_version: 52,
            minor_version: 0,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            object_static_count: 0,
            double_scalar_static_count: 0,
            single_scalar_static_count: 0,
            constant_pool: Vec::new(),
            outer_class_name: None,
            member_access_flags: 0,
            inner_classes: Vec::new(),
            nest_host: None,
            nest_members: Vec::new(),
            call_sites: Vec::new(),
            bootstrap_methods: Vec::new(),
            source_file_name: None,
            generic_signature: None,
            source_debug_extension: None,
            enclosing_method: None,
            simple_name: None,
            verify_exclude: false,
            class_annotations: None,
            class_type_annotations: None,
            record_components: Vec::new(),
            is_record: false,
            permitted_subclasses: Vec::new(),
            injected_interfaces: false,
            loadable_descriptors: Vec::new(),
            implicit_creation: None,
            var_handle_method_types: Vec::new(),
            static_split_refs: Vec::new(),
            special_split_refs: Vec::new(),
        }
    }

    pub fn superclass(mut self, name: Option<&str>) -> RomClassBuilder {
        self.superclass_name = name.map(str::to_string);
        self
    }

    pub fn modifiers(mut self, modifiers: u32) -> RomClassBuilder {
        self.modifiers = modifiers;
        self
    }

    pub fn extra_modifiers(mut self, extra: u32) -> RomClassBuilder {
        self.extra_modifiers = extra;
        self
    }

    pub fn version(mut self, major: u16, minor: u16) -> RomClassBuilder {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    pub fn interface(mut self, name: &str) -> RomClassBuilder {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> RomClassBuilder {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldBuilder) -> RomClassBuilder {
        self.fields.push(field);
        self
    }

    pub fn static_counts(mut self, object: u32, double_scalar: u32, single_scalar: u32) -> RomClassBuilder {
        self.object_static_count = object;
        self.double_scalar_static_count = double_scalar;
        self.single_scalar_static_count = single_scalar;
        self
    }

    pub fn cp_entry(mut self, entry: CpEntry) -> RomClassBuilder {
        self.constant_pool.push(entry);
        self
    }

    pub fn outer_class(mut self, name: &str, member_access_flags: u32) -> RomClassBuilder {
        self.outer_class_name = Some(name.to_string());
        self.member_access_flags = member_access_flags;
        self
    }

    pub fn inner_class(mut self, name: &str) -> RomClassBuilder {
        self.inner_classes.push(name.to_string());
        self
    }

    pub fn nest_host(mut self, name: &str) -> RomClassBuilder {
        self.nest_host = Some(name.to_string());
        self
    }

    pub fn nest_member(mut self, name: &str) -> RomClassBuilder {
        self.nest_members.push(name.to_string());
        self
    }

    pub fn call_site(mut self, name: &str, signature: &str, bsm_index: u16) -> RomClassBuilder {
        self.call_sites.push((name.to_string(), signature.to_string(), bsm_index));
        self
    }

    pub fn bootstrap_method(mut self, method_handle_ref: u32, arguments: Vec<u32>) -> RomClassBuilder {
        self.bootstrap_methods.push((method_handle_ref, arguments));
        self
    }

    pub fn source_file_name(mut self, name: &str) -> RomClassBuilder {
        self.source_file_name = Some(name.to_string());
        self
    }

    pub fn generic_signature(mut self, signature: &str) -> RomClassBuilder {
        self.generic_signature = Some(signature.to_string());
        self
    }

    pub fn source_debug_extension(mut self, data: Vec<u8>) -> RomClassBuilder {
        self.source_debug_extension = Some(data);
        self
    }

    pub fn enclosing_method(mut self, class_ref_index: u32, name: &str, signature: &str) -> RomClassBuilder {
        self.enclosing_method = Some((class_ref_index, name.to_string(), signature.to_string()));
        self
    }

    pub fn simple_name(mut self, name: &str) -> RomClassBuilder {
        self.simple_name = Some(name.to_string());
        self
    }

    pub fn verify_exclude(mut self) -> RomClassBuilder {
        self.verify_exclude = true;
        self
    }

    pub fn class_annotations(mut self, data: Vec<u8>) -> RomClassBuilder {
        self.class_annotations = Some(data);
        self
    }

    pub fn class_type_annotations(mut self, data: Vec<u8>) -> RomClassBuilder {
        self.class_type_annotations = Some(data);
        self
    }

    pub fn record_component(mut self, component: RecordComponentBuilder) -> RomClassBuilder {
        self.record_components.push(component);
        self.is_record = true;
        self
    }

    pub fn permitted_subclass(mut self, name: &str) -> RomClassBuilder {
        self.permitted_subclasses.push(name.to_string());
        self
    }

    pub fn injected_interfaces(mut self) -> RomClassBuilder {
        self.injected_interfaces = true;
        self
    }

    pub fn loadable_descriptor(mut self, name: &str) -> RomClassBuilder {
        self.loadable_descriptors.push(name.to_string());
        self
    }

    pub fn implicit_creation(mut self, flags: u32) -> RomClassBuilder {
        self.implicit_creation = Some(flags);
        self
    }

    pub fn var_handle_method_type(mut self, index: u16) -> RomClassBuilder {
        self.var_handle_method_types.push(index);
        self
    }

    pub fn static_split_ref(mut self, cp_index: u16) -> RomClassBuilder {
        self.static_split_refs.push(cp_index);
        self
    }

    pub fn special_split_ref(mut self, cp_index: u16) -> RomClassBuilder {
        self.special_split_refs.push(cp_index);
        self
    }

    fn optional_flags(&self) -> OptionalFlags {
        let mut flags = OptionalFlags::empty();
        if self.source_file_name.is_some() {
            flags |= OptionalFlags::SOURCE_FILE_NAME;
        }
        if self.generic_signature.is_some() {
            flags |= OptionalFlags::GENERIC_SIGNATURE;
        }
        if self.source_debug_extension.is_some() {
            flags |= OptionalFlags::SOURCE_DEBUG_EXTENSION;
        }
        if self.enclosing_method.is_some() {
            flags |= OptionalFlags::ENCLOSING_METHOD;
        }
        if self.simple_name.is_some() {
            flags |= OptionalFlags::SIMPLE_NAME;
        }
        if self.verify_exclude {
            flags |= OptionalFlags::VERIFY_EXCLUDE;
        }
        if self.class_annotations.is_some() {
            flags |= OptionalFlags::CLASS_ANNOTATIONS;
        }
        if self.class_type_annotations.is_some() {
            flags |= OptionalFlags::CLASS_TYPE_ANNOTATIONS;
        }
        if self.is_record {
            flags |= OptionalFlags::RECORD_ATTRIBUTE;
        }
        if !self.permitted_subclasses.is_empty() {
            flags |= OptionalFlags::PERMITTED_SUBCLASSES;
        }
        if self.injected_interfaces {
            flags |= OptionalFlags::INJECTED_INTERFACES;
        }
        if !self.loadable_descriptors.is_empty() {
            flags |= OptionalFlags::LOADABLE_DESCRIPTORS;
        }
        if self.implicit_creation.is_some() {
            flags |= OptionalFlags::IMPLICIT_CREATION;
        }
        flags
    }

    /// Lay out and serialize the record
    pub fn build(&self) -> Vec<u8> {
        let mut interner = Interner::default();
        let mut pieces: Vec<Piece> = (0..PIECE_COUNT).map(|_| Piece::default()).collect();

        // intern the header strings first so fixture UTF8 blocks start with
        // the class name, which keeps dumps easy to eyeball
        let class_name_id = interner.utf8(&self.class_name);
        let superclass_id = self.superclass_name.as_ref().map(|name| interner.utf8(name));
        let outer_id = self.outer_class_name.as_ref().map(|name| interner.utf8(name));
        let nest_host_id = self.nest_host.as_ref().map(|name| interner.utf8(name));

        for method in &self.methods {
            method.serialize(&mut pieces[PIECE_METHODS], &mut interner);
        }
        for field in &self.fields {
            field.serialize(&mut pieces[PIECE_FIELDS], &mut interner);
        }
        for name in &self.interfaces {
            let id = interner.utf8(name);
            pieces[PIECE_INTERFACES].patch_slot(Patch::Utf8(id));
        }
        for name in &self.inner_classes {
            let id = interner.utf8(name);
            pieces[PIECE_INNER_CLASSES].patch_slot(Patch::Utf8(id));
        }
        for name in &self.nest_members {
            let id = interner.utf8(name);
            pieces[PIECE_NEST_MEMBERS].patch_slot(Patch::Utf8(id));
        }
        self.serialize_cp_shape(&mut pieces[PIECE_CP_SHAPE]);
        self.serialize_constant_pool(&mut pieces[PIECE_CONSTANT_POOL], &mut interner);
        self.serialize_call_site_data(&mut pieces[PIECE_CALL_SITE_DATA], &mut interner);
        self.serialize_optional_payloads(&mut pieces, &mut interner);
        self.serialize_optional_info(&mut pieces, &mut interner);
        for index in &self.var_handle_method_types {
            put_u16(&mut pieces[PIECE_VAR_HANDLE].bytes, *index);
        }
        align4(&mut pieces[PIECE_VAR_HANDLE].bytes);
        for index in &self.static_split_refs {
            put_u16(&mut pieces[PIECE_STATIC_SPLIT].bytes, *index);
        }
        align4(&mut pieces[PIECE_STATIC_SPLIT].bytes);
        for index in &self.special_split_refs {
            put_u16(&mut pieces[PIECE_SPECIAL_SPLIT].bytes, *index);
        }
        align4(&mut pieces[PIECE_SPECIAL_SPLIT].bytes);
        for index in 0..interner.nas_pairs.len() {
            let (name_id, signature_id) = interner.nas_pairs[index];
            pieces[PIECE_NAS].patch_slot(Patch::Utf8(name_id));
            pieces[PIECE_NAS].patch_slot(Patch::Utf8(signature_id));
        }

        // layout: header, then each non-empty piece 4-aligned, then the
        // UTF8 block packed tight at the end
        let mut piece_offsets = vec![0u32; PIECE_COUNT];
        let mut cursor = header::SIZE;
        for (index, piece) in pieces.iter().enumerate() {
            if piece.bytes.is_empty() {
                continue;
            }
            cursor = (cursor + 3) & !3;
            piece_offsets[index] = cursor;
            cursor += piece.bytes.len() as u32;
        }
        let utf8_base = cursor;
        let mut utf8_offsets = Vec::with_capacity(interner.strings.len());
        for string in &interner.strings {
            utf8_offsets.push(cursor);
            cursor += 2 + string.len() as u32;
        }
        let rom_size = cursor;

        let mut blob = Vec::with_capacity(rom_size as usize);
        self.write_header(&mut blob, rom_size, &piece_offsets, &pieces, class_name_id, superclass_id, outer_id, nest_host_id, &utf8_offsets);
        let mut all_patches: Vec<(usize, Patch)> = Vec::new();
        for (index, piece) in pieces.iter().enumerate() {
            if piece.bytes.is_empty() {
                continue;
            }
            while (blob.len() as u32) < piece_offsets[index] {
                blob.push(0);
            }
            let base = blob.len();
            blob.extend_from_slice(&piece.bytes);
            for &(position, patch) in &piece.patches {
                all_patches.push((base + position, patch));
            }
        }
        debug_assert_eq!(blob.len() as u32, utf8_base);
        for string in &interner.strings {
            put_u16(&mut blob, string.len() as u16);
            blob.extend_from_slice(string);
        }
        debug_assert_eq!(blob.len() as u32, rom_size);

        let nas_base = piece_offsets[PIECE_NAS];
        for (position, patch) in all_patches {
            let value = match patch {
                Patch::Utf8(id) => utf8_offsets[id],
                Patch::Nas(id) => nas_base + id as u32 * 8,
                Patch::Piece(index) => piece_offsets[index],
            };
            LittleEndian::write_u32(&mut blob[position..position + 4], value);
        }
        blob
    }

    #[allow(clippy::too_many_arguments)]
    fn write_header(
        &self,
        blob: &mut Vec<u8>,
        rom_size: u32,
        piece_offsets: &[u32],
        pieces: &[Piece],
        class_name_id: usize,
        superclass_id: Option<usize>,
        outer_id: Option<usize>,
        nest_host_id: Option<usize>,
        utf8_offsets: &[u32],
    ) {
        let piece_srp = |index: usize| {
            if pieces[index].bytes.is_empty() {
                0
            } else {
                piece_offsets[index]
            }
        };
        let utf8_srp = |id: Option<usize>| id.map(|id| utf8_offsets[id]).unwrap_or(0);

        put_u32(blob, rom_size);
        put_u32(blob, utf8_offsets[class_name_id]);
        put_u32(blob, utf8_srp(superclass_id));
        put_u32(blob, self.modifiers);
        put_u32(blob, self.extra_modifiers);
        put_u16(blob, self.major_version);
        put_u16(blob, self.minor_version);
        put_u32(blob, self.interfaces.len() as u32);
        put_u32(blob, piece_srp(PIECE_INTERFACES));
        put_u32(blob, self.methods.len() as u32);
        put_u32(blob, piece_srp(PIECE_METHODS));
        put_u32(blob, self.fields.len() as u32);
        put_u32(blob, piece_srp(PIECE_FIELDS));
        put_u32(blob, self.object_static_count);
        put_u32(blob, self.double_scalar_static_count);
        put_u32(blob, self.single_scalar_static_count);
        put_u32(blob, self.constant_pool.len() as u32);
        put_u32(blob, self.constant_pool.len() as u32);
        put_u32(blob, piece_srp(PIECE_CP_SHAPE));
        put_u32(blob, piece_srp(PIECE_CONSTANT_POOL));
        put_u32(blob, utf8_srp(outer_id));
        put_u32(blob, self.member_access_flags);
        put_u32(blob, self.inner_classes.len() as u32);
        put_u32(blob, piece_srp(PIECE_INNER_CLASSES));
        put_u32(blob, utf8_srp(nest_host_id));
        put_u32(blob, self.nest_members.len() as u32);
        put_u32(blob, piece_srp(PIECE_NEST_MEMBERS));
        put_u32(blob, self.optional_flags().bits());
        put_u32(blob, piece_srp(PIECE_OPTIONAL_INFO));
        put_u32(blob, self.call_sites.len() as u32);
        put_u32(blob, self.bootstrap_methods.len() as u32);
        put_u32(blob, piece_srp(PIECE_CALL_SITE_DATA));
        put_u32(blob, self.var_handle_method_types.len() as u32);
        put_u32(blob, piece_srp(PIECE_VAR_HANDLE));
        put_u32(blob, self.static_split_refs.len() as u32);
        put_u32(blob, self.special_split_refs.len() as u32);
        put_u32(blob, piece_srp(PIECE_STATIC_SPLIT));
        put_u32(blob, piece_srp(PIECE_SPECIAL_SPLIT));
        debug_assert_eq!(blob.len() as u32, header::SIZE);
    }

    fn serialize_cp_shape(&self, piece: &mut Piece) {
        if self.constant_pool.is_empty() {
            return;
        }
        let words = CpShape::words_for(self.constant_pool.len() as u32);
        let mut packed = vec![0u32; words as usize];
        for (index, entry) in self.constant_pool.iter().enumerate() {
            let word = index / 8;
            let shift = (index % 8) * 4;
            packed[word] |= entry.shape().nibble() << shift;
        }
        for word in packed {
            put_u32(&mut piece.bytes, word);
        }
    }

    fn serialize_constant_pool(&self, piece: &mut Piece, interner: &mut Interner) {
        for entry in &self.constant_pool {
            let start = piece.bytes.len();
            match entry {
                CpEntry::Unused => {
                    put_u32(&mut piece.bytes, 0);
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::Class(name) => {
                    let id = interner.utf8(name);
                    piece.patch_slot(Patch::Utf8(id));
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::Str(value) => {
                    let id = interner.utf8(value);
                    piece.patch_slot(Patch::Utf8(id));
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::Int(value) => {
                    put_u32(&mut piece.bytes, *value as u32);
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::Float(value) => {
                    put_u32(&mut piece.bytes, value.to_bits());
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::Long(value) => {
                    put_u64(&mut piece.bytes, *value as u64);
                }
                CpEntry::Double(value) => {
                    put_u64(&mut piece.bytes, value.to_bits());
                }
                CpEntry::FieldRef { class_index, name, signature }
                | CpEntry::MethodRef { class_index, name, signature }
                | CpEntry::InterfaceMethodRef { class_index, name, signature } => {
                    put_u32(&mut piece.bytes, *class_index);
                    let id = interner.nas(name, signature);
                    piece.patch_slot(Patch::Nas(id));
                }
                CpEntry::MethodType(signature) => {
                    let id = interner.utf8(signature);
                    piece.patch_slot(Patch::Utf8(id));
                    put_u32(&mut piece.bytes, 0);
                }
                CpEntry::MethodHandle { kind, method_index } => {
                    put_u32(&mut piece.bytes, *kind);
                    put_u32(&mut piece.bytes, *method_index);
                }
                CpEntry::ConstantDynamic { bsm_index, name, signature } => {
                    put_u32(&mut piece.bytes, *bsm_index);
                    let id = interner.nas(name, signature);
                    piece.patch_slot(Patch::Nas(id));
                }
            }
            debug_assert_eq!(piece.bytes.len() - start, CP_ENTRY_SIZE as usize);
        }
    }

    fn serialize_call_site_data(&self, piece: &mut Piece, interner: &mut Interner) {
        if self.call_sites.is_empty() && self.bootstrap_methods.is_empty() {
            return;
        }
        for (name, signature, _) in &self.call_sites {
            let id = interner.nas(name, signature);
            piece.patch_slot(Patch::Nas(id));
        }
        for (_, _, bsm_index) in &self.call_sites {
            put_u16(&mut piece.bytes, *bsm_index);
        }
        align4(&mut piece.bytes);
        for (method_handle_ref, arguments) in &self.bootstrap_methods {
            put_u32(&mut piece.bytes, *method_handle_ref);
            put_u32(&mut piece.bytes, arguments.len() as u32);
            for argument in arguments {
                put_u32(&mut piece.bytes, *argument);
            }
        }
    }

    fn serialize_optional_payloads(&self, pieces: &mut [Piece], interner: &mut Interner) {
        if let Some(data) = &self.source_debug_extension {
            let piece = &mut pieces[PIECE_OPT_SDE];
            put_u32(&mut piece.bytes, data.len() as u32);
            piece.bytes.extend_from_slice(data);
            align4(&mut piece.bytes);
        }
        if let Some((class_ref_index, name, signature)) = &self.enclosing_method {
            let id = interner.nas(name, signature);
            let piece = &mut pieces[PIECE_OPT_ENCLOSING];
            put_u32(&mut piece.bytes, *class_ref_index);
            piece.patch_slot(Patch::Nas(id));
        }
        if let Some(data) = &self.class_annotations {
            write_annotation_block(&mut pieces[PIECE_OPT_CLASS_ANNOTATIONS].bytes, data);
        }
        if let Some(data) = &self.class_type_annotations {
            write_annotation_block(&mut pieces[PIECE_OPT_CLASS_TYPE_ANNOTATIONS].bytes, data);
        }
        if self.is_record {
            let piece_index = PIECE_OPT_RECORD;
            put_u32(&mut pieces[piece_index].bytes, self.record_components.len() as u32);
            for component in &self.record_components {
                let name_id = interner.utf8(&component.name);
                let signature_id = interner.utf8(&component.signature);
                let mut flags = RecordComponentFlags::empty();
                if component.generic_signature.is_some() {
                    flags |= RecordComponentFlags::HAS_GENERIC_SIGNATURE;
                }
                if component.annotations.is_some() {
                    flags |= RecordComponentFlags::HAS_ANNOTATIONS;
                }
                if component.type_annotations.is_some() {
                    flags |= RecordComponentFlags::HAS_TYPE_ANNOTATIONS;
                }
                let piece = &mut pieces[piece_index];
                piece.patch_slot(Patch::Utf8(name_id));
                piece.patch_slot(Patch::Utf8(signature_id));
                put_u32(&mut piece.bytes, flags.bits());
                if let Some(generic) = &component.generic_signature {
                    let id = interner.utf8(generic);
                    pieces[piece_index].patch_slot(Patch::Utf8(id));
                }
                if let Some(data) = &component.annotations {
                    write_annotation_block(&mut pieces[piece_index].bytes, data);
                }
                if let Some(data) = &component.type_annotations {
                    write_annotation_block(&mut pieces[piece_index].bytes, data);
                }
            }
        }
        if !self.permitted_subclasses.is_empty() {
            put_u32(&mut pieces[PIECE_OPT_PERMITTED].bytes, self.permitted_subclasses.len() as u32);
            for name in &self.permitted_subclasses {
                let id = interner.utf8(name);
                pieces[PIECE_OPT_PERMITTED].patch_slot(Patch::Utf8(id));
            }
        }
        if !self.loadable_descriptors.is_empty() {
            put_u32(&mut pieces[PIECE_OPT_LOADABLE].bytes, self.loadable_descriptors.len() as u32);
            for name in &self.loadable_descriptors {
                let id = interner.utf8(name);
                pieces[PIECE_OPT_LOADABLE].patch_slot(Patch::Utf8(id));
            }
        }
        if let Some(flags) = self.implicit_creation {
            put_u32(&mut pieces[PIECE_OPT_IMPLICIT].bytes, flags);
        }
    }

    fn serialize_optional_info(&self, pieces: &mut [Piece], interner: &mut Interner) {
        let flags = self.optional_flags();
        if flags.is_empty() {
            return;
        }
        // one slot per set flag, in flag-bit order
        if let Some(name) = &self.source_file_name {
            let id = interner.utf8(name);
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Utf8(id));
        }
        if let Some(signature) = &self.generic_signature {
            let id = interner.utf8(signature);
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Utf8(id));
        }
        if self.source_debug_extension.is_some() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_SDE));
        }
        if self.enclosing_method.is_some() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_ENCLOSING));
        }
        if let Some(name) = &self.simple_name {
            let id = interner.utf8(name);
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Utf8(id));
        }
        if self.verify_exclude {
            put_u32(&mut pieces[PIECE_OPTIONAL_INFO].bytes, 1);
        }
        if self.class_annotations.is_some() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_CLASS_ANNOTATIONS));
        }
        if self.class_type_annotations.is_some() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_CLASS_TYPE_ANNOTATIONS));
        }
        if self.is_record {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_RECORD));
        }
        if !self.permitted_subclasses.is_empty() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_PERMITTED));
        }
        if self.injected_interfaces {
            put_u32(&mut pieces[PIECE_OPTIONAL_INFO].bytes, 1);
        }
        if !self.loadable_descriptors.is_empty() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_LOADABLE));
        }
        if self.implicit_creation.is_some() {
            pieces[PIECE_OPTIONAL_INFO].patch_slot(Patch::Piece(PIECE_OPT_IMPLICIT));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rom::RomClass;

    #[test]
    fn minimal_class_header() {
        let bytes = RomClassBuilder::new("com/example/Foo").build();
        let class = RomClass::new(&bytes).unwrap();
        assert_eq!(class.rom_size() as usize, bytes.len());
        assert_eq!(class.class_name_bytes(), Some(&b"com/example/Foo"[..]));
        assert_eq!(class.rom_method_count(), 0);
        assert_eq!(class.rom_field_count(), 0);
    }

    #[test]
    fn utf8_strings_are_interned_once() {
        let bytes = RomClassBuilder::new("Foo")
            .method(MethodBuilder::new("bar", "()V").bytecodes(vec![0xb1]))
            .method(MethodBuilder::new("bar", "()I").bytecodes(vec![0x03, 0xac]))
            .build();
        let needle = b"\x03\x00bar";
        let hits = bytes
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn method_table_is_sequential() {
        let bytes = RomClassBuilder::new("Foo")
            .method(MethodBuilder::new("a", "()V").bytecodes(vec![0xb1]))
            .method(MethodBuilder::new("b", "()V").bytecodes(vec![0xb1]))
            .build();
        let class = RomClass::new(&bytes).unwrap();
        assert_eq!(class.rom_method_count(), 2);
        let methods = class.srp_at(header::ROM_METHODS).unwrap();
        // each method: 28-byte header + 1 bytecode padded to 4
        let first_name = class.srp_at(methods).unwrap();
        let second_name = class.srp_at(methods + 32).unwrap();
        assert_eq!(class.utf8_at(first_name).unwrap().0, b"a");
        assert_eq!(class.utf8_at(second_name).unwrap().0, b"b");
    }
}
