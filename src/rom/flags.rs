use bitflags::bitflags;

bitflags! {
    /// Access and attribute flags on the class itself
    pub struct ClassModifiers: u32 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on methods (low 16 bits mirror the class-file flags)
    pub struct MethodModifiers: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Extended method modifiers gating the variable tail of a method
    ///
    /// Each present block shifts the byte offset of every following block, so
    /// the walker tests these in a fixed, non-reorderable order.
    pub struct MethodExtendedModifiers: u32 {
        const HAS_GENERIC_SIGNATURE = 0x0000_0001;
        const HAS_EXCEPTION_TABLE = 0x0000_0002;
        const HAS_ANNOTATIONS = 0x0000_0004;
        const HAS_PARAMETER_ANNOTATIONS = 0x0000_0008;
        const HAS_DEFAULT_ANNOTATION = 0x0000_0010;
        const HAS_METHOD_TYPE_ANNOTATIONS = 0x0000_0020;
        const HAS_CODE_TYPE_ANNOTATIONS = 0x0000_0040;
        const HAS_DEBUG_INFO = 0x0000_0080;
        const HAS_STACK_MAP = 0x0000_0100;
        const HAS_METHOD_PARAMETERS = 0x0000_0200;
    }
}

bitflags! {
    /// Access and attribute flags on fields
    pub struct FieldModifiers: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;

        const HAS_CONSTANT_VALUE = 0x0001_0000;
        /// Constant value occupies two cells (long/double)
        const IS_DOUBLE_WIDE = 0x0002_0000;
        const HAS_GENERIC_SIGNATURE = 0x0004_0000;
        const HAS_ANNOTATIONS = 0x0008_0000;
        const HAS_TYPE_ANNOTATIONS = 0x0010_0000;
    }
}

bitflags! {
    /// Presence mask for the optional-info slot sequence
    ///
    /// Bit order matches the physical order of the slots: each set bit
    /// contributes exactly one `U32` slot, consumed lowest bit first.
    pub struct OptionalFlags: u32 {
        const SOURCE_FILE_NAME = 0x0000_0001;
        const GENERIC_SIGNATURE = 0x0000_0002;
        const SOURCE_DEBUG_EXTENSION = 0x0000_0004;
        const ENCLOSING_METHOD = 0x0000_0008;
        const SIMPLE_NAME = 0x0000_0010;
        const VERIFY_EXCLUDE = 0x0000_0020;
        const CLASS_ANNOTATIONS = 0x0000_0040;
        const CLASS_TYPE_ANNOTATIONS = 0x0000_0080;
        const RECORD_ATTRIBUTE = 0x0000_0100;
        const PERMITTED_SUBCLASSES = 0x0000_0200;
        const INJECTED_INTERFACES = 0x0000_0400;
        const LOADABLE_DESCRIPTORS = 0x0000_0800;
        const IMPLICIT_CREATION = 0x0000_1000;
    }
}

bitflags! {
    /// Flags on a single record component
    pub struct RecordComponentFlags: u32 {
        const HAS_GENERIC_SIGNATURE = 0x0000_0001;
        const HAS_ANNOTATIONS = 0x0000_0002;
        const HAS_TYPE_ANNOTATIONS = 0x0000_0004;
    }
}
