//! Bytecode operand tables
//!
//! The walker needs to know, for every opcode, how many operand bytes follow
//! it and how they are shaped. The two switch instructions
//! are the only variable-length shapes; `wide` changes the width of the
//! embedded instruction's index operand.

/// Operand shape of one instruction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operands {
    /// No operand bytes
    None,
    /// One signed byte (`bipush`)
    I8,
    /// One unsigned byte (local index, `ldc`, `newarray` type)
    U8,
    /// One signed 16-bit value (`sipush`)
    I16,
    /// One unsigned 16-bit value (constant-pool index or branch offset)
    U16,
    /// Two unsigned bytes (`iinc`: index, then signed increment)
    U8Pair,
    /// 16-bit constant-pool index then one byte (`multianewarray`)
    U16U8,
    /// 16-bit constant-pool index then two bytes (`invokeinterface`)
    U16U8U8,
    /// 16-bit constant-pool index then two reserved zero bytes (`invokedynamic`)
    U16Zero2,
    /// One signed 32-bit value (`goto_w`, `jsr_w`)
    I32,
    /// `wide` prefix: embedded opcode plus 16-bit index (plus 16-bit
    /// increment when the embedded opcode is `iinc`)
    Wide,
    /// Pad to 4-byte alignment, default, low/high bounds, jump table
    TableSwitch,
    /// Pad to 4-byte alignment, default, pair count, match/offset pairs
    LookupSwitch,
}

/// Mnemonic and operand shape for `opcode`, or `None` if the byte is not a
/// defined instruction
///
/// An undefined opcode stops the bytecode sub-walk; the remaining bytes then
/// surface in the dump's unaccounted-byte count, which is exactly the
/// diagnostic wanted for a corrupt method body.
pub fn instruction(opcode: u8) -> Option<(&'static str, Operands)> {
    use Operands::*;
    let decoded = match opcode {
        0x00 => ("nop", None),
        0x01 => ("aconst_null", None),
        0x02 => ("iconst_m1", None),
        0x03 => ("iconst_0", None),
        0x04 => ("iconst_1", None),
        0x05 => ("iconst_2", None),
        0x06 => ("iconst_3", None),
        0x07 => ("iconst_4", None),
        0x08 => ("iconst_5", None),
        0x09 => ("lconst_0", None),
        0x0a => ("lconst_1", None),
        0x0b => ("fconst_0", None),
        0x0c => ("fconst_1", None),
        0x0d => ("fconst_2", None),
        0x0e => ("dconst_0", None),
        0x0f => ("dconst_1", None),
        0x10 => ("bipush", I8),
        0x11 => ("sipush", I16),
        0x12 => ("ldc", U8),
        0x13 => ("ldc_w", U16),
        0x14 => ("ldc2_w", U16),
        0x15 => ("iload", U8),
        0x16 => ("lload", U8),
        0x17 => ("fload", U8),
        0x18 => ("dload", U8),
        0x19 => ("aload", U8),
        0x1a => ("iload_0", None),
        0x1b => ("iload_1", None),
        0x1c => ("iload_2", None),
        0x1d => ("iload_3", None),
        0x1e => ("lload_0", None),
        0x1f => ("lload_1", None),
        0x20 => ("lload_2", None),
        0x21 => ("lload_3", None),
        0x22 => ("fload_0", None),
        0x23 => ("fload_1", None),
        0x24 => ("fload_2", None),
        0x25 => ("fload_3", None),
        0x26 => ("dload_0", None),
        0x27 => ("dload_1", None),
        0x28 => ("dload_2", None),
        0x29 => ("dload_3", None),
        0x2a => ("aload_0", None),
        0x2b => ("aload_1", None),
        0x2c => ("aload_2", None),
        0x2d => ("aload_3", None),
        0x2e => ("iaload", None),
        0x2f => ("laload", None),
        0x30 => ("faload", None),
        0x31 => ("daload", None),
        0x32 => ("aaload", None),
        0x33 => ("baload", None),
        0x34 => ("caload", None),
        0x35 => ("saload", None),
        0x36 => ("istore", U8),
        0x37 => ("lstore", U8),
        0x38 => ("fstore", U8),
        0x39 => ("dstore", U8),
        0x3a => ("astore", U8),
        0x3b => ("istore_0", None),
        0x3c => ("istore_1", None),
        0x3d => ("istore_2", None),
        0x3e => ("istore_3", None),
        0x3f => ("lstore_0", None),
        0x40 => ("lstore_1", None),
        0x41 => ("lstore_2", None),
        0x42 => ("lstore_3", None),
        0x43 => ("fstore_0", None),
        0x44 => ("fstore_1", None),
        0x45 => ("fstore_2", None),
        0x46 => ("fstore_3", None),
        0x47 => ("dstore_0", None),
        0x48 => ("dstore_1", None),
        0x49 => ("dstore_2", None),
        0x4a => ("dstore_3", None),
        0x4b => ("astore_0", None),
        0x4c => ("astore_1", None),
        0x4d => ("astore_2", None),
        0x4e => ("astore_3", None),
        0x4f => ("iastore", None),
        0x50 => ("lastore", None),
        0x51 => ("fastore", None),
        0x52 => ("dastore", None),
        0x53 => ("aastore", None),
        0x54 => ("bastore", None),
        0x55 => ("castore", None),
        0x56 => ("sastore", None),
        0x57 => ("pop", None),
        0x58 => ("pop2", None),
        0x59 => ("dup", None),
        0x5a => ("dup_x1", None),
        0x5b => ("dup_x2", None),
        0x5c => ("dup2", None),
        0x5d => ("dup2_x1", None),
        0x5e => ("dup2_x2", None),
        0x5f => ("swap", None),
        0x60 => ("iadd", None),
        0x61 => ("ladd", None),
        0x62 => ("fadd", None),
        0x63 => ("dadd", None),
        0x64 => ("isub", None),
        0x65 => ("lsub", None),
        0x66 => ("fsub", None),
        0x67 => ("dsub", None),
        0x68 => ("imul", None),
        0x69 => ("lmul", None),
        0x6a => ("fmul", None),
        0x6b => ("dmul", None),
        0x6c => ("idiv", None),
        0x6d => ("ldiv", None),
        0x6e => ("fdiv", None),
        0x6f => ("ddiv", None),
        0x70 => ("irem", None),
        0x71 => ("lrem", None),
        0x72 => ("frem", None),
        0x73 => ("drem", None),
        0x74 => ("ineg", None),
        0x75 => ("lneg", None),
        0x76 => ("fneg", None),
        0x77 => ("dneg", None),
        0x78 => ("ishl", None),
        0x79 => ("lshl", None),
        0x7a => ("ishr", None),
        0x7b => ("lshr", None),
        0x7c => ("iushr", None),
        0x7d => ("lushr", None),
        0x7e => ("iand", None),
        0x7f => ("land", None),
        0x80 => ("ior", None),
        0x81 => ("lor", None),
        0x82 => ("ixor", None),
        0x83 => ("lxor", None),
        0x84 => ("iinc", U8Pair),
        0x85 => ("i2l", None),
        0x86 => ("i2f", None),
        0x87 => ("i2d", None),
        0x88 => ("l2i", None),
        0x89 => ("l2f", None),
        0x8a => ("l2d", None),
        0x8b => ("f2i", None),
        0x8c => ("f2l", None),
        0x8d => ("f2d", None),
        0x8e => ("d2i", None),
        0x8f => ("d2l", None),
        0x90 => ("d2f", None),
        0x91 => ("i2b", None),
        0x92 => ("i2c", None),
        0x93 => ("i2s", None),
        0x94 => ("lcmp", None),
        0x95 => ("fcmpl", None),
        0x96 => ("fcmpg", None),
        0x97 => ("dcmpl", None),
        0x98 => ("dcmpg", None),
        0x99 => ("ifeq", U16),
        0x9a => ("ifne", U16),
        0x9b => ("iflt", U16),
        0x9c => ("ifge", U16),
        0x9d => ("ifgt", U16),
        0x9e => ("ifle", U16),
        0x9f => ("if_icmpeq", U16),
        0xa0 => ("if_icmpne", U16),
        0xa1 => ("if_icmplt", U16),
        0xa2 => ("if_icmpge", U16),
        0xa3 => ("if_icmpgt", U16),
        0xa4 => ("if_icmple", U16),
        0xa5 => ("if_acmpeq", U16),
        0xa6 => ("if_acmpne", U16),
        0xa7 => ("goto", U16),
        0xa8 => ("jsr", U16),
        0xa9 => ("ret", U8),
        0xaa => ("tableswitch", TableSwitch),
        0xab => ("lookupswitch", LookupSwitch),
        0xac => ("ireturn", None),
        0xad => ("lreturn", None),
        0xae => ("freturn", None),
        0xaf => ("dreturn", None),
        0xb0 => ("areturn", None),
        0xb1 => ("return", None),
        0xb2 => ("getstatic", U16),
        0xb3 => ("putstatic", U16),
        0xb4 => ("getfield", U16),
        0xb5 => ("putfield", U16),
        0xb6 => ("invokevirtual", U16),
        0xb7 => ("invokespecial", U16),
        0xb8 => ("invokestatic", U16),
        0xb9 => ("invokeinterface", U16U8U8),
        0xba => ("invokedynamic", U16Zero2),
        0xbb => ("new", U16),
        0xbc => ("newarray", U8),
        0xbd => ("anewarray", U16),
        0xbe => ("arraylength", None),
        0xbf => ("athrow", None),
        0xc0 => ("checkcast", U16),
        0xc1 => ("instanceof", U16),
        0xc2 => ("monitorenter", None),
        0xc3 => ("monitorexit", None),
        0xc4 => ("wide", Wide),
        0xc5 => ("multianewarray", U16U8),
        0xc6 => ("ifnull", U16),
        0xc7 => ("ifnonnull", U16),
        0xc8 => ("goto_w", I32),
        0xc9 => ("jsr_w", I32),
        _ => return Option::None,
    };
    Some(decoded)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coverage_of_defined_range() {
        for opcode in 0x00..=0xc9u8 {
            assert!(instruction(opcode).is_some(), "opcode 0x{:02x}", opcode);
        }
        for opcode in 0xca..=0xffu8 {
            assert!(instruction(opcode).is_none(), "opcode 0x{:02x}", opcode);
        }
    }

    #[test]
    fn operand_shapes() {
        assert_eq!(instruction(0x10), Some(("bipush", Operands::I8)));
        assert_eq!(instruction(0x84), Some(("iinc", Operands::U8Pair)));
        assert_eq!(instruction(0xaa), Some(("tableswitch", Operands::TableSwitch)));
        assert_eq!(instruction(0xab), Some(("lookupswitch", Operands::LookupSwitch)));
        assert_eq!(instruction(0xb9), Some(("invokeinterface", Operands::U16U8U8)));
        assert_eq!(instruction(0xc4), Some(("wide", Operands::Wide)));
        assert_eq!(instruction(0xc5), Some(("multianewarray", Operands::U16U8)));
        assert_eq!(instruction(0xc8), Some(("goto_w", Operands::I32)));
    }
}
