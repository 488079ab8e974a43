//! End-to-end dump and query scenarios over builder-assembled records

use romdump::dump;
use romdump::rom::builder::{
    CatchEntry, CpEntry, DebugInfoBuilder, FieldBuilder, FieldConstant, MethodBuilder,
    RecordComponentBuilder, RomClassBuilder, VariableEntry,
};
use romdump::rom::{header, MethodExtendedModifiers, RomClass, SlotType, ValidateWith};

/// A record exercising every table and optional attribute the walker knows
fn full_featured_class() -> Vec<u8> {
    // iconst_0; tableswitch over {0,1}; return. Switch operands are
    // big-endian and padded to 4 relative to the start of the stream
    let bytecodes = vec![
        0x03, // iconst_0
        0xaa, // tableswitch
        0x00, 0x00, // alignment pad
        0x00, 0x00, 0x00, 0x10, // default
        0x00, 0x00, 0x00, 0x00, // low
        0x00, 0x00, 0x00, 0x01, // high
        0x00, 0x00, 0x00, 0x0c, // offset for 0
        0x00, 0x00, 0x00, 0x0e, // offset for 1
        0xb1, // return
    ];
    // same frame, then append-one-local with an Object(7) entry
    let frames = vec![0x00, 0xfc, 0x00, 0x05, 0x07, 0x00, 0x02];

    RomClassBuilder::new("com/example/Everything")
        .version(55, 0)
        .interface("java/io/Serializable")
        .interface("java/lang/Comparable")
        .method(
            MethodBuilder::new("dispatch", "(I)V")
                .max_stack(2)
                .arg_count(2)
                .temp_count(1)
                .bytecodes(bytecodes)
                .generic_signature("(TT;)V")
                .catch(CatchEntry {
                    start_pc: 0,
                    end_pc: 8,
                    handler_pc: 16,
                    catch_type: Some("java/lang/Exception".to_string()),
                })
                .throws("java/io/IOException")
                .annotations(vec![1, 2, 3])
                .parameter_annotations(vec![4, 5])
                .default_annotation(vec![6])
                .debug_info(DebugInfoBuilder {
                    line_number_data: vec![0x10, 0x21],
                    line_number_count: 2,
                    variables: vec![VariableEntry {
                        slot_number: 1,
                        visible_start_pc: 0,
                        visible_length: 8,
                        name: "value".to_string(),
                        signature: "I".to_string(),
                        generic_signature: None,
                    }],
                })
                .stack_map(2, frames)
                .parameter(Some("value"), 0),
        )
        .method(MethodBuilder::new("<init>", "()V").bytecodes(vec![0xb1]))
        .field(FieldBuilder::new("count", "I").constant(FieldConstant::Single(42)))
        .field(
            FieldBuilder::new("ratio", "D")
                .constant(FieldConstant::Double(0x4000_0000_0000_0000))
                .annotations(vec![9]),
        )
        .field(FieldBuilder::new("label", "Ljava/lang/String;").generic_signature("TT;"))
        .cp_entry(CpEntry::Class("java/lang/Object".to_string()))
        .cp_entry(CpEntry::Str("hello".to_string()))
        .cp_entry(CpEntry::Int(7))
        .cp_entry(CpEntry::Float(1.5))
        .cp_entry(CpEntry::Long(-2))
        .cp_entry(CpEntry::Double(2.5))
        .cp_entry(CpEntry::FieldRef {
            class_index: 1,
            name: "count".to_string(),
            signature: "I".to_string(),
        })
        .cp_entry(CpEntry::MethodRef {
            class_index: 1,
            name: "dispatch".to_string(),
            signature: "(I)V".to_string(),
        })
        .cp_entry(CpEntry::MethodType("(I)V".to_string()))
        .cp_entry(CpEntry::MethodHandle {
            kind: 6,
            method_index: 8,
        })
        .cp_entry(CpEntry::ConstantDynamic {
            bsm_index: 0,
            name: "constant".to_string(),
            signature: "I".to_string(),
        })
        .cp_entry(CpEntry::Unused)
        .outer_class("com/example/Outer", 0x0002)
        .inner_class("com/example/Everything$Inner")
        .nest_host("com/example/Outer")
        .nest_member("com/example/Everything$Inner")
        .call_site("bootstrap", "()V", 0)
        .bootstrap_method(10, vec![3, 4])
        .source_file_name("Everything.java")
        .generic_signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .source_debug_extension(vec![0x53, 0x4d, 0x41, 0x50, 0x0a, 0x0a, 0x0a, 0x0a])
        .enclosing_method(1, "enclosing", "()V")
        .simple_name("Everything")
        .verify_exclude()
        .class_annotations(vec![7, 7, 7])
        .class_type_annotations(vec![8])
        .record_component(RecordComponentBuilder {
            name: "component".to_string(),
            signature: "I".to_string(),
            generic_signature: None,
            annotations: Some(vec![5]),
            type_annotations: None,
        })
        .permitted_subclass("com/example/Sub")
        .injected_interfaces()
        .loadable_descriptor("Lcom/example/Value;")
        .implicit_creation(0x3)
        .var_handle_method_type(1)
        .static_split_ref(7)
        .static_split_ref(8)
        .special_split_ref(9)
        .build()
}

fn linear_dump(bytes: &[u8], threshold: u32) -> String {
    let class = RomClass::new(bytes).unwrap();
    let mut out = Vec::new();
    dump::linear(&class, 0, threshold, &(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn full_featured_class_accounts_for_every_byte() {
    let text = linear_dump(&full_featured_class(), 16);
    assert!(
        text.ends_with("All bytes were accounted for\n"),
        "dump did not balance:\n{}",
        text
    );
    assert!(!text.contains("suspected padding"), "{}", text);
}

#[test]
fn full_featured_class_shows_each_table() {
    let text = linear_dump(&full_featured_class(), 16);
    for section in [
        "interfaces",
        "methods",
        "fields",
        "cpShapeDescription",
        "constantPool",
        "callSiteData",
        "nestMembers",
        "recordAttribute",
        "stackMap",
        "methodDebugInfo",
        "exceptionTable",
        "utf8Block",
    ] {
        assert!(
            text.contains(&format!("=== Section Start: {} ===", section)),
            "missing section {} in:\n{}",
            section,
            text
        );
    }
    assert!(text.contains("(\"com/example/Everything\")"), "{}", text);
    assert!(text.contains("sourceFileName"), "{}", text);
}

#[test]
fn single_method_scenario() {
    let bytes = RomClassBuilder::new("com/example/Foo")
        .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
        .build();
    let text = linear_dump(&bytes, 8);
    assert!(text.contains("romSize"), "{}", text);
    assert!(text.contains("=== Section Start: methods ==="), "{}", text);
    assert!(text.contains("=== Section Start: method ==="), "{}", text);
    assert!(text.contains("(\"foo\")"), "{}", text);
    assert!(text.contains("=== Section End: methods ==="), "{}", text);
    assert!(text.ends_with("All bytes were accounted for\n"), "{}", text);
}

#[test]
fn nesting_balances_over_the_sorted_regions() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let regions = dump::gather(&class, &()).unwrap();
    let mut nesting: i32 = 0;
    for region in &regions {
        match region.slot_type {
            SlotType::SectionStart => nesting += 1,
            SlotType::SectionEnd => {
                nesting -= 1;
                assert!(nesting >= 0, "nesting went negative at {:?}", region);
            }
            _ => {}
        }
    }
    assert_eq!(nesting, 0);
}

#[test]
fn collector_is_deterministic() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let first = dump::gather(&class, &()).unwrap();
    let second = dump::gather(&class, &()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn xml_dump_is_balanced_and_expanded() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::xml(&class, &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("<romClass>\n"));
    assert!(text.ends_with("</romClass>\n"));
    assert_eq!(
        text.matches("<section ").count(),
        text.matches("</section>").count()
    );
    // no threshold: the per-method sections always appear
    assert!(text.contains("<section name=\"method\">"), "{}", text);
    assert!(text.contains("<UTF8 name=\"className\">com/example/Everything</UTF8>"), "{}", text);
}

#[test]
fn base_address_offsets_every_printed_address() {
    let bytes = RomClassBuilder::new("com/example/Foo").build();
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::linear(&class, 0x7000_0000, 4, &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("0x70000000: romSize"), "{}", text);
    assert!(!text.contains("0x00000000:"), "{}", text);
}

#[test]
fn query_header_field() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::query(&class, 0, &["/romMethodCount"], &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("romMethodCount = 0x00000002"), "{}", text);
    assert!(!text.contains("matched nothing"), "{}", text);
}

#[test]
fn query_second_method_by_index() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::query(&class, 0, &["/methods/method[1]/name"], &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("(\"<init>\")"), "{}", text);
    assert!(!text.contains("matched nothing"), "{}", text);
}

#[test]
fn query_batch_diagnostics_are_independent() {
    let bytes = full_featured_class();
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::query_batch(&class, 0, "/romSize,/nonexistentField,methods", &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("romSize = "), "{}", text);
    assert!(text.contains("Query \"/nonexistentField\" matched nothing"), "{}", text);
    assert!(text.contains("Syntax error in query \"methods\""), "{}", text);
}

fn put_u32(bytes: &mut [u8], offset: u32, value: u32) {
    let at = offset as usize;
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[test]
fn corrupt_interface_count_degrades_to_unaccounted_bytes() {
    let mut bytes = RomClassBuilder::new("com/example/Foo")
        .interface("java/io/Serializable")
        .build();
    put_u32(&mut bytes, header::INTERFACE_COUNT, 0x4000_0000);
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::linear(&class, 0, 1, &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("bytes were not accounted for"), "{}", text);
}

#[test]
fn corrupt_constant_pool_count_degrades_to_unaccounted_bytes() {
    let mut bytes = RomClassBuilder::new("com/example/Foo")
        .cp_entry(CpEntry::Int(7))
        .build();
    put_u32(&mut bytes, header::ROM_CONSTANT_POOL_COUNT, u32::MAX);
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::linear(&class, 0, 1, &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("bytes were not accounted for"), "{}", text);
}

#[test]
fn corrupt_bytecode_size_degrades_to_unaccounted_bytes() {
    let mut bytes = RomClassBuilder::new("com/example/Foo")
        .method(MethodBuilder::new("foo", "()V").bytecodes(vec![0xb1]))
        .build();
    let methods = u32::from_le_bytes(
        bytes[header::ROM_METHODS as usize..header::ROM_METHODS as usize + 4]
            .try_into()
            .unwrap(),
    );
    put_u32(&mut bytes, methods + 24, u32::MAX); // bytecodeSize
    let class = RomClass::new(&bytes).unwrap();
    let mut out = Vec::new();
    dump::linear(&class, 0, 1, &(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("bytes were not accounted for"), "{}", text);
}

#[test]
fn nest_members_table_requires_the_nestmates_version() {
    let build = |major: u16| {
        RomClassBuilder::new("com/example/Foo")
            .version(major, 0)
            .nest_member("com/example/Foo$Inner")
            .build()
    };

    // the header slot is always visited; the table section only appears
    // from the first nestmates class-file version on
    let table = |regions: &[dump::Region]| {
        regions
            .iter()
            .any(|r| r.name == "nestMembers" && r.slot_type == SlotType::SectionStart)
    };

    let old = build(52);
    let class = RomClass::new(&old).unwrap();
    assert!(!table(&dump::gather(&class, &()).unwrap()));

    let new = build(55);
    let class = RomClass::new(&new).unwrap();
    assert!(table(&dump::gather(&class, &()).unwrap()));
}

/// A handcrafted record whose single method stores its debug block out of
/// line, behind a reference with the inline tag bit clear
fn out_of_line_debug_record() -> Vec<u8> {
    let method = header::SIZE;
    let debug_slot = method + 28;
    let block = debug_slot + 4;
    let total = block + 16;
    let mut bytes = vec![0u8; total as usize];
    put_u32(&mut bytes, header::ROM_SIZE, total);
    put_u32(&mut bytes, header::ROM_METHOD_COUNT, 1);
    put_u32(&mut bytes, header::ROM_METHODS, method);
    put_u32(&mut bytes, method + 12, MethodExtendedModifiers::HAS_DEBUG_INFO.bits());
    put_u32(&mut bytes, debug_slot, block); // even, so a reference rather than inline data
    put_u32(&mut bytes, block, 16); // debugSize: bare header, no tables
    bytes
}

#[test]
fn out_of_line_debug_block_is_walked_when_trusted() {
    let bytes = out_of_line_debug_record();
    let class = RomClass::new(&bytes).unwrap();
    let regions = dump::gather(&class, &()).unwrap();
    let block = header::SIZE + 32;
    assert!(regions.iter().any(|r| r.name == "debugInfo"));
    assert!(regions.iter().any(|r| {
        r.name == "methodDebugInfo" && r.slot_type == SlotType::SectionStart && r.offset == block
    }));
}

#[test]
fn rejected_out_of_line_debug_target_is_not_descended() {
    let bytes = out_of_line_debug_record();
    let class = RomClass::new(&bytes).unwrap();
    let block = header::SIZE + 32;
    let skip_block = ValidateWith(move |offset: u32, _length: u32| offset != block);
    let regions = dump::gather(&class, &skip_block).unwrap();
    assert!(regions.iter().any(|r| r.name == "debugInfo"));
    assert!(!regions.iter().any(|r| r.name == "methodDebugInfo"));
}
