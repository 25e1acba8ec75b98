//! Property based tests for the assembler and disassembler.

use flux_asm::artifact::{parse_hex_dump, write_hex_dump};
use flux_asm::{OpcodeTable, PAGE_BYTES, PROGRAM_WORDS, disassemble, parse};
use proptest::prelude::*;

fn arb_source() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('\0', '\x7f'), 0..256)
        .prop_map(|v| v.into_iter().collect())
}

/// Instructions that assemble on their own, without labels.
fn valid_line() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "set_pwm 10",
        "set_pwm rD",
        "map_next",
        "map_prev",
        "map_clr",
        "map_sel 3",
        "load_next",
        "rst",
        "int",
        "end",
        "end i, r",
        "ramp 0.5, 100",
        "ramp 2, -255",
        "ramp rA, -rB",
        "wait 0.1",
        "ld rA, 5",
        "add rB, rC",
        "sub rC, 7",
        "trigger w{1|e}",
        "trig_clear",
        "dw 0x1234",
        "dw 111b",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn no_panic_on_arbitrary_source(source in arb_source()) {
        let table = OpcodeTable::new();
        if let Ok(program) = parse(&table, &source) {
            let _ = program.assemble(&table);
        }
    }

    #[test]
    fn no_panic_on_arbitrary_image(
        words in prop::collection::vec(any::<u16>(), 0..=PROGRAM_WORDS),
        segments in prop::collection::vec(0u16..300, 0..4),
    ) {
        let table = OpcodeTable::new();
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        let listing = disassemble(&table, &bytes, &segments).unwrap();
        prop_assert_eq!(listing.lines().len(), words.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn valid_programs_fill_whole_pages(lines in prop::collection::vec(valid_line(), 0..200)) {
        let table = OpcodeTable::new();
        let source = lines.join("\n");
        let image = parse(&table, &source).unwrap().assemble(&table).unwrap();

        let words = lines.len();
        prop_assert_eq!(image.bytes.len() % PAGE_BYTES, 0);
        prop_assert!(image.bytes.len() >= words * 2);
        prop_assert!(image.bytes.len() < words * 2 + PAGE_BYTES);
    }

    #[test]
    fn labels_follow_data_words(values in prop::collection::vec(0u16..=0x1FF, 1..64)) {
        let table = OpcodeTable::new();
        let source: String = values
            .iter()
            .enumerate()
            .map(|(index, value)| format!("row{index}: dw {value}\n"))
            .collect();
        let program = parse(&table, &source).unwrap();
        let image = program.assemble(&table).unwrap();

        for (index, value) in values.iter().enumerate() {
            let name = format!("row{index}");
            prop_assert_eq!(program.symbols().get(&name), Some(index as u16));
            prop_assert_eq!(&image.bytes[index * 2..index * 2 + 2], &value.to_be_bytes());
        }
    }

    #[test]
    fn hex_words_are_stored_big_endian(value in any::<u16>()) {
        let table = OpcodeTable::new();
        let source = format!("dw {value:#06x}");
        let image = parse(&table, &source).unwrap().assemble(&table).unwrap();
        prop_assert_eq!(&image.bytes[..2], &value.to_be_bytes());
    }

    #[test]
    fn hex_dump_reads_back(lines in prop::collection::vec(valid_line(), 1..120)) {
        let table = OpcodeTable::new();
        let mut source = String::from("set_pwm 1\n");
        source.push_str(&lines.join("\n"));
        let image = parse(&table, &source).unwrap().assemble(&table).unwrap();

        let mut text = String::new();
        write_hex_dump(&mut text, &image).unwrap();
        let read = parse_hex_dump(&text).unwrap();
        prop_assert_eq!(read.segments, image.segments);
        prop_assert!(image.bytes.starts_with(&read.bytes));
    }
}
