use super::*;

extern crate std;
use std::format;

const IMAGE: [u8; 16] = [
    0x00, 0x01, 0x00, 0x02, 0xD0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

fn mnemonics(decoded: &Decoded) -> std::vec::Vec<Mnemonic> {
    match decoded {
        Decoded::Data => std::vec::Vec::new(),
        Decoded::Candidates(candidates) => candidates.iter().map(|c| c.mnemonic).collect(),
    }
}

#[test]
fn words_before_first_segment_are_data() {
    let table = OpcodeTable::new();
    let listing = disassemble(&table, &IMAGE, &[2]).unwrap();

    assert_eq!(listing.lines().len(), 8);
    assert_eq!(listing.lines()[0].decoded, Decoded::Data);
    assert_eq!(listing.lines()[1].word, 0x0002);
    assert_eq!(listing.lines()[1].decoded, Decoded::Data);
    assert_eq!(mnemonics(&listing.lines()[2].decoded), [Mnemonic::End]);
    assert_eq!(listing.segment_markers().collect::<std::vec::Vec<_>>(), [2]);
}

#[test]
fn without_segments_everything_is_code() {
    let table = OpcodeTable::new();
    let listing = disassemble(&table, &IMAGE, &[]).unwrap();
    assert!(listing
        .lines()
        .iter()
        .all(|line| matches!(line.decoded, Decoded::Candidates(_))));
    assert_eq!(listing.segment_markers().count(), 0);
}

#[test]
fn overlapping_patterns_report_every_candidate() {
    let table = OpcodeTable::new();
    let candidates = decode(&table, 0x0000).unwrap();
    let found: std::vec::Vec<Mnemonic> = candidates.iter().map(|c| c.mnemonic).collect();
    assert_eq!(found, [Mnemonic::Ramp, Mnemonic::Wait, Mnemonic::Rst]);

    let candidates = decode(&table, 0x9D80).unwrap();
    assert!(candidates.iter().any(|c| c.mnemonic == Mnemonic::MapNext));
    assert!(candidates.len() > 1);
}

#[test]
fn variant_forms_are_marked() {
    let table = OpcodeTable::new();
    let candidates = decode(&table, 0x8461).unwrap();
    let set_pwm = candidates
        .iter()
        .find(|c| c.mnemonic == Mnemonic::SetPwm)
        .unwrap();
    assert_eq!(set_pwm.form, Form::Variant);
    assert_eq!(set_pwm.operand, 1);
}

#[test]
fn listing_text() {
    let table = OpcodeTable::new();
    let listing = disassemble(&table, &IMAGE[..8], &[2]).unwrap();
    assert_eq!(
        format!("{listing}"),
        "00: 0001  dw 0x0001\n\
         01: 0002  dw 0x0002\n\
         .segment seg0\n\
         02: D000  end i\n\
         03: 0000  ramp 0x0 | wait 0x0 | rst\n"
    );
}

#[test]
fn rejects_bad_images() {
    let table = OpcodeTable::new();
    assert_eq!(
        disassemble(&table, &IMAGE[..3], &[]),
        Err(AssemblerErrorKind::OddImageLength)
    );
    let oversized = [0u8; crate::IMAGE_BYTES + 2];
    assert_eq!(
        disassemble(&table, &oversized, &[]),
        Err(AssemblerErrorKind::ProgramTooLarge)
    );
}

#[test]
fn single_field_operands_read_as_source() {
    let table = OpcodeTable::new();
    let text = |word| {
        let candidates = decode(&table, word).unwrap();
        candidates.iter().map(|c| format!("{c}")).collect::<std::vec::Vec<_>>()
    };

    assert_eq!(text(0xD800), ["end i, r"]);
    assert_eq!(text(0xC000), ["end"]);
    assert_eq!(text(0x9C88), ["load_end 8"]);
    assert!(text(0x4005).iter().any(|c| c == "set_pwm 5"));
    assert!(text(0x8461).iter().any(|c| c == "set_pwm rB"));
    assert!(text(0x930E).iter().any(|c| c == "add var 0xE"));
}

#[test]
fn empty_trailing_segment_keeps_its_marker() {
    let table = OpcodeTable::new();
    let mut source = std::string::String::from("dw 1\n.segment a\n");
    for _ in 0..7 {
        source.push_str("end\n");
    }
    source.push_str(".segment b\n");
    let image = crate::parse(&table, &source).unwrap().assemble(&table).unwrap();
    assert_eq!(image.segment_addresses().as_slice(), &[1, 8]);

    let listing = disassemble(&table, &image.bytes, &image.segment_addresses()).unwrap();
    assert_eq!(listing.lines().len(), 8);
    assert_eq!(listing.segment_markers().collect::<std::vec::Vec<_>>(), [1, 8]);
    assert!(format!("{listing}").ends_with("07: C000  end\n.segment seg1\n"));
}

#[test]
fn segments_sharing_an_address_are_all_marked() {
    let table = OpcodeTable::new();
    let listing = disassemble(&table, &IMAGE[..4], &[1, 0, 1]).unwrap();
    assert_eq!(listing.segment_markers().collect::<std::vec::Vec<_>>(), [0, 1, 1]);
    assert_eq!(
        format!("{listing}"),
        ".segment seg1\n\
         00: 0001  ramp 0x1\n\
         .segment seg0\n\
         .segment seg2\n\
         01: 0002  ramp 0x2\n"
    );
}

#[test]
fn image_segments_keep_their_names() {
    let table = OpcodeTable::new();
    let image = crate::parse(&table, "m0: dw 1\nm1: dw 2\nall: segment\nend i")
        .unwrap()
        .assemble(&table)
        .unwrap();
    let listing = disassemble_image(&table, &image).unwrap();
    assert!(format!("{listing}").contains("01: 0002  dw 0x0002\n.segment all\n02: D000  end i\n"));
}
