use super::*;

#[test]
fn literal_radixes() {
    assert_eq!(
        parse_literal("42"),
        Ok(Literal { value: 42, radix: Radix::Decimal })
    );
    assert_eq!(
        parse_literal("-42"),
        Ok(Literal { value: -42, radix: Radix::Decimal })
    );
    assert_eq!(
        parse_literal("0xBEEF"),
        Ok(Literal { value: 0xBEEF, radix: Radix::Hexadecimal })
    );
    assert_eq!(
        parse_literal("1010b"),
        Ok(Literal { value: 10, radix: Radix::Binary })
    );
    assert_eq!(parse_literal("111111111b").map(|l| l.value), Ok(0x1FF));
}

#[test]
fn literal_rejects_garbage() {
    for token in ["", "-", "0x", "b", "12a", "0xG1", "102b", "+5", "--1", "1.5"] {
        assert_eq!(
            parse_literal(token),
            Err(AssemblerErrorKind::InvalidNumber),
            "{token}"
        );
    }
}

#[test]
fn registers() {
    assert_eq!(parse_register("A"), Ok(Register::A));
    assert_eq!(parse_register("b"), Ok(Register::B));
    assert_eq!(parse_register("rC"), Ok(Register::C));
    assert_eq!(parse_register("RD"), Ok(Register::D));
    assert_eq!(Register::D.index(), 3);
    assert_eq!(Register::from_index(2), Some(Register::C));
    assert_eq!(Register::from_index(4), None);

    for token in ["", "E", "rE", "AB", "rAB", "r", "1"] {
        assert_eq!(
            parse_register(token),
            Err(AssemblerErrorKind::InvalidRegister),
            "{token}"
        );
    }
}

#[test]
fn durations_are_exact() {
    assert_eq!(parse_duration("1"), Ok(1_000_000));
    assert_eq!(parse_duration("0.5"), Ok(500_000));
    assert_eq!(parse_duration(".2"), Ok(200_000));
    assert_eq!(parse_duration("0.000488"), Ok(488));
    assert_eq!(parse_duration("3."), Ok(3_000_000));
    assert_eq!(parse_duration("0.0000001"), Err(AssemblerErrorKind::InvalidNumber));
    assert_eq!(parse_duration("."), Err(AssemblerErrorKind::InvalidNumber));
    assert_eq!(parse_duration("-1"), Err(AssemblerErrorKind::InvalidNumber));
    assert_eq!(parse_duration("1.2.3"), Err(AssemblerErrorKind::InvalidNumber));
    assert_eq!(parse_duration("rA"), Err(AssemblerErrorKind::InvalidNumber));
}

#[test]
fn trigger_clauses() {
    let Ok(TriggerClause::Wait(set)) = parse_trigger_clause("w{1|3|e}") else {
        panic!("expected wait clause");
    };
    assert!(set.contains(TriggerSource::Engine1));
    assert!(!set.contains(TriggerSource::Engine2));
    assert!(set.contains(TriggerSource::Engine3));
    assert!(set.contains(TriggerSource::External));

    let Ok(TriggerClause::Send(set)) = parse_trigger_clause("s{2}") else {
        panic!("expected send clause");
    };
    assert!(set.contains(TriggerSource::Engine2));
    assert!(!set.contains(TriggerSource::Engine1));

    for token in ["w{}", "w{4}", "x{1}", "w1", "w{1", "s{1||2}"] {
        assert_eq!(
            parse_trigger_clause(token),
            Err(AssemblerErrorKind::InvalidTrigger),
            "{token}"
        );
    }
}

#[test]
fn end_flags_and_prescale() {
    assert_eq!(parse_end_flag("i"), Ok(EndFlag::Interrupt));
    assert_eq!(parse_end_flag("R"), Ok(EndFlag::Reset));
    assert_eq!(parse_end_flag("ir"), Err(AssemblerErrorKind::InvalidFlag));

    assert_eq!(parse_prescale_marker("pre=1"), Ok(Some(true)));
    assert_eq!(parse_prescale_marker("pre=0"), Ok(Some(false)));
    assert_eq!(parse_prescale_marker("rA"), Ok(None));
    assert_eq!(
        parse_prescale_marker("pre=2"),
        Err(AssemblerErrorKind::InvalidRampOperand)
    );
}

#[test]
fn signed_registers() {
    assert_eq!(
        parse_signed_register("-rA"),
        Ok(SignedRegister { register: Register::A, negative: true })
    );
    assert_eq!(
        parse_signed_register("C"),
        Ok(SignedRegister { register: Register::C, negative: false })
    );
    assert!(parse_signed_register("-").is_err());
}

#[test]
fn identifiers() {
    assert!(is_identifier("loop_1"));
    assert!(is_identifier("m0"));
    assert!(!is_identifier(""));
    assert!(!is_identifier("a-b"));
    assert!(!is_identifier("x:"));
}
