//! Instruction semantics exercised through whole programs.
use chip8_core::prelude::*;

fn vm_with(program: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_rom(program).unwrap();
    vm
}

#[test]
fn test_load_word_image() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    vm.load_words(&[0x00E0]).unwrap();

    assert_eq!(vm.cpu().memory()[0x200], 0x00);
    assert_eq!(vm.cpu().memory()[0x201], 0xE0);
}

#[test]
fn test_add_byte_wraps_without_flag() {
    let mut vm = vm_with(&[
        0x60, 0xFF, // LD V0,FF
        0x70, 0x02, // ADD V0,02
    ]);
    vm.run_steps(2).unwrap();

    assert_eq!(vm.cpu().register(0), 0x01);
    assert_eq!(vm.cpu().vf(), 0);
}

#[test]
fn test_add_registers_sets_carry() {
    let mut vm = vm_with(&[
        0x60, 0xDD, // LD V0,DD
        0x61, 0xDE, // LD V1,DE
        0x80, 0x14, // ADD V0,V1
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.cpu().register(0), 0xBB);
    assert_eq!(vm.cpu().vf(), 1);
}

#[test]
fn test_add_registers_clears_carry() {
    let mut vm = vm_with(&[
        0x60, 0x0D, // LD V0,0D
        0x61, 0x0E, // LD V1,0E
        0x80, 0x14, // ADD V0,V1
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.cpu().register(0), 0x1B);
    assert_eq!(vm.cpu().vf(), 0);
}

#[test]
fn test_sub_flag_judged_before_subtraction() {
    let mut vm = vm_with(&[
        0x60, 0xDE, // LD V0,DE
        0x61, 0xDD, // LD V1,DD
        0x80, 0x15, // SUB V0,V1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0x01);
    assert_eq!(vm.cpu().vf(), 1);

    let mut vm = vm_with(&[
        0x60, 0x01, // LD V0,01
        0x61, 0x02, // LD V1,02
        0x80, 0x15, // SUB V0,V1
    ]);
    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0xFF, "wraps modulo 256");
    assert_eq!(vm.cpu().vf(), 0);
}

#[test]
fn test_subn_reverses_operands() {
    let mut vm = vm_with(&[
        0x60, 0x02, // LD V0,02
        0x61, 0x05, // LD V1,05
        0x80, 0x17, // SUBN V0,V1
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.cpu().register(0), 0x03);
    assert_eq!(vm.cpu().vf(), 1);
}

#[test]
fn test_shift_right_reports_low_bit() {
    let mut vm = vm_with(&[
        0x60, 0x05, // LD V0,05
        0x80, 0x16, // SHR V0,V1
    ]);
    vm.run_steps(2).unwrap();

    assert_eq!(vm.cpu().register(0), 0x02);
    assert_eq!(vm.cpu().vf(), 1);
}

#[test]
fn test_shift_left_reports_high_bit() {
    let mut vm = vm_with(&[
        0x60, 0x81, // LD V0,81
        0x80, 0x1E, // SHL V0,V1
    ]);
    vm.run_steps(2).unwrap();

    assert_eq!(vm.cpu().register(0), 0x02, "wraps modulo 256");
    assert_eq!(vm.cpu().vf(), 1);
}

#[test]
fn test_bitwise_ops() {
    let mut vm = vm_with(&[
        0x60, 0b1100, // LD V0
        0x61, 0b1010, // LD V1
        0x80, 0x11, // OR V0,V1
        0x62, 0b1100, // LD V2
        0x82, 0x12, // AND V2,V1
        0x63, 0b1100, // LD V3
        0x83, 0x13, // XOR V3,V1
    ]);
    vm.run_steps(7).unwrap();

    assert_eq!(vm.cpu().register(0), 0b1110);
    assert_eq!(vm.cpu().register(2), 0b1000);
    assert_eq!(vm.cpu().register(3), 0b0110);
}

#[test]
fn test_jump_replaces_program_counter() {
    let mut vm = vm_with(&[
        0x12, 0x06, // JP 206
        0x60, 0xAA, // LD V0,AA (skipped)
        0x00, 0x00,
        0x60, 0x55, // 0x206: LD V0,55
    ]);
    vm.step().unwrap();
    assert_eq!(vm.cpu().pc(), 0x206);

    vm.step().unwrap();
    assert_eq!(vm.cpu().register(0), 0x55);
}

#[test]
fn test_call_and_ret_restore_return_address() {
    let mut vm = vm_with(&[
        0x22, 0x06, // 0x200: CALL 206
        0x60, 0x01, // 0x202: LD V0,01
        0x00, 0x00,
        0x00, 0xEE, // 0x206: RET
    ]);

    assert_eq!(vm.cpu().sp(), -1, "stack starts empty");

    vm.step().unwrap();
    assert_eq!(vm.cpu().pc(), 0x206);
    assert_eq!(vm.cpu().sp(), 0);

    vm.step().unwrap();
    assert_eq!(vm.cpu().pc(), 0x202, "RET resumes after the CALL");
    assert_eq!(vm.cpu().sp(), -1);

    vm.step().unwrap();
    assert_eq!(vm.cpu().register(0), 0x01);
}

#[test]
fn test_skip_equal_byte() {
    let mut vm = vm_with(&[
        0x60, 0x05, // LD V0,05
        0x30, 0x05, // SE V0,05 (taken)
        0x60, 0xFF, // skipped
        0x30, 0x06, // SE V0,06 (not taken)
        0x61, 0x01, // LD V1,01
    ]);
    vm.run_steps(4).unwrap();

    assert_eq!(vm.cpu().register(0), 0x05);
    assert_eq!(vm.cpu().register(1), 0x01);
}

#[test]
fn test_skip_not_equal_registers() {
    let mut vm = vm_with(&[
        0x60, 0x05, // LD V0,05
        0x61, 0x05, // LD V1,05
        0x90, 0x10, // SNE V0,V1 (not taken)
        0x62, 0x01, // LD V2,01
        0x51, 0x20, // SE V1,V2 (not taken)
        0x63, 0x01, // LD V3,01
    ]);
    vm.run_steps(6).unwrap();

    assert_eq!(vm.cpu().register(2), 0x01);
    assert_eq!(vm.cpu().register(3), 0x01);
}

#[test]
fn test_draw_glyph_eight() {
    let mut vm = vm_with(&[
        0x60, 0x08, // LD V0,08
        0xF0, 0x29, // LD F,V0
        0x61, 0x05, // LD V1,05
        0x62, 0x01, // LD V2,01
        0xD1, 0x25, // DRW V1,V2,5
    ]);
    vm.run_steps(5).unwrap();

    // Glyph "8" bitmap, drawn at (5, 1).
    let glyph: [u8; 5] = [0xF0, 0x90, 0xF0, 0x90, 0xF0];
    for (row, line) in glyph.iter().enumerate() {
        for bit in 0..8 {
            let expected = (line >> (7 - bit)) & 1 != 0;
            assert_eq!(
                vm.cpu().pixel(5 + bit, 1 + row),
                expected,
                "row {row} bit {bit}"
            );
        }
    }
    assert_eq!(vm.cpu().vf(), 0, "no collision on a cleared framebuffer");
}

#[test]
fn test_clear_screen() {
    let mut vm = vm_with(&[
        0x60, 0x08, // LD V0,08
        0xF0, 0x29, // LD F,V0
        0xD0, 0x05, // DRW V0,V0,5
        0x00, 0xE0, // CLS
    ]);
    vm.run_steps(3).unwrap();
    assert!(vm.display_buffer().iter().any(|px| *px));

    vm.step().unwrap();
    assert!(vm.display_buffer().iter().all(|px| !*px));
}

#[test]
fn test_font_pointer_is_glyph_times_five() {
    let mut vm = vm_with(&[
        0x60, 0x0D, // LD V0,0D
        0xF0, 0x29, // LD F,V0
    ]);
    vm.run_steps(2).unwrap();

    assert_eq!(vm.cpu().index(), 13 * 5);
}

#[test]
fn test_binary_coded_decimal() {
    let mut vm = vm_with(&[
        0x60, 0x92, // LD V0,146
        0xA3, 0x00, // LD I,300
        0xF0, 0x33, // LD B,V0
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(&vm.cpu().memory()[0x300..0x303], &[1, 4, 6]);
}

#[test]
fn test_store_and_load_registers() {
    let mut vm = vm_with(&[
        0x60, 0x11, // LD V0,11
        0x61, 0x22, // LD V1,22
        0xA3, 0x00, // LD I,300
        0xF1, 0x55, // LD [I],V1
        0x60, 0x00, // LD V0,00
        0x61, 0x00, // LD V1,00
        0xF1, 0x65, // LD V1,[I]
    ]);
    vm.run_steps(4).unwrap();
    assert_eq!(&vm.cpu().memory()[0x300..0x302], &[0x11, 0x22]);

    vm.run_steps(3).unwrap();
    assert_eq!(vm.cpu().register(0), 0x11);
    assert_eq!(vm.cpu().register(1), 0x22);
}

#[test]
fn test_index_arithmetic() {
    let mut vm = vm_with(&[
        0xA1, 0x23, // LD I,123
        0x60, 0x10, // LD V0,10
        0xF0, 0x1E, // ADD I,V0
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.cpu().index(), 0x133);
}

#[test]
fn test_delay_timer_round_trip() {
    let mut vm = vm_with(&[
        0x60, 0x42, // LD V0,42
        0xF0, 0x15, // LD DT,V0
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().delay_timer(), 0x42);

    // The 60Hz countdown is the host's job.
    let dt = vm.cpu().delay_timer();
    vm.cpu_mut().set_delay_timer(dt - 1);
    assert_eq!(vm.cpu().delay_timer(), 0x41);
}

#[test]
fn test_unknown_opcode_faults_with_snapshot() {
    let mut vm = vm_with(&[
        0x60, 0x07, // LD V0,07
        0xFF, 0xFF, // no such instruction
    ]);
    vm.step().unwrap();

    match vm.step() {
        Err(Chip8Error::Decode(snapshot)) => {
            assert_eq!(snapshot.opcode, 0xFFFF);
            assert_eq!(snapshot.pc, 0x202);
            assert_eq!(snapshot.registers[0], 0x07);
            assert_eq!(snapshot.sp, -1);
        }
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[test]
fn test_jump_past_memory_end_faults() {
    let mut vm = vm_with(&[
        0x60, 0x07, // LD V0,07
        0x1F, 0xFF, // JP FFF
    ]);
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().pc(), 0xFFF);

    match vm.step() {
        Err(Chip8Error::Bounds(snapshot)) => {
            assert_eq!(snapshot.pc, 0xFFF);
            assert_eq!(snapshot.registers[0], 0x07, "registers untouched");
        }
        other => panic!("expected Bounds, got {other:?}"),
    }
    assert_eq!(vm.cpu().register(0), 0x07);
}

#[test]
fn test_call_stack_overflow() {
    // CALL to itself: every step pushes another frame.
    let mut vm = vm_with(&[
        0x22, 0x00, // 0x200: CALL 200
    ]);

    vm.run_steps(16).unwrap();
    assert_eq!(vm.cpu().sp(), 15);

    match vm.step() {
        Err(Chip8Error::StackOverflow(snapshot)) => assert_eq!(snapshot.sp, 15),
        other => panic!("expected StackOverflow, got {other:?}"),
    }
    assert_eq!(vm.cpu().sp(), 15, "no out-of-range write happened");
}

#[test]
fn test_ret_on_empty_stack_underflows() {
    let mut vm = vm_with(&[
        0x00, 0xEE, // RET
    ]);

    match vm.step() {
        Err(Chip8Error::StackUnderflow(snapshot)) => assert_eq!(snapshot.sp, -1),
        other => panic!("expected StackUnderflow, got {other:?}"),
    }
}

#[test]
fn test_encode_matches_hand_built_opcode() {
    // The original way of synthesizing an opcode: pattern | fields.
    let def = decode(0x6000).unwrap();
    assert_eq!(def.op, Opcode::LdVxByte);

    let args = Args {
        x: 2,
        kk: 0xBE,
        ..Args::default()
    };
    assert_eq!(def.encode(&args), 0x6000 | (2 << 8) | 0xBE);
}

#[test]
fn test_error_display_and_dump() {
    let mut vm = vm_with(&[0xFF, 0xFF]);

    let err = vm.step().unwrap_err();
    assert_eq!(err.to_string(), "unknown opcode FFFF");

    let snapshot = err.snapshot().unwrap();
    let memory_dump = snapshot.dump_memory().unwrap();
    // 4096 bytes, one 16-bit word per line.
    assert_eq!(memory_dump.lines().count(), 2048);
    assert!(memory_dump.contains("0200: FFFF"));
}
