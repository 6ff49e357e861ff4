use mango::{assemble, Machine, Stop};
use proptest::prelude::*;

fn run_file(path: &str) -> Machine {
    let src = std::fs::read_to_string(path).unwrap();
    run_src(&src)
}

fn run_src(src: &str) -> Machine {
    let mut machine = Machine::new();
    machine.assemble(src).unwrap();
    assert_eq!(machine.run(10_000).unwrap(), Stop::Halted);
    machine
}

#[test]
fn counts_up_in_subroutine() {
    let machine = run_file("tests/files/count.asm");
    assert_eq!(machine.cpu().gpr()[0], 10);
    assert_eq!(machine.cpu().sp(), 231);
}

#[test]
fn counts_down_in_subroutine() {
    let machine = run_file("tests/files/countdown.asm");
    assert_eq!(machine.cpu().gpr()[0], 0);
    assert!(machine.cpu().flags().zero);
}

#[test]
fn reverses_through_stack() {
    let machine = run_file("tests/files/stack.asm");
    assert_eq!(&machine.cpu().gpr()[..3], &[3, 2, 1]);
    assert_eq!(machine.cpu().sp(), 231);
}

#[test]
fn copies_string() {
    let machine = run_file("tests/files/hello.asm");
    let memory = machine.cpu().memory();
    assert_eq!(&memory.as_slice()[0xE8..0xED], b"Hello");
    assert_eq!(memory.read(0xED).unwrap(), 0);
    assert_eq!(machine.cpu().gpr()[3], 0xED);
}

#[test]
fn fibonacci_table() {
    let machine = run_file("tests/files/fib.asm");
    let memory = machine.cpu().memory();
    assert_eq!(
        &memory.as_slice()[0x80..0x8A],
        &[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]
    );
    assert_eq!(&machine.cpu().gpr()[..2], &[55, 89]);
}

#[test]
fn mov_immediate_round_trip() {
    let assembly = assemble("MOV A, 10").unwrap();
    assert_eq!(assembly.code, vec![0x06, 0x00, 0x0A]);

    let mut machine = Machine::new();
    machine.load(&assembly.code).unwrap();
    assert!(machine.step().unwrap());
    assert_eq!(machine.cpu().gpr()[0], 10);
    assert_eq!(machine.cpu().pc(), 3);
}

#[test]
fn call_resumes_after_call_site() {
    let machine = run_src("CALL sub\nMOV B, A\nHLT\nsub: MOV A, 7\nRET");
    assert_eq!(machine.cpu().gpr()[1], 7);
    assert_eq!(machine.cpu().sp(), 231);
}

#[test]
fn compiled_image_runs_the_same() {
    let src = std::fs::read_to_string("tests/files/fib.asm").unwrap();
    let image = assemble(&src).unwrap().code;
    let mut machine = Machine::new();
    machine.load(&image).unwrap();
    assert_eq!(machine.run(10_000).unwrap(), Stop::Halted);
    assert_eq!(machine.cpu().gpr(), run_src(&src).cpu().gpr());
}

proptest! {
    #[test]
    fn stack_restores_pushed_values(values in prop::collection::vec(any::<u8>(), 1..=4)) {
        let mut src = String::new();
        for value in &values {
            src.push_str(&format!("PUSH {value}\n"));
        }
        let regs = ["A", "B", "C", "D"];
        for reg in &regs[..values.len()] {
            src.push_str(&format!("POP {reg}\n"));
        }
        src.push_str("HLT\n");

        let machine = run_src(&src);
        let popped = &machine.cpu().gpr()[..values.len()];
        let expected: Vec<u8> = values.iter().rev().copied().collect();
        prop_assert_eq!(popped, expected.as_slice());
        prop_assert_eq!(machine.cpu().sp(), 231);
    }

    #[test]
    fn assembly_is_deterministic(a in any::<u8>(), b in any::<u8>()) {
        let src = format!("start: MOV A, {a}\nADD A, {b}\nJMP end\nDB \"x\"\nend: HLT");
        let first = assemble(&src).unwrap();
        let second = assemble(&src).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.code[1..3].to_vec(), vec![0, a]);
    }

    #[test]
    fn add_wraps_modulo_256(a in any::<u8>(), b in any::<u8>()) {
        let machine = run_src(&format!("MOV A, {a}\nADD A, {b}\nHLT"));
        prop_assert_eq!(machine.cpu().gpr()[0], a.wrapping_add(b));
    }
}
