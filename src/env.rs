use std::{cell::RefCell, ffi::OsStr, str::FromStr};

/// Instruction budget for `run` when neither the flag nor the variable is set.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

#[derive(Clone, Copy)]
struct Env {
    max_steps: usize,
    print_registers: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        max_steps: var_parse("MANGO_MAX_STEPS").unwrap_or(DEFAULT_MAX_STEPS),
        print_registers: var_is("MANGO_REGISTERS", "1"),
    };
    set_env(value);
}

pub fn max_steps() -> usize {
    with_env(|env| env.max_steps)
}

pub fn print_registers() -> bool {
    with_env(|env| env.print_registers)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

/// Unset or unparsable variables are ignored.
fn var_parse<T: FromStr>(name: impl AsRef<OsStr>) -> Option<T> {
    std::env::var(name.as_ref()).ok()?.trim().parse().ok()
}
