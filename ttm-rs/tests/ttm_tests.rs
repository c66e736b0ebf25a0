//! Behavioural tests: whole programs evaluated through the library API.
//!
//! Each test builds a fresh [`Interpreter`] with an in-memory console, so
//! output from `#<ps>` and traces can be inspected alongside the passive
//! result of the evaluation.
use std::io::Write;

use ttm::config::Limits;
use ttm::console::MemoryConsole;
use ttm::{ErrorKind, Interpreter};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn interp() -> (Interpreter, MemoryConsole) {
    let console = MemoryConsole::new();
    let mut i = Interpreter::new();
    i.set_console(Box::new(console.clone()));
    (i, console)
}

fn eval(src: &str) -> String {
    interp().0.eval(src).unwrap_or_else(|e| panic!("{src:?} failed: {e}"))
}

fn error(src: &str) -> ErrorKind {
    match interp().0.eval(src) {
        Ok(out) => panic!("{src:?} unexpectedly produced {out:?}"),
        Err(e) => e.kind,
    }
}

// ── Core properties ───────────────────────────────────────────────────────────

#[test]
fn plain_text_passes_through() {
    for s in ["", "abc", "multi\nline text", "punctuation: , . ! ? ( )", "unicode: é ß 日本"] {
        assert_eq!(eval(s), s);
    }
}

#[test]
fn greet_with_segment_substitution() {
    let src = "#<ds;greet;<Hello, who!>>#<ss;greet;who>#<greet;World>";
    assert_eq!(eval(src), "Hello, World!");
}

#[test]
fn arithmetic_examples() {
    assert_eq!(eval("#<ad;2;3;5>"), "10");
    assert_eq!(eval("#<dv;7;2>"), "3");
    assert_eq!(eval("#<dvr;7;2>"), "1");
}

#[test]
fn comparison_examples() {
    assert_eq!(eval("#<eq;3;3;yes;no>"), "yes");
    assert_eq!(eval("#<lt;5;3;yes;no>"), "no");
}

#[test]
fn literal_spans_nest() {
    assert_eq!(eval("##<ds;t;<a<b>c>>##<t>"), "a<b>c");
}

#[test]
fn self_calling_macro_exhausts_budget() {
    assert_eq!(error("#<ds;loop;<#<loop>>>#<loop>"), ErrorKind::ExecCount);
}

#[test]
fn self_redefining_macro_exhausts_budget() {
    let src = "#<ds;again;<#<ds;again;<#<again>>>#<again>>>#<again>";
    assert_eq!(error(src), ErrorKind::ExecCount);
}

#[test]
fn locked_builtin_survives_erase() {
    assert_eq!(eval("#<es;ad>#<ad;1;2>"), "3");
}

#[test]
fn residual_reads_terminate() {
    let (mut i, _) = interp();
    i.eval("#<ds;body;hello>").unwrap();
    let mut seen = String::new();
    for _ in 0..5 {
        let c = i.eval("##<cc;body>").unwrap();
        assert_eq!(c.chars().count(), 1);
        seen.push_str(&c);
    }
    assert_eq!(seen, "hello");
    assert_eq!(i.eval("##<cc;body>").unwrap(), "");
    assert_eq!(i.eval("#<eos;body;done;more>").unwrap(), "done");
}

// ── Larger programs ───────────────────────────────────────────────────────────

#[test]
fn recursive_factorial() {
    let src = "#<ds;fact;<#<eq;n;0;1;<#<mu;n;#<fact;#<su;n;1>>>>>>>\
               #<ss;fact;n>\
               #<fact;10>";
    assert_eq!(eval(src), "3628800");
}

#[test]
fn count_down_loop() {
    let src = "#<ds;count;<#<gt;i;0;<i #<count;#<su;i;1>>>;done>>>#<ss;count;i>#<count;3>";
    assert_eq!(eval(src), "3 2 1 done");
}

#[test]
fn def_builds_macros() {
    assert_eq!(eval("#<def;twice;x;<x,x>>#<twice;7>"), "7,7");
}

#[test]
fn split_on_separator_with_scn() {
    let (mut i, _) = interp();
    i.eval("#<ds;csv;<x,y,z>>").unwrap();
    let mut fields = Vec::new();
    loop {
        let at_end = i.eval("#<eos;csv;1;0>").unwrap();
        if at_end == "1" {
            break;
        }
        let field = i.eval("#<scn;,;csv;<##<cn;99;csv>>>").unwrap();
        fields.push(field);
    }
    assert_eq!(fields, vec!["x", "y", "z"]);
}

#[test]
fn word_scanning_with_classes() {
    let (mut i, _) = interp();
    i.eval("#<dcl;sp; >#<dncl;word; >#<ds;s;<one two  three>>").unwrap();
    let mut words = Vec::new();
    while i.eval("#<eos;s;y;n>").unwrap() == "n" {
        words.push(i.eval("##<ccl;word;s>").unwrap());
        i.eval("#<scl;sp;s>").unwrap();
    }
    assert_eq!(words, vec!["one", "two", "three"]);
}

#[test]
fn creation_marks_label_each_call() {
    let src = "#<ds;gen;<lbl>>#<cr;gen;lbl>#<gen>-#<gen>-#<gen>";
    assert_eq!(eval(src), "0001-0002-0003");
}

#[test]
fn passive_call_is_not_rescanned() {
    assert_eq!(eval("#<ds;x;<#<ad;1;1>>>##<x>"), "#<ad;1;1>");
    assert_eq!(eval("#<ds;x;<#<ad;1;1>>>#<x>"), "2");
}

#[test]
fn meta_characters_are_switchable() {
    assert_eq!(eval("#<ttm;meta;%(|)!>%(ds|x|(a|b))%(x)"), "a|b");
}

// ── Peripheral ────────────────────────────────────────────────────────────────

#[test]
fn print_and_read() {
    let console = MemoryConsole::with_input("typed\n");
    let mut i = Interpreter::new();
    i.set_console(Box::new(console.clone()));
    let out = i.eval("#<ps;prompt:>##<rs>").unwrap();
    assert_eq!(out, "typed");
    assert_eq!(console.stdout(), "prompt:\n");
}

#[test]
fn read_rejects_reserved_characters() {
    let console = MemoryConsole::with_input("bad\u{10FFC0}\n");
    let mut i = Interpreter::new();
    i.set_console(Box::new(console));
    assert_eq!(i.eval("#<rs>").unwrap_err().kind, ErrorKind::IllegalChar);
}

#[test]
fn include_reads_and_rescans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.ttm");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "#<ds;double;<#<mu;n;2>>>#<ss;double;n>").unwrap();
    drop(f);

    let (mut i, _) = interp();
    i.add_include_dir(dir.path());
    assert_eq!(i.eval("#<include;lib.ttm>#<double;21>").unwrap(), "42");

    let direct = format!("##<include;{}>", path.display());
    assert_eq!(i.eval(&direct).unwrap(), "#<ds;double;<#<mu;n;2>>>#<ss;double;n>");
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn error_kinds() {
    assert_eq!(error("#<nothing>"), ErrorKind::NoName);
    assert_eq!(error("#<cc;ad>"), ErrorKind::NoPrimitive);
    assert_eq!(error("#<ad;1>"), ErrorKind::FewParameters);
    assert_eq!(error("#<ad;1;one>"), ErrorKind::Decimal);
    assert_eq!(error("#<ad;99999999999999999999;1>"), ErrorKind::ManyDigits);
    assert_eq!(error("#<ad;1;2"), ErrorKind::Eos);
    assert_eq!(error("#<sn;-1;x>"), ErrorKind::NotNegative);
    assert_eq!(error("#<ttm;meta;ab>"), ErrorKind::TtmCommand);
    assert_eq!(error("#<dv;1;0>"), ErrorKind::Arithmetic);
}

#[test]
fn error_report_lists_frames() {
    let (mut i, _) = interp();
    let e = i.eval("#<ds;bad;<#<nosuch>>>#<ad;1;#<bad>>").unwrap_err();
    assert_eq!(e.kind, ErrorKind::NoName);
    let report = e.report();
    assert!(report.starts_with("Fatal error: (1) "), "{report}");
    assert!(report.contains("[00] #<ad;1>"), "{report}");
    assert!(report.contains("[01] #<nosuch>"), "{report}");
    assert!(report.ends_with("end stack trace:\n"), "{report}");
}

#[test]
fn interpreter_recovers_after_error() {
    let (mut i, _) = interp();
    i.eval("#<ds;keep;kept>").unwrap();
    assert!(i.eval("#<ad;#<nothing>;1>").is_err());
    assert_eq!(i.depth(), 0);
    assert_eq!(i.eval("#<keep>").unwrap(), "kept");
}

#[test]
fn stack_limit_follows_configuration() {
    let limits = Limits { stacksize: 100, ..Limits::default() };
    let mut i = Interpreter::with_limits(limits);
    i.set_console(Box::new(MemoryConsole::new()));
    let nested = format!("{}1{}", "#<abs;".repeat(99), ">".repeat(99));
    assert_eq!(i.eval(&nested).unwrap(), "1");
    let deeper = format!("{}1{}", "#<abs;".repeat(101), ">".repeat(101));
    assert_eq!(i.eval(&deeper).unwrap_err().kind, ErrorKind::StackOverflow);
}

// ── Tracing ───────────────────────────────────────────────────────────────────

#[test]
fn trace_brackets_each_call() {
    let (mut i, console) = interp();
    i.eval("#<tn>#<ad;1;#<su;5;2>>#<tf>").unwrap();
    let trace = console.stderr();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[01] begin: #<su;5;2>",
            "[01] end: #<su> => \"3\"",
            "[00] begin: #<ad;1;3>",
            "[00] end: #<ad> => \"4\"",
            "[00] begin: #<tf>",
            "[00] end: #<tf>",
        ]
    );
}
