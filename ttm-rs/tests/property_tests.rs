use proptest::prelude::*;
use ttm::console::MemoryConsole;
use ttm::Interpreter;

fn interp() -> Interpreter {
    let mut i = Interpreter::new();
    i.set_console(Box::new(MemoryConsole::new()));
    i
}

/// Text containing none of the default syntax characters.
const PLAIN: &str = "[a-zA-Z0-9 ,.;:!?()\n\u{e9}\u{65e5}]{0,64}";

proptest! {
    /// Plain text evaluates to itself.
    #[test]
    fn plain_text_is_identity(s in PLAIN) {
        prop_assert_eq!(interp().eval(&s).unwrap(), s);
    }

    /// Evaluating an evaluated plain text changes nothing.
    #[test]
    fn evaluation_is_idempotent_on_plain_text(s in PLAIN) {
        let mut i = interp();
        let once = i.eval(&s).unwrap();
        prop_assert_eq!(i.eval(&once).unwrap(), once);
    }

    /// A bracketed literal yields its contents unchanged.
    #[test]
    fn literal_round_trip(s in PLAIN) {
        prop_assert_eq!(interp().eval(&format!("<{s}>")).unwrap(), s);
    }

    /// A stored string comes back verbatim from a passive call.
    #[test]
    fn define_then_call(s in "[a-zA-Z0-9 ,.!?]{0,64}") {
        let mut i = interp();
        i.eval(&format!("#<ds;p;<{s}>>")).unwrap();
        prop_assert_eq!(i.eval("##<p>").unwrap(), s);
    }

    /// Addition agrees with integer arithmetic.
    #[test]
    fn addition_matches_i64(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let out = interp().eval(&format!("#<ad;{a};{b}>")).unwrap();
        prop_assert_eq!(out, (a + b).to_string());
    }

    /// Quotient and remainder recombine to the dividend.
    #[test]
    fn division_recombines(a in -100_000i64..100_000, b in 1i64..1000) {
        let mut i = interp();
        let q: i64 = i.eval(&format!("#<dv;{a};{b}>")).unwrap().parse().unwrap();
        let r: i64 = i.eval(&format!("#<dvr;{a};{b}>")).unwrap().parse().unwrap();
        prop_assert_eq!(q * b + r, a);
    }

    /// Arbitrary syntax soup returns Ok or Err, never panics, and leaves the
    /// interpreter usable.
    #[test]
    fn arbitrary_input_does_not_panic(s in "[#<>;\\\\abcdeqsu0-9 ]{0,48}") {
        let mut i = interp();
        let _ = i.eval(&s);
        if !i.exiting() {
            prop_assert_eq!(i.depth(), 0);
            prop_assert_eq!(i.eval("still here").unwrap(), "still here");
        }
    }
}
